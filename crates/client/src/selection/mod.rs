//! Tool selection: turning a question into a validated tool call.
//!
//! Two strategies share the [`ToolSelector`] trait:
//!
//! - [`ModelSelector`] shows a language model the tool catalog and worked
//!   examples, then parses its `{"tool_name", "parameters"}` reply.
//! - [`KeywordSelector`] matches trigger words, for runs without a model.
//!
//! Either way the result is a [`SalesQuery`](sales_assistant_core::SalesQuery),
//! so a tool outside the catalog or a call with missing parameters never
//! reaches the transport.

mod error;
mod examples;
mod keyword;
mod parser;
mod prompt;
mod selector;

pub use error::{ExamplesError, SelectionError};
pub use examples::{
    ToolExampleConfig, ToolExamplesConfig, WorkedExample, default_examples, load_examples,
    validate_examples,
};
pub use keyword::{KeywordSelector, select_by_keywords};
pub use parser::{extract_json_object, parse_selection};
pub use prompt::render_selection_prompt;
pub use selector::{ModelSelector, ToolSelector};
