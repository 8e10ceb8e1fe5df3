//! Sales Assistant Client - natural-language front end for the tool server.
//!
//! A question flows through four steps:
//!
//! 1. [`selection`] picks a tool and parameters, by model or by keyword
//! 2. [`transport`] invokes the tool on the server over stdio
//! 3. [`normalize`] extracts the data from the tool result
//! 4. [`render`] turns the data into text
//!
//! [`session::SalesAssistant`] ties the steps together and runs the
//! interactive loop.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod claude;
pub mod config;
pub mod error;
pub mod normalize;
pub mod render;
pub mod selection;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, ConfigError, ServerCommand};
pub use error::ClientError;
pub use session::{Answer, SalesAssistant, build_selector};
pub use transport::{StdioTransport, ToolTransport, TransportError};
