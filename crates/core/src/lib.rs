//! Sales Assistant Core - Shared types library.
//!
//! This crate provides the types shared by the sales assistant components:
//! - `server` - Tool server answering analytics queries over stdio
//! - `client` - Natural-language front end that selects and invokes tools
//! - `cli` - Command-line entry point
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used on both sides of the protocol.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and the records returned by the tools
//! - [`catalog`] - The static tool catalog
//! - [`query`] - Validated tool calls
//! - [`protocol`] - JSON-RPC / tool-call wire types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod protocol;
pub mod query;
pub mod types;

pub use catalog::{ToolDefinition, ToolName, UnknownTool, get_tool_by_name, tool_catalog};
pub use query::{QueryError, SalesQuery};
pub use types::*;
