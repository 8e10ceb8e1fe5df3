//! Sales Assistant Server library.
//!
//! A tool server exposing three read-only sales analytics tools over
//! line-delimited JSON-RPC on stdio:
//!
//! - `GetTopSellingProducts` - best sellers of a shop
//! - `GetCustomerOrders` - a customer's order history
//! - `GetShopPerformance` - aggregate metrics of a shop
//!
//! The binary wires [`config::ServerConfig`], [`db::PgSalesStore`],
//! [`tools::ToolExecutor`] and [`handler::McpHandler`] together and hands
//! them to [`transport::serve_stdio`]. The library form lets tests drive the
//! same handler in-process against any [`db::SalesStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod handler;
pub mod tools;
pub mod transport;

pub use handler::McpHandler;
pub use tools::{ToolError, ToolExecutor};
