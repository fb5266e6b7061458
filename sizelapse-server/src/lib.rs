//! # sizelapse-server
//!
//! HTTP surface for sizelapse: the history data contract, server-rendered
//! frames and an optional static front end.

pub mod api;
pub mod server;

pub use server::SizelapseServer;
