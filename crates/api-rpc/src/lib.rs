//! JSON-RPC API Layer
//!
//! Implements the JSON-RPC 2.0 server for the Opsmedic Host Agent.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::RpcServer;
