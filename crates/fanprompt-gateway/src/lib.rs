//! fanprompt-gateway - HTTP front end for fanprompt
//!
//! Exposes the fan-out, file, board and listing operations as JSON
//! endpoints so other tools can drive them over HTTP.

pub mod auth;
pub mod protocol;
pub mod server;

pub use server::{GatewayServer, GatewayState};
