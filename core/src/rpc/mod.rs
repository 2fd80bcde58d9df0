//! Peer-to-peer remote call surface (§4.7, §4.8): request authentication
//! and transport-agnostic method handlers.

pub mod auth;
pub mod methods;
