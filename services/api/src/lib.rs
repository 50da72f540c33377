//! Classroom API Library Crate
//!
//! The request endpoints for the support cycle and class review, the
//! streamed lecture socket, and the routing around them. The `api` binary is
//! a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
