//! devserve - protocol-selecting development web server launcher.
//!
//! Starts either a synchronous (WSGI-style) or asynchronous (ASGI-style)
//! serving stack, builds the handler chain for it, and classifies completed
//! requests for console logging.

pub mod app;
pub mod cli;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod handler;
pub mod logaction;
pub mod server;
pub mod wsgi;
