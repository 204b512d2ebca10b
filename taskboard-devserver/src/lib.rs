//! `Taskboard` dev server library.
//!
//! An in-memory stand-in for the Taskboard backend: the REST routes the
//! board uses plus the notification WebSocket. Exposed as a library so
//! client tests can run it in-process.

pub mod config;
pub mod server;
pub mod store;
