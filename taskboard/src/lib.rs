//! `Taskboard`: kanban board client with optimistic synchronization.

pub mod board;
pub mod config;
pub mod notify;
pub mod render;
pub mod session;
pub mod store;
