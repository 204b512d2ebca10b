//! Shared wire definitions for the Taskboard REST and notification APIs.

pub mod api;
pub mod codec;
pub mod notification;
pub mod sample;
pub mod task;
