//! I/O helpers for the worker: filesystem, git, processes, model service,
//! and durable records.

pub mod config;
pub mod events;
pub mod git;
pub mod model;
pub mod process;
pub mod prompt;
pub mod store;
pub mod tasklist;
pub mod tools;
