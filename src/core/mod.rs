//! Core types shared across the codebase.

mod env;
mod state;

pub use env::Env;
pub use state::{is_shutdown, register_shutdown_signal, setup_shutdown_handler};
