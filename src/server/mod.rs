//! Server module for Pixel
//!
//! Contains the main server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for all server components
//! - `loader`: Configuration loading from files and environment
//! - `validation`: Configuration validation
//! - `background_tasks`: Session sweeper
//! - `init`: Main server initialization and run loop

mod background_tasks;
pub mod config;
mod init;
mod loader;
mod validation;

// Re-export public API
pub use init::run;
pub use loader::load_config;
