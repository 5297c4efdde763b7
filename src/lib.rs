pub mod analyzer;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filter;
pub mod model;
pub mod state;
pub mod workflow;

pub use error::AppError;
pub use state::AppState;
