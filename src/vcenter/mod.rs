mod collector;
mod config;
mod models;

pub use collector::*;
pub use config::*;
