mod config;
mod dedupe;
mod error;
mod models;

pub(crate) use config::*;
pub(crate) use dedupe::*;
pub use error::*;
pub use models::*;
