pub mod common;
pub mod config;
pub mod export;
pub mod service;
pub mod targets;
pub mod vcenter;

pub use config::*;
