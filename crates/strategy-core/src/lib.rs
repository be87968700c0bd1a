pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
mod http;
pub mod io;
pub mod model;
pub mod persist;
pub mod session;
pub mod store;
pub mod suggest;

pub use error::{Result, StrategyError};
