pub mod config;
pub mod error;
pub mod id;

pub use config::Config;
pub use error::*;
pub use id::{IdProvider, UuidProvider};
