pub mod config;
pub mod error;
pub mod types;

pub use config::ChatdeskConfig;
pub use error::{ChatdeskError, Result};
pub use types::*;
