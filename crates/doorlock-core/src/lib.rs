pub mod constants;
pub mod directory;
pub mod error;
pub mod types;

pub use directory::CardDirectory;
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
