//! Remote authority client for the door lock controller.
//!
//! The remote authority is the member-management service that owns the card
//! directory. This crate provides the [`Authority`] trait the controller is
//! written against, an HTTPS implementation built on `reqwest`, and a
//! scriptable mock for tests.
//!
//! # Components
//!
//! - **HttpAuthority**: client for the status, directory and seen endpoints
//! - **MockAuthority**: in-process stand-in with scripted answers
//!
//! # Example
//!
//! ```no_run
//! use doorlock_network::{Authority, AuthorityConfig, HttpAuthority};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let authority = HttpAuthority::new(AuthorityConfig {
//!     api_key: "secret".to_string(),
//!     ..AuthorityConfig::default()
//! })?;
//!
//! let marker = authority.fetch_change_marker().await?;
//! let directory = authority.fetch_directory().await?;
//! println!("{marker}: {} cards", directory.len());
//! # Ok(())
//! # }
//! ```

mod authority;
mod error;
mod http;
pub mod mock;

pub use authority::Authority;
pub use error::{AuthorityError, AuthorityResult, Endpoint};
pub use http::{AuthorityConfig, HttpAuthority};
