//! Remote authority abstraction.

use std::future::Future;

use doorlock_core::{CardDirectory, CardId, ChangeMarker};

use crate::error::AuthorityResult;

/// The remote service that owns the card directory.
///
/// The controller only ever pulls from the authority: it polls a cheap
/// change marker, fetches the whole directory when the marker moves, and
/// reports each granted scan as "seen".
///
/// Methods are declared as `fn -> impl Future + Send` so loops generic over
/// the authority can be spawned onto the runtime. Implementations write a
/// plain `async fn`.
pub trait Authority: Send + Sync {
    /// Fetch the current change marker.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, transport failure, non-success status,
    /// or a response without the marker field.
    fn fetch_change_marker(&self) -> impl Future<Output = AuthorityResult<ChangeMarker>> + Send;

    /// Fetch the full card directory.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, transport failure, non-success status,
    /// or a body that is not a card directory.
    fn fetch_directory(&self) -> impl Future<Output = AuthorityResult<CardDirectory>> + Send;

    /// Report that `card` was just granted access.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, transport failure or non-success status.
    fn mark_seen(&self, card: &CardId) -> impl Future<Output = AuthorityResult<()>> + Send;
}
