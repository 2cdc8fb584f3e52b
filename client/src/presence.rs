//! Presence lifecycle: a joining client registers its own player record
//! for store-side deletion on unclean disconnect, so abandoned sessions do
//! not leave phantom players holding balances. Best effort only; a player
//! can transiently appear present after a real disconnect.

use crate::{paths, Result};
use bankroll_store::Store;
use tracing::debug;

/// Registration of disconnect cleanup for one player record. Call
/// [`PresenceGuard::release`] on a clean exit to withdraw it; the record
/// itself persists either way.
pub struct PresenceGuard<S: Store> {
    store: S,
    path: String,
}

impl<S: Store> PresenceGuard<S> {
    pub(crate) async fn register(store: &S, room_id: &str, user_id: &str) -> Result<Self> {
        let path = paths::player(room_id, user_id);
        store.on_disconnect_remove(&path).await?;
        debug!(%path, "registered disconnect cleanup");
        Ok(Self {
            store: store.clone(),
            path,
        })
    }

    /// Clean exit: the store no longer deletes the record on disconnect.
    pub async fn release(self) -> Result<()> {
        self.store.cancel_disconnect_cleanup(&self.path).await?;
        debug!(path = %self.path, "cancelled disconnect cleanup");
        Ok(())
    }
}
