//! Live room session: holds an open watch on the room subtree, mirrors
//! every snapshot wholesale, and derives per-player balance-change events
//! for downstream effects (sound, voice, avatar reactions).

use crate::{paths, presence::PresenceGuard, transfer, Error, Result};
use bankroll_store::{Store, WatchStream};
use bankroll_types::{
    Identity, LogEntry, Party, PlayerId, PlayerRecord, Room, RoomId, RoomSettingsPatch,
    UserProfile, BANK_UID,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Event emitted by a session's watch task.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Full replacement snapshot of the room.
    Snapshot(Room),
    /// A player's observed balance moved between two snapshots. Credits
    /// landing between two observations collapse into their net effect.
    BalanceChanged {
        player: PlayerId,
        previous: i64,
        current: i64,
    },
    /// The watched room value became absent.
    RoomVanished,
}

/// Stream of [`SessionEvent`]s backed by a forwarding task. Dropping the
/// stream stops the task.
pub struct EventStream {
    receiver: mpsc::Receiver<SessionEvent>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

impl EventStream {
    /// Receive the next event from the stream.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        self.receiver.recv().await
    }
}

impl futures::Stream for EventStream {
    type Item = SessionEvent;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// One client's attachment to one room: store handle, identity, and the
/// live mirror, passed explicitly to everything that needs them.
pub struct RoomSession<S: Store> {
    store: S,
    room_id: RoomId,
    identity: Identity,
    profile: UserProfile,
    mirror: Arc<RwLock<Option<Room>>>,
    presence: Option<PresenceGuard<S>>,
}

impl<S: Store> RoomSession<S> {
    /// Attach to a room: bootstrap the player record idempotently,
    /// register disconnect cleanup, and start watching. Fails with
    /// [`Error::RoomNotFound`] when the room does not exist.
    pub async fn attach(store: S, room_id: &str, identity: Identity) -> Result<(Self, EventStream)> {
        let profile = bootstrap_player(&store, room_id, &identity).await?;

        // The bank identity is not a real player and gets no record, so
        // there is nothing to clean up for it either.
        let presence = if identity.user_id == BANK_UID {
            None
        } else {
            Some(PresenceGuard::register(&store, room_id, &identity.user_id).await?)
        };

        let seed = read_room(&store, room_id).await?;
        let session = Self {
            store,
            room_id: room_id.to_string(),
            identity,
            profile,
            mirror: Arc::new(RwLock::new(Some(seed))),
            presence,
        };
        let events = session.subscribe().await?;
        info!(room_id, user_id = %session.identity.user_id, "attached to room");
        Ok((session, events))
    }

    /// Start a fresh subscription. The previous-balance side table is owned
    /// by the watch task, so resubscribing resets it.
    pub async fn subscribe(&self) -> Result<EventStream> {
        let watch = self.store.watch(&paths::room(&self.room_id)).await?;
        let mirror = self.mirror.clone();
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = tokio::spawn(forward_snapshots(watch, mirror, tx));
        Ok(EventStream {
            receiver: rx,
            _handle: handle,
        })
    }

    /// Latest observed room state, absent until the first snapshot (or
    /// after the room vanished).
    pub fn snapshot(&self) -> Option<Room> {
        self.mirror.read().expect("mirror lock poisoned").clone()
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Submit a transfer from this session's identity to `recipient_id`.
    /// Callers serialize their own submissions; nothing here deduplicates.
    pub async fn submit_transfer(&self, recipient_id: &str, amount: i64) -> Result<LogEntry> {
        if recipient_id.is_empty() {
            return Err(Error::RecipientNotFound);
        }
        let cached = self.snapshot().ok_or(Error::RoomNotFound)?;
        let sender = Party::resolve(&self.identity.user_id);
        let recipient = Party::resolve(recipient_id);
        transfer::submit_transfer(
            &self.store,
            &self.room_id,
            &sender,
            &recipient,
            amount,
            &cached,
        )
        .await
    }

    /// Parse raw user input against the room's minimum transfer amount and
    /// submit it.
    pub async fn submit_transfer_input(
        &self,
        recipient_id: &str,
        amount: &str,
    ) -> Result<LogEntry> {
        let cached = self.snapshot().ok_or(Error::RoomNotFound)?;
        let amount = transfer::parse_amount(amount, cached.min_transfer_amount())?;
        self.submit_transfer(recipient_id, amount).await
    }

    /// Patch room presentation settings. Only the bank identity may call
    /// this; the check is a convention-level id comparison, not access
    /// control (the store's own rule layer is the real boundary).
    pub async fn update_settings(&self, patch: RoomSettingsPatch) -> Result<()> {
        if self.identity.user_id != BANK_UID {
            return Err(Error::NotBank);
        }
        if patch.is_empty() {
            return Err(Error::EmptySettings);
        }
        if let Some(balance) = patch.initial_player_balance {
            if balance <= 0 {
                return Err(Error::InvalidAmount {
                    amount: balance.to_string(),
                    min: 1,
                });
            }
        }
        let Value::Object(fields) = serde_json::to_value(&patch).expect("patch serializes") else {
            unreachable!("settings patch is a struct");
        };
        self.store.merge(&paths::room(&self.room_id), fields).await?;
        info!(room_id = %self.room_id, "room settings updated");
        Ok(())
    }

    /// Watch the bank's avatar URL (displayed on the bank tile).
    pub async fn watch_bank_avatar(&self) -> Result<WatchStream> {
        Ok(self.store.watch(&paths::bank_avatar()).await?)
    }

    /// Clean exit: withdraw the disconnect cleanup registration. The
    /// player record persists.
    pub async fn leave_cleanly(mut self) -> Result<()> {
        if let Some(guard) = self.presence.take() {
            guard.release().await?;
        }
        Ok(())
    }
}

async fn read_room<S: Store>(store: &S, room_id: &str) -> Result<Room> {
    let value = store
        .read(&paths::room(room_id))
        .await?
        .ok_or(Error::RoomNotFound)?;
    serde_json::from_value(value).map_err(|e| {
        error!(room_id, "malformed room value: {e}");
        Error::RoomNotFound
    })
}

/// Ensure the joining user has a player record, creating one with the
/// room's configured initial balance or patching drifted profile fields
/// (never `balance`). Safe to run twice: both runs write the same shape to
/// a key only this client writes.
pub(crate) async fn bootstrap_player<S: Store>(
    store: &S,
    room_id: &str,
    identity: &Identity,
) -> Result<UserProfile> {
    let room = read_room(store, room_id).await?;
    let profile: UserProfile = store
        .read(&paths::user(&identity.user_id))
        .await?
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();

    if identity.user_id == BANK_UID {
        return Ok(profile);
    }

    let name = profile.player_name(
        identity.display_name.as_deref(),
        identity.email.as_deref(),
    );
    let avatar = profile.player_avatar();
    let player_path = paths::player(room_id, &identity.user_id);

    match room.player(&identity.user_id) {
        None => {
            let record = PlayerRecord::new(name, avatar, room.initial_balance());
            let value = serde_json::to_value(&record).expect("player record serializes");
            store.write(&player_path, value).await?;
            debug!(room_id, user_id = %identity.user_id, "created player record");
        }
        Some(existing) => {
            let mut updates = Map::new();
            if existing.name != name {
                updates.insert("name".to_string(), Value::String(name));
            }
            if existing.avatar_url != avatar {
                updates.insert("avatarURL".to_string(), Value::String(avatar));
            }
            if !updates.is_empty() {
                store.merge(&player_path, updates).await?;
                debug!(room_id, user_id = %identity.user_id, "re-synced player profile");
            }
        }
    }
    Ok(profile)
}

/// Watch-task body: replace the mirror wholesale per snapshot (the store
/// delivers full values, so no merging), diff balances against a local
/// side table, and forward events until the consumer goes away.
async fn forward_snapshots(
    mut watch: WatchStream,
    mirror: Arc<RwLock<Option<Room>>>,
    tx: mpsc::Sender<SessionEvent>,
) {
    let mut last_seen: HashMap<PlayerId, i64> = HashMap::new();
    'watching: while let Some(observed) = watch.recv().await {
        match observed {
            Some(value) => {
                let room: Room = match serde_json::from_value(value) {
                    Ok(room) => room,
                    Err(e) => {
                        error!("ignoring malformed room snapshot: {e}");
                        continue;
                    }
                };

                let mut changes = Vec::new();
                for (id, record) in &room.players {
                    // First observation of a player only seeds the slot.
                    if let Some(previous) = last_seen.insert(id.clone(), record.balance) {
                        if previous != record.balance {
                            changes.push(SessionEvent::BalanceChanged {
                                player: id.clone(),
                                previous,
                                current: record.balance,
                            });
                        }
                    }
                }
                last_seen.retain(|id, _| room.players.contains_key(id));

                *mirror.write().expect("mirror lock poisoned") = Some(room.clone());
                if tx.send(SessionEvent::Snapshot(room)).await.is_err() {
                    break 'watching;
                }
                for event in changes {
                    if tx.send(event).await.is_err() {
                        break 'watching;
                    }
                }
            }
            None => {
                *mirror.write().expect("mirror lock poisoned") = None;
                last_seen.clear();
                if tx.send(SessionEvent::RoomVanished).await.is_err() {
                    break;
                }
            }
        }
    }
}
