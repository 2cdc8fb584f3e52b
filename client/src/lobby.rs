//! Room discovery and creation. Pure metadata CRUD, except that creation
//! establishes the ledger invariants every later transfer relies on: the
//! bank reserve, the creator's starting balance, and the empty log.

use crate::{paths, session, Error, Result};
use bankroll_store::Store;
use bankroll_types::{
    Identity, PlayerRecord, Room, RoomId, UserProfile, BANK_RESERVE, BANK_UID,
    DEFAULT_INITIAL_BALANCE,
};
use tracing::{info, warn};

/// Options applied at room creation.
#[derive(Clone, Debug, Default)]
pub struct CreateRoomOptions {
    /// Starting balance granted to each joining player (default 1500).
    pub initial_player_balance: Option<i64>,
}

/// Room discovery and creation for one identity.
pub struct Lobby<S: Store> {
    store: S,
    identity: Identity,
}

impl<S: Store> Lobby<S> {
    pub fn new(store: S, identity: Identity) -> Self {
        Self { store, identity }
    }

    /// Create a room seeded with the bank reserve, an empty log, and the
    /// creator's player record, and register the creator's disconnect
    /// cleanup. Returns the store-assigned room id.
    pub async fn create_room(&self, name: &str, options: CreateRoomOptions) -> Result<RoomId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyRoomName);
        }
        if let Some(balance) = options.initial_player_balance {
            if balance <= 0 {
                return Err(Error::InvalidAmount {
                    amount: balance.to_string(),
                    min: 1,
                });
            }
        }

        let profile: UserProfile = self
            .store
            .read(&paths::user(&self.identity.user_id))
            .await?
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();

        let mut room = Room {
            name: name.to_string(),
            bank: BANK_RESERVE,
            initial_player_balance: options.initial_player_balance,
            created_at: chrono::Utc::now().timestamp_millis(),
            ..Room::default()
        };
        let starting_balance = options
            .initial_player_balance
            .unwrap_or(DEFAULT_INITIAL_BALANCE);
        if self.identity.user_id != BANK_UID {
            let player_name = profile.player_name(
                self.identity.display_name.as_deref(),
                self.identity.email.as_deref(),
            );
            room.players.insert(
                self.identity.user_id.clone(),
                PlayerRecord::new(player_name, profile.player_avatar(), starting_balance),
            );
        }

        let room_id = self.store.generate_key();
        let value = serde_json::to_value(&room).expect("room serializes");
        self.store.write(&paths::room(&room_id), value).await?;
        if self.identity.user_id != BANK_UID {
            self.store
                .on_disconnect_remove(&paths::player(&room_id, &self.identity.user_id))
                .await?;
        }
        info!(%room_id, name, "created room");
        Ok(room_id)
    }

    /// All rooms, most recently created first. Malformed entries are
    /// skipped.
    pub async fn list_rooms(&self) -> Result<Vec<(RoomId, Room)>> {
        let Some(value) = self.store.read(paths::ROOMS).await? else {
            return Ok(Vec::new());
        };
        let Some(map) = value.as_object() else {
            return Ok(Vec::new());
        };
        let mut rooms: Vec<(RoomId, Room)> = Vec::with_capacity(map.len());
        for (id, entry) in map {
            match serde_json::from_value::<Room>(entry.clone()) {
                Ok(room) => rooms.push((id.clone(), room)),
                Err(e) => warn!(room_id = %id, "skipping malformed room: {e}"),
            }
        }
        rooms.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(rooms)
    }

    /// Join a room by id: verifies existence and runs the idempotent
    /// player bootstrap. Attaching a [`crate::RoomSession`] afterwards
    /// re-runs the bootstrap harmlessly and registers presence.
    pub async fn join_room(&self, room_id: &str) -> Result<()> {
        session::bootstrap_player(&self.store, room_id, &self.identity).await?;
        Ok(())
    }
}
