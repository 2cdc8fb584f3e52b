//! Client-side core of the bankroll companion: lobby (room discovery and
//! creation), room sessions (live synchronization plus transfer
//! submission), and presence lifecycle.
//!
//! All contended mutation goes through the store's optimistic transaction;
//! nothing here holds client-side locks across awaits.

pub mod lobby;
pub mod presence;
pub mod session;
pub mod transfer;

pub use lobby::{CreateRoomOptions, Lobby};
pub use presence::PresenceGuard;
pub use session::{EventStream, RoomSession, SessionEvent};
pub use transfer::parse_amount;

use bankroll_types::BANK_UID;
use thiserror::Error;

/// Error type for client operations. Every variant except `Store` is an
/// expected, recoverable outcome of normal operation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("please enter a valid amount, at least {min} (got {amount})")]
    InvalidAmount { amount: String, min: i64 },
    #[error("insufficient balance")]
    InsufficientFunds,
    #[error("recipient not found in room")]
    RecipientNotFound,
    #[error("transfer failed, possibly due to insufficient balance or a connectivity issue")]
    TransferFailed,
    #[error("room not found")]
    RoomNotFound,
    #[error("you are not a player in this room")]
    NotInRoom,
    #[error("only the bank can update room settings")]
    NotBank,
    #[error("room name cannot be empty")]
    EmptyRoomName,
    #[error("no settings provided")]
    EmptySettings,
    #[error("store error: {0}")]
    Store(#[from] bankroll_store::Error),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) mod paths {
    use super::BANK_UID;

    pub const ROOMS: &str = "rooms";

    pub fn room(room_id: &str) -> String {
        format!("rooms/{room_id}")
    }

    pub fn player(room_id: &str, user_id: &str) -> String {
        format!("rooms/{room_id}/players/{user_id}")
    }

    pub fn user(user_id: &str) -> String {
        format!("users/{user_id}")
    }

    pub fn bank_avatar() -> String {
        format!("users/{BANK_UID}/avatarURL")
    }
}
