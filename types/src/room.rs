use crate::{LogId, PlayerId, DEFAULT_INITIAL_BALANCE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display granularity for a room's currency. Only used to derive the
/// minimum transfer amount; transfer correctness never depends on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameUnit {
    #[default]
    None,
    Thousands,
    Millions,
    Billions,
}

impl GameUnit {
    pub fn multiplier(&self) -> i64 {
        match self {
            GameUnit::None => 1,
            GameUnit::Thousands => 1_000,
            GameUnit::Millions => 1_000_000,
            GameUnit::Billions => 1_000_000_000,
        }
    }
}

/// A player's record inside a room. `balance` is the only field the
/// transfer protocol mutates; the rest is profile metadata copied in at
/// join time and re-synced on drift.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub balance: i64,
    #[serde(rename = "avatarURL", default)]
    pub avatar_url: String,
    #[serde(rename = "characterId", default)]
    pub character_id: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, avatar_url: impl Into<String>, balance: i64) -> Self {
        Self {
            name: name.into(),
            balance,
            avatar_url: avatar_url.into(),
            character_id: String::new(),
            position: 0,
            properties: BTreeMap::new(),
        }
    }
}

/// Immutable, append-only record of one committed transfer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO-8601 wall-clock time at the client that committed the transfer.
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub from: PlayerId,
    pub to: PlayerId,
    pub amount: i64,
    pub message: String,
}

/// Shared room state as persisted under `rooms/{roomId}`.
///
/// `log` is keyed by store push ids, which sort lexicographically in
/// insertion order, so iterating the map is iteration in append order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub bank: i64,
    #[serde(default)]
    pub players: BTreeMap<PlayerId, PlayerRecord>,
    #[serde(default)]
    pub log: BTreeMap<LogId, LogEntry>,
    #[serde(
        rename = "initialPlayerBalance",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_player_balance: Option<i64>,
    #[serde(rename = "currencySymbol", default)]
    pub currency_symbol: String,
    #[serde(rename = "currencyCode", default)]
    pub currency_code: String,
    #[serde(rename = "gameUnit", default)]
    pub game_unit: GameUnit,
    /// Epoch milliseconds, set once at creation (lobby filtering).
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
}

impl Room {
    pub fn player(&self, id: &str) -> Option<&PlayerRecord> {
        self.players.get(id)
    }

    /// Balance granted to a newly joining player.
    pub fn initial_balance(&self) -> i64 {
        self.initial_player_balance
            .unwrap_or(DEFAULT_INITIAL_BALANCE)
    }

    /// Smallest transferable amount given the room's display granularity.
    pub fn min_transfer_amount(&self) -> i64 {
        self.game_unit.multiplier()
    }

    /// Log entries in append order, most recent last.
    pub fn log_in_order(&self) -> impl Iterator<Item = (&LogId, &LogEntry)> {
        self.log.iter()
    }
}

/// Partial update to a room's presentation settings. Only the bank
/// identity may apply one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSettingsPatch {
    #[serde(
        rename = "currencySymbol",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub currency_symbol: Option<String>,
    #[serde(
        rename = "currencyCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub currency_code: Option<String>,
    #[serde(rename = "gameUnit", default, skip_serializing_if = "Option::is_none")]
    pub game_unit: Option<GameUnit>,
    #[serde(
        rename = "initialPlayerBalance",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_player_balance: Option<i64>,
}

impl RoomSettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.currency_symbol.is_none()
            && self.currency_code.is_none()
            && self.game_unit.is_none()
            && self.initial_player_balance.is_none()
    }
}
