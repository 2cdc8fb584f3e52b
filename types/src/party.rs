use crate::{PlayerId, Room, BANK_DISPLAY_NAME, BANK_UID};
use std::fmt;

/// One side of a transfer, resolved once at the API boundary so the
/// transfer engine can match on the tag instead of comparing raw ids
/// against the bank constant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Party {
    Bank,
    Player(PlayerId),
}

impl Party {
    pub fn resolve(id: &str) -> Self {
        if id == BANK_UID {
            Party::Bank
        } else {
            Party::Player(id.to_string())
        }
    }

    pub fn is_bank(&self) -> bool {
        matches!(self, Party::Bank)
    }

    /// Identifier as persisted in log entries.
    pub fn uid(&self) -> &str {
        match self {
            Party::Bank => BANK_UID,
            Party::Player(id) => id,
        }
    }

    /// Display name at the time of the given snapshot. `None` when a
    /// player party has no record in the room.
    pub fn display_name<'a>(&'a self, room: &'a Room) -> Option<&'a str> {
        match self {
            Party::Bank => Some(BANK_DISPLAY_NAME),
            Party::Player(id) => room.player(id).map(|p| p.name.as_str()),
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uid())
    }
}
