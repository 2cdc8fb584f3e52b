mod constants;
mod party;
mod profile;
mod room;

pub use constants::*;
pub use party::*;
pub use profile::*;
pub use room::*;

/// Opaque store-assigned room identifier.
pub type RoomId = String;

/// Stable identifier supplied by the identity provider.
pub type PlayerId = String;

/// Store-generated, insertion-ordered key of a log entry.
pub type LogId = String;

#[cfg(test)]
mod tests;
