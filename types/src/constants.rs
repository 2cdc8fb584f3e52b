/// Well-known identifier for the bank counterparty. Not a real
/// authenticated user; the bank's pool lives in `Room::bank` and it never
/// fails the funds check.
pub const BANK_UID: &str = "bank";

/// Display name used for the bank in log messages.
pub const BANK_DISPLAY_NAME: &str = "Bank";

/// Balance granted to a player on first join when the room does not
/// configure its own.
pub const DEFAULT_INITIAL_BALANCE: i64 = 1_500;

/// Bank pool seeded at room creation.
pub const BANK_RESERVE: i64 = 100_000;

/// Log entry type tag for balance transfers.
pub const LOG_TYPE_MONEY_TRANSFER: &str = "moneyTransfer";
