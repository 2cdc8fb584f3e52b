//! The transfer protocol: validates a transfer against the local mirror,
//! then applies it as one optimistic transaction scoped at the room root,
//! so the sender debit, the recipient credit, and the log append land
//! together or not at all.

use crate::{paths, Error, Result};
use bankroll_store::{Store, TransactOutcome, TransactionUpdate};
use bankroll_types::{LogEntry, Party, Room, LOG_TYPE_MONEY_TRANSFER};
use serde_json::Value;
use tracing::{debug, warn};

/// Parse user input into a transfer amount. Fractional input is rejected
/// outright rather than truncated; `min` is the room's minimum transfer
/// amount derived from its display granularity.
pub fn parse_amount(input: &str, min: i64) -> Result<i64> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let invalid = || Error::InvalidAmount {
        amount: input.to_string(),
        min,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    if amount < min.max(1) {
        return Err(invalid());
    }
    Ok(amount)
}

/// Apply `amount` from `sender` to `recipient` within the room snapshot.
/// `None` means the conditions no longer hold and the transaction must
/// abort. The bank's pool is `room.bank`; it is debited without a funds
/// check, so it may go negative.
fn apply_transfer(
    room: &mut Room,
    sender: &Party,
    recipient: &Party,
    amount: i64,
) -> Option<()> {
    match sender {
        Party::Bank => room.bank -= amount,
        Party::Player(id) => {
            let player = room.players.get_mut(id)?;
            if player.balance < amount {
                return None;
            }
            player.balance -= amount;
        }
    }
    match recipient {
        Party::Bank => room.bank += amount,
        Party::Player(id) => {
            let player = room.players.get_mut(id)?;
            player.balance += amount;
        }
    }
    Some(())
}

/// Submit a transfer. Not idempotent: two calls with the same arguments
/// produce two transfers; the caller issues exactly one call per user
/// action and serializes its own calls.
///
/// `cached` is the caller's live mirror of the room, used only for fast
/// advisory rejection; the authoritative checks run inside the transaction
/// against whatever snapshot the store hands the closure.
pub async fn submit_transfer<S: Store>(
    store: &S,
    room_id: &str,
    sender: &Party,
    recipient: &Party,
    amount: i64,
    cached: &Room,
) -> Result<LogEntry> {
    let min = cached.min_transfer_amount();
    if amount < min.max(1) {
        return Err(Error::InvalidAmount {
            amount: amount.to_string(),
            min,
        });
    }
    if let Party::Player(id) = sender {
        let player = cached.player(id).ok_or(Error::NotInRoom)?;
        if player.balance < amount {
            return Err(Error::InsufficientFunds);
        }
    }
    if let Party::Player(id) = recipient {
        if cached.player(id).is_none() {
            return Err(Error::RecipientNotFound);
        }
    }

    let log_key = store.generate_key();
    let timestamp = chrono::Utc::now().to_rfc3339();
    let outcome: TransactOutcome = store
        .transact(&paths::room(room_id), |current: Option<Value>| {
            // Everything below derives from the snapshot this invocation
            // received; the store re-invokes with a fresh one on conflict.
            let Some(value) = current else {
                return TransactionUpdate::Abort;
            };
            let Ok(mut room) = serde_json::from_value::<Room>(value) else {
                return TransactionUpdate::Abort;
            };

            let sender_name = match sender.display_name(&room) {
                Some(name) => name.to_string(),
                None => return TransactionUpdate::Abort,
            };
            let recipient_name = match recipient.display_name(&room) {
                Some(name) => name.to_string(),
                None => return TransactionUpdate::Abort,
            };

            if apply_transfer(&mut room, sender, recipient, amount).is_none() {
                return TransactionUpdate::Abort;
            }

            room.log.insert(
                log_key.clone(),
                LogEntry {
                    timestamp: timestamp.clone(),
                    kind: LOG_TYPE_MONEY_TRANSFER.to_string(),
                    from: sender.uid().to_string(),
                    to: recipient.uid().to_string(),
                    amount,
                    message: format!("{sender_name} paid {recipient_name} {amount}"),
                },
            );

            match serde_json::to_value(&room) {
                Ok(value) => TransactionUpdate::Set(value),
                Err(_) => TransactionUpdate::Abort,
            }
        })
        .await?;

    if !outcome.committed {
        warn!(room_id, %sender, %recipient, amount, "transfer did not commit");
        return Err(Error::TransferFailed);
    }

    // The committed snapshot is the source of truth; read the entry back
    // out of it rather than trusting local reconstruction.
    let room: Room = outcome
        .snapshot
        .and_then(|value| serde_json::from_value(value).ok())
        .ok_or(Error::TransferFailed)?;
    let entry = room.log.get(&log_key).cloned().ok_or(Error::TransferFailed)?;
    debug!(room_id, key = %log_key, message = %entry.message, "transfer committed");
    Ok(entry)
}
