use super::*;
use serde_json::json;

#[test]
fn room_deserializes_sparse_tree_value() {
    // A freshly created room has no players/log keys at all once the
    // store prunes empty maps.
    let value = json!({
        "name": "friday night",
        "bank": 100_000,
        "createdAt": 1_700_000_000_000i64,
    });
    let room: Room = serde_json::from_value(value).unwrap();
    assert_eq!(room.name, "friday night");
    assert_eq!(room.bank, 100_000);
    assert!(room.players.is_empty());
    assert!(room.log.is_empty());
    assert_eq!(room.initial_balance(), DEFAULT_INITIAL_BALANCE);
    assert_eq!(room.game_unit, GameUnit::None);
    assert_eq!(room.min_transfer_amount(), 1);
}

#[test]
fn room_field_names_match_tree_layout() {
    let mut room = Room {
        name: "r".into(),
        bank: 1,
        initial_player_balance: Some(2_000),
        game_unit: GameUnit::Thousands,
        ..Room::default()
    };
    room.players
        .insert("u1".into(), PlayerRecord::new("Ann", "http://a", 1_500));

    let value = serde_json::to_value(&room).unwrap();
    assert_eq!(value["initialPlayerBalance"], 2_000);
    assert_eq!(value["gameUnit"], "thousands");
    assert_eq!(value["players"]["u1"]["avatarURL"], "http://a");
    assert!(value.get("currencySymbol").is_some());
}

#[test]
fn game_unit_multipliers() {
    assert_eq!(GameUnit::None.multiplier(), 1);
    assert_eq!(GameUnit::Thousands.multiplier(), 1_000);
    assert_eq!(GameUnit::Millions.multiplier(), 1_000_000);
    assert_eq!(GameUnit::Billions.multiplier(), 1_000_000_000);
}

#[test]
fn log_iterates_in_push_key_order() {
    let mut room = Room::default();
    let entry = |msg: &str| LogEntry {
        timestamp: "2026-01-01T00:00:00Z".into(),
        kind: LOG_TYPE_MONEY_TRANSFER.into(),
        from: "a".into(),
        to: "b".into(),
        amount: 1,
        message: msg.into(),
    };
    // Push ids are lexicographically increasing; insertion order in the
    // map must therefore be key order.
    room.log.insert("-Nb0000000000000000A".into(), entry("first"));
    room.log.insert("-Nb0000000000000000C".into(), entry("third"));
    room.log.insert("-Nb0000000000000000B".into(), entry("second"));

    let messages: Vec<_> = room.log_in_order().map(|(_, e)| e.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
}

#[test]
fn party_resolution_and_display() {
    assert_eq!(Party::resolve(BANK_UID), Party::Bank);
    assert_eq!(Party::resolve("u7"), Party::Player("u7".into()));
    assert!(Party::Bank.is_bank());
    assert_eq!(Party::Bank.uid(), BANK_UID);

    let mut room = Room::default();
    room.players
        .insert("u7".into(), PlayerRecord::new("Bo", "", 0));
    assert_eq!(Party::Bank.display_name(&room), Some(BANK_DISPLAY_NAME));
    assert_eq!(
        Party::resolve("u7").display_name(&room),
        Some("Bo")
    );
    assert_eq!(Party::resolve("ghost").display_name(&room), None);
}

#[test]
fn profile_name_fallback_chain() {
    let profile = UserProfile::default();
    assert_eq!(profile.player_name(Some("Disp"), Some("a@b.c")), "Disp");
    assert_eq!(profile.player_name(None, Some("a@b.c")), "a@b.c");

    let named = UserProfile {
        name: Some("Configured".into()),
        ..UserProfile::default()
    };
    assert_eq!(named.player_name(Some("Disp"), None), "Configured");
}

#[test]
fn settings_patch_serializes_only_present_fields() {
    let patch = RoomSettingsPatch {
        currency_code: Some("VND".into()),
        ..RoomSettingsPatch::default()
    };
    let value = serde_json::to_value(&patch).unwrap();
    assert_eq!(value, json!({ "currencyCode": "VND" }));
    assert!(!patch.is_empty());
    assert!(RoomSettingsPatch::default().is_empty());
}
