#![cfg(feature = "serde")]

use bt_core::{ExecutorConfig, Position, Status};

#[test]
fn config_fills_missing_fields_with_defaults() {
    let config: ExecutorConfig = serde_json::from_str(r#"{ "seed": 7 }"#).unwrap();
    assert_eq!(config, ExecutorConfig::default().with_seed(7));
}

#[test]
fn position_serializes_as_move_list() {
    let pos = Position::from_moves(vec![1, 0, 2]);
    assert_eq!(serde_json::to_string(&pos).unwrap(), "[1,0,2]");
    let back: Position = serde_json::from_str("[1,0,2]").unwrap();
    assert_eq!(back, pos);
}

#[test]
fn status_uses_variant_names() {
    let json = serde_json::to_string(&Status::Terminated).unwrap();
    assert_eq!(json, r#""Terminated""#);
}
