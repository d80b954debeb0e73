#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let catalog = dir.path().join("catalog.csv");
    common::write_catalog_csv(&catalog).unwrap();

    // 1. First run: place an order and start preparing it
    let first = dir.path().join("first.jsonl");
    common::write_commands(
        &first,
        &[
            r#"{"op":"create_order","caller":{"user_id":7,"role":"customer"},"request":{"items":[{"product_id":1,"quantity":2}],"delivery_location":"Dorm B","payment_method":"CARD"}}"#,
            r#"{"op":"transition_status","caller":{"user_id":1,"role":"admin"},"order_id":1,"status":"PREPARING"}"#,
        ],
    )
    .unwrap();

    let output1 = Command::new(cargo_bin!("campus-orders"))
        .arg(&first)
        .arg("--catalog")
        .arg(&catalog)
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains(r#""status":"PREPARING""#));

    // 2. Second run against the same DB: the order and sequences survive
    let second = dir.path().join("second.jsonl");
    common::write_commands(
        &second,
        &[
            r#"{"op":"get_order","caller":{"user_id":7,"role":"customer"},"order_id":1}"#,
            r#"{"op":"create_order","caller":{"user_id":7,"role":"customer"},"request":{"items":[{"product_id":2,"quantity":3}],"delivery_location":"Dorm B","payment_method":"CASH"}}"#,
            r#"{"op":"list_notifications","caller":{"user_id":7,"role":"customer"}}"#,
        ],
    )
    .unwrap();

    let output2 = Command::new(cargo_bin!("campus-orders"))
        .arg(&second)
        .arg("--catalog")
        .arg(&catalog)
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());

    let responses: Vec<serde_json::Value> = String::from_utf8_lossy(&output2.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses[0]["order"]["status"], "PREPARING");
    assert_eq!(responses[0]["order"]["total"], "8.00");
    assert_eq!(responses[1]["order"]["id"], 2);
    assert_eq!(responses[2]["notifications"].as_array().unwrap().len(), 3);
}
