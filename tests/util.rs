//! Shared test utilities for integration tests
//!
//! Writes a small equipment catalog into a temp directory so each
//! test runs the binary against a hermetic fixture.

#![allow(dead_code)]

use assert_fs::prelude::*;
use serde_json::{Value, json};

/// Catalog documents shaped like a PF2e equipment compendium export.
pub fn catalog_docs() -> Vec<Value>
{
    vec![
        json!({ "name": "Longsword", "type": "weapon", "system": {
            "slug": "longsword", "category": "martial", "group": "sword",
            "level": { "value": 0 }, "quantity": 1,
            "traits": { "rarity": "common", "value": ["versatile-p"] } } }),
        json!({ "name": "Flaming Rune Blade", "type": "weapon", "system": {
            "slug": "flaming-rune-blade", "category": "martial", "group": "sword",
            "level": { "value": 8 },
            "traits": { "rarity": "uncommon", "value": ["fire", "magical"] } } }),
        json!({ "name": "Shortbow", "type": "weapon", "system": {
            "slug": "shortbow", "category": "martial", "group": "bow", "range": 60,
            "level": { "value": 0 },
            "traits": { "rarity": "common", "value": ["deadly-d10"] } } }),
        json!({ "name": "Wand Implement", "type": "weapon", "system": {
            "slug": "wand-implement", "level": { "value": 1 },
            "traits": { "rarity": "common", "value": [] } } }),
        json!({ "name": "Leather Armor", "type": "armor", "system": {
            "slug": "leather-armor", "category": "light", "group": "leather",
            "level": { "value": 0 },
            "traits": { "rarity": "common" } } }),
        json!({ "name": "Sunrod", "type": "consumable", "system": {
            "slug": "sunrod", "level": { "value": 1 },
            "traits": { "rarity": "common", "value": ["light", "magical"] } } }),
        json!({ "name": "Orb of Dragonkind", "type": "equipment", "system": {
            "slug": "orb-of-dragonkind", "level": { "value": 25 },
            "traits": { "rarity": "unique", "value": ["artifact", "magical"] } } }),
        json!({ "name": "mystery crate", "type": "backpack", "system": {
            "slug": "mystery-crate",
            "traits": { "rarity": "rare", "value": ["magical"] } } }),
    ]
}

/// Temp dir holding `catalog.json` with [`catalog_docs`].
pub fn make_catalog() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("catalog.json")
        .write_str(&Value::Array(catalog_docs()).to_string())
        .expect("write catalog");
    tmp
}

/// Names of the items in a generated record, in record order.
pub fn item_names(record: &Value) -> Vec<String>
{
    record["items"]
        .as_array()
        .expect("items array")
        .iter()
        .filter_map(|it| it["name"].as_str())
        .map(str::to_string)
        .collect()
}
