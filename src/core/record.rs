//! Output record assembly and persistence.
//!
//! A generated merchant is a `loot` record holding snapshots of the selected
//! items. Metadata (the criteria summary and any integration blocks) is
//! attached afterwards through [`RecordSink::set_metadata`], keyed by
//! namespace and key, and is opaque to everything here.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::{core::facet::Item, infra::config::IntegrationConfig};

/// Metadata namespace owned by this tool.
pub const FLAG_SCOPE: &str = "lootsmith";
/// Key under [`FLAG_SCOPE`] holding the structured criteria summary.
pub const CRITERIA_FLAG: &str = "criteria";
pub const RECORD_TYPE: &str = "loot";

/// Copy of an item's document with its stack quantity overwritten.
pub fn snapshot(
    item: &Item,
    quantity: u32,
) -> Value
{
    let mut doc = item
        .document()
        .clone();

    if let Value::Object(fields) = &mut doc
    {
        let system = fields
            .entry("system")
            .or_insert_with(|| Value::Object(Map::new()));
        if !system.is_object()
        {
            *system = Value::Object(Map::new());
        }
        system["quantity"] = json!(quantity);
    }

    doc
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDetails
{
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSystem
{
    #[serde(rename = "lootSheetType")]
    pub loot_sheet_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<RecordDetails>,
}

impl Default for RecordSystem
{
    fn default() -> Self
    {
        Self { loot_sheet_type: "Merchant".to_string(), details: None }
    }
}

/// A record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord
{
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub system: RecordSystem,
    pub items: Vec<Value>,
}

/// A persisted record with its metadata, grouped by namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record
{
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub system: RecordSystem,
    pub items: Vec<Value>,
    #[serde(default)]
    pub flags: IndexMap<String, IndexMap<String, Value>>,
}

impl Record
{
    pub fn flag(
        &self,
        namespace: &str,
        key: &str,
    ) -> Option<&Value>
    {
        self.flags
            .get(namespace)
            .and_then(|ns| ns.get(key))
    }
}

impl From<NewRecord> for Record
{
    fn from(r: NewRecord) -> Self
    {
        Self { name: r.name, kind: r.kind, system: r.system, items: r.items, flags: IndexMap::new() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError
{
    #[error("failed to serialize record `{name}`")]
    Serialize
    {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write record to {path}")]
    Write
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where generated records go.
///
/// A record is created, then gets its metadata, then is committed. Sinks
/// backed by storage may defer writing until [`RecordSink::commit`].
pub trait RecordSink
{
    fn create_record(
        &mut self,
        record: NewRecord,
    ) -> Result<Record, RecordError>;

    fn set_metadata(
        &mut self,
        record: &mut Record,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RecordError>;

    fn commit(
        &mut self,
        _record: &Record,
    ) -> Result<(), RecordError>
    {
        Ok(())
    }
}

/// Keeps every created record in memory, in creation order.
#[derive(Debug, Default)]
pub struct MemorySink
{
    records: Vec<Record>,
}

impl MemorySink
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn records(&self) -> &[Record]
    {
        &self.records
    }

    fn stored_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut Record>
    {
        self.records
            .iter_mut()
            .rev()
            .find(|r| r.name == name)
    }
}

impl RecordSink for MemorySink
{
    fn create_record(
        &mut self,
        record: NewRecord,
    ) -> Result<Record, RecordError>
    {
        let record = Record::from(record);
        self.records
            .push(record.clone());
        Ok(record)
    }

    fn set_metadata(
        &mut self,
        record: &mut Record,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RecordError>
    {
        put_flag(record, namespace, key, value.clone());
        if let Some(stored) = self.stored_mut(&record.name)
        {
            put_flag(stored, namespace, key, value);
        }
        Ok(())
    }
}

/// Writes the finished record as pretty JSON in one step on commit. The file
/// is replaced through a temporary sibling, so readers see either the old
/// contents or the complete record.
#[derive(Debug, Clone)]
pub struct JsonFileSink
{
    path: PathBuf,
}

impl JsonFileSink
{
    pub fn new(path: impl AsRef<Path>) -> Self
    {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    fn write_err(
        &self,
        source: std::io::Error,
    ) -> RecordError
    {
        RecordError::Write { path: self.path.clone(), source }
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn write(
        &self,
        record: &Record,
    ) -> Result<(), RecordError>
    {
        let text = serde_json::to_string_pretty(record)
            .map_err(|source| RecordError::Serialize { name: record.name.clone(), source })?;

        let dir = match self
            .path
            .parent()
        {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.write_err(e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.write_err(e))?;
        tmp.write_all(text.as_bytes())
            .map_err(|e| self.write_err(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.write_err(e.error))?;

        debug!(bytes = text.len(), "record written");
        Ok(())
    }
}

impl RecordSink for JsonFileSink
{
    fn create_record(
        &mut self,
        record: NewRecord,
    ) -> Result<Record, RecordError>
    {
        Ok(Record::from(record))
    }

    fn set_metadata(
        &mut self,
        record: &mut Record,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RecordError>
    {
        put_flag(record, namespace, key, value);
        Ok(())
    }

    fn commit(
        &mut self,
        record: &Record,
    ) -> Result<(), RecordError>
    {
        self.write(record)
    }
}

fn put_flag(
    record: &mut Record,
    namespace: &str,
    key: &str,
    value: Value,
)
{
    record
        .flags
        .entry(namespace.to_string())
        .or_default()
        .insert(key.to_string(), value);
}

/// Post-processing step contributing a metadata block for a third-party
/// inventory module.
pub trait IntegrationHook
{
    fn namespace(&self) -> &'static str;
    fn key(&self) -> &'static str;
    fn metadata(&self) -> Value;
}

/// Item Piles merchant configuration: rarity, bulk and level columns with
/// unlimited stock.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemPilesMerchant;

impl IntegrationHook for ItemPilesMerchant
{
    fn namespace(&self) -> &'static str
    {
        "item-piles"
    }

    fn key(&self) -> &'static str
    {
        "data"
    }

    fn metadata(&self) -> Value
    {
        json!({
            "type": "merchant",
            "merchantColumns": [
                {
                    "label": "Rarity",
                    "path": "system.traits.rarity",
                    "formatting": "{#}",
                    "buying": true,
                    "selling": true,
                    "mapping": {
                        "common": "PF2E.TraitCommon",
                        "uncommon": "PF2E.TraitUncommon",
                        "rare": "PF2E.TraitRare",
                        "unique": "PF2E.TraitUnique"
                    }
                },
                {
                    "label": "Bulk",
                    "path": "system.bulk.value",
                    "formatting": "{#}",
                    "buying": true,
                    "selling": true,
                    "mapping": { "0": "" }
                },
                {
                    "label": "Level",
                    "path": "system.level.value",
                    "formatting": "{#}",
                    "mapping": {},
                    "buying": true,
                    "selling": true
                }
            ],
            "infiniteQuantity": true,
            "hideTokenWhenClosed": true,
            "distance": null,
            "enabled": true
        })
    }
}

/// PF2E Toolbelt "better merchant" with every item infinite.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolbeltBetterMerchant;

impl IntegrationHook for ToolbeltBetterMerchant
{
    fn namespace(&self) -> &'static str
    {
        "pf2e-toolbelt"
    }

    fn key(&self) -> &'static str
    {
        "betterMerchant"
    }

    fn metadata(&self) -> Value
    {
        json!({ "infiniteAll": true })
    }
}

/// Hooks enabled by configuration, in a fixed order.
pub fn registered_hooks(cfg: &IntegrationConfig) -> Vec<Box<dyn IntegrationHook>>
{
    let mut hooks: Vec<Box<dyn IntegrationHook>> = Vec::new();
    if cfg.item_piles
    {
        hooks.push(Box::new(ItemPilesMerchant));
    }
    if cfg.toolbelt_better_merchant
    {
        hooks.push(Box::new(ToolbeltBetterMerchant));
    }
    hooks
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn new_record(name: &str) -> NewRecord
    {
        NewRecord {
            name: name.to_string(),
            kind: RECORD_TYPE.to_string(),
            system: RecordSystem::default(),
            items: vec![],
        }
    }

    #[test]
    fn snapshot_overwrites_quantity_only()
    {
        let item = Item::from_value(json!({
            "name": "Torch",
            "system": { "quantity": 1, "price": { "value": { "cp": 1 } } }
        }))
        .expect("object");

        let snap = snapshot(&item, 7);
        assert_eq!(snap["system"]["quantity"], 7);
        assert_eq!(snap["system"]["price"]["value"]["cp"], 1);
        assert_eq!(
            item.document()["system"]["quantity"],
            1,
            "source item untouched"
        );
    }

    #[test]
    fn snapshot_creates_missing_system()
    {
        let item = Item::from_value(json!({ "name": "Bare", "system": 3 })).expect("object");
        assert_eq!(snapshot(&item, 2)["system"], json!({ "quantity": 2 }));
    }

    #[test]
    fn memory_sink_tracks_metadata()
    {
        let mut sink = MemorySink::new();
        let mut record = sink
            .create_record(new_record("Shop"))
            .expect("create");
        sink.set_metadata(&mut record, FLAG_SCOPE, CRITERIA_FLAG, json!({ "a": 1 }))
            .expect("flag");

        assert_eq!(record.flag(FLAG_SCOPE, CRITERIA_FLAG), Some(&json!({ "a": 1 })));
        assert_eq!(sink.records()[0], record);
    }

    #[test]
    fn file_sink_writes_once_on_commit()
    {
        let tmp = assert_fs::TempDir::new().expect("tempdir");
        let path = tmp.path().join("out/shop.json");
        let mut sink = JsonFileSink::new(&path);

        let mut record = sink
            .create_record(new_record("Shop"))
            .expect("create");
        sink.set_metadata(&mut record, FLAG_SCOPE, CRITERIA_FLAG, json!({ "a": 1 }))
            .expect("flag");
        assert!(!path.exists(), "nothing on disk before commit");

        sink.commit(&record)
            .expect("commit");
        let text = fs::read_to_string(&path).expect("read back");
        let back: Record = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, record);
        assert_eq!(
            fs::read_dir(path.parent().expect("parent"))
                .expect("list")
                .count(),
            1,
            "no stray temp files"
        );
    }

    #[test]
    fn failed_commit_reports_and_cleans_up()
    {
        let tmp = assert_fs::TempDir::new().expect("tempdir");
        let path = tmp.path().join("shop.json");
        fs::create_dir(&path).expect("directory in the way");
        fs::write(path.join("keep"), "x").expect("seed");

        let mut sink = JsonFileSink::new(&path);
        let record = sink
            .create_record(new_record("Shop"))
            .expect("create");
        let err = sink
            .commit(&record)
            .unwrap_err();

        assert!(matches!(err, RecordError::Write { .. }));
        assert_eq!(
            fs::read_dir(tmp.path())
                .expect("list")
                .count(),
            1,
            "temp file removed"
        );
        assert!(path.join("keep").exists());
    }

    #[test]
    fn hooks_follow_configuration()
    {
        let none = registered_hooks(&IntegrationConfig::default());
        assert!(none.is_empty());

        let both = registered_hooks(&IntegrationConfig { item_piles: true, toolbelt_better_merchant: true });
        let names: Vec<_> = both
            .iter()
            .map(|h| (h.namespace(), h.key()))
            .collect();
        assert_eq!(names, vec![("item-piles", "data"), ("pf2e-toolbelt", "betterMerchant")]);
        assert_eq!(both[0].metadata()["merchantColumns"][2]["path"], "system.level.value");
    }

    #[test]
    fn record_serializes_with_type_tag()
    {
        let record = Record::from(new_record("Shop"));
        let v = serde_json::to_value(&record).expect("serialize");
        assert_eq!(v["type"], "loot");
        assert_eq!(v["system"]["lootSheetType"], "Merchant");
        assert!(v["system"].get("details").is_none());
    }
}
