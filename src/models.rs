use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Integer,
    PercentFloat,
    String,
}

impl FieldKind {
    pub fn default_value(self) -> FieldValue {
        match self {
            FieldKind::Integer => FieldValue::Integer(0),
            FieldKind::PercentFloat => FieldValue::Float(0.0),
            FieldKind::String => FieldValue::Text(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Field name to typed value for one (page, variant) pair, in field-table order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeRecord(IndexMap<String, FieldValue>);

impl AttributeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn integer(&self, name: &str) -> i64 {
        match self.0.get(name) {
            Some(FieldValue::Integer(v)) => *v,
            _ => 0,
        }
    }

    pub fn text(&self, name: &str) -> &str {
        self.0.get(name).and_then(FieldValue::as_text).unwrap_or("")
    }

    /// Removes `name`, keeping the order of the remaining fields.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.0.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One form of a page. Index 0 is the base form;
/// otherwise `index` is the `N` of the `versionN` parameter it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    pub index: usize,
    pub label: String,
}

impl VariantKey {
    pub fn base() -> Self {
        Self {
            index: 0,
            label: String::new(),
        }
    }

    pub fn is_base(&self) -> bool {
        self.index == 0
    }

    /// `Title#Label` for a named form, the bare title for the base form.
    pub fn display_name(&self, title: &str) -> String {
        if self.is_base() {
            title.to_string()
        } else {
            format!("{}#{}", title, self.label)
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub name: String,
    pub id: u64,
    pub resource_url: String,
    pub stats: AttributeRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
    Unchanged,
}

/// Accepted records keyed by identity; the last write for an identity wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet(BTreeMap<u64, CanonicalRecord>);

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, record: CanonicalRecord) -> Upsert {
        match self.0.get(&record.id) {
            Some(existing) if *existing == record => Upsert::Unchanged,
            Some(_) => {
                self.0.insert(record.id, record);
                Upsert::Replaced
            }
            None => {
                self.0.insert(record.id, record);
                Upsert::Inserted
            }
        }
    }

    pub fn get(&self, id: u64) -> Option<&CanonicalRecord> {
        self.0.get(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, stab: i64) -> CanonicalRecord {
        let mut stats = AttributeRecord::new();
        stats.insert("stab_attack", FieldValue::Integer(stab));
        CanonicalRecord {
            name: "Rune sword".to_string(),
            id,
            resource_url: "https://example.org/Rune_sword.png".to_string(),
            stats,
        }
    }

    #[test]
    fn upsert_identical_is_noop() {
        let mut set = ResultSet::new();
        assert_eq!(set.upsert(record(1305, 50)), Upsert::Inserted);
        let before = set.clone();
        assert_eq!(set.upsert(record(1305, 50)), Upsert::Unchanged);
        assert_eq!(set, before);
    }

    #[test]
    fn upsert_last_write_wins() {
        let mut set = ResultSet::new();
        set.upsert(record(1305, 50));
        assert_eq!(set.upsert(record(1305, 60)), Upsert::Replaced);
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(1305).unwrap().stats.get("stab_attack"),
            Some(&FieldValue::Integer(60))
        );
    }

    #[test]
    fn result_set_serializes_with_string_keys() {
        let mut set = ResultSet::new();
        set.upsert(record(1305, 50));
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["1305"]["id"], 1305);
        assert_eq!(json["1305"]["stats"]["stab_attack"], 50);

        let back: ResultSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn attribute_record_keeps_insertion_order() {
        let mut rec = AttributeRecord::new();
        rec.insert("id", FieldValue::Integer(1));
        rec.insert("slot", FieldValue::Text("weapon".into()));
        rec.insert("prayer", FieldValue::Integer(2));
        rec.remove("slot");
        let names: Vec<&str> = rec.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["id", "prayer"]);
    }

    #[test]
    fn display_name_uses_anchor_for_variants() {
        let key = VariantKey {
            index: 2,
            label: "Red".to_string(),
        };
        assert_eq!(key.display_name("Dragon"), "Dragon#Red");
        assert_eq!(VariantKey::base().display_name("Dragon"), "Dragon");
    }

    #[test]
    fn indexed_key_with_empty_label_is_not_base() {
        let key = VariantKey {
            index: 1,
            label: String::new(),
        };
        assert!(!key.is_base());
        assert!(VariantKey::base().is_base());
    }
}
