// ── Loaded data rows ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Well-known row keys. Sources may add others; nothing is enforced.
pub mod keys {
    pub const LABEL: &str = "label";
    pub const VALUE: &str = "value";
    pub const TYPE: &str = "type";
    pub const URL: &str = "url";
    pub const THUMB: &str = "thumb";
}

/// One record of a loaded data source.
///
/// Insertion-ordered mapping of string keys to optional string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, Option<String>>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    /// Insert a key that may have no value (e.g. an image without thumbnail).
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.insert(key.into(), value);
    }

    /// Value for `key`, `None` when missing or explicitly empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Option::as_deref)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn label(&self) -> Option<&str> {
        self.get(keys::LABEL)
    }

    pub fn value(&self) -> Option<&str> {
        self.get(keys::VALUE)
    }

    pub fn kind(&self) -> Option<&str> {
        self.get(keys::TYPE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_keep_insertion_order() {
        let row = Row::new().with("value", "v").with("label", "l").with("url", "u");
        let order: Vec<&str> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(order, ["value", "label", "url"]);
    }

    #[test]
    fn explicit_none_reads_as_missing() {
        let mut row = Row::new().with("label", "clip.mp4");
        row.insert("thumb", None);
        assert!(row.contains_key("thumb"));
        assert_eq!(row.get("thumb"), None);
        assert_eq!(row.label(), Some("clip.mp4"));
    }
}
