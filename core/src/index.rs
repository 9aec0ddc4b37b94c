use crate::schema::IndexConfig;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub type DocId = u32;

/// A stored field value, kept as it was given (text or number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl FieldValue {
    /// Text rendering used for analysis and for the literal substring filter.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s.as_str()),
            FieldValue::Number(n) => Cow::Owned(n.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
}

// term -> field -> postings sorted by doc_id
type PostingTable = HashMap<String, HashMap<String, Vec<Posting>>>;

/// Write side of the index. Only reachable while building; `commit` is the
/// one-way transition to the read-only [`IndexStore`].
pub struct StoreWriter {
    config: IndexConfig,
    postings: PostingTable,
    stored: Vec<BTreeMap<String, FieldValue>>,
}

impl StoreWriter {
    pub fn new(config: IndexConfig) -> Self {
        Self { config, postings: HashMap::new(), stored: Vec::new() }
    }

    /// Allocate the next document id together with its forward-store slot.
    pub fn begin_document(&mut self) -> DocId {
        let doc_id = self.stored.len() as DocId;
        self.stored.push(BTreeMap::new());
        doc_id
    }

    pub fn num_docs(&self) -> u32 {
        self.stored.len() as u32
    }

    /// Count one more occurrence of `term` in `field` of `doc_id`.
    pub fn add_posting(&mut self, term: &str, field: &str, doc_id: DocId) {
        debug_assert!(
            (doc_id as usize) < self.stored.len(),
            "posting for unallocated doc {doc_id}"
        );
        let list = self
            .postings
            .entry(term.to_string())
            .or_default()
            .entry(field.to_string())
            .or_default();
        if let Some(last) = list.last_mut() {
            if last.doc_id == doc_id {
                last.term_frequency += 1;
                return;
            }
            debug_assert!(last.doc_id < doc_id, "postings must arrive in doc id order");
        }
        list.push(Posting { doc_id, term_frequency: 1 });
    }

    /// Last write wins.
    pub fn add_stored_field(&mut self, doc_id: DocId, field: &str, value: FieldValue) {
        if let Some(slot) = self.stored.get_mut(doc_id as usize) {
            slot.insert(field.to_string(), value);
        }
    }

    pub fn commit(self) -> IndexStore {
        IndexStore { config: self.config, postings: self.postings, stored: self.stored }
    }
}

/// Read-only inverted index plus forward store. Immutable, so it can be shared
/// across threads behind an `Arc` without locking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStore {
    config: IndexConfig,
    postings: PostingTable,
    stored: Vec<BTreeMap<String, FieldValue>>,
}

impl IndexStore {
    pub fn empty(config: IndexConfig) -> Self {
        StoreWriter::new(config).commit()
    }

    /// Postings for `term` in `field`, empty when the pair was never indexed.
    pub fn lookup(&self, term: &str, field: &str) -> &[Posting] {
        self.postings
            .get(term)
            .and_then(|fields| fields.get(field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get_stored(&self, doc_id: DocId, field: &str) -> Option<&FieldValue> {
        self.stored_fields(doc_id)?.get(field)
    }

    pub fn stored_fields(&self, doc_id: DocId) -> Option<&BTreeMap<String, FieldValue>> {
        self.stored.get(doc_id as usize)
    }

    pub fn num_docs(&self) -> u32 {
        self.stored.len() as u32
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IndexConfig {
        IndexConfig::articles()
    }

    #[test]
    fn repeated_postings_increment_frequency() {
        let mut w = StoreWriter::new(config());
        let d0 = w.begin_document();
        let d1 = w.begin_document();
        w.add_posting("apple", "Title", d0);
        w.add_posting("apple", "Title", d0);
        w.add_posting("apple", "Title", d1);
        w.add_posting("apple", "ShortDescription", d1);
        let store = w.commit();
        assert_eq!(
            store.lookup("apple", "Title"),
            &[Posting { doc_id: 0, term_frequency: 2 }, Posting { doc_id: 1, term_frequency: 1 }]
        );
        assert_eq!(store.lookup("apple", "ShortDescription").len(), 1);
        assert!(store.lookup("apple", "PageBody").is_empty());
        assert!(store.lookup("pear", "Title").is_empty());
        assert_eq!(store.num_terms(), 1);
    }

    #[test]
    fn stored_fields_last_write_wins() {
        let mut w = StoreWriter::new(config());
        let d0 = w.begin_document();
        w.add_stored_field(d0, "Title", "first".into());
        w.add_stored_field(d0, "Title", "second".into());
        w.add_stored_field(d0, "Id", 7.0.into());
        w.add_stored_field(42, "Title", "ignored".into());
        let store = w.commit();
        assert_eq!(store.get_stored(0, "Title"), Some(&FieldValue::from("second")));
        assert_eq!(store.get_stored(0, "Id").map(|v| v.to_string()), Some("7".to_string()));
        assert_eq!(store.get_stored(0, "Missing"), None);
        assert_eq!(store.get_stored(42, "Title"), None);
    }

    #[test]
    fn empty_store_is_total() {
        let store = IndexStore::empty(config());
        assert_eq!(store.num_docs(), 0);
        assert!(store.lookup("anything", "Title").is_empty());
        assert!(store.get_stored(0, "Title").is_none());
        assert!(store.stored_fields(0).is_none());
    }
}
