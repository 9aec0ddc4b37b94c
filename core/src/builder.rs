use crate::analyzer::Analyzer;
use crate::error::BuildError;
use crate::index::{DocId, FieldValue, IndexStore, StoreWriter};
use crate::schema::{IndexConfig, StorageMode};
use anyhow::{bail, Result};
use std::collections::BTreeMap;

/// One flat input row: field name → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    /// Convert a JSON object into a record. Nulls count as missing; arrays and
    /// nested objects are rejected.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            bail!("record must be a JSON object");
        };
        let mut fields = BTreeMap::new();
        for (name, v) in map {
            let value = match v {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => FieldValue::Text(s),
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(n) => FieldValue::Number(n),
                    None => bail!("field `{name}` is not a representable number"),
                },
                serde_json::Value::Bool(b) => FieldValue::Text(b.to_string()),
                _ => bail!("field `{name}` must be a string or number"),
            };
            fields.insert(name, value);
        }
        Ok(Self(fields))
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Single-pass index construction. Records get ids in arrival order; nothing is
/// searchable until [`IndexBuilder::finish`] hands back the read-only store.
pub struct IndexBuilder {
    config: IndexConfig,
    analyzer: Analyzer,
    writer: StoreWriter,
}

impl IndexBuilder {
    pub fn new(config: IndexConfig) -> Result<Self, BuildError> {
        config.validate()?;
        let analyzer = Analyzer::new(&config.analyzer);
        let writer = StoreWriter::new(config.clone());
        Ok(Self { config, analyzer, writer })
    }

    pub fn num_docs(&self) -> u32 {
        self.writer.num_docs()
    }

    pub fn add_record(&mut self, record: &Record) -> Result<DocId, BuildError> {
        let next = self.writer.num_docs();
        let missing = self
            .config
            .fields
            .iter()
            .find(|f| f.required && record.get(&f.name).is_none());
        if let Some(missing) = missing {
            return Err(BuildError::MissingField { record: next, field: missing.name.clone() });
        }
        for name in record.fields() {
            if self.config.field(name).is_none() {
                tracing::debug!(doc_id = next, field = name, "ignoring undeclared field");
            }
        }

        let doc_id = self.writer.begin_document();
        for spec in &self.config.fields {
            let Some(value) = record.get(&spec.name) else { continue };
            if spec.mode.is_analyzed() {
                for term in self.analyzer.analyze(&value.as_text()) {
                    self.writer.add_posting(&term, &spec.name, doc_id);
                }
            }
            let stored = match (spec.mode, value) {
                (StorageMode::Analyzed, _) => continue,
                (StorageMode::StoredAnalyzed, FieldValue::Text(text)) => {
                    FieldValue::Text(self.analyzer.normalize(text))
                }
                (_, value) => value.clone(),
            };
            self.writer.add_stored_field(doc_id, &spec.name, stored);
        }
        Ok(doc_id)
    }

    pub fn finish(self) -> IndexStore {
        let store = self.writer.commit();
        tracing::info!(
            num_docs = store.num_docs(),
            num_terms = store.num_terms(),
            "index build complete"
        );
        store
    }
}

/// Index every record in order and publish the store, or fail without one.
pub fn build<'a, I>(records: I, config: &IndexConfig) -> Result<IndexStore, BuildError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut builder = IndexBuilder::new(config.clone())?;
    for record in records {
        builder.add_record(record)?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;

    fn config() -> IndexConfig {
        IndexConfig::new(vec![
            FieldSpec::new("Id", StorageMode::Stored).required(),
            FieldSpec::new("Title", StorageMode::StoredAnalyzed).boost(15.0),
            FieldSpec::new("Body", StorageMode::Analyzed).boost(5.0),
        ])
    }

    #[test]
    fn assigns_sequential_ids_and_counts_terms() {
        let records = vec![
            Record::new().with("Id", 10.0).with("Title", "Apple Pie").with("Body", "pie pie pie"),
            Record::new().with("Id", 11.0).with("Title", "Apple Tart"),
        ];
        let store = build(&records, &config()).unwrap();
        assert_eq!(store.num_docs(), 2);
        assert_eq!(store.lookup("pie", "Body")[0].term_frequency, 3);
        assert_eq!(store.lookup("pie", "Title")[0].doc_id, 0);
        let apple: Vec<_> = store.lookup("apple", "Title").iter().map(|p| p.doc_id).collect();
        assert_eq!(apple, vec![0, 1]);
    }

    #[test]
    fn stores_raw_display_and_normalized_analyzed_values() {
        let records =
            vec![Record::new().with("Id", "A-1").with("Title", "Apple Pie").with("Body", "Secret")];
        let store = build(&records, &config()).unwrap();
        assert_eq!(store.get_stored(0, "Id"), Some(&FieldValue::from("A-1")));
        assert_eq!(store.get_stored(0, "Title"), Some(&FieldValue::from("apple pie")));
        assert_eq!(store.get_stored(0, "Body"), None);
    }

    #[test]
    fn missing_mandatory_field_aborts() {
        let records = vec![Record::new().with("Id", 1.0), Record::new().with("Title", "no id")];
        let err = build(&records, &config()).unwrap_err();
        assert_eq!(err, BuildError::MissingField { record: 1, field: "Id".into() });
    }

    #[test]
    fn missing_optional_field_is_empty() {
        let records = vec![Record::new().with("Id", 1.0)];
        let store = build(&records, &config()).unwrap();
        assert_eq!(store.num_docs(), 1);
        assert_eq!(store.num_terms(), 0);
        assert!(store.get_stored(0, "Title").is_none());
    }

    #[test]
    fn invalid_config_is_a_build_error() {
        let bad = IndexConfig::new(vec![FieldSpec::new("Id", StorageMode::Stored).boost(1.0)]);
        assert!(matches!(build(&Vec::new(), &bad), Err(BuildError::Config(_))));
    }

    #[test]
    fn record_from_json() {
        let json = serde_json::json!({"Id": 3, "Title": "x", "Note": null, "Flag": true});
        let record = Record::from_json(json).unwrap();
        assert_eq!(record.get("Id"), Some(&FieldValue::Number(3.0)));
        assert_eq!(record.get("Note"), None);
        assert_eq!(record.get("Flag"), Some(&FieldValue::from("true")));
        assert!(Record::from_json(serde_json::json!({"Tags": ["a"]})).is_err());
        assert!(Record::from_json(serde_json::json!([1, 2])).is_err());
    }
}
