use crate::analyzer::AnalyzerConfig;
use crate::error::ConfigError;
use crate::pipeline::SortSpec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Kept verbatim for display, never indexed.
    Stored,
    /// Indexed through the analyzer, not retrievable.
    Analyzed,
    /// Indexed, and stored in normalized form.
    StoredAnalyzed,
}

impl StorageMode {
    pub fn is_stored(self) -> bool {
        matches!(self, StorageMode::Stored | StorageMode::StoredAnalyzed)
    }
    pub fn is_analyzed(self) -> bool {
        matches!(self, StorageMode::Analyzed | StorageMode::StoredAnalyzed)
    }
}

/// How a field's stored value compares when results are re-sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    Text,
    Number,
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub mode: StorageMode,
    #[serde(default)]
    pub boost: Option<f64>,
    #[serde(default)]
    pub sort: Option<SortType>,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn new(name: &str, mode: StorageMode) -> Self {
        Self { name: name.to_string(), mode, boost: None, sort: None, required: false }
    }
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
    pub fn sort(mut self, sort: SortType) -> Self {
        self.sort = Some(sort);
        self
    }
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Static field table plus analyzer settings. Saved with the index so queries
/// always run against the configuration the index was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub default_sort: Option<SortSpec>,
}

impl IndexConfig {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields, analyzer: AnalyzerConfig::default(), default_sort: None }
    }

    /// Article table: id, title, short description, body and creation date, newest first.
    pub fn articles() -> Self {
        Self {
            fields: vec![
                FieldSpec::new("Id", StorageMode::Stored).sort(SortType::Number).required(),
                FieldSpec::new("Title", StorageMode::StoredAnalyzed).boost(15.0).required(),
                FieldSpec::new("ShortDescription", StorageMode::StoredAnalyzed).boost(10.0),
                FieldSpec::new("PageBody", StorageMode::Analyzed).boost(5.0),
                FieldSpec::new("DateCreated", StorageMode::Stored).sort(SortType::Date),
            ],
            analyzer: AnalyzerConfig::default(),
            default_sort: Some(SortSpec::descending("DateCreated")),
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: IndexConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for f in &self.fields {
            if !seen.insert(f.name.as_str()) {
                return Err(ConfigError::DuplicateField(f.name.clone()));
            }
            if let Some(boost) = f.boost {
                if !f.mode.is_analyzed() {
                    return Err(ConfigError::BoostOnUnanalyzedField(f.name.clone()));
                }
                if !(boost.is_finite() && boost > 0.0) {
                    return Err(ConfigError::InvalidBoost { field: f.name.clone(), boost });
                }
            }
        }
        if let Some(sort) = &self.default_sort {
            if self.field(&sort.field).is_none() {
                return Err(ConfigError::UnknownSortField(sort.field.clone()));
            }
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared order of every analyzed field; the default query field list.
    pub fn searchable_fields(&self) -> Vec<String> {
        self.fields.iter().filter(|f| f.mode.is_analyzed()).map(|f| f.name.clone()).collect()
    }

    pub fn sort_type(&self, name: &str) -> SortType {
        self.field(name).and_then(|f| f.sort).unwrap_or(SortType::Text)
    }

    pub fn boosts(&self) -> FieldBoosts {
        FieldBoosts(
            self.fields
                .iter()
                .filter_map(|f| f.boost.map(|b| (f.name.clone(), b)))
                .collect(),
        )
    }
}

/// Field name → relevance weight. Fields without an entry are not searchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldBoosts(BTreeMap<String, f64>);

impl FieldBoosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, boost: f64) -> Self {
        self.0.insert(field.to_string(), boost);
        self
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.0.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for FieldBoosts {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
