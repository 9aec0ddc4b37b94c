use crate::error::QueryError;
use crate::index::{FieldValue, IndexStore};
use crate::query::{QueryNode, QueryParser};
use crate::schema::SortType;
use crate::search::{matching_docs, search, ScoredHit};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(field: &str) -> Self {
        Self { field: field.to_string(), descending: false }
    }

    pub fn descending(field: &str) -> Self {
        Self { field: field.to_string(), descending: true }
    }
}

/// Final presentation stage: re-sort by `sort`, keep only candidates of
/// `filter`, then keep hits whose stored text contains `literal` verbatim.
///
/// The sort replaces relevance order. The literal match is case-sensitive and
/// runs on stored values, so it can reject hits the analyzed match accepted.
pub fn rank(
    hits: Vec<ScoredHit>,
    sort: &SortSpec,
    filter: &QueryNode,
    store: &IndexStore,
    literal: &str,
) -> Vec<ScoredHit> {
    let sorted = sort_hits(hits, sort, store.config().sort_type(&sort.field));
    filter_hits(sorted, filter, store, literal)
}

/// Stable order by the typed sort key; values that are missing or do not parse
/// as `sort_type` go last in either direction, ties by ascending doc id.
pub fn sort_hits(hits: Vec<ScoredHit>, sort: &SortSpec, sort_type: SortType) -> Vec<ScoredHit> {
    let mut keyed: Vec<(Option<SortKey>, ScoredHit)> = hits
        .into_iter()
        .map(|hit| {
            let key = hit.fields.get(&sort.field).and_then(|v| SortKey::from_value(v, sort_type));
            (key, hit)
        })
        .collect();
    keyed.sort_by(|(ka, a), (kb, b)| {
        let by_key = match (ka, kb) {
            (Some(x), Some(y)) => {
                let o = x.compare(y);
                if sort.descending { o.reverse() } else { o }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_key.then(a.doc_id.cmp(&b.doc_id))
    });
    keyed.into_iter().map(|(_, hit)| hit).collect()
}

/// Hard re-filter by `filter`'s candidate set, then the literal substring scan.
pub fn filter_hits(
    mut hits: Vec<ScoredHit>,
    filter: &QueryNode,
    store: &IndexStore,
    literal: &str,
) -> Vec<ScoredHit> {
    let candidates = matching_docs(filter, store);
    hits.retain(|hit| candidates.contains_key(&hit.doc_id));
    if !literal.is_empty() {
        hits.retain(|hit| hit.fields.values().any(|v| v.as_text().contains(literal)));
    }
    hits
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Text(String),
    Number(f64),
}

impl SortKey {
    fn from_value(value: &FieldValue, sort_type: SortType) -> Option<Self> {
        match (sort_type, value) {
            (SortType::Text, v) => Some(SortKey::Text(v.as_text().into_owned())),
            (SortType::Number | SortType::Date, FieldValue::Number(n)) => finite(*n),
            (SortType::Number, FieldValue::Text(s)) => s.trim().parse().ok().and_then(finite),
            (SortType::Date, FieldValue::Text(s)) => parse_date(s.trim()).and_then(finite),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        }
    }
}

/// Non-finite numbers have no place in the order and count as unparsable.
fn finite(n: f64) -> Option<SortKey> {
    n.is_finite().then_some(SortKey::Number(n))
}

/// Seconds since the unix epoch for RFC 3339 timestamps, `YYYY-MM-DD` dates
/// (midnight UTC), or US-style `M/D/YYYY h:mm:ss AM` timestamps.
fn parse_date(s: &str) -> Option<f64> {
    let instant = if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        ts
    } else if let Ok(date) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        date.midnight().assume_utc()
    } else {
        let us = format_description!(
            "[month padding:none]/[day padding:none]/[year] [hour repr:12 padding:none]:[minute]:[second] [period]"
        );
        PrimitiveDateTime::parse(s, us).ok()?.assume_utc()
    };
    Some(instant.unix_timestamp() as f64 + instant.nanosecond() as f64 / 1e9)
}

/// Result of running a raw query through parse, search and rank.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Hits returned by the relevance search before re-filtering.
    pub total_hits: usize,
    pub hits: Vec<ScoredHit>,
}

/// Read-only search facade over a committed store; cheap to share across threads.
pub struct SearchEngine {
    store: Arc<IndexStore>,
    parser: QueryParser,
    default_sort: Option<SortSpec>,
}

impl SearchEngine {
    pub fn new(store: Arc<IndexStore>) -> Self {
        let parser = QueryParser::for_config(store.config());
        let default_sort = store.config().default_sort.clone();
        Self { store, parser, default_sort }
    }

    pub fn with_parser(mut self, parser: QueryParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_default_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.default_sort = sort;
        self
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    pub fn default_sort(&self) -> Option<&SortSpec> {
        self.default_sort.as_ref()
    }

    /// Parse `raw`, take the top `limit` by relevance, re-sort by the default
    /// sort, re-filter by the same query and keep hits containing `raw` verbatim.
    pub fn query(&self, raw: &str, limit: u32) -> Result<SearchOutcome, QueryError> {
        self.query_with(raw, limit, self.default_sort.as_ref(), raw)
    }

    pub fn query_with(
        &self,
        raw: &str,
        limit: u32,
        sort: Option<&SortSpec>,
        literal: &str,
    ) -> Result<SearchOutcome, QueryError> {
        let query = self.parser.parse(raw)?;
        let hits = search(&query, &self.store, limit);
        let total_hits = hits.len();
        let hits = match sort {
            Some(sort) => rank(hits, sort, &query, &self.store, literal),
            None => filter_hits(hits, &query, &self.store, literal),
        };
        Ok(SearchOutcome { total_hits, hits })
    }
}
