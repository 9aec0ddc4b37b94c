use crate::index::{DocId, FieldValue, IndexStore};
use crate::query::{Occur, QueryNode};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHit {
    pub doc_id: DocId,
    pub score: f64,
    pub fields: BTreeMap<String, FieldValue>,
}

/// Candidate set of `query` with the additive score of every candidate.
///
/// A leaf contributes `boost * term_frequency`. A boolean keeps documents that
/// match every REQUIRED clause and at least one REQUIRED or OPTIONAL clause,
/// then drops anything a PROHIBITED clause matches. Only postings of the
/// query's leaves are touched.
pub fn matching_docs(query: &QueryNode, store: &IndexStore) -> HashMap<DocId, f64> {
    match query {
        QueryNode::Term(t) => store
            .lookup(&t.term, &t.field)
            .iter()
            .map(|p| (p.doc_id, t.boost * p.term_frequency as f64))
            .collect(),
        QueryNode::Boolean(b) => {
            let mut required: Option<HashMap<DocId, f64>> = None;
            let mut optional: HashMap<DocId, f64> = HashMap::new();
            let mut prohibited: HashSet<DocId> = HashSet::new();
            for clause in &b.clauses {
                let matched = matching_docs(&clause.node, store);
                match clause.occur {
                    Occur::Required => {
                        required = Some(match required {
                            None => matched,
                            Some(acc) => intersect(acc, &matched),
                        });
                    }
                    Occur::Optional => {
                        for (doc_id, score) in matched {
                            *optional.entry(doc_id).or_insert(0.0) += score;
                        }
                    }
                    Occur::Prohibited => prohibited.extend(matched.into_keys()),
                }
            }
            let mut result = match required {
                Some(mut req) => {
                    for (doc_id, score) in req.iter_mut() {
                        if let Some(extra) = optional.get(doc_id) {
                            *score += extra;
                        }
                    }
                    req
                }
                None => optional,
            };
            result.retain(|doc_id, _| !prohibited.contains(doc_id));
            result
        }
    }
}

fn intersect(mut acc: HashMap<DocId, f64>, other: &HashMap<DocId, f64>) -> HashMap<DocId, f64> {
    acc.retain(|doc_id, _| other.contains_key(doc_id));
    for (doc_id, score) in acc.iter_mut() {
        *score += other[doc_id];
    }
    acc
}

/// Top `limit` candidates by descending score, ties by ascending doc id.
pub fn search(query: &QueryNode, store: &IndexStore, limit: u32) -> Vec<ScoredHit> {
    let scores = matching_docs(query, store);
    tracing::debug!(candidates = scores.len(), limit, "query evaluated");

    let mut scored: Vec<(DocId, f64)> = scores.into_iter().collect();
    scored.sort_by(by_score);
    scored.truncate(limit as usize);
    scored
        .into_iter()
        .map(|(doc_id, score)| ScoredHit {
            doc_id,
            score,
            fields: store.stored_fields(doc_id).cloned().unwrap_or_default(),
        })
        .collect()
}

fn by_score(a: &(DocId, f64), b: &(DocId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build, Record};
    use crate::query::BooleanQuery;
    use crate::schema::{FieldSpec, IndexConfig, StorageMode};

    fn store() -> IndexStore {
        let config = IndexConfig::new(vec![
            FieldSpec::new("Title", StorageMode::StoredAnalyzed).boost(15.0),
            FieldSpec::new("Body", StorageMode::Analyzed).boost(5.0),
        ]);
        let records = vec![
            Record::new().with("Title", "apple pie").with("Body", "sweet apple apple"),
            Record::new().with("Title", "apple tart"),
            Record::new().with("Title", "cherry pie"),
        ];
        build(&records, &config).unwrap()
    }

    fn any_field(term: &str) -> QueryNode {
        QueryNode::Boolean(
            BooleanQuery::new()
                .with(QueryNode::term("Title", term, 15.0), Occur::Optional)
                .with(QueryNode::term("Body", term, 5.0), Occur::Optional),
        )
    }

    fn ids(hits: &[ScoredHit]) -> Vec<DocId> {
        hits.iter().map(|h| h.doc_id).collect()
    }

    #[test]
    fn additive_boosted_scores() {
        let hits = search(&any_field("apple"), &store(), 10);
        assert_eq!(ids(&hits), vec![0, 1]);
        assert_eq!(hits[0].score, 15.0 + 5.0 * 2.0);
        assert_eq!(hits[1].score, 15.0);
        assert_eq!(hits[1].fields.get("Title"), Some(&FieldValue::from("apple tart")));
    }

    #[test]
    fn ties_break_by_doc_id_and_limit_applies() {
        let hits = search(&QueryNode::term("Title", "pie", 1.0), &store(), 10);
        assert_eq!(ids(&hits), vec![0, 2]);
        let top = search(&QueryNode::term("Title", "pie", 1.0), &store(), 1);
        assert_eq!(ids(&top), vec![0]);
        assert!(search(&QueryNode::term("Title", "pie", 1.0), &store(), 0).is_empty());
    }

    #[test]
    fn required_and_prohibited() {
        let q = QueryNode::Boolean(
            BooleanQuery::new()
                .with(any_field("pie"), Occur::Required)
                .with(any_field("apple"), Occur::Prohibited),
        );
        assert_eq!(ids(&search(&q, &store(), 10)), vec![2]);

        let both = QueryNode::Boolean(
            BooleanQuery::new()
                .with(any_field("pie"), Occur::Required)
                .with(any_field("apple"), Occur::Required),
        );
        let hits = search(&both, &store(), 10);
        assert_eq!(ids(&hits), vec![0]);
        assert_eq!(hits[0].score, 15.0 + 25.0);
    }

    #[test]
    fn optional_only_adds_score_to_required_matches() {
        let q = QueryNode::Boolean(
            BooleanQuery::new()
                .with(any_field("tart"), Occur::Required)
                .with(any_field("cherry"), Occur::Optional),
        );
        assert_eq!(ids(&search(&q, &store(), 10)), vec![1]);
    }

    #[test]
    fn empty_or_prohibit_only_matches_nothing() {
        assert!(search(&QueryNode::empty(), &store(), 10).is_empty());
        let q = QueryNode::Boolean(BooleanQuery::new().with(any_field("apple"), Occur::Prohibited));
        assert!(search(&q, &store(), 10).is_empty());
        assert!(search(&any_field("banana"), &store(), 10).is_empty());
    }
}
