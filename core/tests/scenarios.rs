use fieldsearch_core::{
    build, rank, search, AnalyzerConfig, FieldSpec, IndexConfig, IndexStore, QueryParser, Record,
    SearchEngine, SortSpec, SortType, StorageMode, Stemming,
};
use std::sync::Arc;

fn pie_config() -> IndexConfig {
    IndexConfig::new(vec![
        FieldSpec::new("Title", StorageMode::StoredAnalyzed).boost(15.0),
        FieldSpec::new("Date", StorageMode::Stored).sort(SortType::Date),
    ])
}

fn pie_store() -> IndexStore {
    let records = vec![
        Record::new().with("Title", "apple pie").with("Date", "2020-01-01"),
        Record::new().with("Title", "apple tart").with("Date", "2021-06-01"),
    ];
    build(&records, &pie_config()).unwrap()
}

fn ids(hits: &[fieldsearch_core::ScoredHit]) -> Vec<u32> {
    hits.iter().map(|h| h.doc_id).collect()
}

#[test]
fn apple_pie_and_tart() {
    let store = pie_store();
    let parser = QueryParser::for_config(store.config());
    let query = parser.parse("apple").unwrap();

    let hits = search(&query, &store, 200);
    assert_eq!(ids(&hits), vec![0, 1]);
    assert!(hits.iter().all(|h| h.score == 15.0));

    let sorted = rank(hits.clone(), &SortSpec::descending("Date"), &query, &store, "");
    assert_eq!(ids(&sorted), vec![1, 0]);

    let tart = rank(hits, &SortSpec::descending("Date"), &query, &store, "tart");
    assert_eq!(ids(&tart), vec![1]);
}

#[test]
fn empty_query_finds_nothing() {
    let store = pie_store();
    let parser = QueryParser::for_config(store.config());
    assert!(search(&parser.parse("").unwrap(), &store, 100).is_empty());
}

#[test]
fn prohibiting_a_universal_term_finds_nothing() {
    let store = pie_store();
    let parser = QueryParser::for_config(store.config());
    assert!(search(&parser.parse("-apple").unwrap(), &store, 100).is_empty());
    assert!(search(&parser.parse("tart -apple").unwrap(), &store, 100).is_empty());
}

#[test]
fn zero_records_yield_an_empty_index() {
    let store = build(&Vec::new(), &IndexConfig::articles()).unwrap();
    assert_eq!(store.num_docs(), 0);
    assert!(store.lookup("apple", "Title").is_empty());
    assert!(store.get_stored(0, "Title").is_none());
    let engine = SearchEngine::new(Arc::new(store));
    for q in ["apple", "+apple -pie", "\"apple pie\"", ""] {
        assert!(engine.query(q, 100).unwrap().hits.is_empty());
    }
}

#[test]
fn articles_flow_sorts_newest_first() {
    let records = vec![
        Record::new()
            .with("Id", 1.0)
            .with("Title", "Rust search")
            .with("ShortDescription", "an index")
            .with("DateCreated", "1/5/2020 9:00:00 AM"),
        Record::new()
            .with("Id", 2.0)
            .with("Title", "Search engines")
            .with("PageBody", "rust inside")
            .with("DateCreated", "2/5/2021 9:00:00 AM"),
        Record::new()
            .with("Id", 3.0)
            .with("Title", "Gardening")
            .with("DateCreated", "3/5/2022 9:00:00 AM"),
    ];
    let engine = SearchEngine::new(Arc::new(build(&records, &IndexConfig::articles()).unwrap()));

    let outcome = engine.query("search", 200).unwrap();
    assert_eq!(outcome.total_hits, 2);
    assert_eq!(ids(&outcome.hits), vec![1, 0]);

    // PageBody is searchable but not stored, so the literal scan rejects doc 1
    let rust = engine.query("rust", 200).unwrap();
    assert_eq!(rust.total_hits, 2);
    assert_eq!(ids(&rust.hits), vec![0]);

    // stored titles are lowercased, so a capitalized literal matches nothing
    let capital = engine.query("Search", 200).unwrap();
    assert_eq!(capital.total_hits, 2);
    assert!(capital.hits.is_empty());
}

#[test]
fn searching_is_safe_across_threads() {
    let engine = Arc::new(SearchEngine::new(Arc::new(pie_store())));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || ids(&engine.query("apple", 10).unwrap().hits))
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), vec![0, 1]);
    }
}

#[test]
fn quoted_word_is_stemmed_like_the_bare_word() {
    let mut config =
        IndexConfig::new(vec![FieldSpec::new("Title", StorageMode::StoredAnalyzed).boost(1.0)]);
    config.analyzer = AnalyzerConfig { stemming: Stemming::English, ..Default::default() };
    let records = vec![
        Record::new().with("Title", "running shoes"),
        Record::new().with("Title", "walking boots"),
    ];
    let store = build(&records, &config).unwrap();
    let parser = QueryParser::for_config(store.config());

    let bare = search(&parser.parse("running").unwrap(), &store, 10);
    let quoted = search(&parser.parse("\"running\"").unwrap(), &store, 10);
    assert_eq!(ids(&bare), vec![0]);
    assert_eq!(ids(&quoted), ids(&bare));

    // a quoted stop word contributes nothing, same as a bare one
    assert!(search(&parser.parse("\"the\"").unwrap(), &store, 10).is_empty());
}
