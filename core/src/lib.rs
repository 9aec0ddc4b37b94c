pub mod analyzer;
pub mod builder;
pub mod error;
pub mod index;
pub mod persist;
pub mod pipeline;
pub mod query;
pub mod schema;
pub mod search;

pub use analyzer::{Analyzer, AnalyzerConfig, Stemming};
pub use builder::{build, IndexBuilder, Record};
pub use error::{BuildError, ConfigError, QueryError, QueryParseError};
pub use index::{DocId, FieldValue, IndexStore, Posting, StoreWriter};
pub use pipeline::{rank, SearchEngine, SearchOutcome, SortSpec};
pub use query::{
    parse, BooleanQuery, Clause, DefaultOperator, Occur, QueryNode, QueryParser, TermQuery,
};
pub use schema::{FieldBoosts, FieldSpec, IndexConfig, SortType, StorageMode};
pub use search::{matching_docs, search, ScoredHit};
