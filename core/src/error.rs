use crate::DocId;
use thiserror::Error;

/// Indexing failure. The build is aborted and no store is published.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("record {record} is missing mandatory field `{field}`")]
    MissingField { record: DocId, field: String },
    #[error("invalid field configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryParseError {
    #[error("unbalanced quote in query")]
    UnbalancedQuote,
    #[error("unrecognized operator syntax near `{token}`")]
    UnrecognizedOperator { token: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("field `{0}` has no boost entry")]
    UnboostedField(String),
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    #[error("field `{0}` has a boost but is not analyzed")]
    BoostOnUnanalyzedField(String),
    #[error("field `{field}` has invalid boost {boost}")]
    InvalidBoost { field: String, boost: f64 },
    #[error("sort field `{0}` is not declared")]
    UnknownSortField(String),
}

/// Anything that can stop a query before it is evaluated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] QueryParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
