use crate::analyzer::Analyzer;
use crate::error::{ConfigError, QueryError, QueryParseError};
use crate::schema::{FieldBoosts, IndexConfig};
use serde::{Deserialize, Serialize};

/// How a clause takes part in its boolean parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occur {
    Required,
    Optional,
    Prohibited,
}

/// Single term against a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub term: String,
    pub boost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub node: QueryNode,
    pub occur: Occur,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanQuery {
    pub clauses: Vec<Clause>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, node: QueryNode, occur: Occur) -> Self {
        self.clauses.push(Clause { node, occur });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryNode {
    Term(TermQuery),
    Boolean(BooleanQuery),
}

impl QueryNode {
    pub fn term(field: &str, term: &str, boost: f64) -> Self {
        QueryNode::Term(TermQuery { field: field.to_string(), term: term.to_string(), boost })
    }

    /// The query that matches nothing.
    pub fn empty() -> Self {
        QueryNode::Boolean(BooleanQuery::new())
    }
}

/// Occur given to term groups that carry no `+`/`-` prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultOperator {
    /// Every unprefixed group must match.
    #[default]
    And,
    /// Any unprefixed group may match.
    Or,
}

/// Multi-field query parser. Boosts are fixed at construction.
pub struct QueryParser {
    fields: Vec<String>,
    boosts: FieldBoosts,
    analyzer: Analyzer,
    default_operator: DefaultOperator,
    strict: bool,
}

impl QueryParser {
    pub fn new(fields: Vec<String>, boosts: FieldBoosts, analyzer: Analyzer) -> Self {
        Self { fields, boosts, analyzer, default_operator: DefaultOperator::And, strict: false }
    }

    /// Parser over every analyzed field of `config`, using its boosts and analyzer.
    pub fn for_config(config: &IndexConfig) -> Self {
        Self::new(config.searchable_fields(), config.boosts(), Analyzer::new(&config.analyzer))
    }

    pub fn with_default_operator(mut self, op: DefaultOperator) -> Self {
        self.default_operator = op;
        self
    }

    /// Reject fields without a boost instead of silently leaving them out.
    pub fn strict(mut self) -> Result<Self, ConfigError> {
        if let Some(f) = self.fields.iter().find(|f| self.boosts.get(f).is_none()) {
            return Err(ConfigError::UnboostedField(f.clone()));
        }
        self.strict = true;
        Ok(self)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn parse(&self, query: &str) -> Result<QueryNode, QueryError> {
        let groups = lex(query)?;
        let mut root = BooleanQuery::new();
        for group in groups {
            if let Some(field) = &group.field {
                let searchable = self.fields.contains(field) && self.boosts.get(field).is_some();
                if self.strict && !searchable {
                    return Err(ConfigError::UnboostedField(field.clone()).into());
                }
            }
            let Some(node) = self.expand(&group) else { continue };
            let occur = group.occur.unwrap_or(match self.default_operator {
                DefaultOperator::And => Occur::Required,
                DefaultOperator::Or => Occur::Optional,
            });
            root.clauses.push(Clause { node, occur });
        }
        Ok(QueryNode::Boolean(root))
    }

    /// One OPTIONAL leaf per (term, searchable field); `None` when nothing is left to search.
    fn expand(&self, group: &Group) -> Option<QueryNode> {
        let terms = if group.quoted {
            self.analyzer.analyze_literal(&group.text).into_iter().collect()
        } else {
            self.analyzer.analyze(&group.text)
        };
        let fields: Vec<(&str, f64)> = self
            .fields
            .iter()
            .filter(|f| group.field.as_ref().map_or(true, |only| only == *f))
            .filter_map(|f| self.boosts.get(f).map(|b| (f.as_str(), b)))
            .collect();
        if terms.is_empty() || fields.is_empty() {
            return None;
        }
        let mut group_query = BooleanQuery::new();
        for term in &terms {
            for (field, boost) in &fields {
                group_query =
                    group_query.with(QueryNode::term(field, term, *boost), Occur::Optional);
            }
        }
        Some(QueryNode::Boolean(group_query))
    }
}

/// Parse `query` against `fields` with the default operator (AND) in non-strict mode.
pub fn parse(
    query: &str,
    fields: &[String],
    boosts: &FieldBoosts,
    analyzer: Analyzer,
) -> Result<QueryNode, QueryError> {
    QueryParser::new(fields.to_vec(), boosts.clone(), analyzer).parse(query)
}

#[derive(Debug, PartialEq)]
struct Group {
    occur: Option<Occur>,
    field: Option<String>,
    text: String,
    quoted: bool,
}

fn lex(query: &str) -> Result<Vec<Group>, QueryParseError> {
    if query.matches('"').count() % 2 == 1 {
        return Err(QueryParseError::UnbalancedQuote);
    }
    let chars: Vec<char> = query.chars().collect();
    let len = chars.len();
    let at_boundary = |i: usize| i >= len || chars[i].is_whitespace();
    let bad = |start: usize| {
        let token: String = chars[start..].iter().take_while(|c| !c.is_whitespace()).collect();
        QueryParseError::UnrecognizedOperator { token }
    };

    let mut groups = Vec::new();
    let mut i = 0;
    loop {
        while i < len && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= len {
            break;
        }
        let start = i;

        let occur = match chars[i] {
            '+' => Some(Occur::Required),
            '-' => Some(Occur::Prohibited),
            _ => None,
        };
        if occur.is_some() {
            i += 1;
            if at_boundary(i) || matches!(chars[i], '+' | '-') {
                return Err(bad(start));
            }
        }

        let mut field = None;
        let mut j = i;
        while !at_boundary(j) && chars[j] != ':' && chars[j] != '"' {
            j += 1;
        }
        if j < len && chars[j] == ':' {
            if j == i || at_boundary(j + 1) {
                return Err(bad(start));
            }
            field = Some(chars[i..j].iter().collect::<String>());
            i = j + 1;
        }

        if chars[i] == '"' {
            let close = (i + 1..len)
                .find(|&k| chars[k] == '"')
                .ok_or(QueryParseError::UnbalancedQuote)?;
            if !at_boundary(close + 1) {
                return Err(bad(start));
            }
            let text = chars[i + 1..close].iter().collect();
            groups.push(Group { occur, field, text, quoted: true });
            i = close + 1;
        } else {
            let body_start = i;
            while !at_boundary(i) {
                if chars[i] == '"' {
                    return Err(bad(start));
                }
                i += 1;
            }
            let text = chars[body_start..i].iter().collect();
            groups.push(Group { occur, field, text, quoted: false });
        }
    }
    Ok(groups)
}
