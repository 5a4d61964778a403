use super::clause::ClauseBuilder;
use super::error::SqlError;
use super::types::{CompiledClause, SqlValue};

/// A single filter value as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Number(i64),
    Text(String),
    Flag(bool),
}

/// Fixed-shape filter records expose their members by grammar key.
pub trait FilterSpec {
    /// The supplied value for `key`, or `None` when absent.
    fn criterion(&self, key: &str) -> Option<Criterion>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
    /// `column >= $n`
    AtLeast,
    /// `column > $n`
    GreaterThan,
    /// `column <= $n`
    AtMost,
    /// `column ILIKE $n` with the value wrapped as `%value%`
    Contains,
    /// `column > 0`, only when the flag is `true`; binds nothing
    Positive,
}

#[derive(Debug, Clone, Copy)]
pub struct FilterRule {
    pub key: &'static str,
    pub column: &'static str,
    pub kind: PredicateKind,
}

impl FilterRule {
    pub const fn new(key: &'static str, column: &'static str, kind: PredicateKind) -> Self {
        Self { key, column, kind }
    }
}

/// The predicates an entity understands, in evaluation order, and the
/// `(lower, upper)` key pairs that must not be inverted.
#[derive(Debug, Clone, Copy)]
pub struct FilterGrammar {
    pub rules: &'static [FilterRule],
    pub ranges: &'static [(&'static str, &'static str)],
}

impl FilterGrammar {
    pub fn validate(&self, criteria: &impl FilterSpec) -> Result<(), SqlError> {
        for &(lower, upper) in self.ranges {
            if let (Some(Criterion::Number(lo)), Some(Criterion::Number(hi))) =
                (criteria.criterion(lower), criteria.criterion(upper))
            {
                if lo > hi {
                    return Err(SqlError::InvalidRange { lower, upper });
                }
            }
        }
        Ok(())
    }
}

/// Compile `criteria` into a `WHERE` clause starting at `$1`.
pub fn compile_filter(criteria: &impl FilterSpec, grammar: &FilterGrammar) -> Result<CompiledClause, SqlError> {
    compile_filter_from(criteria, grammar, 1)
}

/// Same as [`compile_filter`], numbering placeholders from `$start`.
pub fn compile_filter_from(
    criteria: &impl FilterSpec,
    grammar: &FilterGrammar,
    start: usize,
) -> Result<CompiledClause, SqlError> {
    grammar.validate(criteria)?;

    let mut builder = ClauseBuilder::starting_at(start);
    for rule in grammar.rules {
        let Some(value) = criteria.criterion(rule.key) else {
            continue;
        };
        add_rule(&mut builder, rule, value)?;
    }
    Ok(builder.into_where())
}

fn add_rule(builder: &mut ClauseBuilder, rule: &FilterRule, value: Criterion) -> Result<(), SqlError> {
    let column = rule.column;
    match (rule.kind, value) {
        (PredicateKind::AtLeast, Criterion::Number(n)) => {
            builder.add_predicate(&format!("{} >= ?", column), Some(SqlValue::from(n)));
        }
        (PredicateKind::GreaterThan, Criterion::Number(n)) => {
            builder.add_predicate(&format!("{} > ?", column), Some(SqlValue::from(n)));
        }
        (PredicateKind::AtMost, Criterion::Number(n)) => {
            builder.add_predicate(&format!("{} <= ?", column), Some(SqlValue::from(n)));
        }
        (PredicateKind::Contains, Criterion::Text(s)) => {
            if !s.is_empty() {
                let pattern = format!("%{}%", escape_like(&s));
                builder.add_predicate(&format!("{} ILIKE ?", column), Some(SqlValue::from(pattern)));
            }
        }
        (PredicateKind::Positive, Criterion::Flag(flag)) => {
            if flag {
                builder.add_predicate(&format!("{} > 0", column), None);
            }
        }
        (kind, other) => {
            return Err(SqlError::bad_value(
                rule.key,
                format!("{:?} filter cannot use {:?}", kind, other),
            ));
        }
    }
    Ok(())
}

/// Escape LIKE metacharacters so user input matches literally.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
