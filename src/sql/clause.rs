use super::types::{CompiledClause, SqlValue};

/// Accumulates clause fragments and their parameters.
///
/// Templates mark the bound value with `?`. The placeholder index only
/// advances when a value is actually bound, so value-less predicates such as
/// `equity > 0` never leave a gap in the numbering.
#[derive(Debug)]
pub struct ClauseBuilder {
    fragments: Vec<String>,
    param_values: Vec<SqlValue>,
    param_index: usize,
}

impl Default for ClauseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClauseBuilder {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start numbering at `$index`, for clauses appended after others.
    pub fn starting_at(index: usize) -> Self {
        Self {
            fragments: vec![],
            param_values: vec![],
            param_index: index.max(1),
        }
    }

    pub fn add_predicate(&mut self, template: &str, value: Option<SqlValue>) -> &mut Self {
        let fragment = match value {
            Some(value) => {
                let placeholder = self.param(value);
                template.replacen('?', &placeholder, 1)
            }
            None => template.to_string(),
        };
        self.fragments.push(fragment);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn next_index(&self) -> usize {
        self.param_index
    }

    /// `WHERE a AND b ...`, or an empty clause when nothing was added.
    pub fn into_where(self) -> CompiledClause {
        if self.fragments.is_empty() {
            return self.finish(String::new());
        }
        let sql = format!("WHERE {}", self.fragments.join(" AND "));
        self.finish(sql)
    }

    /// Comma separated assignments for an `UPDATE ... SET`.
    pub fn into_set(self) -> CompiledClause {
        let sql = self.fragments.join(", ");
        self.finish(sql)
    }

    fn finish(self, sql: String) -> CompiledClause {
        CompiledClause {
            sql,
            params: self.param_values,
            next_index: self.param_index,
        }
    }

    fn param(&mut self, value: SqlValue) -> String {
        let placeholder = format!("${}", self.param_index);
        self.param_values.push(value);
        self.param_index += 1;
        placeholder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_less_predicates_do_not_consume_an_index() {
        let mut builder = ClauseBuilder::new();
        builder
            .add_predicate("title ILIKE ?", Some("%j%".into()))
            .add_predicate("equity > 0", None)
            .add_predicate("salary > ?", Some(10_i64.into()));
        let clause = builder.into_where();

        assert_eq!(clause.sql, "WHERE title ILIKE $1 AND equity > 0 AND salary > $2");
        assert_eq!(clause.params.len(), 2);
        assert_eq!(clause.next_index, 3);
    }

    #[test]
    fn continues_from_offset() {
        let mut builder = ClauseBuilder::starting_at(4);
        builder.add_predicate("handle = ?", Some("c1".into()));
        let clause = builder.into_where();
        assert_eq!(clause.sql, "WHERE handle = $4");
        assert_eq!(clause.next_placeholder(), "$5");
    }

    #[test]
    fn empty_builder_yields_empty_clause() {
        let clause = ClauseBuilder::new().into_where();
        assert!(clause.is_empty());
        assert!(clause.params.is_empty());
        assert_eq!(clause.next_index, 1);
    }
}
