use serde_json::{Map, Value};

use super::clause::ClauseBuilder;
use super::error::SqlError;
use super::field_map::FieldMap;
use super::types::{ColumnKind, CompiledClause, SqlValue};

/// One entry of an entity's update allow-list.
#[derive(Debug, Clone, Copy)]
pub struct UpdateField {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl UpdateField {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind, nullable: false }
    }

    pub const fn nullable(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind, nullable: true }
    }
}

/// What an explicit JSON `null` means for a given call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// `null` is a value: it clears the column.
    Include,
    /// `null` means "leave this column alone".
    Skip,
}

/// Ordered field/value pairs of a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    fields: Vec<(String, SqlValue)>,
}

impl UpdateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        self.fields.push((field.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(f, v)| (f.as_str(), v))
    }

    /// Validate a caller-supplied record against `allowed`, keeping its order.
    ///
    /// Unknown fields are rejected even when their value is null.
    pub fn from_record(
        record: &Map<String, Value>,
        allowed: &[UpdateField],
        nulls: NullPolicy,
    ) -> Result<Self, SqlError> {
        let mut spec = Self::new();
        for (name, value) in record {
            let field = allowed
                .iter()
                .find(|f| f.name == name.as_str())
                .ok_or_else(|| SqlError::BadField(name.clone()))?;

            if value.is_null() {
                if nulls == NullPolicy::Skip {
                    continue;
                }
                if !field.nullable {
                    return Err(SqlError::bad_value(name.as_str(), "cannot be null"));
                }
            }

            let value = field.kind.coerce(name, value)?;
            spec.push(name.as_str(), value);
        }

        if spec.is_empty() {
            return Err(SqlError::EmptyUpdate);
        }
        Ok(spec)
    }
}

/// Build `"col1"=$1, "col2"=$2, ...` for the fields of `spec`.
///
/// Only plain identifiers are interpolated; every value is a parameter.
pub fn compile_update(spec: &UpdateSpec, mapping: &FieldMap) -> Result<CompiledClause, SqlError> {
    if spec.is_empty() {
        return Err(SqlError::EmptyUpdate);
    }

    let mut builder = ClauseBuilder::new();
    for (field, value) in spec.iter() {
        let column = mapping.column(field);
        if !is_identifier(column) {
            return Err(SqlError::BadField(field.to_string()));
        }
        let template = format!("\"{}\"=?", column);
        builder.add_predicate(&template, Some(value.clone()));
    }
    Ok(builder.into_set())
}

fn is_identifier(column: &str) -> bool {
    !column.is_empty() && column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALLOWED: &[UpdateField] = &[
        UpdateField::new("title", ColumnKind::Text),
        UpdateField::new("salary", ColumnKind::Integer),
        UpdateField::nullable("equity", ColumnKind::Numeric),
    ];

    fn record(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn returns_sql_friendly_data_for_updating() {
        let mut spec = UpdateSpec::new();
        spec.push("firstName", "Jannette")
            .push("lastName", "Doe")
            .push("age", 213_i64)
            .push("isAdmin", true);
        let mapping = FieldMap(&[
            ("firstName", "first_name"),
            ("lastName", "last_name"),
            ("isAdmin", "is_admin"),
        ]);

        let clause = compile_update(&spec, &mapping).unwrap();

        assert_eq!(clause.sql, r#""first_name"=$1, "last_name"=$2, "age"=$3, "is_admin"=$4"#);
        assert_eq!(
            clause.params,
            vec![
                SqlValue::from("Jannette"),
                SqlValue::from("Doe"),
                SqlValue::from(213_i64),
                SqlValue::from(true),
            ]
        );
        assert_eq!(clause.next_placeholder(), "$5");
    }

    #[test]
    fn quoted_column_names_are_rejected() {
        let mut spec = UpdateSpec::new();
        spec.push("name", "x").push("a\"=1, \"b", "y");

        let err = compile_update(&spec, &FieldMap::IDENTITY).unwrap_err();

        assert_eq!(err, SqlError::BadField("a\"=1, \"b".to_string()));
    }

    #[test]
    fn empty_update_is_an_error() {
        let mapping = FieldMap(&[("firstName", "first_name")]);
        assert_eq!(compile_update(&UpdateSpec::new(), &mapping), Err(SqlError::EmptyUpdate));
    }

    #[test]
    fn placeholders_are_contiguous_and_match_params() {
        let mut spec = UpdateSpec::new();
        for i in 0..7_i64 {
            spec.push(format!("f{}", i), i);
        }
        let clause = compile_update(&spec, &FieldMap::IDENTITY).unwrap();

        let placeholders = clause.sql.matches('$').count();
        assert_eq!(placeholders, clause.params.len());
        for i in 1..=7 {
            assert!(clause.sql.contains(&format!("=${}", i)));
        }
        assert!(!clause.sql.contains("$8"));
    }

    #[test]
    fn falsy_values_are_real_values() {
        let spec = UpdateSpec::from_record(
            &record(json!({"salary": 0, "equity": null})),
            ALLOWED,
            NullPolicy::Include,
        )
        .unwrap();
        let clause = compile_update(&spec, &FieldMap::IDENTITY).unwrap();
        assert_eq!(clause.sql, r#""salary"=$1, "equity"=$2"#);
        assert_eq!(clause.params, vec![SqlValue::Integer(Some(0)), SqlValue::Numeric(None)]);
    }

    #[test]
    fn record_keeps_caller_order() {
        let spec = UpdateSpec::from_record(
            &record(json!({"salary": 5, "title": "t"})),
            ALLOWED,
            NullPolicy::Include,
        )
        .unwrap();
        let names: Vec<&str> = spec.iter().map(|(f, _)| f).collect();
        assert_eq!(names, vec!["salary", "title"]);
    }

    #[test]
    fn unknown_field_is_rejected_even_when_null() {
        let err = UpdateSpec::from_record(
            &record(json!({"title": "new", "company_handle": null})),
            ALLOWED,
            NullPolicy::Skip,
        )
        .unwrap_err();
        assert_eq!(err, SqlError::BadField("company_handle".to_string()));
    }

    #[test]
    fn skip_policy_drops_nulls() {
        let spec = UpdateSpec::from_record(
            &record(json!({"title": "new_j1", "salary": null, "equity": null})),
            ALLOWED,
            NullPolicy::Skip,
        )
        .unwrap();
        assert_eq!(spec.len(), 1);

        let err = UpdateSpec::from_record(&record(json!({"salary": null})), ALLOWED, NullPolicy::Skip)
            .unwrap_err();
        assert_eq!(err, SqlError::EmptyUpdate);
    }

    #[test]
    fn null_for_required_column_is_a_bad_value() {
        let err = UpdateSpec::from_record(&record(json!({"title": null})), ALLOWED, NullPolicy::Include)
            .unwrap_err();
        assert!(matches!(err, SqlError::BadValue { ref field, .. } if field == "title"));
    }

    #[test]
    fn empty_record_is_an_empty_update() {
        let err = UpdateSpec::from_record(&Map::new(), ALLOWED, NullPolicy::Include).unwrap_err();
        assert_eq!(err, SqlError::EmptyUpdate);
    }
}
