/// Explicit API-field to column mapping.
///
/// Fields that are absent from the mapping already match their column name
/// (`name`, `description`, ...).
#[derive(Debug, Clone, Copy)]
pub struct FieldMap(pub &'static [(&'static str, &'static str)]);

impl FieldMap {
    pub const IDENTITY: FieldMap = FieldMap(&[]);

    pub fn column<'a>(&self, field: &'a str) -> &'a str {
        map_field_name(field, self)
    }

    /// Reverse lookup, used to alias selected columns back to API names.
    pub fn field<'a>(&self, column: &'a str) -> &'a str {
        self.0
            .iter()
            .find(|(_, c)| *c == column)
            .map(|(f, _)| *f)
            .unwrap_or(column)
    }
}

pub fn map_field_name<'a>(name: &'a str, mapping: &FieldMap) -> &'a str {
    mapping
        .0
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, column)| *column)
        .unwrap_or(name)
}

/// Render `column AS "field"` for each selected column, in order.
pub fn select_list(columns: &[&str], mapping: &FieldMap) -> String {
    columns
        .iter()
        .map(|column| {
            let field = mapping.field(column);
            if field == *column {
                (*column).to_string()
            } else {
                format!("{} AS \"{}\"", column, field)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
