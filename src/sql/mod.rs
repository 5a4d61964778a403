pub mod clause;
pub mod error;
pub mod field_map;
pub mod filter_where;
pub mod partial_update;
pub mod types;

pub use clause::ClauseBuilder;
pub use error::SqlError;
pub use field_map::{map_field_name, select_list, FieldMap};
pub use filter_where::{compile_filter, compile_filter_from, Criterion, FilterGrammar, FilterRule, FilterSpec, PredicateKind};
pub use partial_update::{compile_update, NullPolicy, UpdateField, UpdateSpec};
pub use types::{ColumnKind, CompiledClause, SqlValue};
