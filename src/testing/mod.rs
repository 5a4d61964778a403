use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::database::executor::{Executor, JsonRow};
use crate::database::manager::DatabaseError;
use crate::sql::SqlValue;

/// A statement as the executor received it.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// In-memory executor: replays scripted result sets in order and records
/// every statement it is asked to run.
///
/// Once the script runs out every further statement returns no rows.
#[derive(Default)]
pub struct RecordingExecutor {
    responses: Mutex<VecDeque<Vec<JsonRow>>>,
    queries: Mutex<Vec<RecordedQuery>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next unanswered statement.
    pub fn respond(self, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                other => panic!("scripted row must be an object, got {}", other),
            })
            .collect();
        self.responses.lock().unwrap().push_back(rows);
        self
    }

    /// Queue an empty result set.
    pub fn respond_empty(self) -> Self {
        self.respond(vec![])
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<JsonRow>, DatabaseError> {
        self.queries.lock().unwrap().push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Collapse runs of whitespace so multi-line SQL can be compared on one line.
pub fn squash(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replays_script_then_returns_nothing() {
        let db = RecordingExecutor::new().respond(vec![json!({"handle": "c1"})]);

        let first = db.fetch_all("SELECT 1", &[]).await.unwrap();
        let second = db.fetch_optional("SELECT 2", &[SqlValue::from(2_i64)]).await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_none());
        assert_eq!(db.query_count(), 2);
        assert_eq!(db.queries()[1].params, vec![SqlValue::from(2_i64)]);
    }

    #[test]
    fn squash_normalizes_whitespace() {
        assert_eq!(squash("SELECT a,\n      b\n  FROM t"), "SELECT a, b FROM t");
    }
}
