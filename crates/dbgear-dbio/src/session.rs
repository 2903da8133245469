//! Connection abstraction used by the apply engine and introspection.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use dbgear_core::Result;

/// Named parameters, referenced from SQL as `:name`.
pub type Params = Map<String, Value>;

/// One result row, column label to value.
pub type Record = Map<String, Value>;

/// A single database connection.
///
/// Statements run in the order they are issued. SQL text always comes from
/// trusted templates; values travel as [`Params`].
#[async_trait]
pub trait Session: Send {
    /// Run a statement and return the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &Params) -> Result<u64>;

    async fn select_all(&mut self, sql: &str, params: &Params) -> Result<Vec<Record>>;

    async fn select_one(&mut self, sql: &str, params: &Params) -> Result<Option<Record>> {
        Ok(self.select_all(sql, params).await?.into_iter().next())
    }

    async fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN", &Params::new()).await.map(|_| ())
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT", &Params::new()).await.map(|_| ())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK", &Params::new()).await.map(|_| ())
    }

    /// Release the connection. Further calls fail.
    async fn close(&mut self) -> Result<()>;
}

/// Build a [`Params`] map from `(name, value)` pairs.
pub fn params<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedStatement {
    pub sql: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Params,
}

/// Records statements instead of running them. Every query returns no rows,
/// so existence checks report "absent".
#[derive(Debug, Default)]
pub struct DryRunSession {
    statements: Vec<RecordedStatement>,
}

impl DryRunSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> &[RecordedStatement] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<RecordedStatement> {
        self.statements
    }
}

#[async_trait]
impl Session for DryRunSession {
    async fn execute(&mut self, sql: &str, params: &Params) -> Result<u64> {
        tracing::debug!(event = "dry_run_statement", sql = %sql);
        self.statements.push(RecordedStatement {
            sql: sql.to_string(),
            params: params.clone(),
        });
        Ok(0)
    }

    async fn select_all(&mut self, _sql: &str, _params: &Params) -> Result<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
