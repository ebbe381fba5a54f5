//! SQLite adapter for the transaction sink.
//!
//! One `transactions` table, append-only. Blocking rusqlite calls run on the
//! blocking pool; the connection mutex serializes concurrent writers.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use tracing::debug;

use upis_core::{
    domain::{TransactionKind, TransactionRecord, TIMESTAMP_FORMAT},
    errors::Error,
    ports::TransactionSink,
    Result,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    amount  REAL NOT NULL,
    type    TEXT NOT NULL,
    date    TEXT NOT NULL
);
";

#[derive(Clone)]
pub struct SqliteTransactionSink {
    conn: Arc<Mutex<Connection>>,
}

fn map_err(e: rusqlite::Error) -> Error {
    Error::Store(format!("sqlite error: {e}"))
}

impl SqliteTransactionSink {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(map_err)?;
        debug!("Opened transaction database {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory().map_err(map_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(map_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// All stored rows in insertion order.
    pub fn records(&self) -> Result<Vec<TransactionRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::Store("sqlite connection lock poisoned".to_string()))?;
        let mut stmt = conn
            .prepare("SELECT amount, type, date FROM transactions ORDER BY id")
            .map_err(map_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(map_err)?;

        let mut out = Vec::new();
        for row in rows {
            let (amount, kind, date) = row.map_err(map_err)?;
            let kind = TransactionKind::parse(&kind)
                .ok_or_else(|| Error::Store(format!("unknown transaction type: {kind}")))?;
            let timestamp = NaiveDateTime::parse_from_str(&date, TIMESTAMP_FORMAT)
                .map_err(|e| Error::Store(format!("bad transaction date {date}: {e}")))?;
            out.push(TransactionRecord {
                amount,
                kind,
                timestamp,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl TransactionSink for SqliteTransactionSink {
    async fn insert(&self, record: &TransactionRecord) -> Result<()> {
        let conn = self.conn.clone();
        let amount = record.amount;
        let kind = record.kind.as_str();
        let date = record.formatted_timestamp();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| Error::Store("sqlite connection lock poisoned".to_string()))?;
            conn.execute(
                "INSERT INTO transactions (amount, type, date) VALUES (?1, ?2, ?3)",
                params![amount, kind, date],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Store(format!("sqlite insert task failed: {e}")))?
    }
}
