//! SQLite-backed receipt store.
//!
//! [`Ledger`] owns the connection pool and the in-memory chain tip. It is
//! cheap to clone; clones share the same pool and tip.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use attest_core::{
    Action, CallerPrefix, ChainVerification, NewReceipt, Receipt, ReceiptId, Timestamp, GENESIS,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{QueryBuilder, Sqlite};
use tokio::sync::Mutex;

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::query::ListFilter;
use crate::schema;
use crate::summary::{success_rate, ReceiptSummary};

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Head of the chain as seen by this process.
#[derive(Debug)]
struct ChainTip {
    hash: String,
    last_timestamp: Option<Timestamp>,
}

struct LedgerInner {
    pool: SqlitePool,
    path: PathBuf,
    tip: Mutex<ChainTip>,
    closed: AtomicBool,
}

/// Hash-chained, append-only receipt ledger.
#[derive(Clone)]
pub struct Ledger {
    inner: Arc<LedgerInner>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("path", &self.inner.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Ledger {
    /// Open (or create) the ledger at the location `config` resolves to.
    pub async fn open(config: &LedgerConfig) -> Result<Self, LedgerError> {
        Self::open_at(config.resolve_path()).await
    }

    /// Open (or create) the ledger at `path`.
    ///
    /// Creates missing parent directories, switches the database to WAL mode,
    /// ensures the schema exists, and recovers the tip from the last row.
    pub async fn open_at(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LedgerError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        for statement in [
            schema::CREATE_TABLE,
            schema::CREATE_INDEX_TOOL,
            schema::CREATE_INDEX_TIMESTAMP,
        ] {
            sqlx::query(statement).execute(&pool).await?;
        }

        let tip = recover_tip(&pool).await?;
        tracing::debug!(path = %path.display(), tip = %tip.hash, "receipt ledger opened");

        Ok(Self {
            inner: Arc::new(LedgerInner {
                pool,
                path,
                tip: Mutex::new(tip),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Database file backing this ledger.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Current chain tip: the last receipt's chain hash, or [`GENESIS`].
    pub async fn tip(&self) -> String {
        self.inner.tip.lock().await.hash.clone()
    }

    /// Seal `new` onto the chain and persist it.
    ///
    /// The critical section runs on its own task, so dropping the returned
    /// future cannot leave a persisted row behind an unadvanced tip.
    pub async fn append(&self, new: NewReceipt) -> Result<Receipt, LedgerError> {
        self.ensure_open()?;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.append_locked(new).await })
            .await
            .map_err(|e| LedgerError::Task(e.to_string()))?
    }

    /// Receipts matching `filter`, in insertion order.
    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<Receipt>, LedgerError> {
        self.ensure_open()?;
        let since = filter.since_bound()?;
        let until = filter.until_bound()?;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(schema::SELECT_COLUMNS);
        let mut sep = " WHERE ";
        if let Some(tool) = filter.tool.as_ref().filter(|t| !t.is_empty()) {
            qb.push(sep).push("tool = ").push_bind(tool.clone());
            sep = " AND ";
        }
        if let Some(since) = since {
            qb.push(sep).push("timestamp >= ").push_bind(since);
            sep = " AND ";
        }
        if let Some(until) = until {
            qb.push(sep).push("timestamp <= ").push_bind(until);
        }
        qb.push(" ORDER BY rowid ASC LIMIT ")
            .push_bind(filter.effective_limit())
            .push(" OFFSET ")
            .push_bind(filter.effective_offset());

        let rows: Vec<ReceiptRow> = qb.build_query_as().fetch_all(&self.inner.pool).await?;
        rows.into_iter().map(ReceiptRow::into_receipt).collect()
    }

    /// Walk the whole chain from the first receipt.
    pub async fn verify_chain(&self) -> Result<ChainVerification, LedgerError> {
        self.ensure_open()?;
        let rows = sqlx::query_as::<_, ReceiptRow>(schema::SELECT_CHAIN)
            .fetch_all(&self.inner.pool)
            .await?;
        Ok(verify_rows(rows))
    }

    /// Aggregate statistics, read from a single snapshot.
    pub async fn summary(&self) -> Result<ReceiptSummary, LedgerError> {
        self.ensure_open()?;
        let mut tx = self.inner.pool.begin().await?;

        let (total, successes, first, last): (i64, Option<i64>, Option<String>, Option<String>) =
            sqlx::query_as(schema::SELECT_TOTALS)
                .fetch_one(&mut *tx)
                .await?;

        if total == 0 {
            tx.commit().await?;
            return Ok(ReceiptSummary::empty());
        }

        let by_tool: Vec<(String, i64)> = sqlx::query_as(schema::SELECT_COUNT_BY_TOOL)
            .fetch_all(&mut *tx)
            .await?;
        let rows = sqlx::query_as::<_, ReceiptRow>(schema::SELECT_CHAIN)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        let total = to_count(total);
        Ok(ReceiptSummary {
            total,
            by_tool: by_tool
                .into_iter()
                .map(|(tool, n)| (tool, to_count(n)))
                .collect::<BTreeMap<_, _>>(),
            success_rate: success_rate(to_count(successes.unwrap_or(0)), total),
            chain_valid: verify_rows(rows).valid,
            first_timestamp: first.and_then(|s| Timestamp::parse(&s).ok()),
            last_timestamp: last.and_then(|s| Timestamp::parse(&s).ok()),
        })
    }

    /// Release the connection pool. Later calls are no-ops.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.pool.close().await;
        tracing::debug!(path = %self.inner.path.display(), "receipt ledger closed");
    }

    /// Whether [`Ledger::close()`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), LedgerError> {
        if self.is_closed() {
            Err(LedgerError::Closed)
        } else {
            Ok(())
        }
    }
}

impl LedgerInner {
    async fn append_locked(&self, new: NewReceipt) -> Result<Receipt, LedgerError> {
        let mut tip = self.tip.lock().await;

        // Keep timestamps non-decreasing even if the wall clock steps back.
        let now = Timestamp::now();
        let timestamp = tip.last_timestamp.map_or(now, |last| last.max(now));
        let receipt = Receipt::seal(new, ReceiptId::generate(), timestamp, tip.hash.clone());

        sqlx::query(schema::INSERT)
            .bind(receipt.id.as_str())
            .bind(&receipt.tool)
            .bind(receipt.action.as_str())
            .bind(&receipt.input_hash)
            .bind(&receipt.output_hash)
            .bind(receipt.success)
            .bind(receipt.policy_ref.as_deref())
            .bind(receipt.caller_prefix.as_ref().map(CallerPrefix::as_str))
            .bind(receipt.timestamp.to_iso8601())
            .bind(i64::try_from(receipt.duration_ms).unwrap_or(i64::MAX))
            .bind(&receipt.prev_hash)
            .bind(&receipt.chain_hash)
            .execute(&self.pool)
            .await?;

        // Only a confirmed write moves the tip.
        tip.hash = receipt.chain_hash.clone();
        tip.last_timestamp = Some(receipt.timestamp);

        tracing::debug!(id = %receipt.id, tool = %receipt.tool, success = receipt.success, "receipt appended");
        Ok(receipt)
    }
}

async fn recover_tip(pool: &SqlitePool) -> Result<ChainTip, LedgerError> {
    let last: Option<(String, String)> = sqlx::query_as(schema::SELECT_TIP)
        .fetch_optional(pool)
        .await?;

    Ok(match last {
        None => ChainTip {
            hash: GENESIS.to_string(),
            last_timestamp: None,
        },
        Some((hash, timestamp)) => {
            let last_timestamp = match Timestamp::parse(&timestamp) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    tracing::warn!(error = %e, "last receipt has an unreadable timestamp");
                    None
                }
            };
            ChainTip {
                hash,
                last_timestamp,
            }
        }
    })
}

/// Verify a full chain read from storage.
///
/// A row that cannot be decoded counts as a break at its position, unless
/// an earlier receipt already broke the chain.
fn verify_rows(rows: Vec<ReceiptRow>) -> ChainVerification {
    let mut receipts = Vec::with_capacity(rows.len());
    let mut undecodable = None;
    for row in rows {
        let id = row.id.clone();
        match row.into_receipt() {
            Ok(receipt) => receipts.push(receipt),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "undecodable receipt row");
                undecodable = Some(id);
                break;
            }
        }
    }

    let verification = attest_core::verify_chain(&receipts);
    match undecodable {
        Some(id) if verification.valid => ChainVerification {
            valid: false,
            receipts_checked: verification.receipts_checked,
            broken_at: Some(ReceiptId::from(id)),
        },
        _ => verification,
    }
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Internal row type for SQLx mapping.
#[derive(Clone, sqlx::FromRow)]
struct ReceiptRow {
    id: String,
    tool: String,
    action: String,
    input_hash: String,
    output_hash: String,
    success: i64,
    policy_ref: Option<String>,
    caller_prefix: Option<String>,
    timestamp: String,
    duration_ms: i64,
    prev_hash: String,
    chain_hash: String,
}

impl ReceiptRow {
    fn into_receipt(self) -> Result<Receipt, LedgerError> {
        let corrupt = |reason: String| LedgerError::Corrupt {
            id: self.id.clone(),
            reason,
        };

        let action: Action = self.action.parse().map_err(|e| corrupt(format!("{e}")))?;
        let timestamp = Timestamp::parse(&self.timestamp).map_err(|e| corrupt(format!("{e}")))?;
        // A reformatted timestamp denoting the same instant must still be caught.
        if timestamp.to_iso8601() != self.timestamp {
            return Err(corrupt(format!(
                "non-canonical timestamp {:?}",
                self.timestamp
            )));
        }
        // Only 0 and 1 are written; any other truthy integer is tampering.
        let success = match self.success {
            0 => false,
            1 => true,
            other => return Err(corrupt(format!("non-boolean success {other}"))),
        };
        let duration_ms = u64::try_from(self.duration_ms)
            .map_err(|_| corrupt(format!("negative duration {}", self.duration_ms)))?;

        Ok(Receipt {
            id: ReceiptId::from(self.id),
            tool: self.tool,
            action,
            input_hash: self.input_hash,
            output_hash: self.output_hash,
            success,
            policy_ref: self.policy_ref,
            caller_prefix: self.caller_prefix.map(CallerPrefix::from_redacted),
            timestamp,
            duration_ms,
            prev_hash: self.prev_hash,
            chain_hash: self.chain_hash,
        })
    }
}
