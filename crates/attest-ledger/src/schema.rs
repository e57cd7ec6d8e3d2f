//! SQL for the append-only `receipts` table.
//!
//! Chain order is SQLite `rowid` order. Nothing in this crate issues
//! `UPDATE` or `DELETE` against the table.

pub(crate) const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS receipts (
  id TEXT PRIMARY KEY,
  tool TEXT NOT NULL,
  action TEXT NOT NULL CHECK(action IN ('invoke', 'block')),
  input_hash TEXT NOT NULL,
  output_hash TEXT NOT NULL,
  success INTEGER NOT NULL,
  policy_ref TEXT,
  caller_prefix TEXT,
  timestamp TEXT NOT NULL,
  duration_ms INTEGER NOT NULL,
  prev_hash TEXT NOT NULL,
  chain_hash TEXT NOT NULL
)";

pub(crate) const CREATE_INDEX_TOOL: &str =
    "CREATE INDEX IF NOT EXISTS idx_receipts_tool ON receipts(tool)";

pub(crate) const CREATE_INDEX_TIMESTAMP: &str =
    "CREATE INDEX IF NOT EXISTS idx_receipts_timestamp ON receipts(timestamp)";

pub(crate) const SELECT_COLUMNS: &str = "SELECT id, tool, action, input_hash, output_hash, success, \
     policy_ref, caller_prefix, timestamp, duration_ms, prev_hash, chain_hash FROM receipts";

pub(crate) const INSERT: &str = "INSERT INTO receipts \
     (id, tool, action, input_hash, output_hash, success, policy_ref, caller_prefix, \
      timestamp, duration_ms, prev_hash, chain_hash) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

pub(crate) const SELECT_TIP: &str =
    "SELECT chain_hash, timestamp FROM receipts ORDER BY rowid DESC LIMIT 1";

pub(crate) const SELECT_CHAIN: &str = "SELECT id, tool, action, input_hash, output_hash, success, \
     policy_ref, caller_prefix, timestamp, duration_ms, prev_hash, chain_hash FROM receipts \
     ORDER BY rowid ASC";

pub(crate) const SELECT_TOTALS: &str = "SELECT COUNT(*), \
     SUM(CASE WHEN success = 1 THEN 1 ELSE 0 END), MIN(timestamp), MAX(timestamp) FROM receipts";

pub(crate) const SELECT_COUNT_BY_TOOL: &str =
    "SELECT tool, COUNT(*) FROM receipts GROUP BY tool ORDER BY tool";
