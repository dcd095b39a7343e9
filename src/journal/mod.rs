//! BT-012: Run journal. Per-target command output and the JSONL event log.

pub mod eventlog;
pub mod target_log;
