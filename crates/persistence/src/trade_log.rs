//! Append-only CSV log of completed trades.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use tracing::debug;
use trade_stats::TradeRecord;

use crate::error::PersistenceError;

const HEADER: &str = "Timestamp,ID,Side,EntryPrice,ExitPrice,Size,Leverage,PnL,PnL%,Reason,Duration(min)";

/// Appends completed trades to a CSV file, writing the header on creation.
///
/// Append mode keeps earlier rows safe if a write is interrupted.
#[derive(Debug)]
pub struct TradeLogWriter {
    path: PathBuf,
}

impl TradeLogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &TradeRecord) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let is_new = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);

        if is_new {
            writeln!(writer, "{HEADER}")?;
        }

        let timestamp = DateTime::from_timestamp_millis(record.closed_at_ms)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| record.closed_at_ms.to_string());

        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{}",
            timestamp,
            record.id,
            record.side,
            record.entry_price,
            record.exit_price,
            record.size,
            record.leverage,
            record.pnl,
            record.pnl_pct,
            record.reason,
            record.duration_minutes(),
        )?;
        writer.flush()?;

        debug!(id = record.id, path = %self.path.display(), "trade appended to CSV log");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::PositionSide;
    use rust_decimal_macros::dec;

    fn record(id: u64) -> TradeRecord {
        TradeRecord {
            id,
            side: PositionSide::Long,
            entry_price: dec!(50000),
            exit_price: dec!(50500),
            size: dec!(100),
            leverage: 10,
            pnl: dec!(50000),
            pnl_pct: dec!(10),
            reason: "take-profit".to_string(),
            opened_at_ms: 1_700_000_000_000,
            closed_at_ms: 1_700_000_120_000,
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        let writer = TradeLogWriter::new(&path);

        writer.append(&record(1)).unwrap();
        writer.append(&record(2)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].contains(",1,LONG,50000,50500,100,10,50000,10,take-profit,2"));
        assert!(lines[2].starts_with("20"));
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("trades.csv");

        TradeLogWriter::new(&path).append(&record(1)).unwrap();
        assert!(path.exists());
    }
}
