//! Warm-state snapshots for fast restarts.

use std::fs;
use std::path::Path;

use execution_core::LocalPosition;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PersistenceError;

/// Snapshots older than this are discarded on load (1 hour).
pub const WARM_STATE_MAX_AGE_MS: i64 = 3_600_000;

/// Everything a restarted bot needs to resume without double-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmState {
    pub position: LocalPosition,
    pub last_bar_close_ms: i64,
    pub saved_at_ms: i64,
}

/// Atomically persist the warm state: write a sibling temp file, then rename.
pub fn save_warm_state(path: &Path, state: &WarmState) -> Result<(), PersistenceError> {
    let json = serde_json::to_vec_pretty(state)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    fs::write(tmp, &json)?;
    fs::rename(tmp, path)?;
    Ok(())
}

/// Load the warm state, tolerating any failure by starting cold.
///
/// Returns `None` when the file is missing, unreadable, unparseable, or
/// older than [`WARM_STATE_MAX_AGE_MS`].
pub fn load_warm_state(path: &Path, now_ms: i64) -> Option<WarmState> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read warm state, starting cold");
            return None;
        }
    };

    let state: WarmState = match serde_json::from_slice(&data) {
        Ok(state) => state,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt warm state, starting cold");
            return None;
        }
    };

    let age_ms = now_ms - state.saved_at_ms;
    if age_ms > WARM_STATE_MAX_AGE_MS {
        info!(age_ms, "warm state is stale, starting cold");
        return None;
    }

    info!(
        age_ms,
        side = %state.position.side,
        last_bar_close_ms = state.last_bar_close_ms,
        "loaded warm state"
    );
    Some(state)
}
