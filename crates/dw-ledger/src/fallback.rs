//! Best-effort fallback log for ledger write failures.

use crate::error::{LedgerError, LedgerResult};
use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the fallback log inside the project's target directory.
pub const FALLBACK_FILE: &str = "ledger_fallback.log";

/// Append-only text log, one RFC 3339 timestamped line per entry.
#[derive(Debug, Clone)]
pub struct FallbackLog {
    path: PathBuf,
}

impl FallbackLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_target(target_dir: &Path) -> Self {
        Self::new(target_dir.join(FALLBACK_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. Newlines inside the message are flattened.
    pub fn append(&self, message: &str) -> LedgerResult<()> {
        let to_err = |source| LedgerError::FallbackWrite {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(to_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(to_err)?;
        let line = message.replace('\n', " | ");
        writeln!(
            file,
            "{} {line}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        )
        .map_err(to_err)
    }
}
