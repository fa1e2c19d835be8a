//! Session audit log.
//!
//! Every message the session publishes is appended to an NDJSON file: one
//! line per event with a UTC timestamp, a kind tag, the payload, and the
//! target participant where one exists. Write failures are logged and never
//! interrupt the session.

use crate::types::ClientId;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::error;

#[derive(Debug)]
pub struct EventLog {
    out: BufWriter<File>,
}

impl EventLog {
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
        })
    }

    /// Append one event line. Best effort.
    pub fn log<T: Serialize>(&mut self, kind: &str, message: &T, uid: Option<&ClientId>) {
        let mut line = json!({
            "time": Utc::now().to_rfc3339(),
            "type": kind,
            "message": message,
        });
        if let Some(uid) = uid {
            line["uid"] = json!(uid.as_str());
        }

        if let Err(err) = writeln!(self.out, "{line}") {
            error!(%kind, "failed to write event log line: {err}");
        }
    }

    pub fn flush(&mut self) {
        if let Err(err) = self.out.flush() {
            error!("failed to flush event log: {err}");
        }
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        self.flush();
    }
}
