use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::catalog::{Catalog, CatalogSource};
use crate::diagnostics::{Diagnostic, DiagnosticSource};

/// Everything a session records in `events.jsonl`.
///
/// Serialized with the variant name as `type`; the writer stamps
/// `session_id` and `ts` on top.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    CatalogLoaded {
        transport: String,
        models: Vec<String>,
        presets: Vec<String>,
        models_source: CatalogSource,
        presets_source: CatalogSource,
    },
    Diagnostic {
        source: DiagnosticSource,
        message: String,
    },
    ImageSelected {
        path: String,
        width: u32,
        height: u32,
        mime_type: String,
    },
    EnhanceStarted {
        file_name: String,
        model_name: String,
        preset: String,
        custom_prompt: Option<String>,
        noise_level: f64,
        scientific_mode: bool,
    },
    EnhanceCompleted {
        completed_at: String,
        prompt_used: String,
        enhanced_width: u32,
        enhanced_height: u32,
        enhanced_mime_type: String,
    },
    EnhanceFailed {
        error: String,
    },
    DownloadWritten {
        path: String,
    },
    PreviewWritten {
        path: String,
    },
    SessionFinished {
        submissions: u64,
        completed: u64,
        failed: u64,
    },
}

impl SessionEvent {
    pub fn catalog_loaded(transport: &str, catalog: &Catalog) -> Self {
        Self::CatalogLoaded {
            transport: transport.to_string(),
            models: catalog.models().to_vec(),
            presets: catalog.presets().to_vec(),
            models_source: catalog.models_source(),
            presets_source: catalog.presets_source(),
        }
    }

    /// The `type` value written for this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CatalogLoaded { .. } => "catalog_loaded",
            Self::Diagnostic { .. } => "diagnostic",
            Self::ImageSelected { .. } => "image_selected",
            Self::EnhanceStarted { .. } => "enhance_started",
            Self::EnhanceCompleted { .. } => "enhance_completed",
            Self::EnhanceFailed { .. } => "enhance_failed",
            Self::DownloadWritten { .. } => "download_written",
            Self::PreviewWritten { .. } => "preview_written",
            Self::SessionFinished { .. } => "session_finished",
        }
    }
}

impl From<&Diagnostic> for SessionEvent {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self::Diagnostic {
            source: diagnostic.source,
            message: diagnostic.message.clone(),
        }
    }
}

/// Append-only JSONL log shared by every clone of the writer.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventLog>,
}

#[derive(Debug)]
struct EventLog {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventLog {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    /// Appends one line and returns the record as written.
    pub fn emit(&self, event: &SessionEvent) -> anyhow::Result<Value> {
        let mut record = match serde_json::to_value(event)? {
            Value::Object(map) => map,
            other => anyhow::bail!("session event serialized to non-object: {other}"),
        };
        record.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        record.insert("ts".to_string(), Value::String(now_utc_iso()));
        let line = serde_json::to_string(&record)?;

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        writeln!(file, "{line}")?;

        Ok(Value::Object(record))
    }

    /// Every record in the log, oldest first. A missing log reads as empty.
    pub fn records(&self) -> anyhow::Result<Vec<Value>> {
        let raw = match std::fs::read_to_string(&self.inner.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(raw
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .collect())
    }

    pub fn event_types(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .records()?
            .iter()
            .filter_map(|row| row.get("type").and_then(Value::as_str).map(str::to_string))
            .collect())
    }
}

pub(crate) fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
