use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::now_utc_iso;

/// Totals for one shell session, written once when the session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub submissions: u64,
    pub completed: u64,
    pub failed: u64,
    pub last_prompt_used: Option<String>,
    pub downloads: Vec<String>,
}

pub fn write_summary(
    path: &Path,
    summary: &SessionSummary,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = match serde_json::to_value(summary)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{write_summary, SessionSummary};

    #[test]
    fn write_summary_generates_expected_payload() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("summary.json");

        let summary = SessionSummary {
            session_id: "session-123".to_string(),
            started_at: "2026-10-15T00:00:00+00:00".to_string(),
            finished_at: "2026-10-15T00:10:00+00:00".to_string(),
            submissions: 3,
            completed: 2,
            failed: 1,
            last_prompt_used: Some("spiral galaxy, sharp arms".to_string()),
            downloads: vec!["enhanced_image_2026-10-15_00-05-00.png".to_string()],
        };
        let mut extra = Map::new();
        extra.insert("theme".to_string(), Value::String("space".to_string()));
        write_summary(&path, &summary, Some(&extra))?;

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        assert_eq!(parsed["session_id"], json!("session-123"));
        assert_eq!(parsed["completed"], json!(2));
        assert_eq!(parsed["failed"], json!(1));
        assert_eq!(
            parsed["downloads"][0],
            json!("enhanced_image_2026-10-15_00-05-00.png")
        );
        assert_eq!(parsed["theme"], json!("space"));
        assert!(parsed.get("ts").and_then(Value::as_str).is_some());
        Ok(())
    }
}
