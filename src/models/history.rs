use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One dated entry of a candidate's career timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub candidate_id: Uuid,
    pub effective_at: DateTime<Utc>,
    pub kind: HistoryKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryKind {
    Position { company: String, title: String },
    Certification { name: String },
}

impl HistoryEntry {
    pub fn position(&self) -> Option<(&str, &str)> {
        match &self.kind {
            HistoryKind::Position { company, title } => Some((company.as_str(), title.as_str())),
            HistoryKind::Certification { .. } => None,
        }
    }
}
