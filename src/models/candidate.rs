use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    Active,
    Archived,
    Contacted,
    Hired,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::Active => "ACTIVE",
            CandidateStatus::Archived => "ARCHIVED",
            CandidateStatus::Contacted => "CONTACTED",
            CandidateStatus::Hired => "HIRED",
            CandidateStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(CandidateStatus::Active),
            "ARCHIVED" => Ok(CandidateStatus::Archived),
            "CONTACTED" => Ok(CandidateStatus::Contacted),
            "HIRED" => Ok(CandidateStatus::Hired),
            "REJECTED" => Ok(CandidateStatus::Rejected),
            other => Err(Error::Validation(format!("Unknown candidate status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    /// Employer recorded at the last milestone detection run.
    pub last_known_company: Option<String>,
    pub location: Option<String>,
    pub total_years_experience: Option<f64>,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    pub degrees: Option<String>,
    pub notes: Option<String>,
    pub summary: Option<String>,
    pub status: CandidateStatus,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    /// First word of the current title, used as a coarse "skill area" in outreach copy.
    pub fn skill_area(&self) -> Option<&str> {
        self.current_title
            .as_deref()
            .and_then(|t| t.split_whitespace().next())
    }
}
