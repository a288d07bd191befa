use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneKind {
    CompanyChange,
    TenureAnniversary { months: u32 },
    TitleEscalation,
    Certification,
}

impl MilestoneKind {
    pub fn class(self) -> MilestoneClass {
        match self {
            MilestoneKind::CompanyChange => MilestoneClass::CompanyChange,
            MilestoneKind::TenureAnniversary { .. } => MilestoneClass::TenureAnniversary,
            MilestoneKind::TitleEscalation => MilestoneClass::TitleEscalation,
            MilestoneKind::Certification => MilestoneClass::Certification,
        }
    }
}

/// Milestone kind without its payload. Workflows subscribe to a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneClass {
    CompanyChange,
    TenureAnniversary,
    TitleEscalation,
    Certification,
}

impl MilestoneClass {
    pub fn as_str(self) -> &'static str {
        match self {
            MilestoneClass::CompanyChange => "COMPANY_CHANGE",
            MilestoneClass::TenureAnniversary => "TENURE_ANNIVERSARY",
            MilestoneClass::TitleEscalation => "TITLE_ESCALATION",
            MilestoneClass::Certification => "CERTIFICATION",
        }
    }
}

impl fmt::Display for MilestoneClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MilestoneClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPANY_CHANGE" => Ok(MilestoneClass::CompanyChange),
            "TENURE_ANNIVERSARY" => Ok(MilestoneClass::TenureAnniversary),
            "TITLE_ESCALATION" => Ok(MilestoneClass::TitleEscalation),
            "CERTIFICATION" => Ok(MilestoneClass::Certification),
            other => Err(Error::Validation(format!("Unknown milestone class: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Before/after values of the field that produced a milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub field: String,
    pub before: Option<String>,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub detected_at: DateTime<Utc>,
    pub description: String,
    pub confidence: Confidence,
    pub evidence: Vec<Evidence>,
}
