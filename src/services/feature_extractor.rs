use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::candidate::Candidate;
use crate::models::history::HistoryEntry;
use crate::models::job::Job;
use crate::utils::text::{normalize, words};
use crate::utils::time::months_between;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationMatch {
    Exact,
    SameRegion,
    RemoteCompatible,
    Mismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSignal {
    Seniority,
    Location,
    Tenure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleConfidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillOverlap {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub preferred_matched: Vec<String>,
    pub required_count: usize,
}

/// Comparable attributes of one (candidate, job) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBundle {
    pub skills: SkillOverlap,
    /// Candidate years minus the years the job implies. Positive means over-qualified.
    pub seniority_delta: Option<f64>,
    pub location: Option<LocationMatch>,
    /// Average months per past role.
    pub tenure_months: Option<f64>,
    pub missing: Vec<MissingSignal>,
    pub confidence: BundleConfidence,
}

const SENIORITY_LEVELS: &[(&str, f64)] = &[
    ("intern", 0.0),
    ("junior", 1.0),
    ("jr", 1.0),
    ("mid", 3.0),
    ("senior", 5.0),
    ("sr", 5.0),
    ("staff", 7.0),
    ("lead", 7.0),
    ("principal", 9.0),
    ("director", 10.0),
    ("vp", 12.0),
];

const DEFAULT_JOB_YEARS: f64 = 3.0;

pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Never fails: absent candidate data is reported in `missing` and lowers `confidence`.
    pub fn extract(candidate: &Candidate, history: &[HistoryEntry], job: &Job) -> FeatureBundle {
        let skills = Self::skill_overlap(&candidate.skills, job);
        let seniority_delta = candidate
            .total_years_experience
            .filter(|years| years.is_finite() && *years >= 0.0)
            .map(|years| years - Self::implied_years(job));
        let location = Self::classify_location(candidate.location.as_deref(), job);
        let tenure_months = Self::average_tenure_months(history);

        let mut missing = Vec::new();
        if seniority_delta.is_none() {
            missing.push(MissingSignal::Seniority);
        }
        if location.is_none() {
            missing.push(MissingSignal::Location);
        }
        if tenure_months.is_none() {
            missing.push(MissingSignal::Tenure);
        }
        let confidence = match missing.len() {
            0 => BundleConfidence::High,
            1 => BundleConfidence::Medium,
            _ => BundleConfidence::Low,
        };

        FeatureBundle {
            skills,
            seniority_delta,
            location,
            tenure_months,
            missing,
            confidence,
        }
    }

    fn skill_overlap(candidate_skills: &[String], job: &Job) -> SkillOverlap {
        let owned: BTreeSet<String> = candidate_skills
            .iter()
            .map(|s| normalize(s))
            .filter(|s| !s.is_empty())
            .collect();

        let mut seen = BTreeSet::new();
        let mut matched = Vec::new();
        let mut missing = Vec::new();
        for skill in &job.required_skills {
            let key = normalize(skill);
            if key.is_empty() || !seen.insert(key.clone()) {
                continue;
            }
            if owned.contains(&key) {
                matched.push(skill.trim().to_string());
            } else {
                missing.push(skill.trim().to_string());
            }
        }

        let preferred_matched = job
            .preferred_skills
            .iter()
            .filter(|s| {
                let key = normalize(s);
                !seen.contains(&key) && owned.contains(&key)
            })
            .map(|s| s.trim().to_string())
            .collect();

        SkillOverlap {
            required_count: matched.len() + missing.len(),
            matched,
            missing,
            preferred_matched,
        }
    }

    pub fn implied_years(job: &Job) -> f64 {
        if let Some(years) = job.min_years_experience.filter(|y| y.is_finite() && *y >= 0.0) {
            return years;
        }
        words(&job.title)
            .find_map(|word| {
                SENIORITY_LEVELS
                    .iter()
                    .find(|(keyword, _)| *keyword == word)
                    .map(|(_, years)| *years)
            })
            .unwrap_or(DEFAULT_JOB_YEARS)
    }

    fn classify_location(candidate_location: Option<&str>, job: &Job) -> Option<LocationMatch> {
        let job_location = job.location.as_deref().map(normalize).filter(|l| !l.is_empty());
        let remote = job.is_remote
            || job_location
                .as_deref()
                .map(|l| l.contains("remote"))
                .unwrap_or(false);
        let candidate_location = candidate_location.map(normalize).filter(|l| !l.is_empty());

        match (candidate_location, job_location) {
            (Some(cand), Some(job_loc)) => {
                if cand == job_loc {
                    Some(LocationMatch::Exact)
                } else if region(&cand).is_some() && region(&cand) == region(&job_loc) {
                    Some(LocationMatch::SameRegion)
                } else if remote {
                    Some(LocationMatch::RemoteCompatible)
                } else {
                    Some(LocationMatch::Mismatch)
                }
            }
            _ if remote => Some(LocationMatch::RemoteCompatible),
            _ => None,
        }
    }

    /// Only roles that have a successor count: the current role is still open.
    fn average_tenure_months(history: &[HistoryEntry]) -> Option<f64> {
        let starts: Vec<_> = history
            .iter()
            .filter(|entry| entry.position().is_some())
            .map(|entry| entry.effective_at)
            .collect();
        if starts.len() < 2 {
            return None;
        }
        let total: f64 = starts
            .windows(2)
            .map(|pair| months_between(pair[0], pair[1]))
            .sum();
        Some(total / (starts.len() - 1) as f64)
    }
}

/// Trailing component of "City, Region" style strings.
fn region(location: &str) -> Option<&str> {
    let mut parts = location.rsplitn(2, ',');
    let last = parts.next()?.trim();
    parts.next()?;
    (!last.is_empty()).then_some(last)
}
