use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::history::HistoryEntry;
use crate::models::job::Job;
use crate::services::feature_extractor::{
    BundleConfidence, FeatureBundle, FeatureExtractor, LocationMatch,
};

const NEUTRAL: f64 = 0.5;

/// Relative weight of each signal. Only ratios matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub skills: f64,
    pub seniority: f64,
    pub location: f64,
    pub tenure: f64,
    /// Years of seniority mismatch at which the sub-score falls to 1/e.
    pub seniority_decay_years: f64,
    /// Average months per role that earns a full tenure sub-score.
    pub tenure_target_months: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            skills: 0.5,
            seniority: 0.2,
            location: 0.2,
            tenure: 0.1,
            seniority_decay_years: 4.0,
            tenure_target_months: 24.0,
        }
    }
}

impl MatchWeights {
    pub fn validate(&self) -> Result<()> {
        let weights = [self.skills, self.seniority, self.location, self.tenure];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Validation(
                "match weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(Error::Validation(
                "at least one match weight must be positive".to_string(),
            ));
        }
        if !(self.seniority_decay_years.is_finite() && self.seniority_decay_years > 0.0) {
            return Err(Error::Validation(
                "seniority decay must be a positive number of years".to_string(),
            ));
        }
        if !(self.tenure_target_months.is_finite() && self.tenure_target_months > 0.0) {
            return Err(Error::Validation(
                "tenure target must be a positive number of months".to_string(),
            ));
        }
        Ok(())
    }

    fn total(&self) -> f64 {
        self.skills + self.seniority + self.location + self.tenure
    }
}

/// Parses `skills=0.5,seniority=0.2,...`. Unnamed keys keep their defaults.
impl FromStr for MatchWeights {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut weights = MatchWeights::default();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("Invalid weight entry: {}", pair)))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid weight for {}: {}", key, e)))?;
            match key.trim() {
                "skills" => weights.skills = value,
                "seniority" => weights.seniority = value,
                "location" => weights.location = value,
                "tenure" => weights.tenure = value,
                "seniority_decay_years" => weights.seniority_decay_years = value,
                "tenure_target_months" => weights.tenure_target_months = value,
                other => return Err(Error::Config(format!("Unknown match weight: {}", other))),
            }
        }
        weights
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(weights)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub skills: f64,
    pub seniority: f64,
    pub location: f64,
    pub tenure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub score: f64,
    pub rationale: Vec<String>,
    pub sub_scores: SubScores,
    pub confidence: BundleConfidence,
}

/// One ranked job for a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatch {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub company_name: String,
    #[serde(flatten)]
    pub scored: ScoredMatch,
}

/// One ranked candidate for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub job_id: Uuid,
    #[serde(flatten)]
    pub scored: ScoredMatch,
}

pub struct MatchScorer;

impl MatchScorer {
    /// Weighted linear combination of normalized sub-scores, scaled to [0, 100].
    /// Pure: identical inputs always give identical output.
    pub fn score(bundle: &FeatureBundle, weights: &MatchWeights) -> ScoredMatch {
        let sub_scores = SubScores {
            skills: skill_score(bundle),
            seniority: bundle
                .seniority_delta
                .map(|delta| (-delta.abs() / weights.seniority_decay_years).exp())
                .unwrap_or(NEUTRAL),
            location: bundle.location.map(location_score).unwrap_or(NEUTRAL),
            tenure: bundle
                .tenure_months
                .map(|months| (months / weights.tenure_target_months).min(1.0))
                .unwrap_or(NEUTRAL),
        };

        let total = weights.total();
        let raw = if total > 0.0 {
            100.0
                * (weights.skills * sub_scores.skills
                    + weights.seniority * sub_scores.seniority
                    + weights.location * sub_scores.location
                    + weights.tenure * sub_scores.tenure)
                / total
        } else {
            0.0
        };
        let score = (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0;

        ScoredMatch {
            score,
            rationale: rationale(bundle),
            sub_scores,
            confidence: bundle.confidence,
        }
    }

    pub fn match_job(
        candidate: &Candidate,
        history: &[HistoryEntry],
        job: &Job,
        weights: &MatchWeights,
    ) -> JobMatch {
        let bundle = FeatureExtractor::extract(candidate, history, job);
        JobMatch {
            candidate_id: candidate.id,
            job_id: job.id,
            job_title: job.title.clone(),
            company_name: job.company_name.clone(),
            scored: Self::score(&bundle, weights),
        }
    }

    /// Score desc, then most recently created job, then job id.
    pub fn rank_jobs(
        candidate: &Candidate,
        history: &[HistoryEntry],
        jobs: &[Job],
        weights: &MatchWeights,
    ) -> Vec<JobMatch> {
        let mut scored: Vec<(&Job, JobMatch)> = jobs
            .iter()
            .map(|job| (job, Self::match_job(candidate, history, job, weights)))
            .collect();
        scored.sort_by(|(job_a, a), (job_b, b)| {
            b.scored
                .score
                .total_cmp(&a.scored.score)
                .then_with(|| job_b.created_at.cmp(&job_a.created_at))
                .then_with(|| job_a.id.cmp(&job_b.id))
        });
        scored.into_iter().map(|(_, m)| m).collect()
    }

    /// Score desc, then candidate id ascending.
    pub fn rank_candidates(
        job: &Job,
        candidates: &[(Candidate, Vec<HistoryEntry>)],
        weights: &MatchWeights,
    ) -> Vec<CandidateMatch> {
        let mut ranked: Vec<CandidateMatch> = candidates
            .iter()
            .map(|(candidate, history)| {
                let bundle = FeatureExtractor::extract(candidate, history, job);
                CandidateMatch {
                    candidate_id: candidate.id,
                    candidate_name: candidate.full_name.clone(),
                    job_id: job.id,
                    scored: Self::score(&bundle, weights),
                }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.scored
                .score
                .total_cmp(&a.scored.score)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        ranked
    }
}

fn skill_score(bundle: &FeatureBundle) -> f64 {
    if bundle.skills.required_count == 0 {
        return 1.0;
    }
    bundle.skills.matched.len() as f64 / bundle.skills.required_count as f64
}

fn location_score(location: LocationMatch) -> f64 {
    match location {
        LocationMatch::Exact => 1.0,
        LocationMatch::SameRegion => 0.75,
        LocationMatch::RemoteCompatible => 0.5,
        LocationMatch::Mismatch => 0.0,
    }
}

fn rationale(bundle: &FeatureBundle) -> Vec<String> {
    let mut reasons = Vec::new();
    let skills = &bundle.skills;

    if skills.required_count == 0 {
        reasons.push("no required skills listed".to_string());
    } else {
        reasons.push(format!(
            "{} of {} required skills matched",
            skills.matched.len(),
            skills.required_count
        ));
        if !skills.missing.is_empty() {
            reasons.push(format!("missing skills: {}", skills.missing.join(", ")));
        }
    }
    if !skills.preferred_matched.is_empty() {
        reasons.push(format!(
            "preferred skills matched: {}",
            skills.preferred_matched.join(", ")
        ));
    }

    match bundle.seniority_delta {
        Some(delta) if delta.abs() < 1.0 => reasons.push("experience level matches".to_string()),
        Some(delta) if delta < 0.0 => {
            reasons.push(format!("under-qualified by {:.0} years", delta.abs()))
        }
        Some(delta) => reasons.push(format!("over-qualified by {:.0} years", delta)),
        None => reasons.push("experience unknown".to_string()),
    }

    reasons.push(
        match bundle.location {
            Some(LocationMatch::Exact) => "exact location match",
            Some(LocationMatch::SameRegion) => "same region",
            Some(LocationMatch::RemoteCompatible) => "remote compatible",
            Some(LocationMatch::Mismatch) => "location mismatch",
            None => "location unknown",
        }
        .to_string(),
    );

    if let Some(months) = bundle.tenure_months {
        reasons.push(format!("average tenure {:.0} months per role", months));
    }

    if bundle.confidence == BundleConfidence::Low {
        reasons.push("low confidence: candidate profile is incomplete".to_string());
    }
    reasons
}
