use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::models::candidate::Candidate;
use crate::models::history::{HistoryEntry, HistoryKind};
use crate::models::milestone::{Confidence, Evidence, Milestone, MilestoneKind};
use crate::utils::text::{normalize, words};
use crate::utils::time::add_months;

const ESCALATION_KEYWORDS: &[&str] = &[
    "senior", "sr", "lead", "principal", "staff", "head", "director", "vp", "chief", "manager",
];

struct Position<'a> {
    started_at: DateTime<Utc>,
    company: &'a str,
    title: &'a str,
}

pub struct MilestoneDetector;

impl MilestoneDetector {
    /// Lazily yields the milestones visible at `as_of`, rule by rule (company change,
    /// tenure anniversaries, title escalations, certifications), each rule in date order.
    ///
    /// `history` must be ordered by `effective_at`. Nothing here reads the clock, so the
    /// same inputs always produce the same sequence.
    pub fn detect<'a>(
        candidate: &'a Candidate,
        history: &'a [HistoryEntry],
        thresholds_months: &'a [u32],
        as_of: DateTime<Utc>,
    ) -> impl Iterator<Item = Milestone> + 'a {
        let company_change = Self::company_change(candidate, history, as_of);

        let stint = Self::current_stint(history, as_of);
        let tenure = thresholds_months.iter().filter_map(move |&months| {
            let (started_at, company) = stint?;
            let reached_at = add_months(started_at, months)?;
            (reached_at <= as_of).then(|| Milestone {
                kind: MilestoneKind::TenureAnniversary { months },
                detected_at: reached_at,
                description: format!("{} months at {}", months, company),
                confidence: Confidence::High,
                evidence: vec![
                    Evidence {
                        field: "company".to_string(),
                        before: None,
                        after: company.to_string(),
                    },
                    Evidence {
                        field: "tenure_months".to_string(),
                        before: thresholds_months
                            .iter()
                            .copied()
                            .filter(|t| *t < months)
                            .max()
                            .map(|t| t.to_string()),
                        after: months.to_string(),
                    },
                ],
            })
        });

        let escalations = positions(history, as_of)
            .zip(positions(history, as_of).skip(1))
            .filter_map(|(previous, current)| Self::title_escalation(&previous, &current));

        let certifications = history
            .iter()
            .filter(move |entry| entry.effective_at <= as_of)
            .filter(move |entry| {
                candidate
                    .last_reviewed_at
                    .map(|reviewed| entry.effective_at > reviewed)
                    .unwrap_or(true)
            })
            .filter_map(|entry| match &entry.kind {
                HistoryKind::Certification { name } => Some(Milestone {
                    kind: MilestoneKind::Certification,
                    detected_at: entry.effective_at,
                    description: format!("Earned certification: {}", name),
                    confidence: Confidence::Medium,
                    evidence: vec![Evidence {
                        field: "certification".to_string(),
                        before: None,
                        after: name.clone(),
                    }],
                }),
                HistoryKind::Position { .. } => None,
            });

        company_change
            .into_iter()
            .chain(tenure)
            .chain(escalations)
            .chain(certifications)
    }

    fn company_change(
        candidate: &Candidate,
        history: &[HistoryEntry],
        as_of: DateTime<Utc>,
    ) -> Option<Milestone> {
        let visible: Vec<Position<'_>> = positions(history, as_of).collect();
        let latest = visible.last();

        let (current, detected_at) = match latest {
            Some(position) => (position.company, position.started_at),
            None => (
                candidate.current_company.as_deref()?,
                candidate.updated_at.min(as_of),
            ),
        };
        let previous = match candidate.last_known_company.as_deref() {
            Some(known) => known,
            None if visible.len() >= 2 => visible[visible.len() - 2].company,
            None => return None,
        };

        if normalize(previous).is_empty() || normalize(previous) == normalize(current) {
            return None;
        }
        Some(Milestone {
            kind: MilestoneKind::CompanyChange,
            detected_at,
            description: format!("Moved from {} to {}", previous, current),
            confidence: Confidence::High,
            evidence: vec![Evidence {
                field: "company".to_string(),
                before: Some(previous.to_string()),
                after: current.to_string(),
            }],
        })
    }

    /// Start of the unbroken run of positions at the latest employer.
    fn current_stint(history: &[HistoryEntry], as_of: DateTime<Utc>) -> Option<(DateTime<Utc>, &str)> {
        let visible: Vec<Position<'_>> = positions(history, as_of).collect();
        let latest = visible.last()?;
        let key = normalize(latest.company);
        let started_at = visible
            .iter()
            .rev()
            .take_while(|p| normalize(p.company) == key)
            .last()
            .map(|p| p.started_at)
            .unwrap_or(latest.started_at);
        Some((started_at, latest.company))
    }

    fn title_escalation(previous: &Position<'_>, current: &Position<'_>) -> Option<Milestone> {
        let before: BTreeSet<String> = words(previous.title).collect();
        let gained: Vec<&str> = words(current.title)
            .filter(|w| !before.contains(w))
            .filter_map(|w| ESCALATION_KEYWORDS.iter().copied().find(|k| *k == w))
            .collect();
        if gained.is_empty() {
            return None;
        }
        Some(Milestone {
            kind: MilestoneKind::TitleEscalation,
            detected_at: current.started_at,
            description: format!("Promoted to {}", current.title),
            confidence: Confidence::Medium,
            evidence: vec![Evidence {
                field: "title".to_string(),
                before: Some(previous.title.to_string()),
                after: current.title.to_string(),
            }],
        })
    }
}

fn positions<'a>(
    history: &'a [HistoryEntry],
    as_of: DateTime<Utc>,
) -> impl Iterator<Item = Position<'a>> + 'a {
    history
        .iter()
        .filter(move |entry| entry.effective_at <= as_of)
        .filter_map(|entry| {
            entry.position().map(|(company, title)| Position {
                started_at: entry.effective_at,
                company,
                title,
            })
        })
}
