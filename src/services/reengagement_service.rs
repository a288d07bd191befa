use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::database::RecordStore;
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::models::engagement::{
    Engagement, EngagementMetadata, EngagementOrigin, EngagementSlot, EngagementStatus,
    NewEngagement,
};
use crate::models::job::Job;
use crate::models::milestone::Milestone;
use crate::services::engagement_service::EngagementService;
use crate::services::match_scorer::JobMatch;
use crate::services::matching_service::MatchingService;
use crate::services::milestone_detector::MilestoneDetector;
use crate::services::outreach_service::{personalize, MessageGenerator, OutreachRequest};
use crate::services::workflow_service::WorkflowService;
use crate::utils::time::{days_after, days_before, days_between, now};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReEngagementCandidate {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub last_contacted: Option<DateTime<Utc>>,
    pub days_since_last_contact: i64,
    pub milestones: Vec<Milestone>,
    pub recommended_jobs: Vec<JobMatch>,
    pub reason: String,
    pub priority: Priority,
}

/// Result of a re-engagement attempt. Only lookups and invalid input are errors.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerOutcome {
    Scheduled {
        engagement: Engagement,
        milestone: Option<Milestone>,
    },
    Failed {
        engagement: Engagement,
        reason: String,
    },
    CoolingDown {
        last_sent_at: DateTime<Utc>,
        available_at: DateTime<Utc>,
    },
    InFlight { engagement_id: Uuid },
}

#[derive(Clone)]
pub struct ReEngagementService {
    store: Arc<dyn RecordStore>,
    generator: Arc<dyn MessageGenerator>,
    engagements: EngagementService,
    workflows: WorkflowService,
    matching: MatchingService,
    config: Arc<EngineConfig>,
}

impl ReEngagementService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn MessageGenerator>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            engagements: EngagementService::new(store.clone()),
            workflows: WorkflowService::new(store.clone(), config.clone()),
            matching: MatchingService::new(store.clone(), config.clone()),
            store,
            generator,
            config,
        }
    }

    pub async fn detect_career_milestones(&self, candidate_id: Uuid) -> Result<Vec<Milestone>> {
        let candidate = self.candidate(candidate_id).await?;
        let history = self.store.get_history(candidate_id).await?;
        Ok(MilestoneDetector::detect(
            &candidate,
            &history,
            &self.config.tenure_thresholds_months,
            now(),
        )
        .collect())
    }

    pub async fn trigger_re_engagement(
        &self,
        candidate_id: Uuid,
        workflow_id: Option<Uuid>,
    ) -> Result<TriggerOutcome> {
        let candidate = self.candidate(candidate_id).await?;
        let started = now();

        let history = self.store.get_history(candidate_id).await?;
        let engagements = self.store.list_engagements(candidate_id).await?;
        let milestone = latest_unresolved(
            MilestoneDetector::detect(
                &candidate,
                &history,
                &self.config.tenure_thresholds_months,
                started,
            ),
            last_outreach(&engagements),
        );

        let workflow = match (workflow_id, &milestone) {
            (Some(id), _) => self.workflows.active_workflow(id).await?,
            (None, Some(m)) => self.workflows.resolve_for(m.kind.class()).await?,
            (None, None) => return Err(Error::NoEligibleMilestone(candidate_id)),
        };
        let step = workflow
            .steps
            .first()
            .cloned()
            .ok_or_else(|| Error::Validation(format!("Workflow {} has no steps", workflow.id)))?;
        let scheduled_at = step.scheduled_after(started).ok_or_else(|| {
            Error::Validation(format!(
                "Step {} of workflow {} is delayed out of range",
                step.id, workflow.id
            ))
        })?;
        let cooldown_start = days_before(started, self.config.cooldown_days)
            .ok_or_else(|| Error::Config("COOLDOWN_DAYS is out of range".to_string()))?;

        let job = self.best_job(&candidate).await?;
        let recruiter = self.config.recruiter_name.as_str();
        let pending = NewEngagement {
            candidate_id,
            workflow_id: workflow.id,
            job_id: job.as_ref().map(|j| j.id),
            channel: step.channel,
            origin: EngagementOrigin::ReEngagement,
            subject: step
                .subject
                .as_deref()
                .map(|s| personalize(s, &candidate, job.as_ref(), recruiter)),
            content: None,
            scheduled_at: None,
            metadata: EngagementMetadata {
                step_id: Some(step.id.clone()),
                template: step.template.clone(),
                milestone: milestone.as_ref().map(|m| m.kind.class().to_string()),
                ..Default::default()
            },
        };

        let engagement = match self
            .store
            .create_engagement_guarded(pending, cooldown_start)
            .await?
        {
            EngagementSlot::Created(engagement) => engagement,
            EngagementSlot::CoolingDown { last_sent_at } => {
                tracing::info!(candidate_id = %candidate_id, %last_sent_at, "re-engagement cooling down");
                let available_at = days_after(last_sent_at, self.config.cooldown_days)
                    .ok_or_else(|| Error::Config("COOLDOWN_DAYS is out of range".to_string()))?;
                return Ok(TriggerOutcome::CoolingDown {
                    last_sent_at,
                    available_at,
                });
            }
            EngagementSlot::InFlight { engagement_id } => {
                tracing::info!(candidate_id = %candidate_id, engagement_id = %engagement_id, "re-engagement already in flight");
                return Ok(TriggerOutcome::InFlight { engagement_id });
            }
        };

        let draft = personalize(&step.content, &candidate, job.as_ref(), recruiter);
        let mut request = OutreachRequest::new(&candidate, job.as_ref(), recruiter, step.channel, draft);
        if let Some(m) = &milestone {
            request = request.with_milestone(m.description.clone());
        }

        let generated = tokio::time::timeout(
            self.config.generation_timeout,
            self.generator.generate(&request),
        )
        .await;
        let failure = match generated {
            Ok(Ok(Some(text))) => {
                let engagement = self
                    .engagements
                    .transition(engagement, EngagementStatus::Scheduled, |e| {
                        e.content = Some(text);
                        e.scheduled_at = Some(scheduled_at);
                    })
                    .await?;
                tracing::info!(
                    candidate_id = %candidate_id,
                    engagement_id = %engagement.id,
                    workflow_id = %workflow.id,
                    "re-engagement scheduled"
                );
                return Ok(TriggerOutcome::Scheduled {
                    engagement,
                    milestone,
                });
            }
            Ok(Ok(None)) => "message generator returned no content".to_string(),
            Ok(Err(err)) => format!("message generation failed: {}", err),
            Err(_) => format!(
                "message generation timed out after {}s",
                self.config.generation_timeout.as_secs()
            ),
        };

        let engagement = self
            .engagements
            .transition(engagement, EngagementStatus::Failed, |e| {
                e.failure_reason = Some(failure.clone());
            })
            .await?;
        tracing::warn!(
            candidate_id = %candidate_id,
            engagement_id = %engagement.id,
            reason = %failure,
            "re-engagement failed"
        );
        Ok(TriggerOutcome::Failed {
            engagement,
            reason: failure,
        })
    }

    /// ACTIVE candidates not sent anything in the last `max_days` and with nothing in flight.
    pub async fn find_re_engagement_candidates(
        &self,
        max_days: i64,
    ) -> Result<Vec<ReEngagementCandidate>> {
        if max_days <= 0 {
            return Err(Error::Validation("maxDays must be a positive number".to_string()));
        }
        let as_of = now();
        let window_start = days_before(as_of, max_days)
            .ok_or_else(|| Error::Validation("maxDays is out of range".to_string()))?;

        let mut found = Vec::new();
        for candidate in self
            .store
            .list_candidates_by_status(CandidateStatus::Active)
            .await?
        {
            let engagements = self.store.list_engagements(candidate.id).await?;
            let recently_sent = engagements
                .iter()
                .any(|e| e.sent_at.map_or(false, |sent| sent >= window_start));
            let in_flight = engagements.iter().any(|e| e.status.is_in_flight());
            if recently_sent || in_flight {
                continue;
            }

            let last_contacted = last_outreach(&engagements);
            let days = days_between(last_contacted.unwrap_or(candidate.created_at), as_of);
            let history = self.store.get_history(candidate.id).await?;
            let milestones: Vec<Milestone> = MilestoneDetector::detect(
                &candidate,
                &history,
                &self.config.tenure_thresholds_months,
                as_of,
            )
            .filter(|m| last_contacted.map_or(true, |at| m.detected_at > at))
            .collect();

            let (priority, reason) = if !milestones.is_empty() {
                let kinds: Vec<&str> = milestones.iter().map(|m| m.kind.class().as_str()).collect();
                (
                    Priority::High,
                    format!("Recent career milestones detected: {}", kinds.join(", ")),
                )
            } else if days > self.config.stale_contact_days {
                (
                    Priority::Medium,
                    format!("No contact for {} days - time to re-engage", days),
                )
            } else {
                (
                    Priority::Low,
                    format!("Periodic check-in - {} days since last contact", days),
                )
            };

            let mut recommended_jobs = self.matching.recommend_for(&candidate).await?;
            recommended_jobs.truncate(self.config.max_recommended_jobs);

            found.push(ReEngagementCandidate {
                candidate_id: candidate.id,
                candidate_name: candidate.full_name,
                last_contacted,
                days_since_last_contact: days,
                milestones,
                recommended_jobs,
                reason,
                priority,
            });
        }

        found.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.days_since_last_contact.cmp(&a.days_since_last_contact))
                .then(a.candidate_id.cmp(&b.candidate_id))
        });
        tracing::debug!(max_days, found = found.len(), "re-engagement candidates listed");
        Ok(found)
    }

    async fn best_job(&self, candidate: &Candidate) -> Result<Option<Job>> {
        let ranked = self.matching.recommend_for(candidate).await?;
        match ranked.first() {
            Some(top) => self.store.get_job(top.job_id).await,
            None => Ok(None),
        }
    }

    async fn candidate(&self, candidate_id: Uuid) -> Result<Candidate> {
        self.store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))
    }
}

/// Creation time of the latest engagement that reached the candidate or may still do so.
/// Failed or cancelled attempts that were never sent do not count as contact.
fn last_outreach(engagements: &[Engagement]) -> Option<DateTime<Utc>> {
    engagements
        .iter()
        .filter(|e| {
            e.sent_at.is_some()
                || !matches!(e.status, EngagementStatus::Failed | EngagementStatus::Cancelled)
        })
        .map(|e| e.created_at)
        .max()
}

/// Most recent milestone dated after the last contact.
fn latest_unresolved(
    milestones: impl Iterator<Item = Milestone>,
    last_contacted: Option<DateTime<Utc>>,
) -> Option<Milestone> {
    milestones
        .filter(|m| last_contacted.map_or(true, |at| m.detected_at > at))
        .max_by_key(|m| m.detected_at)
}
