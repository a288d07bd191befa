use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::models::engagement::{Engagement, EngagementSlot, EngagementStatus, NewEngagement};
use crate::models::history::HistoryEntry;
use crate::models::job::Job;
use crate::models::workflow::{EngagementWorkflow, NewWorkflow};

/// Persistence seam of the engine. Implementations decode stored rows into typed models.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>>;

    async fn list_candidates_by_status(&self, status: CandidateStatus) -> Result<Vec<Candidate>>;

    /// Ordered by `effective_at` ascending.
    async fn get_history(&self, candidate_id: Uuid) -> Result<Vec<HistoryEntry>>;

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>>;

    async fn list_active_jobs(&self) -> Result<Vec<Job>>;

    /// Unknown ids are skipped.
    async fn get_jobs(&self, ids: &[Uuid]) -> Result<Vec<Job>>;

    /// Every workflow when `owner` is `None`, otherwise those created by `owner`.
    async fn list_workflows(&self, owner: Option<&str>) -> Result<Vec<EngagementWorkflow>>;

    async fn get_workflow(&self, id: Uuid) -> Result<Option<EngagementWorkflow>>;

    async fn create_workflow(&self, workflow: NewWorkflow) -> Result<EngagementWorkflow>;

    async fn get_engagement(&self, id: Uuid) -> Result<Option<Engagement>>;

    /// Ordered by `created_at`, then id.
    async fn list_engagements(&self, candidate_id: Uuid) -> Result<Vec<Engagement>>;

    /// Inserts a re-engagement unless the candidate was sent something at or after
    /// `sent_since` or still has one in flight. Checks and insert are atomic per candidate.
    async fn create_engagement_guarded(
        &self,
        engagement: NewEngagement,
        sent_since: DateTime<Utc>,
    ) -> Result<EngagementSlot>;

    /// Inserts all engagements or none.
    async fn create_engagements(&self, engagements: Vec<NewEngagement>) -> Result<Vec<Engagement>>;

    /// Persists `updated` only while the stored status still equals `expected`.
    /// Returns whether the write happened.
    async fn compare_and_set_engagement(
        &self,
        expected: EngagementStatus,
        updated: &Engagement,
    ) -> Result<bool>;
}
