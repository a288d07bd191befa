use std::sync::Arc;
use uuid::Uuid;

use crate::database::RecordStore;
use crate::error::{Error, Result};
use crate::models::engagement::{Engagement, EngagementMetadata, EngagementStatus};
use crate::utils::time::now;

/// Moves engagements through their status lifecycle.
#[derive(Clone)]
pub struct EngagementService {
    store: Arc<dyn RecordStore>,
}

impl EngagementService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn list_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Engagement>> {
        if self.store.get_candidate(candidate_id).await?.is_none() {
            return Err(Error::NotFound(format!("Candidate {} not found", candidate_id)));
        }
        self.store.list_engagements(candidate_id).await
    }

    pub async fn advance(
        &self,
        engagement_id: Uuid,
        target: EngagementStatus,
        metadata: Option<EngagementMetadata>,
        failure_reason: Option<String>,
    ) -> Result<Engagement> {
        if failure_reason.is_some()
            && !matches!(target, EngagementStatus::Failed | EngagementStatus::Cancelled)
        {
            return Err(Error::Validation(
                "failure_reason is only accepted when moving to FAILED or CANCELLED".to_string(),
            ));
        }
        let current = self.load(engagement_id).await?;
        self.transition(current, target, |engagement| {
            if let Some(update) = metadata {
                engagement.metadata.merge(update);
            }
            if failure_reason.is_some() {
                engagement.failure_reason = failure_reason;
            }
        })
        .await
    }

    /// Validates and persists `current -> target`, letting `edit` adjust other fields first.
    /// The write only lands if nobody changed the status in between.
    pub(crate) async fn transition<F>(
        &self,
        current: Engagement,
        target: EngagementStatus,
        edit: F,
    ) -> Result<Engagement>
    where
        F: FnOnce(&mut Engagement),
    {
        let from = current.status;
        if !from.can_transition_to(target) {
            return Err(Error::InvalidTransition { from, to: target });
        }

        let mut updated = current;
        edit(&mut updated);
        updated.apply_status(target, now());

        if self.store.compare_and_set_engagement(from, &updated).await? {
            tracing::info!(
                engagement_id = %updated.id,
                candidate_id = %updated.candidate_id,
                from = %from,
                to = %target,
                "engagement status advanced"
            );
            return Ok(updated);
        }

        let latest = self.load(updated.id).await?;
        tracing::warn!(
            engagement_id = %latest.id,
            expected = %from,
            found = %latest.status,
            "lost engagement status race"
        );
        Err(Error::InvalidTransition {
            from: latest.status,
            to: target,
        })
    }

    async fn load(&self, engagement_id: Uuid) -> Result<Engagement> {
        self.store
            .get_engagement(engagement_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Engagement {} not found", engagement_id)))
    }
}
