use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::database::store::RecordStore;
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::models::engagement::{
    Engagement, EngagementOrigin, EngagementSlot, EngagementStatus, NewEngagement,
};
use crate::models::history::HistoryEntry;
use crate::models::job::Job;
use crate::models::workflow::{EngagementWorkflow, NewWorkflow};
use crate::utils::time::now;

#[derive(Default)]
struct Tables {
    candidates: HashMap<Uuid, Candidate>,
    history: Vec<HistoryEntry>,
    jobs: HashMap<Uuid, Job>,
    workflows: HashMap<Uuid, EngagementWorkflow>,
    engagements: HashMap<Uuid, Engagement>,
}

/// Process-local store used by tests and local runs without Postgres.
/// A single lock makes every operation atomic, which stands in for the
/// per-candidate advisory lock of the Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))
    }

    pub fn insert_candidate(&self, candidate: Candidate) -> Result<()> {
        self.lock()?.candidates.insert(candidate.id, candidate);
        Ok(())
    }

    pub fn insert_history(&self, entry: HistoryEntry) -> Result<()> {
        let mut tables = self.lock()?;
        tables.history.push(entry);
        tables.history.sort_by_key(|e| e.effective_at);
        Ok(())
    }

    pub fn insert_job(&self, job: Job) -> Result<()> {
        self.lock()?.jobs.insert(job.id, job);
        Ok(())
    }

    pub fn insert_workflow(&self, workflow: EngagementWorkflow) -> Result<()> {
        self.lock()?.workflows.insert(workflow.id, workflow);
        Ok(())
    }

    /// Stores an engagement as-is, bypassing the lifecycle guards.
    pub fn insert_engagement(&self, engagement: Engagement) -> Result<()> {
        self.lock()?.engagements.insert(engagement.id, engagement);
        Ok(())
    }
}

fn sorted_engagements<'a>(
    engagements: impl Iterator<Item = &'a Engagement>,
) -> Vec<Engagement> {
    let mut list: Vec<Engagement> = engagements.cloned().collect();
    list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    list
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        Ok(self.lock()?.candidates.get(&id).cloned())
    }

    async fn list_candidates_by_status(&self, status: CandidateStatus) -> Result<Vec<Candidate>> {
        let mut list: Vec<Candidate> = self
            .lock()?
            .candidates
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect();
        list.sort_by_key(|c| c.id);
        Ok(list)
    }

    async fn get_history(&self, candidate_id: Uuid) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .lock()?
            .history
            .iter()
            .filter(|e| e.candidate_id == candidate_id)
            .cloned()
            .collect())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.lock()?.jobs.get(&id).cloned())
    }

    async fn list_active_jobs(&self) -> Result<Vec<Job>> {
        let mut list: Vec<Job> = self
            .lock()?
            .jobs
            .values()
            .filter(|j| j.is_active)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn get_jobs(&self, ids: &[Uuid]) -> Result<Vec<Job>> {
        let tables = self.lock()?;
        Ok(ids.iter().filter_map(|id| tables.jobs.get(id).cloned()).collect())
    }

    async fn list_workflows(&self, owner: Option<&str>) -> Result<Vec<EngagementWorkflow>> {
        let mut list: Vec<EngagementWorkflow> = self
            .lock()?
            .workflows
            .values()
            .filter(|w| owner.map_or(true, |o| w.created_by.as_deref() == Some(o)))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn get_workflow(&self, id: Uuid) -> Result<Option<EngagementWorkflow>> {
        Ok(self.lock()?.workflows.get(&id).cloned())
    }

    async fn create_workflow(&self, workflow: NewWorkflow) -> Result<EngagementWorkflow> {
        let at = now();
        let stored = EngagementWorkflow {
            id: Uuid::new_v4(),
            name: workflow.name,
            description: workflow.description,
            steps: workflow.steps,
            trigger: workflow.trigger,
            is_active: true,
            created_by: workflow.created_by,
            created_at: at,
            updated_at: at,
        };
        self.lock()?.workflows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_engagement(&self, id: Uuid) -> Result<Option<Engagement>> {
        Ok(self.lock()?.engagements.get(&id).cloned())
    }

    async fn list_engagements(&self, candidate_id: Uuid) -> Result<Vec<Engagement>> {
        let tables = self.lock()?;
        Ok(sorted_engagements(
            tables
                .engagements
                .values()
                .filter(|e| e.candidate_id == candidate_id),
        ))
    }

    async fn create_engagement_guarded(
        &self,
        engagement: NewEngagement,
        sent_since: DateTime<Utc>,
    ) -> Result<EngagementSlot> {
        let mut tables = self.lock()?;
        let existing: Vec<&Engagement> = tables
            .engagements
            .values()
            .filter(|e| e.candidate_id == engagement.candidate_id)
            .collect();

        let last_sent_at = existing
            .iter()
            .filter_map(|e| e.sent_at)
            .filter(|sent| *sent >= sent_since)
            .max();
        if let Some(last_sent_at) = last_sent_at {
            return Ok(EngagementSlot::CoolingDown { last_sent_at });
        }
        if let Some(in_flight) = existing
            .iter()
            .filter(|e| e.status.is_in_flight())
            .min_by_key(|e| e.created_at)
        {
            return Ok(EngagementSlot::InFlight {
                engagement_id: in_flight.id,
            });
        }

        let created = NewEngagement {
            origin: EngagementOrigin::ReEngagement,
            ..engagement
        }
        .into_engagement(Uuid::new_v4(), now());
        tables.engagements.insert(created.id, created.clone());
        Ok(EngagementSlot::Created(created))
    }

    async fn create_engagements(&self, engagements: Vec<NewEngagement>) -> Result<Vec<Engagement>> {
        let at = now();
        let created: Vec<Engagement> = engagements
            .into_iter()
            .map(|e| e.into_engagement(Uuid::new_v4(), at))
            .collect();
        let mut tables = self.lock()?;
        for engagement in &created {
            tables.engagements.insert(engagement.id, engagement.clone());
        }
        Ok(created)
    }

    async fn compare_and_set_engagement(
        &self,
        expected: EngagementStatus,
        updated: &Engagement,
    ) -> Result<bool> {
        let mut tables = self.lock()?;
        match tables.engagements.get_mut(&updated.id) {
            Some(stored) if stored.status == expected => {
                *stored = updated.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
