use std::sync::Arc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::database::RecordStore;
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::services::match_scorer::{CandidateMatch, JobMatch, MatchScorer};

#[derive(Clone)]
pub struct MatchingService {
    store: Arc<dyn RecordStore>,
    config: Arc<EngineConfig>,
}

impl MatchingService {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<EngineConfig>) -> Self {
        Self { store, config }
    }

    /// Best active jobs for a candidate, capped at `max_recommended_jobs`.
    pub async fn find_matching_jobs(&self, candidate_id: Uuid) -> Result<Vec<JobMatch>> {
        let candidate = self.candidate(candidate_id).await?;
        let mut matches = self.recommend_for(&candidate).await?;
        matches.truncate(self.config.max_recommended_jobs);
        Ok(matches)
    }

    /// Ranks the given jobs for a candidate. Unknown job ids are ignored.
    pub async fn match_candidate_to_jobs(
        &self,
        candidate_id: Uuid,
        job_ids: &[Uuid],
    ) -> Result<Vec<JobMatch>> {
        let candidate = self.candidate(candidate_id).await?;
        let history = self.store.get_history(candidate_id).await?;
        let jobs = self.store.get_jobs(job_ids).await?;
        Ok(MatchScorer::rank_jobs(
            &candidate,
            &history,
            &jobs,
            &self.config.weights,
        ))
    }

    /// Active candidates ranked against one job.
    pub async fn rank_candidates_for_job(
        &self,
        job_id: Uuid,
        limit: usize,
    ) -> Result<Vec<CandidateMatch>> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", job_id)))?;

        let candidates = self
            .store
            .list_candidates_by_status(CandidateStatus::Active)
            .await?;
        let mut pool = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let history = self.store.get_history(candidate.id).await?;
            pool.push((candidate, history));
        }

        let mut ranked = MatchScorer::rank_candidates(&job, &pool, &self.config.weights);
        ranked.truncate(limit);
        tracing::debug!(job_id = %job_id, ranked = ranked.len(), "ranked candidates for job");
        Ok(ranked)
    }

    /// Full ranking of active jobs, uncapped.
    pub(crate) async fn recommend_for(&self, candidate: &Candidate) -> Result<Vec<JobMatch>> {
        let history = self.store.get_history(candidate.id).await?;
        let jobs = self.store.list_active_jobs().await?;
        Ok(MatchScorer::rank_jobs(
            candidate,
            &history,
            &jobs,
            &self.config.weights,
        ))
    }

    async fn candidate(&self, candidate_id: Uuid) -> Result<Candidate> {
        self.store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))
    }
}
