use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MatchJobsPayload {
    #[validate(length(min = 1, max = 200))]
    pub job_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CandidateRankingQuery {
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<usize>,
}

impl CandidateRankingQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(20)
    }
}
