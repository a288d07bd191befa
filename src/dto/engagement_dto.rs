use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::engagement::EngagementMetadata;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateEngagementStatusPayload {
    #[validate(length(min = 1, max = 32))]
    pub status: String,
    pub metadata: Option<EngagementMetadata>,
    #[validate(length(min = 1, max = 2000))]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TriggerReEngagementPayload {
    pub workflow_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReEngagementQuery {
    #[serde(rename = "maxDays")]
    #[validate(range(min = 1, max = 3650))]
    pub max_days: Option<i64>,
}

impl ReEngagementQuery {
    pub const DEFAULT_MAX_DAYS: i64 = 90;

    pub fn max_days(&self) -> i64 {
        self.max_days.unwrap_or(Self::DEFAULT_MAX_DAYS)
    }
}
