#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use talent_engine::{
    config::{Config, EngineConfig},
    database::MemoryStore,
    error::Result,
    middleware::policy::RolePolicy,
    models::{
        candidate::{Candidate, CandidateStatus},
        engagement::{
            Channel, Engagement, EngagementMetadata, EngagementOrigin, EngagementStatus,
            NewEngagement,
        },
        history::{HistoryEntry, HistoryKind},
        job::Job,
        workflow::{EngagementWorkflow, WorkflowTemplate},
    },
    services::outreach_service::{MessageGenerator, OutreachRequest},
    AppState,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key";

/// Always answers with the same text.
pub struct FixedGenerator(pub Option<String>);

#[async_trait]
impl MessageGenerator for FixedGenerator {
    async fn generate(&self, _request: &OutreachRequest) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

pub fn candidate(name: &str) -> Candidate {
    let created = Utc::now() - Duration::days(400);
    Candidate {
        id: Uuid::new_v4(),
        full_name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
        current_title: Some("Backend Engineer".into()),
        current_company: Some("Acme".into()),
        last_known_company: Some("Acme".into()),
        location: Some("Berlin, Germany".into()),
        total_years_experience: Some(5.0),
        skills: vec!["Rust".into(), "PostgreSQL".into()],
        certifications: vec![],
        degrees: None,
        notes: None,
        summary: None,
        status: CandidateStatus::Active,
        last_reviewed_at: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn job(title: &str, required: &[&str]) -> Job {
    Job {
        id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        company_name: "Globex".into(),
        title: title.to_string(),
        description: "Build and run backend services".into(),
        location: Some("Berlin, Germany".into()),
        is_remote: false,
        employment_type: "full_time".into(),
        required_skills: required.iter().map(|s| s.to_string()).collect(),
        preferred_skills: vec![],
        min_years_experience: Some(5.0),
        is_active: true,
        created_at: Utc::now() - Duration::days(3),
    }
}

pub fn position(candidate_id: Uuid, company: &str, title: &str, at: DateTime<Utc>) -> HistoryEntry {
    HistoryEntry {
        candidate_id,
        effective_at: at,
        kind: HistoryKind::Position {
            company: company.to_string(),
            title: title.to_string(),
        },
    }
}

pub fn workflow(template: WorkflowTemplate) -> EngagementWorkflow {
    let at = Utc::now() - Duration::days(30);
    EngagementWorkflow {
        id: Uuid::new_v4(),
        name: template.name().to_string(),
        description: Some(template.description().to_string()),
        steps: template.steps(),
        trigger: None,
        is_active: true,
        created_by: None,
        created_at: at,
        updated_at: at,
    }
}

/// An engagement already in `status`, created at `created_at`.
pub fn engagement(
    candidate_id: Uuid,
    workflow_id: Uuid,
    status: EngagementStatus,
    created_at: DateTime<Utc>,
) -> Engagement {
    let mut engagement = NewEngagement {
        candidate_id,
        workflow_id,
        job_id: None,
        channel: Channel::Email,
        origin: EngagementOrigin::ReEngagement,
        subject: Some("Hello".into()),
        content: Some("Checking in".into()),
        scheduled_at: None,
        metadata: EngagementMetadata::default(),
    }
    .into_engagement(Uuid::new_v4(), created_at);
    if status != EngagementStatus::Pending {
        engagement.apply_status(status, created_at);
    }
    engagement
}

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url: "postgres://unused".into(),
        jwt_secret: JWT_SECRET.into(),
        openai_api_key: None,
        openai_model: "gpt-4o-mini".into(),
        api_rps: 1000,
        cors_allowed_origins: vec![],
        engine: EngineConfig {
            generation_timeout: std::time::Duration::from_secs(2),
            ..EngineConfig::default()
        },
    }
}

pub fn app_state(store: Arc<MemoryStore>, generated: Option<&str>) -> AppState {
    app_state_with(test_config(), store, generated)
}

pub fn app_state_with(config: Config, store: Arc<MemoryStore>, generated: Option<&str>) -> AppState {
    AppState::new(
        config,
        store,
        Arc::new(FixedGenerator(generated.map(str::to_string))),
        Arc::new(RolePolicy),
    )
}
