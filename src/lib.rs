pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::database::RecordStore;
use crate::error::Result;
use crate::middleware::{
    auth::Claims,
    policy::{ensure_allowed, Action, Actor, Policy, Resource},
};
use crate::services::{
    engagement_service::EngagementService, matching_service::MatchingService,
    outreach_service::MessageGenerator, reengagement_service::ReEngagementService,
    workflow_service::WorkflowService,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub policy: Arc<dyn Policy>,
    pub engagement_service: EngagementService,
    pub matching_service: MatchingService,
    pub workflow_service: WorkflowService,
    pub reengagement_service: ReEngagementService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn MessageGenerator>,
        policy: Arc<dyn Policy>,
    ) -> Self {
        let engine = Arc::new(config.engine.clone());

        let engagement_service = EngagementService::new(store.clone());
        let matching_service = MatchingService::new(store.clone(), engine.clone());
        let workflow_service = WorkflowService::new(store.clone(), engine.clone());
        let reengagement_service = ReEngagementService::new(store, generator, engine);

        Self {
            config: Arc::new(config),
            policy,
            engagement_service,
            matching_service,
            workflow_service,
            reengagement_service,
        }
    }

    pub fn authorize(&self, claims: &Claims, action: Action, resource: Resource) -> Result<()> {
        ensure_allowed(self.policy.as_ref(), &Actor::from(claims), action, resource)
    }
}
