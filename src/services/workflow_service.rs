use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::database::RecordStore;
use crate::error::{Error, Result};
use crate::models::engagement::{Engagement, EngagementMetadata, EngagementOrigin, NewEngagement};
use crate::models::milestone::MilestoneClass;
use crate::models::workflow::{
    EngagementWorkflow, NewWorkflow, WorkflowTemplate, MAX_STEP_DELAY_DAYS, MAX_STEP_DELAY_HOURS,
};
use crate::services::outreach_service::personalize;
use crate::utils::time::now;

#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn RecordStore>,
    config: Arc<EngineConfig>,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<EngineConfig>) -> Self {
        Self { store, config }
    }

    pub async fn list_workflows(&self, owner: Option<&str>) -> Result<Vec<EngagementWorkflow>> {
        self.store.list_workflows(owner).await
    }

    pub async fn create_workflow(&self, workflow: NewWorkflow) -> Result<EngagementWorkflow> {
        check_workflow(&workflow)?;
        let created = self.store.create_workflow(workflow).await?;
        tracing::info!(workflow_id = %created.id, name = %created.name, "workflow created");
        Ok(created)
    }

    pub async fn create_from_template(
        &self,
        owner: Option<String>,
        template: WorkflowTemplate,
        name: Option<String>,
    ) -> Result<EngagementWorkflow> {
        self.create_workflow(template.to_new_workflow(owner, name)).await
    }

    /// Schedules every step of a workflow for one candidate as PENDING engagements.
    pub async fn execute_workflow(
        &self,
        candidate_id: Uuid,
        workflow_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Vec<Engagement>> {
        let candidate = self
            .store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))?;
        let workflow = self.active_workflow(workflow_id).await?;
        let job = match job_id {
            Some(id) => Some(
                self.store
                    .get_job(id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))?,
            ),
            None => None,
        };

        let recruiter = self.config.recruiter_name.as_str();
        let schedule = workflow.schedule(now()).ok_or_else(|| {
            Error::Validation(format!("Workflow {} schedules steps out of range", workflow_id))
        })?;
        let batch: Vec<NewEngagement> = workflow
            .steps
            .iter()
            .zip(schedule)
            .map(|(step, at)| NewEngagement {
                candidate_id,
                workflow_id,
                job_id,
                channel: step.channel,
                origin: EngagementOrigin::Workflow,
                subject: step
                    .subject
                    .as_deref()
                    .map(|s| personalize(s, &candidate, job.as_ref(), recruiter)),
                content: Some(personalize(&step.content, &candidate, job.as_ref(), recruiter)),
                scheduled_at: Some(at),
                metadata: EngagementMetadata {
                    step_id: Some(step.id.clone()),
                    template: step.template.clone(),
                    ..Default::default()
                },
            })
            .collect();

        let created = self.store.create_engagements(batch).await?;
        tracing::info!(
            candidate_id = %candidate_id,
            workflow_id = %workflow_id,
            steps = created.len(),
            "workflow executed"
        );
        Ok(created)
    }

    pub(crate) async fn active_workflow(&self, workflow_id: Uuid) -> Result<EngagementWorkflow> {
        self.store
            .get_workflow(workflow_id)
            .await?
            .filter(|w| w.is_active)
            .ok_or_else(|| Error::NotFound(format!("Active workflow {} not found", workflow_id)))
    }

    /// Workflow answering a milestone class: a matching trigger first, then the default
    /// re-engagement workflow, created from the built-in template when absent.
    pub(crate) async fn resolve_for(&self, class: MilestoneClass) -> Result<EngagementWorkflow> {
        let active: Vec<EngagementWorkflow> = self
            .store
            .list_workflows(None)
            .await?
            .into_iter()
            .filter(|w| w.is_active && !w.steps.is_empty())
            .collect();

        if let Some(workflow) = active.iter().find(|w| w.trigger == Some(class)) {
            return Ok(workflow.clone());
        }
        let default_name = WorkflowTemplate::ReEngagement.name();
        if let Some(workflow) = active
            .into_iter()
            .find(|w| w.trigger.is_none() && w.name == default_name)
        {
            return Ok(workflow);
        }
        self.create_from_template(None, WorkflowTemplate::ReEngagement, None)
            .await
    }
}

fn check_workflow(workflow: &NewWorkflow) -> Result<()> {
    if workflow.name.trim().is_empty() {
        return Err(Error::Validation("Workflow name is required".to_string()));
    }
    if workflow.steps.is_empty() {
        return Err(Error::Validation("Workflow needs at least one step".to_string()));
    }
    let mut ids = HashSet::new();
    for step in &workflow.steps {
        if step.id.trim().is_empty() || !ids.insert(step.id.as_str()) {
            return Err(Error::Validation(format!("Duplicate or empty step id: {:?}", step.id)));
        }
        if step.content.trim().is_empty() {
            return Err(Error::Validation(format!("Step {} has no content", step.id)));
        }
        if step.delay_days > MAX_STEP_DELAY_DAYS
            || step.delay_hours.unwrap_or(0) > MAX_STEP_DELAY_HOURS
        {
            return Err(Error::Validation(format!(
                "Step {} delay must be at most {} days and {} hours",
                step.id, MAX_STEP_DELAY_DAYS, MAX_STEP_DELAY_HOURS
            )));
        }
    }
    Ok(())
}
