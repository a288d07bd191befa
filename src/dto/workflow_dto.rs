use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::milestone::MilestoneClass;
use crate::models::workflow::{NewWorkflow, WorkflowStep, WorkflowTemplate};

/// Either `template` (optionally renamed by `name`) or `name` plus `steps`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWorkflowPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub steps: Option<Vec<WorkflowStep>>,
    pub template: Option<String>,
    pub trigger: Option<MilestoneClass>,
}

pub enum WorkflowCreation {
    FromTemplate {
        template: WorkflowTemplate,
        name: Option<String>,
    },
    Custom(NewWorkflow),
}

impl CreateWorkflowPayload {
    pub fn into_creation(self, owner: Option<String>) -> Result<WorkflowCreation> {
        if let Some(key) = self.template {
            return Ok(WorkflowCreation::FromTemplate {
                template: key.parse()?,
                name: self.name,
            });
        }
        match (self.name, self.steps) {
            (Some(name), Some(steps)) => Ok(WorkflowCreation::Custom(NewWorkflow {
                name,
                description: self.description,
                steps,
                trigger: self.trigger,
                created_by: owner,
            })),
            _ => Err(Error::Validation(
                "Provide either a template or a name with steps".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExecuteWorkflowPayload {
    pub candidate_id: Uuid,
    pub workflow_id: Uuid,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowListQuery {
    /// Only workflows created by the caller.
    #[serde(default)]
    pub mine: bool,
}
