use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::middleware::auth::Claims;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Recruiter,
    Hr,
    Viewer,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "recruiter" => Ok(Role::Recruiter),
            "hr" => Ok(Role::Hr),
            "viewer" => Ok(Role::Viewer),
            other => Err(Error::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// The authenticated caller as seen by the policy.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: Option<Role>,
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub.clone(),
            role: claims.role.as_deref().and_then(|r| r.parse().ok()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    AdvanceEngagement,
    TriggerReEngagement,
    ManageWorkflows,
    ExecuteWorkflow,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Read => "read",
            Action::AdvanceEngagement => "advance_engagement",
            Action::TriggerReEngagement => "trigger_re_engagement",
            Action::ManageWorkflows => "manage_workflows",
            Action::ExecuteWorkflow => "execute_workflow",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Candidate(Uuid),
    Engagement(Uuid),
    Job(Uuid),
    Workflows,
    CandidatePool,
}

pub trait Policy: Send + Sync {
    fn authorize(&self, actor: &Actor, action: Action, resource: &Resource) -> bool;
}

/// Role table: admins and recruiters do everything, HR reads and advances, viewers read.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl Policy for RolePolicy {
    fn authorize(&self, actor: &Actor, action: Action, _resource: &Resource) -> bool {
        match actor.role {
            Some(Role::Admin) | Some(Role::Recruiter) => true,
            Some(Role::Hr) => matches!(action, Action::Read | Action::AdvanceEngagement),
            Some(Role::Viewer) => action == Action::Read,
            None => false,
        }
    }
}

pub fn ensure_allowed(
    policy: &dyn Policy,
    actor: &Actor,
    action: Action,
    resource: Resource,
) -> Result<()> {
    if policy.authorize(actor, action, &resource) {
        return Ok(());
    }
    tracing::warn!(actor = %actor.id, %action, ?resource, "request denied by policy");
    Err(Error::Forbidden(format!("Not allowed to {}", action)))
}
