use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::models::engagement::Channel;
use crate::models::milestone::MilestoneClass;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: String,
    #[serde(rename = "type")]
    pub channel: Channel,
    pub delay_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Upper bounds accepted for a single step's delay.
pub const MAX_STEP_DELAY_DAYS: u32 = 3650;
pub const MAX_STEP_DELAY_HOURS: u32 = 23;

impl WorkflowStep {
    pub fn delay(&self) -> Duration {
        Duration::days(i64::from(self.delay_days))
            + Duration::hours(i64::from(self.delay_hours.unwrap_or(0)))
    }

    /// `at` pushed back by this step's delay, or `None` when it is not representable.
    pub fn scheduled_after(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        at.checked_add_signed(self.delay())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementWorkflow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<WorkflowStep>,
    /// Milestone class this workflow answers when chosen automatically.
    pub trigger: Option<MilestoneClass>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EngagementWorkflow {
    /// When each step is due if execution starts at `start`. Delays accumulate across
    /// steps; `None` when any step would land outside the representable range.
    pub fn schedule(&self, start: DateTime<Utc>) -> Option<Vec<DateTime<Utc>>> {
        let mut at = start;
        self.steps
            .iter()
            .map(|step| {
                at = step.scheduled_after(at)?;
                Some(at)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<WorkflowStep>,
    pub trigger: Option<MilestoneClass>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowTemplate {
    InitialOutreach,
    FollowUp,
    ReEngagement,
}

impl WorkflowTemplate {
    pub const ALL: [WorkflowTemplate; 3] = [
        WorkflowTemplate::InitialOutreach,
        WorkflowTemplate::FollowUp,
        WorkflowTemplate::ReEngagement,
    ];

    pub fn key(self) -> &'static str {
        match self {
            WorkflowTemplate::InitialOutreach => "initialOutreach",
            WorkflowTemplate::FollowUp => "followUp",
            WorkflowTemplate::ReEngagement => "reEngagement",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WorkflowTemplate::InitialOutreach => "Initial Outreach Sequence",
            WorkflowTemplate::FollowUp => "Follow-up Sequence",
            WorkflowTemplate::ReEngagement => "Re-engagement Sequence",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WorkflowTemplate::InitialOutreach => "3-touch sequence over 2 weeks for new candidates",
            WorkflowTemplate::FollowUp => "2-touch follow-up for candidates who didn't respond",
            WorkflowTemplate::ReEngagement => "Monthly touchpoint for passive candidates",
        }
    }

    pub fn steps(self) -> Vec<WorkflowStep> {
        match self {
            WorkflowTemplate::InitialOutreach => vec![
                step(
                    "1",
                    Channel::Email,
                    0,
                    Some("Exciting opportunity at {{companyName}}"),
                    "Hi {{candidateName}},\n\nI came across your profile and was impressed by your experience in {{skillArea}}. We have an exciting opportunity that might be a great fit.\n\nWould you be open to a quick conversation?\n\nBest,\n{{recruiterName}}",
                    "initial_outreach_email_1",
                ),
                step(
                    "2",
                    Channel::Email,
                    5,
                    Some("Following up - {{companyName}} opportunity"),
                    "Hi {{candidateName}},\n\nI wanted to follow up on my previous message about the {{roleTitle}} position. I think your background in {{skillArea}} would be a great match.\n\nAre you available for a brief call this week?\n\nBest,\n{{recruiterName}}",
                    "initial_outreach_email_2",
                ),
                step(
                    "3",
                    Channel::Linkedin,
                    10,
                    None,
                    "Hi {{candidateName}}, I wanted to reach out about an opportunity that aligns with your experience. Would you be open to connecting?",
                    "initial_outreach_linkedin",
                ),
            ],
            WorkflowTemplate::FollowUp => vec![
                step(
                    "1",
                    Channel::Email,
                    0,
                    Some("Quick check-in - {{companyName}}"),
                    "Hi {{candidateName}},\n\nI wanted to check in about the {{roleTitle}} role. I know you're busy, but I think this could be a great fit.\n\nWould you have 15 minutes for a quick call?\n\nBest,\n{{recruiterName}}",
                    "followup_email_1",
                ),
                step(
                    "2",
                    Channel::Message,
                    7,
                    None,
                    "Hi {{candidateName}}, just wanted to follow up one more time. The {{roleTitle}} position is still open and I'd love to discuss it with you.",
                    "followup_message",
                ),
            ],
            WorkflowTemplate::ReEngagement => vec![step(
                "1",
                Channel::Email,
                0,
                Some("New opportunities at {{companyName}}"),
                "Hi {{candidateName}},\n\nI noticed you've been growing in your career. We have some new opportunities that might interest you.\n\nWould you be open to a conversation?\n\nBest,\n{{recruiterName}}",
                "reengagement_email",
            )],
        }
    }

    pub fn to_new_workflow(self, created_by: Option<String>, name: Option<String>) -> NewWorkflow {
        NewWorkflow {
            name: name.unwrap_or_else(|| self.name().to_string()),
            description: Some(self.description().to_string()),
            steps: self.steps(),
            trigger: None,
            created_by,
        }
    }
}

impl FromStr for WorkflowTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowTemplate::ALL
            .into_iter()
            .find(|t| t.key() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown workflow template: {}", s)))
    }
}

fn step(
    id: &str,
    channel: Channel,
    delay_days: u32,
    subject: Option<&str>,
    content: &str,
    template: &str,
) -> WorkflowStep {
    WorkflowStep {
        id: id.to_string(),
        channel,
        delay_days,
        delay_hours: None,
        subject: subject.map(str::to_string),
        content: content.to_string(),
        template: Some(template.to_string()),
    }
}
