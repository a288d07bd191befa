use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementStatus {
    Pending,
    Scheduled,
    Sent,
    Delivered,
    Opened,
    Clicked,
    Responded,
    Failed,
    Cancelled,
}

impl EngagementStatus {
    pub const ALL: [EngagementStatus; 9] = [
        EngagementStatus::Pending,
        EngagementStatus::Scheduled,
        EngagementStatus::Sent,
        EngagementStatus::Delivered,
        EngagementStatus::Opened,
        EngagementStatus::Clicked,
        EngagementStatus::Responded,
        EngagementStatus::Failed,
        EngagementStatus::Cancelled,
    ];

    /// Position on the happy path. `None` for the alternate terminals.
    fn rank(self) -> Option<u8> {
        match self {
            EngagementStatus::Pending => Some(0),
            EngagementStatus::Scheduled => Some(1),
            EngagementStatus::Sent => Some(2),
            EngagementStatus::Delivered => Some(3),
            EngagementStatus::Opened => Some(4),
            EngagementStatus::Clicked => Some(5),
            EngagementStatus::Responded => Some(6),
            EngagementStatus::Failed | EngagementStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EngagementStatus::Responded | EngagementStatus::Failed | EngagementStatus::Cancelled
        )
    }

    /// Created but not yet handed to a delivery channel.
    pub fn is_in_flight(self) -> bool {
        matches!(self, EngagementStatus::Pending | EngagementStatus::Scheduled)
    }

    /// Whether the outreach has left the building.
    pub fn has_been_sent(self) -> bool {
        matches!(self.rank(), Some(rank) if rank >= 2)
    }

    pub fn can_transition_to(self, target: EngagementStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), target.rank()) {
            (Some(from), Some(to)) => to > from,
            (Some(_), None) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngagementStatus::Pending => "PENDING",
            EngagementStatus::Scheduled => "SCHEDULED",
            EngagementStatus::Sent => "SENT",
            EngagementStatus::Delivered => "DELIVERED",
            EngagementStatus::Opened => "OPENED",
            EngagementStatus::Clicked => "CLICKED",
            EngagementStatus::Responded => "RESPONDED",
            EngagementStatus::Failed => "FAILED",
            EngagementStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for EngagementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngagementStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        EngagementStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| Error::Validation(format!("Unknown engagement status: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Email,
    Call,
    Message,
    Linkedin,
    Sms,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "EMAIL",
            Channel::Call => "CALL",
            Channel::Message => "MESSAGE",
            Channel::Linkedin => "LINKEDIN",
            Channel::Sms => "SMS",
        }
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(Channel::Email),
            "CALL" => Ok(Channel::Call),
            "MESSAGE" => Ok(Channel::Message),
            "LINKEDIN" => Ok(Channel::Linkedin),
            "SMS" => Ok(Channel::Sms),
            other => Err(Error::Validation(format!("Unknown channel: {}", other))),
        }
    }
}

/// What created an engagement. At most one re-engagement may be in flight per candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementOrigin {
    ReEngagement,
    Workflow,
}

impl EngagementOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            EngagementOrigin::ReEngagement => "RE_ENGAGEMENT",
            EngagementOrigin::Workflow => "WORKFLOW",
        }
    }
}

impl FromStr for EngagementOrigin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RE_ENGAGEMENT" => Ok(EngagementOrigin::ReEngagement),
            "WORKFLOW" => Ok(EngagementOrigin::Workflow),
            other => Err(Error::Validation(format!("Unknown engagement origin: {}", other))),
        }
    }
}

/// Typed side data of an engagement, stored as JSONB.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, String>,
}

impl EngagementMetadata {
    /// Fields set on `update` win, notes are unioned.
    pub fn merge(&mut self, update: EngagementMetadata) {
        if update.step_id.is_some() {
            self.step_id = update.step_id;
        }
        if update.template.is_some() {
            self.template = update.template;
        }
        if update.milestone.is_some() {
            self.milestone = update.milestone;
        }
        if update.provider_message_id.is_some() {
            self.provider_message_id = update.provider_message_id;
        }
        self.notes.extend(update.notes);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engagement {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub workflow_id: Uuid,
    pub job_id: Option<Uuid>,
    pub channel: Channel,
    pub origin: EngagementOrigin,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub status: EngagementStatus,
    pub metadata: EngagementMetadata,
    pub failure_reason: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Engagement {
    /// Applies a validated status change in place, stamping lifecycle timestamps.
    pub fn apply_status(&mut self, target: EngagementStatus, at: DateTime<Utc>) {
        match target {
            EngagementStatus::Sent => self.sent_at = Some(at),
            EngagementStatus::Delivered => self.delivered_at = Some(at),
            EngagementStatus::Opened => self.opened_at = Some(at),
            EngagementStatus::Clicked => self.clicked_at = Some(at),
            EngagementStatus::Responded => self.responded_at = Some(at),
            _ => {}
        }
        if target.has_been_sent() && self.sent_at.is_none() {
            self.sent_at = Some(at);
        }
        self.status = target;
        self.updated_at = at;
    }
}

#[derive(Debug, Clone)]
pub struct NewEngagement {
    pub candidate_id: Uuid,
    pub workflow_id: Uuid,
    pub job_id: Option<Uuid>,
    pub channel: Channel,
    pub origin: EngagementOrigin,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub metadata: EngagementMetadata,
}

impl NewEngagement {
    /// Materializes the PENDING engagement a store inserts.
    pub fn into_engagement(self, id: Uuid, at: DateTime<Utc>) -> Engagement {
        Engagement {
            id,
            candidate_id: self.candidate_id,
            workflow_id: self.workflow_id,
            job_id: self.job_id,
            channel: self.channel,
            origin: self.origin,
            subject: self.subject,
            content: self.content,
            status: EngagementStatus::Pending,
            metadata: self.metadata,
            failure_reason: None,
            scheduled_at: self.scheduled_at,
            sent_at: None,
            delivered_at: None,
            opened_at: None,
            clicked_at: None,
            responded_at: None,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Result of a guarded engagement creation.
#[derive(Debug, Clone)]
pub enum EngagementSlot {
    Created(Engagement),
    CoolingDown { last_sent_at: DateTime<Utc> },
    InFlight { engagement_id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responded_is_terminal() {
        for target in EngagementStatus::ALL {
            assert!(!EngagementStatus::Responded.can_transition_to(target));
        }
    }

    #[test]
    fn forward_skips_are_allowed() {
        assert!(EngagementStatus::Pending.can_transition_to(EngagementStatus::Sent));
        assert!(EngagementStatus::Scheduled.can_transition_to(EngagementStatus::Responded));
        assert!(!EngagementStatus::Opened.can_transition_to(EngagementStatus::Sent));
        assert!(!EngagementStatus::Sent.can_transition_to(EngagementStatus::Sent));
    }

    #[test]
    fn failure_reachable_from_every_open_state() {
        for from in EngagementStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(from.can_transition_to(EngagementStatus::Failed), "{from}");
            assert!(from.can_transition_to(EngagementStatus::Cancelled), "{from}");
        }
        assert!(!EngagementStatus::Failed.can_transition_to(EngagementStatus::Cancelled));
        assert!(!EngagementStatus::Cancelled.can_transition_to(EngagementStatus::Pending));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("sent".parse::<EngagementStatus>().unwrap(), EngagementStatus::Sent);
        assert!("bounced".parse::<EngagementStatus>().is_err());
    }

    #[test]
    fn metadata_merge_keeps_unset_fields() {
        let mut base = EngagementMetadata {
            step_id: Some("1".into()),
            template: Some("reengagement_email".into()),
            ..Default::default()
        };
        let mut notes = BTreeMap::new();
        notes.insert("campaign".to_string(), "q4".to_string());
        base.merge(EngagementMetadata {
            provider_message_id: Some("msg-42".into()),
            notes,
            ..Default::default()
        });
        assert_eq!(base.step_id.as_deref(), Some("1"));
        assert_eq!(base.provider_message_id.as_deref(), Some("msg-42"));
        assert_eq!(base.notes.get("campaign").map(String::as_str), Some("q4"));
    }
}
