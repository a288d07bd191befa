use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::store::RecordStore;
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::models::engagement::{
    Engagement, EngagementMetadata, EngagementOrigin, EngagementSlot, EngagementStatus,
    NewEngagement,
};
use crate::models::history::{HistoryEntry, HistoryKind};
use crate::models::job::Job;
use crate::models::milestone::MilestoneClass;
use crate::models::workflow::{EngagementWorkflow, NewWorkflow, WorkflowStep};

const CANDIDATE_COLUMNS: &str = "id, full_name, email, current_title, current_company, \
    last_known_company, location, total_years_experience, skills, certifications, degrees, \
    notes, summary, status, last_reviewed_at, created_at, updated_at";

const JOB_SELECT: &str = "SELECT j.id, j.company_id, c.name AS company_name, j.title, \
    j.description, j.location, j.is_remote, j.employment_type, j.required_skills, \
    j.preferred_skills, j.min_years_experience, j.is_active, j.created_at \
    FROM jobs j JOIN companies c ON c.id = j.company_id";

const WORKFLOW_COLUMNS: &str =
    "id, name, description, steps, trigger, is_active, created_by, created_at, updated_at";

const ENGAGEMENT_COLUMNS: &str = "id, candidate_id, workflow_id, job_id, channel, origin, \
    subject, content, status, metadata, failure_reason, scheduled_at, sent_at, delivered_at, \
    opened_at, clicked_at, responded_at, created_at, updated_at";

#[derive(FromRow)]
struct CandidateRow {
    id: Uuid,
    full_name: String,
    email: Option<String>,
    current_title: Option<String>,
    current_company: Option<String>,
    last_known_company: Option<String>,
    location: Option<String>,
    total_years_experience: Option<f64>,
    skills: Vec<String>,
    certifications: Vec<String>,
    degrees: Option<String>,
    notes: Option<String>,
    summary: Option<String>,
    status: String,
    last_reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CandidateRow> for Candidate {
    type Error = Error;

    fn try_from(row: CandidateRow) -> Result<Self> {
        Ok(Candidate {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            current_title: row.current_title,
            current_company: row.current_company,
            last_known_company: row.last_known_company,
            location: row.location,
            total_years_experience: row.total_years_experience,
            skills: row.skills,
            certifications: row.certifications,
            degrees: row.degrees,
            notes: row.notes,
            summary: row.summary,
            status: row.status.parse()?,
            last_reviewed_at: row.last_reviewed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct HistoryRow {
    candidate_id: Uuid,
    effective_at: DateTime<Utc>,
    entry_type: String,
    company: Option<String>,
    title: Option<String>,
    name: Option<String>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = Error;

    fn try_from(row: HistoryRow) -> Result<Self> {
        let kind = match row.entry_type.as_str() {
            "POSITION" => HistoryKind::Position {
                company: row.company.unwrap_or_default(),
                title: row.title.unwrap_or_default(),
            },
            "CERTIFICATION" => HistoryKind::Certification {
                name: row.name.unwrap_or_default(),
            },
            other => {
                return Err(Error::Internal(format!("Unknown history entry type: {}", other)))
            }
        };
        Ok(HistoryEntry {
            candidate_id: row.candidate_id,
            effective_at: row.effective_at,
            kind,
        })
    }
}

#[derive(FromRow)]
struct JobRow {
    id: Uuid,
    company_id: Uuid,
    company_name: String,
    title: String,
    description: String,
    location: Option<String>,
    is_remote: bool,
    employment_type: String,
    required_skills: Vec<String>,
    preferred_skills: Vec<String>,
    min_years_experience: Option<f64>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            company_id: row.company_id,
            company_name: row.company_name,
            title: row.title,
            description: row.description,
            location: row.location,
            is_remote: row.is_remote,
            employment_type: row.employment_type,
            required_skills: row.required_skills,
            preferred_skills: row.preferred_skills,
            min_years_experience: row.min_years_experience,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct WorkflowRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    steps: Json<Vec<WorkflowStep>>,
    trigger: Option<String>,
    is_active: bool,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WorkflowRow> for EngagementWorkflow {
    type Error = Error;

    fn try_from(row: WorkflowRow) -> Result<Self> {
        Ok(EngagementWorkflow {
            id: row.id,
            name: row.name,
            description: row.description,
            steps: row.steps.0,
            trigger: row
                .trigger
                .as_deref()
                .map(str::parse::<MilestoneClass>)
                .transpose()?,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct EngagementRow {
    id: Uuid,
    candidate_id: Uuid,
    workflow_id: Uuid,
    job_id: Option<Uuid>,
    channel: String,
    origin: String,
    subject: Option<String>,
    content: Option<String>,
    status: String,
    metadata: Json<EngagementMetadata>,
    failure_reason: Option<String>,
    scheduled_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    opened_at: Option<DateTime<Utc>>,
    clicked_at: Option<DateTime<Utc>>,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EngagementRow> for Engagement {
    type Error = Error;

    fn try_from(row: EngagementRow) -> Result<Self> {
        Ok(Engagement {
            id: row.id,
            candidate_id: row.candidate_id,
            workflow_id: row.workflow_id,
            job_id: row.job_id,
            channel: row.channel.parse()?,
            origin: row.origin.parse()?,
            subject: row.subject,
            content: row.content,
            status: row.status.parse()?,
            metadata: row.metadata.0,
            failure_reason: row.failure_reason,
            scheduled_at: row.scheduled_at,
            sent_at: row.sent_at,
            delivered_at: row.delivered_at,
            opened_at: row.opened_at,
            clicked_at: row.clicked_at,
            responded_at: row.responded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_engagement<'c, E>(executor: E, engagement: NewEngagement) -> Result<Engagement>
    where
        E: sqlx::PgExecutor<'c>,
    {
        let sql = format!(
            "INSERT INTO engagements \
             (candidate_id, workflow_id, job_id, channel, origin, subject, content, status, \
              metadata, scheduled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {}",
            ENGAGEMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, EngagementRow>(&sql)
            .bind(engagement.candidate_id)
            .bind(engagement.workflow_id)
            .bind(engagement.job_id)
            .bind(engagement.channel.as_str())
            .bind(engagement.origin.as_str())
            .bind(engagement.subject)
            .bind(engagement.content)
            .bind(EngagementStatus::Pending.as_str())
            .bind(Json(engagement.metadata))
            .bind(engagement.scheduled_at)
            .fetch_one(executor)
            .await?;
        row.try_into()
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        let sql = format!("SELECT {} FROM candidates WHERE id = $1", CANDIDATE_COLUMNS);
        sqlx::query_as::<_, CandidateRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Candidate::try_from)
            .transpose()
    }

    async fn list_candidates_by_status(&self, status: CandidateStatus) -> Result<Vec<Candidate>> {
        let sql = format!(
            "SELECT {} FROM candidates WHERE status = $1 ORDER BY id",
            CANDIDATE_COLUMNS
        );
        let rows = sqlx::query_as::<_, CandidateRow>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn get_history(&self, candidate_id: Uuid) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT candidate_id, effective_at, entry_type, company, title, name
            FROM candidate_history
            WHERE candidate_id = $1
            ORDER BY effective_at ASC, id ASC
            "#,
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>> {
        let sql = format!("{} WHERE j.id = $1", JOB_SELECT);
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Job::from))
    }

    async fn list_active_jobs(&self) -> Result<Vec<Job>> {
        let sql = format!(
            "{} WHERE j.is_active = TRUE ORDER BY j.created_at DESC, j.id ASC",
            JOB_SELECT
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Job::from).collect())
    }

    async fn get_jobs(&self, ids: &[Uuid]) -> Result<Vec<Job>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("{} WHERE j.id = ANY($1)", JOB_SELECT);
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Job::from).collect())
    }

    async fn list_workflows(&self, owner: Option<&str>) -> Result<Vec<EngagementWorkflow>> {
        let sql = format!(
            "SELECT {} FROM engagement_workflows \
             WHERE ($1::text IS NULL OR created_by = $1) \
             ORDER BY created_at DESC, id ASC",
            WORKFLOW_COLUMNS
        );
        let rows = sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(owner.map(str::to_string))
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn get_workflow(&self, id: Uuid) -> Result<Option<EngagementWorkflow>> {
        let sql = format!(
            "SELECT {} FROM engagement_workflows WHERE id = $1",
            WORKFLOW_COLUMNS
        );
        sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(EngagementWorkflow::try_from)
            .transpose()
    }

    async fn create_workflow(&self, workflow: NewWorkflow) -> Result<EngagementWorkflow> {
        let sql = format!(
            "INSERT INTO engagement_workflows (name, description, steps, trigger, created_by) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            WORKFLOW_COLUMNS
        );
        let row = sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(workflow.name)
            .bind(workflow.description)
            .bind(Json(workflow.steps))
            .bind(workflow.trigger.map(|t| t.as_str()))
            .bind(workflow.created_by)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get_engagement(&self, id: Uuid) -> Result<Option<Engagement>> {
        let sql = format!("SELECT {} FROM engagements WHERE id = $1", ENGAGEMENT_COLUMNS);
        sqlx::query_as::<_, EngagementRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Engagement::try_from)
            .transpose()
    }

    async fn list_engagements(&self, candidate_id: Uuid) -> Result<Vec<Engagement>> {
        let sql = format!(
            "SELECT {} FROM engagements WHERE candidate_id = $1 ORDER BY created_at ASC, id ASC",
            ENGAGEMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EngagementRow>(&sql)
            .bind(candidate_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn create_engagement_guarded(
        &self,
        engagement: NewEngagement,
        sent_since: DateTime<Utc>,
    ) -> Result<EngagementSlot> {
        let candidate_id = engagement.candidate_id;
        let mut tx = self.pool.begin().await?;

        // Serializes triggers for one candidate until commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(candidate_id.to_string())
            .execute(&mut *tx)
            .await?;

        let last_sent_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(sent_at) FROM engagements WHERE candidate_id = $1 AND sent_at >= $2",
        )
        .bind(candidate_id)
        .bind(sent_since)
        .fetch_one(&mut *tx)
        .await?;
        if let Some(last_sent_at) = last_sent_at {
            tx.rollback().await?;
            return Ok(EngagementSlot::CoolingDown { last_sent_at });
        }

        let in_flight = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM engagements
            WHERE candidate_id = $1 AND status IN ('PENDING', 'SCHEDULED')
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(candidate_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(engagement_id) = in_flight {
            tx.rollback().await?;
            return Ok(EngagementSlot::InFlight { engagement_id });
        }

        let created = Self::insert_engagement(
            &mut *tx,
            NewEngagement {
                origin: EngagementOrigin::ReEngagement,
                ..engagement
            },
        )
        .await?;
        tx.commit().await?;
        Ok(EngagementSlot::Created(created))
    }

    async fn create_engagements(&self, engagements: Vec<NewEngagement>) -> Result<Vec<Engagement>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(engagements.len());
        for engagement in engagements {
            created.push(Self::insert_engagement(&mut *tx, engagement).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn compare_and_set_engagement(
        &self,
        expected: EngagementStatus,
        updated: &Engagement,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE engagements
            SET subject = $3, content = $4, status = $5, metadata = $6, failure_reason = $7,
                scheduled_at = $8, sent_at = $9, delivered_at = $10, opened_at = $11,
                clicked_at = $12, responded_at = $13, updated_at = $14
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(updated.id)
        .bind(expected.as_str())
        .bind(updated.subject.as_deref())
        .bind(updated.content.as_deref())
        .bind(updated.status.as_str())
        .bind(Json(&updated.metadata))
        .bind(updated.failure_reason.as_deref())
        .bind(updated.scheduled_at)
        .bind(updated.sent_at)
        .bind(updated.delivered_at)
        .bind(updated.opened_at)
        .bind(updated.clicked_at)
        .bind(updated.responded_at)
        .bind(updated.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
