use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};

use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::engagement::Channel;
use crate::models::job::Job;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DESCRIPTION_EXCERPT_CHARS: usize = 500;

const OUTREACH_SYSTEM_PROMPT: &str = "You are a professional recruiter writing personalized outreach messages. \
Write a concise, friendly, and professional message that introduces the company, mentions something specific \
about the candidate's background, explains why they might be interested and ends with a clear call to action. \
Keep it warm but not overly casual, at most 3 short paragraphs. Use the draft as the basis for structure and tone. \
Return only the message text.";

/// Everything a generator may use to write one outreach message.
#[derive(Debug, Clone, PartialEq)]
pub struct OutreachRequest {
    pub channel: Channel,
    pub candidate_name: String,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    pub years_experience: Option<f64>,
    pub certifications: Vec<String>,
    pub summary: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub job_location: Option<String>,
    pub job_description: Option<String>,
    pub recruiter_name: String,
    /// Why the candidate is being contacted now.
    pub milestone: Option<String>,
    /// Template text with placeholders already resolved.
    pub draft: String,
}

impl OutreachRequest {
    pub fn new(
        candidate: &Candidate,
        job: Option<&Job>,
        recruiter_name: &str,
        channel: Channel,
        draft: String,
    ) -> Self {
        Self {
            channel,
            candidate_name: candidate.full_name.clone(),
            current_title: candidate.current_title.clone(),
            current_company: candidate.current_company.clone(),
            location: candidate.location.clone(),
            years_experience: candidate.total_years_experience,
            certifications: candidate.certifications.clone(),
            summary: candidate.summary.clone(),
            job_title: job.map(|j| j.title.clone()),
            company_name: job.map(|j| j.company_name.clone()),
            job_location: job.and_then(|j| j.location.clone()),
            job_description: job.map(|j| excerpt(&j.description, DESCRIPTION_EXCERPT_CHARS)),
            recruiter_name: recruiter_name.to_string(),
            milestone: None,
            draft,
        }
    }

    pub fn with_milestone(mut self, description: impl Into<String>) -> Self {
        self.milestone = Some(description.into());
        self
    }

    fn user_prompt(&self) -> String {
        let or_unknown = |value: Option<&str>| value.unwrap_or("Not specified").to_string();
        let mut prompt = format!(
            "Write a {} outreach message for this candidate:\n\
             Name: {}\nCurrent Title: {}\nCurrent Company: {}\nLocation: {}\nExperience: {} years\n",
            self.channel.as_str().to_lowercase(),
            self.candidate_name,
            or_unknown(self.current_title.as_deref()),
            or_unknown(self.current_company.as_deref()),
            or_unknown(self.location.as_deref()),
            self.years_experience
                .map(|y| y.to_string())
                .unwrap_or_else(|| "Not specified".to_string()),
        );
        if !self.certifications.is_empty() {
            prompt.push_str(&format!("Certifications: {}\n", self.certifications.join(", ")));
        }
        if let Some(summary) = &self.summary {
            prompt.push_str(&format!("Candidate Summary: {}\n", summary));
        }
        if let Some(title) = &self.job_title {
            prompt.push_str(&format!(
                "\nJob Title: {}\nCompany: {}\nLocation: {}\nDescription: {}\n",
                title,
                self.company_name.as_deref().unwrap_or("Our company"),
                or_unknown(self.job_location.as_deref()),
                self.job_description.as_deref().unwrap_or_default(),
            ));
        }
        if let Some(milestone) = &self.milestone {
            prompt.push_str(&format!("\nRecent career milestone: {}\n", milestone));
        }
        prompt.push_str(&format!("Recruiter: {}\n\nDraft:\n{}", self.recruiter_name, self.draft));
        prompt
    }
}

/// Produces outreach text. `Ok(None)` means the generator had nothing to say.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn generate(&self, request: &OutreachRequest) -> Result<Option<String>>;
}

/// Fills `{{placeholder}}` slots of a workflow step template.
pub fn personalize(
    template: &str,
    candidate: &Candidate,
    job: Option<&Job>,
    recruiter_name: &str,
) -> String {
    let candidate_name = if candidate.full_name.trim().is_empty() {
        "there"
    } else {
        candidate.full_name.as_str()
    };
    template
        .replace("{{candidateName}}", candidate_name)
        .replace("{{skillArea}}", candidate.skill_area().unwrap_or("your field"))
        .replace(
            "{{roleTitle}}",
            job.map(|j| j.title.as_str())
                .filter(|t| !t.is_empty())
                .unwrap_or("this role"),
        )
        .replace(
            "{{companyName}}",
            job.map(|j| j.company_name.as_str())
                .filter(|c| !c.is_empty())
                .unwrap_or("our company"),
        )
        .replace("{{recruiterName}}", recruiter_name)
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[derive(Clone)]
pub struct OpenAiMessageGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAiMessageGenerator {
    pub fn new(api_key: Option<String>, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }

    async fn chat_openai(&self, api_key: &str, payload: JsonValue) -> Result<Option<String>> {
        let res = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::ExternalServiceUnavailable(format!(
                "OpenAI API error {}: {}",
                status, text
            )));
        }

        let body: JsonValue = res.json().await?;
        Ok(body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }
}

#[async_trait]
impl MessageGenerator for OpenAiMessageGenerator {
    async fn generate(&self, request: &OutreachRequest) -> Result<Option<String>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::ExternalServiceUnavailable(
                "OpenAI API key is not configured".to_string(),
            ));
        };

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": OUTREACH_SYSTEM_PROMPT},
                {"role": "user", "content": request.user_prompt()}
            ],
            "temperature": 0.7,
            "max_tokens": 400
        });

        tracing::debug!(model = %self.model, channel = request.channel.as_str(), "requesting outreach message");
        self.chat_openai(api_key, payload).await
    }
}
