//! Narrative text collaborator.
//!
//! The engine turns a structured payload plus a language tag into a short
//! piece of prose. Callers never see its failures: every entry point here
//! substitutes a fixed fallback and logs the cause.

use crate::calc::{self, SchoolStats};
use crate::model::Language;
use crate::query;
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

pub const PULSE_FALLBACK: &str = "Intelligence sync in progress...";
pub const STRATEGIC_FALLBACK: &str = "Analyzing institutional trends...";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("text collaborator is not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Request(String),
    #[error("collaborator returned status {0}")]
    Status(u16),
    #[error("collaborator returned no text")]
    EmptyResponse,
    #[error("failed to decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    /// Single-student summary.
    Pulse,
    /// School-wide priorities for leadership.
    Strategic,
    /// Rewrite of a teacher's raw observation.
    Feedback,
}

impl InsightKind {
    fn system_instruction(self) -> &'static str {
        match self {
            InsightKind::Pulse => "You are the ResultSaathi Intelligence Engine. You convert raw academic data into actionable pedagogical insights. Never mention being an AI.",
            InsightKind::Strategic => "You are a professional educational consultant for school principals in India.",
            InsightKind::Feedback => "You are an expert pedagogical assistant. You help teachers communicate student progress effectively.",
        }
    }

    fn temperature(self) -> f32 {
        match self {
            InsightKind::Pulse => 0.4,
            InsightKind::Strategic => 0.5,
            InsightKind::Feedback => 0.7,
        }
    }
}

pub fn language_instruction(lang: Language) -> &'static str {
    match lang {
        Language::Hi => "Simple Hindi",
        Language::Hinglish => "Hinglish (Hindi in English script)",
        Language::En => "Professional English",
    }
}

pub fn build_prompt(kind: InsightKind, payload: &serde_json::Value, lang: Language) -> String {
    match kind {
        InsightKind::Pulse => format!(
            "Analyze this student's performance holistically.\n\
             Data: {}\n\
             Context: This is a school in Bihar, India.\n\
             Goal: Provide a concise, high-impact \"Scholar Pulse\" (3-4 lines).\n\
             Correlation Task: Relate their Attendance percentage to their Marks and the Teacher's Monthly Feedback.\n\
             Language: {}.\n\
             Tone: Growth-oriented, specific, and professional.",
            payload,
            language_instruction(lang)
        ),
        InsightKind::Strategic => format!(
            "As a Senior Pedagogical Strategist, analyze these school-wide stats: {}.\n\
             Identify the top 2 strategic priorities for the Principal.\n\
             Language: {}.",
            payload,
            language_instruction(lang)
        ),
        InsightKind::Feedback => format!(
            "You are a wise and encouraging school teacher in Bihar, India.\n\
             The following is a raw observation about a student: {}\n\n\
             Improve this feedback to be more constructive, professional, and growth-oriented while remaining grounded in the local context.\n\n\
             Language: {}.\n\
             Keep it to 2-3 sentences.",
            payload,
            language_instruction(lang)
        ),
    }
}

pub trait InsightEngine: Send + Sync {
    fn generate(
        &self,
        kind: InsightKind,
        payload: &serde_json::Value,
        lang: Language,
    ) -> Result<String, InsightError>;
}

/// Engine used when no API key is configured.
pub struct DisabledEngine;

impl InsightEngine for DisabledEngine {
    fn generate(
        &self,
        _kind: InsightKind,
        _payload: &serde_json::Value,
        _lang: Language,
    ) -> Result<String, InsightError> {
        Err(InsightError::NotConfigured)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

pub struct GeminiEngine {
    settings: GeminiSettings,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl GeminiEngine {
    pub fn new(settings: GeminiSettings) -> Result<Self, InsightError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| InsightError::Request(e.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

impl InsightEngine for GeminiEngine {
    fn generate(
        &self,
        kind: InsightKind,
        payload: &serde_json::Value,
        lang: Language,
    ) -> Result<String, InsightError> {
        let prompt = build_prompt(kind, payload, lang);
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: kind.system_instruction(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: kind.temperature(),
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.settings.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| InsightError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(InsightError::Status(response.status().as_u16()));
        }
        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| InsightError::Decode(e.to_string()))?;
        parsed.text().ok_or(InsightError::EmptyResponse)
    }
}

fn generate_or(
    engine: &dyn InsightEngine,
    kind: InsightKind,
    payload: &serde_json::Value,
    lang: Language,
    fallback: &str,
) -> String {
    match engine.generate(kind, payload, lang) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(kind = ?kind, error = %e, "text collaborator failed; using fallback");
            fallback.to_string()
        }
    }
}

/// `None` means the collaborator failed; the caller keeps the original comment.
pub fn enhance_feedback(engine: &dyn InsightEngine, comment: &str, lang: Language) -> Option<String> {
    let payload = serde_json::Value::String(comment.to_string());
    match engine.generate(InsightKind::Feedback, &payload, lang) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(error = %e, "feedback enhancement failed; keeping original comment");
            None
        }
    }
}

pub fn pulse_payload(store: &RecordStore, student_id: &str) -> Option<serde_json::Value> {
    let student = query::student(store, student_id)?;
    let rate = calc::attendance_rate(store, student_id);
    let marks = query::marks_for_student(store, student_id);
    let latest_marks = &marks[marks.len().saturating_sub(3)..];
    let latest_feedback = query::feedback(store, Some(student_id))
        .pop()
        .map(|f| f.comment);
    Some(json!({
        "name": student.name,
        "attendance": format!("{}%", rate.percent),
        "latestMarks": latest_marks,
        "latestFeedback": latest_feedback,
    }))
}

pub fn strategic_payload(stats: &SchoolStats) -> serde_json::Value {
    json!({
        "stats": stats.stats,
        "enrollment": stats.enrollment,
    })
}

/// Returns `None` only when the student does not exist.
pub fn student_pulse(
    engine: &dyn InsightEngine,
    store: &RecordStore,
    student_id: &str,
    lang: Language,
) -> Option<String> {
    let payload = pulse_payload(store, student_id)?;
    Some(generate_or(engine, InsightKind::Pulse, &payload, lang, PULSE_FALLBACK))
}

pub fn strategic_insight(engine: &dyn InsightEngine, store: &RecordStore, lang: Language) -> String {
    let payload = strategic_payload(&calc::school_stats(store));
    generate_or(engine, InsightKind::Strategic, &payload, lang, STRATEGIC_FALLBACK)
}


#[cfg(test)]
mod tests {
    use super::testing::{EchoEngine, FailingEngine};
    use super::*;
    use crate::seed;

    fn seeded() -> RecordStore {
        let store = RecordStore::open_in_memory().expect("store");
        seed::initialize(&store).expect("seed");
        store
    }

    #[test]
    fn failures_fall_back_to_fixed_text() {
        let store = seeded();
        let pulse = student_pulse(&FailingEngine, &store, "st_c10_1", Language::En).expect("student");
        assert_eq!(pulse, PULSE_FALLBACK);
        assert_eq!(strategic_insight(&DisabledEngine, &store, Language::Hi), STRATEGIC_FALLBACK);
        assert!(enhance_feedback(&FailingEngine, "ok", Language::En).is_none());
        assert!(student_pulse(&FailingEngine, &store, "missing", Language::En).is_none());
    }

    #[test]
    fn pulse_payload_carries_recent_context() {
        let store = seeded();
        let engine = EchoEngine::new("Doing well.");
        let text = student_pulse(&engine, &store, "st_c10_1", Language::Hinglish).expect("student");
        assert_eq!(text, "Doing well.");

        let calls = engine.calls.lock().expect("calls lock");
        let (kind, payload, lang) = &calls[0];
        assert_eq!(*kind, InsightKind::Pulse);
        assert_eq!(*lang, Language::Hinglish);
        assert_eq!(payload["name"], "Anjali Singh");
        assert_eq!(payload["attendance"], "0%");
        assert_eq!(payload["latestMarks"].as_array().map(|a| a.len()), Some(3));
        assert_eq!(
            payload["latestFeedback"],
            "Very good student, but needs to focus on Geometry."
        );
    }

    #[test]
    fn strategic_payload_lists_classes() {
        let store = seeded();
        let payload = strategic_payload(&calc::school_stats(&store));
        assert_eq!(payload["enrollment"], 240);
        let stats = payload["stats"].as_array().expect("stats");
        assert_eq!(stats.len(), 4);
        assert_eq!(stats[1]["name"], "10th");
    }

    #[test]
    fn prompts_name_the_language() {
        let p = build_prompt(InsightKind::Feedback, &json!("needs focus"), Language::Hi);
        assert!(p.contains("\"needs focus\""));
        assert!(p.contains("Simple Hindi"));
        let s = build_prompt(InsightKind::Strategic, &json!({"enrollment": 1}), Language::En);
        assert!(s.contains("Professional English"));
    }

    #[test]
    fn response_text_joins_parts() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Focus on " }, { "text": "geometry. " }] }
            }]
        });
        let parsed: GenerateResponse = serde_json::from_value(raw).expect("parse");
        assert_eq!(parsed.text().as_deref(), Some("Focus on geometry."));

        let empty: GenerateResponse = serde_json::from_value(json!({})).expect("parse");
        assert_eq!(empty.text(), None);
    }
}
