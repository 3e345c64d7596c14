//! Writers for every mutable collection.
//!
//! Marks and attendance are upserted by their natural key: a re-save of the
//! same (student, test, subject) or (student, date) replaces the earlier row
//! in place instead of adding a second one.

use crate::model::{
    now_millis, AttendanceRecord, AttendanceStatus, EnhancementStatus, Mark, Student,
    StudentFeedback, Test,
};
use crate::query;
use crate::store::{CollectionKey, RecordStore};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub roll_number: String,
    pub class_id: String,
    pub school_id: String,
    pub parent_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTest {
    pub name: String,
    pub class_id: String,
    pub max_marks: f64,
    pub date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MarkEntry {
    pub student_id: String,
    pub test_id: String,
    pub subject_id: String,
    pub obtained_marks: f64,
}

#[derive(Debug, Clone)]
pub struct AttendanceEntry {
    pub student_id: String,
    pub date: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub student_id: String,
    pub teacher_id: String,
    pub month: Option<String>,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnhancementOutcome {
    Enhanced(String),
    Defaulted,
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// The readable natural-key id, unless another row already holds it (parts
/// joined by `_` can collide); then a fresh one.
fn upsert_id(derived: String, prefix: &str, taken: &mut HashSet<String>) -> String {
    let id = if taken.contains(&derived) {
        new_id(prefix)
    } else {
        derived
    };
    taken.insert(id.clone());
    id
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub fn current_month_label() -> String {
    chrono::Local::now().format("%B %Y").to_string()
}

/// Loose numeric input: numbers pass through, strings are read by their
/// leading integer ("42abc" is 42), everything else is 0.
pub fn coerce_marks(v: &serde_json::Value) -> f64 {
    if let Some(n) = v.as_f64() {
        return if n.is_finite() { n } else { 0.0 };
    }
    let Some(s) = v.as_str() else {
        return 0.0;
    };
    let t = s.trim();
    let (sign, digits) = match t.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, t.strip_prefix('+').unwrap_or(t)),
    };
    let lead: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    lead.parse::<f64>().map(|n| sign * n).unwrap_or(0.0)
}

pub fn is_valid_date(date: &str) -> bool {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

pub fn add_student(store: &RecordStore, new: NewStudent) -> anyhow::Result<Student> {
    let mut students: Vec<Student> = store.get(CollectionKey::Students, Vec::new());
    let student = Student {
        id: new_id("st"),
        name: new.name,
        roll_number: new.roll_number,
        class_id: new.class_id,
        school_id: new.school_id,
        parent_phone: new.parent_phone,
    };
    students.push(student.clone());
    store.set(CollectionKey::Students, &students)?;
    Ok(student)
}

pub fn add_test(store: &RecordStore, new: NewTest) -> anyhow::Result<Test> {
    let mut tests: Vec<Test> = store.get(CollectionKey::Tests, Vec::new());
    let test = Test {
        id: new_id("t"),
        name: new.name,
        class_id: new.class_id,
        max_marks: new.max_marks,
        date: new.date.unwrap_or_else(today),
    };
    tests.push(test.clone());
    store.set(CollectionKey::Tests, &tests)?;
    Ok(test)
}

pub fn save_marks(store: &RecordStore, entries: Vec<MarkEntry>) -> anyhow::Result<SaveSummary> {
    let mut marks: Vec<Mark> = store.get(CollectionKey::Marks, Vec::new());
    let mut index: HashMap<(String, String, String), usize> = marks
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let (s, t, sub) = m.natural_key();
            ((s.to_string(), t.to_string(), sub.to_string()), i)
        })
        .collect();

    let mut taken: HashSet<String> = marks.iter().map(|m| m.id.clone()).collect();

    let now = now_millis();
    let mut summary = SaveSummary::default();
    for e in entries {
        let key = (e.student_id.clone(), e.test_id.clone(), e.subject_id.clone());
        if let Some(&i) = index.get(&key) {
            marks[i].obtained_marks = e.obtained_marks;
            marks[i].timestamp = now;
            summary.updated += 1;
            continue;
        }
        index.insert(key, marks.len());
        let id = upsert_id(
            format!("m_{}_{}_{}", e.student_id, e.test_id, e.subject_id),
            "m",
            &mut taken,
        );
        marks.push(Mark {
            id,
            student_id: e.student_id,
            test_id: e.test_id,
            subject_id: e.subject_id,
            obtained_marks: e.obtained_marks,
            timestamp: now,
        });
        summary.inserted += 1;
    }
    store.set(CollectionKey::Marks, &marks)?;
    tracing::info!(inserted = summary.inserted, updated = summary.updated, "saved marks");
    Ok(summary)
}

pub fn save_attendance(
    store: &RecordStore,
    entries: Vec<AttendanceEntry>,
) -> anyhow::Result<SaveSummary> {
    let mut records: Vec<AttendanceRecord> = store.get(CollectionKey::Attendance, Vec::new());
    let mut index: HashMap<(String, String), usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let (s, d) = r.natural_key();
            ((s.to_string(), d.to_string()), i)
        })
        .collect();

    let mut taken: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();

    let mut summary = SaveSummary::default();
    for e in entries {
        let key = (e.student_id.clone(), e.date.clone());
        if let Some(&i) = index.get(&key) {
            records[i].status = e.status;
            summary.updated += 1;
            continue;
        }
        index.insert(key, records.len());
        let id = upsert_id(format!("a_{}_{}", e.student_id, e.date), "a", &mut taken);
        records.push(AttendanceRecord {
            id,
            student_id: e.student_id,
            date: e.date,
            status: e.status,
        });
        summary.inserted += 1;
    }
    store.set(CollectionKey::Attendance, &records)?;
    tracing::info!(inserted = summary.inserted, updated = summary.updated, "saved attendance");
    Ok(summary)
}

/// One record per student of the class; students without an override are
/// marked present.
pub fn mark_class_attendance(
    store: &RecordStore,
    class_id: &str,
    date: &str,
    overrides: &HashMap<String, AttendanceStatus>,
) -> anyhow::Result<SaveSummary> {
    let entries = query::students(store, Some(class_id))
        .into_iter()
        .map(|s| AttendanceEntry {
            status: overrides
                .get(&s.id)
                .copied()
                .unwrap_or(AttendanceStatus::Present),
            student_id: s.id,
            date: date.to_string(),
        })
        .collect();
    save_attendance(store, entries)
}

pub fn save_feedback(store: &RecordStore, fb: StudentFeedback) -> anyhow::Result<()> {
    let mut all: Vec<StudentFeedback> = store.get(CollectionKey::Feedback, Vec::new());
    all.push(fb);
    store.set(CollectionKey::Feedback, &all)
}

/// Appends a feedback record whose enhanced text is still outstanding.
pub fn begin_feedback(store: &RecordStore, new: NewFeedback) -> anyhow::Result<StudentFeedback> {
    let fb = StudentFeedback {
        id: new_id("fb"),
        student_id: new.student_id,
        teacher_id: new.teacher_id,
        month: new.month.unwrap_or_else(current_month_label),
        comment: new.comment,
        ai_enhanced_comment: None,
        timestamp: now_millis(),
        enhancement_status: EnhancementStatus::Pending,
    };
    save_feedback(store, fb.clone())?;
    Ok(fb)
}

/// Settles a pending record. Returns `None` when the id is unknown.
pub fn resolve_feedback(
    store: &RecordStore,
    feedback_id: &str,
    outcome: EnhancementOutcome,
) -> anyhow::Result<Option<StudentFeedback>> {
    let mut all: Vec<StudentFeedback> = store.get(CollectionKey::Feedback, Vec::new());
    let Some(fb) = all.iter_mut().find(|f| f.id == feedback_id) else {
        return Ok(None);
    };
    match outcome {
        EnhancementOutcome::Enhanced(text) => {
            fb.ai_enhanced_comment = Some(text);
            fb.enhancement_status = EnhancementStatus::Complete;
        }
        EnhancementOutcome::Defaulted => {
            fb.ai_enhanced_comment = Some(fb.comment.clone());
            fb.enhancement_status = EnhancementStatus::Defaulted;
        }
    }
    let resolved = fb.clone();
    store.set(CollectionKey::Feedback, &all)?;
    Ok(Some(resolved))
}

/// Settles every `pending` record for which `in_flight` is false as
/// defaulted, in one write. Returns how many were settled.
pub fn default_pending_feedback<F>(store: &RecordStore, in_flight: F) -> anyhow::Result<usize>
where
    F: Fn(&str) -> bool,
{
    let mut all: Vec<StudentFeedback> = store.get(CollectionKey::Feedback, Vec::new());
    let mut settled = 0;
    for fb in all
        .iter_mut()
        .filter(|f| f.enhancement_status == EnhancementStatus::Pending && !in_flight(&f.id))
    {
        fb.ai_enhanced_comment = Some(fb.comment.clone());
        fb.enhancement_status = EnhancementStatus::Defaulted;
        settled += 1;
    }
    if settled > 0 {
        store.set(CollectionKey::Feedback, &all)?;
    }
    Ok(settled)
}
