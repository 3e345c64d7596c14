use crate::model::{AttendanceStatus, Mark, Student, StudentFeedback, Test};
use crate::query;
use crate::store::RecordStore;
use serde::Serialize;
use std::collections::HashMap;

/// Round half up to the nearest integer: `floor(x + 0.5)`.
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

pub fn mean_obtained<'a, I>(marks: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Mark>,
{
    let mut n: usize = 0;
    let mut sum: f64 = 0.0;
    for m in marks {
        n += 1;
        sum += m.obtained_marks;
    }
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

pub fn percent(numer: f64, denom: f64) -> i64 {
    if denom > 0.0 {
        round_half_up(numer / denom * 100.0)
    } else {
        0
    }
}

/// Mean obtained marks over every mark recorded against the class's tests.
pub fn class_average(store: &RecordStore, class_id: &str) -> i64 {
    let test_ids: Vec<String> = query::tests(store, Some(class_id))
        .into_iter()
        .map(|t| t.id)
        .collect();
    let marks = query::marks_for_test(store, None);
    mean_obtained(marks.iter().filter(|m| test_ids.contains(&m.test_id)))
        .map(round_half_up)
        .unwrap_or(0)
}

pub fn test_average(store: &RecordStore, test_id: &str) -> i64 {
    mean_obtained(query::marks_for_test(store, Some(test_id)).iter())
        .map(round_half_up)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRate {
    pub percent: i64,
    pub present_days: usize,
    pub recorded_days: usize,
}

pub fn attendance_rate(store: &RecordStore, student_id: &str) -> AttendanceRate {
    let records = query::attendance(store, Some(student_id));
    let present = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count();
    AttendanceRate {
        percent: percent(present as f64, records.len() as f64),
        present_days: present,
        recorded_days: records.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestProgress {
    pub test_id: String,
    pub name: String,
    pub percentage: i64,
}

fn test_percentage(test: &Test, marks: &[&Mark]) -> i64 {
    let total: f64 = marks.iter().map(|m| m.obtained_marks).sum();
    percent(total, marks.len() as f64 * test.max_marks)
}

/// Per-test percentage for one student, in test order. Tests with no marks
/// (or a 0% result) are left out.
pub fn student_test_percentages(store: &RecordStore, student: &Student) -> Vec<TestProgress> {
    let marks = query::marks_for_student(store, &student.id);
    query::tests(store, Some(&student.class_id))
        .into_iter()
        .filter_map(|t| {
            let t_marks: Vec<&Mark> = marks.iter().filter(|m| m.test_id == t.id).collect();
            if t_marks.is_empty() {
                return None;
            }
            let pct = test_percentage(&t, &t_marks);
            (pct > 0).then(|| TestProgress {
                test_id: t.id,
                name: t.name,
                percentage: pct,
            })
        })
        .collect()
}

/// Share of available marks the student obtained across every marked test.
/// Marks against unknown tests are ignored.
pub fn student_pass_percentage(store: &RecordStore, student_id: &str) -> i64 {
    let tests: HashMap<String, Test> = query::tests(store, None)
        .into_iter()
        .map(|t| (t.id.clone(), t))
        .collect();
    let mut obtained = 0.0;
    let mut possible = 0.0;
    for m in query::marks_for_student(store, student_id) {
        let Some(t) = tests.get(&m.test_id) else {
            continue;
        };
        obtained += m.obtained_marks;
        possible += t.max_marks;
    }
    percent(obtained, possible)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScore {
    pub subject_id: String,
    pub name: String,
    pub score: f64,
}

/// Latest mark per subject of the student's class; 0 where nothing is recorded.
pub fn subject_scores(store: &RecordStore, student: &Student) -> Vec<SubjectScore> {
    let marks = query::marks_for_student(store, &student.id);
    query::subjects(store, Some(&student.class_id))
        .into_iter()
        .map(|sub| {
            let latest = marks
                .iter()
                .filter(|m| m.subject_id == sub.id)
                .max_by_key(|m| m.timestamp);
            SubjectScore {
                score: latest.map(|m| m.obtained_marks).unwrap_or(0.0),
                subject_id: sub.id,
                name: sub.name,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassScore {
    pub class_id: String,
    pub name: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolStats {
    pub stats: Vec<ClassScore>,
    pub enrollment: usize,
    pub tests_logged: usize,
    pub average_achievement: i64,
    pub hazari: i64,
}

pub fn school_stats(store: &RecordStore) -> SchoolStats {
    let stats: Vec<ClassScore> = query::classes(store)
        .into_iter()
        .map(|c| ClassScore {
            score: class_average(store, &c.id),
            name: format!("{}th", c.name),
            class_id: c.id,
        })
        .collect();

    let scored: Vec<i64> = stats.iter().map(|s| s.score).filter(|s| *s > 0).collect();
    let average_achievement = if scored.is_empty() {
        0
    } else {
        round_half_up(scored.iter().sum::<i64>() as f64 / scored.len() as f64)
    };

    let attendance = query::attendance(store, None);
    let present = attendance
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count();

    SchoolStats {
        stats,
        enrollment: query::students(store, None).len(),
        tests_logged: query::tests(store, None).len(),
        average_achievement,
        hazari: percent(present as f64, attendance.len() as f64),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOverview {
    pub student: Student,
    pub attendance: AttendanceRate,
    pub pass_percentage: i64,
    pub progress: Vec<TestProgress>,
    pub subjects: Vec<SubjectScore>,
    pub recent_feedback: Vec<StudentFeedback>,
}

pub fn student_overview(store: &RecordStore, student_id: &str) -> Option<StudentOverview> {
    let student = query::student(store, student_id)?;
    let mut feedback = query::feedback(store, Some(student_id));
    let keep_from = feedback.len().saturating_sub(2);
    let recent_feedback = feedback.split_off(keep_from);
    Some(StudentOverview {
        attendance: attendance_rate(store, student_id),
        pass_percentage: student_pass_percentage(store, student_id),
        progress: student_test_percentages(store, &student),
        subjects: subject_scores(store, &student),
        recent_feedback,
        student,
    })
}
