//! Demo dataset written the first time a workspace is opened.

use crate::model::{
    now_millis, AttendanceRecord, ClassRoom, EnhancementStatus, Mark, School, Student,
    StudentFeedback, Subject, Test,
};
use crate::store::{CollectionKey, RecordStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SCHOOL_ID: &str = "sch_01";
pub const DEMO_PARENT_STUDENT_ID: &str = "st_c10_1";
pub const STUDENTS_PER_CLASS: usize = 60;

const MARKS_SEED: u64 = 0x5EED_2024;

const CORE_SUBJECTS: [&str; 5] = ["Mathematics", "Science", "English", "Social Science", "Hindi"];
const SENIOR_SUBJECTS: [&str; 6] = [
    "Physics",
    "Chemistry",
    "Biology",
    "Maths",
    "English Core",
    "Computer Science",
];

const FIRST_NAMES: [&str; 16] = [
    "Aman", "Anjali", "Vikash", "Sneha", "Rahul", "Priya", "Rohan", "Kavita", "Suresh", "Meera",
    "Aditya", "Ishani", "Karan", "Zoya", "Sumit", "Neha",
];
const LAST_NAMES: [&str; 8] = [
    "Kumar", "Singh", "Jha", "Mishra", "Prasad", "Yadav", "Sinha", "Gupta",
];

/// Seeds the store unless the schools collection is already present.
/// Returns whether anything was written.
pub fn initialize(store: &RecordStore) -> anyhow::Result<bool> {
    if store.contains(CollectionKey::Schools) {
        return Ok(false);
    }
    let now = now_millis();

    store.set(
        CollectionKey::Schools,
        &vec![School {
            id: SCHOOL_ID.to_string(),
            name: "Magadh International School".to_string(),
            address: "Patna, Bihar".to_string(),
        }],
    )?;

    let classes: Vec<ClassRoom> = ["9", "10", "11", "12"]
        .iter()
        .map(|n| ClassRoom {
            id: format!("c{}", n),
            name: n.to_string(),
        })
        .collect();
    store.set(CollectionKey::Classes, &classes)?;

    let mut subjects: Vec<Subject> = Vec::new();
    for c in &classes {
        let list: &[&str] = if c.name == "11" || c.name == "12" {
            &SENIOR_SUBJECTS
        } else {
            &CORE_SUBJECTS
        };
        for (idx, name) in list.iter().enumerate() {
            subjects.push(Subject {
                id: format!("sub_{}_{}", c.id, idx),
                name: name.to_string(),
                class_id: c.id.clone(),
            });
        }
    }
    store.set(CollectionKey::Subjects, &subjects)?;

    let mut students: Vec<Student> = Vec::with_capacity(classes.len() * STUDENTS_PER_CLASS);
    for c in &classes {
        for i in 1..=STUDENTS_PER_CLASS {
            let id = format!("st_{}_{}", c.id, i);
            let parent_phone = (id == DEMO_PARENT_STUDENT_ID).then(|| "8888888888".to_string());
            students.push(Student {
                id,
                name: format!(
                    "{} {}",
                    FIRST_NAMES[i % FIRST_NAMES.len()],
                    LAST_NAMES[i % LAST_NAMES.len()]
                ),
                roll_number: i.to_string(),
                class_id: c.id.clone(),
                school_id: SCHOOL_ID.to_string(),
                parent_phone,
            });
        }
    }
    store.set(CollectionKey::Students, &students)?;

    let mut tests: Vec<Test> = Vec::new();
    for c in &classes {
        tests.push(Test {
            id: format!("t_{}_mid", c.id),
            name: "Mid-Term".to_string(),
            class_id: c.id.clone(),
            max_marks: 100.0,
            date: "2024-04-10".to_string(),
        });
        tests.push(Test {
            id: format!("t_{}_unit", c.id),
            name: "Unit Test I".to_string(),
            class_id: c.id.clone(),
            max_marks: 50.0,
            date: "2024-05-15".to_string(),
        });
    }
    store.set(CollectionKey::Tests, &tests)?;

    let mut rng = StdRng::seed_from_u64(MARKS_SEED);
    let mut marks: Vec<Mark> = Vec::new();
    for c in &classes {
        let student_id = format!("st_{}_1", c.id);
        let test_id = format!("t_{}_mid", c.id);
        for sub in subjects.iter().filter(|s| s.class_id == c.id) {
            marks.push(Mark {
                id: format!("m_{}_{}_{}", student_id, test_id, sub.id),
                student_id: student_id.clone(),
                test_id: test_id.clone(),
                subject_id: sub.id.clone(),
                obtained_marks: f64::from(rng.gen_range(65..95u32)),
                timestamp: now,
            });
        }
    }
    store.set(CollectionKey::Marks, &marks)?;

    store.set(CollectionKey::Attendance, &Vec::<AttendanceRecord>::new())?;
    store.set(
        CollectionKey::Feedback,
        &vec![StudentFeedback {
            id: "fb1".to_string(),
            student_id: DEMO_PARENT_STUDENT_ID.to_string(),
            teacher_id: "u_1".to_string(),
            month: "April 2024".to_string(),
            comment: "Very good student, but needs to focus on Geometry.".to_string(),
            ai_enhanced_comment: Some(
                "Aman is showing strong potential. While his overall progress is commendable, providing him with more practice in visual Mathematics like Geometry will boost his confidence."
                    .to_string(),
            ),
            timestamp: now,
            enhancement_status: EnhancementStatus::Complete,
        }],
    )?;

    tracing::info!(
        classes = classes.len(),
        students = students.len(),
        marks = marks.len(),
        "seeded demo dataset"
    );
    Ok(true)
}
