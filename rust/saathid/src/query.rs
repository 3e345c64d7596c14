use crate::model::{
    AttendanceRecord, ClassRoom, Mark, School, Student, StudentFeedback, Subject, Test,
};
use crate::store::{CollectionKey, RecordStore};

pub fn school(store: &RecordStore) -> Option<School> {
    store
        .get::<Vec<School>>(CollectionKey::Schools, Vec::new())
        .into_iter()
        .next()
}

pub fn classes(store: &RecordStore) -> Vec<ClassRoom> {
    store.get(CollectionKey::Classes, Vec::new())
}

pub fn class(store: &RecordStore, class_id: &str) -> Option<ClassRoom> {
    classes(store).into_iter().find(|c| c.id == class_id)
}

pub fn subjects(store: &RecordStore, class_id: Option<&str>) -> Vec<Subject> {
    let all: Vec<Subject> = store.get(CollectionKey::Subjects, Vec::new());
    match class_id {
        Some(cid) => all.into_iter().filter(|s| s.class_id == cid).collect(),
        None => all,
    }
}

pub fn students(store: &RecordStore, class_id: Option<&str>) -> Vec<Student> {
    let all: Vec<Student> = store.get(CollectionKey::Students, Vec::new());
    match class_id {
        Some(cid) => all.into_iter().filter(|s| s.class_id == cid).collect(),
        None => all,
    }
}

pub fn student(store: &RecordStore, student_id: &str) -> Option<Student> {
    students(store, None).into_iter().find(|s| s.id == student_id)
}

/// Case-insensitive name match or roll-number substring match, optionally
/// limited to one class. A blank query matches everyone.
pub fn search_students(store: &RecordStore, class_id: Option<&str>, query: &str) -> Vec<Student> {
    let q = query.trim().to_lowercase();
    students(store, class_id)
        .into_iter()
        .filter(|s| q.is_empty() || s.name.to_lowercase().contains(&q) || s.roll_number.contains(&q))
        .collect()
}

pub fn tests(store: &RecordStore, class_id: Option<&str>) -> Vec<Test> {
    let all: Vec<Test> = store.get(CollectionKey::Tests, Vec::new());
    match class_id {
        Some(cid) => all.into_iter().filter(|t| t.class_id == cid).collect(),
        None => all,
    }
}

pub fn test(store: &RecordStore, test_id: &str) -> Option<Test> {
    tests(store, None).into_iter().find(|t| t.id == test_id)
}

pub fn marks_for_test(store: &RecordStore, test_id: Option<&str>) -> Vec<Mark> {
    let all: Vec<Mark> = store.get(CollectionKey::Marks, Vec::new());
    match test_id {
        Some(tid) => all.into_iter().filter(|m| m.test_id == tid).collect(),
        None => all,
    }
}

pub fn marks_for_student(store: &RecordStore, student_id: &str) -> Vec<Mark> {
    marks_for_test(store, None)
        .into_iter()
        .filter(|m| m.student_id == student_id)
        .collect()
}

pub fn attendance(store: &RecordStore, student_id: Option<&str>) -> Vec<AttendanceRecord> {
    let all: Vec<AttendanceRecord> = store.get(CollectionKey::Attendance, Vec::new());
    match student_id {
        Some(sid) => all.into_iter().filter(|r| r.student_id == sid).collect(),
        None => all,
    }
}

pub fn feedback(store: &RecordStore, student_id: Option<&str>) -> Vec<StudentFeedback> {
    let all: Vec<StudentFeedback> = store.get(CollectionKey::Feedback, Vec::new());
    match student_id {
        Some(sid) => all.into_iter().filter(|f| f.student_id == sid).collect(),
        None => all,
    }
}
