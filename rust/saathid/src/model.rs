use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: String,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRoom {
    pub id: String,
    /// Grade label, e.g. "10".
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub class_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub roll_number: String,
    pub class_id: String,
    pub school_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: String,
    pub name: String,
    pub class_id: String,
    /// Denominator for every percentage computed against this test.
    pub max_marks: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub id: String,
    pub student_id: String,
    pub test_id: String,
    pub subject_id: String,
    pub obtained_marks: f64,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl Mark {
    pub fn natural_key(&self) -> (&str, &str, &str) {
        (&self.student_id, &self.test_id, &self.subject_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRESENT" | "P" => Some(Self::Present),
            "ABSENT" | "A" => Some(Self::Absent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    /// YYYY-MM-DD
    pub date: String,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn natural_key(&self) -> (&str, &str) {
        (&self.student_id, &self.date)
    }
}

/// Where a feedback record's enhanced text stands.
///
/// `Pending` records carry no `aiEnhancedComment` yet. `Defaulted` records
/// carry the teacher's original comment because the collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementStatus {
    Pending,
    #[default]
    Complete,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFeedback {
    pub id: String,
    pub student_id: String,
    pub teacher_id: String,
    /// e.g. "May 2024"
    pub month: String,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_enhanced_comment: Option<String>,
    pub timestamp: i64,
    #[serde(default)]
    pub enhancement_status: EnhancementStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Teacher,
    Parent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Hinglish,
}

impl Language {
    /// Unknown tags fall back to English.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "hi" => Self::Hi,
            "hinglish" => Self::Hinglish,
            _ => Self::En,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Hinglish => "hinglish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub phone: String,
    pub name: String,
    pub role: UserRole,
    pub school_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn feedback_without_status_reads_as_complete() {
        let raw = json!({
            "id": "fb1",
            "studentId": "st_c10_1",
            "teacherId": "u_1",
            "month": "April 2024",
            "comment": "Good",
            "timestamp": 1
        });
        let fb: StudentFeedback = serde_json::from_value(raw).expect("parse feedback");
        assert_eq!(fb.enhancement_status, EnhancementStatus::Complete);
        assert_eq!(fb.ai_enhanced_comment, None);
    }

    #[test]
    fn wire_names_match_stored_layout() {
        let s = Student {
            id: "st_1".into(),
            name: "Aman Kumar".into(),
            roll_number: "1".into(),
            class_id: "c10".into(),
            school_id: "sch_01".into(),
            parent_phone: None,
        };
        let v = serde_json::to_value(&s).expect("serialize student");
        assert_eq!(v["rollNumber"], "1");
        assert_eq!(v["classId"], "c10");
        assert!(v.get("parentPhone").is_none());

        let a = serde_json::to_value(AttendanceStatus::Absent).expect("serialize status");
        assert_eq!(a, json!("ABSENT"));
        let r = serde_json::to_value(UserRole::Teacher).expect("serialize role");
        assert_eq!(r, json!("TEACHER"));
    }

    #[test]
    fn language_tags_fall_back_to_english() {
        assert_eq!(Language::from_tag("hi"), Language::Hi);
        assert_eq!(Language::from_tag("HINGLISH"), Language::Hinglish);
        assert_eq!(Language::from_tag("fr"), Language::En);
    }
}
