//! Demo sign-in and the active user.
//!
//! Nothing here restricts what a caller may do; the role only tells the host
//! which views to show.

use crate::model::{Language, User, UserRole};
use crate::query;
use crate::seed::{DEMO_PARENT_STUDENT_ID, SCHOOL_ID};
use crate::store::{CollectionKey, RecordStore};

const STAFF_PHONE: &str = "9999999999";
const MIN_PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Please enter a valid 10-digit number")]
    InvalidPhone,
}

pub fn current_user(store: &RecordStore) -> Option<User> {
    store.get(CollectionKey::CurrentUser, None)
}

pub fn set_current_user(store: &RecordStore, user: Option<&User>) -> anyhow::Result<()> {
    store.set(CollectionKey::CurrentUser, &user)
}

pub fn staff_login(username: &str, password: &str) -> Result<User, LoginError> {
    let username = username.trim().to_lowercase();
    let (role, name) = match (username.as_str(), password) {
        ("admin", "admin123") => (UserRole::Admin, "Principal Shailesh"),
        ("suman", "teacher123") => (UserRole::Teacher, "Suman Kumari"),
        _ => return Err(LoginError::InvalidCredentials),
    };
    Ok(User {
        id: format!("u_{}", username),
        phone: STAFF_PHONE.to_string(),
        name: name.to_string(),
        role,
        school_id: SCHOOL_ID.to_string(),
        student_id: None,
        language: None,
    })
}

/// Links the parent to the student registered with this phone, or to the
/// demo student when no one matches.
pub fn parent_login(store: &RecordStore, phone: &str) -> Result<User, LoginError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(LoginError::InvalidPhone);
    }
    let student_id = query::students(store, None)
        .into_iter()
        .find(|s| s.parent_phone.as_deref() == Some(digits.as_str()))
        .map(|s| s.id)
        .unwrap_or_else(|| DEMO_PARENT_STUDENT_ID.to_string());
    Ok(User {
        id: "u_parent".to_string(),
        phone: digits,
        name: "Parent Account".to_string(),
        role: UserRole::Parent,
        school_id: SCHOOL_ID.to_string(),
        student_id: Some(student_id),
        language: None,
    })
}

pub fn with_language(mut user: User, lang: Option<Language>) -> User {
    if lang.is_some() {
        user.language = lang;
    }
    user
}

pub fn views_for_role(role: UserRole) -> &'static [&'static str] {
    match role {
        UserRole::Admin => &["dashboard", "marks", "attendance", "feedback", "setup"],
        UserRole::Teacher => &["dashboard", "marks", "attendance", "feedback"],
        UserRole::Parent => &["parentDashboard"],
    }
}
