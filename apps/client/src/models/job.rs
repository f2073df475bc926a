use serde::{Deserialize, Serialize};

/// A job posting. Application payloads embed a trimmed copy carrying only
/// id, title, company and location, so the long-form fields default to empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobListing {
    pub id: i64,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: String,
}
