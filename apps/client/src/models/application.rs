use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::job::JobListing;

/// A submitted job application. Status and timestamp are assigned server-side
/// and older deployments omit the status entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub id: i64,
    pub job: JobListing,
    #[serde(default)]
    pub cover_letter: String,
    #[serde(default)]
    pub resume: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "applied_at", alias = "applied_on")]
    pub created_at: Option<DateTime<Utc>>,
}
