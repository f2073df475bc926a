use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Skill {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub resume: Option<String>,
}

impl Profile {
    pub fn skill_ids(&self) -> Vec<i64> {
        self.skills.iter().map(|s| s.id).collect()
    }

    /// True when every skill on the profile appears in the catalog.
    pub fn skills_within(&self, catalog: &[Skill]) -> bool {
        let known: BTreeSet<i64> = catalog.iter().map(|s| s.id).collect();
        self.skills.iter().all(|s| known.contains(&s.id))
    }
}

/// Partial profile edit. Absent fields are left untouched on the server.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_ids: Option<Vec<i64>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.bio.is_none() && self.skill_ids.is_none()
    }
}
