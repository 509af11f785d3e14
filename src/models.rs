use serde::{Deserialize, Serialize};

/// One skill with its current endorsement total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCount {
    pub id: String,
    pub name: String,
    pub count: i64,
}

/// Display grouping of skills; derived by aggregating endorsement rows,
/// never stored directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCategory {
    pub name: String,
    pub skills: Vec<SkillCount>,
}

/// A user vouching for a skill. Unique per (skill_id, user_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endorsement {
    pub skill_id: String,
    pub user_id: String,
    pub created_at: String,
}

/// One share of a content item by an anonymous session via some channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Share {
    pub slug: String,
    pub session_id: String,
    pub share_type: String,
    pub created_at: String,
}
