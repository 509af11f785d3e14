use std::path::Path;

use chrono::Utc;
use rusqlite::Connection;
use thiserror::Error;

use crate::models::{Endorsement, Share, SkillCategory, SkillCount};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("endorsement already recorded for this user")]
    DuplicateEndorsement,
    #[error("unknown skill: {0}")]
    UnknownSkill(String),
}

/// Skill catalog seeded at schema creation. The site treats this as static
/// content; endorsements reference it by id.
const SKILL_CATALOG: &[(&str, &str, &str)] = &[
    ("go", "Go", "Languages"),
    ("rust", "Rust", "Languages"),
    ("typescript", "TypeScript", "Languages"),
    ("python", "Python", "Languages"),
    ("postgresql", "PostgreSQL", "Databases"),
    ("redis", "Redis", "Databases"),
    ("docker", "Docker", "Infrastructure"),
    ("kubernetes", "Kubernetes", "Infrastructure"),
    ("aws", "AWS", "Infrastructure"),
    ("react", "React", "Frontend"),
    ("nextjs", "Next.js", "Frontend"),
];

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // Optimize for local performance
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Self::init_schema(&conn)?;
        Ok(Database { conn })
    }

    /// In-memory store with the same schema and seed data. Used by tests;
    /// also handy for local smoke runs without a db file.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::init_schema(&conn)?;
        Ok(Database { conn })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS skills (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS endorsements (
                skill_id TEXT NOT NULL REFERENCES skills(id),
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (skill_id, user_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS shares (
                slug TEXT NOT NULL,
                session_id TEXT NOT NULL,
                share_type TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_shares_slug_session
             ON shares (slug, session_id)",
            [],
        )?;

        // Idempotent on reopen
        for (id, name, category) in SKILL_CATALOG {
            conn.execute(
                "INSERT OR IGNORE INTO skills (id, name, category) VALUES (?1, ?2, ?3)",
                (id, name, category),
            )?;
        }

        Ok(())
    }

    pub fn skill_exists(&self, skill_id: &str) -> Result<bool, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM skills WHERE id = ?1",
            [skill_id],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    /// Whether this user already endorsed this skill.
    pub fn count_endorsement(&self, skill_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM endorsements WHERE skill_id = ?1 AND user_id = ?2",
            [skill_id, user_id],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    /// Inserts one endorsement row. The UNIQUE (skill_id, user_id)
    /// constraint is the source of truth for the dedup invariant: a second
    /// insert that slipped past the pre-check comes back as
    /// `DuplicateEndorsement`.
    pub fn create_endorsement(
        &self,
        skill_id: &str,
        user_id: &str,
    ) -> Result<Endorsement, StoreError> {
        let now = Utc::now().to_rfc3339();
        let result = self.conn.execute(
            "INSERT INTO endorsements (skill_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            (skill_id, user_id, &now),
        );

        match result {
            Ok(_) => Ok(Endorsement {
                skill_id: skill_id.to_string(),
                user_id: user_id.to_string(),
                created_at: now,
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                    Err(StoreError::UnknownSkill(skill_id.to_string()))
                } else {
                    Err(StoreError::DuplicateEndorsement)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All categories with per-skill endorsement counts, ordered by
    /// category then skill name. Skills with no endorsements show up with
    /// a zero count.
    pub fn list_endorsements_by_category(&self) -> Result<Vec<SkillCategory>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.category, s.id, s.name, COUNT(e.user_id)
             FROM skills s
             LEFT JOIN endorsements e ON e.skill_id = s.id
             GROUP BY s.id
             ORDER BY s.category, s.name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                SkillCount {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    count: row.get(3)?,
                },
            ))
        })?;

        // Rows arrive ordered by category, so grouping is a single pass.
        let mut categories: Vec<SkillCategory> = Vec::new();
        for row in rows {
            let (category, skill) = row?;
            let start_new = match categories.last() {
                Some(last) => last.name != category,
                None => true,
            };
            if start_new {
                categories.push(SkillCategory {
                    name: category,
                    skills: Vec::new(),
                });
            }
            if let Some(last) = categories.last_mut() {
                last.skills.push(skill);
            }
        }
        Ok(categories)
    }

    /// Shares already recorded by this session for this slug, across all
    /// share types. This is the number the quota is checked against.
    pub fn count_user_shares(&self, slug: &str, session_id: &str) -> Result<i64, StoreError> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM shares WHERE slug = ?1 AND session_id = ?2",
            [slug, session_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn add_share(
        &self,
        slug: &str,
        session_id: &str,
        share_type: &str,
    ) -> Result<Share, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO shares (slug, session_id, share_type, created_at) VALUES (?1, ?2, ?3, ?4)",
            (slug, session_id, share_type, &now),
        )?;
        Ok(Share {
            slug: slug.to_string(),
            session_id: session_id.to_string(),
            share_type: share_type.to_string(),
            created_at: now,
        })
    }

    /// Total shares for a slug across all sessions and types.
    pub fn count_shares_by_slug(&self, slug: &str) -> Result<i64, StoreError> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM shares WHERE slug = ?1",
            [slug],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Database {
        Database::open_in_memory().expect("in-memory store")
    }

    #[test]
    fn duplicate_endorsement_hits_unique_constraint() {
        let db = store();
        db.create_endorsement("go", "u1").unwrap();

        // Bypassing the pre-check on purpose: the constraint must reject it.
        let err = db.create_endorsement("go", "u1").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEndorsement));
        assert!(db.count_endorsement("go", "u1").unwrap());
    }

    #[test]
    fn unknown_skill_rejected_by_foreign_key() {
        let db = store();
        let err = db.create_endorsement("cobol", "u1").unwrap_err();
        assert!(matches!(err, StoreError::UnknownSkill(id) if id == "cobol"));
        assert!(!db.skill_exists("cobol").unwrap());
    }

    #[test]
    fn distinct_users_count_independently() {
        let db = store();
        db.create_endorsement("rust", "u1").unwrap();
        db.create_endorsement("rust", "u2").unwrap();

        let categories = db.list_endorsements_by_category().unwrap();
        let rust = categories
            .iter()
            .flat_map(|c| &c.skills)
            .find(|s| s.id == "rust")
            .unwrap();
        assert_eq!(rust.count, 2);
    }

    #[test]
    fn listing_is_ordered_and_complete() {
        let db = store();
        let categories = db.list_endorsements_by_category().unwrap();

        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        for category in &categories {
            let skills: Vec<&str> = category.skills.iter().map(|s| s.name.as_str()).collect();
            let mut sorted = skills.clone();
            sorted.sort();
            assert_eq!(skills, sorted);
            assert!(category.skills.iter().all(|s| s.count == 0));
        }

        let total: usize = categories.iter().map(|c| c.skills.len()).sum();
        assert_eq!(total, 11);
    }

    #[test]
    fn share_quota_count_spans_types_but_not_sessions() {
        let db = store();
        db.add_share("post-a", "s1", "twitter").unwrap();
        db.add_share("post-a", "s1", "copy-link").unwrap();
        db.add_share("post-a", "s2", "twitter").unwrap();

        assert_eq!(db.count_user_shares("post-a", "s1").unwrap(), 2);
        assert_eq!(db.count_user_shares("post-a", "s2").unwrap(), 1);
        assert_eq!(db.count_shares_by_slug("post-a").unwrap(), 3);
    }

    #[test]
    fn share_counts_are_isolated_per_slug() {
        let db = store();
        db.add_share("post-a", "s1", "twitter").unwrap();
        db.add_share("post-a", "s1", "twitter").unwrap();
        db.add_share("post-b", "s1", "twitter").unwrap();

        assert_eq!(db.count_shares_by_slug("post-a").unwrap(), 2);
        assert_eq!(db.count_shares_by_slug("post-b").unwrap(), 1);
        assert_eq!(db.count_user_shares("post-b", "s1").unwrap(), 1);
    }

    #[test]
    fn reopen_keeps_seed_idempotent() {
        let dir = std::env::temp_dir().join(format!("kudos-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("reopen.db");
        let _ = std::fs::remove_file(&path);

        {
            let db = Database::open(&path).unwrap();
            db.create_endorsement("go", "u1").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert!(db.count_endorsement("go", "u1").unwrap());
        let total: usize = db
            .list_endorsements_by_category()
            .unwrap()
            .iter()
            .map(|c| c.skills.len())
            .sum();
        assert_eq!(total, 11);

        let _ = std::fs::remove_file(&path);
    }
}
