use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, require},
    models::Project,
};

fn row_to_project(row: &Row) -> Result<Project> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn create_project(&self, name: &str) -> Result<Project> {
        let name = name.trim().to_string();
        if name.is_empty() {
            bail!("project name is required");
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name,
            created_at: now,
            updated_at: now,
        };

        let record = project.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO projects (id, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id,
                    record.name,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;

        Ok(project)
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let project_id = project_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, created_at, updated_at FROM projects WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![project_id])?;
            let project = match rows.next()? {
                Some(row) => Some(row_to_project(row)?),
                None => None,
            };
            Ok(project)
        })
        .await
    }

    /// Sorted by name.
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, created_at, updated_at
                 FROM projects
                 ORDER BY name ASC, created_at ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut projects = Vec::new();
            while let Some(row) = rows.next()? {
                projects.push(row_to_project(row)?);
            }
            Ok(projects)
        })
        .await
    }

    /// Link a session to a project. Linking twice is a no-op.
    pub async fn link_session(&self, project_id: &str, session_id: &str) -> Result<()> {
        let project_id = require(project_id, "projectId")?.to_string();
        let session_id = require(session_id, "sessionId")?.to_string();
        self.execute(move |conn| {
            let project: Option<String> = conn
                .query_row(
                    "SELECT id FROM projects WHERE id = ?1",
                    params![project_id],
                    |row| row.get(0),
                )
                .optional()?;
            if project.is_none() {
                bail!("Project not found");
            }

            conn.execute(
                "INSERT OR IGNORE INTO project_sessions (project_id, session_id, linked_at)
                 VALUES (?1, ?2, ?3)",
                params![project_id, session_id, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn linked_session_ids(&self, project_id: &str) -> Result<Vec<String>> {
        let project_id = project_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id FROM project_sessions
                 WHERE project_id = ?1
                 ORDER BY linked_at ASC",
            )?;
            let ids = stmt
                .query_map(params![project_id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(ids)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn projects_link_sessions_idempotently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("db");

        let project = db.create_project("Design system").await.expect("project");
        let session = db.create_session(None, None).await.expect("session");

        db.link_session(&project.id, &session.id).await.expect("link");
        db.link_session(&project.id, &session.id).await.expect("relink");

        let linked = db.linked_session_ids(&project.id).await.expect("linked");
        assert_eq!(linked, vec![session.id.clone()]);
        assert_eq!(
            db.projects_for_session(&session.id).await.expect("reverse"),
            vec![project.id.clone()]
        );

        let listed = db.list_projects().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(
            db.get_project(&project.id).await.expect("get").map(|p| p.name),
            Some("Design system".to_string())
        );
    }

    #[tokio::test]
    async fn linking_requires_an_existing_project() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("db");

        let err = db.link_session("ghost", "s1").await.expect_err("no project");
        assert!(err.to_string().contains("Project not found"));
        let err = db.link_session("", "s1").await.expect_err("blank id");
        assert!(err.to_string().contains("projectId is required"));
        assert!(db.create_project("   ").await.is_err());
    }
}
