use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row, Transaction};

use crate::db::{
    connection::Database,
    helpers::{now_millis, require, require_project_id},
    models::{compound_key, Annotation, AnnotationInput},
};

use super::project_tags::{adjust_tag_usage, normalize_tags};

fn row_to_annotation(row: &Row) -> Result<Annotation> {
    let tags_json: String = row.get("tags_json")?;
    let tags: Vec<String> =
        serde_json::from_str(&tags_json).context("failed to parse annotation tags")?;

    Ok(Annotation {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        component_key: row.get("component_key")?,
        notes: row.get("notes")?,
        tags,
        updated_at: row.get("updated_at")?,
    })
}

fn load_annotation(tx: &Transaction<'_>, id: &str) -> Result<Option<Annotation>> {
    let mut stmt = tx.prepare(
        "SELECT id, project_id, component_key, notes, tags_json, updated_at
         FROM annotations
         WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_annotation(row)?)),
        None => Ok(None),
    }
}

impl Database {
    /// Write the annotation for `projectId:componentKey`.
    ///
    /// Both fields are replaced on every call: `None` notes become `""` and
    /// `None` tags become `[]`. Tags are trimmed and deduplicated before they
    /// are stored, and usage counters follow the difference.
    pub async fn upsert_annotation(&self, input: AnnotationInput) -> Result<Annotation> {
        require_project_id(&input.project_id)?;
        require(&input.component_key, "componentKey")?;

        let annotation = Annotation {
            id: compound_key(&input.project_id, &input.component_key),
            project_id: input.project_id,
            component_key: input.component_key,
            notes: input.notes.unwrap_or_default(),
            tags: normalize_tags(input.tags.unwrap_or_default()),
            updated_at: now_millis(),
        };

        let record = annotation.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let previous_tags = load_annotation(&tx, &record.id)?
                .map(|previous| previous.tags)
                .unwrap_or_default();

            tx.execute(
                "INSERT INTO annotations (id, project_id, component_key, notes, tags_json, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     notes = excluded.notes,
                     tags_json = excluded.tags_json,
                     updated_at = excluded.updated_at",
                params![
                    record.id,
                    record.project_id,
                    record.component_key,
                    record.notes,
                    serde_json::to_string(&record.tags)?,
                    record.updated_at,
                ],
            )?;

            adjust_tag_usage(
                &tx,
                &record.project_id,
                &previous_tags,
                &record.tags,
                record.updated_at,
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .context("failed to save annotation")?;

        Ok(annotation)
    }

    pub async fn get_annotation(
        &self,
        project_id: &str,
        component_key: &str,
    ) -> Result<Option<Annotation>> {
        let id = compound_key(project_id, component_key);
        self.execute(move |conn| {
            let annotation = conn
                .query_row(
                    "SELECT id, project_id, component_key, notes, tags_json, updated_at
                     FROM annotations
                     WHERE id = ?1",
                    params![id],
                    |row| Ok(row_to_annotation(row)),
                )
                .optional()?
                .transpose()?;
            Ok(annotation)
        })
        .await
    }

    pub async fn list_annotations(&self, project_id: &str) -> Result<Vec<Annotation>> {
        let project_id = project_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, project_id, component_key, notes, tags_json, updated_at
                 FROM annotations
                 WHERE project_id = ?1
                 ORDER BY component_key ASC",
            )?;
            let mut rows = stmt.query(params![project_id])?;
            let mut annotations = Vec::new();
            while let Some(row) = rows.next()? {
                annotations.push(row_to_annotation(row)?);
            }
            Ok(annotations)
        })
        .await
    }

    /// Returns whether a record existed.
    pub async fn delete_annotation(&self, project_id: &str, component_key: &str) -> Result<bool> {
        require_project_id(project_id)?;
        require(component_key, "componentKey")?;
        let id = compound_key(project_id, component_key);
        let project_id = project_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let existed = match load_annotation(&tx, &id)? {
                Some(previous) => {
                    tx.execute("DELETE FROM annotations WHERE id = ?1", params![id])?;
                    adjust_tag_usage(&tx, &project_id, &previous.tags, &[], now_millis())?;
                    true
                }
                None => false,
            };
            tx.commit()?;
            Ok(existed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{models::AnnotationInput, Database};

    fn input(notes: Option<&str>, tags: Option<Vec<&str>>) -> AnnotationInput {
        AnnotationInput {
            project_id: "p1".into(),
            component_key: "k1".into(),
            notes: notes.map(str::to_string),
            tags: tags.map(|tags| tags.into_iter().map(str::to_string).collect()),
        }
    }

    #[tokio::test]
    async fn upsert_then_fetch_returns_the_annotation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("db");

        db.upsert_annotation(input(Some("hello"), Some(vec!["x"])))
            .await
            .expect("upsert");

        let loaded = db
            .get_annotation("p1", "k1")
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(loaded.id, "p1:k1");
        assert_eq!(loaded.notes, "hello");
        assert_eq!(loaded.tags, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn every_upsert_replaces_notes_and_tags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("db");

        db.upsert_annotation(input(Some("hello"), Some(vec!["x"])))
            .await
            .expect("first");
        db.upsert_annotation(input(None, None)).await.expect("second");

        let cleared = db.get_annotation("p1", "k1").await.expect("get").expect("exists");
        assert_eq!(cleared.notes, "");
        assert!(cleared.tags.is_empty());

        db.upsert_annotation(input(None, Some(vec!["x"])))
            .await
            .expect("third");
        let retagged = db.get_annotation("p1", "k1").await.expect("get").expect("exists");
        assert_eq!(retagged.notes, "");
        assert_eq!(retagged.tags, vec!["x".to_string()]);
        assert_eq!(db.list_annotations("p1").await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn missing_key_parts_fail_fast() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("db");

        let mut bad = input(Some("n"), None);
        bad.project_id.clear();
        let err = db.upsert_annotation(bad).await.expect_err("no project");
        assert!(err.to_string().contains("projectId is required"));

        let err = db.delete_annotation("p1", "").await.expect_err("no key");
        assert!(err.to_string().contains("componentKey is required"));
    }

    #[tokio::test]
    async fn project_ids_with_separator_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("db");

        let mut colliding = input(Some("n"), None);
        colliding.project_id = "a:b".into();
        colliding.component_key = "c".into();
        let err = db.upsert_annotation(colliding).await.expect_err("separator");
        assert!(err.to_string().contains("must not contain"));
        assert!(db.delete_annotation("a:b", "c").await.is_err());
        assert!(db.list_annotations("a").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn stored_tags_match_what_is_counted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("db");

        let saved = db
            .upsert_annotation(input(None, Some(vec![" cta", "cta", "", "legacy ", "cta "])))
            .await
            .expect("upsert");
        assert_eq!(saved.tags, vec!["cta".to_string(), "legacy".to_string()]);

        let loaded = db.get_annotation("p1", "k1").await.expect("get").expect("exists");
        assert_eq!(loaded.tags, saved.tags);

        let counted: Vec<(String, u64)> = db
            .list_project_tags("p1")
            .await
            .expect("tags")
            .into_iter()
            .map(|tag| (tag.tag, tag.usage_count))
            .collect();
        assert_eq!(
            counted,
            vec![("cta".to_string(), 1), ("legacy".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("db");

        db.upsert_annotation(input(Some("n"), Some(vec!["a"]))).await.expect("upsert");
        assert!(db.delete_annotation("p1", "k1").await.expect("delete"));
        assert!(!db.delete_annotation("p1", "k1").await.expect("delete again"));
        assert!(db.get_annotation("p1", "k1").await.expect("get").is_none());
    }
}
