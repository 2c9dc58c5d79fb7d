use std::collections::BTreeSet;

use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row, Transaction};

use crate::db::{
    connection::Database,
    helpers::to_u64,
    models::{compound_key, ProjectTag},
};

fn row_to_project_tag(row: &Row) -> Result<ProjectTag> {
    let usage_count: i64 = row.get("usage_count")?;
    Ok(ProjectTag {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        tag: row.get("tag")?,
        usage_count: to_u64(usage_count, "usage_count")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Trimmed, non-empty, first occurrence kept, original order otherwise.
pub(super) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

fn tag_set(tags: &[String]) -> BTreeSet<String> {
    normalize_tags(tags.to_vec()).into_iter().collect()
}

/// Move usage counters from `before` to `after`: tags only in `after` are
/// incremented, tags only in `before` are decremented. Counters stop at zero
/// and a tag whose counter reaches zero is removed.
pub(super) fn adjust_tag_usage(
    tx: &Transaction<'_>,
    project_id: &str,
    before: &[String],
    after: &[String],
    updated_at: i64,
) -> Result<()> {
    let before = tag_set(before);
    let after = tag_set(after);

    for tag in after.difference(&before) {
        tx.execute(
            "INSERT INTO project_tags (id, project_id, tag, usage_count, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 usage_count = usage_count + 1,
                 updated_at = excluded.updated_at",
            params![compound_key(project_id, tag), project_id, tag, updated_at],
        )?;
    }

    for tag in before.difference(&after) {
        let id = compound_key(project_id, tag);
        let current: Option<i64> = tx
            .query_row(
                "SELECT usage_count FROM project_tags WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match current {
            Some(count) if count > 1 => {
                tx.execute(
                    "UPDATE project_tags SET usage_count = ?1, updated_at = ?2 WHERE id = ?3",
                    params![count - 1, updated_at, id],
                )?;
            }
            Some(_) => {
                tx.execute("DELETE FROM project_tags WHERE id = ?1", params![id])?;
            }
            None => {}
        }
    }

    Ok(())
}

impl Database {
    /// Most used first, then alphabetical.
    pub async fn list_project_tags(&self, project_id: &str) -> Result<Vec<ProjectTag>> {
        let project_id = project_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, project_id, tag, usage_count, updated_at
                 FROM project_tags
                 WHERE project_id = ?1
                 ORDER BY usage_count DESC, tag ASC",
            )?;
            let mut rows = stmt.query(params![project_id])?;
            let mut tags = Vec::new();
            while let Some(row) = rows.next()? {
                tags.push(row_to_project_tag(row)?);
            }
            Ok(tags)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{models::AnnotationInput, Database};

    fn input(component_key: &str, tags: &[&str]) -> AnnotationInput {
        AnnotationInput {
            project_id: "p1".into(),
            component_key: component_key.into(),
            notes: None,
            tags: Some(tags.iter().map(|tag| tag.to_string()).collect()),
        }
    }

    async fn counts(db: &Database) -> Vec<(String, u64)> {
        db.list_project_tags("p1")
            .await
            .expect("tags")
            .into_iter()
            .map(|tag| (tag.tag, tag.usage_count))
            .collect()
    }

    #[tokio::test]
    async fn counters_follow_annotation_tags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("db");

        db.upsert_annotation(input("k1", &["cta", "legacy"])).await.expect("k1");
        db.upsert_annotation(input("k2", &["cta"])).await.expect("k2");
        assert_eq!(
            counts(&db).await,
            vec![("cta".to_string(), 2), ("legacy".to_string(), 1)]
        );

        // Re-saving the same tags does not double count.
        db.upsert_annotation(input("k2", &["cta"])).await.expect("k2 again");
        db.upsert_annotation(input("k1", &["cta"])).await.expect("drop legacy");
        assert_eq!(counts(&db).await, vec![("cta".to_string(), 2)]);

        db.delete_annotation("p1", "k1").await.expect("delete k1");
        db.upsert_annotation(input("k2", &[])).await.expect("clear k2");
        assert!(counts(&db).await.is_empty());
    }
}
