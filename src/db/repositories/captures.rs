use anyhow::{bail, Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{require, to_i64},
    models::{parse_capture_document, CaptureDocumentV2, CaptureRecord},
};
use crate::engine::ProjectScope;

const SELECT_CAPTURE: &str = "SELECT id, is_draft, document_json FROM captures";

fn row_to_capture(row: &Row) -> Result<CaptureRecord> {
    let id: String = row.get("id")?;
    let document: String = row.get("document_json")?;
    let is_draft: bool = row.get("is_draft")?;

    let mut record = parse_capture_document(&document)
        .with_context(|| format!("failed to read capture {id}"))?;
    // The column is authoritative once a draft has been committed.
    record.is_draft = is_draft;
    Ok(record)
}

fn collect_captures(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<CaptureRecord>> {
    let mut captures = Vec::new();
    while let Some(row) = rows.next()? {
        captures.push(row_to_capture(row)?);
    }
    Ok(captures)
}

impl Database {
    /// Store a capture in the current document layout.
    pub async fn insert_capture(&self, capture: &CaptureRecord) -> Result<()> {
        let document = serde_json::to_string(&CaptureDocumentV2::from(capture))
            .context("failed to serialize capture document")?;
        self.insert_capture_document(document).await.map(|_| ())
    }

    /// Store a raw capture document of any supported layout verbatim.
    /// Returns the canonical record it reads back as.
    pub async fn insert_capture_document(&self, document: String) -> Result<CaptureRecord> {
        let record = parse_capture_document(&document)?;
        require(&record.id, "id")?;
        require(&record.session_id, "sessionId")?;

        let indexed = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO captures (id, session_id, project_id, created_at, is_draft, document_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    indexed.id,
                    indexed.session_id,
                    indexed.project_id,
                    indexed.created_at,
                    indexed.is_draft,
                    document,
                ],
            )
            .context("failed to insert capture")?;
            Ok(())
        })
        .await?;

        Ok(record)
    }

    pub async fn get_capture(&self, capture_id: &str) -> Result<Option<CaptureRecord>> {
        let capture_id = capture_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_CAPTURE} WHERE id = ?1"))?;
            let mut rows = stmt.query(params![capture_id])?;
            let capture = match rows.next()? {
                Some(row) => Some(row_to_capture(row)?),
                None => None,
            };
            Ok(capture)
        })
        .await
    }

    /// One page of a session's captures, oldest first. Drafts included.
    pub async fn list_captures_for_session(
        &self,
        session_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CaptureRecord>> {
        let session_id = session_id.to_string();
        let limit = to_i64(limit as u64)?;
        let offset = to_i64(offset as u64)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_CAPTURE}
                 WHERE session_id = ?1
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let mut rows = stmt.query(params![session_id, limit, offset])?;
            collect_captures(&mut rows)
        })
        .await
    }

    pub async fn count_captures_for_session(&self, session_id: &str) -> Result<usize> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM captures WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }

    /// Committed captures that belong to the project, either directly through
    /// `projectId` or, for captures without one, through a linked session.
    pub async fn list_captures_scoped(&self, project_id: &str) -> Result<Vec<CaptureRecord>> {
        let project_id = require(project_id, "projectId")?.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id FROM project_sessions WHERE project_id = ?1",
            )?;
            let linked = stmt
                .query_map(params![project_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            let scope = ProjectScope::new(project_id.clone(), linked);

            let mut stmt = conn.prepare(&format!(
                "{SELECT_CAPTURE}
                 WHERE is_draft = 0 AND (project_id = ?1 OR project_id IS NULL)
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let mut rows = stmt.query(params![project_id])?;
            let candidates = collect_captures(&mut rows)?;

            Ok(scope.retain(candidates))
        })
        .await
    }

    /// Flip a draft capture to committed. Committing twice is a no-op.
    pub async fn commit_capture(&self, capture_id: &str) -> Result<()> {
        let capture_id = require(capture_id, "id")?.to_string();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE captures SET is_draft = 0 WHERE id = ?1 AND is_draft = 1",
                params![capture_id],
            )?;
            if updated == 0 {
                let exists: Option<String> = conn
                    .query_row(
                        "SELECT id FROM captures WHERE id = ?1",
                        params![capture_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_none() {
                    bail!("Capture not found");
                }
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_capture(&self, capture_id: &str) -> Result<bool> {
        let capture_id = require(capture_id, "id")?.to_string();
        self.execute(move |conn| {
            let deleted = conn.execute("DELETE FROM captures WHERE id = ?1", params![capture_id])?;
            Ok(deleted > 0)
        })
        .await
    }
}
