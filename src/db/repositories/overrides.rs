use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{now_millis, require, require_project_id},
    models::{compound_key, ComponentOverride, OverrideInput},
};

const SELECT_OVERRIDE: &str = "SELECT id, project_id, component_key, display_name, description,
        category_override, type_override, status_override, updated_at
 FROM component_overrides";

fn row_to_override(row: &Row) -> Result<ComponentOverride, rusqlite::Error> {
    Ok(ComponentOverride {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        component_key: row.get("component_key")?,
        display_name: row.get("display_name")?,
        description: row.get("description")?,
        category_override: row.get("category_override")?,
        type_override: row.get("type_override")?,
        status_override: row.get("status_override")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Blank strings are stored as null so they fall through to derived labels.
fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl Database {
    /// Write the override for `projectId:componentKey`, replacing every field.
    pub async fn upsert_override(&self, input: OverrideInput) -> Result<ComponentOverride> {
        require_project_id(&input.project_id)?;
        require(&input.component_key, "componentKey")?;

        let record = ComponentOverride {
            id: compound_key(&input.project_id, &input.component_key),
            project_id: input.project_id,
            component_key: input.component_key,
            display_name: blank_to_none(input.display_name),
            description: blank_to_none(input.description),
            category_override: blank_to_none(input.category_override),
            type_override: blank_to_none(input.type_override),
            status_override: blank_to_none(input.status_override),
            updated_at: now_millis(),
        };

        let row = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO component_overrides (id, project_id, component_key, display_name,
                     description, category_override, type_override, status_override, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                     display_name = excluded.display_name,
                     description = excluded.description,
                     category_override = excluded.category_override,
                     type_override = excluded.type_override,
                     status_override = excluded.status_override,
                     updated_at = excluded.updated_at",
                params![
                    row.id,
                    row.project_id,
                    row.component_key,
                    row.display_name,
                    row.description,
                    row.category_override,
                    row.type_override,
                    row.status_override,
                    row.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .context("failed to save component override")?;

        Ok(record)
    }

    pub async fn get_override(
        &self,
        project_id: &str,
        component_key: &str,
    ) -> Result<Option<ComponentOverride>> {
        let id = compound_key(project_id, component_key);
        self.execute(move |conn| {
            let record = conn
                .query_row(
                    &format!("{SELECT_OVERRIDE} WHERE id = ?1"),
                    params![id],
                    row_to_override,
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    pub async fn list_overrides(&self, project_id: &str) -> Result<Vec<ComponentOverride>> {
        let project_id = project_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_OVERRIDE} WHERE project_id = ?1 ORDER BY component_key ASC"
            ))?;
            let records = stmt
                .query_map(params![project_id], row_to_override)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    pub async fn delete_override(&self, project_id: &str, component_key: &str) -> Result<bool> {
        require_project_id(project_id)?;
        require(component_key, "componentKey")?;
        let id = compound_key(project_id, component_key);
        self.execute(move |conn| {
            let deleted =
                conn.execute("DELETE FROM component_overrides WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await
    }
}
