use anyhow::Result;
use rusqlite::{params, OptionalExtension};

use crate::db::{connection::Database, helpers::require, models::Blob};

impl Database {
    pub async fn put_blob(&self, blob: &Blob) -> Result<()> {
        require(&blob.id, "id")?;
        let record = blob.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO blobs (id, mime_type, bytes) VALUES (?1, ?2, ?3)",
                params![record.id, record.mime_type, record.bytes],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_blob(&self, blob_id: &str) -> Result<Option<Blob>> {
        let blob_id = blob_id.to_string();
        self.execute(move |conn| {
            let blob = conn
                .query_row(
                    "SELECT id, mime_type, bytes FROM blobs WHERE id = ?1",
                    params![blob_id],
                    |row| {
                        Ok(Blob {
                            id: row.get(0)?,
                            mime_type: row.get(1)?,
                            bytes: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(blob)
        })
        .await
    }
}
