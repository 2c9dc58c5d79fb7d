use serde::{Deserialize, Serialize};

/// Screenshot bytes referenced by `screenshotBlobId`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub id: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}
