use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Docx,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = filename.rsplit_once('.').map(|(_, ext)| ext)?;
        if extension.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else if extension.eq_ignore_ascii_case("docx") {
            Some(Self::Docx)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Docx => ".docx",
        }
    }

    pub fn parse_extension(extension: &str) -> Option<Self> {
        match extension {
            ".pdf" | "pdf" => Some(Self::Pdf),
            ".docx" | "docx" => Some(Self::Docx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "uploaded" => Some(Self::Uploaded),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub filetype: FileKind,
    pub content: String,
    pub checksum: String,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
}

/// One embedded span of a document. Immutable once written; rows cascade
/// when the parent document is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: Uuid,
    pub document_id: Uuid,
    pub seq: i32,
    pub text: String,
    pub model_id: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub passage_id: Uuid,
    pub document_id: Uuid,
    pub filename: String,
    pub text: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaRecord {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub model_id: String,
    pub passage_ids: Vec<Uuid>,
    pub feedback: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// Write-once record of an embedding-model comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingTestRecord {
    pub id: Uuid,
    pub question: String,
    pub source: String,
    pub results: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QaStage {
    Received,
    Embedding,
    Retrieving,
    Generating,
    Answered,
    Failed,
}

impl std::fmt::Display for QaStage {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Embedding => "embedding",
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
            Self::Answered => "answered",
            Self::Failed => "failed",
        };
        formatter.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 1_200,
            overlap_chars: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentFilter {
    pub filetype: Option<FileKind>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for DocumentFilter {
    fn default() -> Self {
        Self {
            filetype: None,
            date_from: None,
            date_to: None,
            limit: 50,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QaFilter {
    pub feedback: Option<bool>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for QaFilter {
    fn default() -> Self {
        Self {
            feedback: None,
            date_from: None,
            date_to: None,
            limit: 50,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.offset + self.limit < self.total
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub total: i64,
    pub pdf: i64,
    pub docx: i64,
    pub recent_7_days: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QaStats {
    pub total_questions: i64,
    pub positive_feedback: i64,
    pub negative_feedback: i64,
    pub recent_7_days: i64,
    pub feedback_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageStatistics {
    pub documents: DocumentStats,
    pub qa: QaStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_id: String,
    pub dimensions: usize,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_is_detected_case_insensitively() {
        assert_eq!(FileKind::from_filename("report.PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_filename("notes.docx"), Some(FileKind::Docx));
        assert_eq!(FileKind::from_filename("image.png"), None);
        assert_eq!(FileKind::from_filename("no-extension"), None);
    }

    #[test]
    fn page_reports_remaining_items() {
        let page = Page {
            items: vec![1, 2],
            total: 10,
            limit: 2,
            offset: 0,
        };
        assert!(page.has_more());

        let last = Page {
            items: vec![9, 10],
            total: 10,
            limit: 2,
            offset: 8,
        };
        assert!(!last.has_more());
    }
}
