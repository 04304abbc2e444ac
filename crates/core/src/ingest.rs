use crate::chunking::{chunk_text, normalize_whitespace};
use crate::error::IngestError;
use crate::extract::extract_text;
use crate::models::{ChunkingConfig, Document, DocumentStatus, FileKind, Passage};
use crate::providers::EmbeddingRegistry;
use crate::traits::{HistoryStore, VectorStore};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Upload pipeline: validate, extract, chunk, embed, persist. The
/// document row is written first with status `uploaded`; it moves to
/// `processed` once every passage is stored, or `failed` if any step
/// after extraction errors out.
pub struct DocumentIngestor<S> {
    store: Arc<S>,
    registry: Arc<EmbeddingRegistry>,
    chunking: ChunkingConfig,
    max_file_size: usize,
}

impl<S> DocumentIngestor<S>
where
    S: VectorStore + HistoryStore,
{
    pub fn new(
        store: Arc<S>,
        registry: Arc<EmbeddingRegistry>,
        chunking: ChunkingConfig,
        max_file_size: usize,
    ) -> Self {
        Self {
            store,
            registry,
            chunking,
            max_file_size,
        }
    }

    pub async fn ingest(
        &self,
        filename: &str,
        bytes: &[u8],
        model_id: Option<&str>,
    ) -> Result<Document, IngestError> {
        let kind = FileKind::from_filename(filename)
            .ok_or_else(|| IngestError::UnsupportedFileType(filename.to_string()))?;

        if bytes.is_empty() {
            return Err(IngestError::EmptyUpload(filename.to_string()));
        }
        if bytes.len() > self.max_file_size {
            return Err(IngestError::TooLarge {
                size: bytes.len(),
                limit: self.max_file_size,
            });
        }

        let content = extract_text(kind, bytes, filename)?;
        if content.trim().is_empty() {
            return Err(IngestError::NoText(filename.to_string()));
        }

        let mut document = Document {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            filetype: kind,
            content,
            checksum: digest_bytes(bytes),
            status: DocumentStatus::Uploaded,
            uploaded_at: Utc::now(),
        };
        self.store.insert_document(&document).await?;

        match self.embed_and_store(&document, model_id).await {
            Ok(()) => {
                self.store
                    .set_document_status(document.id, DocumentStatus::Processed)
                    .await?;
                document.status = DocumentStatus::Processed;
                Ok(document)
            }
            Err(error) => {
                // The original error wins over a failed status update.
                let _ = self
                    .store
                    .set_document_status(document.id, DocumentStatus::Failed)
                    .await;
                Err(error)
            }
        }
    }

    async fn embed_and_store(
        &self,
        document: &Document,
        model_id: Option<&str>,
    ) -> Result<(), IngestError> {
        let chunks = chunk_text(&document.content, self.chunking)?;
        if chunks.is_empty() {
            return Ok(());
        }

        // The first chunk may fall back to another provider; every later
        // chunk is pinned to whatever model the first one used so the
        // document stays within a single vector space.
        let first = self
            .registry
            .embed(&normalize_whitespace(&chunks[0]), model_id)
            .await?;
        let used_model = first.model_id;
        let dimensions = first.vector.len();

        let mut embeddings = vec![first.vector];
        for chunk in &chunks[1..] {
            embeddings.push(
                self.registry
                    .embed_with(&used_model, &normalize_whitespace(chunk))
                    .await?,
            );
        }

        let passages: Vec<Passage> = chunks
            .into_iter()
            .enumerate()
            .map(|(index, text)| Passage {
                id: Uuid::new_v4(),
                document_id: document.id,
                seq: index as i32,
                text,
                model_id: used_model.clone(),
                dimensions,
            })
            .collect();

        self.store.insert_passages(&passages, &embeddings).await?;
        Ok(())
    }
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashedNgramEmbedder;
    use crate::stores::MemoryStore;
    use crate::traits::HistoryStore;
    use std::io::Write;

    fn test_registry() -> Arc<EmbeddingRegistry> {
        let mut registry = EmbeddingRegistry::new("local-test");
        registry.register(Arc::new(HashedNgramEmbedder::new("local-test", 64)));
        Arc::new(registry)
    }

    fn ingestor(store: Arc<MemoryStore>) -> DocumentIngestor<MemoryStore> {
        DocumentIngestor::new(
            store,
            test_registry(),
            ChunkingConfig {
                chunk_chars: 40,
                overlap_chars: 8,
            },
            1024 * 1024,
        )
    }

    fn docx_bytes(text: &str) -> Vec<u8> {
        let mut archive = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        archive.start_file("word/document.xml", options).unwrap();
        archive
            .write_all(
                format!(r#"<w:document><w:body><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:body></w:document>"#)
                    .as_bytes(),
            )
            .unwrap();
        archive.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn zero_byte_upload_is_a_validation_error() {
        let store = Arc::new(MemoryStore::new());
        let result = ingestor(store).ingest("empty.pdf", &[], None).await;
        assert!(matches!(result, Err(IngestError::EmptyUpload(_))));
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let result = ingestor(store).ingest("notes.txt", b"hello", None).await;
        assert!(matches!(result, Err(IngestError::UnsupportedFileType(_))));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = DocumentIngestor::new(store, test_registry(), ChunkingConfig::default(), 4);
        let result = ingestor.ingest("big.pdf", b"12345", None).await;
        assert!(matches!(result, Err(IngestError::TooLarge { .. })));
    }

    #[tokio::test]
    async fn docx_upload_produces_searchable_passages() {
        let store = Arc::new(MemoryStore::new());
        let bytes = docx_bytes(
            "The relief valve opens at 250 psi. Routine inspection happens every six months.",
        );

        let document = ingestor(store.clone())
            .ingest("manual.docx", &bytes, None)
            .await
            .unwrap();
        assert_eq!(document.status, DocumentStatus::Processed);

        let embedder = HashedNgramEmbedder::new("local-test", 64);
        let query = embedder.embed_sync("relief valve 250 psi");
        let hits = store.search(&query, "local-test", 3).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].document_id, document.id);
    }

    #[tokio::test]
    async fn failed_embedding_marks_the_document_failed() {
        let store = Arc::new(MemoryStore::new());
        // Registry whose only model is unknown at embed time.
        let registry = Arc::new(EmbeddingRegistry::new("local-test"));
        let ingestor = DocumentIngestor::new(
            store.clone(),
            registry,
            ChunkingConfig::default(),
            1024 * 1024,
        );

        let bytes = docx_bytes("Some perfectly fine document text for the pipeline.");
        let result = ingestor.ingest("manual.docx", &bytes, None).await;
        assert!(matches!(result, Err(IngestError::Provider(_))));

        let page = store
            .list_documents(&Default::default())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].status, DocumentStatus::Failed);
    }
}
