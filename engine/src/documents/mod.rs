//! Document uploads
//!
//! `DocumentService` turns an uploaded file into a searchable document
//! attached to a conversation: stage, classify, load, index, attach. The
//! staged file is a `StagedFile`, so any failure along the way removes it.

pub mod keyword_index;
pub mod loader;
pub mod staged;

pub use keyword_index::{KeywordIndex, KeywordIndexBuilder};
pub use loader::{DocxLoader, PdfLoader, PlainTextLoader};
pub use staged::StagedFile;

use axon_sdk::collaborators::{DocumentLoader, IndexBuilder};
use axon_sdk::errors::{Result, TutorError};
use axon_sdk::types::DocumentKind;
use std::path::PathBuf;
use std::sync::Arc;

use crate::conversation::{ConversationStore, DocumentHandle, DocumentInfo};

/// Result of a successful upload
#[derive(Debug, Clone, serde::Serialize)]
pub struct UploadReceipt {
    pub conversation_id: String,
    pub document: DocumentInfo,
}

pub struct DocumentService {
    store: Arc<ConversationStore>,
    loaders: Vec<Arc<dyn DocumentLoader>>,
    index_builder: Arc<dyn IndexBuilder>,
    staging_dir: PathBuf,
}

impl DocumentService {
    pub fn new(
        store: Arc<ConversationStore>,
        index_builder: Arc<dyn IndexBuilder>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            loaders: vec![
                Arc::new(PdfLoader),
                Arc::new(DocxLoader),
                Arc::new(PlainTextLoader),
            ],
            index_builder,
            staging_dir: staging_dir.into(),
        }
    }

    /// Register a loader; later loaders take precedence
    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loaders.insert(0, loader);
        self
    }

    fn loader_for(&self, kind: DocumentKind) -> Option<&Arc<dyn DocumentLoader>> {
        self.loaders.iter().find(|l| l.supports(kind))
    }

    /// Ingest an upload into a conversation, creating the conversation when
    /// `conversation_id` is `None`
    pub async fn ingest(
        &self,
        conversation_id: Option<&str>,
        filename: &str,
        bytes: &[u8],
        description: Option<String>,
    ) -> Result<UploadReceipt> {
        let name = staged::safe_file_name(filename)?.to_string();
        if let Some(id) = conversation_id {
            staged::check_conversation_dir(id)?;
        }
        let (conversation_id, _) = self.store.resolve(conversation_id);

        let staged =
            StagedFile::write(&self.staging_dir.join(&conversation_id), &name, bytes).await?;

        let kind = DocumentKind::from_filename(&name).ok_or_else(|| {
            TutorError::UnsupportedInput(format!("Unsupported file format: {}", name))
        })?;

        let loader = self.loader_for(kind).ok_or_else(|| {
            TutorError::UnsupportedInput(format!("No loader available for {:?} files", kind))
        })?;

        let pages = loader.load(staged.path(), kind).await?;
        if pages.iter().all(|p| p.text.trim().is_empty()) {
            return Err(TutorError::UnsupportedInput(format!(
                "{} contains no readable text",
                name
            )));
        }

        let index = self.index_builder.build(pages).await?;

        let handle = DocumentHandle::new(name.clone(), staged, index, description);
        let document = handle.info();
        self.store.attach_document(&conversation_id, handle)?;

        tracing::info!("Attached '{}' to conversation {}", name, conversation_id);
        Ok(UploadReceipt {
            conversation_id,
            document,
        })
    }

    pub fn list(&self, conversation_id: &str) -> Result<Vec<DocumentInfo>> {
        self.store.list_documents(conversation_id)
    }

    pub fn remove(&self, conversation_id: &str, filename: &str) -> Result<()> {
        self.store.detach_document(conversation_id, filename)
    }
}
