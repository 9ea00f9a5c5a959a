use axon_sdk::collaborators::DocumentIndex;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::documents::StagedFile;

/// An uploaded document owned by one conversation
pub struct DocumentHandle {
    filename: String,
    staged: StagedFile,
    index: Arc<dyn DocumentIndex>,
    description: Option<String>,
}

impl DocumentHandle {
    pub fn new(
        filename: impl Into<String>,
        staged: StagedFile,
        index: Arc<dyn DocumentIndex>,
        description: Option<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            staged,
            index,
            description,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn staged_path(&self) -> &Path {
        self.staged.path()
    }

    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            filename: self.filename.clone(),
            description: self.description.clone(),
        }
    }

    pub(crate) fn view(&self) -> DocumentView {
        DocumentView {
            filename: self.filename.clone(),
            index: Arc::clone(&self.index),
        }
    }

    /// Remove the staged content
    pub fn release(self) -> io::Result<()> {
        self.staged.release()
    }
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("filename", &self.filename)
            .field("staged", &self.staged.path())
            .field("description", &self.description)
            .finish()
    }
}

/// Public description of an attached document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub description: Option<String>,
}

/// Read-only reference to a document's index, for context assembly
#[derive(Clone)]
pub struct DocumentView {
    pub filename: String,
    pub index: Arc<dyn DocumentIndex>,
}
