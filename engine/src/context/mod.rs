//! Context Assembler
//!
//! Builds the uploaded-document context for a question from a conversation
//! snapshot. Documents whose filename appears in the question are searched
//! first; when none is mentioned, or the mentioned ones match nothing,
//! documents are probed in attachment order until one yields fragments.

use axon_sdk::types::Fragment;
use tracing::{debug, warn};

use crate::conversation::{ConversationSnapshot, DocumentView};

/// Render one fragment with its source marker
pub fn format_fragment(filename: &str, fragment: &Fragment) -> String {
    match fragment.page {
        Some(page) => format!("From {} (page {}):\n{}", filename, page, fragment.content),
        None => format!("From {}:\n{}", filename, fragment.content),
    }
}

pub struct ContextAssembler {
    max_fragments: usize,
}

impl ContextAssembler {
    pub fn new(max_fragments: usize) -> Self {
        Self {
            max_fragments: max_fragments.max(1),
        }
    }

    pub fn max_fragments(&self) -> usize {
        self.max_fragments
    }

    /// Context for `question`, or `None` when nothing matched
    pub async fn assemble(&self, snapshot: &ConversationSnapshot, question: &str) -> Option<String> {
        self.assemble_with(snapshot, question, self.max_fragments)
            .await
    }

    /// Same as `assemble` with an explicit per-document fragment count.
    ///
    /// Mentioned documents replace the unmentioned ones: when any mentioned
    /// document matches, the others are not probed, even the first one
    /// attached. Unmentioned documents are a fallback only.
    pub async fn assemble_with(
        &self,
        snapshot: &ConversationSnapshot,
        question: &str,
        max_fragments: usize,
    ) -> Option<String> {
        if snapshot.documents.is_empty() {
            return None;
        }

        let question_lower = question.to_lowercase();
        let (mentioned, others): (Vec<&DocumentView>, Vec<&DocumentView>) = snapshot
            .documents
            .iter()
            .partition(|d| question_lower.contains(&d.filename.to_lowercase()));

        let mut sections = Vec::new();
        for document in &mentioned {
            sections.extend(probe(document, question, max_fragments).await);
        }

        if sections.is_empty() {
            for document in &others {
                let found = probe(document, question, max_fragments).await;
                if !found.is_empty() {
                    sections.extend(found);
                    break;
                }
            }
        }

        if sections.is_empty() {
            return None;
        }

        debug!(
            "Assembled {} fragments for conversation {}",
            sections.len(),
            snapshot.id
        );
        Some(sections.join("\n\n"))
    }
}

/// Search one document, treating a failed lookup as no match
async fn probe(document: &DocumentView, question: &str, k: usize) -> Vec<String> {
    match document.index.search(question, k).await {
        Ok(fragments) => fragments
            .iter()
            .take(k)
            .map(|f| format_fragment(&document.filename, f))
            .collect(),
        Err(e) => {
            warn!("Context lookup in '{}' failed: {}", document.filename, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axon_sdk::collaborators::DocumentIndex;
    use axon_sdk::errors::{Result, TutorError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedIndex {
        fragments: Vec<Fragment>,
        calls: AtomicUsize,
    }

    impl FixedIndex {
        fn new(fragments: Vec<Fragment>) -> Arc<Self> {
            Arc::new(Self {
                fragments,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DocumentIndex for FixedIndex {
        async fn search(&self, _query: &str, k: usize) -> Result<Vec<Fragment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.fragments.iter().take(k).cloned().collect())
        }
    }

    struct FailingIndex;

    #[async_trait]
    impl DocumentIndex for FailingIndex {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<Fragment>> {
            Err(TutorError::upstream("index offline"))
        }
    }

    fn view(filename: &str, index: Arc<dyn DocumentIndex>) -> DocumentView {
        DocumentView {
            filename: filename.to_string(),
            index,
        }
    }

    fn snapshot(documents: Vec<DocumentView>) -> ConversationSnapshot {
        ConversationSnapshot {
            id: "conv_1".to_string(),
            turns: Vec::new(),
            documents,
        }
    }

    #[tokio::test]
    async fn test_no_documents_yields_none() {
        let assembler = ContextAssembler::new(3);
        assert!(assembler.assemble(&snapshot(vec![]), "anything").await.is_none());
    }

    #[tokio::test]
    async fn test_unmentioned_first_document_is_probed() {
        let first = FixedIndex::new(vec![Fragment::new("Cells divide.", Some(4))]);
        let second = FixedIndex::new(vec![Fragment::new("Unused.", None)]);
        let snap = snapshot(vec![view("bio.pdf", first.clone()), view("chem.txt", second.clone())]);

        let context = ContextAssembler::new(3)
            .assemble(&snap, "How do cells divide?")
            .await
            .unwrap();

        assert_eq!(context, "From bio.pdf (page 4):\nCells divide.");
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mentioned_document_takes_priority() {
        let first = FixedIndex::new(vec![Fragment::new("Biology.", None)]);
        let second = FixedIndex::new(vec![
            Fragment::new("Acids.", Some(1)),
            Fragment::new("Bases.", Some(2)),
        ]);
        let snap = snapshot(vec![view("bio.txt", first.clone()), view("Chem.txt", second.clone())]);

        let context = ContextAssembler::new(3)
            .assemble(&snap, "In chem.txt, what is a base?")
            .await
            .unwrap();

        assert_eq!(
            context,
            "From Chem.txt (page 1):\nAcids.\n\nFrom Chem.txt (page 2):\nBases."
        );
        assert_eq!(first.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_index_is_skipped() {
        let healthy = FixedIndex::new(vec![Fragment::new("Gravity.", None)]);
        let snap = snapshot(vec![
            view("broken.txt", Arc::new(FailingIndex)),
            view("physics.txt", healthy),
        ]);

        let context = ContextAssembler::new(3)
            .assemble(&snap, "What is gravity?")
            .await
            .unwrap();

        assert_eq!(context, "From physics.txt:\nGravity.");
    }

    #[tokio::test]
    async fn test_no_matches_yields_none() {
        let empty = FixedIndex::new(vec![]);
        let snap = snapshot(vec![view("a.txt", empty.clone()), view("b.txt", FixedIndex::new(vec![]))]);

        assert!(ContextAssembler::new(3).assemble(&snap, "q").await.is_none());
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fragment_count_is_bounded() {
        let many = FixedIndex::new((0..10).map(|i| Fragment::new(format!("f{}", i), None)).collect());
        let snap = snapshot(vec![view("notes.txt", many)]);

        let context = ContextAssembler::new(3)
            .assemble_with(&snap, "q", 2)
            .await
            .unwrap();
        assert_eq!(context.matches("From notes.txt").count(), 2);
    }
}
