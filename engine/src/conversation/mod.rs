//! Conversation state
//!
//! `ConversationStore` owns every conversation's memory (turns), attached
//! documents and lazily created agent session for the lifetime of the
//! process. It is the only component that mutates turns or documents; other
//! components read through `snapshot`.
//!
//! # Locking
//!
//! - The id map is a `std::sync::RwLock`, never held across `.await`.
//! - Each conversation keeps its turns and documents behind its own
//!   `std::sync::RwLock`.
//! - Each conversation has a request gate (`tokio::sync::Mutex<()>`) the
//!   orchestrator holds for a whole request, so turns of one conversation are
//!   appended in request order.
//! - The agent slot is a `tokio::sync::Mutex` held across lazy creation, so
//!   two concurrent first requests create one session.

pub mod document;

pub use document::{DocumentHandle, DocumentInfo, DocumentView};

use axon_sdk::collaborators::{ToolAgent, ToolAgentFactory};
use axon_sdk::errors::{Result, TutorError};
use axon_sdk::types::{Speaker, Turn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Prefix of minted conversation ids
pub const ID_PREFIX: &str = "conv_";

#[derive(Default)]
struct ConversationState {
    turns: Vec<Turn>,
    documents: Vec<DocumentHandle>,
}

/// One conversation's shared state
pub struct Conversation {
    id: String,
    state: RwLock<ConversationState>,
    request_gate: Arc<Mutex<()>>,
    agent: Mutex<Option<Arc<dyn ToolAgent>>>,
}

impl Conversation {
    fn new(id: String) -> Self {
        Self {
            id,
            state: RwLock::new(ConversationState::default()),
            request_gate: Arc::new(Mutex::new(())),
            agent: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn turn_count(&self) -> usize {
        self.read().turns.len()
    }

    pub fn document_count(&self) -> usize {
        self.read().documents.len()
    }

    /// Copy of the conversation's readable state
    pub fn snapshot(&self) -> ConversationSnapshot {
        let state = self.read();
        ConversationSnapshot {
            id: self.id.clone(),
            turns: state.turns.clone(),
            documents: state.documents.iter().map(DocumentHandle::view).collect(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ConversationState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ConversationState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Release every document and close the agent session.
    ///
    /// Each step runs even if an earlier one failed; failures are logged.
    async fn release(&self) -> usize {
        let documents = std::mem::take(&mut self.write().documents);
        let mut failures = 0;

        for document in documents {
            let filename = document.filename().to_string();
            if let Err(e) = document.release() {
                failures += 1;
                warn!(
                    "Failed to clean up '{}' for conversation {}: {}",
                    filename, self.id, e
                );
            }
        }

        let session = self.agent.lock().await.take();
        if let Some(session) = session {
            if let Err(e) = session.close().await {
                failures += 1;
                warn!("Failed to close agent session for {}: {}", self.id, e);
            }
        }

        failures
    }
}

/// Read-only copy of a conversation used for context assembly and history
#[derive(Clone)]
pub struct ConversationSnapshot {
    pub id: String,
    pub turns: Vec<Turn>,
    pub documents: Vec<DocumentView>,
}

impl ConversationSnapshot {
    pub fn has_history(&self) -> bool {
        !self.turns.is_empty()
    }

    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }
}

/// Process-wide owner of conversation state
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Arc<Conversation>>>,
    minted: AtomicU64,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            minted: AtomicU64::new(0),
        }
    }

    fn map_read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Conversation>>> {
        self.conversations.read().unwrap_or_else(|e| e.into_inner())
    }

    fn map_write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Conversation>>> {
        self.conversations.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the conversation for `id`, creating it when needed.
    ///
    /// `None` mints a fresh id. An unknown explicit id is adopted.
    pub fn resolve(&self, id: Option<&str>) -> (String, Arc<Conversation>) {
        if let Some(id) = id {
            if let Some(existing) = self.map_read().get(id) {
                return (id.to_string(), Arc::clone(existing));
            }

            let mut map = self.map_write();
            let conversation = map
                .entry(id.to_string())
                .or_insert_with(|| {
                    info!("Adopting conversation id {}", id);
                    Arc::new(Conversation::new(id.to_string()))
                })
                .clone();
            return (id.to_string(), conversation);
        }

        let mut map = self.map_write();
        loop {
            let n = self.minted.fetch_add(1, Ordering::Relaxed) + 1;
            let id = format!("{}{}", ID_PREFIX, n);
            if map.contains_key(&id) {
                continue;
            }
            let conversation = Arc::new(Conversation::new(id.clone()));
            map.insert(id.clone(), Arc::clone(&conversation));
            info!("Created conversation {}", id);
            return (id, conversation);
        }
    }

    /// Explicitly create a new conversation
    pub fn create(&self) -> (String, Arc<Conversation>) {
        self.resolve(None)
    }

    /// Look up an existing conversation
    pub fn get(&self, id: &str) -> Result<Arc<Conversation>> {
        self.map_read()
            .get(id)
            .cloned()
            .ok_or_else(|| TutorError::NotFound(format!("Conversation {}", id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.map_read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.map_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map_read().is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.map_read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn snapshot(&self, id: &str) -> Result<ConversationSnapshot> {
        Ok(self.get(id)?.snapshot())
    }

    pub fn history(&self, id: &str) -> Result<Vec<Turn>> {
        Ok(self.get(id)?.read().turns.clone())
    }

    pub fn append_turn(&self, id: &str, speaker: Speaker, text: impl Into<String>) -> Result<()> {
        let conversation = self.get(id)?;
        conversation.write().turns.push(Turn::new(speaker, text));
        Ok(())
    }

    /// Append a question and its answer as one unit
    pub fn append_exchange(&self, id: &str, question: &str, answer: &str) -> Result<()> {
        let conversation = self.get(id)?;
        let mut state = conversation.write();
        state.turns.push(Turn::new(Speaker::User, question));
        state.turns.push(Turn::new(Speaker::Assistant, answer));
        debug!("Conversation {} now has {} turns", id, state.turns.len());
        Ok(())
    }

    /// Forget the conversation's turns, keeping documents and agent session
    pub fn clear_history(&self, id: &str) -> Result<()> {
        self.get(id)?.write().turns.clear();
        Ok(())
    }

    /// Attach a document, replacing any document with the same filename
    pub fn attach_document(&self, id: &str, handle: DocumentHandle) -> Result<()> {
        let conversation = self.get(id)?;
        let replaced = {
            let mut state = conversation.write();
            let position = state
                .documents
                .iter()
                .position(|d| d.filename() == handle.filename());
            match position {
                Some(position) => Some(std::mem::replace(&mut state.documents[position], handle)),
                None => {
                    state.documents.push(handle);
                    None
                }
            }
        };

        if let Some(old) = replaced {
            let filename = old.filename().to_string();
            if let Err(e) = old.release() {
                warn!("Failed to clean up replaced '{}': {}", filename, e);
            }
        }
        Ok(())
    }

    /// Detach a document and remove its staged content
    pub fn detach_document(&self, id: &str, filename: &str) -> Result<()> {
        let conversation = self.get(id)?;
        let removed = {
            let mut state = conversation.write();
            let position = state
                .documents
                .iter()
                .position(|d| d.filename() == filename)
                .ok_or_else(|| TutorError::NotFound(format!("File {}", filename)))?;
            state.documents.remove(position)
        };

        if let Err(e) = removed.release() {
            warn!("Failed to clean up '{}': {}", filename, e);
        }
        info!("Removed '{}' from conversation {}", filename, id);
        Ok(())
    }

    pub fn list_documents(&self, id: &str) -> Result<Vec<DocumentInfo>> {
        Ok(self
            .get(id)?
            .read()
            .documents
            .iter()
            .map(DocumentHandle::info)
            .collect())
    }

    pub async fn get_agent_session(&self, id: &str) -> Result<Option<Arc<dyn ToolAgent>>> {
        let conversation = self.get(id)?;
        let slot = conversation.agent.lock().await;
        Ok(slot.clone())
    }

    /// Install an agent session, closing any session it replaces
    pub async fn set_agent_session(&self, id: &str, session: Arc<dyn ToolAgent>) -> Result<()> {
        let conversation = self.get(id)?;
        let previous = conversation.agent.lock().await.replace(session);
        if let Some(previous) = previous {
            if let Err(e) = previous.close().await {
                warn!("Failed to close replaced agent session for {}: {}", id, e);
            }
        }
        Ok(())
    }

    /// Return the conversation's agent session, creating it on first use.
    ///
    /// The slot stays locked while the factory runs, so concurrent callers
    /// observe a single session.
    pub async fn agent_session_or_init(
        &self,
        id: &str,
        factory: &dyn ToolAgentFactory,
    ) -> Result<Arc<dyn ToolAgent>> {
        let conversation = self.get(id)?;
        let mut slot = conversation.agent.lock().await;
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }

        info!("Creating agent session for conversation {}", id);
        let session = factory.create().await?;
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Hold the conversation's request gate until the guard is dropped
    pub async fn request_gate(&self, id: &str) -> Result<OwnedMutexGuard<()>> {
        let gate = Arc::clone(&self.get(id)?.request_gate);
        Ok(gate.lock_owned().await)
    }

    /// Remove a conversation, releasing its documents and agent session
    pub async fn remove_conversation(&self, id: &str) -> Result<()> {
        let conversation = self
            .map_write()
            .remove(id)
            .ok_or_else(|| TutorError::NotFound(format!("Conversation {}", id)))?;

        let failures = conversation.release().await;
        info!(
            "Removed conversation {} ({} cleanup failures)",
            id, failures
        );
        Ok(())
    }

    /// Release every conversation; used at process teardown
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<Conversation>> = self.map_write().drain().map(|(_, c)| c).collect();
        let count = drained.len();

        let failures: usize = futures::future::join_all(drained.iter().map(|c| c.release()))
            .await
            .into_iter()
            .sum();
        info!(
            "Released {} conversations ({} cleanup failures)",
            count, failures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::StagedFile;
    use async_trait::async_trait;
    use axon_sdk::collaborators::DocumentIndex;
    use axon_sdk::types::Fragment;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    struct EmptyIndex;

    #[async_trait]
    impl DocumentIndex for EmptyIndex {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<Fragment>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct CountingAgent {
        closes: AtomicUsize,
    }

    #[async_trait]
    impl ToolAgent for CountingAgent {
        async fn run(&self, question: &str) -> Result<String> {
            Ok(format!("answer to {}", question))
        }

        async fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingFactory {
        created: AtomicUsize,
    }

    #[async_trait]
    impl ToolAgentFactory for CountingFactory {
        async fn create(&self) -> Result<Arc<dyn ToolAgent>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(Arc::new(CountingAgent::default()))
        }
    }

    async fn document(dir: &std::path::Path, name: &str) -> DocumentHandle {
        let staged = StagedFile::write(dir, name, b"content").await.unwrap();
        DocumentHandle::new(name, staged, Arc::new(EmptyIndex), None)
    }

    #[test]
    fn test_resolve_none_mints_distinct_ids() {
        let store = ConversationStore::new();
        let (a, _) = store.resolve(None);
        let (b, _) = store.resolve(None);

        assert_eq!(a, "conv_1");
        assert_eq!(b, "conv_2");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_resolve_existing_keeps_turns() {
        let store = ConversationStore::new();
        let (id, _) = store.resolve(None);
        store.append_exchange(&id, "What is DNA?", "A molecule.").unwrap();

        let (same, conversation) = store.resolve(Some(&id));
        assert_eq!(same, id);
        assert_eq!(conversation.turn_count(), 2);
        assert_eq!(store.history(&id).unwrap()[0].text, "What is DNA?");
    }

    #[test]
    fn test_unknown_explicit_id_is_adopted_and_never_reminted() {
        let store = ConversationStore::new();
        let (adopted, conversation) = store.resolve(Some("conv_1"));
        assert_eq!(adopted, "conv_1");
        assert_eq!(conversation.turn_count(), 0);

        let (minted, _) = store.resolve(None);
        assert_eq!(minted, "conv_2");
    }

    #[test]
    fn test_append_turn_to_unknown_conversation_fails() {
        let store = ConversationStore::new();
        assert!(matches!(
            store.append_turn("nope", Speaker::User, "hi"),
            Err(TutorError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_detach_missing_document_leaves_mapping_unchanged() {
        let dir = tempdir().unwrap();
        let store = ConversationStore::new();
        let (id, _) = store.create();
        store
            .attach_document(&id, document(dir.path(), "notes.txt").await)
            .unwrap();

        let err = store.detach_document(&id, "other.txt").unwrap_err();
        assert!(matches!(err, TutorError::NotFound(_)));
        assert_eq!(store.list_documents(&id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_detach_removes_staged_file() {
        let dir = tempdir().unwrap();
        let store = ConversationStore::new();
        let (id, _) = store.create();
        let handle = document(dir.path(), "notes.txt").await;
        let path = handle.staged_path().to_path_buf();
        store.attach_document(&id, handle).unwrap();

        store.detach_document(&id, "notes.txt").unwrap();
        assert!(!path.exists());
        assert!(store.list_documents(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reattach_same_name_releases_previous() {
        let dir = tempdir().unwrap();
        let store = ConversationStore::new();
        let (id, _) = store.create();
        let first = document(dir.path(), "notes.txt").await;
        let first_path = first.staged_path().to_path_buf();
        store.attach_document(&id, first).unwrap();
        store
            .attach_document(&id, document(dir.path(), "notes.txt").await)
            .unwrap();

        assert!(!first_path.exists());
        assert_eq!(store.list_documents(&id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_documents_keep_attachment_order() {
        let dir = tempdir().unwrap();
        let store = ConversationStore::new();
        let (id, _) = store.create();
        for name in ["b.txt", "a.txt", "c.txt"] {
            store.attach_document(&id, document(dir.path(), name).await).unwrap();
        }

        let names: Vec<String> = store
            .snapshot(&id)
            .unwrap()
            .documents
            .into_iter()
            .map(|d| d.filename)
            .collect();
        assert_eq!(names, vec!["b.txt", "a.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_create_one_session() {
        let store = Arc::new(ConversationStore::new());
        let (id, _) = store.create();
        let factory = Arc::new(CountingFactory {
            created: AtomicUsize::new(0),
        });

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let factory = Arc::clone(&factory);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .agent_session_or_init(&id, factory.as_ref())
                    .await
                    .unwrap()
            }));
        }
        let sessions: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_remove_closes_agent_once_despite_failed_cleanup() {
        let dir = tempdir().unwrap();
        let store = ConversationStore::new();
        let (id, _) = store.create();

        let broken = document(dir.path(), "broken.txt").await;
        std::fs::remove_file(broken.staged_path()).unwrap();
        let healthy = document(dir.path(), "healthy.txt").await;
        let healthy_path = healthy.staged_path().to_path_buf();
        store.attach_document(&id, broken).unwrap();
        store.attach_document(&id, healthy).unwrap();

        let agent = Arc::new(CountingAgent::default());
        store.set_agent_session(&id, agent.clone()).await.unwrap();

        store.remove_conversation(&id).await.unwrap();

        assert!(!healthy_path.exists());
        assert_eq!(agent.closes.load(Ordering::SeqCst), 1);
        assert!(!store.contains(&id));
        assert!(matches!(
            store.remove_conversation(&id).await,
            Err(TutorError::NotFound(_))
        ));
        assert_eq!(agent.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_releases_everything() {
        let dir = tempdir().unwrap();
        let store = ConversationStore::new();
        let mut paths = Vec::new();
        for _ in 0..3 {
            let (id, _) = store.create();
            let handle = document(dir.path(), "notes.txt").await;
            paths.push(handle.staged_path().to_path_buf());
            store.attach_document(&id, handle).unwrap();
        }

        store.shutdown().await;

        assert!(store.is_empty());
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn test_request_gate_serializes_same_conversation() {
        let store = ConversationStore::new();
        let (id, _) = store.create();

        let guard = store.request_gate(&id).await.unwrap();
        let conversation = store.get(&id).unwrap();
        assert!(conversation.request_gate.try_lock().is_err());
        drop(guard);
        assert!(conversation.request_gate.try_lock().is_ok());
    }
}
