//! Audio transcription
//!
//! Uploaded audio is staged on disk, transcribed either remotely (Groq
//! Whisper) or by a local speech model, and the text is appended to the
//! conversation as a student turn. Local models are loaded once per size
//! variant and shared by every later request.

pub mod groq;

pub use groq::GroqTranscriber;

use axon_sdk::collaborators::{SpeechModelLoader, Transcriber};
use axon_sdk::errors::{Result, TutorError};
use axon_sdk::types::Speaker;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::conversation::ConversationStore;
use crate::documents::staged::{safe_file_name, StagedFile};

/// Lazily loaded local speech models, keyed by size variant
pub struct SpeechModels {
    loader: Arc<dyn SpeechModelLoader>,
    models: Mutex<HashMap<String, Arc<dyn Transcriber>>>,
}

impl SpeechModels {
    pub fn new(loader: Arc<dyn SpeechModelLoader>) -> Self {
        Self {
            loader,
            models: Mutex::new(HashMap::new()),
        }
    }

    /// The model for `variant`, loading it on first use.
    ///
    /// Loading happens under the cache lock, so concurrent first requests
    /// trigger a single load. A failed load is not cached.
    pub async fn get_or_init(&self, variant: &str) -> Result<Arc<dyn Transcriber>> {
        let mut models = self.models.lock().await;
        if let Some(model) = models.get(variant) {
            return Ok(Arc::clone(model));
        }

        info!("Loading speech model '{}'", variant);
        let model = self.loader.load(variant).await?;
        models.insert(variant.to_string(), Arc::clone(&model));
        Ok(model)
    }

    pub async fn loaded_variants(&self) -> Vec<String> {
        let mut variants: Vec<String> = self.models.lock().await.keys().cloned().collect();
        variants.sort();
        variants
    }
}

/// Result of a transcription request
#[derive(Debug, Clone, Serialize)]
pub struct Transcription {
    pub text: String,
    pub conversation_id: String,
    pub language: String,
}

pub struct AudioService {
    store: Arc<ConversationStore>,
    upload_dir: PathBuf,
    default_variant: String,
    local: Option<SpeechModels>,
    remote: Option<Arc<dyn Transcriber>>,
}

impl AudioService {
    pub fn new(
        store: Arc<ConversationStore>,
        upload_dir: impl Into<PathBuf>,
        default_variant: impl Into<String>,
    ) -> Self {
        Self {
            store,
            upload_dir: upload_dir.into(),
            default_variant: default_variant.into(),
            local: None,
            remote: None,
        }
    }

    pub fn with_local_models(mut self, loader: Arc<dyn SpeechModelLoader>) -> Self {
        self.local = Some(SpeechModels::new(loader));
        self
    }

    pub fn with_remote(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.remote = Some(transcriber);
        self
    }

    /// Transcribe an uploaded clip and record it in the conversation.
    ///
    /// The remote service is used when requested and configured, otherwise
    /// the local model for `variant` (or the default variant).
    pub async fn transcribe_upload(
        &self,
        conversation_id: Option<&str>,
        filename: &str,
        bytes: &[u8],
        language: &str,
        variant: Option<&str>,
        use_remote: bool,
    ) -> Result<Transcription> {
        let name = safe_file_name(filename)?;
        if bytes.is_empty() {
            return Err(TutorError::UnsupportedInput(format!("{} is empty", name)));
        }

        let (conversation_id, _) = self.store.resolve(conversation_id);
        let _gate = self.store.request_gate(&conversation_id).await?;

        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let staged = StagedFile::write(&self.upload_dir, &format!("audio{}", extension), bytes).await?;

        let transcriber = self.transcriber(variant, use_remote).await?;
        let text = transcriber
            .transcribe(staged.path(), language)
            .await
            .map_err(TutorError::into_processing)?;
        drop(staged);

        if text.trim().is_empty() {
            debug!("Empty transcription, conversation {} unchanged", conversation_id);
        } else {
            self.store
                .append_turn(&conversation_id, Speaker::User, text.trim())?;
        }

        Ok(Transcription {
            text,
            conversation_id,
            language: language.to_string(),
        })
    }

    async fn transcriber(&self, variant: Option<&str>, use_remote: bool) -> Result<Arc<dyn Transcriber>> {
        if use_remote {
            if let Some(remote) = &self.remote {
                return Ok(Arc::clone(remote));
            }
            debug!("Remote transcription unavailable, using local model");
        }

        let local = self.local.as_ref().ok_or_else(|| {
            TutorError::Configuration(
                "No speech model available; set GROQ_API_KEY and request remote transcription"
                    .to_string(),
            )
        })?;
        local
            .get_or_init(variant.unwrap_or(&self.default_variant))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct EchoTranscriber {
        text: String,
        saw_file: Arc<std::sync::Mutex<Option<PathBuf>>>,
    }

    #[async_trait]
    impl Transcriber for EchoTranscriber {
        async fn transcribe(&self, audio: &Path, _language: &str) -> Result<String> {
            assert!(audio.exists());
            *self.saw_file.lock().unwrap() = Some(audio.to_path_buf());
            Ok(self.text.clone())
        }
    }

    struct FailingTranscriber;

    #[async_trait]
    impl Transcriber for FailingTranscriber {
        async fn transcribe(&self, _audio: &Path, _language: &str) -> Result<String> {
            Err(TutorError::upstream("decoder crashed"))
        }
    }

    struct CountingLoader {
        loads: AtomicUsize,
        saw_file: Arc<std::sync::Mutex<Option<PathBuf>>>,
    }

    #[async_trait]
    impl SpeechModelLoader for CountingLoader {
        async fn load(&self, variant: &str) -> Result<Arc<dyn Transcriber>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(Arc::new(EchoTranscriber {
                text: format!("local {}", variant),
                saw_file: Arc::clone(&self.saw_file),
            }))
        }
    }

    fn loader() -> Arc<CountingLoader> {
        Arc::new(CountingLoader {
            loads: AtomicUsize::new(0),
            saw_file: Arc::new(std::sync::Mutex::new(None)),
        })
    }

    #[tokio::test]
    async fn test_get_or_init_loads_once_per_variant() {
        let loader = loader();
        let models = Arc::new(SpeechModels::new(loader.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let models = Arc::clone(&models);
                tokio::spawn(async move { models.get_or_init("base").await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        models.get_or_init("tiny").await.unwrap();

        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert_eq!(models.loaded_variants().await, vec!["base", "tiny"]);
    }

    #[tokio::test]
    async fn test_local_transcription_appends_user_turn_and_cleans_up() {
        let dir = tempdir().unwrap();
        let store = Arc::new(ConversationStore::new());
        let loader = loader();
        let service = AudioService::new(Arc::clone(&store), dir.path(), "base")
            .with_local_models(loader.clone());

        let result = service
            .transcribe_upload(None, "lecture.mp3", b"ID3", "en", None, false)
            .await
            .unwrap();

        assert_eq!(result.text, "local base");
        let history = store.history(&result.conversation_id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].speaker, Speaker::User);

        let staged = loader.saw_file.lock().unwrap().clone().unwrap();
        assert!(staged.to_string_lossy().ends_with(".mp3"));
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn test_remote_preferred_when_requested() {
        let dir = tempdir().unwrap();
        let store = Arc::new(ConversationStore::new());
        let saw = Arc::new(std::sync::Mutex::new(None));
        let service = AudioService::new(Arc::clone(&store), dir.path(), "base")
            .with_local_models(loader())
            .with_remote(Arc::new(EchoTranscriber {
                text: "remote".into(),
                saw_file: saw,
            }));

        let result = service
            .transcribe_upload(Some("conv_7"), "q.wav", b"RIFF", "en", Some("tiny"), true)
            .await
            .unwrap();
        assert_eq!(result.text, "remote");
        assert_eq!(result.conversation_id, "conv_7");
    }

    #[tokio::test]
    async fn test_failure_removes_staged_file_and_keeps_history() {
        let dir = tempdir().unwrap();
        let store = Arc::new(ConversationStore::new());
        let service = AudioService::new(Arc::clone(&store), dir.path(), "base")
            .with_remote(Arc::new(FailingTranscriber));

        let err = service
            .transcribe_upload(Some("conv_1"), "q.wav", b"RIFF", "en", None, true)
            .await
            .unwrap_err();

        assert!(matches!(err, TutorError::Processing(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(store.history("conv_1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_backend_is_configuration_error() {
        let dir = tempdir().unwrap();
        let service = AudioService::new(Arc::new(ConversationStore::new()), dir.path(), "base");

        let err = service
            .transcribe_upload(None, "q.wav", b"RIFF", "en", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_empty_upload_is_unsupported() {
        let dir = tempdir().unwrap();
        let service = AudioService::new(Arc::new(ConversationStore::new()), dir.path(), "base");

        let err = service
            .transcribe_upload(None, "q.wav", b"", "en", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::UnsupportedInput(_)));
    }
}
