use std::fs;
use std::path::PathBuf;

use tracing::warn;

use crate::error::ChatError;
use crate::models::ChatSession;

const HISTORY_FILE: &str = "history.json";

pub fn get_app_data_dir() -> Result<PathBuf, ChatError> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ChatError::Storage("Could not find data directory".to_string()))?
        .join("Gemchat");

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)
            .map_err(|e| ChatError::Storage(format!("Failed to create data directory: {}", e)))?;
    }

    Ok(data_dir)
}

/// Key-value persistence of the serialized session list. One key, one
/// JSON array, most recent session first.
pub trait HistoryStorage: Send + Sync {
    /// Loads the stored sessions. A missing or unreadable history reads
    /// as empty rather than failing.
    fn load(&self) -> Vec<ChatSession>;

    fn save(&mut self, sessions: &[ChatSession]) -> Result<(), ChatError>;

    fn clear(&mut self) -> Result<(), ChatError>;
}

/// Session history persisted to a single JSON file in the app data
/// directory.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new() -> Result<Self, ChatError> {
        Ok(Self {
            path: get_app_data_dir()?.join(HISTORY_FILE),
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl HistoryStorage for FileStorage {
    fn load(&self) -> Vec<ChatSession> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str(&content) {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("Ignoring corrupt chat history: {}", e);
                Vec::new()
            }
        }
    }

    fn save(&mut self, sessions: &[ChatSession]) -> Result<(), ChatError> {
        let content = serde_json::to_string_pretty(sessions)
            .map_err(|e| ChatError::Storage(format!("Failed to serialize history: {}", e)))?;
        fs::write(&self.path, content)
            .map_err(|e| ChatError::Storage(format!("Failed to write history: {}", e)))
    }

    fn clear(&mut self) -> Result<(), ChatError> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| ChatError::Storage(format!("Failed to remove history: {}", e)))?;
        }
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral embedding.
#[derive(Default)]
pub struct MemoryStorage {
    sessions: Vec<ChatSession>,
}

impl HistoryStorage for MemoryStorage {
    fn load(&self) -> Vec<ChatSession> {
        self.sessions.clone()
    }

    fn save(&mut self, sessions: &[ChatSession]) -> Result<(), ChatError> {
        self.sessions = sessions.to_vec();
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ChatError> {
        self.sessions.clear();
        Ok(())
    }
}
