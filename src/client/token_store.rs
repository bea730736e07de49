use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::RwLock,
};

use tracing::debug;

/// Single slot holding the most recently issued token.
///
/// Writes are last-write-wins; the token is stored and returned verbatim.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str) -> std::io::Result<()>;
    fn clear(&self) -> std::io::Result<()>;
    /// Clears only if the slot still holds `expected`. Returns whether it cleared.
    fn clear_if(&self, expected: &str) -> std::io::Result<bool>;
}

/// Lives as long as the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, token: &str) -> std::io::Result<()> {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }

    fn clear_if(&self, expected: &str) -> std::io::Result<bool> {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        if slot.as_deref() != Some(expected) {
            return Ok(false);
        }
        *slot = None;
        Ok(true)
    }
}

/// Survives restarts; `clear` deletes the file.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        (!token.is_empty()).then(|| token.to_owned())
    }

    fn set(&self, token: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, token)?;
        debug!(path = %self.path.display(), "token stored");
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn clear_if(&self, expected: &str) -> std::io::Result<bool> {
        if self.get().as_deref() != Some(expected) {
            return Ok(false);
        }
        self.clear()?;
        Ok(true)
    }
}
