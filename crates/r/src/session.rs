use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::Result;
use ragchat::{Message, QueryOptions};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Data that depends on the command invocation and is never persisted.
#[derive(Debug, Default)]
pub struct Meta {
    path: PathBuf,
    fresh: bool,
}

/// Represents a chat session.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Session {
    id: String,
    pub history: Vec<Message>,
    pub options: QueryOptions,
    #[serde(skip)]
    pub meta: Meta,
}

impl Session {
    fn new(id: String, path: PathBuf) -> Self {
        Self {
            id,
            meta: Meta { path, fresh: true },
            ..Default::default()
        }
    }

    /// Opens the named session, or a new anonymous one when `id` is `None`.
    pub fn open(id: Option<String>) -> Result<Self> {
        Self::open_in(&sessions_root()?, id)
    }

    pub fn open_in(root: &Path, id: Option<String>) -> Result<Self> {
        match id {
            Some(id) => Self::load(root, id),
            None => {
                let id = Ulid::new().to_string();
                let path = root.join("anonymous").join(format!("{id}.yaml"));
                tracing::event!(tracing::Level::INFO, "Creating anonymous session...");
                Ok(Self::new(id, path))
            }
        }
    }

    /// Tries to load a session from the filesystem. Unknown sessions start empty.
    fn load(root: &Path, id: String) -> Result<Self> {
        let path = root.join(format!("{id}.yaml"));

        if !path.exists() {
            tracing::event!(tracing::Level::INFO, "Session does not exist, creating...");
            return Ok(Self::new(id, path));
        }

        tracing::event!(tracing::Level::INFO, "Session exists, loading...");
        let mut session: Session = serde_yaml::from_str(&fs::read_to_string(&path)?)?;
        session.meta = Meta { path, fresh: false };

        Ok(session)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns true if the session was not read from disk.
    pub fn is_fresh(&self) -> bool {
        self.meta.fresh
    }

    pub fn path(&self) -> &Path {
        &self.meta.path
    }

    /// Saves the session to the filesystem.
    pub fn save(&self) -> Result<()> {
        tracing::event!(
            tracing::Level::INFO,
            "saving session to {:?}",
            self.meta.path
        );

        if let Some(parent) = self.meta.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.meta.path, serde_yaml::to_string(&self)?)?;
        Ok(())
    }
}

/// Directory holding the session files: `$R_ROOT/.r/sessions`, falling back to `$HOME`.
pub fn sessions_root() -> Result<PathBuf> {
    let home = match env::var("R_ROOT") {
        Ok(root) => root,
        Err(_) => env::var("HOME")?,
    };

    Ok(PathBuf::from(home).join(".r").join("sessions"))
}
