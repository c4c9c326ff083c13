pub mod codec;
pub mod text_backend;

use std::path::Path;

use crate::errors::Result;

pub use codec::{Direction, DroppedRecord, LenientDecode, Session};
pub use text_backend::{load_session_from_path, save_session_to_path, TextStorage};

/// Abstraction over persistence backends capable of storing whole sessions.
pub trait SessionBackend: Send + Sync {
    fn save(&self, session: &Session, name: &str) -> Result<()>;
    fn load(&self, name: &str) -> Result<Session>;
    fn list_backups(&self, name: &str) -> Result<Vec<String>>;
    /// Writes a snapshot of `session` and returns the backup file name.
    fn backup(&self, session: &Session, name: &str, note: Option<&str>) -> Result<String>;
    fn restore(&self, name: &str, backup_name: &str) -> Result<Session>;

    /// Ad-hoc file helpers; managed storage is bypassed unless overridden.
    fn save_to_path(&self, session: &Session, path: &Path) -> Result<()> {
        text_backend::save_session_to_path(session, path)
    }

    fn load_from_path(&self, path: &Path) -> Result<Session> {
        text_backend::load_session_from_path(path)
    }
}
