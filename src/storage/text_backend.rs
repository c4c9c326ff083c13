use chrono::{NaiveDateTime, Utc};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    config::Config,
    core::utils::{ensure_dir, PathResolver},
    errors::{LedgerError, Result},
};

use super::{codec, Session, SessionBackend};

const SESSION_EXTENSION: &str = "txt";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const BACKUP_TIMESTAMP_LEN: usize = 15;
const TMP_SUFFIX: &str = "tmp";
pub const DEFAULT_RETENTION: usize = 5;

/// Session store writing one text file per named session, with rolling backups.
#[derive(Clone)]
pub struct TextStorage {
    root: PathBuf,
    sessions_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl TextStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let app_root = PathResolver::resolve_base(root);
        ensure_dir(&app_root)?;
        let sessions_dir = PathResolver::sessions_dir_in(&app_root);
        let backups_dir = PathResolver::backups_dir_in(&app_root);
        ensure_dir(&sessions_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            root: app_root,
            sessions_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    /// Uses the retention configured in `config`.
    pub fn with_config(root: Option<PathBuf>, config: &Config) -> Result<Self> {
        Self::new(root, Some(config.backup_retention))
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn session_path(&self, name: &str) -> PathBuf {
        self.sessions_dir
            .join(format!("{}.{}", canonical_name(name), SESSION_EXTENSION))
    }

    pub fn backup_path(&self, name: &str, backup_name: &str) -> PathBuf {
        self.backup_dir(name).join(backup_name)
    }

    /// Canonical names of every saved session, sorted.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.sessions_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SESSION_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    /// Picks a backup name that no existing backup uses. Backups taken within
    /// the same second get a `-<n>` sequence after the timestamp.
    fn backup_file_name(&self, name: &str, note: Option<&str>) -> Result<String> {
        let prefix = canonical_name(name);
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let stamp_prefix = format!("{}_{}", prefix, timestamp);
        let sequence = self
            .list_backups(name)?
            .iter()
            .filter(|existing| existing.starts_with(&stamp_prefix))
            .map(|existing| backup_sequence(&prefix, existing))
            .max()
            .map_or(1, |latest| latest + 1);

        let mut stem = stamp_prefix;
        if sequence > 1 {
            stem.push_str(&format!("-{sequence}"));
        }
        if let Some(label) = sanitize_backup_note(note) {
            stem.push('_');
            stem.push_str(&label);
        }
        Ok(format!("{}.{}", stem, SESSION_EXTENSION))
    }

    fn backup_existing_file(&self, name: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let backup_name = self.backup_file_name(name, None)?;
        fs::copy(path, dir.join(&backup_name))?;
        tracing::debug!(session = name, backup = %backup_name, "backed up previous session");
        self.prune_backups(name)
    }

    fn prune_backups(&self, name: &str) -> Result<()> {
        let backups = self.list_backups(name)?;
        for stale in backups.iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(self.backup_path(name, stale)) {
                tracing::warn!(backup = %stale, %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl SessionBackend for TextStorage {
    fn save(&self, session: &Session, name: &str) -> Result<()> {
        let path = self.session_path(name);
        self.backup_existing_file(name, &path)?;
        save_session_to_path(session, &path)?;
        tracing::info!(session = name, path = %path.display(), "saved session");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Session> {
        let path = self.session_path(name);
        if !path.exists() {
            return Err(LedgerError::Storage(format!("session `{}` not found", name)));
        }
        let session = load_session_from_path(&path)?;
        tracing::info!(
            session = name,
            accounts = session.accounts.len(),
            "loaded session"
        );
        Ok(session)
    }

    /// Backup file names, newest first. Backups from the same second are
    /// ordered by their sequence number.
    fn list_backups(&self, name: &str) -> Result<Vec<String>> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = canonical_name(name);
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SESSION_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(file_name.to_string());
            }
        }
        entries.sort_by(|a, b| {
            let newer = parse_backup_timestamp(&prefix, b).cmp(&parse_backup_timestamp(&prefix, a));
            newer
                .then_with(|| backup_sequence(&prefix, b).cmp(&backup_sequence(&prefix, a)))
                .then_with(|| b.cmp(a))
        });
        Ok(entries)
    }

    fn backup(&self, session: &Session, name: &str, note: Option<&str>) -> Result<String> {
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let backup_name = self.backup_file_name(name, note)?;
        save_session_to_path(session, &dir.join(&backup_name))?;
        self.prune_backups(name)?;
        tracing::info!(session = name, backup = %backup_name, "created backup");
        Ok(backup_name)
    }

    fn restore(&self, name: &str, backup_name: &str) -> Result<Session> {
        let backup_path = self.backup_path(name, backup_name);
        if !backup_path.exists() {
            return Err(LedgerError::Storage(format!(
                "backup `{}` not found",
                backup_name
            )));
        }
        let session = load_session_from_path(&backup_path)?;
        let target = self.session_path(name);
        fs::copy(&backup_path, &target)?;
        tracing::info!(session = name, backup = backup_name, "restored session");
        Ok(session)
    }
}

/// Writes `session` to `path` through a temp file and rename.
pub fn save_session_to_path(session: &Session, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let text = codec::encode_session(session);
    let tmp = tmp_path(path);
    write_atomic(&tmp, &text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_session_from_path(path: &Path) -> Result<Session> {
    let text = fs::read_to_string(path)?;
    codec::decode_session(&text)
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "session".into()
    } else {
        sanitized
    }
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.' | '_'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Reads the `YYYYmmdd_HHMMSS` stamp following `<prefix>_` in a backup name.
fn parse_backup_timestamp(prefix: &str, file_name: &str) -> Option<NaiveDateTime> {
    let rest = file_name.strip_prefix(prefix)?.strip_prefix('_')?;
    let stamp = rest.get(..BACKUP_TIMESTAMP_LEN)?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT).ok()
}

/// Sequence of a backup within its second: `1` unless the timestamp is
/// followed by `-<n>`.
fn backup_sequence(prefix: &str, file_name: &str) -> u32 {
    file_name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.get(BACKUP_TIMESTAMP_LEN..))
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| {
            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            rest[..digits].parse().ok()
        })
        .unwrap_or(1)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
