//! # Storage Module - Quest Document Persistence
//!
//! The [`DocumentStore`] owns the quest file tree: listing, guild grouping,
//! creating, renaming, duplicating and deleting quest documents, plus whole-text
//! reads and writes for the long-text editor. Structured task edits live in
//! [`tasks`].
//!
//! ## Layout
//!
//! ```text
//! quests/
//! ├── daily.yml                 ← no guild
//! ├── mages/
//! │   ├── arcane_intro.yml      ← guild "mages"
//! │   └── quest/
//! │       └── tier1/potions.yml ← guild "mages"
//! └── misc/deep/other.yml       ← no guild
//! ```
//!
//! All file access goes through a [`FileBackend`]; every failure is reported as
//! a recoverable [`QuestError`].

pub mod backend;
pub mod tasks;

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::audit_log;
use crate::errors::{QuestError, QuestResult};
use crate::validation::{has_document_extension, sanitize_file_name, validate_guild_name};

pub use backend::{FileBackend, FileEntry, LocalFs};
pub use tasks::{Difficulty, TaskEditor, TaskSummary};

/// Directory name that marks the nested layout `<guild>/quest/...`.
pub const GUILD_QUEST_DIR: &str = "quest";

/// Display name of the sentinel group for documents outside any guild.
pub const NO_GUILD_LABEL: &str = "No guild";

/// Content written into freshly created quest documents.
pub const DEFAULT_TEMPLATE: &str = "tasks:\n  example_task:\n    task: CONSUME\n    args:\n      amount: 1\n      types:\n        - \"strength\"\n";

/// Grouping of quest documents derived from their position in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuildKey {
    Named(String),
    NoGuild,
}

impl GuildKey {
    pub fn display_name(&self) -> &str {
        match self {
            GuildKey::Named(name) => name,
            GuildKey::NoGuild => NO_GUILD_LABEL,
        }
    }

    /// Case-insensitive by name, with the sentinel sorted last.
    fn menu_order(&self, other: &GuildKey) -> Ordering {
        match (self, other) {
            (GuildKey::NoGuild, GuildKey::NoGuild) => Ordering::Equal,
            (GuildKey::NoGuild, _) => Ordering::Greater,
            (_, GuildKey::NoGuild) => Ordering::Less,
            (GuildKey::Named(a), GuildKey::Named(b)) => {
                a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
            }
        }
    }
}

impl fmt::Display for GuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Path of a document relative to the store root, `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Build a key from a relative path string. Rejects absolute paths and `..`.
    pub fn parse(raw: &str) -> QuestResult<Self> {
        let normalized = raw.replace('\\', "/");
        let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() || normalized.starts_with('/') || parts.iter().any(|p| *p == "." || *p == "..") {
            return Err(QuestError::InvalidInput(format!("not a document key: {raw}")));
        }
        Ok(DocumentKey(parts.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Key of a sibling document in the same directory.
    pub fn sibling(&self, file_name: &str) -> DocumentKey {
        match self.0.rsplit_once('/') {
            Some((dir, _)) => DocumentKey(format!("{dir}/{file_name}")),
            None => DocumentKey(file_name.to_string()),
        }
    }

    /// Guild derived from the directory convention.
    pub fn guild(&self) -> GuildKey {
        let parts: Vec<&str> = self.0.split('/').collect();
        match parts.as_slice() {
            [_file] => GuildKey::NoGuild,
            [guild, _file] => GuildKey::Named((*guild).to_string()),
            [guild, marker, _, ..] if *marker == GUILD_QUEST_DIR => GuildKey::Named((*guild).to_string()),
            _ => GuildKey::NoGuild,
        }
    }

    fn to_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part))
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A quest document as seen by the menus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestDocument {
    pub key: DocumentKey,
    pub guild: GuildKey,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl QuestDocument {
    pub fn display_name(&self) -> &str {
        self.key.file_name()
    }
}

/// One guild with its documents, as listed in the guild menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildGroup {
    pub guild: GuildKey,
    pub documents: Vec<QuestDocument>,
}

/// Persistence layer for quest documents.
#[derive(Clone)]
pub struct DocumentStore {
    root: PathBuf,
    fs: Arc<dyn FileBackend>,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore").field("root", &self.root).finish()
    }
}

impl DocumentStore {
    /// Store over the local disk, creating the root directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> QuestResult<Self> {
        Self::with_backend(root, Arc::new(LocalFs))
    }

    pub fn with_backend(root: impl Into<PathBuf>, fs: Arc<dyn FileBackend>) -> QuestResult<Self> {
        let root = root.into();
        fs.create_dir_all(&root)
            .map_err(|e| QuestError::store("create directory", &root, e))?;
        Ok(Self { root, fs })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, key: &DocumentKey) -> PathBuf {
        key.to_path(&self.root)
    }

    pub fn exists(&self, key: &DocumentKey) -> bool {
        self.fs.exists(&self.path_of(key))
    }

    /// Metadata for a single document.
    pub fn document(&self, key: &DocumentKey) -> QuestResult<QuestDocument> {
        let path = self.path_of(key);
        if !self.fs.exists(&path) {
            return Err(QuestError::NotFound(format!("quest {key}")));
        }
        let entry = self
            .fs
            .stat(&path)
            .map_err(|e| QuestError::store("inspect", &path, e))?;
        Ok(Self::describe(key.clone(), &entry))
    }

    fn describe(key: DocumentKey, entry: &FileEntry) -> QuestDocument {
        QuestDocument {
            guild: key.guild(),
            key,
            size: entry.size,
            modified: entry.modified.map(DateTime::<Utc>::from),
        }
    }

    fn key_for(&self, path: &Path) -> Option<DocumentKey> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
        DocumentKey::parse(&parts?.join("/")).ok()
    }

    fn scan(&self) -> Vec<QuestDocument> {
        let entries = match self.fs.walk(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Unable to list quest files under {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };
        entries
            .iter()
            .filter(|entry| {
                entry
                    .path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(has_document_extension)
                    .unwrap_or(false)
            })
            .filter_map(|entry| self.key_for(&entry.path).map(|key| Self::describe(key, entry)))
            .collect()
    }

    fn sort_documents(docs: &mut [QuestDocument]) {
        docs.sort_by(|a, b| {
            a.display_name()
                .to_lowercase()
                .cmp(&b.display_name().to_lowercase())
                .then_with(|| a.key.cmp(&b.key))
        });
    }

    /// Documents of one guild (or all of them), ordered case-insensitively by file name.
    pub fn list(&self, guild: Option<&GuildKey>) -> Vec<QuestDocument> {
        let mut docs: Vec<QuestDocument> = self
            .scan()
            .into_iter()
            .filter(|doc| guild.map_or(true, |g| &doc.guild == g))
            .collect();
        Self::sort_documents(&mut docs);
        docs
    }

    /// Every guild with its documents. Top-level directories always show up,
    /// even when empty, and the no-guild group is always present and last.
    pub fn group_by_guild(&self) -> Vec<GuildGroup> {
        let mut groups: Vec<GuildGroup> = Vec::new();
        let dirs = self.fs.list_dirs(&self.root).unwrap_or_else(|e| {
            warn!("Unable to list guild directories under {}: {}", self.root.display(), e);
            Vec::new()
        });
        for dir in dirs {
            groups.push(GuildGroup {
                guild: GuildKey::Named(dir),
                documents: Vec::new(),
            });
        }
        groups.push(GuildGroup {
            guild: GuildKey::NoGuild,
            documents: Vec::new(),
        });
        for doc in self.scan() {
            match groups.iter_mut().find(|g| g.guild == doc.guild) {
                Some(group) => group.documents.push(doc),
                None => groups.push(GuildGroup {
                    guild: doc.guild.clone(),
                    documents: vec![doc],
                }),
            }
        }
        for group in &mut groups {
            Self::sort_documents(&mut group.documents);
        }
        groups.sort_by(|a, b| a.guild.menu_order(&b.guild));
        groups
    }

    fn ensure_free(&self, key: &DocumentKey) -> QuestResult<()> {
        if self.exists(key) {
            return Err(QuestError::Conflict {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_present(&self, key: &DocumentKey) -> QuestResult<PathBuf> {
        let path = self.path_of(key);
        if !self.fs.exists(&path) {
            return Err(QuestError::NotFound(format!("quest {key}")));
        }
        Ok(path)
    }

    /// Create a new document from the default template inside `guild`.
    pub fn create(&self, guild: &GuildKey, proposed_name: &str) -> QuestResult<QuestDocument> {
        let file_name = sanitize_file_name(proposed_name);
        let key = match guild {
            GuildKey::NoGuild => DocumentKey(file_name),
            GuildKey::Named(name) => DocumentKey(format!("{}/{}", validate_guild_name(name)?, file_name)),
        };
        self.ensure_free(&key)?;
        let path = self.path_of(&key);
        self.fs
            .write_atomic(&path, DEFAULT_TEMPLATE)
            .map_err(|e| QuestError::store("create", &path, e))?;
        audit_log!("quest.create key={} guild={}", key, guild);
        self.document(&key)
    }

    /// Move a document to a new name inside its own directory.
    pub fn rename(&self, key: &DocumentKey, proposed_name: &str) -> QuestResult<QuestDocument> {
        let from = self.ensure_present(key)?;
        let target = key.sibling(&sanitize_file_name(proposed_name));
        self.ensure_free(&target)?;
        let to = self.path_of(&target);
        self.fs.rename(&from, &to).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => QuestError::Conflict {
                key: target.to_string(),
            },
            _ => QuestError::store("rename", &from, e),
        })?;
        audit_log!("quest.rename from={} to={}", key, target);
        self.document(&target)
    }

    /// Copy a document to a new name inside its own directory.
    pub fn duplicate(&self, key: &DocumentKey, proposed_name: &str) -> QuestResult<QuestDocument> {
        let from = self.ensure_present(key)?;
        let target = key.sibling(&sanitize_file_name(proposed_name));
        self.ensure_free(&target)?;
        let content = self
            .fs
            .read_to_string(&from)
            .map_err(|e| QuestError::store("read", &from, e))?;
        let to = self.path_of(&target);
        self.fs
            .write_atomic(&to, &content)
            .map_err(|e| QuestError::store("write", &to, e))?;
        audit_log!("quest.duplicate from={} to={}", key, target);
        self.document(&target)
    }

    /// Delete a document. Deleting a missing document succeeds.
    pub fn delete(&self, key: &DocumentKey) -> QuestResult<()> {
        let path = self.path_of(key);
        self.fs
            .remove(&path)
            .map_err(|e| QuestError::store("delete", &path, e))?;
        audit_log!("quest.delete key={}", key);
        Ok(())
    }

    /// Full text of a document.
    pub fn read_text(&self, key: &DocumentKey) -> QuestResult<String> {
        let path = self.ensure_present(key)?;
        self.fs
            .read_to_string(&path)
            .map_err(|e| QuestError::store("read", &path, e))
    }

    /// Replace the full text of a document.
    pub fn write_text(&self, key: &DocumentKey, text: &str) -> QuestResult<()> {
        let path = self.path_of(key);
        self.fs
            .write_atomic(&path, text)
            .map_err(|e| QuestError::store("write", &path, e))?;
        debug!("Wrote {} bytes to {}", text.len(), key);
        Ok(())
    }

    /// Task editor bound to this store.
    pub fn tasks(&self) -> TaskEditor<'_> {
        TaskEditor::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> DocumentKey {
        DocumentKey::parse(raw).unwrap()
    }

    #[test]
    fn guild_follows_directory_convention() {
        assert_eq!(key("daily.yml").guild(), GuildKey::NoGuild);
        assert_eq!(key("mages/intro.yml").guild(), GuildKey::Named("mages".into()));
        assert_eq!(
            key("mages/quest/tier1/potions.yml").guild(),
            GuildKey::Named("mages".into())
        );
        assert_eq!(key("mages/quest/a.yml").guild(), GuildKey::Named("mages".into()));
        assert_eq!(key("misc/deep/other.yml").guild(), GuildKey::NoGuild);
    }

    #[test]
    fn keys_reject_traversal() {
        assert!(DocumentKey::parse("../x.yml").is_err());
        assert!(DocumentKey::parse("/abs.yml").is_err());
        assert!(DocumentKey::parse("").is_err());
        assert_eq!(key("a\\b.yml").as_str(), "a/b.yml");
    }

    #[test]
    fn sibling_stays_in_directory() {
        assert_eq!(key("mages/quest/a.yml").sibling("b.yml").as_str(), "mages/quest/b.yml");
        assert_eq!(key("a.yml").sibling("b.yml").as_str(), "b.yml");
    }

    #[test]
    fn guild_order_puts_sentinel_last() {
        let mut guilds = vec![
            GuildKey::NoGuild,
            GuildKey::Named("beta".into()),
            GuildKey::Named("Alpha".into()),
        ];
        guilds.sort_by(|a, b| a.menu_order(b));
        assert_eq!(
            guilds,
            vec![
                GuildKey::Named("Alpha".into()),
                GuildKey::Named("beta".into()),
                GuildKey::NoGuild
            ]
        );
    }
}
