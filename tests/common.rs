//! Test utilities & fixtures.
//! Quest trees are built in temp dirs; nothing under `tests/` is mutated.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use questdesk::gui::controller::{Clock, GuiSettings, QuestGui, Response};
use questdesk::gui::menu::ViewDescription;
use questdesk::storage::{DocumentKey, DocumentStore, FileBackend, FileEntry, LocalFs};

/// Document with two tasks and fields the editor does not know about.
#[allow(dead_code)]
pub const TASKS_DOC: &str = "\
name: Potion practice
meta:
  author: mira
tasks:
  gather:
    task: CONSUME
    args:
      amount: 2
      types:
        - speed
    reward: 5
  Brew:
    task: CONSUME
    difficulty: HARD
    action: Drink something strong
";

/// A fresh store rooted in a temp dir. Keep the `TempDir` alive for the test.
#[allow(dead_code)]
pub fn temp_store() -> (tempfile::TempDir, DocumentStore) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let store = DocumentStore::open(tmp.path().join("quests")).expect("open store");
    (tmp, store)
}

/// Write `content` at `rel` below the store root, bypassing the store.
#[allow(dead_code)]
pub fn seed(store: &DocumentStore, rel: &str, content: &str) -> DocumentKey {
    let key = DocumentKey::parse(rel).expect("valid key");
    let path = store.path_of(&key);
    std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
    std::fs::write(&path, content).expect("seed document");
    key
}

#[allow(dead_code)]
pub fn key(rel: &str) -> DocumentKey {
    DocumentKey::parse(rel).expect("valid key")
}

/// Clock pinned to a fixed instant.
#[allow(dead_code)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[allow(dead_code)]
pub fn gui(store: DocumentStore) -> QuestGui {
    gui_with(store, GuiSettings::default())
}

#[allow(dead_code)]
pub fn gui_with(store: DocumentStore, settings: GuiSettings) -> QuestGui {
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).single().expect("valid instant");
    QuestGui::with_clock(store, settings, Box::new(FixedClock(now)))
}

/// The menu carried by `response`; panics when the response is not a menu.
#[allow(dead_code)]
pub fn menu(response: &Response) -> ViewDescription {
    response
        .menu()
        .cloned()
        .unwrap_or_else(|| panic!("expected a menu, got {:?}", response.view))
}

/// Click `slot` of `view` the way a host would, passing the drawn item.
#[allow(dead_code)]
pub fn click(gui: &mut QuestGui, user: &str, view: &ViewDescription, slot: usize) -> Response {
    gui.handle_click(user, slot, view.item(slot))
}

/// Local disk backend whose mutations fail while armed.
#[allow(dead_code)]
#[derive(Default)]
pub struct FlakyFs {
    armed: Arc<AtomicBool>,
    disk_full: bool,
}

#[allow(dead_code)]
impl FlakyFs {
    /// Every mutation is refused outright while armed.
    pub fn new() -> (Arc<Self>, Arc<AtomicBool>) {
        Self::build(false)
    }

    /// Writes start on disk and run out of space halfway while armed.
    pub fn disk_full() -> (Arc<Self>, Arc<AtomicBool>) {
        Self::build(true)
    }

    fn build(disk_full: bool) -> (Arc<Self>, Arc<AtomicBool>) {
        let fs = Arc::new(Self {
            armed: Arc::default(),
            disk_full,
        });
        let switch = fs.armed.clone();
        (fs, switch)
    }

    fn check(&self) -> io::Result<()> {
        if self.armed.load(Ordering::SeqCst) && !self.disk_full {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only volume"));
        }
        Ok(())
    }
}

impl FileBackend for FlakyFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        LocalFs.read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.check()?;
        if self.disk_full && self.armed.load(Ordering::SeqCst) {
            let half = &contents.as_bytes()[..contents.len() / 2];
            return LocalFs.write_with(path, |file| {
                file.write_all(half)?;
                Err(io::Error::new(io::ErrorKind::Other, "No space left on device"))
            });
        }
        LocalFs.write_atomic(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check()?;
        LocalFs.rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.check()?;
        LocalFs.remove(path)
    }

    fn exists(&self, path: &Path) -> bool {
        LocalFs.exists(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileEntry> {
        LocalFs.stat(path)
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<FileEntry>> {
        LocalFs.walk(root)
    }

    fn list_dirs(&self, root: &Path) -> io::Result<Vec<String>> {
        LocalFs.list_dirs(root)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        LocalFs.create_dir_all(path)
    }
}

/// Every file name below `root`, sorted, as `/`-joined relative paths.
#[allow(dead_code)]
pub fn files_under(root: &Path) -> Vec<String> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else { return };
        for entry in entries.flatten() {
            let path: PathBuf = entry.path();
            if path.is_dir() {
                walk(&path, root, out);
            } else if let Ok(rel) = path.strip_prefix(root) {
                let parts: Vec<String> = rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
                out.push(parts.join("/"));
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
