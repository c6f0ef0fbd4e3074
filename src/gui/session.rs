use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::storage::{DocumentKey, GuildKey};

/// # Operator Session State
///
/// One record per operator identity, created lazily the first time a menu is
/// opened and dropped when the operator disconnects.
///
/// ## What a session remembers
///
/// - `open_level` - the menu currently on screen (`None` while no menu is open)
/// - `selected_guild` / `selected_quest` / `selected_task` - the path walked down the tree
/// - `guild_page` / `quest_page` / `task_page` - page cursors restored when going back
/// - `slot_map` - which on-screen slot stands for which entity; replaced wholesale on every render
/// - `pending_input` - at most one outstanding free-text request
/// - `editing` - the document currently open in the long-text editor
///
/// ## Usage
///
/// ```rust
/// use questdesk::gui::session::{SessionStore, MenuLevel};
///
/// let mut sessions = SessionStore::new();
/// let session = sessions.session("alex");
/// assert!(session.open_level.is_none());
/// session.open_level = Some(MenuLevel::GuildList);
/// assert_eq!(sessions.get("alex").unwrap().breadcrumb(), "Guilds");
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    pub user: String,
    pub open_level: Option<MenuLevel>,
    pub selected_guild: Option<GuildKey>,
    pub selected_quest: Option<DocumentKey>,
    pub selected_task: Option<String>,
    pub guild_page: usize,
    pub quest_page: usize,
    pub task_page: usize,
    slot_map: HashMap<usize, SlotTarget>,
    pending_input: Option<PendingInput>,
    /// Document whose full text is open in the paged editor
    pub editing: Option<DocumentKey>,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Menu levels of the quest browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuLevel {
    GuildList,
    QuestList { guild: GuildKey },
    QuestDetail { quest: DocumentKey },
    /// Modal confirmation reachable from QuestDetail
    DeleteConfirm { quest: DocumentKey },
    TaskList { quest: DocumentKey },
    TaskActionDetail { quest: DocumentKey, task: String },
}

impl MenuLevel {
    /// Level that "back" returns to.
    pub fn parent(&self) -> Option<MenuLevel> {
        match self {
            MenuLevel::GuildList => None,
            MenuLevel::QuestList { .. } => Some(MenuLevel::GuildList),
            MenuLevel::QuestDetail { quest } => Some(MenuLevel::QuestList { guild: quest.guild() }),
            MenuLevel::DeleteConfirm { quest } | MenuLevel::TaskList { quest } => {
                Some(MenuLevel::QuestDetail { quest: quest.clone() })
            }
            MenuLevel::TaskActionDetail { quest, .. } => Some(MenuLevel::TaskList { quest: quest.clone() }),
        }
    }

    pub fn is_modal(&self) -> bool {
        matches!(self, MenuLevel::DeleteConfirm { .. })
    }
}

/// Fixed (non-data) entries a menu can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuAction {
    CreateQuest,
    Reload,
    Back,
    PreviousPage,
    NextPage,
    Duplicate,
    EditText,
    OpenTasks,
    Rename,
    Delete,
    ConfirmDelete,
    CancelDelete,
    AddTask,
    CycleDifficulty,
    SetAction,
    SetAmount,
}

/// What a clickable slot currently represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotTarget {
    Guild(GuildKey),
    Quest(DocumentKey),
    Task(String),
    Action(MenuAction),
}

/// Which operation the next free-text message completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    Create,
    Rename,
    Duplicate,
    SetTaskAction,
    SetTaskAmount,
}

impl InputKind {
    /// Line shown to the operator when the request starts.
    pub fn prompt(self) -> &'static str {
        match self {
            InputKind::Create => "Enter a file name for the new quest (or type 'cancel').",
            InputKind::Rename => "Enter a new file name (or type 'cancel').",
            InputKind::Duplicate => "Enter a new file name for the copy (or type 'cancel').",
            InputKind::SetTaskAction => "Enter the action text for this task (or type 'cancel').",
            InputKind::SetTaskAmount => "Enter the required amount, a whole number of at least 1 (or type 'cancel').",
        }
    }

    /// Line shown when the submitted text has to be typed again.
    pub fn retry_prompt(self) -> &'static str {
        match self {
            InputKind::Create | InputKind::Rename | InputKind::Duplicate => {
                "Enter a different file name (or type 'cancel')."
            }
            InputKind::SetTaskAction => "Enter a non-empty action (or type 'cancel').",
            InputKind::SetTaskAmount => "Enter a whole number of at least 1 (or type 'cancel').",
        }
    }
}

/// An outstanding request for the operator's next free-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInput {
    pub kind: InputKind,
    pub target_document: Option<DocumentKey>,
    pub target_task: Option<String>,
}

impl Session {
    pub fn new(user: String) -> Self {
        let now = Utc::now();
        Session {
            user,
            open_level: None,
            selected_guild: None,
            selected_quest: None,
            selected_task: None,
            guild_page: 0,
            quest_page: 0,
            task_page: 0,
            slot_map: HashMap::new(),
            pending_input: None,
            editing: None,
            started_at: now,
            last_activity: now,
        }
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Install the slot map of the menu that was just rendered.
    pub fn replace_slot_map(&mut self, slot_map: HashMap<usize, SlotTarget>) {
        self.slot_map = slot_map;
    }

    pub fn slot_target(&self, slot: usize) -> Option<&SlotTarget> {
        self.slot_map.get(&slot)
    }

    pub fn slot_map(&self) -> &HashMap<usize, SlotTarget> {
        &self.slot_map
    }

    pub fn clear_slot_map(&mut self) {
        self.slot_map.clear();
    }

    /// Record `level` as the open menu and align the selections with it.
    pub fn enter(&mut self, level: &MenuLevel) {
        match level {
            MenuLevel::GuildList => {}
            MenuLevel::QuestList { guild } => self.selected_guild = Some(guild.clone()),
            MenuLevel::QuestDetail { quest } | MenuLevel::DeleteConfirm { quest } | MenuLevel::TaskList { quest } => {
                self.selected_guild = Some(quest.guild());
                self.selected_quest = Some(quest.clone());
            }
            MenuLevel::TaskActionDetail { quest, task } => {
                self.selected_guild = Some(quest.guild());
                self.selected_quest = Some(quest.clone());
                self.selected_task = Some(task.clone());
            }
        }
        self.open_level = Some(level.clone());
    }

    /// Start a text request, discarding any earlier one.
    pub fn begin_input(&mut self, pending: PendingInput) {
        if let Some(previous) = self.pending_input.replace(pending) {
            debug!("Session {}: replaced pending {:?} request", self.user, previous.kind);
        }
    }

    pub fn take_input(&mut self) -> Option<PendingInput> {
        self.pending_input.take()
    }

    pub fn pending_input(&self) -> Option<&PendingInput> {
        self.pending_input.as_ref()
    }

    pub fn is_awaiting_text(&self) -> bool {
        self.pending_input.is_some()
    }

    /// Forget the selected guild and quest together with slots and pending input.
    pub fn clear_selections(&mut self) {
        self.selected_quest = None;
        self.selected_guild = None;
        self.slot_map.clear();
        self.pending_input = None;
    }

    /// Short location string for prompts and logs, e.g. `Guilds > mages > intro.yml`.
    pub fn breadcrumb(&self) -> String {
        let Some(level) = &self.open_level else {
            return if self.is_awaiting_text() {
                "awaiting text".to_string()
            } else {
                String::new()
            };
        };
        match level {
            MenuLevel::GuildList => "Guilds".into(),
            MenuLevel::QuestList { guild } => format!("Guilds > {guild}"),
            MenuLevel::QuestDetail { quest } => format!("Guilds > {} > {}", quest.guild(), quest.file_name()),
            MenuLevel::DeleteConfirm { quest } => format!("Delete {}?", quest.file_name()),
            MenuLevel::TaskList { quest } => {
                format!("Guilds > {} > {} > Tasks", quest.guild(), quest.file_name())
            }
            MenuLevel::TaskActionDetail { quest, task } => format!(
                "Guilds > {} > {} > Tasks > {}",
                quest.guild(),
                quest.file_name(),
                task
            ),
        }
    }
}

/// Per-operator sessions, keyed by identity. No state is shared between operators.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: &str) -> Option<&Session> {
        self.sessions.get(user)
    }

    pub fn get_mut(&mut self, user: &str) -> Option<&mut Session> {
        self.sessions.get_mut(user)
    }

    /// Session for `user`, created on first use.
    pub fn session(&mut self, user: &str) -> &mut Session {
        self.sessions.entry(user.to_string()).or_insert_with(|| {
            debug!("Creating session for {}", user);
            Session::new(user.to_string())
        })
    }

    pub fn clear_selections(&mut self, user: &str) {
        if let Some(session) = self.sessions.get_mut(user) {
            session.clear_selections();
        }
    }

    pub fn begin_input(&mut self, user: &str, pending: PendingInput) {
        self.session(user).begin_input(pending);
    }

    pub fn take_input(&mut self, user: &str) -> Option<PendingInput> {
        self.sessions.get_mut(user).and_then(Session::take_input)
    }

    /// Tear a session down (operator disconnected).
    pub fn end(&mut self, user: &str) -> Option<Session> {
        self.sessions.remove(user)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
