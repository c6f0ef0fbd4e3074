//! # Quest GUI Controller
//!
//! [`QuestGui`] is the outward face of the editor. A host calls it with
//! operator events (open, click, text, close, editor submit, disconnect) and
//! gets back a [`Response`]: notices to show plus the view to display next.
//!
//! ## Event flow
//!
//! ```text
//! click ──▶ slot map lookup ──▶ navigate ──────────────▶ MenuNavigator::build
//!                         └──▶ store / task mutation ──┘
//! text  ──▶ InputWorkflow::submit ──▶ destination ─────▶ build / editor
//! ```
//!
//! Every error ends in a renderable state: a level whose document or task
//! vanished falls back to its nearest valid parent with a notice.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::audit_log;
use crate::config::Config;
use crate::errors::{ErrorKind, QuestError};
use crate::gui::editor::{join_pages, EditorView, DEFAULT_PAGE_CHARS};
use crate::gui::input::{Destination, InputOutcome, InputWorkflow};
use crate::gui::menu::{MenuItem, MenuNavigator, ViewDescription};
use crate::gui::session::{InputKind, MenuAction, MenuLevel, Session, SessionStore, SlotTarget};
use crate::storage::{DocumentKey, DocumentStore};

/// Source of "now" for last-modified display.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One line of feedback for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text)
    }
}

/// What the host should display after handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostView {
    /// Keep whatever is on screen.
    Unchanged,
    Menu(ViewDescription),
    Editor(EditorView),
    /// Close any open view (e.g. to let the operator type).
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub notices: Vec<Notice>,
    pub view: HostView,
}

impl Response {
    pub fn unchanged() -> Self {
        Self {
            notices: Vec::new(),
            view: HostView::Unchanged,
        }
    }

    fn closed(notice: Notice) -> Self {
        Self {
            notices: vec![notice],
            view: HostView::Closed,
        }
    }

    pub fn menu(&self) -> Option<&ViewDescription> {
        match &self.view {
            HostView::Menu(view) => Some(view),
            _ => None,
        }
    }
}

/// Result of routing a free-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub outcome: InputOutcome,
    pub response: Response,
}

/// Host-facing knobs, usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct GuiSettings {
    pub editor_title: String,
    pub book_page_chars: usize,
    /// Empty means everyone may open the menu.
    pub allowed_users: Vec<String>,
}

impl Default for GuiSettings {
    fn default() -> Self {
        Self {
            editor_title: "Quest Editor".into(),
            book_page_chars: DEFAULT_PAGE_CHARS,
            allowed_users: Vec::new(),
        }
    }
}

impl From<&Config> for GuiSettings {
    fn from(config: &Config) -> Self {
        Self {
            editor_title: config.editor.name.clone(),
            book_page_chars: config.menu.book_page_chars,
            allowed_users: config.editor.allowed_users.clone(),
        }
    }
}

pub struct QuestGui {
    store: DocumentStore,
    sessions: SessionStore,
    clock: Box<dyn Clock>,
    settings: GuiSettings,
}

impl QuestGui {
    pub fn new(store: DocumentStore, settings: GuiSettings) -> Self {
        Self::with_clock(store, settings, Box::new(SystemClock))
    }

    pub fn with_clock(store: DocumentStore, settings: GuiSettings, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            sessions: SessionStore::new(),
            clock,
            settings,
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn session(&self, user: &str) -> Option<&Session> {
        self.sessions.get(user)
    }

    fn may_open(&self, user: &str) -> bool {
        self.settings.allowed_users.is_empty() || self.settings.allowed_users.iter().any(|u| u == user)
    }

    fn refuse(user: &str) -> Response {
        warn!("{} is not allowed to open the quest editor", user);
        Response {
            notices: vec![Notice::error("You are not allowed to use the quest editor.")],
            view: HostView::Unchanged,
        }
    }

    /// Open the guild list for `user`, creating the session on first use.
    pub fn open_menu(&mut self, user: &str) -> Response {
        if !self.may_open(user) {
            return Self::refuse(user);
        }
        let session = self.sessions.session(user);
        session.update_activity();
        session.editing = None;
        self.show(user, MenuLevel::GuildList, Vec::new())
    }

    /// Re-render whatever `user` is looking at (the guild list when nothing is open).
    pub fn render_menu(&mut self, user: &str) -> Response {
        if !self.may_open(user) {
            return Self::refuse(user);
        }
        let level = self
            .sessions
            .session(user)
            .open_level
            .clone()
            .unwrap_or(MenuLevel::GuildList);
        self.show(user, level, Vec::new())
    }

    /// Build `level`, walking up to the nearest parent that still renders.
    fn show(&mut self, user: &str, level: MenuLevel, mut notices: Vec<Notice>) -> Response {
        let now = self.clock.now();
        let navigator = MenuNavigator::new(&self.store);
        let session = self.sessions.session(user);
        let mut level = level;
        loop {
            match navigator.build(&level, session, now) {
                Ok(view) => {
                    return Response {
                        notices,
                        view: HostView::Menu(view),
                    }
                }
                Err(err) => {
                    let stale = err.kind() == ErrorKind::NotFound;
                    if stale {
                        debug!("{} fell back from {:?}: {}", user, level, err);
                        notices.push(Notice::warning(format!("{err}; showing the previous menu.")));
                    } else {
                        warn!("Unable to render {:?} for {}: {}", level, user, err);
                        notices.push(Notice::error(format!("Failed to read quest file: {err}")));
                    }
                    match level.parent() {
                        Some(parent) => level = parent,
                        None => {
                            session.open_level = None;
                            session.clear_slot_map();
                            return Response {
                                notices,
                                view: HostView::Closed,
                            };
                        }
                    }
                }
            }
        }
    }

    fn begin_input(
        &mut self,
        user: &str,
        kind: InputKind,
        document: Option<DocumentKey>,
        task: Option<String>,
    ) -> Response {
        let session = self.sessions.session(user);
        Response::closed(InputWorkflow::begin(session, kind, document, task))
    }

    /// Handle a click on `slot`. `item` is what the host had drawn there.
    pub fn handle_click(&mut self, user: &str, slot: usize, item: Option<&MenuItem>) -> Response {
        if item.is_none() {
            return Response::unchanged();
        }
        let Some(session) = self.sessions.get_mut(user) else {
            return Response::unchanged();
        };
        let Some(level) = session.open_level.clone() else {
            debug!("{} clicked slot {} with no menu open", user, slot);
            return Response::unchanged();
        };
        let Some(target) = session.slot_target(slot).cloned() else {
            return Response::unchanged();
        };
        session.update_activity();
        debug!("{} clicked {:?} on {:?}", user, target, level);

        match (level, target) {
            (MenuLevel::GuildList, SlotTarget::Guild(guild)) => {
                session.quest_page = 0;
                self.show(user, MenuLevel::QuestList { guild }, Vec::new())
            }
            (MenuLevel::QuestList { .. }, SlotTarget::Quest(quest)) => {
                self.show(user, MenuLevel::QuestDetail { quest }, Vec::new())
            }
            (MenuLevel::TaskList { quest }, SlotTarget::Task(task)) => {
                self.show(user, MenuLevel::TaskActionDetail { quest, task }, Vec::new())
            }
            (level, SlotTarget::Action(action)) => self.handle_action(user, level, action),
            (level, target) => {
                debug!("Ignoring {:?} on {:?}", target, level);
                Response::unchanged()
            }
        }
    }

    fn turn_page(&mut self, user: &str, level: MenuLevel, forward: bool) -> Response {
        let session = self.sessions.session(user);
        let cursor = match level {
            MenuLevel::GuildList => &mut session.guild_page,
            MenuLevel::QuestList { .. } => &mut session.quest_page,
            MenuLevel::TaskList { .. } => &mut session.task_page,
            _ => return Response::unchanged(),
        };
        *cursor = if forward {
            cursor.saturating_add(1)
        } else {
            cursor.saturating_sub(1)
        };
        self.show(user, level, Vec::new())
    }

    fn handle_action(&mut self, user: &str, level: MenuLevel, action: MenuAction) -> Response {
        match (level, action) {
            (level, MenuAction::Reload) => self.show(user, level, Vec::new()),
            (level, MenuAction::PreviousPage) => self.turn_page(user, level, false),
            (level, MenuAction::NextPage) => self.turn_page(user, level, true),
            (level, MenuAction::Back) | (level @ MenuLevel::DeleteConfirm { .. }, MenuAction::CancelDelete) => {
                let parent = level.parent().unwrap_or(MenuLevel::GuildList);
                self.show(user, parent, Vec::new())
            }

            (MenuLevel::QuestList { guild }, MenuAction::CreateQuest) => {
                self.sessions.session(user).selected_guild = Some(guild);
                self.begin_input(user, InputKind::Create, None, None)
            }

            (MenuLevel::QuestDetail { quest }, MenuAction::Duplicate) => {
                self.begin_input(user, InputKind::Duplicate, Some(quest), None)
            }
            (MenuLevel::QuestDetail { quest }, MenuAction::Rename) => {
                self.begin_input(user, InputKind::Rename, Some(quest), None)
            }
            (MenuLevel::QuestDetail { quest }, MenuAction::EditText) => self.open_editor(user, &quest),
            (MenuLevel::QuestDetail { quest }, MenuAction::OpenTasks) => {
                self.sessions.session(user).task_page = 0;
                self.show(user, MenuLevel::TaskList { quest }, Vec::new())
            }
            (MenuLevel::QuestDetail { quest }, MenuAction::Delete) => {
                self.show(user, MenuLevel::DeleteConfirm { quest }, Vec::new())
            }

            (MenuLevel::DeleteConfirm { quest }, MenuAction::ConfirmDelete) => match self.store.delete(&quest) {
                Ok(()) => {
                    info!("{} deleted {}", user, quest);
                    let session = self.sessions.session(user);
                    session.selected_quest = None;
                    session.selected_task = None;
                    let notice = Notice::success(format!("Quest deleted: {}", quest.file_name()));
                    self.show(user, MenuLevel::QuestList { guild: quest.guild() }, vec![notice])
                }
                Err(err) => self.failed(user, MenuLevel::QuestDetail { quest }, err),
            },

            (MenuLevel::TaskList { quest }, MenuAction::AddTask) => {
                let added = self.store.tasks().add_task(&quest);
                match added {
                    Ok(task) => {
                        let notice = Notice::success(format!("Added task {task}."));
                        self.show(user, MenuLevel::TaskList { quest }, vec![notice])
                    }
                    Err(err) => self.failed(user, MenuLevel::TaskList { quest }, err),
                }
            }

            (MenuLevel::TaskActionDetail { quest, task }, MenuAction::CycleDifficulty) => {
                let tasks = self.store.tasks();
                let result = tasks
                    .get_difficulty(&quest, &task)
                    .map(|d| d.next())
                    .and_then(|next| tasks.set_difficulty(&quest, &task, next).map(|()| next));
                let level = MenuLevel::TaskActionDetail { quest, task };
                match result {
                    Ok(next) => {
                        let notice = Notice::info(format!("Difficulty set to {next}."));
                        self.show(user, level, vec![notice])
                    }
                    Err(err) => self.failed(user, level, err),
                }
            }
            (MenuLevel::TaskActionDetail { quest, task }, MenuAction::SetAction) => {
                self.begin_input(user, InputKind::SetTaskAction, Some(quest), Some(task))
            }
            (MenuLevel::TaskActionDetail { quest, task }, MenuAction::SetAmount) => {
                self.begin_input(user, InputKind::SetTaskAmount, Some(quest), Some(task))
            }

            (level, action) => {
                debug!("Action {:?} does not apply to {:?}", action, level);
                Response::unchanged()
            }
        }
    }

    /// Report a failed mutation and re-render `level` (or its nearest valid parent).
    fn failed(&mut self, user: &str, level: MenuLevel, err: QuestError) -> Response {
        let notice = match err.kind() {
            ErrorKind::NotFound => Notice::warning(err.to_string()),
            _ => {
                warn!("{} action on {:?} failed: {}", user, level, err);
                Notice::error(format!("Failed to update quest file: {err}"))
            }
        };
        self.show(user, level, vec![notice])
    }

    /// Route a chat line. `NotPending` means the text was not for the editor.
    pub fn handle_text_input(&mut self, user: &str, text: &str) -> TextResponse {
        let Some(session) = self.sessions.get_mut(user) else {
            return TextResponse {
                outcome: InputOutcome::NotPending,
                response: Response::unchanged(),
            };
        };
        session.update_activity();
        let submission = InputWorkflow::new(&self.store).submit(session, text);

        let response = match submission.destination {
            Some(Destination::Menu(level)) => self.show(user, level, submission.notices),
            Some(Destination::Editor(doc)) => {
                let mut response = self.open_editor(user, &doc);
                let mut notices = submission.notices;
                notices.append(&mut response.notices);
                response.notices = notices;
                response
            }
            None => Response {
                notices: submission.notices,
                view: HostView::Unchanged,
            },
        };
        TextResponse {
            outcome: submission.outcome,
            response,
        }
    }

    /// Close notification from the host. Only the currently open level counts.
    pub fn handle_view_closed(&mut self, user: &str, level: &MenuLevel) {
        let Some(session) = self.sessions.get_mut(user) else {
            return;
        };
        if session.open_level.as_ref() != Some(level) {
            debug!("Ignoring stale close of {:?} for {}", level, user);
            return;
        }
        session.open_level = None;
        session.clear_slot_map();
        session.take_input();
        if level.is_modal() {
            session.clear_selections();
        }
        debug!("{} closed {:?}", user, level);
    }

    /// Snapshot `doc` into editor pages.
    pub fn open_editor(&mut self, user: &str, doc: &DocumentKey) -> Response {
        if !self.may_open(user) {
            return Self::refuse(user);
        }
        match self.store.read_text(doc) {
            Ok(text) => {
                let session = self.sessions.session(user);
                session.open_level = None;
                session.clear_slot_map();
                session.selected_quest = Some(doc.clone());
                session.editing = Some(doc.clone());
                let title = format!("{} - {}", self.settings.editor_title, doc.file_name());
                let view = EditorView::new(title, doc.clone(), &text, self.settings.book_page_chars);
                debug!("{} editing {} ({} pages)", user, doc, view.pages.len());
                Response {
                    notices: Vec::new(),
                    view: HostView::Editor(view),
                }
            }
            Err(err) => self.failed(user, MenuLevel::QuestDetail { quest: doc.clone() }, err),
        }
    }

    /// Replace the edited document with the submitted pages.
    pub fn submit_editor<S: AsRef<str>>(&mut self, user: &str, pages: &[S]) -> Response {
        let Some(doc) = self.sessions.get_mut(user).and_then(|s| s.editing.take()) else {
            return Response::unchanged();
        };
        let text = join_pages(pages);
        let level = MenuLevel::QuestDetail { quest: doc.clone() };
        match self.store.write_text(&doc, &text) {
            Ok(()) => {
                audit_log!("quest.edit key={} bytes={} by={}", doc, text.len(), user);
                let notice = Notice::success(format!("Saved {}.", doc.file_name()));
                self.show(user, level, vec![notice])
            }
            Err(err) => self.failed(user, level, err),
        }
    }

    /// Tear down the session of a departing operator.
    pub fn disconnect(&mut self, user: &str) {
        if self.sessions.end(user).is_some() {
            debug!("Session for {} ended", user);
        }
    }
}
