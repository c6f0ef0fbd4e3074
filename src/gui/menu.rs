//! Menu view construction: slot layout, pagination and item descriptions.
//!
//! [`MenuNavigator::build`] is the only place that decides which slot shows
//! what. It always fetches fresh data from the store, clamps the page cursor,
//! and installs the resulting slot map into the session in one step.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::errors::QuestResult;
use crate::gui::session::{MenuAction, MenuLevel, Session, SlotTarget};
use crate::storage::{Difficulty, DocumentKey, DocumentStore, GuildKey, QuestDocument, TaskSummary};

/// Items per page in guild, quest and task lists.
pub const PAGE_SIZE: usize = 45;
/// Slot count of list menus.
pub const LIST_MENU_SIZE: usize = 54;
/// Slot count of detail menus.
pub const DETAIL_MENU_SIZE: usize = 27;

/// Reserved control slots.
pub mod slots {
    pub const CREATE: usize = 45;
    pub const ADD_TASK: usize = 45;
    pub const RELOAD: usize = 46;
    pub const QUEST_LIST_BACK: usize = 48;
    pub const TASK_LIST_BACK: usize = 49;
    pub const PREVIOUS: usize = 52;
    pub const NEXT: usize = 53;

    pub const INFO: usize = 4;
    pub const DUPLICATE: usize = 10;
    pub const EDIT_TEXT: usize = 11;
    pub const TASKS: usize = 12;
    pub const RENAME: usize = 13;
    pub const DELETE: usize = 15;
    pub const DETAIL_BACK: usize = 22;

    pub const CONFIRM_DELETE: usize = 11;
    pub const CANCEL_DELETE: usize = 15;

    pub const CYCLE_DIFFICULTY: usize = 10;
    pub const SET_ACTION: usize = 12;
    pub const SET_AMOUNT: usize = 14;
}

/// Icon hint for the host's renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemIcon {
    Guild,
    NoGuild,
    Quest,
    Task,
    Create,
    Reload,
    Back,
    Previous,
    Next,
    Placeholder,
    Duplicate,
    Edit,
    Tasks,
    Rename,
    Delete,
    Confirm,
    Cancel,
    Difficulty(DifficultyIcon),
    Action,
    Amount,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DifficultyIcon {
    Easy,
    Medium,
    Hard,
}

impl From<Difficulty> for DifficultyIcon {
    fn from(d: Difficulty) -> Self {
        match d {
            Difficulty::Easy => DifficultyIcon::Easy,
            Difficulty::Medium => DifficultyIcon::Medium,
            Difficulty::Hard => DifficultyIcon::Hard,
        }
    }
}

/// One rendered slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub icon: ItemIcon,
    pub label: String,
    pub lore: Vec<String>,
    /// `false` for greyed-out placeholders
    pub enabled: bool,
}

impl MenuItem {
    fn new(icon: ItemIcon, label: impl Into<String>) -> Self {
        Self {
            icon,
            label: label.into(),
            lore: Vec::new(),
            enabled: true,
        }
    }

    fn lore(mut self, line: impl Into<String>) -> Self {
        self.lore.push(line.into());
        self
    }

    fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Result of clamping a page request against an item count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: usize,
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
}

impl PageWindow {
    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }
}

/// Clamp `requested` into `[0, max(1, ceil(count / page_size)) - 1]`.
pub fn paginate(count: usize, requested: i64, page_size: usize) -> PageWindow {
    let page_size = page_size.max(1);
    let total_pages = count.div_ceil(page_size).max(1);
    let last = (total_pages - 1) as i64;
    let page = requested.clamp(0, last) as usize;
    let start = (page * page_size).min(count);
    let end = (start + page_size).min(count);
    PageWindow {
        page,
        total_pages,
        start,
        end,
    }
}

/// Everything the host needs to draw one menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewDescription {
    pub level: MenuLevel,
    pub title: String,
    pub size: usize,
    pub items: BTreeMap<usize, MenuItem>,
    pub page: Option<PageWindow>,
}

impl ViewDescription {
    pub fn item(&self, slot: usize) -> Option<&MenuItem> {
        self.items.get(&slot)
    }
}

/// Collects items and the slot map of one view.
struct Layout {
    items: BTreeMap<usize, MenuItem>,
    targets: HashMap<usize, SlotTarget>,
}

impl Layout {
    fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            targets: HashMap::new(),
        }
    }

    fn entity(&mut self, slot: usize, item: MenuItem, target: SlotTarget) {
        self.items.insert(slot, item);
        self.targets.insert(slot, target);
    }

    fn control(&mut self, slot: usize, item: MenuItem, action: MenuAction) {
        self.entity(slot, item, SlotTarget::Action(action));
    }

    /// Shown but not clickable.
    fn decoration(&mut self, slot: usize, item: MenuItem) {
        self.items.insert(slot, item);
    }

    fn paging(&mut self, window: &PageWindow) {
        if window.has_previous() {
            self.control(
                slots::PREVIOUS,
                MenuItem::new(ItemIcon::Previous, "Previous page")
                    .lore(format!("Page {}/{}", window.page, window.total_pages)),
                MenuAction::PreviousPage,
            );
        } else {
            self.decoration(slots::PREVIOUS, MenuItem::new(ItemIcon::Placeholder, "Previous page").disabled());
        }
        if window.has_next() {
            self.control(
                slots::NEXT,
                MenuItem::new(ItemIcon::Next, "Next page")
                    .lore(format!("Page {}/{}", window.page + 2, window.total_pages)),
                MenuAction::NextPage,
            );
        } else {
            self.decoration(slots::NEXT, MenuItem::new(ItemIcon::Placeholder, "Next page").disabled());
        }
    }

    fn finish(
        self,
        level: &MenuLevel,
        title: String,
        size: usize,
        page: Option<PageWindow>,
        session: &mut Session,
    ) -> ViewDescription {
        session.replace_slot_map(self.targets);
        session.enter(level);
        ViewDescription {
            level: level.clone(),
            title,
            size,
            items: self.items,
            page,
        }
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Coarse age such as `42s ago`, `5m ago`, `3h ago`, `2d ago`.
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{s}s ago"),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn quest_item(doc: &QuestDocument, now: DateTime<Utc>) -> MenuItem {
    let modified = match doc.modified {
        Some(ts) => format!("Modified: {} ({})", ts.format("%Y-%m-%d %H:%M UTC"), format_age(ts, now)),
        None => "Modified: unknown".to_string(),
    };
    MenuItem::new(ItemIcon::Quest, doc.display_name())
        .lore(format!("Size: {}", format_size(doc.size)))
        .lore(modified)
        .lore("Click to manage")
}

fn task_item(task: &TaskSummary) -> MenuItem {
    let amount = task.amount.map(|a| a.to_string()).unwrap_or_else(|| "-".into());
    let types = if task.types.is_empty() {
        "-".to_string()
    } else {
        task.types.join(", ")
    };
    MenuItem::new(ItemIcon::Task, task.key.clone())
        .lore(format!("Type: {}", task.task.as_deref().unwrap_or("-")))
        .lore(format!("Amount: {amount}"))
        .lore(format!("Types: {types}"))
        .lore(format!("Difficulty: {}", task.difficulty))
        .lore(format!("Action: {}", task.action.as_deref().unwrap_or("(none)")))
}

/// Builds [`ViewDescription`]s for every menu level.
pub struct MenuNavigator<'a> {
    store: &'a DocumentStore,
}

impl<'a> MenuNavigator<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Render `level` for `session`, replacing its slot map and open level.
    pub fn build(&self, level: &MenuLevel, session: &mut Session, now: DateTime<Utc>) -> QuestResult<ViewDescription> {
        debug!("Building {:?} for {}", level, session.user);
        match level {
            MenuLevel::GuildList => Ok(self.guild_list(level, session)),
            MenuLevel::QuestList { guild } => Ok(self.quest_list(level, guild, session, now)),
            MenuLevel::QuestDetail { quest } => self.quest_detail(level, quest, session, now),
            MenuLevel::DeleteConfirm { quest } => self.delete_confirm(level, quest, session),
            MenuLevel::TaskList { quest } => self.task_list(level, quest, session),
            MenuLevel::TaskActionDetail { quest, task } => self.task_detail(level, quest, task, session),
        }
    }

    fn guild_list(&self, level: &MenuLevel, session: &mut Session) -> ViewDescription {
        let groups = self.store.group_by_guild();
        let window = paginate(groups.len(), session.guild_page as i64, PAGE_SIZE);
        session.guild_page = window.page;

        let mut layout = Layout::new();
        for (slot, group) in groups[window.start..window.end].iter().enumerate() {
            let icon = match group.guild {
                GuildKey::NoGuild => ItemIcon::NoGuild,
                GuildKey::Named(_) => ItemIcon::Guild,
            };
            let item = MenuItem::new(icon, group.guild.display_name())
                .lore(plural(group.documents.len(), "quest"))
                .lore("Click to browse");
            layout.entity(slot, item, SlotTarget::Guild(group.guild.clone()));
        }
        layout.control(slots::RELOAD, MenuItem::new(ItemIcon::Reload, "Reload"), MenuAction::Reload);
        layout.paging(&window);
        layout.finish(level, "Quest guilds".into(), LIST_MENU_SIZE, Some(window), session)
    }

    fn quest_list(
        &self,
        level: &MenuLevel,
        guild: &GuildKey,
        session: &mut Session,
        now: DateTime<Utc>,
    ) -> ViewDescription {
        let docs = self.store.list(Some(guild));
        let window = paginate(docs.len(), session.quest_page as i64, PAGE_SIZE);
        session.quest_page = window.page;

        let mut layout = Layout::new();
        for (slot, doc) in docs[window.start..window.end].iter().enumerate() {
            layout.entity(slot, quest_item(doc, now), SlotTarget::Quest(doc.key.clone()));
        }
        layout.control(
            slots::CREATE,
            MenuItem::new(ItemIcon::Create, "New quest").lore(format!("Create a quest in {guild}")),
            MenuAction::CreateQuest,
        );
        layout.control(slots::RELOAD, MenuItem::new(ItemIcon::Reload, "Reload"), MenuAction::Reload);
        layout.control(
            slots::QUEST_LIST_BACK,
            MenuItem::new(ItemIcon::Back, "Back").lore("Return to guilds"),
            MenuAction::Back,
        );
        layout.paging(&window);
        layout.finish(level, format!("Quests - {guild}"), LIST_MENU_SIZE, Some(window), session)
    }

    fn quest_detail(
        &self,
        level: &MenuLevel,
        quest: &DocumentKey,
        session: &mut Session,
        now: DateTime<Utc>,
    ) -> QuestResult<ViewDescription> {
        let doc = self.store.document(quest)?;
        let mut layout = Layout::new();
        let mut info = MenuItem::new(ItemIcon::Info, doc.display_name())
            .lore(format!("Guild: {}", doc.guild))
            .lore(format!("Path: {}", doc.key));
        info.lore.extend(quest_item(&doc, now).lore.into_iter().take(2));
        layout.decoration(slots::INFO, info);

        layout.control(
            slots::DUPLICATE,
            MenuItem::new(ItemIcon::Duplicate, "Duplicate").lore("Copy under a new name"),
            MenuAction::Duplicate,
        );
        layout.control(
            slots::EDIT_TEXT,
            MenuItem::new(ItemIcon::Edit, "Edit text").lore("Open the full document"),
            MenuAction::EditText,
        );
        layout.control(
            slots::TASKS,
            MenuItem::new(ItemIcon::Tasks, "Tasks").lore("Browse and edit tasks"),
            MenuAction::OpenTasks,
        );
        layout.control(slots::RENAME, MenuItem::new(ItemIcon::Rename, "Rename"), MenuAction::Rename);
        layout.control(
            slots::DELETE,
            MenuItem::new(ItemIcon::Delete, "Delete").lore("Asks for confirmation"),
            MenuAction::Delete,
        );
        layout.control(
            slots::DETAIL_BACK,
            MenuItem::new(ItemIcon::Back, "Back").lore(format!("Return to {}", doc.guild)),
            MenuAction::Back,
        );
        Ok(layout.finish(
            level,
            format!("Quest - {}", doc.display_name()),
            DETAIL_MENU_SIZE,
            None,
            session,
        ))
    }

    fn delete_confirm(
        &self,
        level: &MenuLevel,
        quest: &DocumentKey,
        session: &mut Session,
    ) -> QuestResult<ViewDescription> {
        let doc = self.store.document(quest)?;
        let mut layout = Layout::new();
        layout.control(
            slots::CONFIRM_DELETE,
            MenuItem::new(ItemIcon::Confirm, "Delete").lore(format!("Permanently delete {}", doc.key)),
            MenuAction::ConfirmDelete,
        );
        layout.control(
            slots::CANCEL_DELETE,
            MenuItem::new(ItemIcon::Cancel, "Cancel").lore("Keep the quest"),
            MenuAction::CancelDelete,
        );
        Ok(layout.finish(
            level,
            format!("Delete {}?", doc.display_name()),
            DETAIL_MENU_SIZE,
            None,
            session,
        ))
    }

    fn task_list(&self, level: &MenuLevel, quest: &DocumentKey, session: &mut Session) -> QuestResult<ViewDescription> {
        let tasks = self.store.tasks().task_summaries(quest)?;
        let window = paginate(tasks.len(), session.task_page as i64, PAGE_SIZE);
        session.task_page = window.page;

        let mut layout = Layout::new();
        for (slot, task) in tasks[window.start..window.end].iter().enumerate() {
            layout.entity(slot, task_item(task), SlotTarget::Task(task.key.clone()));
        }
        layout.control(
            slots::ADD_TASK,
            MenuItem::new(ItemIcon::Create, "Add task").lore("Adds a CONSUME task"),
            MenuAction::AddTask,
        );
        layout.control(slots::RELOAD, MenuItem::new(ItemIcon::Reload, "Reload"), MenuAction::Reload);
        layout.control(
            slots::TASK_LIST_BACK,
            MenuItem::new(ItemIcon::Back, "Back").lore(format!("Return to {}", quest.file_name())),
            MenuAction::Back,
        );
        layout.paging(&window);
        Ok(layout.finish(
            level,
            format!("Tasks - {}", quest.file_name()),
            LIST_MENU_SIZE,
            Some(window),
            session,
        ))
    }

    fn task_detail(
        &self,
        level: &MenuLevel,
        quest: &DocumentKey,
        task: &str,
        session: &mut Session,
    ) -> QuestResult<ViewDescription> {
        let summary = self.store.tasks().task_summary(quest, task)?;
        let mut layout = Layout::new();
        layout.decoration(slots::INFO, task_item(&summary));
        layout.control(
            slots::CYCLE_DIFFICULTY,
            MenuItem::new(
                ItemIcon::Difficulty(summary.difficulty.into()),
                format!("Difficulty: {}", summary.difficulty),
            )
            .lore(format!("Click for {}", summary.difficulty.next())),
            MenuAction::CycleDifficulty,
        );
        layout.control(
            slots::SET_ACTION,
            MenuItem::new(ItemIcon::Action, "Set action")
                .lore(format!("Current: {}", summary.action.as_deref().unwrap_or("(none)"))),
            MenuAction::SetAction,
        );
        layout.control(
            slots::SET_AMOUNT,
            MenuItem::new(ItemIcon::Amount, "Set amount").lore(format!(
                "Current: {}",
                summary.amount.map(|a| a.to_string()).unwrap_or_else(|| "-".into())
            )),
            MenuAction::SetAmount,
        );
        layout.control(
            slots::DETAIL_BACK,
            MenuItem::new(ItemIcon::Back, "Back").lore("Return to tasks"),
            MenuAction::Back,
        );
        Ok(layout.finish(level, format!("Task - {task}"), DETAIL_MENU_SIZE, None, session))
    }
}
