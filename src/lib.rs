//! # Questdesk - Menu-Driven Quest Document Editor
//!
//! Questdesk lets an operator browse, create, rename, duplicate, delete and
//! edit YAML quest definition documents through a slot-based menu, without
//! leaving the interactive session that opened it.
//!
//! ## Features
//!
//! - **Guild grouping**: documents are grouped by their directory under the quest root.
//! - **Paged menus**: 45 entries per page with fixed control slots.
//! - **Deferred text input**: name and value prompts answered through ordinary chat, with cancel and re-prompt.
//! - **Task editing**: difficulty cycling, action and amount fields, task creation with unique keys.
//! - **Atomic writes**: locked temp-file-and-rename persistence.
//! - **Consumption bridge**: optional, best-effort progress reports to an external quest engine.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use questdesk::gui::controller::{GuiSettings, QuestGui};
//! use questdesk::storage::DocumentStore;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = DocumentStore::open("./quests")?;
//!     let mut gui = QuestGui::new(store, GuiSettings::default());
//!     let response = gui.open_menu("alex");
//!     if let Some(menu) = response.menu() {
//!         println!("{}", menu.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`storage`] - document store, file backend and task editor
//! - [`gui`] - sessions, menus, input workflow, editor, controller and event loop
//! - [`progress`] - consumption bridge
//! - [`config`] - configuration management and validation
//! - [`validation`] - file name sanitization and input grammar
//! - [`errors`] - error taxonomy
//! - [`logutil`] - log escaping and the audit macro
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  QuestServer    │ ← event loop, one sequence for all state
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  QuestGui       │ ← sessions, menus, text input, editor
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  DocumentStore  │ ← quest files and task edits
//! └─────────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod gui;
pub mod logutil;
pub mod progress;
pub mod storage;
pub mod validation;
