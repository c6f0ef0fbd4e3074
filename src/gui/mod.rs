//! # Quest Menu GUI
//!
//! Session-scoped navigation and editing state machine for quest documents.
//!
//! ## Components
//!
//! - [`session`] - per-operator state: open level, selections, page cursors, slot map, pending input
//! - [`menu`] - view construction, slot layout and pagination math
//! - [`input`] - deferred free-text workflow (create, rename, duplicate, task fields)
//! - [`editor`] - paged long-text editor snapshots
//! - [`controller`] - [`QuestGui`], the interface hosts call
//! - [`server`] - event loop that serializes every host event onto one sequence
//! - [`console`] - terminal host used by the binary
//!
//! ## Menu tree
//!
//! ```text
//! GuildList ─▶ QuestList(guild) ─▶ QuestDetail(doc) ─▶ TaskList(doc) ─▶ TaskActionDetail(doc, task)
//!                                       │
//!                                       └─▶ DeleteConfirm(doc)   (modal)
//! ```

pub mod console;
pub mod controller;
pub mod editor;
pub mod input;
pub mod menu;
pub mod server;
pub mod session;

pub use controller::{HostView, Notice, NoticeLevel, QuestGui, Response, TextResponse};
pub use input::InputOutcome;
pub use server::{ChatRelay, HostEvent, HostSink, QuestServer};
