//! Deferred free-text capture.
//!
//! A click that needs a name or a value calls [`InputWorkflow::begin`]; the
//! operator's next chat line is routed to [`InputWorkflow::submit`], which
//! validates it against the pending kind and applies it to the store.
//!
//! ```text
//!   Idle ──begin──▶ AwaitingText(kind) ──submit ok──▶ Idle
//!                        ▲      │
//!                        └──────┘ Conflict / InvalidInput (re-prompt)
//! ```

use log::{debug, info, warn};

use crate::errors::{ErrorKind, QuestError};
use crate::gui::controller::Notice;
use crate::gui::session::{InputKind, MenuLevel, PendingInput, Session};
use crate::logutil::escape_log;
use crate::storage::{DocumentKey, DocumentStore, GuildKey};
use crate::validation::is_cancel;

/// What became of a free-text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// No request was pending; the text is ordinary chat.
    NotPending,
    Cancelled,
    /// Rejected; the same request is pending again.
    Retry,
    Applied,
    /// Aborted by a store failure or a vanished target.
    Failed,
}

/// Where the host should go after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Menu(MenuLevel),
    Editor(DocumentKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub outcome: InputOutcome,
    pub notices: Vec<Notice>,
    pub destination: Option<Destination>,
}

impl Submission {
    fn new(outcome: InputOutcome) -> Self {
        Self {
            outcome,
            notices: Vec::new(),
            destination: None,
        }
    }

    fn notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    fn to(mut self, destination: Destination) -> Self {
        self.destination = Some(destination);
        self
    }
}

pub struct InputWorkflow<'a> {
    store: &'a DocumentStore,
}

impl<'a> InputWorkflow<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Start waiting for text. The menu is considered closed from here on.
    pub fn begin(
        session: &mut Session,
        kind: InputKind,
        target_document: Option<DocumentKey>,
        target_task: Option<String>,
    ) -> Notice {
        session.open_level = None;
        session.clear_slot_map();
        session.begin_input(PendingInput {
            kind,
            target_document,
            target_task,
        });
        debug!("Session {} awaiting {:?} text", session.user, kind);
        Notice::info(kind.prompt())
    }

    /// Complete the pending request with `text`.
    pub fn submit(&self, session: &mut Session, text: &str) -> Submission {
        let Some(pending) = session.take_input() else {
            return Submission::new(InputOutcome::NotPending);
        };
        if is_cancel(text) {
            debug!("Session {} cancelled {:?}", session.user, pending.kind);
            return Submission::new(InputOutcome::Cancelled).notice(Notice::warning("Action cancelled."));
        }

        let text = text.trim();
        match self.apply(session, &pending, text) {
            Ok(submission) => {
                info!(
                    "{} completed {:?} with '{}'",
                    session.user,
                    pending.kind,
                    escape_log(text)
                );
                submission
            }
            Err(err) => self.recover(session, pending, err),
        }
    }

    fn apply(&self, session: &Session, pending: &PendingInput, text: &str) -> Result<Submission, QuestError> {
        match pending.kind {
            InputKind::Create => {
                let guild = session.selected_guild.clone().unwrap_or(GuildKey::NoGuild);
                let doc = self.store.create(&guild, text)?;
                Ok(Submission::new(InputOutcome::Applied)
                    .notice(Notice::success(format!("Quest created: {}", doc.display_name())))
                    .to(Destination::Editor(doc.key)))
            }
            InputKind::Rename => {
                let target = Self::document(pending)?;
                let doc = self.store.rename(target, text)?;
                Ok(Submission::new(InputOutcome::Applied)
                    .notice(Notice::success(format!("Quest renamed to: {}", doc.display_name())))
                    .to(Destination::Menu(MenuLevel::QuestDetail { quest: doc.key })))
            }
            InputKind::Duplicate => {
                let target = Self::document(pending)?;
                let doc = self.store.duplicate(target, text)?;
                Ok(Submission::new(InputOutcome::Applied)
                    .notice(Notice::success(format!("Quest duplicated: {}", doc.display_name())))
                    .to(Destination::Menu(MenuLevel::QuestDetail { quest: doc.key })))
            }
            InputKind::SetTaskAction | InputKind::SetTaskAmount => {
                let quest = Self::document(pending)?;
                let task = pending
                    .target_task
                    .as_deref()
                    .ok_or_else(|| QuestError::NotFound("no task selected".into()))?;
                let message = if pending.kind == InputKind::SetTaskAction {
                    self.store.tasks().set_action(quest, task, text)?;
                    format!("Task {task} action updated.")
                } else {
                    self.store.tasks().set_amount(quest, task, text)?;
                    format!("Task {task} amount set to {text}.")
                };
                Ok(Submission::new(InputOutcome::Applied)
                    .notice(Notice::success(message))
                    .to(Destination::Menu(MenuLevel::TaskActionDetail {
                        quest: quest.clone(),
                        task: task.to_string(),
                    })))
            }
        }
    }

    fn document(pending: &PendingInput) -> Result<&DocumentKey, QuestError> {
        pending
            .target_document
            .as_ref()
            .ok_or_else(|| QuestError::NotFound("no quest selected".into()))
    }

    fn recover(&self, session: &mut Session, pending: PendingInput, err: QuestError) -> Submission {
        match err.kind() {
            ErrorKind::Conflict | ErrorKind::InvalidInput => {
                let first = match &err {
                    QuestError::Conflict { .. } => "That quest file already exists.".to_string(),
                    other => other.to_string(),
                };
                let kind = pending.kind;
                session.begin_input(pending);
                Submission::new(InputOutcome::Retry)
                    .notice(Notice::error(first))
                    .notice(Notice::warning(kind.retry_prompt()))
            }
            ErrorKind::NotFound => {
                warn!("{} {:?} target vanished: {}", session.user, pending.kind, err);
                let fallback = match (&pending.target_document, &pending.target_task) {
                    (Some(quest), Some(_)) => MenuLevel::TaskList { quest: quest.clone() },
                    (Some(quest), None) => MenuLevel::QuestList { guild: quest.guild() },
                    (None, _) => MenuLevel::GuildList,
                };
                Submission::new(InputOutcome::Failed)
                    .notice(Notice::warning(format!("{err}; it may have been removed.")))
                    .to(Destination::Menu(fallback))
            }
            ErrorKind::Store => {
                warn!("{} {:?} failed: {}", session.user, pending.kind, err);
                Submission::new(InputOutcome::Failed)
                    .notice(Notice::error(format!("Failed to update quest file: {err}")))
            }
        }
    }
}
