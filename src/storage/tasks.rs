//! Structured edits of the `tasks` section of a quest document.
//!
//! Documents are handled as generic YAML trees so fields this editor does not
//! know about survive every write. Each call re-reads the document; the last
//! writer wins.

use std::fmt;

use log::debug;
use serde_yaml::{Mapping, Value};

use super::{DocumentKey, DocumentStore};
use crate::audit_log;
use crate::errors::{QuestError, QuestResult};
use crate::logutil::escape_log;
use crate::validation::{parse_amount, validate_action};

/// Task type written into new tasks.
pub const DEFAULT_TASK_TYPE: &str = "CONSUME";
/// Consumable type written into new tasks.
pub const DEFAULT_TASK_TYPES: [&str; 1] = ["strength"];
const TASK_KEY_PREFIX: &str = "task_";

/// Difficulty tier of a task. Cycles EASY → MEDIUM → HARD → EASY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn next(self) -> Difficulty {
        let idx = Self::ALL.iter().position(|d| *d == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Lenient parse: `None` for anything that is not a known tier name.
    pub fn parse(raw: &str) -> Option<Difficulty> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    /// Name stored in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Display-oriented view of one task entry. Missing fields stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub key: String,
    pub task: Option<String>,
    pub amount: Option<i64>,
    pub types: Vec<String>,
    pub difficulty: Difficulty,
    pub action: Option<String>,
}

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn difficulty_of(task: &Value) -> Difficulty {
    task.get("difficulty")
        .and_then(Value::as_str)
        .and_then(Difficulty::parse)
        .unwrap_or_default()
}

fn summarize(task_key: &str, task: &Value) -> TaskSummary {
    let args = task.get("args");
    TaskSummary {
        key: task_key.to_string(),
        task: task.get("task").and_then(Value::as_str).map(str::to_string),
        amount: args.and_then(|a| a.get("amount")).and_then(Value::as_i64),
        types: args
            .and_then(|a| a.get("types"))
            .and_then(Value::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
        difficulty: difficulty_of(task),
        action: task.get("action").and_then(Value::as_str).map(str::to_string),
    }
}

fn sort_keys(keys: &mut [String]) {
    keys.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
}

/// Mutations and lookups of task definitions inside one document at a time.
pub struct TaskEditor<'a> {
    store: &'a DocumentStore,
}

impl<'a> TaskEditor<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    fn load(&self, doc: &DocumentKey) -> QuestResult<Value> {
        let text = self.store.read_text(doc)?;
        let value: Value = serde_yaml::from_str(&text).map_err(|source| QuestError::Malformed {
            key: doc.to_string(),
            source,
        })?;
        Ok(match value {
            Value::Null => Value::Mapping(Mapping::new()),
            other => other,
        })
    }

    fn save(&self, doc: &DocumentKey, value: &Value) -> QuestResult<()> {
        let text = serde_yaml::to_string(value).map_err(|source| QuestError::Malformed {
            key: doc.to_string(),
            source,
        })?;
        self.store.write_text(doc, &text)
    }

    fn root_mut<'v>(doc: &DocumentKey, value: &'v mut Value) -> QuestResult<&'v mut Mapping> {
        value
            .as_mapping_mut()
            .ok_or_else(|| QuestError::Layout {
                key: doc.to_string(),
                reason: "top level is not a mapping".into(),
            })
    }

    fn tasks_mut<'v>(doc: &DocumentKey, value: &'v mut Value) -> QuestResult<&'v mut Mapping> {
        let root = Self::root_mut(doc, value)?;
        let entry = root
            .entry(key("tasks"))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if entry.is_null() {
            *entry = Value::Mapping(Mapping::new());
        }
        entry
            .as_mapping_mut()
            .ok_or_else(|| QuestError::Layout {
                key: doc.to_string(),
                reason: "tasks section is not a mapping".into(),
            })
    }

    fn task_mut<'v>(doc: &DocumentKey, value: &'v mut Value, task_key: &str) -> QuestResult<&'v mut Mapping> {
        let tasks = Self::tasks_mut(doc, value)?;
        let entry = tasks
            .get_mut(task_key)
            .ok_or_else(|| QuestError::NotFound(format!("task {task_key} in {doc}")))?;
        // `task_1:` with nothing under it
        if entry.is_null() {
            *entry = Value::Mapping(Mapping::new());
        }
        entry.as_mapping_mut().ok_or_else(|| QuestError::Layout {
            key: doc.to_string(),
            reason: format!("task {task_key} is not a mapping"),
        })
    }

    /// Read-modify-write of a single task entry.
    fn update_task<F>(&self, doc: &DocumentKey, task_key: &str, apply: F) -> QuestResult<()>
    where
        F: FnOnce(&mut Mapping),
    {
        let mut value = self.load(doc)?;
        apply(Self::task_mut(doc, &mut value, task_key)?);
        self.save(doc, &value)
    }

    fn tasks_of(value: &Value) -> Option<&Mapping> {
        value.get("tasks").and_then(Value::as_mapping)
    }

    /// Task keys in case-insensitive order. A document without tasks yields none.
    pub fn list_task_keys(&self, doc: &DocumentKey) -> QuestResult<Vec<String>> {
        let value = self.load(doc)?;
        let mut keys: Vec<String> = Self::tasks_of(&value)
            .map(|tasks| tasks.keys().filter_map(|k| k.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        sort_keys(&mut keys);
        Ok(keys)
    }

    /// Summaries for every task, in the same order as [`list_task_keys`](Self::list_task_keys).
    pub fn task_summaries(&self, doc: &DocumentKey) -> QuestResult<Vec<TaskSummary>> {
        let value = self.load(doc)?;
        let mut out: Vec<TaskSummary> = Self::tasks_of(&value)
            .map(|tasks| {
                tasks
                    .iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| summarize(k, v)))
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by(|a, b| a.key.to_lowercase().cmp(&b.key.to_lowercase()).then_with(|| a.key.cmp(&b.key)));
        Ok(out)
    }

    pub fn task_summary(&self, doc: &DocumentKey, task_key: &str) -> QuestResult<TaskSummary> {
        let value = self.load(doc)?;
        Self::tasks_of(&value)
            .and_then(|tasks| tasks.get(task_key))
            .map(|task| summarize(task_key, task))
            .ok_or_else(|| QuestError::NotFound(format!("task {task_key} in {doc}")))
    }

    pub fn task_exists(&self, doc: &DocumentKey, task_key: &str) -> QuestResult<bool> {
        let value = self.load(doc)?;
        Ok(Self::tasks_of(&value).is_some_and(|tasks| tasks.contains_key(task_key)))
    }

    /// Current difficulty. Absent or unknown values read as EASY.
    pub fn get_difficulty(&self, doc: &DocumentKey, task_key: &str) -> QuestResult<Difficulty> {
        let value = self.load(doc)?;
        Ok(Self::tasks_of(&value)
            .and_then(|tasks| tasks.get(task_key))
            .map(difficulty_of)
            .unwrap_or_default())
    }

    pub fn set_difficulty(&self, doc: &DocumentKey, task_key: &str, difficulty: Difficulty) -> QuestResult<()> {
        self.update_task(doc, task_key, |task| {
            task.insert(key("difficulty"), key(difficulty.as_str()));
        })?;
        audit_log!("task.difficulty quest={} task={} value={}", doc, task_key, difficulty.as_str());
        Ok(())
    }

    /// Set the free-form action text. Blank text is rejected.
    pub fn set_action(&self, doc: &DocumentKey, task_key: &str, text: &str) -> QuestResult<()> {
        let action = validate_action(text)?;
        self.update_task(doc, task_key, |task| {
            task.insert(key("action"), Value::String(action.clone()));
        })?;
        audit_log!("task.action quest={} task={} value={}", doc, task_key, escape_log(&action));
        Ok(())
    }

    /// Set `args.amount` from operator text. Non-numbers and values below 1 are rejected.
    pub fn set_amount(&self, doc: &DocumentKey, task_key: &str, text: &str) -> QuestResult<()> {
        let amount = parse_amount(text)?;
        self.update_task(doc, task_key, |task| {
            let args = task
                .entry(key("args"))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !args.is_mapping() {
                *args = Value::Mapping(Mapping::new());
            }
            if let Some(args) = args.as_mapping_mut() {
                args.insert(key("amount"), Value::from(amount));
            }
        })?;
        audit_log!("task.amount quest={} task={} value={}", doc, task_key, amount);
        Ok(())
    }

    /// Append a task with default fields under the first free `task_<n>` key.
    pub fn add_task(&self, doc: &DocumentKey) -> QuestResult<String> {
        let mut value = self.load(doc)?;
        let tasks = Self::tasks_mut(doc, &mut value)?;
        let new_key = (1u64..)
            .map(|n| format!("{TASK_KEY_PREFIX}{n}"))
            .find(|candidate| !tasks.contains_key(candidate.as_str()))
            .unwrap_or_else(|| format!("{TASK_KEY_PREFIX}{}", tasks.len() + 1));

        let mut args = Mapping::new();
        args.insert(key("amount"), Value::from(1));
        args.insert(
            key("types"),
            Value::Sequence(DEFAULT_TASK_TYPES.iter().map(|t| key(t)).collect()),
        );
        let mut task = Mapping::new();
        task.insert(key("task"), key(DEFAULT_TASK_TYPE));
        task.insert(key("args"), Value::Mapping(args));
        task.insert(key("difficulty"), key(Difficulty::Easy.as_str()));
        tasks.insert(key(&new_key), Value::Mapping(task));

        self.save(doc, &value)?;
        debug!("Allocated {} in {}", new_key, doc);
        audit_log!("task.add quest={} task={}", doc, new_key);
        Ok(new_key)
    }
}
