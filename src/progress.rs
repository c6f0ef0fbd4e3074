//! Consumption bridge to an external quest-progress engine.
//!
//! When an operator drinks a potion, the variant key (`strength`,
//! `strong_strength`, `long_strength`, ...) advances every `CONSUME`
//! objective by one. The engine is optional: without a sink, or when the sink
//! fails, reports are dropped and the editor is unaffected.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

/// Objective type advanced by consumption.
pub const CONSUME_OBJECTIVE: &str = "CONSUME";

/// Base types that never count as quest potions.
const IGNORED_BASES: [&str; 5] = ["UNCRAFTABLE", "WATER", "MUNDANE", "THICK", "AWKWARD"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Potion,
    SplashPotion,
    LingeringPotion,
    Other,
}

/// An item an operator consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedItem {
    pub kind: ItemKind,
    /// Base type name, e.g. `STRENGTH`
    pub base: String,
    /// Level II
    pub upgraded: bool,
    /// Long duration
    pub extended: bool,
}

impl ConsumedItem {
    pub fn potion(base: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Potion,
            base: base.into(),
            upgraded: false,
            extended: false,
        }
    }

    /// Objective key for this item, or `None` when it does not count.
    pub fn variant_key(&self) -> Option<String> {
        if self.kind != ItemKind::Potion {
            return None;
        }
        let base = self.base.trim();
        if base.is_empty() || IGNORED_BASES.iter().any(|b| b.eq_ignore_ascii_case(base)) {
            return None;
        }
        let base = base.to_lowercase();
        Some(if self.upgraded {
            format!("strong_{base}")
        } else if self.extended {
            format!("long_{base}")
        } else {
            base
        })
    }
}

/// Capability offered by an external quest-progress engine.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, user: &str, objective: &str, key: &str, amount: u32) -> anyhow::Result<()>;
}

/// Sink that only logs, used when progress reporting is enabled without an engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn progress(&self, user: &str, objective: &str, key: &str, amount: u32) -> anyhow::Result<()> {
        log::info!("progress user={} objective={} key={} amount={}", user, objective, key, amount);
        Ok(())
    }
}

/// Best-effort reporter; never fails.
#[derive(Clone, Default)]
pub struct ProgressBridge {
    sink: Option<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for ProgressBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBridge")
            .field("connected", &self.sink.is_some())
            .finish()
    }
}

impl ProgressBridge {
    pub fn disconnected() -> Self {
        Self { sink: None }
    }

    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    /// Report a consumption. Returns the key that was sent, if any.
    pub fn report(&self, user: &str, item: &ConsumedItem) -> Option<String> {
        let key = item.variant_key()?;
        let Some(sink) = &self.sink else {
            debug!("No progress engine; dropping {} for {}", key, user);
            return None;
        };
        match sink.progress(user, CONSUME_OBJECTIVE, &key, 1) {
            Ok(()) => Some(key),
            Err(e) => {
                debug!("Progress engine rejected {} for {}: {}", key, user, e);
                None
            }
        }
    }
}
