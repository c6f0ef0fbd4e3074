//! # Quest Editor Event Loop
//!
//! [`QuestServer`] owns the [`QuestGui`] and is the single sequence that
//! touches sessions and documents. Hosts feed it [`HostEvent`]s through an
//! unbounded channel; events are handled strictly in arrival order.
//!
//! Free text typed on another task or thread must go through a [`ChatRelay`].
//! The pending-input record is only ever read inside the loop, so a click and
//! a chat line racing each other are resolved by whichever event reaches the
//! channel first.
//!
//! ```rust,no_run
//! use questdesk::gui::server::{HostEvent, QuestServer};
//! # use questdesk::gui::server::HostSink;
//! # fn demo<H: HostSink>(server: QuestServer<H>) {
//! let relay = server.relay();
//! let events = server.sender();
//! std::thread::spawn(move || {
//!     let _ = events.send(HostEvent::Open { user: "alex".into() });
//!     relay.say("alex", "cancel");
//! });
//! # }
//! ```

use anyhow::Result;
use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::gui::controller::{QuestGui, Response};
use crate::gui::input::InputOutcome;
use crate::gui::menu::MenuItem;
use crate::gui::session::MenuLevel;
use crate::logutil::escape_log;
use crate::progress::{ConsumedItem, ProgressBridge};

/// Everything a host can report about an operator.
#[derive(Debug, Clone)]
pub enum HostEvent {
    Open { user: String },
    Click { user: String, slot: usize },
    Text { user: String, text: String },
    ViewClosed { user: String, level: MenuLevel },
    EditorSubmit { user: String, pages: Vec<String> },
    Consume { user: String, item: ConsumedItem },
    Disconnect { user: String },
}

pub type EventSender = mpsc::UnboundedSender<HostEvent>;

/// Presentation side of a host.
pub trait HostSink {
    /// Show notices and the next view to `user`.
    fn deliver(&mut self, user: &str, response: Response);

    /// Pass through a chat line that was not meant for the editor.
    fn relay_chat(&mut self, user: &str, text: &str);

    /// The item currently drawn at `slot` in `user`'s open menu.
    fn item_at(&self, user: &str, slot: usize) -> Option<MenuItem>;
}

/// Cloneable handle that marshals chat lines onto the event loop.
#[derive(Debug, Clone)]
pub struct ChatRelay {
    tx: EventSender,
}

impl ChatRelay {
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }

    /// Queue `text` from `user`. Returns `false` once the loop has stopped.
    pub fn say(&self, user: &str, text: &str) -> bool {
        self.tx
            .send(HostEvent::Text {
                user: user.to_string(),
                text: text.to_string(),
            })
            .is_ok()
    }
}

pub struct QuestServer<H: HostSink> {
    gui: QuestGui,
    host: H,
    progress: ProgressBridge,
    event_tx: Option<EventSender>,
    event_rx: mpsc::UnboundedReceiver<HostEvent>,
}

impl<H: HostSink> QuestServer<H> {
    pub fn new(gui: QuestGui, host: H, progress: ProgressBridge) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            gui,
            host,
            progress,
            event_tx: Some(tx),
            event_rx: rx,
        }
    }

    /// Event sender for the host. Take every handle you need before [`run`](Self::run).
    pub fn sender(&self) -> EventSender {
        match &self.event_tx {
            Some(tx) => tx.clone(),
            None => {
                // Loop already running: hand out a closed sender.
                let (tx, _) = mpsc::unbounded_channel();
                tx
            }
        }
    }

    pub fn relay(&self) -> ChatRelay {
        ChatRelay::new(self.sender())
    }

    pub fn gui(&self) -> &QuestGui {
        &self.gui
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Handle one event to completion.
    pub fn dispatch(&mut self, event: HostEvent) {
        match event {
            HostEvent::Open { user } => {
                let response = self.gui.open_menu(&user);
                self.host.deliver(&user, response);
            }
            HostEvent::Click { user, slot } => {
                let item = self.host.item_at(&user, slot);
                let response = self.gui.handle_click(&user, slot, item.as_ref());
                self.host.deliver(&user, response);
            }
            HostEvent::Text { user, text } => {
                let result = self.gui.handle_text_input(&user, &text);
                if result.outcome == InputOutcome::NotPending {
                    self.host.relay_chat(&user, &text);
                } else {
                    debug!("{} text '{}' -> {:?}", user, escape_log(&text), result.outcome);
                    self.host.deliver(&user, result.response);
                }
            }
            HostEvent::ViewClosed { user, level } => self.gui.handle_view_closed(&user, &level),
            HostEvent::EditorSubmit { user, pages } => {
                let response = self.gui.submit_editor(&user, &pages);
                self.host.deliver(&user, response);
            }
            HostEvent::Consume { user, item } => {
                if let Some(key) = self.progress.report(&user, &item) {
                    debug!("{} progressed {}", user, key);
                }
            }
            HostEvent::Disconnect { user } => self.gui.disconnect(&user),
        }
    }

    /// Process events until every sender is dropped or Ctrl-C arrives.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Quest editor serving {} (progress engine: {})",
            self.gui.store().root().display(),
            if self.progress.is_connected() { "connected" } else { "none" }
        );
        // Only external handles keep the loop alive from here on.
        self.event_tx = None;

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.dispatch(event),
                        None => {
                            debug!("Event channel closed");
                            break;
                        }
                    }
                }

                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        warn!("Unable to listen for shutdown signal: {}", e);
                    }
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        info!("Quest editor stopped ({} active sessions)", self.gui.sessions().len());
        Ok(())
    }
}
