//! Line-oriented terminal host used by `questdesk start`.
//!
//! Menus are printed as slot listings; a blocking reader thread turns typed
//! commands into [`HostEvent`]s. Chat lines go through the [`ChatRelay`].
//!
//! ```text
//! open                    open the guild list
//! click <slot>            click a slot of the open menu
//! close                   close the open menu
//! say <text>              send a chat line (answers a pending prompt)
//! sign                    enter editor pages, one per line, end with "."
//! drink <type> [strong|long]
//! user <name>             act as another operator
//! quit
//! ```

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use log::{debug, warn};

use crate::gui::controller::{HostView, NoticeLevel, Response};
use crate::gui::editor::EditorView;
use crate::gui::menu::{MenuItem, ViewDescription};
use crate::gui::server::{ChatRelay, EventSender, HostEvent, HostSink};
use crate::gui::session::MenuLevel;
use crate::progress::{ConsumedItem, ItemKind};

/// Menus currently on screen, shared with the reader thread so `close` can
/// name the level being closed.
pub type OpenMenus = Arc<Mutex<HashMap<String, MenuLevel>>>;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Open,
    Click(usize),
    Close,
    Say(String),
    Sign,
    Drink(ConsumedItem),
    User(String),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Empty;
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    match word.to_ascii_lowercase().as_str() {
        "open" => ConsoleCommand::Open,
        "close" => ConsoleCommand::Close,
        "sign" => ConsoleCommand::Sign,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "click" => match rest.parse::<usize>() {
            Ok(slot) => ConsoleCommand::Click(slot),
            Err(_) => ConsoleCommand::Unknown(line.to_string()),
        },
        "say" if !rest.is_empty() => ConsoleCommand::Say(rest.to_string()),
        "user" if !rest.is_empty() => ConsoleCommand::User(rest.to_string()),
        "drink" if !rest.is_empty() => {
            let mut parts = rest.split_whitespace();
            let base = parts.next().unwrap_or_default().to_ascii_uppercase();
            let modifier = parts.next().map(str::to_ascii_lowercase);
            ConsoleCommand::Drink(ConsumedItem {
                kind: ItemKind::Potion,
                base,
                upgraded: modifier.as_deref() == Some("strong"),
                extended: modifier.as_deref() == Some("long"),
            })
        }
        _ => ConsoleCommand::Unknown(line.to_string()),
    }
}

const HELP: &str = "commands: open | click <slot> | close | say <text> | sign | drink <type> [strong|long] | user <name> | quit";

/// [`HostSink`] that writes to a terminal (or any writer).
pub struct ConsoleHost {
    out: Box<dyn Write + Send>,
    menus: HashMap<String, ViewDescription>,
    open: OpenMenus,
}

impl ConsoleHost {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            menus: HashMap::new(),
            open: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn open_menus(&self) -> OpenMenus {
        self.open.clone()
    }

    fn set_open(&self, user: &str, level: Option<MenuLevel>) {
        let Ok(mut open) = self.open.lock() else {
            warn!("Open menu table poisoned");
            return;
        };
        match level {
            Some(level) => {
                open.insert(user.to_string(), level);
            }
            None => {
                open.remove(user);
            }
        }
    }

    fn write_menu(&mut self, user: &str, view: &ViewDescription) -> io::Result<()> {
        let page = view
            .page
            .map(|p| format!(" (page {}/{})", p.page + 1, p.total_pages))
            .unwrap_or_default();
        writeln!(self.out, "== [{user}] {}{page} ==", view.title)?;
        for (slot, item) in &view.items {
            let marker = if item.enabled { ' ' } else { '-' };
            write!(self.out, "{marker}{slot:>3}  {}", item.label)?;
            if !item.lore.is_empty() {
                write!(self.out, "  | {}", item.lore.join(" | "))?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn write_editor(&mut self, user: &str, editor: &EditorView) -> io::Result<()> {
        writeln!(self.out, "== [{user}] {} ({} pages) ==", editor.title, editor.pages.len())?;
        for (n, page) in editor.pages.iter().enumerate() {
            writeln!(self.out, "--- page {} ---", n + 1)?;
            writeln!(self.out, "{page}")?;
        }
        writeln!(self.out, "(type 'sign', then the new pages one per line, then '.')")
    }

    fn write_response(&mut self, user: &str, response: Response) -> io::Result<()> {
        for notice in &response.notices {
            let tag = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Success => "ok",
                NoticeLevel::Warning => "warn",
                NoticeLevel::Error => "error",
            };
            writeln!(self.out, "[{tag}] {}", notice.text)?;
        }
        match response.view {
            HostView::Unchanged => {}
            HostView::Menu(view) => {
                self.write_menu(user, &view)?;
                self.set_open(user, Some(view.level.clone()));
                self.menus.insert(user.to_string(), view);
            }
            HostView::Editor(editor) => {
                self.menus.remove(user);
                self.set_open(user, None);
                self.write_editor(user, &editor)?;
            }
            HostView::Closed => {
                self.menus.remove(user);
                self.set_open(user, None);
            }
        }
        self.out.flush()
    }
}

impl HostSink for ConsoleHost {
    fn deliver(&mut self, user: &str, response: Response) {
        if let Err(e) = self.write_response(user, response) {
            warn!("Console output failed: {}", e);
        }
    }

    fn relay_chat(&mut self, user: &str, text: &str) {
        if let Err(e) = writeln!(self.out, "<{user}> {text}").and_then(|_| self.out.flush()) {
            warn!("Console output failed: {}", e);
        }
    }

    fn item_at(&self, user: &str, slot: usize) -> Option<MenuItem> {
        self.menus.get(user).and_then(|view| view.item(slot)).cloned()
    }
}

/// Read commands from stdin on a plain thread until `quit` or end of input.
pub fn spawn_stdin_reader(user: String, events: EventSender, relay: ChatRelay, open: OpenMenus) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let stdin = io::stdin();
        read_commands(stdin.lock(), user, events, relay, open);
    })
}

/// Translate lines from `input` into events. Returns when the input ends,
/// `quit` is read, or the event loop has stopped.
pub fn read_commands<R: BufRead>(input: R, mut user: String, events: EventSender, relay: ChatRelay, open: OpenMenus) {
    let mut lines = input.lines();
    while let Some(Ok(line)) = lines.next() {
        let event = match parse_command(&line) {
            ConsoleCommand::Empty => continue,
            ConsoleCommand::Quit => break,
            ConsoleCommand::Help => {
                println!("{HELP}");
                continue;
            }
            ConsoleCommand::Unknown(text) => {
                println!("unknown command: {text} ({HELP})");
                continue;
            }
            ConsoleCommand::User(name) => {
                if name == user {
                    continue;
                }
                debug!("Console now acting as {}", name);
                // The previous identity leaves, taking its session with it.
                HostEvent::Disconnect {
                    user: std::mem::replace(&mut user, name),
                }
            }
            ConsoleCommand::Say(text) => {
                if !relay.say(&user, &text) {
                    break;
                }
                continue;
            }
            ConsoleCommand::Open => HostEvent::Open { user: user.clone() },
            ConsoleCommand::Click(slot) => HostEvent::Click {
                user: user.clone(),
                slot,
            },
            ConsoleCommand::Close => {
                let level = open.lock().ok().and_then(|open| open.get(&user).cloned());
                match level {
                    Some(level) => HostEvent::ViewClosed {
                        user: user.clone(),
                        level,
                    },
                    None => continue,
                }
            }
            ConsoleCommand::Sign => {
                let mut pages = Vec::new();
                for page in lines.by_ref() {
                    let Ok(page) = page else { break };
                    if page.trim() == "." {
                        break;
                    }
                    pages.push(page);
                }
                HostEvent::EditorSubmit {
                    user: user.clone(),
                    pages,
                }
            }
            ConsoleCommand::Drink(item) => HostEvent::Consume {
                user: user.clone(),
                item,
            },
        };
        if events.send(event).is_err() {
            break;
        }
    }
    let _ = events.send(HostEvent::Disconnect { user });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("  open "), ConsoleCommand::Open);
        assert_eq!(parse_command("click 12"), ConsoleCommand::Click(12));
        assert!(matches!(parse_command("click x"), ConsoleCommand::Unknown(_)));
        assert_eq!(parse_command("say hello  there"), ConsoleCommand::Say("hello  there".into()));
        assert_eq!(parse_command("user bob"), ConsoleCommand::User("bob".into()));
        assert_eq!(parse_command(""), ConsoleCommand::Empty);
        assert!(matches!(parse_command("say"), ConsoleCommand::Unknown(_)));
    }

    #[test]
    fn parses_drink_modifiers() {
        let ConsoleCommand::Drink(item) = parse_command("drink strength strong") else {
            panic!("not a drink");
        };
        assert_eq!(item.base, "STRENGTH");
        assert!(item.upgraded && !item.extended);
        assert_eq!(item.variant_key().as_deref(), Some("strong_strength"));

        let ConsoleCommand::Drink(item) = parse_command("drink speed long") else {
            panic!("not a drink");
        };
        assert_eq!(item.variant_key().as_deref(), Some("long_speed"));
    }

    #[test]
    fn reader_turns_lines_into_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let relay_tx = tx.clone();
        let open: OpenMenus = Arc::new(Mutex::new(HashMap::new()));
        open.lock().unwrap().insert("alex".into(), MenuLevel::GuildList);
        let input = "open\nclick 3\nsay strength quest\nclose\nsign\npage one\npage two\n.\nquit\nopen\n";

        read_commands(
            input.as_bytes(),
            "alex".into(),
            tx,
            ChatRelay::new(relay_tx),
            open,
        );

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 6, "{events:?}");
        assert!(matches!(events[0], HostEvent::Open { .. }));
        assert!(matches!(events[1], HostEvent::Click { slot: 3, .. }));
        assert!(matches!(&events[2], HostEvent::Text { text, .. } if text == "strength quest"));
        assert!(matches!(&events[3], HostEvent::ViewClosed { level: MenuLevel::GuildList, .. }));
        assert!(matches!(&events[4], HostEvent::EditorSubmit { pages, .. } if pages.len() == 2));
        assert!(matches!(events[5], HostEvent::Disconnect { .. }));
    }

    #[test]
    fn switching_user_disconnects_the_previous_one() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let relay = ChatRelay::new(tx.clone());
        let open: OpenMenus = Arc::new(Mutex::new(HashMap::new()));

        read_commands("open\nuser alex\nuser bo\nopen\n".as_bytes(), "alex".into(), tx, relay, open);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 4, "{events:?}");
        assert!(matches!(&events[0], HostEvent::Open { user } if user == "alex"));
        assert!(matches!(&events[1], HostEvent::Disconnect { user } if user == "alex"));
        assert!(matches!(&events[2], HostEvent::Open { user } if user == "bo"));
        assert!(matches!(&events[3], HostEvent::Disconnect { user } if user == "bo"));
    }
}
