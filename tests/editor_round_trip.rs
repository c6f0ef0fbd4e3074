mod common;

use common::{click, gui, gui_with, menu, seed, temp_store, TASKS_DOC};
use questdesk::gui::controller::{GuiSettings, HostView, NoticeLevel, QuestGui};
use questdesk::gui::editor::{join_pages, split_pages, EditorView};
use questdesk::gui::menu::slots;
use questdesk::gui::session::MenuLevel;

const USER: &str = "alex";

fn open_editor_via_menu(gui: &mut QuestGui) -> EditorView {
    let guilds = menu(&gui.open_menu(USER));
    let quests = menu(&click(gui, USER, &guilds, 0));
    let detail = menu(&click(gui, USER, &quests, 0));
    match click(gui, USER, &detail, slots::EDIT_TEXT).view {
        HostView::Editor(editor) => editor,
        other => panic!("expected the editor, got {other:?}"),
    }
}

#[test]
fn long_documents_are_split_into_pages() {
    let (_tmp, store) = temp_store();
    let text = format!("{}\n", "x".repeat(599));
    seed(&store, "mages/long.yml", &text);
    let mut gui = gui(store);

    let editor = open_editor_via_menu(&mut gui);
    let lengths: Vec<usize> = editor.pages.iter().map(|p| p.chars().count()).collect();
    assert_eq!(lengths, vec![240, 240, 120]);
    assert_eq!(editor.pages.concat(), text);
    assert_eq!(editor.title, "Quest Editor - long.yml");
    assert_eq!(gui.session(USER).unwrap().open_level, None);
}

#[test]
fn page_width_follows_settings() {
    let (_tmp, store) = temp_store();
    seed(&store, "mages/intro.yml", TASKS_DOC);
    let settings = GuiSettings {
        book_page_chars: 32,
        ..GuiSettings::default()
    };
    let mut gui = gui_with(store, settings);

    let editor = open_editor_via_menu(&mut gui);
    assert_eq!(editor.pages, split_pages(TASKS_DOC, 32));
    assert!(editor.pages.iter().all(|p| p.chars().count() <= 32));
}

#[test]
fn submitted_pages_replace_the_document() {
    let (_tmp, store) = temp_store();
    let doc = seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);
    open_editor_via_menu(&mut gui);

    let pages = ["tasks:\n  first:\n    task: CONSUME", "  second:\n    task: CONSUME  \n\n"];
    let response = gui.submit_editor(USER, &pages);
    assert_eq!(response.notices[0].level, NoticeLevel::Success);
    assert_eq!(response.notices[0].text, "Saved intro.yml.");
    assert_eq!(menu(&response).level, MenuLevel::QuestDetail { quest: doc.clone() });

    let stored = gui.store().read_text(&doc).unwrap();
    assert_eq!(stored, join_pages(&pages));
    assert_eq!(
        stored,
        "tasks:\n  first:\n    task: CONSUME\n  second:\n    task: CONSUME\n"
    );
    assert_eq!(gui.store().tasks().list_task_keys(&doc).unwrap(), vec!["first", "second"]);
    assert_eq!(gui.session(USER).unwrap().editing, None);
}

#[test]
fn unchanged_single_page_round_trips_exactly() {
    let (_tmp, store) = temp_store();
    let doc = seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    let editor = open_editor_via_menu(&mut gui);
    assert_eq!(editor.pages.len(), 1);
    gui.submit_editor(USER, &editor.pages);
    assert_eq!(gui.store().read_text(&doc).unwrap(), TASKS_DOC);
}

#[test]
fn stored_text_always_ends_with_one_newline() {
    let (_tmp, store) = temp_store();
    let doc = seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    for pages in [vec!["a: 1"], vec!["a: 1\n\n\n"], vec!["a: 1", "   "], vec![""]] {
        open_editor_via_menu(&mut gui);
        gui.submit_editor(USER, &pages);
        let stored = gui.store().read_text(&doc).unwrap();
        assert!(stored.ends_with('\n') && !stored.ends_with("\n\n"), "{pages:?} -> {stored:?}");
        assert_eq!(stored.trim_end(), pages.join("\n").trim_end());
    }
}

#[test]
fn submit_without_an_open_editor_does_nothing() {
    let (_tmp, store) = temp_store();
    let doc = seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    assert_eq!(gui.submit_editor(USER, &["oops"]).view, HostView::Unchanged);
    open_editor_via_menu(&mut gui);
    gui.submit_editor(USER, &["a: 1"]);
    // The edit target is consumed by the first submission.
    assert_eq!(gui.submit_editor(USER, &["b: 2"]).view, HostView::Unchanged);
    assert_eq!(gui.store().read_text(&doc).unwrap(), "a: 1\n");
}

#[test]
fn reopening_the_menu_abandons_the_edit() {
    let (_tmp, store) = temp_store();
    let doc = seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    open_editor_via_menu(&mut gui);
    gui.open_menu(USER);
    assert_eq!(gui.submit_editor(USER, &["a: 1"]).view, HostView::Unchanged);
    assert_eq!(gui.store().read_text(&doc).unwrap(), TASKS_DOC);
}
