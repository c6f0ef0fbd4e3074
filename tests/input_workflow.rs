mod common;

use std::sync::atomic::Ordering;

use common::{click, files_under, gui, key, menu, seed, temp_store, FlakyFs, TASKS_DOC};
use questdesk::gui::controller::{HostView, NoticeLevel, QuestGui};
use questdesk::gui::input::{InputOutcome, InputWorkflow};
use questdesk::gui::menu::{slots, ViewDescription};
use questdesk::gui::session::{InputKind, MenuLevel, Session};
use questdesk::storage::{DocumentStore, GuildKey, DEFAULT_TEMPLATE};

const USER: &str = "alex";

/// Open the menu and drill into `mages/intro.yml`.
fn open_intro(gui: &mut QuestGui) -> ViewDescription {
    let guilds = menu(&gui.open_menu(USER));
    let quests = menu(&click(gui, USER, &guilds, 0));
    menu(&click(gui, USER, &quests, 0))
}

fn pending_kind(gui: &QuestGui) -> Option<InputKind> {
    gui.session(USER)
        .and_then(|s| s.pending_input())
        .map(|p| p.kind)
}

#[test]
fn create_prompts_then_opens_the_editor() {
    let (_tmp, store) = temp_store();
    seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    let guilds = menu(&gui.open_menu(USER));
    let quests = menu(&click(&mut gui, USER, &guilds, 0));
    let response = click(&mut gui, USER, &quests, slots::CREATE);
    assert_eq!(response.view, HostView::Closed);
    assert_eq!(response.notices[0].level, NoticeLevel::Info);
    assert_eq!(pending_kind(&gui), Some(InputKind::Create));
    assert_eq!(gui.session(USER).unwrap().open_level, None);

    // The host reports the close it was asked to perform; the request survives.
    gui.handle_view_closed(USER, &quests.level);
    assert_eq!(pending_kind(&gui), Some(InputKind::Create));

    let result = gui.handle_text_input(USER, "strength quest");
    assert_eq!(result.outcome, InputOutcome::Applied);
    assert_eq!(result.response.notices[0].level, NoticeLevel::Success);
    assert_eq!(result.response.notices[0].text, "Quest created: strength_quest.yml");
    let HostView::Editor(editor) = &result.response.view else {
        panic!("expected the editor, got {:?}", result.response.view);
    };
    assert_eq!(editor.document, key("mages/strength_quest.yml"));
    assert_eq!(editor.pages, vec![DEFAULT_TEMPLATE.to_string()]);
    assert_eq!(pending_kind(&gui), None);
    assert_eq!(
        gui.session(USER).unwrap().editing,
        Some(key("mages/strength_quest.yml"))
    );
}

#[test]
fn conflicting_name_reprompts_until_cancel() {
    let (_tmp, store) = temp_store();
    seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    let guilds = menu(&gui.open_menu(USER));
    let quests = menu(&click(&mut gui, USER, &guilds, 0));
    click(&mut gui, USER, &quests, slots::CREATE);

    let result = gui.handle_text_input(USER, "intro");
    assert_eq!(result.outcome, InputOutcome::Retry);
    let texts: Vec<&str> = result.response.notices.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "That quest file already exists.",
            "Enter a different file name (or type 'cancel')."
        ]
    );
    assert_eq!(result.response.view, HostView::Unchanged);
    assert_eq!(pending_kind(&gui), Some(InputKind::Create));

    let result = gui.handle_text_input(USER, "CANCEL");
    assert_eq!(result.outcome, InputOutcome::Cancelled);
    assert_eq!(result.response.notices[0].text, "Action cancelled.");
    assert_eq!(result.response.view, HostView::Unchanged);
    assert_eq!(pending_kind(&gui), None);
    assert_eq!(files_under(gui.store().root()), vec!["mages/intro.yml".to_string()]);
}

#[test]
fn cancel_in_any_case_leaves_the_store_untouched() {
    let (_tmp, store) = temp_store();
    let doc = seed(&store, "mages/potions.yml", TASKS_DOC);
    let kinds = [
        InputKind::Create,
        InputKind::Rename,
        InputKind::Duplicate,
        InputKind::SetTaskAction,
        InputKind::SetTaskAmount,
    ];

    for (kind, word) in kinds.into_iter().zip(["cancel", "Cancel", "CANCEL", " cAnCeL ", "cancel\n"]) {
        let mut session = Session::new(USER.into());
        session.selected_guild = Some(GuildKey::Named("mages".into()));
        InputWorkflow::begin(&mut session, kind, Some(doc.clone()), Some("gather".into()));

        let submission = InputWorkflow::new(&store).submit(&mut session, word);
        assert_eq!(submission.outcome, InputOutcome::Cancelled, "{kind:?}");
        assert!(submission.destination.is_none());
        assert!(!session.is_awaiting_text());
    }
    assert_eq!(files_under(store.root()), vec!["mages/potions.yml".to_string()]);
    assert_eq!(store.read_text(&doc).unwrap(), TASKS_DOC);
}

#[test]
fn text_without_a_pending_request_is_plain_chat() {
    let (_tmp, store) = temp_store();
    let mut gui = gui(store);

    assert_eq!(gui.handle_text_input("stranger", "hi").outcome, InputOutcome::NotPending);
    gui.open_menu(USER);
    let result = gui.handle_text_input(USER, "cancel");
    assert_eq!(result.outcome, InputOutcome::NotPending);
    assert_eq!(result.response.view, HostView::Unchanged);
}

#[test]
fn rename_moves_the_document_and_shows_it() {
    let (_tmp, store) = temp_store();
    let intro = seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    let detail = open_intro(&mut gui);
    let response = click(&mut gui, USER, &detail, slots::RENAME);
    assert_eq!(response.view, HostView::Closed);

    let result = gui.handle_text_input(USER, "  first steps ");
    assert_eq!(result.outcome, InputOutcome::Applied);
    assert_eq!(result.response.notices[0].text, "Quest renamed to: first_steps.yml");
    let view = menu(&result.response);
    let renamed = key("mages/first_steps.yml");
    assert_eq!(view.level, MenuLevel::QuestDetail { quest: renamed.clone() });
    assert!(!gui.store().exists(&intro));
    assert_eq!(gui.store().read_text(&renamed).unwrap(), TASKS_DOC);
}

#[test]
fn duplicate_onto_itself_is_a_conflict() {
    let (_tmp, store) = temp_store();
    seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    let detail = open_intro(&mut gui);
    click(&mut gui, USER, &detail, slots::DUPLICATE);
    assert_eq!(gui.handle_text_input(USER, "intro.yml").outcome, InputOutcome::Retry);
    assert_eq!(pending_kind(&gui), Some(InputKind::Duplicate));

    let result = gui.handle_text_input(USER, "intro copy");
    assert_eq!(result.outcome, InputOutcome::Applied);
    assert_eq!(result.response.notices[0].text, "Quest duplicated: intro_copy.yml");
    assert_eq!(
        files_under(gui.store().root()),
        vec!["mages/intro.yml".to_string(), "mages/intro_copy.yml".to_string()]
    );
}

#[test]
fn task_amount_is_validated_and_retried() {
    let (_tmp, store) = temp_store();
    let doc = seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    let detail = open_intro(&mut gui);
    let tasks = menu(&click(&mut gui, USER, &detail, slots::TASKS));
    let task = menu(&click(&mut gui, USER, &tasks, 1));
    click(&mut gui, USER, &task, slots::SET_AMOUNT);

    let result = gui.handle_text_input(USER, "-3");
    assert_eq!(result.outcome, InputOutcome::Retry);
    assert_eq!(result.response.notices[0].level, NoticeLevel::Error);
    assert_eq!(
        result.response.notices[1].text,
        "Enter a whole number of at least 1 (or type 'cancel')."
    );
    assert_eq!(gui.store().tasks().task_summary(&doc, "gather").unwrap().amount, Some(2));

    let result = gui.handle_text_input(USER, "7");
    assert_eq!(result.outcome, InputOutcome::Applied);
    let view = menu(&result.response);
    assert_eq!(
        view.level,
        MenuLevel::TaskActionDetail {
            quest: doc.clone(),
            task: "gather".into()
        }
    );
    assert_eq!(gui.store().tasks().task_summary(&doc, "gather").unwrap().amount, Some(7));
}

#[test]
fn task_action_rejects_blank_text() {
    let (_tmp, store) = temp_store();
    let doc = seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    let detail = open_intro(&mut gui);
    let tasks = menu(&click(&mut gui, USER, &detail, slots::TASKS));
    let task = menu(&click(&mut gui, USER, &tasks, 0));
    click(&mut gui, USER, &task, slots::SET_ACTION);

    assert_eq!(gui.handle_text_input(USER, "   ").outcome, InputOutcome::Retry);
    let result = gui.handle_text_input(USER, "Drink a strong potion");
    assert_eq!(result.outcome, InputOutcome::Applied);
    assert_eq!(
        gui.store().tasks().task_summary(&doc, "Brew").unwrap().action.as_deref(),
        Some("Drink a strong potion")
    );
}

#[test]
fn a_new_request_replaces_the_old_one() {
    let (_tmp, store) = temp_store();
    seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    let guilds = menu(&gui.open_menu(USER));
    let quests = menu(&click(&mut gui, USER, &guilds, 0));
    click(&mut gui, USER, &quests, slots::CREATE);

    let detail = open_intro(&mut gui);
    click(&mut gui, USER, &detail, slots::RENAME);
    assert_eq!(pending_kind(&gui), Some(InputKind::Rename));

    assert_eq!(gui.handle_text_input(USER, "renamed").outcome, InputOutcome::Applied);
    assert_eq!(files_under(gui.store().root()), vec!["mages/renamed.yml".to_string()]);
}

#[test]
fn vanished_target_aborts_the_request() {
    let (_tmp, store) = temp_store();
    let intro = seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    let detail = open_intro(&mut gui);
    click(&mut gui, USER, &detail, slots::RENAME);
    std::fs::remove_file(gui.store().path_of(&intro)).unwrap();

    let result = gui.handle_text_input(USER, "renamed");
    assert_eq!(result.outcome, InputOutcome::Failed);
    assert_eq!(result.response.notices[0].level, NoticeLevel::Warning);
    let view = menu(&result.response);
    assert_eq!(
        view.level,
        MenuLevel::QuestList {
            guild: GuildKey::Named("mages".into())
        }
    );
    assert_eq!(pending_kind(&gui), None);
}

#[test]
fn store_failure_ends_the_request_with_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let (fs, armed) = FlakyFs::new();
    let store = DocumentStore::with_backend(tmp.path().join("quests"), fs).unwrap();
    seed(&store, "mages/intro.yml", TASKS_DOC);
    let mut gui = gui(store);

    let guilds = menu(&gui.open_menu(USER));
    let quests = menu(&click(&mut gui, USER, &guilds, 0));
    click(&mut gui, USER, &quests, slots::CREATE);
    armed.store(true, Ordering::SeqCst);

    let result = gui.handle_text_input(USER, "doomed");
    assert_eq!(result.outcome, InputOutcome::Failed);
    assert_eq!(result.response.notices[0].level, NoticeLevel::Error);
    assert!(result.response.notices[0].text.starts_with("Failed to update quest file"));
    assert_eq!(pending_kind(&gui), None);
    assert_eq!(files_under(gui.store().root()), vec!["mages/intro.yml".to_string()]);
}
