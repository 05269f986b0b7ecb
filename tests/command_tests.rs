use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDate;
use tideline::commands::*;
use tideline::models::{EndCondition, Priority, RecurrenceSettings, RecurrenceType, TaskDraft, TaskFilter};
use tideline::storage::load_tasks;
use tideline::{ExpansionLimits, TaskError};

// Use a mutex to ensure tests run serially since they modify the environment variable
static TEST_MUTEX: Mutex<()> = Mutex::new(());

fn with_test_db<F>(f: F)
where
    F: FnOnce(PathBuf),
{
    let _guard = TEST_MUTEX.lock().unwrap_or_else(|p| p.into_inner());

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tasks.json");
    env::set_var("TASKS_DB", &db_path);

    f(db_path);

    env::remove_var("TASKS_DB");
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn recurring_draft(text: &str, start: NaiveDate, settings: RecurrenceSettings) -> TaskDraft {
    let mut draft = TaskDraft::new(text);
    draft.start_date = Some(start);
    draft.recurrence = Some(settings);
    draft
}

#[test]
fn test_add_and_list() {
    with_test_db(|_path| {
        let mut draft = TaskDraft::new("Test Task");
        draft.category = Some("Home".into());
        draft.priority = Priority::High;
        cmd_add(draft, &ExpansionLimits::default(), true).unwrap();

        let tasks = load_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "1");
        assert_eq!(tasks[0].text, "Test Task");
        assert_eq!(tasks[0].category, Some("Home".into()));
        assert_eq!(tasks[0].priority, Priority::High);
        assert!(tasks[0].recurrence_info.is_none());

        cmd_list(TaskFilter::All).unwrap();
    });
}

#[test]
fn test_blank_text_is_rejected_without_mutation() {
    with_test_db(|path| {
        cmd_add(TaskDraft::new("Keep me"), &ExpansionLimits::default(), true).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let err = cmd_add(TaskDraft::new("   "), &ExpansionLimits::default(), true).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(load_tasks().unwrap().len(), 1);
    });
}

#[test]
fn test_recurring_add_stores_every_instance() {
    with_test_db(|_path| {
        let settings = RecurrenceSettings::new(RecurrenceType::Daily, 2)
            .with_end(EndCondition::Count { count: 3 });
        let expansion = cmd_add(
            recurring_draft("Water plants", date(2024, 1, 1), settings),
            &ExpansionLimits::default(),
            true,
        )
        .unwrap();
        assert_eq!(expansion.len(), 3);
        assert_eq!(
            added_message(&expansion),
            "Created 3 recurring task instance(s) from 2024-01-01 to 2024-01-05."
        );

        let tasks = load_tasks().unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1_0", "1_1", "1_2"]);
        let dates: Vec<NaiveDate> = tasks.iter().filter_map(|t| t.scheduled_date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 3), date(2024, 1, 5)]);

        // The next template gets a fresh base id.
        cmd_add(TaskDraft::new("Once"), &ExpansionLimits::default(), true).unwrap();
        let tasks = load_tasks().unwrap();
        assert_eq!(tasks.last().unwrap().id, "2");
    });
}

#[test]
fn test_capped_count_is_reported() {
    with_test_db(|_path| {
        let settings = RecurrenceSettings::new(RecurrenceType::Weekly, 1)
            .with_end(EndCondition::Count { count: 80 });
        let expansion = cmd_add(
            recurring_draft("Review", date(2024, 1, 1), settings),
            &ExpansionLimits::default(),
            true,
        )
        .unwrap();
        assert!(expansion.truncated);
        assert_eq!(load_tasks().unwrap().len(), 50);
        assert!(added_message(&expansion).contains("(capped, 80 requested)"));
    });
}

#[test]
fn test_invalid_recurrence_is_rejected() {
    with_test_db(|_path| {
        let settings = RecurrenceSettings::new(RecurrenceType::Monthly, 1)
            .with_end(EndCondition::Date { end_date: date(2023, 1, 1) });
        let err = cmd_add(
            recurring_draft("Rent", date(2024, 1, 1), settings),
            &ExpansionLimits::default(),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert!(load_tasks().unwrap().is_empty());
    });
}

#[test]
fn test_complete_toggles() {
    with_test_db(|_path| {
        cmd_add(TaskDraft::new("Task to complete"), &ExpansionLimits::default(), true).unwrap();

        assert!(cmd_complete("1", true).unwrap());
        let tasks = load_tasks().unwrap();
        assert!(tasks[0].completed);
        assert!(tasks[0].completed_at.is_some());

        assert!(!cmd_complete("1", true).unwrap());
        let tasks = load_tasks().unwrap();
        assert!(!tasks[0].completed);
        assert!(tasks[0].completed_at.is_none());
    });
}

#[test]
fn test_edit_updates_text_directly() {
    with_test_db(|_path| {
        cmd_add(TaskDraft::new("Old text"), &ExpansionLimits::default(), true).unwrap();
        cmd_complete("1", true).unwrap();

        cmd_edit("1", TaskEdit::text("  New text "), true).unwrap();

        let tasks = load_tasks().unwrap();
        assert_eq!(tasks[0].text, "New text");
        // Completion is untouched by an edit.
        assert!(tasks[0].completed);

        let err = cmd_edit("1", TaskEdit::text(" "), true).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert_eq!(load_tasks().unwrap()[0].text, "New text");
    });
}

#[test]
fn test_edit_rejects_inverted_window() {
    with_test_db(|_path| {
        let mut draft = TaskDraft::new("Trip");
        draft.start_date = Some(date(2024, 6, 10));
        cmd_add(draft, &ExpansionLimits::default(), true).unwrap();

        let edit = TaskEdit {
            end_date: Some(date(2024, 6, 1)),
            ..TaskEdit::default()
        };
        assert!(matches!(cmd_edit("1", edit, true), Err(TaskError::Validation(_))));
        assert_eq!(load_tasks().unwrap()[0].end_date, None);
    });
}

#[test]
fn test_remove_single_and_series() {
    with_test_db(|_path| {
        let settings = RecurrenceSettings::new(RecurrenceType::Daily, 1)
            .with_end(EndCondition::Count { count: 4 });
        cmd_add(recurring_draft("Stretch", date(2024, 1, 1), settings), &ExpansionLimits::default(), true)
            .unwrap();
        cmd_add(TaskDraft::new("Other"), &ExpansionLimits::default(), true).unwrap();

        assert_eq!(cmd_remove("1_1", false, true).unwrap(), 1);
        assert_eq!(load_tasks().unwrap().len(), 4);

        assert_eq!(cmd_remove("1_0", true, true).unwrap(), 3);
        let tasks = load_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "2");
    });
}

#[test]
fn test_missing_task_is_not_found() {
    with_test_db(|_path| {
        assert!(matches!(cmd_complete("42", true), Err(TaskError::NotFound(_))));
        assert!(matches!(cmd_remove("42", false, true), Err(TaskError::NotFound(_))));
        assert!(matches!(cmd_edit("42", TaskEdit::text("x"), true), Err(TaskError::NotFound(_))));
    });
}

#[test]
fn test_clear_completed_and_stats() {
    with_test_db(|_path| {
        for text in ["a", "b", "c"] {
            cmd_add(TaskDraft::new(text), &ExpansionLimits::default(), true).unwrap();
        }
        cmd_complete("2", true).unwrap();

        let stats = cmd_stats().unwrap();
        assert_eq!((stats.total, stats.completed, stats.pending), (3, 1, 2));

        assert_eq!(cmd_clear_completed(true).unwrap(), 1);
        assert_eq!(cmd_clear_completed(true).unwrap(), 0);
        let ids: Vec<String> = load_tasks().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    });
}

#[test]
fn test_malformed_store_is_left_alone() {
    with_test_db(|path| {
        fs::write(&path, "{ not json").unwrap();
        let err = cmd_add(TaskDraft::new("New"), &ExpansionLimits::default(), true).unwrap_err();
        assert!(matches!(err, TaskError::Json(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    });
}

#[test]
fn test_preview_does_not_save() {
    with_test_db(|path| {
        let settings = RecurrenceSettings::new(RecurrenceType::Monthly, 1)
            .with_end(EndCondition::Count { count: 2 });
        let expansion =
            cmd_preview(recurring_draft("Rent", date(2024, 1, 31), settings), &ExpansionLimits::default())
                .unwrap();
        assert_eq!(expansion.instances[1].scheduled_date, Some(date(2024, 2, 29)));
        assert!(!path.exists());
    });
}

#[test]
fn test_reset_deletes_store() {
    with_test_db(|path| {
        cmd_add(TaskDraft::new("Doomed"), &ExpansionLimits::default(), true).unwrap();
        assert!(path.exists());
        cmd_reset(true).unwrap();
        assert!(!path.exists());
        assert!(load_tasks().unwrap().is_empty());
    });
}
