use std::collections::BTreeSet;

use ratatui::widgets::TableState;

use crate::analytics::TaskStats;
use crate::commands::{
    added_message, cmd_add, cmd_clear_completed, cmd_complete, cmd_edit, cmd_remove, TaskEdit,
};
use crate::error::TaskError;
use crate::models::{
    parse_date, parse_weekdays, EndCondition, Priority, RecurrenceSettings, RecurrenceType, Task,
    TaskDraft, TaskFilter,
};
use crate::recurrence::ExpansionLimits;
use crate::storage::load_tasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
}

/// Steps of the "Add Task" wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddStep {
    #[default]
    Text,
    Priority,
    Start,
    Recur,
    Interval,
    Weekdays,
    End,
}

/// State for the multi-step "Add Task" wizard.
///
/// Answers accumulate here and become one [`TaskDraft`] on the last step.
#[derive(Debug, Default)]
pub struct AddState {
    pub step: AddStep,
    pub draft: TaskDraft,
    pub recur: Option<RecurrenceType>,
    pub interval: u32,
    pub weekly_days: BTreeSet<u8>,
}

/// Message shown in the status bar after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
}

pub struct App {
    pub tasks: Vec<Task>,
    pub stats: TaskStats,
    pub state: TableState,
    pub filter: TaskFilter,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub target_id: Option<String>,
    pub add_state: AddState,
    pub notice: Option<Notice>,
    limits: ExpansionLimits,
}

impl App {
    /// Creates a new App instance and loads initial data.
    pub fn new(limits: ExpansionLimits) -> App {
        let mut app = App {
            tasks: Vec::new(),
            stats: TaskStats::default(),
            state: TableState::default(),
            filter: TaskFilter::All,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            notice: None,
            limits,
        };
        app.reload();
        app
    }

    fn success(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice { message: message.into(), is_error: false });
    }

    fn failure(&mut self, err: TaskError) {
        self.notice = Some(Notice { message: err.to_string(), is_error: true });
    }

    /// Reloads tasks from storage and refreshes the visible list.
    pub fn reload(&mut self) {
        match load_tasks() {
            Ok(all) => {
                self.stats = TaskStats::from_tasks(&all);
                self.tasks = all.into_iter().filter(|t| self.filter.matches(t)).collect();
            }
            Err(e) => {
                self.tasks.clear();
                self.failure(e);
            }
        }

        if self.tasks.is_empty() {
            self.state.select(None);
        } else if let Some(i) = self.state.selected() {
            if i >= self.tasks.len() {
                self.state.select(Some(self.tasks.len() - 1));
            }
        } else {
            self.state.select(Some(0));
        }
    }

    /// Selects the next task.
    pub fn next(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.tasks.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    /// Selects the previous task.
    pub fn previous(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.tasks.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn selected(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.tasks.get(i))
    }

    fn selected_id(&self) -> Option<String> {
        self.selected().map(|t| t.id.clone())
    }

    /// Toggles the selected task between done and active.
    pub fn toggle_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        match cmd_complete(&id, true) {
            Ok(true) => self.success(format!("Task {} completed.", id)),
            Ok(false) => self.success(format!("Task {} reopened.", id)),
            Err(e) => self.failure(e),
        }
        self.reload();
    }

    /// Deletes the selected task.
    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        match cmd_remove(&id, false, true) {
            Ok(_) => self.success("Task deleted successfully!"),
            Err(e) => self.failure(e),
        }
        self.reload();
    }

    /// Moves the selected task's priority low -> medium -> high -> low.
    pub fn cycle_priority(&mut self) {
        let Some(task) = self.selected() else { return };
        let id = task.id.clone();
        let priority = match task.priority {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        };
        let edit = TaskEdit {
            priority: Some(priority),
            ..TaskEdit::default()
        };
        match cmd_edit(&id, edit, true) {
            Ok(()) => self.success(format!("Priority set to {}.", priority)),
            Err(e) => self.failure(e),
        }
        self.reload();
    }

    /// Cycles all -> active -> completed.
    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
        self.state.select(None);
        self.reload();
    }

    pub fn clear_completed(&mut self) {
        match cmd_clear_completed(true) {
            Ok(0) => self.success("No completed tasks to clear."),
            Ok(n) => self.success(format!("Cleared {} completed task(s).", n)),
            Err(e) => self.failure(e),
        }
        self.reload();
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.notice = None;
        self.add_state = AddState {
            interval: 1,
            ..AddState::default()
        };
        self.input_buffer.clear();
    }

    /// Starts editing the selected task's text, pre-filled with the current text.
    pub fn start_edit(&mut self) {
        let Some(task) = self.selected() else { return };
        let (id, text) = (task.id.clone(), task.text.clone());
        self.target_id = Some(id);
        self.input_buffer = text;
        self.notice = None;
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.target_id = None;
    }

    /// Handles text input based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            InputMode::Normal => {}
        }
    }

    /// Title for the input box.
    pub fn prompt(&self) -> &'static str {
        match self.input_mode {
            InputMode::Editing => "Edit Task Text",
            InputMode::Normal => "",
            InputMode::Adding => match self.add_state.step {
                AddStep::Text => "Add Task: What needs to be done?",
                AddStep::Priority => "Add Task: Priority (low/medium/high, blank = medium)",
                AddStep::Start => "Add Task: Start Date YYYY-MM-DD (Optional)",
                AddStep::Recur => "Add Task: Repeat daily/weekly/monthly/yearly (blank = once)",
                AddStep::Interval => "Add Task: Repeat Every N (blank = 1)",
                AddStep::Weekdays => "Add Task: On Weekdays, e.g. mon,wed,fri (Optional)",
                AddStep::End => "Add Task: Ends never / YYYY-MM-DD / count",
            },
        }
    }

    fn advance(&mut self, step: AddStep) {
        self.add_state.step = step;
        self.input_buffer.clear();
    }

    /// Handles input for the "Add Task" wizard.
    fn handle_adding_input(&mut self) {
        let input = self.input_buffer.trim().to_string();
        let result: Result<(), TaskError> = match self.add_state.step {
            AddStep::Text => {
                if input.is_empty() {
                    Err(TaskError::validation("Task text cannot be empty."))
                } else {
                    self.add_state.draft.text = input;
                    self.advance(AddStep::Priority);
                    Ok(())
                }
            }
            AddStep::Priority => {
                let priority = if input.is_empty() { Ok(Priority::default()) } else { input.parse() };
                priority.map(|p| {
                    self.add_state.draft.priority = p;
                    self.advance(AddStep::Start);
                })
            }
            AddStep::Start => {
                let start = if input.is_empty() { Ok(None) } else { parse_date(&input).map(Some) };
                start.map(|d| {
                    self.add_state.draft.start_date = d;
                    self.advance(AddStep::Recur);
                })
            }
            AddStep::Recur => {
                if input.is_empty() {
                    self.finish_add();
                    return;
                }
                input.parse::<RecurrenceType>().map(|kind| {
                    self.add_state.recur = Some(kind);
                    self.advance(AddStep::Interval);
                })
            }
            AddStep::Interval => {
                let interval = if input.is_empty() {
                    Ok(1)
                } else {
                    input
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n >= 1)
                        .ok_or_else(|| TaskError::validation("Interval must be a whole number of at least 1."))
                };
                interval.map(|n| {
                    self.add_state.interval = n;
                    if self.add_state.recur == Some(RecurrenceType::Weekly) {
                        self.advance(AddStep::Weekdays);
                    } else {
                        self.advance(AddStep::End);
                    }
                })
            }
            AddStep::Weekdays => parse_weekdays(&input).map(|days| {
                self.add_state.weekly_days = days;
                self.advance(AddStep::End);
            }),
            AddStep::End => match parse_end(&input) {
                Ok(end) => {
                    if let Some(kind) = self.add_state.recur {
                        let settings = RecurrenceSettings::new(kind, self.add_state.interval)
                            .with_weekly_days(self.add_state.weekly_days.iter().copied())
                            .with_end(end);
                        self.add_state.draft.recurrence = Some(settings);
                    }
                    self.finish_add();
                    return;
                }
                Err(e) => Err(e),
            },
        };
        if let Err(e) = result {
            self.failure(e);
        }
    }

    /// Commits the wizard's draft in one step.
    ///
    /// On error the wizard stays open with every answer kept, so the last
    /// one can be corrected.
    fn finish_add(&mut self) {
        match cmd_add(self.add_state.draft.clone(), &self.limits, true) {
            Ok(expansion) => {
                self.success(added_message(&expansion));
                self.add_state = AddState::default();
            }
            Err(e) => {
                self.failure(e);
                return;
            }
        }
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.reload();
    }

    /// Saves the edited text straight to the task.
    fn handle_editing_input(&mut self) {
        if let Some(id) = self.target_id.take() {
            match cmd_edit(&id, TaskEdit::text(self.input_buffer.clone()), true) {
                Ok(()) => self.success("Task updated successfully!"),
                Err(e) => {
                    // Keep the editor open so the text can be fixed.
                    self.target_id = Some(id);
                    self.failure(e);
                    return;
                }
            }
        }
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.reload();
    }
}

/// Reads the wizard's end answer: blank or "never", a date, or a count.
fn parse_end(input: &str) -> Result<EndCondition, TaskError> {
    if input.is_empty() || input.eq_ignore_ascii_case("never") {
        return Ok(EndCondition::Never);
    }
    if let Ok(count) = input.parse::<u32>() {
        return Ok(EndCondition::Count { count });
    }
    parse_date(input).map(|end_date| EndCondition::Date { end_date })
}
