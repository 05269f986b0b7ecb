use std::io::{self, Write};

use chrono::{Local, NaiveDate, NaiveTime};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::analytics::{self, change_percent, Period, TaskStats};
use crate::error::{Result, TaskError};
use crate::models::{Priority, Task, TaskDraft, TaskFilter};
use crate::recurrence::{expand, Expansion, ExpansionLimits};
use crate::storage::{delete_database, load_tasks, update_tasks};

/// Field changes for [`cmd_edit`]. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reminder_time: Option<NaiveTime>,
}

impl TaskEdit {
    pub fn text(text: impl Into<String>) -> Self {
        TaskEdit {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.priority.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.reminder_time.is_none()
    }
}

/// Next free base id: one past the largest numeric id prefix in the store.
pub fn next_base_id(tasks: &[Task]) -> String {
    let max = tasks
        .iter()
        .filter_map(|t| t.id.split('_').next()?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}

/// Creates a task from `draft`, expanding it first when it recurs.
///
/// Validation failures leave the store untouched. All instances are
/// appended in one write.
pub fn cmd_add(draft: TaskDraft, limits: &ExpansionLimits, silent: bool) -> Result<Expansion> {
    let now = Local::now();
    let expansion = update_tasks(|tasks| {
        let template = draft.into_task(next_base_id(tasks), now)?;
        let expansion = expand(&template, now.date_naive(), limits);
        tasks.extend(expansion.instances.iter().cloned());
        Ok(expansion)
    })?;

    tracing::info!(count = expansion.len(), truncated = expansion.truncated, "tasks added");
    if !silent {
        println!("{}", added_message(&expansion));
    }
    Ok(expansion)
}

/// One-line summary of an add, mentioning any ceiling that was hit.
pub fn added_message(expansion: &Expansion) -> String {
    match expansion.instances.as_slice() {
        [single] if single.recurrence_info.is_none() => {
            format!("Task added (id = {})", single.id)
        }
        instances => {
            let mut msg = format!("Created {} recurring task instance(s)", instances.len());
            if let (Some(first), Some(last)) = (instances.first(), instances.last()) {
                if let (Some(from), Some(to)) = (first.scheduled_date, last.scheduled_date) {
                    msg.push_str(&format!(" from {} to {}", from, to));
                }
            }
            if expansion.truncated {
                match expansion.requested {
                    Some(requested) => {
                        msg.push_str(&format!(" (capped, {} requested)", requested))
                    }
                    None => msg.push_str(" (capped before the end date)"),
                }
            }
            msg.push('.');
            msg
        }
    }
}

/// Expands `draft` without saving anything and prints the schedule.
pub fn cmd_preview(draft: TaskDraft, limits: &ExpansionLimits) -> Result<Expansion> {
    let now = Local::now();
    let template = draft.into_task("preview".into(), now)?;
    let expansion = expand(&template, now.date_naive(), limits);

    if let Some(settings) = &template.recurrence_settings {
        println!("{}: {}", template.text, settings.describe());
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Date", "Weekday"]);
    for t in &expansion.instances {
        let seq = t.recurrence_info.as_ref().map(|i| i.sequence).unwrap_or(1);
        let (date, weekday) = match t.effective_date() {
            Some(d) => (d.to_string(), d.format("%a").to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        table.add_row(vec![seq.to_string(), date, weekday]);
    }
    println!("{table}");
    println!("{}", added_message(&expansion).replacen("Created", "Would create", 1));
    Ok(expansion)
}

/// Toggles completion of a task. Returns the new completed state.
pub fn cmd_complete(id: &str, silent: bool) -> Result<bool> {
    let now = Local::now();
    let completed = update_tasks(|tasks| {
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.toggle_completed(now);
        Ok(task.completed)
    })?;
    tracing::info!(id, completed, "task toggled");
    if !silent {
        if completed {
            println!("Task {} marked as complete.", id);
        } else {
            println!("Task {} marked as active.", id);
        }
    }
    Ok(completed)
}

/// Removes a task. With `series`, removes every instance expanded from the
/// same template as well. Returns how many tasks were removed.
pub fn cmd_remove(id: &str, series: bool, silent: bool) -> Result<usize> {
    let removed = update_tasks(|tasks| {
        let target = tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        let original = target.recurrence_info.as_ref().map(|i| i.original_id.clone());
        let len_before = tasks.len();
        match (series, original) {
            (true, Some(original)) => tasks.retain(|t| {
                t.recurrence_info.as_ref().map(|i| i.original_id.as_str()) != Some(original.as_str())
            }),
            _ => tasks.retain(|t| t.id != id),
        }
        Ok(len_before - tasks.len())
    })?;
    tracing::info!(id, removed, "tasks removed");
    if !silent {
        if removed == 1 {
            println!("Task {} deleted.", id);
        } else {
            println!("Deleted {} tasks in the series of {}.", removed, id);
        }
    }
    Ok(removed)
}

/// Updates a task's fields in place.
pub fn cmd_edit(id: &str, edit: TaskEdit, silent: bool) -> Result<()> {
    if edit.is_empty() {
        return Err(TaskError::validation("Nothing to change."));
    }
    if let Some(text) = &edit.text {
        if text.trim().is_empty() {
            return Err(TaskError::validation("Task text cannot be empty."));
        }
    }
    update_tasks(|tasks| {
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        let start = edit.start_date.or(task.start_date);
        let end = edit.end_date.or(task.end_date);
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(TaskError::validation(format!(
                    "End date {} is before start date {}.",
                    end, start
                )));
            }
        }
        if let Some(text) = edit.text {
            task.text = text.trim().to_string();
        }
        if let Some(p) = edit.priority {
            task.priority = p;
        }
        if let Some(d) = edit.description {
            task.description = Some(d).filter(|d| !d.trim().is_empty());
        }
        if let Some(c) = edit.category {
            task.category = Some(c).filter(|c| !c.trim().is_empty());
        }
        task.start_date = start;
        task.end_date = end;
        if let Some(r) = edit.reminder_time {
            task.reminder_time = Some(r);
        }
        Ok(())
    })?;
    tracing::info!(id, "task updated");
    if !silent {
        println!("Task {} updated.", id);
    }
    Ok(())
}

/// Deletes every completed task. Returns how many were removed.
pub fn cmd_clear_completed(silent: bool) -> Result<usize> {
    let removed = update_tasks(|tasks| {
        let len_before = tasks.len();
        tasks.retain(|t| !t.completed);
        Ok(len_before - tasks.len())
    })?;
    tracing::info!(removed, "completed tasks cleared");
    if !silent {
        if removed == 0 {
            println!("No completed tasks to clear.");
        } else {
            println!("Completed tasks cleared ({}).", removed);
        }
    }
    Ok(removed)
}

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

/// Lists tasks in a formatted table.
pub fn cmd_list(filter: TaskFilter) -> Result<()> {
    let tasks: Vec<Task> = load_tasks()?.into_iter().filter(|t| filter.matches(t)).collect();
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Task").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Category").add_attribute(Attribute::Bold),
            Cell::new("Date").add_attribute(Attribute::Bold),
            Cell::new("Repeat").add_attribute(Attribute::Bold),
            Cell::new("Created").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for t in &tasks {
        let repeat = match (&t.recurrence_info, &t.recurrence_settings) {
            (Some(info), Some(settings)) => format!("#{} {}", info.sequence, settings.kind),
            (None, Some(settings)) => settings.kind.to_string(),
            _ => String::new(),
        };
        let date = t.effective_date().map(|d| d.to_string()).unwrap_or_default();
        let status = if t.completed { "Done" } else { "Pending" };
        let status_color = if t.completed { Color::Green } else { Color::Yellow };
        let text = if t.completed {
            Cell::new(&t.text).add_attribute(Attribute::CrossedOut).fg(Color::Grey)
        } else {
            Cell::new(&t.text)
        };

        table.add_row(vec![
            Cell::new(&t.id),
            text,
            Cell::new(t.priority).fg(priority_color(t.priority)),
            Cell::new(t.category.clone().unwrap_or_default()),
            Cell::new(date),
            Cell::new(repeat),
            Cell::new(t.created_at.format("%b %-d, %Y")),
            Cell::new(status).fg(status_color),
        ]);
    }

    println!("{table}");
    let stats = TaskStats::from_tasks(&tasks);
    println!(
        "{} {} ({}): {} completed, {} pending",
        stats.total,
        if stats.total == 1 { "task" } else { "tasks" },
        filter.label(),
        stats.completed,
        stats.pending
    );
    Ok(())
}

/// Prints total / completed / pending counts.
pub fn cmd_stats() -> Result<TaskStats> {
    let stats = TaskStats::from_tasks(&load_tasks()?);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Total", "Completed", "Pending", "Rate"]);
    table.add_row(vec![
        Cell::new(stats.total),
        Cell::new(stats.completed).fg(Color::Green),
        Cell::new(stats.pending).fg(Color::Blue),
        Cell::new(format!("{}%", stats.completion_rate())),
    ]);
    println!("{table}");
    Ok(stats)
}

fn change_cell(current: usize, previous: usize) -> Cell {
    match change_percent(current, previous) {
        Some(pct) if pct > 0 => Cell::new(format!("+{}%", pct)).fg(Color::Green),
        Some(pct) if pct < 0 => Cell::new(format!("{}%", pct)).fg(Color::Red),
        Some(_) => Cell::new("0%"),
        None => Cell::new("-"),
    }
}

/// Prints the productivity dashboard for `period`.
pub fn cmd_dashboard(period: Period) -> Result<analytics::Dashboard> {
    let tasks = load_tasks()?;
    let dash = analytics::summarize(&tasks, period, Local::now());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        Cell::new(format!("This {}", period)).add_attribute(Attribute::Bold),
        Cell::new("Current").add_attribute(Attribute::Bold),
        Cell::new("Previous").add_attribute(Attribute::Bold),
        Cell::new("Change").add_attribute(Attribute::Bold),
    ]);
    let rows = [
        ("New tasks", dash.current.new_tasks, dash.previous.new_tasks),
        ("Completed", dash.current.completed_tasks, dash.previous.completed_tasks),
        ("Pending", dash.current.pending_tasks, dash.previous.pending_tasks),
    ];
    for (label, cur, prev) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(cur), Cell::new(prev), change_cell(cur, prev)]);
    }
    table.add_row(vec![
        Cell::new("Completion rate"),
        Cell::new(format!("{}%", dash.current.completion_rate)),
        Cell::new(format!("{}%", dash.previous.completion_rate)),
        Cell::new(""),
    ]);
    println!("{table}");

    let mut open = Table::new();
    open.load_preset(UTF8_FULL).set_header(vec!["Priority", "Open"]);
    for (p, n) in &dash.open_by_priority {
        open.add_row(vec![Cell::new(p).fg(priority_color(*p)), Cell::new(n)]);
    }
    println!("{open}");

    let mut recent = Table::new();
    recent.load_preset(UTF8_FULL).set_header(vec!["Day", "Created", "Completed"]);
    for day in &dash.recent {
        recent.add_row(vec![
            Cell::new(day.date.format("%a %b %-d")),
            Cell::new(day.created),
            Cell::new(day.completed),
        ]);
    }
    println!("{recent}");
    Ok(dash)
}

/// Resets the store by deleting all tasks.
pub fn cmd_reset(force: bool) -> Result<()> {
    if !force {
        print!("Are you sure you want to delete all tasks? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    delete_database()?;
    println!("Task store reset successfully.");
    Ok(())
}
