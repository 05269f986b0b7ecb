use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};

/// Represents a single task, either a user-authored template or one dated
/// instance produced by recurrence expansion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Opaque identifier. Instances use `<original id>_<index>`.
    pub id: String,
    /// The label shown in lists. Never blank.
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Timestamp when the task was created.
    pub created_at: DateTime<Local>,
    /// Timestamp when the task was last marked complete.
    #[serde(default)]
    pub completed_at: Option<DateTime<Local>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Stored for display only; reminders are never fired.
    #[serde(default)]
    pub reminder_time: Option<NaiveTime>,
    /// Present exactly when the task recurs.
    #[serde(default)]
    pub recurrence_settings: Option<RecurrenceSettings>,
    /// Occurrence date, set on expanded instances.
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub recurrence_info: Option<RecurrenceInfo>,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        self.recurrence_settings.is_some()
    }

    /// The date a task is "for": its occurrence date, else its start date.
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.scheduled_date.or(self.start_date)
    }

    /// Flips completion, stamping or clearing `completed_at`.
    pub fn toggle_completed(&mut self, now: DateTime<Local>) {
        self.completed = !self.completed;
        self.completed_at = if self.completed { Some(now) } else { None };
    }
}

/// Links an expanded instance back to the template it came from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceInfo {
    pub is_recurring: bool,
    pub original_id: String,
    /// 1-based occurrence number.
    pub sequence: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "l" => Ok(Priority::Low),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            other => Err(TaskError::validation(format!(
                "Unknown priority '{}'. Supported: low, medium, high.",
                other
            ))),
        }
    }
}

/// Recurrence cadence.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Monthly => "monthly",
            RecurrenceType::Yearly => "yearly",
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            RecurrenceType::Daily => "day",
            RecurrenceType::Weekly => "week",
            RecurrenceType::Monthly => "month",
            RecurrenceType::Yearly => "year",
        }
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceType {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(RecurrenceType::Daily),
            "weekly" => Ok(RecurrenceType::Weekly),
            "monthly" => Ok(RecurrenceType::Monthly),
            "yearly" => Ok(RecurrenceType::Yearly),
            other => Err(TaskError::validation(format!(
                "Unknown recurrence pattern '{}'. Supported: daily, weekly, monthly, yearly.",
                other
            ))),
        }
    }
}

/// When a recurrence stops producing occurrences.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "end_type", rename_all = "lowercase")]
pub enum EndCondition {
    #[default]
    Never,
    Date { end_date: NaiveDate },
    Count { count: u32 },
}

impl fmt::Display for EndCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndCondition::Never => f.write_str("never ends"),
            EndCondition::Date { end_date } => write!(f, "until {}", end_date),
            EndCondition::Count { count } => write!(f, "{} times", count),
        }
    }
}

/// How a recurring task repeats.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceSettings {
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    /// Every `interval` units. At least 1.
    pub interval: u32,
    /// Weekday ordinals, 0 = Sunday .. 6 = Saturday. Weekly only.
    #[serde(default)]
    pub weekly_days: BTreeSet<u8>,
    #[serde(flatten)]
    pub end: EndCondition,
}

impl RecurrenceSettings {
    pub fn new(kind: RecurrenceType, interval: u32) -> Self {
        Self {
            kind,
            interval,
            weekly_days: BTreeSet::new(),
            end: EndCondition::Never,
        }
    }

    pub fn with_weekly_days(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.weekly_days = days.into_iter().collect();
        self
    }

    pub fn with_end(mut self, end: EndCondition) -> Self {
        self.end = end;
        self
    }

    /// Checks the settings against the date the recurrence starts on.
    pub fn validate(&self, start: NaiveDate) -> Result<()> {
        if self.interval == 0 {
            return Err(TaskError::validation("Recurrence interval must be at least 1."));
        }
        if let Some(day) = self.weekly_days.iter().find(|d| **d > 6) {
            return Err(TaskError::validation(format!(
                "Weekday {} is out of range (0 = Sunday .. 6 = Saturday).",
                day
            )));
        }
        match self.end {
            EndCondition::Count { count: 0 } => {
                Err(TaskError::validation("Recurrence count must be at least 1."))
            }
            EndCondition::Date { end_date } if end_date < start => Err(TaskError::validation(format!(
                "Recurrence end date {} is before the start date {}.",
                end_date, start
            ))),
            _ => Ok(()),
        }
    }

    /// Short human description, e.g. "every 2 weeks on Mon, Wed until 2024-03-01".
    pub fn describe(&self) -> String {
        let mut s = if self.interval == 1 {
            format!("every {}", self.kind.unit())
        } else {
            format!("every {} {}s", self.interval, self.kind.unit())
        };
        if self.kind == RecurrenceType::Weekly && !self.weekly_days.is_empty() {
            let names: Vec<&str> = self.weekly_days.iter().map(|d| weekday_name(*d)).collect();
            s.push_str(" on ");
            s.push_str(&names.join(", "));
        }
        s.push(' ');
        s.push_str(&self.end.to_string());
        s
    }
}

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const WEEKDAY_FULL_NAMES: [&str; 7] =
    ["sunday", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday"];

fn weekday_name(ordinal: u8) -> &'static str {
    WEEKDAY_NAMES.get(ordinal as usize).copied().unwrap_or("?")
}

/// Parses a comma separated weekday list: names ("mon,wed") or ordinals ("1,3").
pub fn parse_weekdays(s: &str) -> Result<BTreeSet<u8>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if let Ok(n) = part.parse::<u8>() {
                return if n <= 6 {
                    Ok(n)
                } else {
                    Err(TaskError::validation(format!(
                        "Weekday {} is out of range (0 = Sunday .. 6 = Saturday).",
                        n
                    )))
                };
            }
            let lower = part.to_lowercase();
            (0..7)
                .find(|&i| {
                    lower.eq_ignore_ascii_case(WEEKDAY_NAMES[i]) || lower == WEEKDAY_FULL_NAMES[i]
                })
                .map(|i| i as u8)
                .ok_or_else(|| TaskError::validation(format!("Unknown weekday '{}'.", part)))
        })
        .collect()
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
        TaskError::validation(format!("Invalid date '{}': {}. Use YYYY-MM-DD.", s, e))
    })
}

/// Parses an `HH:MM` reminder time.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| {
        TaskError::validation(format!("Invalid time '{}': {}. Use HH:MM.", s, e))
    })
}

/// Everything a user fills in before creating a task, committed in one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub text: String,
    pub priority: Priority,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reminder_time: Option<NaiveTime>,
    pub recurrence: Option<RecurrenceSettings>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Rejects blank text, an inverted date window and bad recurrence settings.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(TaskError::validation("Task text cannot be empty."));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(TaskError::validation(format!(
                    "End date {} is before start date {}.",
                    end, start
                )));
            }
        }
        if let Some(settings) = &self.recurrence {
            settings.validate(self.start_date.unwrap_or(today))?;
        }
        Ok(())
    }

    /// Validates the draft and turns it into a task template.
    pub fn into_task(self, id: String, created_at: DateTime<Local>) -> Result<Task> {
        self.validate(created_at.date_naive())?;
        Ok(Task {
            id,
            text: self.text.trim().to_string(),
            completed: false,
            created_at,
            completed_at: None,
            priority: self.priority,
            start_date: self.start_date,
            end_date: self.end_date,
            description: self.description.filter(|d| !d.trim().is_empty()),
            category: self.category.filter(|c| !c.trim().is_empty()),
            reminder_time: self.reminder_time,
            recurrence_settings: self.recurrence,
            scheduled_date: None,
            recurrence_info: None,
        })
    }
}

/// Which tasks a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Active => !task.completed,
            TaskFilter::Completed => task.completed,
        }
    }

    /// All -> Active -> Completed -> All.
    pub fn next(&self) -> Self {
        match self {
            TaskFilter::All => TaskFilter::Active,
            TaskFilter::Active => TaskFilter::Completed,
            TaskFilter::Completed => TaskFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskFilter::All => "All Tasks",
            TaskFilter::Active => "Active",
            TaskFilter::Completed => "Completed",
        }
    }
}

impl FromStr for TaskFilter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "active" | "pending" => Ok(TaskFilter::Active),
            "completed" | "done" => Ok(TaskFilter::Completed),
            other => Err(TaskError::validation(format!(
                "Unknown filter '{}'. Supported: all, active, completed.",
                other
            ))),
        }
    }
}
