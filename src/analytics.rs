//! Summaries over stored tasks for the `stats` and `dashboard` views.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Result, TaskError};
use crate::models::{Priority, Task};

/// Overall counts shown above the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        TaskStats {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
        }
    }

    /// Completed share of all tasks, rounded to a whole percent.
    pub fn completion_rate(&self) -> u32 {
        rate(self.completed, self.total)
    }
}

fn rate(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        0
    } else {
        ((part as f64 / whole as f64) * 100.0).round() as u32
    }
}

/// Reporting window for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    /// Current window `[start, now]` and the window just before it.
    ///
    /// `Day` is calendar based (midnight to now, and the same span
    /// yesterday); the others are rolling windows ending now.
    fn windows(&self, now: NaiveDateTime) -> (Window, Window) {
        match self {
            Period::Day => {
                let midnight = now.date().and_time(NaiveTime::MIN);
                let current = Window { start: midnight, end: now };
                let previous = Window {
                    start: midnight - Duration::days(1),
                    end: now - Duration::days(1),
                };
                (current, previous)
            }
            Period::Week => rolling(now, |t| t.checked_sub_signed(Duration::weeks(1))),
            Period::Month => rolling(now, |t| t.checked_sub_months(Months::new(1))),
            Period::Year => rolling(now, |t| t.checked_sub_months(Months::new(12))),
        }
    }
}

fn rolling(now: NaiveDateTime, back: impl Fn(NaiveDateTime) -> Option<NaiveDateTime>) -> (Window, Window) {
    let start = back(now).unwrap_or(NaiveDateTime::MIN);
    let previous_start = back(start).unwrap_or(NaiveDateTime::MIN);
    (
        Window { start, end: now },
        Window { start: previous_start, end: start },
    )
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        })
    }
}

impl FromStr for Period {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "today" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(TaskError::validation(format!(
                "Unknown period '{}'. Supported: day, week, month, year.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Window {
    fn contains(&self, at: &DateTime<Local>) -> bool {
        let at = at.naive_local();
        self.start <= at && at <= self.end
    }
}

/// Activity for tasks created inside one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodSummary {
    pub new_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub completion_rate: u32,
}

impl PeriodSummary {
    fn collect(tasks: &[Task], window: &Window) -> Self {
        let created: Vec<&Task> = tasks.iter().filter(|t| window.contains(&t.created_at)).collect();
        let completed = created.iter().filter(|t| t.completed).count();
        PeriodSummary {
            new_tasks: created.len(),
            completed_tasks: completed,
            pending_tasks: created.len() - completed,
            completion_rate: rate(completed, created.len()),
        }
    }
}

/// Signed percent change from `previous` to `current`, `None` when there is
/// no baseline.
pub fn change_percent(current: usize, previous: usize) -> Option<i64> {
    if previous == 0 {
        return None;
    }
    let delta = current as f64 - previous as f64;
    Some((delta / previous as f64 * 100.0).round() as i64)
}

/// One row of the day-by-day activity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub created: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub period: Period,
    pub current: PeriodSummary,
    pub previous: PeriodSummary,
    /// Open tasks per priority, high first.
    pub open_by_priority: Vec<(Priority, usize)>,
    /// The last seven days, oldest first.
    pub recent: Vec<DailyActivity>,
}

/// Builds the dashboard for `period` as of `now`.
pub fn summarize(tasks: &[Task], period: Period, now: DateTime<Local>) -> Dashboard {
    let (current, previous) = period.windows(now.naive_local());
    let open_by_priority = [Priority::High, Priority::Medium, Priority::Low]
        .into_iter()
        .map(|p| (p, tasks.iter().filter(|t| !t.completed && t.priority == p).count()))
        .collect();
    Dashboard {
        period,
        current: PeriodSummary::collect(tasks, &current),
        previous: PeriodSummary::collect(tasks, &previous),
        open_by_priority,
        recent: daily_activity(tasks, now.date_naive(), 7),
    }
}

/// Tasks created and completed on each of the `days` days ending `today`.
pub fn daily_activity(tasks: &[Task], today: NaiveDate, days: u32) -> Vec<DailyActivity> {
    (0..days as i64)
        .rev()
        .map(|back| today - Duration::days(back))
        .map(|date| DailyActivity {
            date,
            created: tasks.iter().filter(|t| t.created_at.date_naive() == date).count(),
            completed: tasks
                .iter()
                .filter(|t| t.completed_at.is_some_and(|c| c.date_naive() == date))
                .count(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskDraft;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).earliest().unwrap()
    }

    fn task(id: &str, created: DateTime<Local>, done: Option<DateTime<Local>>) -> Task {
        let mut t = TaskDraft::new(format!("task {id}")).into_task(id.into(), created).unwrap();
        if let Some(when) = done {
            t.toggle_completed(when);
        }
        t
    }

    #[test]
    fn stats_count_completed_and_pending() {
        let now = at(2024, 3, 10, 12);
        let tasks = vec![task("1", now, Some(now)), task("2", now, None), task("3", now, None)];
        let stats = TaskStats::from_tasks(&tasks);
        assert_eq!(stats, TaskStats { total: 3, completed: 1, pending: 2 });
        assert_eq!(stats.completion_rate(), 33);
        assert_eq!(TaskStats::from_tasks(&[]).completion_rate(), 0);
    }

    #[test]
    fn day_window_compares_with_yesterday() {
        let now = at(2024, 3, 10, 12);
        let tasks = vec![
            task("1", at(2024, 3, 10, 8), Some(at(2024, 3, 10, 9))),
            task("2", at(2024, 3, 10, 10), None),
            task("3", at(2024, 3, 9, 7), None),
            // Yesterday but later than "now" on the clock: outside both windows.
            task("4", at(2024, 3, 9, 20), None),
        ];
        let dash = summarize(&tasks, Period::Day, now);
        assert_eq!(dash.current.new_tasks, 2);
        assert_eq!(dash.current.completed_tasks, 1);
        assert_eq!(dash.current.pending_tasks, 1);
        assert_eq!(dash.current.completion_rate, 50);
        assert_eq!(dash.previous.new_tasks, 1);
        assert_eq!(change_percent(dash.current.new_tasks, dash.previous.new_tasks), Some(100));
    }

    #[test]
    fn week_window_is_rolling() {
        let now = at(2024, 3, 10, 12);
        let tasks = vec![
            task("1", at(2024, 3, 4, 12), None),
            task("2", at(2024, 3, 1, 12), None),
            task("3", at(2024, 2, 20, 12), None),
        ];
        let dash = summarize(&tasks, Period::Week, now);
        assert_eq!(dash.current.new_tasks, 1);
        assert_eq!(dash.previous.new_tasks, 1);
    }

    #[test]
    fn open_tasks_by_priority_and_recent_days() {
        let now = at(2024, 3, 10, 12);
        let mut high = task("1", at(2024, 3, 10, 8), None);
        high.priority = Priority::High;
        let tasks = vec![high, task("2", at(2024, 3, 8, 8), Some(at(2024, 3, 9, 8)))];
        let dash = summarize(&tasks, Period::Month, now);
        assert_eq!(
            dash.open_by_priority,
            vec![(Priority::High, 1), (Priority::Medium, 0), (Priority::Low, 0)]
        );
        assert_eq!(dash.recent.len(), 7);
        assert_eq!(dash.recent[6].date, now.date_naive());
        assert_eq!(dash.recent[6].created, 1);
        assert_eq!(dash.recent[5].completed, 1);
        assert_eq!(dash.recent[4].created, 1);
    }

    #[test]
    fn no_baseline_means_no_change() {
        assert_eq!(change_percent(5, 0), None);
        assert_eq!(change_percent(3, 4), Some(-25));
    }
}
