//! Recurrence expansion: turns one recurring task template into a bounded,
//! ordered list of dated task instances.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};

use crate::models::{EndCondition, RecurrenceInfo, RecurrenceSettings, RecurrenceType, Task};

/// Ceilings on how many instances one expansion may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionLimits {
    /// Applies to every expansion regardless of its end condition.
    pub max_occurrences: usize,
    /// Applies to recurrences with no end date and no count.
    pub open_ended_occurrences: usize,
}

impl ExpansionLimits {
    pub const DEFAULT_MAX_OCCURRENCES: usize = 50;
    pub const DEFAULT_OPEN_ENDED_OCCURRENCES: usize = 10;
    /// Largest ceiling a configuration may set.
    pub const CEILING_LIMIT: usize = 1000;

    /// Number of instances an end condition may produce under these limits.
    pub fn cap_for(&self, end: &EndCondition) -> usize {
        match end {
            EndCondition::Count { count } => (*count as usize).min(self.max_occurrences),
            EndCondition::Never => self.open_ended_occurrences.min(self.max_occurrences),
            EndCondition::Date { .. } => self.max_occurrences,
        }
    }
}

impl Default for ExpansionLimits {
    fn default() -> Self {
        Self {
            max_occurrences: Self::DEFAULT_MAX_OCCURRENCES,
            open_ended_occurrences: Self::DEFAULT_OPEN_ENDED_OCCURRENCES,
        }
    }
}

/// Result of expanding a task.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub instances: Vec<Task>,
    /// Instances the user asked for, when the end condition is a count.
    pub requested: Option<usize>,
    /// True when a ceiling cut the sequence short of what was asked for.
    pub truncated: bool,
}

impl Expansion {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Expands `base` into concrete instances.
///
/// A task without recurrence settings comes back unchanged as the only
/// element. Otherwise instances start at `base.start_date` (or `today`)
/// and follow the cadence until the end condition or a ceiling stops them.
///
/// Settings are expected to have passed [`RecurrenceSettings::validate`].
pub fn expand(base: &Task, today: NaiveDate, limits: &ExpansionLimits) -> Expansion {
    let settings = match &base.recurrence_settings {
        Some(settings) => settings,
        None => {
            return Expansion {
                instances: vec![base.clone()],
                requested: None,
                truncated: false,
            }
        }
    };

    let start = base.start_date.unwrap_or(today);
    let cap = limits.cap_for(&settings.end);
    let requested = match settings.end {
        EndCondition::Count { count } => Some(count as usize),
        _ => None,
    };

    let mut instances = Vec::new();
    let mut cursor = Some(start);
    while let Some(date) = cursor {
        if instances.len() >= cap {
            break;
        }
        if let EndCondition::Date { end_date } = settings.end {
            if date > end_date {
                break;
            }
        }
        instances.push(instance(base, date, instances.len()));
        cursor = next_occurrence(settings, start, date, instances.len());
    }

    // A run that ended because the calendar ran out was not capped.
    let truncated = match settings.end {
        EndCondition::Count { count } => instances.len() == cap && cap < count as usize,
        // A date-bounded run stopped by the ceiling rather than the date.
        EndCondition::Date { end_date } => {
            instances.len() == cap
                && cursor.map_or(false, |next| next <= end_date)
        }
        EndCondition::Never => false,
    };
    if truncated {
        tracing::debug!(id = %base.id, generated = instances.len(), cap, "recurrence capped");
    }

    Expansion {
        instances,
        requested,
        truncated,
    }
}

fn instance(base: &Task, date: NaiveDate, index: usize) -> Task {
    let mut task = base.clone();
    task.id = format!("{}_{}", base.id, index);
    task.scheduled_date = Some(date);
    task.recurrence_info = Some(RecurrenceInfo {
        is_recurring: true,
        original_id: base.id.clone(),
        sequence: index as u32 + 1,
    });
    task
}

/// Date of occurrence number `emitted` (zero-based), given the previous one.
///
/// Monthly and yearly steps are measured from `start` so a day-of-month that
/// was clamped once (Jan 31 -> Feb 29) springs back in longer months.
/// Returns `None` when the calendar runs out or no weekday matches.
fn next_occurrence(
    settings: &RecurrenceSettings,
    start: NaiveDate,
    cursor: NaiveDate,
    emitted: usize,
) -> Option<NaiveDate> {
    let interval = settings.interval.max(1);
    match settings.kind {
        RecurrenceType::Daily => cursor.checked_add_signed(Duration::days(interval as i64)),
        RecurrenceType::Weekly if settings.weekly_days.is_empty() => {
            cursor.checked_add_signed(Duration::weeks(interval as i64))
        }
        RecurrenceType::Weekly => next_weekday(cursor, settings, interval),
        RecurrenceType::Monthly => {
            let months = (emitted as u32).checked_mul(interval)?;
            start.checked_add_months(Months::new(months))
        }
        RecurrenceType::Yearly => {
            let months = (emitted as u32).checked_mul(interval)?.checked_mul(12)?;
            start.checked_add_months(Months::new(months))
        }
    }
}

/// Walks forward a day at a time, at most `7 * interval` steps, to the next
/// selected weekday. Entering a new Sunday-started week skips the
/// `interval - 1` weeks that are not part of the schedule.
fn next_weekday(cursor: NaiveDate, settings: &RecurrenceSettings, interval: u32) -> Option<NaiveDate> {
    let mut day = cursor;
    for _ in 0..interval.saturating_mul(7) {
        day = day.succ_opt()?;
        if day.weekday() == Weekday::Sun && interval > 1 {
            day = day.checked_add_signed(Duration::weeks(interval as i64 - 1))?;
        }
        let ordinal = day.weekday().num_days_from_sunday() as u8;
        if settings.weekly_days.contains(&ordinal) {
            return Some(day);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskDraft;
    use chrono::Local;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn recurring(start: NaiveDate, settings: RecurrenceSettings) -> Task {
        let mut draft = TaskDraft::new("Water plants");
        draft.start_date = Some(start);
        draft.recurrence = Some(settings);
        draft.into_task("7".into(), Local::now()).unwrap()
    }

    fn dates(expansion: &Expansion) -> Vec<NaiveDate> {
        expansion.instances.iter().filter_map(|t| t.scheduled_date).collect()
    }

    #[test]
    fn non_recurring_task_is_returned_unchanged() {
        let task = TaskDraft::new("Once").into_task("1".into(), Local::now()).unwrap();
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(expansion.instances, vec![task]);
        assert!(expansion.instances[0].recurrence_info.is_none());
        assert!(!expansion.truncated);
    }

    #[test]
    fn water_plants_every_other_day() {
        let task = recurring(
            date(2024, 1, 1),
            RecurrenceSettings::new(RecurrenceType::Daily, 2).with_end(EndCondition::Count { count: 3 }),
        );
        let expansion = expand(&task, date(2030, 1, 1), &ExpansionLimits::default());
        assert_eq!(dates(&expansion), vec![date(2024, 1, 1), date(2024, 1, 3), date(2024, 1, 5)]);
        let ids: Vec<&str> = expansion.instances.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["7_0", "7_1", "7_2"]);
        for (i, t) in expansion.instances.iter().enumerate() {
            let info = t.recurrence_info.as_ref().unwrap();
            assert!(info.is_recurring);
            assert_eq!(info.original_id, "7");
            assert_eq!(info.sequence, i as u32 + 1);
            assert_eq!(t.text, "Water plants");
        }
    }

    #[test]
    fn missing_start_uses_today() {
        let mut task = recurring(
            date(2024, 1, 1),
            RecurrenceSettings::new(RecurrenceType::Daily, 1).with_end(EndCondition::Count { count: 2 }),
        );
        task.start_date = None;
        let expansion = expand(&task, date(2025, 6, 1), &ExpansionLimits::default());
        assert_eq!(dates(&expansion), vec![date(2025, 6, 1), date(2025, 6, 2)]);
    }

    #[test]
    fn count_is_capped_at_fifty() {
        let task = recurring(
            date(2024, 1, 1),
            RecurrenceSettings::new(RecurrenceType::Daily, 1).with_end(EndCondition::Count { count: 80 }),
        );
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(expansion.len(), 50);
        assert_eq!(expansion.requested, Some(80));
        assert!(expansion.truncated);
    }

    #[test]
    fn never_ending_is_capped_at_ten() {
        let task = recurring(date(2024, 1, 1), RecurrenceSettings::new(RecurrenceType::Yearly, 1));
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(expansion.len(), 10);
        assert!(!expansion.truncated);
        assert_eq!(dates(&expansion)[9], date(2033, 1, 1));
    }

    #[test]
    fn configured_ceilings_apply() {
        let limits = ExpansionLimits {
            max_occurrences: 4,
            open_ended_occurrences: 25,
        };
        let never = recurring(date(2024, 1, 1), RecurrenceSettings::new(RecurrenceType::Daily, 1));
        assert_eq!(expand(&never, date(2024, 1, 1), &limits).len(), 4);
    }

    #[test]
    fn end_date_bounds_the_sequence() {
        let end_date = date(2024, 1, 10);
        let task = recurring(
            date(2024, 1, 1),
            RecurrenceSettings::new(RecurrenceType::Daily, 3).with_end(EndCondition::Date { end_date }),
        );
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(
            dates(&expansion),
            vec![date(2024, 1, 1), date(2024, 1, 4), date(2024, 1, 7), date(2024, 1, 10)]
        );
        assert!(!expansion.truncated);
    }

    #[test]
    fn long_date_range_reports_truncation() {
        let task = recurring(
            date(2024, 1, 1),
            RecurrenceSettings::new(RecurrenceType::Daily, 1)
                .with_end(EndCondition::Date { end_date: date(2024, 12, 31) }),
        );
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(expansion.len(), 50);
        assert!(expansion.truncated);
        assert!(dates(&expansion).iter().all(|d| *d <= date(2024, 12, 31)));
    }

    #[test]
    fn weekly_on_selected_days() {
        // 2024-01-01 is a Monday.
        let task = recurring(
            date(2024, 1, 1),
            RecurrenceSettings::new(RecurrenceType::Weekly, 1)
                .with_weekly_days([1, 3, 5])
                .with_end(EndCondition::Count { count: 6 }),
        );
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(
            dates(&expansion),
            vec![
                date(2024, 1, 1),
                date(2024, 1, 3),
                date(2024, 1, 5),
                date(2024, 1, 8),
                date(2024, 1, 10),
                date(2024, 1, 12),
            ]
        );
        for d in dates(&expansion) {
            assert!(matches!(d.weekday(), Weekday::Mon | Weekday::Wed | Weekday::Fri));
        }
    }

    #[test]
    fn weekly_days_respect_multi_week_interval() {
        let task = recurring(
            date(2024, 1, 1),
            RecurrenceSettings::new(RecurrenceType::Weekly, 2)
                .with_weekly_days([1, 5])
                .with_end(EndCondition::Count { count: 5 }),
        );
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(
            dates(&expansion),
            vec![
                date(2024, 1, 1),
                date(2024, 1, 5),
                date(2024, 1, 15),
                date(2024, 1, 19),
                date(2024, 1, 29),
            ]
        );
    }

    #[test]
    fn weekly_days_with_huge_interval_stop_at_calendar_end() {
        let task = recurring(
            date(2024, 1, 1),
            RecurrenceSettings::new(RecurrenceType::Weekly, 700_000_000)
                .with_weekly_days([1, 5])
                .with_end(EndCondition::Count { count: 3 }),
        );
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(dates(&expansion), vec![date(2024, 1, 1), date(2024, 1, 5)]);
        assert_eq!(expansion.requested, Some(3));
        // Running out of calendar is not a ceiling.
        assert!(!expansion.truncated);
    }

    #[test]
    fn unbounded_ceiling_does_not_preallocate() {
        let limits = ExpansionLimits {
            max_occurrences: usize::MAX,
            open_ended_occurrences: 10,
        };
        let task = recurring(
            date(2024, 1, 1),
            RecurrenceSettings::new(RecurrenceType::Daily, 1)
                .with_end(EndCondition::Date { end_date: date(2024, 1, 3) }),
        );
        let expansion = expand(&task, date(2024, 1, 1), &limits);
        assert_eq!(dates(&expansion), vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]);
        assert!(!expansion.truncated);
    }

    #[test]
    fn weekly_without_days_steps_whole_weeks() {
        let task = recurring(
            date(2024, 1, 3),
            RecurrenceSettings::new(RecurrenceType::Weekly, 3).with_end(EndCondition::Count { count: 3 }),
        );
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(dates(&expansion), vec![date(2024, 1, 3), date(2024, 1, 24), date(2024, 2, 14)]);
    }

    #[test]
    fn monthly_from_month_end_clamps() {
        let task = recurring(
            date(2024, 1, 31),
            RecurrenceSettings::new(RecurrenceType::Monthly, 1).with_end(EndCondition::Count { count: 4 }),
        );
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(
            dates(&expansion),
            vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30)]
        );

        let task = recurring(
            date(2023, 1, 31),
            RecurrenceSettings::new(RecurrenceType::Monthly, 1).with_end(EndCondition::Count { count: 2 }),
        );
        let expansion = expand(&task, date(2023, 1, 1), &ExpansionLimits::default());
        assert_eq!(dates(&expansion), vec![date(2023, 1, 31), date(2023, 2, 28)]);
    }

    #[test]
    fn yearly_leap_day() {
        let task = recurring(
            date(2024, 2, 29),
            RecurrenceSettings::new(RecurrenceType::Yearly, 2).with_end(EndCondition::Count { count: 3 }),
        );
        let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
        assert_eq!(dates(&expansion), vec![date(2024, 2, 29), date(2026, 2, 28), date(2028, 2, 29)]);
    }

    #[test]
    fn dates_strictly_increase_and_sequences_have_no_gaps() {
        for kind in [
            RecurrenceType::Daily,
            RecurrenceType::Weekly,
            RecurrenceType::Monthly,
            RecurrenceType::Yearly,
        ] {
            let task = recurring(
                date(2024, 1, 31),
                RecurrenceSettings::new(kind, 1).with_end(EndCondition::Count { count: 50 }),
            );
            let expansion = expand(&task, date(2024, 1, 1), &ExpansionLimits::default());
            assert_eq!(expansion.len(), 50);
            let ds = dates(&expansion);
            assert!(ds.windows(2).all(|w| w[0] < w[1]), "{kind} dates not increasing");
            let seqs: Vec<u32> = expansion
                .instances
                .iter()
                .map(|t| t.recurrence_info.as_ref().unwrap().sequence)
                .collect();
            assert_eq!(seqs, (1..=50).collect::<Vec<u32>>());
        }
    }
}
