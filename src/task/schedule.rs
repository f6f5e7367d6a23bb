//! Dependency-aware date scheduling.
//!
//! Each task starts on `today` unless a resolvable dependency ends on or
//! after its candidate start, in which case it starts the day after that
//! dependency ends. Dependencies are resolved on demand (memoized depth-first),
//! so the provider's `task_order` only decides which task is touched first.
//!
//! # Invariants
//! - `end_date - start_date + 1 == draft.days()` for every output task
//! - `start_date > end_date(d)` for every resolvable dependency `d`
//! - Unknown dependency titles and self references contribute nothing
//! - A dependency cycle fails with `ScheduleError::CyclicDependency`
//! - No end date falls after year 9999

use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate};

use super::task::{ScheduledTask, TaskDraft};

/// Latest year a stored date may fall in. Later years render with a sign
/// (`+10000-01-01`) and no longer sort as text.
pub const MAX_YEAR: i32 = 9999;

/// Errors produced while assigning dates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Cyclic dependency detected: {}", cycle.join(" -> "))]
    CyclicDependency {
        /// Titles along the cycle; the first title is repeated at the end.
        cycle: Vec<String>,
    },

    #[error("Task '{title}' cannot be scheduled: date out of range")]
    DateOutOfRange { title: String },
}

#[derive(Debug, Clone, Copy)]
enum Mark {
    Unvisited,
    InProgress,
    Done { start: NaiveDate, end: NaiveDate },
}

struct Resolver<'a> {
    drafts: &'a [TaskDraft],
    by_title: HashMap<&'a str, usize>,
    marks: Vec<Mark>,
    /// Indices currently being resolved, outermost first.
    path: Vec<usize>,
    today: NaiveDate,
}

impl<'a> Resolver<'a> {
    fn new(drafts: &'a [TaskDraft], today: NaiveDate) -> Self {
        // Later inserts overwrite earlier ones: the last draft with a title wins.
        let by_title = drafts
            .iter()
            .enumerate()
            .map(|(idx, draft)| (draft.title.as_str(), idx))
            .collect();
        Self {
            drafts,
            by_title,
            marks: vec![Mark::Unvisited; drafts.len()],
            path: Vec::new(),
            today,
        }
    }

    fn resolve(&mut self, idx: usize) -> Result<(NaiveDate, NaiveDate), ScheduleError> {
        if let Mark::Done { start, end } = self.marks[idx] {
            return Ok((start, end));
        }

        self.marks[idx] = Mark::InProgress;
        self.path.push(idx);

        let drafts = self.drafts;
        let draft = &drafts[idx];
        let mut start = self.today;

        for dep_title in &draft.dependencies {
            let Some(&dep_idx) = self.by_title.get(dep_title.as_str()) else {
                tracing::debug!(
                    task = %draft.title,
                    dependency = %dep_title,
                    "Ignoring unknown dependency"
                );
                continue;
            };
            if dep_idx == idx {
                tracing::debug!(task = %draft.title, "Ignoring self dependency");
                continue;
            }
            if matches!(self.marks[dep_idx], Mark::InProgress) {
                return Err(self.cycle_error(dep_idx));
            }

            let (_, dep_end) = self.resolve(dep_idx)?;
            if dep_end >= start {
                start = dep_end
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| ScheduleError::DateOutOfRange {
                        title: draft.title.clone(),
                    })?;
            }
        }

        let end = start
            .checked_add_days(Days::new((draft.days() - 1) as u64))
            .filter(|end| end.year() <= MAX_YEAR)
            .ok_or_else(|| ScheduleError::DateOutOfRange {
                title: draft.title.clone(),
            })?;

        self.path.pop();
        self.marks[idx] = Mark::Done { start, end };
        Ok((start, end))
    }

    fn cycle_error(&self, reentered: usize) -> ScheduleError {
        let from = self
            .path
            .iter()
            .position(|&i| i == reentered)
            .unwrap_or(0);
        let mut cycle: Vec<String> = self.path[from..]
            .iter()
            .map(|&i| self.drafts[i].title.clone())
            .collect();
        cycle.push(self.drafts[reentered].title.clone());
        ScheduleError::CyclicDependency { cycle }
    }
}

/// Assign start and end dates to every draft, relative to `today`.
///
/// The output preserves input order. Drafts that share a title are all
/// scheduled from their own dependency lists, but only the last of them can
/// be referenced as a dependency.
pub fn schedule(
    drafts: Vec<TaskDraft>,
    today: NaiveDate,
) -> Result<Vec<ScheduledTask>, ScheduleError> {
    let mut order: Vec<usize> = (0..drafts.len()).collect();
    // Stable: ties keep input order.
    order.sort_by_key(|&idx| drafts[idx].task_order);

    let mut windows = vec![(today, today); drafts.len()];
    {
        let mut resolver = Resolver::new(&drafts, today);
        for idx in order {
            windows[idx] = resolver.resolve(idx)?;
        }
    }

    Ok(drafts
        .into_iter()
        .zip(windows)
        .map(|(draft, (start_date, end_date))| ScheduledTask {
            draft,
            start_date,
            end_date,
        })
        .collect())
}
