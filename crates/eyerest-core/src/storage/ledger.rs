//! JSON-backed ledger of completed rests.
//!
//! Keeps an all-time total, one record per calendar day for the last
//! [`RETENTION_DAYS`] days, and hour-of-day buckets for the current day.
//! Every write rewrites the whole file atomically.
//!
//! Reads that depend on "today" come in two flavors: the plain one uses the
//! local clock, the `_as_of` one takes the date explicitly.

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{data_dir, write_atomic};
use crate::error::LedgerError;

/// Daily records older than this many days are pruned on write.
pub const RETENTION_DAYS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub completed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourlyRecord {
    pub hour: u32,
    pub completed: u32,
}

/// A day in a recent-days listing. Days without completions are included
/// with a zero count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// `MM-DD`
    pub display_date: String,
    pub completed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub today: u32,
    pub week: u32,
    pub total: u64,
    pub average_daily: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct HourlyLog {
    date: NaiveDate,
    hours: [u32; 24],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LedgerData {
    #[serde(default)]
    total_completed: u64,
    #[serde(default)]
    daily_records: Vec<DailyRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    today_hourly: Option<HourlyLog>,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct StatisticsLedger {
    path: Option<PathBuf>,
    data: LedgerData,
}

impl StatisticsLedger {
    /// Open the ledger at `~/.config/eyerest/statistics.json`.
    ///
    /// Falls back to an in-memory ledger if the data directory is unusable.
    pub fn open_default() -> Self {
        match data_dir() {
            Ok(dir) => Self::open(dir.join("statistics.json")),
            Err(e) => {
                warn!(error = %e, "data directory unavailable, statistics will not persist");
                Self::in_memory()
            }
        }
    }

    /// Open the ledger at `path`. A missing, unreadable or corrupt file
    /// yields an empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match Self::read(&path) {
            Ok(Some(data)) => data,
            Ok(None) => LedgerData::default(),
            Err(e) => {
                warn!(error = %e, "statistics unreadable, starting empty");
                LedgerData::default()
            }
        };
        Self {
            path: Some(path),
            data,
        }
    }

    /// A ledger that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: LedgerData::default(),
        }
    }

    fn read(path: &Path) -> Result<Option<LedgerData>, LedgerError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LedgerError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let mut data: LedgerData =
            serde_json::from_str(&content).map_err(|source| LedgerError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;
        data.daily_records.sort_by_key(|r| r.date);
        Ok(Some(data))
    }

    fn save(&self) -> Result<(), LedgerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.data)?;
        write_atomic(path, json.as_bytes()).map_err(|source| LedgerError::WriteFailed {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "statistics saved");
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one completed rest at `at` and persist.
    ///
    /// The in-memory state is updated even if the write fails.
    pub fn record_completion(&mut self, at: DateTime<Local>) -> Result<(), LedgerError> {
        self.record_completion_as_of(at.naive_local(), local_today())
    }

    pub fn record_completion_as_of(
        &mut self,
        at: NaiveDateTime,
        today: NaiveDate,
    ) -> Result<(), LedgerError> {
        let date = at.date();
        self.data.total_completed += 1;

        match self
            .data
            .daily_records
            .binary_search_by_key(&date, |r| r.date)
        {
            Ok(i) => self.data.daily_records[i].completed += 1,
            Err(i) => self
                .data
                .daily_records
                .insert(i, DailyRecord { date, completed: 1 }),
        }

        if self.data.today_hourly.as_ref().map(|h| h.date) != Some(today) {
            self.data.today_hourly = None;
        }
        if date == today {
            let log = self.data.today_hourly.get_or_insert(HourlyLog {
                date: today,
                hours: [0; 24],
            });
            log.hours[at.hour() as usize] += 1;
        }

        if let Some(cutoff) = today.checked_sub_days(Days::new(RETENTION_DAYS)) {
            self.data.daily_records.retain(|r| r.date >= cutoff);
        }

        self.save()
    }

    /// Clear everything and persist.
    pub fn reset(&mut self) -> Result<(), LedgerError> {
        self.data = LedgerData::default();
        self.save()
    }

    // ── Queries ──────────────────────────────────────────────────────

    fn completed_on(&self, date: NaiveDate) -> u32 {
        self.data
            .daily_records
            .binary_search_by_key(&date, |r| r.date)
            .map(|i| self.data.daily_records[i].completed)
            .unwrap_or(0)
    }

    pub fn total_count(&self) -> u64 {
        self.data.total_completed
    }

    pub fn today_count(&self) -> u32 {
        self.today_count_as_of(local_today())
    }

    pub fn today_count_as_of(&self, today: NaiveDate) -> u32 {
        self.completed_on(today)
    }

    /// Completions since the most recent Monday, today included.
    pub fn week_count(&self) -> u32 {
        self.week_count_as_of(local_today())
    }

    pub fn week_count_as_of(&self, today: NaiveDate) -> u32 {
        let since_monday = u64::from(today.weekday().num_days_from_monday());
        let monday = today
            .checked_sub_days(Days::new(since_monday))
            .unwrap_or(today);
        self.data
            .daily_records
            .iter()
            .filter(|r| r.date >= monday && r.date <= today)
            .map(|r| r.completed)
            .sum()
    }

    /// Mean completions over the retained days that have any, rounded to
    /// one decimal. `0.0` when there are none.
    pub fn average_daily_count(&self) -> f64 {
        let active: Vec<u32> = self
            .data
            .daily_records
            .iter()
            .map(|r| r.completed)
            .filter(|&c| c > 0)
            .collect();
        if active.is_empty() {
            return 0.0;
        }
        let sum: u32 = active.iter().sum();
        let avg = f64::from(sum) / active.len() as f64;
        (avg * 10.0).round() / 10.0
    }

    /// Exactly `days` entries ending today, oldest first.
    pub fn recent_daily_records(&self, days: u32) -> Vec<DailySummary> {
        self.recent_daily_records_as_of(days, local_today())
    }

    pub fn recent_daily_records_as_of(&self, days: u32, today: NaiveDate) -> Vec<DailySummary> {
        (0..u64::from(days))
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .map(|date| DailySummary {
                date,
                display_date: date.format("%m-%d").to_string(),
                completed: self.completed_on(date),
            })
            .collect()
    }

    /// 24 hour-of-day buckets for today.
    pub fn hourly_records(&self) -> Vec<HourlyRecord> {
        self.hourly_records_as_of(local_today())
    }

    pub fn hourly_records_as_of(&self, today: NaiveDate) -> Vec<HourlyRecord> {
        let hours = match &self.data.today_hourly {
            Some(log) if log.date == today => log.hours,
            _ => [0; 24],
        };
        hours
            .iter()
            .enumerate()
            .map(|(hour, &completed)| HourlyRecord {
                hour: hour as u32,
                completed,
            })
            .collect()
    }

    pub fn daily_records(&self) -> &[DailyRecord] {
        &self.data.daily_records
    }

    pub fn summary(&self) -> LedgerSummary {
        self.summary_as_of(local_today())
    }

    pub fn summary_as_of(&self, today: NaiveDate) -> LedgerSummary {
        LedgerSummary {
            today: self.today_count_as_of(today),
            week: self.week_count_as_of(today),
            total: self.total_count(),
            average_daily: self.average_daily_count(),
        }
    }
}
