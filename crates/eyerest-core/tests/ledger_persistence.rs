//! Statistics ledger against a real file.

use chrono::{Days, NaiveDate};
use eyerest_core::StatisticsLedger;
use proptest::prelude::*;
use tempfile::TempDir;

fn test_context() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("statistics.json");
    (dir, path)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn completions_survive_reopen() {
    let (_dir, path) = test_context();
    let today = day(2024, 6, 3);

    let mut ledger = StatisticsLedger::open(&path);
    ledger
        .record_completion_as_of(today.and_hms_opt(10, 5, 0).unwrap(), today)
        .unwrap();
    ledger
        .record_completion_as_of(today.and_hms_opt(16, 40, 0).unwrap(), today)
        .unwrap();

    let reopened = StatisticsLedger::open(&path);
    assert_eq!(reopened.total_count(), 2);
    assert_eq!(reopened.today_count_as_of(today), 2);
    let hourly = reopened.hourly_records_as_of(today);
    assert_eq!(hourly[10].completed, 1);
    assert_eq!(hourly[16].completed, 1);
}

#[test]
fn file_layout_is_plain_json() {
    let (_dir, path) = test_context();
    let today = day(2024, 6, 3);
    let mut ledger = StatisticsLedger::open(&path);
    ledger
        .record_completion_as_of(today.and_hms_opt(9, 0, 0).unwrap(), today)
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["total_completed"], 1);
    assert_eq!(json["daily_records"][0]["date"], "2024-06-03");
    assert_eq!(json["daily_records"][0]["completed"], 1);
    assert_eq!(json["today_hourly"]["hours"][9], 1);
}

#[test]
fn corrupt_file_starts_empty() {
    let (_dir, path) = test_context();
    std::fs::write(&path, "{ total_completed: oops").unwrap();

    let ledger = StatisticsLedger::open(&path);

    assert_eq!(ledger.total_count(), 0);
    assert!(ledger.daily_records().is_empty());
}

#[test]
fn older_files_without_hourly_data_load() {
    let (_dir, path) = test_context();
    std::fs::write(
        &path,
        r#"{"total_completed": 7, "daily_records": [{"date": "2024-06-02", "completed": 3}, {"date": "2024-06-01", "completed": 4}]}"#,
    )
    .unwrap();

    let ledger = StatisticsLedger::open(&path);

    assert_eq!(ledger.total_count(), 7);
    assert_eq!(ledger.daily_records()[0].date, day(2024, 6, 1));
    assert_eq!(ledger.average_daily_count(), 3.5);
    assert!(ledger
        .hourly_records_as_of(day(2024, 6, 2))
        .iter()
        .all(|h| h.completed == 0));
}

#[test]
fn reset_persists_an_empty_ledger() {
    let (_dir, path) = test_context();
    let today = day(2024, 6, 3);
    let mut ledger = StatisticsLedger::open(&path);
    ledger
        .record_completion_as_of(today.and_hms_opt(9, 0, 0).unwrap(), today)
        .unwrap();

    ledger.reset().unwrap();

    let reopened = StatisticsLedger::open(&path);
    assert_eq!(reopened.total_count(), 0);
    assert_eq!(reopened.today_count_as_of(today), 0);
    assert_eq!(reopened.week_count_as_of(today), 0);
    assert_eq!(reopened.average_daily_count(), 0.0);
}

#[test]
fn unwritable_location_keeps_counting_in_memory() {
    let (dir, _) = test_context();
    // A directory where the file should be makes every write fail.
    let path = dir.path().join("blocked");
    std::fs::create_dir(&path).unwrap();
    let today = day(2024, 6, 3);

    let mut ledger = StatisticsLedger::open(&path);
    let result = ledger.record_completion_as_of(today.and_hms_opt(9, 0, 0).unwrap(), today);

    assert!(result.is_err());
    assert_eq!(ledger.total_count(), 1);
}

proptest! {
    #[test]
    fn counts_add_up(offsets in prop::collection::vec(0u64..60, 0..80)) {
        let today = day(2024, 6, 30);
        let mut ledger = StatisticsLedger::in_memory();
        for back in &offsets {
            let date = today.checked_sub_days(Days::new(*back)).unwrap();
            ledger
                .record_completion_as_of(date.and_hms_opt(12, 0, 0).unwrap(), today)
                .unwrap();
        }

        prop_assert_eq!(ledger.total_count(), offsets.len() as u64);

        let retained = offsets.iter().filter(|&&b| b <= 30).count() as u32;
        let kept: u32 = ledger.daily_records().iter().map(|r| r.completed).sum();
        prop_assert_eq!(kept, retained);

        let today_hits = offsets.iter().filter(|&&b| b == 0).count() as u32;
        prop_assert_eq!(ledger.today_count_as_of(today), today_hits);

        let recent = ledger.recent_daily_records_as_of(7, today);
        prop_assert_eq!(recent.len(), 7);
        prop_assert_eq!(recent[6].date, today);
        prop_assert!(recent.windows(2).all(|w| w[0].date < w[1].date));
    }
}
