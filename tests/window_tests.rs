use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Asia::Hong_Kong;
use topic_digest::core::window::{
    DEFAULT_WINDOW_HOURS, MAX_LOOKBACK_HOURS, OVERNIGHT_WINDOW_HOURS, TimeWindow,
    default_window_hours,
};

#[test]
fn test_daytime_run_looks_back_four_hours() {
    // 14:00 in Hong Kong
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 6, 0, 0).unwrap();
    assert_eq!(default_window_hours(now, Hong_Kong), DEFAULT_WINDOW_HOURS);

    let window = TimeWindow::resolve(now, None, Hong_Kong);
    assert_eq!(window.cutoff(), now - Duration::hours(4));
    assert_eq!(window.end, now);
    assert_eq!(window.hours(), 4);
}

#[test]
fn test_morning_run_covers_the_night() {
    // 08:00 in Hong Kong
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap();
    assert_eq!(default_window_hours(now, Hong_Kong), OVERNIGHT_WINDOW_HOURS);
    let window = TimeWindow::resolve(now, None, Hong_Kong);
    assert_eq!(window.hours(), 12);

    // 10:00 sharp is daytime again
    let ten = Utc.with_ymd_and_hms(2025, 3, 14, 2, 0, 0).unwrap();
    assert_eq!(default_window_hours(ten, Hong_Kong), DEFAULT_WINDOW_HOURS);
}

#[test]
fn test_last_run_sets_the_start() {
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 6, 0, 0).unwrap();
    let last = now - Duration::minutes(90);
    let window = TimeWindow::resolve(now, Some(last), Hong_Kong);
    assert_eq!(window.start, last);
    assert_eq!(window.hours(), 2, "partial hours round up");
}

#[test]
fn test_future_last_run_is_ignored() {
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 6, 0, 0).unwrap();
    let window = TimeWindow::resolve(now, Some(now + Duration::hours(1)), Hong_Kong);
    assert_eq!(window.start, now - Duration::hours(DEFAULT_WINDOW_HOURS));
}

#[test]
fn test_stale_last_run_is_clamped() {
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 6, 0, 0).unwrap();
    let window = TimeWindow::resolve(now, Some(now - Duration::days(10)), Hong_Kong);
    assert_eq!(window.start, now - Duration::hours(MAX_LOOKBACK_HOURS));
}

#[test]
fn test_last_run_boundaries() {
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 6, 0, 0).unwrap();

    let same_instant = TimeWindow::resolve(now, Some(now), Hong_Kong);
    assert_eq!(same_instant.start, now - Duration::hours(DEFAULT_WINDOW_HOURS));

    let oldest_kept = now - Duration::hours(MAX_LOOKBACK_HOURS);
    let window = TimeWindow::resolve(now, Some(oldest_kept), Hong_Kong);
    assert_eq!(window.start, oldest_kept);
    assert_eq!(window.hours(), MAX_LOOKBACK_HOURS);
}

#[test]
fn test_label_uses_display_timezone() {
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 6, 0, 0).unwrap();
    let window = TimeWindow::resolve(now, None, Hong_Kong);
    assert_eq!(window.label(), "03/14 10:00 - 03/14 14:00 (Asia/Hong_Kong)");
}
