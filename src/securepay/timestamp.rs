use chrono::{DateTime, FixedOffset, Local};

/// Encodes `at` the way SecurePay expects a `messageTimestamp`:
/// `YYYYDDMMHHMMSS`, milliseconds, `000` for microseconds, then the signed
/// offset from UTC in minutes.
///
/// Day comes before month. The gateway rejects ISO ordering.
pub fn encode(at: &DateTime<FixedOffset>) -> String {
    let millis = at.timestamp_subsec_millis().min(999);
    let offset_minutes = at.offset().local_minus_utc() / 60;

    format!(
        "{}{:03}000{:+04}",
        at.format("%Y%d%m%H%M%S"),
        millis,
        offset_minutes
    )
}

/// Current local time, with the local UTC offset attached.
pub fn now() -> DateTime<FixedOffset> {
    let now = Local::now();
    now.with_timezone(now.offset())
}
