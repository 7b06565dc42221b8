use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Western Indonesian Time, UTC+7. All timestamps are shown in it.
const WIB_OFFSET_SECS: i32 = 7 * 3600;

fn wib() -> FixedOffset {
    FixedOffset::east_opt(WIB_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// `Rp 1.234.567`, dots grouping thousands.
pub fn fmt_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// `16/10/2026`
pub fn fmt_date(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&wib()).format("%d/%m/%Y").to_string()
}

/// `16 October 2026`
pub fn fmt_date_long(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&wib()).format("%-d %B %Y").to_string()
}

/// `17:05 WIB`
pub fn fmt_time_wib(ts: &DateTime<Utc>) -> String {
    format!("{} WIB", ts.with_timezone(&wib()).format("%H:%M"))
}

/// `<user>_<unix millis>.jpg`, the naming used for both buckets.
pub fn object_name(user_id: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}.jpg", user_id, now.timestamp_millis())
}
