use time::{OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros};

const LONG_DATE_TIME: &[BorrowedFormatItem<'static>] =
	macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Formats minor units as a fixed-point decimal with two fraction digits.
pub fn format_amount(amount: i64) -> String {
	let sign = if amount < 0 { "-" } else { "" };
	let abs = amount.unsigned_abs();

	format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Formats unix seconds as `YYYY-MM-DD HH:MM:SS` in the given offset.
pub fn format_long_date_time(unix_time: i64, offset: UtcOffset) -> String {
	let Some(local) = to_local(unix_time, offset) else {
		return unix_time.to_string();
	};

	local.format(LONG_DATE_TIME).unwrap_or_else(|_| unix_time.to_string())
}

/// Calendar `(year, month)` of unix seconds in the given offset.
pub fn year_month(unix_time: i64, offset: UtcOffset) -> Option<(i32, u8)> {
	to_local(unix_time, offset).map(|local| (local.year(), u8::from(local.month())))
}

/// Rounds a similarity score to four decimal places.
pub fn round_score(score: f64) -> f64 {
	(score * 10_000.0).round() / 10_000.0
}

fn to_local(unix_time: i64, offset: UtcOffset) -> Option<OffsetDateTime> {
	OffsetDateTime::from_unix_timestamp(unix_time).ok().map(|utc| utc.to_offset(offset))
}
