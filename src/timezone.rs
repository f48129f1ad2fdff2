//! Helpers for resolving the server's configured timezone.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// Get the UTC offset for a canonical timezone name, e.g. "America/Sao_Paulo".
///
/// Returns `None` if the name is not a canonical timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in the timezone with the given UTC offset.
pub fn local_date(offset: UtcOffset) -> time::Date {
    OffsetDateTime::now_utc().to_offset(offset).date()
}
