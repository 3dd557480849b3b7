use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// Convert a UTC instant to institution wall-clock time.
///
/// Attendance day boundaries live in a single configured timezone
/// (TZ_OFFSET_MINUTES), not in whatever timezone the server process happens
/// to run in.
pub fn to_local(utc: DateTime<Utc>, offset_minutes: i32) -> NaiveDateTime {
    let offset = FixedOffset::east_opt(offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    utc.with_timezone(&offset).naive_local()
}

/// Current institution wall-clock time.
pub fn local_now(offset_minutes: i32) -> NaiveDateTime {
    to_local(Utc::now(), offset_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn utc_plus_seven_shifts_the_day_boundary() {
        // 17:30 UTC on Jan 4 is already 00:30 Jan 5 in UTC+7
        let utc = Utc.with_ymd_and_hms(2026, 1, 4, 17, 30, 0).unwrap();
        let local = to_local(utc, 420);
        assert_eq!(local.date(), NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
    }

    #[test]
    fn zero_offset_is_identity() {
        let utc = Utc.with_ymd_and_hms(2026, 1, 4, 17, 30, 0).unwrap();
        assert_eq!(to_local(utc, 0), utc.naive_utc());
    }

    #[test]
    fn negative_offsets_work() {
        let utc = Utc.with_ymd_and_hms(2026, 1, 5, 2, 0, 0).unwrap();
        let local = to_local(utc, -300); // UTC-5
        assert_eq!(local.date(), NaiveDate::from_ymd_opt(2026, 1, 4).unwrap());
    }
}
