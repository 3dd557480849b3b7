use serde::Serialize;
use sqlx::MySqlPool;

pub const CHECK_IN_MINUTE: &str = "check_in_minute";
pub const CHECK_OUT_MINUTE: &str = "check_out_minute";
pub const LATE_TOLERANCE_MINUTES: &str = "late_tolerance_minutes";

/// Snapshot of the attendance configuration at one point in time.
/// Passed explicitly into the status engine so it stays pure; callers
/// should load one snapshot per request, never re-read mid-operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttendanceSettings {
    /// Standard check-in time as minute-of-day (480 = 08:00).
    pub check_in_minute: u32,
    /// Standard check-out time as minute-of-day (960 = 16:00).
    pub check_out_minute: u32,
    /// Grace period after check_in_minute that still counts as present.
    pub late_tolerance_minutes: u32,
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self {
            check_in_minute: 480,
            check_out_minute: 960,
            late_tolerance_minutes: 15,
        }
    }
}

impl AttendanceSettings {
    /// Load the three attendance keys, falling back to defaults for any
    /// missing or unparseable row.
    pub async fn load(pool: &MySqlPool) -> Result<Self, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT name, value FROM settings WHERE name IN (?, ?, ?)",
        )
        .bind(CHECK_IN_MINUTE)
        .bind(CHECK_OUT_MINUTE)
        .bind(LATE_TOLERANCE_MINUTES)
        .fetch_all(pool)
        .await?;

        let mut settings = Self::default();
        for (name, value) in rows {
            let Ok(parsed) = value.parse::<u32>() else {
                tracing::warn!(name, value, "Ignoring unparseable setting");
                continue;
            };
            match name.as_str() {
                CHECK_IN_MINUTE => settings.check_in_minute = parsed,
                CHECK_OUT_MINUTE => settings.check_out_minute = parsed,
                LATE_TOLERANCE_MINUTES => settings.late_tolerance_minutes = parsed,
                _ => {}
            }
        }
        Ok(settings)
    }
}

/// Render a minute-of-day value as "HH:MM" for API responses.
pub fn format_minute_of_day(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_institution_schedule() {
        let s = AttendanceSettings::default();
        assert_eq!(s.check_in_minute, 480);
        assert_eq!(s.check_out_minute, 960);
        assert_eq!(s.late_tolerance_minutes, 15);
    }

    #[test]
    fn minute_of_day_formats_as_hh_mm() {
        assert_eq!(format_minute_of_day(0), "00:00");
        assert_eq!(format_minute_of_day(480), "08:00");
        assert_eq!(format_minute_of_day(965), "16:05");
        assert_eq!(format_minute_of_day(1439), "23:59");
    }
}
