use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::model::settings::AttendanceSettings;

/// Categorical outcome for one attendance day.
///
/// `determine_status` only ever produces Present or Late; the other three are
/// assigned by administrative manual entry. There is no automatic end-of-day
/// sweep that marks no-shows absent.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Excused,
    Sick,
}

/// Derive the status for a check-in at the given local wall-clock time.
///
/// Anything up to the standard check-in minute, or inside the tolerance
/// window after it, is present; later is late.
pub fn determine_status(check_in: NaiveDateTime, settings: &AttendanceSettings) -> AttendanceStatus {
    let minute_of_day = check_in.hour() * 60 + check_in.minute();
    if minute_of_day <= settings.check_in_minute + settings.late_tolerance_minutes {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Late
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn settings() -> AttendanceSettings {
        AttendanceSettings {
            check_in_minute: 480,
            check_out_minute: 960,
            late_tolerance_minutes: 15,
        }
    }

    #[test]
    fn before_standard_time_is_present() {
        assert_eq!(determine_status(at(6, 0), &settings()), AttendanceStatus::Present);
        assert_eq!(determine_status(at(7, 50), &settings()), AttendanceStatus::Present);
        assert_eq!(determine_status(at(8, 0), &settings()), AttendanceStatus::Present);
    }

    #[test]
    fn within_tolerance_is_present() {
        assert_eq!(determine_status(at(8, 1), &settings()), AttendanceStatus::Present);
        assert_eq!(determine_status(at(8, 10), &settings()), AttendanceStatus::Present);
        assert_eq!(determine_status(at(8, 15), &settings()), AttendanceStatus::Present);
    }

    #[test]
    fn past_tolerance_is_late() {
        assert_eq!(determine_status(at(8, 16), &settings()), AttendanceStatus::Late);
        assert_eq!(determine_status(at(11, 30), &settings()), AttendanceStatus::Late);
        assert_eq!(determine_status(at(23, 59), &settings()), AttendanceStatus::Late);
    }

    #[test]
    fn zero_tolerance_makes_grace_window_empty() {
        let s = AttendanceSettings {
            late_tolerance_minutes: 0,
            ..settings()
        };
        assert_eq!(determine_status(at(8, 0), &s), AttendanceStatus::Present);
        assert_eq!(determine_status(at(8, 1), &s), AttendanceStatus::Late);
    }

    #[test]
    fn seconds_are_ignored() {
        // 08:15:59 is still minute 495, inside the window
        let t = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(8, 15, 59)
            .unwrap();
        assert_eq!(determine_status(t, &settings()), AttendanceStatus::Present);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(AttendanceStatus::Present.to_string(), "present");
        assert_eq!(AttendanceStatus::Sick.to_string(), "sick");
        assert_eq!(
            "excused".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::Excused
        );
        assert!("unknown".parse::<AttendanceStatus>().is_err());
    }
}
