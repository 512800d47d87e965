use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Excel date system used to interpret serial date numbers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSystem {
    /// The 1900 date system (default), including the Lotus 1-2-3 leap-year
    /// bug: serial 60 is the nonexistent 1900-02-29.
    #[default]
    V1900,
    /// The 1904 date system (serial 0 = 1904-01-01).
    V1904,
}

impl DateSystem {
    fn epoch(self) -> NaiveDate {
        match self {
            // Serial 1 is 1900-01-01, so the epoch sits one day before.
            DateSystem::V1900 => NaiveDate::from_ymd_opt(1899, 12, 31).expect("valid epoch"),
            DateSystem::V1904 => NaiveDate::from_ymd_opt(1904, 1, 1).expect("valid epoch"),
        }
    }

    /// Convert a calendar date to its serial number under this date system.
    pub fn serial_from_date(self, date: NaiveDate) -> f64 {
        let days = (date - self.epoch()).num_days() as f64;
        match self {
            // Compensate for the phantom 1900-02-29 Lotus kept.
            DateSystem::V1900 if date >= NaiveDate::from_ymd_opt(1900, 3, 1).expect("valid") => {
                days + 1.0
            }
            DateSystem::V1900 => days,
            DateSystem::V1904 => days,
        }
    }

    /// Convert a date-time to a fractional serial number.
    pub fn serial_from_datetime(self, dt: NaiveDateTime) -> f64 {
        let day = self.serial_from_date(dt.date());
        let seconds = dt.time().num_seconds_from_midnight() as f64
            + dt.time().nanosecond() as f64 / 1_000_000_000.0;
        day + seconds / 86_400.0
    }

    /// Convert a serial number back to a calendar date, when representable.
    pub fn date_from_serial(self, serial: f64) -> Option<NaiveDate> {
        let mut days = serial.floor() as i64;
        if self == DateSystem::V1900 {
            // Serial 60 is the phantom leap day; it has no calendar date.
            if days == 60 {
                return None;
            }
            if days > 60 {
                days -= 1;
            }
        }
        self.epoch().checked_add_signed(Duration::days(days))
    }

    /// Convert a fractional serial number back to a date-time.
    pub fn datetime_from_serial(self, serial: f64) -> Option<NaiveDateTime> {
        let date = self.date_from_serial(serial)?;
        let frac = serial - serial.floor();
        let seconds = (frac * 86_400.0).round() as u32;
        let (h, rem) = (seconds / 3600, seconds % 3600);
        let (m, s) = (rem / 60, rem % 60);
        date.and_hms_opt(h.min(23), m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_1900_known_values() {
        let sys = DateSystem::V1900;
        let d = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
        assert_eq!(sys.serial_from_date(d), 1.0);

        // Post-bug dates include the phantom day.
        let d = NaiveDate::from_ymd_opt(1900, 3, 1).unwrap();
        assert_eq!(sys.serial_from_date(d), 61.0);

        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(sys.serial_from_date(d), 43831.0);
    }

    #[test]
    fn serial_roundtrip() {
        let sys = DateSystem::V1900;
        let d = NaiveDate::from_ymd_opt(1987, 6, 5).unwrap();
        let serial = sys.serial_from_date(d);
        assert_eq!(sys.date_from_serial(serial), Some(d));
    }

    #[test]
    fn phantom_leap_day_has_no_date() {
        assert_eq!(DateSystem::V1900.date_from_serial(60.0), None);
    }

    #[test]
    fn serial_1904_epoch() {
        let sys = DateSystem::V1904;
        let d = NaiveDate::from_ymd_opt(1904, 1, 1).unwrap();
        assert_eq!(sys.serial_from_date(d), 0.0);
    }

    #[test]
    fn datetime_fraction() {
        let sys = DateSystem::V1900;
        let dt = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let serial = sys.serial_from_datetime(dt);
        assert_eq!(serial, 43831.5);
        assert_eq!(sys.datetime_from_serial(serial), Some(dt));
    }
}
