//! Julian-day dates and the business-day roll
//!
//! Times are milliseconds since the UNIX epoch. Dates on the matching path
//! are Julian day numbers; civil-date conversion goes through chrono at the
//! edges only.

use chrono::{Datelike, NaiveDate};

/// Milliseconds since the UNIX epoch.
pub type Time = i64;

/// Julian day number. Zero means "no date" (spot settlement).
pub type JDay = i32;

/// ISO-8601 date packed as a YYYYMMDD integer.
pub type IsoDate = i32;

/// Julian day of the UNIX epoch (1970-01-01).
pub const JD_UNIX_EPOCH: JDay = 2440588;

/// Epoch of the truncated Julian day (1968-05-24).
pub const TJD_EPOCH: JDay = 2440000;

/// Days-from-common-era of the Julian-day epoch, for chrono conversion.
const JD_CE_OFFSET: i32 = 1721425;

const MS_PER_DAY: i64 = 86_400_000;
const MS_PER_HOUR: i64 = 3_600_000;

/// Convert a civil date to a Julian day.
///
/// # Panics
/// Panics if the date is not a valid civil date.
pub fn ymd_to_jd(year: i32, mon: u32, day: u32) -> JDay {
    let date = NaiveDate::from_ymd_opt(year, mon, day).expect("invalid civil date");
    date.num_days_from_ce() + JD_CE_OFFSET
}

/// Convert a Julian day to a civil date.
pub fn jd_to_ymd(jd: JDay) -> (i32, u32, u32) {
    let date = NaiveDate::from_num_days_from_ce_opt(jd - JD_CE_OFFSET).expect("jd out of range");
    (date.year(), date.month(), date.day())
}

/// Convert a Julian day to a packed ISO date.
pub fn jd_to_iso(jd: JDay) -> IsoDate {
    let (y, m, d) = jd_to_ymd(jd);
    y * 10000 + (m as i32) * 100 + d as i32
}

/// Convert a packed ISO date to a Julian day.
pub fn iso_to_jd(iso: IsoDate) -> JDay {
    ymd_to_jd(iso / 10000, ((iso / 100) % 100) as u32, (iso % 100) as u32)
}

/// Zero-preserving ISO conversion: zero (spot) stays absent.
pub fn maybe_jd_to_iso(jd: JDay) -> Option<IsoDate> {
    (jd != 0).then(|| jd_to_iso(jd))
}

/// Zero-preserving inverse of [`maybe_jd_to_iso`].
pub fn maybe_iso_to_jd(iso: Option<IsoDate>) -> JDay {
    iso.map(iso_to_jd).unwrap_or(0)
}

/// Truncated Julian day: days since JD 2440000.
pub fn jd_to_tjd(jd: JDay) -> i32 {
    jd - TJD_EPOCH
}

/// Inverse of [`jd_to_tjd`].
pub fn tjd_to_jd(tjd: i32) -> JDay {
    tjd + TJD_EPOCH
}

/// Midnight UTC of a Julian day, in milliseconds since the UNIX epoch.
pub fn jd_to_time(jd: JDay) -> Time {
    (jd - JD_UNIX_EPOCH) as i64 * MS_PER_DAY
}

/// Maps a time to the effective business day using a fixed roll hour in a
/// fixed zone. Times before the roll hour belong to the previous day.
#[derive(Debug, Clone, Copy)]
pub struct BusinessDay {
    roll_hour: i64,
    utc_offset_hours: i64,
}

impl BusinessDay {
    pub const fn new(roll_hour: i64, utc_offset_hours: i64) -> Self {
        Self {
            roll_hour,
            utc_offset_hours,
        }
    }

    /// The business day containing `time`.
    pub fn bus_day(&self, time: Time) -> JDay {
        let local = time + self.utc_offset_hours * MS_PER_HOUR;
        let shifted = local - self.roll_hour * MS_PER_HOUR;
        JD_UNIX_EPOCH + shifted.div_euclid(MS_PER_DAY) as JDay
    }
}

/// Production roll policy: 05:00 New York, fixed UTC-5 offset.
pub const MARKET_ZONE: BusinessDay = BusinessDay::new(5, -5);
