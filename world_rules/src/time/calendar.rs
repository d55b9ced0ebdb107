use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc, Weekday};
use serde::{Deserialize, Serialize};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Meteorological season (northern hemisphere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn of(at: DateTime<Utc>) -> Self {
        Self::from_month(at.month())
    }
}

/// Gregorian calendar fields for an anchored instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDate {
    pub iso: String,
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub day_of_month: u32,
    pub iso_week: u32,
    pub weekday: String,
    /// 1 = Monday .. 7 = Sunday.
    pub weekday_index: u32,
    pub day_of_year: u32,
    pub days_in_year: u32,
    pub is_leap_year: bool,
    pub season: Season,
}

impl CalendarDate {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let days_in_year = NaiveDate::from_ymd_opt(at.year(), 12, 31)
            .map(|d| d.ordinal())
            .unwrap_or(365);
        Self {
            iso: format_timestamp(at),
            year: at.year(),
            month: at.month(),
            month_name: MONTH_NAMES[at.month0() as usize].to_string(),
            day_of_month: at.day(),
            iso_week: at.iso_week().week(),
            weekday: weekday_name(at.weekday()).to_string(),
            weekday_index: at.weekday().number_from_monday(),
            day_of_year: at.ordinal(),
            days_in_year,
            is_leap_year: days_in_year == 366,
            season: Season::of(at),
        }
    }
}

/// RFC 3339 with whole seconds and a `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
