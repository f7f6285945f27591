use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Longest run of consecutive non-workdays a scan will cross before giving up.
pub const MAX_SCAN_DAYS: i64 = 3660;

/// Largest offset or duration, in workdays, that templates and calendar
/// queries accept.
pub const MAX_WORKDAY_SPAN: i64 = MAX_SCAN_DAYS;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalendarError {
    #[error("invalid weekly pattern: {0}")]
    InvalidWeeklyPattern(String),
}

/// Parse a loosely formatted date string, ignoring any time-of-day component.
///
/// Timestamps carrying an offset keep the calendar date as written in that
/// offset, so `2024-01-04T23:30:00-05:00` is still January 4th.
pub fn parse_loose_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let year = trimmed[0..4].parse().ok()?;
        let month = trimmed[4..6].parse().ok()?;
        let day = trimmed[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Normalise a loosely formatted date to its `YYYY-MM-DD` key.
pub fn normalize_date_key(input: &str) -> Option<String> {
    parse_loose_date(input).map(|date| date.format("%Y-%m-%d").to_string())
}

fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

/// Working hours per weekday, Sunday first. Any positive value marks a working day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct WeeklyPattern {
    hours: [f64; 7],
}

impl Default for WeeklyPattern {
    fn default() -> Self {
        Self {
            hours: [0.0, 8.0, 8.0, 8.0, 8.0, 8.0, 0.0],
        }
    }
}

impl WeeklyPattern {
    pub fn new<I>(hours: I) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = f64>,
    {
        let values: Vec<f64> = hours.into_iter().collect();
        if values.len() != 7 {
            return Err(CalendarError::InvalidWeeklyPattern(format!(
                "expected 7 entries (Sunday..Saturday), got {}",
                values.len()
            )));
        }
        let mut pattern = [0.0; 7];
        for (idx, value) in values.into_iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(CalendarError::InvalidWeeklyPattern(format!(
                    "weekday {idx} has invalid hours {value}"
                )));
            }
            pattern[idx] = value;
        }
        Ok(Self { hours: pattern })
    }

    /// Build a pattern from a set of working weekdays (e.g. Mon-Sat for 6-day weeks).
    pub fn from_working_days<I>(days: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        let mut hours = [0.0; 7];
        for day in days {
            hours[day.num_days_from_sunday() as usize] = 8.0;
        }
        Self { hours }
    }

    pub fn hours(&self) -> &[f64; 7] {
        &self.hours
    }

    pub fn is_working(&self, weekday: u32) -> bool {
        self.hours
            .get(weekday as usize)
            .is_some_and(|hours| *hours > 0.0)
    }

    pub fn working_days(&self) -> Vec<Weekday> {
        let mut day = Weekday::Sun;
        let mut days = Vec::new();
        for hours in self.hours {
            if hours > 0.0 {
                days.push(day);
            }
            day = day.succ();
        }
        days
    }
}

impl TryFrom<Vec<f64>> for WeeklyPattern {
    type Error = CalendarError;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WeeklyPattern> for Vec<f64> {
    fn from(pattern: WeeklyPattern) -> Self {
        pattern.hours.to_vec()
    }
}

/// Decides which dates count as workdays and does duration arithmetic over them.
///
/// Precedence: a holiday is always off, a workday exception turns an off
/// weekday into a working one, everything else follows the weekly pattern.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BusinessCalendar {
    weekly_pattern: WeeklyPattern,
    holidays: HashSet<NaiveDate>,
    workday_exceptions: HashSet<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessCalendarConfig {
    /// Sunday..Saturday working hours.
    #[serde(default = "default_weekly_hours")]
    pub weekly_hours: Vec<f64>,
    #[serde(default)]
    pub holidays: Vec<String>,
    #[serde(default)]
    pub workday_exceptions: Vec<String>,
}

fn default_weekly_hours() -> Vec<f64> {
    WeeklyPattern::default().into()
}

impl Default for BusinessCalendarConfig {
    fn default() -> Self {
        BusinessCalendar::default().to_config()
    }
}

impl BusinessCalendar {
    pub fn new(weekly_pattern: WeeklyPattern) -> Self {
        Self {
            weekly_pattern,
            holidays: HashSet::new(),
            workday_exceptions: HashSet::new(),
        }
    }

    /// Default Mon-Fri week plus US federal holidays for a range of years (inclusive).
    pub fn with_us_holidays(start_year: i32, end_year: i32) -> Self {
        let (start, end) = if start_year <= end_year {
            (start_year, end_year)
        } else {
            (end_year, start_year)
        };
        let mut calendar = Self::default();
        for year in start..=end {
            calendar.holidays.extend(Self::us_federal_holidays(year));
        }
        calendar
    }

    /// Build a calendar from external configuration. Dates that cannot be
    /// parsed are skipped with a warning; only the weekly pattern can fail.
    pub fn from_config(config: &BusinessCalendarConfig) -> Result<Self, CalendarError> {
        let pattern = WeeklyPattern::new(config.weekly_hours.iter().copied())?;
        let mut calendar = Self::new(pattern);
        for raw in &config.holidays {
            if calendar.add_holiday_str(raw).is_none() {
                warn!(input = %raw, "skipping unparseable holiday date");
            }
        }
        for raw in &config.workday_exceptions {
            if calendar.add_workday_exception_str(raw).is_none() {
                warn!(input = %raw, "skipping unparseable workday exception date");
            }
        }
        Ok(calendar)
    }

    pub fn to_config(&self) -> BusinessCalendarConfig {
        let format = |dates: Vec<NaiveDate>| -> Vec<String> {
            dates
                .into_iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect()
        };
        BusinessCalendarConfig {
            weekly_hours: self.weekly_pattern.into(),
            holidays: format(self.holidays()),
            workday_exceptions: format(self.workday_exceptions()),
        }
    }

    fn us_federal_holidays(year: i32) -> Vec<NaiveDate> {
        [
            // New Year's Day
            NaiveDate::from_ymd_opt(year, 1, 1),
            // Martin Luther King Jr. Day (3rd Monday in January)
            Self::nth_weekday(year, 1, Weekday::Mon, 3),
            // Presidents' Day (3rd Monday in February)
            Self::nth_weekday(year, 2, Weekday::Mon, 3),
            // Memorial Day (last Monday in May)
            Self::last_weekday(year, 5, Weekday::Mon),
            // Independence Day
            NaiveDate::from_ymd_opt(year, 7, 4),
            // Labor Day (1st Monday in September)
            Self::nth_weekday(year, 9, Weekday::Mon, 1),
            // Columbus Day (2nd Monday in October)
            Self::nth_weekday(year, 10, Weekday::Mon, 2),
            // Veterans Day
            NaiveDate::from_ymd_opt(year, 11, 11),
            // Thanksgiving (4th Thursday in November)
            Self::nth_weekday(year, 11, Weekday::Thu, 4),
            // Christmas
            NaiveDate::from_ymd_opt(year, 12, 25),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Helper: Find the nth occurrence of a weekday in a month
    fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
        NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
    }

    /// Helper: Find the last occurrence of a weekday in a month
    fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
        let first_of_next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let mut date = first_of_next - Duration::days(1);
        while date.weekday() != weekday {
            date = date.pred_opt()?;
        }
        Some(date)
    }

    pub fn weekly_pattern(&self) -> &WeeklyPattern {
        &self.weekly_pattern
    }

    /// Holidays in ascending order.
    pub fn holidays(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.holidays.iter().copied().collect();
        dates.sort();
        dates
    }

    /// Workday exceptions in ascending order.
    pub fn workday_exceptions(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.workday_exceptions.iter().copied().collect();
        dates.sort();
        dates
    }

    /// Returns `true` if the date was not already a holiday.
    pub fn add_holiday(&mut self, date: NaiveDate) -> bool {
        self.holidays.insert(date)
    }

    /// Add multiple holidays at once
    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        self.holidays.extend(dates);
    }

    pub fn remove_holiday(&mut self, date: NaiveDate) -> bool {
        self.holidays.remove(&date)
    }

    pub fn add_workday_exception(&mut self, date: NaiveDate) -> bool {
        self.workday_exceptions.insert(date)
    }

    pub fn remove_workday_exception(&mut self, date: NaiveDate) -> bool {
        self.workday_exceptions.remove(&date)
    }

    /// Returns the normalised date, or `None` when the input does not parse.
    pub fn add_holiday_str(&mut self, input: &str) -> Option<NaiveDate> {
        let date = parse_loose_date(input)?;
        self.holidays.insert(date);
        Some(date)
    }

    pub fn remove_holiday_str(&mut self, input: &str) -> Option<NaiveDate> {
        let date = parse_loose_date(input)?;
        self.holidays.remove(&date);
        Some(date)
    }

    pub fn add_workday_exception_str(&mut self, input: &str) -> Option<NaiveDate> {
        let date = parse_loose_date(input)?;
        self.workday_exceptions.insert(date);
        Some(date)
    }

    pub fn remove_workday_exception_str(&mut self, input: &str) -> Option<NaiveDate> {
        let date = parse_loose_date(input)?;
        self.workday_exceptions.remove(&date);
        Some(date)
    }

    /// `weekday` is 0 for Sunday through 6 for Saturday.
    pub fn is_working_weekday(&self, weekday: u32) -> bool {
        self.weekly_pattern.is_working(weekday)
    }

    pub fn is_working_day_of_week(&self, weekday: Weekday) -> bool {
        self.weekly_pattern.is_working(weekday.num_days_from_sunday())
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn is_workday_exception(&self, date: NaiveDate) -> bool {
        self.workday_exceptions.contains(&date)
    }

    pub fn is_holiday_str(&self, input: &str) -> bool {
        parse_loose_date(input).is_some_and(|date| self.is_holiday(date))
    }

    pub fn is_workday_exception_str(&self, input: &str) -> bool {
        parse_loose_date(input).is_some_and(|date| self.is_workday_exception(date))
    }

    pub fn is_non_workday(&self, date: NaiveDate) -> bool {
        self.is_holiday(date)
            || (!self.is_workday_exception(date) && !self.is_working_weekday(weekday_index(date)))
    }

    pub fn is_workday(&self, date: NaiveDate) -> bool {
        !self.is_non_workday(date)
    }

    /// Count workdays in the inclusive range `[start, end]`; 0 when `start > end`.
    pub fn count_workdays(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let mut count = 0;
        let mut current = start;

        while current <= end {
            if self.is_workday(current) {
                count += 1;
            }
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        count
    }

    pub fn count_workdays_opt(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> i64 {
        match (start, end) {
            (Some(start), Some(end)) => self.count_workdays(start, end),
            _ => 0,
        }
    }

    pub fn count_workdays_str(&self, start: &str, end: &str) -> i64 {
        self.count_workdays_opt(parse_loose_date(start), parse_loose_date(end))
    }

    /// Get all workdays in a date range
    pub fn workdays_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut current = start;

        while current <= end {
            if self.is_workday(current) {
                days.push(current);
            }
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        days
    }

    /// `date` if it is a workday, otherwise the first later workday.
    pub fn get_next_workday(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        for _ in 0..=MAX_SCAN_DAYS {
            if self.is_workday(current) {
                return current;
            }
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        date
    }

    pub fn snap_to_workday(&self, date: NaiveDate) -> NaiveDate {
        self.get_next_workday(date)
    }

    /// Date on which an `n`-workday span starting at `start` ends. The start is
    /// snapped to a workday first and counts as workday #1.
    pub fn calculate_end_date_by_workdays(&self, start: NaiveDate, workdays: i64) -> NaiveDate {
        let snapped = self.get_next_workday(start);
        if workdays <= 1 {
            return snapped;
        }
        self.step_workdays(snapped, workdays.unsigned_abs() - 1, true)
            .unwrap_or(snapped)
    }

    /// Inclusive calendar days covered by an `n`-workday span starting at `start`.
    pub fn calculate_calendar_days(&self, start: NaiveDate, workdays: i64) -> i64 {
        let end = self.calculate_end_date_by_workdays(start, workdays);
        (end - start).num_days() + 1
    }

    /// Signed workday distance from `from` to `to`. `from` is snapped first, so
    /// a weekend anchor measures from the following workday; a `to` that falls
    /// on a non-workday rounds toward the anchor.
    pub fn signed_workday_distance(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        let anchor = self.get_next_workday(from);
        if to >= anchor {
            (self.count_workdays(anchor, to) - 1).max(0)
        } else {
            -(self.count_workdays(to, anchor) - 1).max(0)
        }
    }

    /// Snap `date`, then move `offset` workdays forward (positive) or back (negative).
    pub fn shift_by_workdays(&self, date: NaiveDate, offset: i64) -> NaiveDate {
        let snapped = self.get_next_workday(date);
        if offset == 0 {
            return snapped;
        }
        self.step_workdays(snapped, offset.unsigned_abs(), offset > 0)
            .unwrap_or(snapped)
    }

    /// Walk `count` workdays away from `from` (exclusive). `None` when the walk
    /// runs off the representable range or crosses `MAX_SCAN_DAYS` without a workday.
    fn step_workdays(&self, from: NaiveDate, count: u64, forward: bool) -> Option<NaiveDate> {
        let mut current = from;
        let mut seen = 0u64;
        let mut idle = 0;

        while seen < count {
            current = if forward {
                current.succ_opt()?
            } else {
                current.pred_opt()?
            };
            if self.is_workday(current) {
                seen += 1;
                idle = 0;
            } else {
                idle += 1;
                if idle > MAX_SCAN_DAYS {
                    return None;
                }
            }
        }
        Some(current)
    }
}
