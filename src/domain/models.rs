use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const ROLLING_WINDOW_DAYS: u64 = 365;
const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// One calendar day, rendered canonically as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Parses the canonical form only. `2024-3-5` is rejected so a day can
    /// never be stored under two spellings.
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        let date = NaiveDate::parse_from_str(value, DAY_KEY_FORMAT)
            .map_err(|_| format!("day key must be YYYY-MM-DD: {value:?}"))?;
        let key = Self(date);
        if key.to_string() != value {
            return Err(format!("day key must be zero-padded YYYY-MM-DD: {value:?}"));
        }
        Ok(key)
    }

    pub fn day_of_month(self) -> u32 {
        self.0.day()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for DayKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DayKey> for String {
    fn from(value: DayKey) -> Self {
        value.to_string()
    }
}

impl From<NaiveDate> for DayKey {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Japan,
}

impl DayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Japan => "japan",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "japan" => Some(Self::Japan),
            _ => None,
        }
    }
}

pub type DayStatusMap = BTreeMap<DayKey, DayStatus>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Fill,
    Clear,
}

impl DragMode {
    pub fn for_start(days: &DayStatusMap, start: DayKey) -> Self {
        if days.contains_key(&start) {
            Self::Clear
        } else {
            Self::Fill
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Clear => "clear",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSelection {
    pub start: DayKey,
    pub end: DayKey,
    pub mode: DragMode,
}

impl DragSelection {
    pub fn range(&self) -> Vec<DayKey> {
        date_range(self.start, self.end)
    }

    pub fn contains(&self, key: DayKey) -> bool {
        let (low, high) = sorted(self.start, self.end);
        low <= key && key <= high
    }
}

fn sorted(left: DayKey, right: DayKey) -> (DayKey, DayKey) {
    if left <= right {
        (left, right)
    } else {
        (right, left)
    }
}

/// Inclusive span between two days, oldest first, in either argument order.
pub fn date_range(left: DayKey, right: DayKey) -> Vec<DayKey> {
    let (low, high) = sorted(left, right);
    low.date()
        .iter_days()
        .take_while(|date| *date <= high.date())
        .map(DayKey)
        .collect()
}

pub fn rolling_window_start(anchor: NaiveDate) -> NaiveDate {
    anchor
        .checked_sub_days(Days::new(ROLLING_WINDOW_DAYS - 1))
        .unwrap_or(NaiveDate::MIN)
}

/// The 365 days ending at `anchor`, inclusive on both ends.
pub fn rolling_window(anchor: NaiveDate) -> Vec<DayKey> {
    date_range(DayKey(rolling_window_start(anchor)), DayKey(anchor))
}

pub fn count_marked_in_window(days: &DayStatusMap, anchor: NaiveDate) -> usize {
    let start = DayKey(rolling_window_start(anchor));
    days.range(start..=DayKey(anchor))
        .filter(|(_, status)| **status == DayStatus::Japan)
        .count()
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(i64::from(date.day0()))
}

/// Moves a month cursor by whole months. Out-of-range results leave it unchanged.
pub fn shift_months(date: NaiveDate, delta: i32) -> NaiveDate {
    let first = first_of_month(date);
    let shifted = if delta >= 0 {
        first.checked_add_months(Months::new(delta.unsigned_abs()))
    } else {
        first.checked_sub_months(Months::new(delta.unsigned_abs()))
    };
    shifted.unwrap_or(first)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthCell {
    Pad,
    Day(DayKey),
}

/// Cells of a Sunday-first month grid: leading placeholders, then every day.
pub fn month_cells(month: NaiveDate) -> Vec<MonthCell> {
    let first = first_of_month(month);
    let padding = first.weekday().num_days_from_sunday() as usize;
    let mut cells = vec![MonthCell::Pad; padding];
    cells.extend(
        first
            .iter_days()
            .take_while(|date| date.month() == first.month())
            .map(|date| MonthCell::Day(DayKey(date))),
    );
    cells
}
