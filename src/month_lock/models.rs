use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::AppError;

/// Calendar month in `YYYY-MM` form; the unit of locking and attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(AppError::Validation(format!(
                "Invalid month {:04}-{:02}: expected YYYY-MM",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months elapsed from `earlier` to `self`; negative when `earlier` is later.
    pub fn months_since(&self, earlier: &MonthKey) -> i32 {
        (self.year - earlier.year) * 12 + (self.month as i32 - earlier.month as i32)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("Invalid month '{}': expected YYYY-MM", s));

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        MonthKey::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for MonthKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2025-06", 2025, 6)]
    #[case("1999-12", 1999, 12)]
    #[case(" 2024-01 ", 2024, 1)]
    fn parses_valid_months(#[case] input: &str, #[case] year: i32, #[case] month: u32) {
        let key: MonthKey = input.parse().unwrap();
        assert_eq!((key.year(), key.month()), (year, month));
    }

    #[rstest]
    #[case("2025-13")]
    #[case("2025-00")]
    #[case("2025-6")]
    #[case("202506")]
    #[case("June")]
    #[case("2025-06-15")]
    fn rejects_malformed_months(#[case] input: &str) {
        assert!(matches!(
            input.parse::<MonthKey>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn derives_month_from_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(MonthKey::from_date(date).to_string(), "2025-06");
    }

    #[test]
    fn counts_months_across_year_boundary() {
        let dec: MonthKey = "2024-12".parse().unwrap();
        let jan: MonthKey = "2025-01".parse().unwrap();
        assert_eq!(jan.months_since(&dec), 1);
        assert_eq!(dec.months_since(&jan), -1);
        assert!(dec < jan);
    }

    #[test]
    fn serializes_as_string() {
        let key: MonthKey = "2025-07".parse().unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2025-07\"");
        let back: MonthKey = serde_json::from_str("\"2025-07\"").unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<MonthKey>("\"2025-7\"").is_err());
    }
}
