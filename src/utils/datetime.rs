use chrono::{Days, Local, NaiveDate};

use crate::error::{QbError, QbResult};

pub fn date_from_str(s: &str) -> QbResult<NaiveDate> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

    let s = s.trim();
    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }

    Err(QbError::Invalid {
        code: "INVALID_DATE",
        message: format!("Unable to parse date '{s}'"),
    })
}

/// Compact form used by the price API (`basDt`) and by the rolling history.
pub fn date_to_compact_str(date: &NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn date_to_str(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn days_after(date: &NaiveDate, days: u64) -> QbResult<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| QbError::Invalid {
            code: "DATE_OUT_OF_RANGE",
            message: format!("{date} + {days} days is out of range"),
        })
}

pub fn days_before(date: &NaiveDate, days: u64) -> QbResult<NaiveDate> {
    date.checked_sub_days(Days::new(days))
        .ok_or_else(|| QbError::Invalid {
            code: "DATE_OUT_OF_RANGE",
            message: format!("{date} - {days} days is out of range"),
        })
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_str() {
        assert_eq!(
            date_to_str(&date_from_str("20231231").unwrap()),
            "2023-12-31"
        );
        assert_eq!(
            date_to_str(&date_from_str("2023-12-31").unwrap()),
            "2023-12-31"
        );
        assert_eq!(
            date_to_str(&date_from_str(" 2023-12-31 ").unwrap()),
            "2023-12-31"
        );
        assert!(date_from_str("invalid-date").is_err());
        assert!(date_from_str("").is_err());
        assert!(date_from_str("2023-02-30").is_err());
    }

    #[test]
    fn test_date_to_compact_str() {
        assert_eq!(
            date_to_compact_str(&NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            "20240105"
        );
    }

    #[test]
    fn test_days_shift() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            days_before(&date, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            days_after(&date, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
        assert!(days_after(&NaiveDate::MAX, 1).is_err());
    }
}
