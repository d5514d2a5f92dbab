//! Query-string and path helpers shared by the handlers.

use api_types::common::{self, DateRangeQuery, SearchQuery};
use chrono::NaiveDate;
use engine::DateRange;

use crate::ServerError;

const BOTH_DATES: &str = "Both startDate and endDate are required";

/// `startDate` and `endDate` must both be present.
pub(crate) fn required_range(query: &DateRangeQuery) -> Result<DateRange, ServerError> {
    optional_range(query)?.ok_or_else(|| ServerError::Generic(BOTH_DATES.to_string()))
}

/// Both dates or neither.
pub(crate) fn optional_range(query: &DateRangeQuery) -> Result<Option<DateRange>, ServerError> {
    match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => Ok(Some(DateRange::new(start, end))),
        (None, None) => Ok(None),
        _ => Err(ServerError::Generic(BOTH_DATES.to_string())),
    }
}

/// Missing bounds default to the first of `today`'s month and `today`.
pub(crate) fn range_or_month_to_date(query: &DateRangeQuery, today: NaiveDate) -> DateRange {
    let default = DateRange::month_to_date(today);
    DateRange::new(
        query.start_date.unwrap_or(default.start),
        query.end_date.unwrap_or(default.end),
    )
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, ServerError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ServerError::Generic("Date must be in YYYY-MM-DD format".to_string()))
}

pub(crate) fn search_term(query: SearchQuery) -> Result<String, ServerError> {
    query
        .q
        .ok_or_else(|| ServerError::Generic("Search query is required".to_string()))
}

pub(crate) fn range_view(range: DateRange) -> common::DateRange {
    common::DateRange {
        start_date: range.start,
        end_date: range.end,
    }
}

/// Name of the only filter present, rejecting combinations.
pub(crate) fn single_filter<'a>(
    present: &[(&'a str, bool)],
) -> Result<Option<&'a str>, ServerError> {
    let mut given = present.iter().filter(|(_, set)| *set).map(|(name, _)| *name);
    let first = given.next();
    if given.next().is_some() {
        let names: Vec<&str> = present.iter().map(|(name, _)| *name).collect();
        return Err(ServerError::Generic(format!(
            "provide only one of {}",
            names.join(", ")
        )));
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    #[test]
    fn half_open_range_is_rejected() {
        let query = DateRangeQuery {
            start_date: Some(date(1)),
            end_date: None,
        };
        assert!(optional_range(&query).is_err());
        assert!(required_range(&DateRangeQuery::default()).is_err());
        assert!(optional_range(&DateRangeQuery::default()).unwrap().is_none());
    }

    #[test]
    fn dashboard_range_defaults_each_bound() {
        let today = date(25);
        let range = range_or_month_to_date(&DateRangeQuery::default(), today);
        assert_eq!((range.start, range.end), (date(1), today));

        let query = DateRangeQuery {
            start_date: Some(date(10)),
            end_date: None,
        };
        let range = range_or_month_to_date(&query, today);
        assert_eq!((range.start, range.end), (date(10), today));
    }

    #[test]
    fn dates_need_iso_format() {
        assert_eq!(parse_date("2025-08-25").unwrap(), date(25));
        assert!(parse_date("25/08/2025").is_err());
        assert!(parse_date("2025-02-30").is_err());
    }

    #[test]
    fn filters_are_exclusive() {
        assert_eq!(single_filter(&[("city", false), ("search", false)]).unwrap(), None);
        assert_eq!(
            single_filter(&[("city", true), ("search", false)]).unwrap(),
            Some("city")
        );
        let Err(ServerError::Generic(message)) =
            single_filter(&[("city", true), ("search", true)])
        else {
            panic!("expected a validation error");
        };
        assert_eq!(message, "provide only one of city, search");
    }
}
