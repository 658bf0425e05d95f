use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::db::{StatsFilter, StatsReport};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub range: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn parse_date(value: &str, label: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::validation(format!("{label} must be YYYY-MM-DD")))
}

/// Translate the query into RFC 3339 bounds for the stats filter.
fn build_filter(query: &StatsQuery) -> Result<StatsFilter, ApiError> {
    let now = Utc::now();

    let filter = match query.range.as_deref() {
        None | Some("all") => StatsFilter::default(),
        Some("day") => {
            let start = now.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default();
            StatsFilter {
                start: Some(start.and_utc().to_rfc3339()),
                end: None,
            }
        }
        Some("week") => StatsFilter {
            start: Some((now - Duration::days(7)).to_rfc3339()),
            end: None,
        },
        // Month and year align to the calendar, not rolling windows.
        Some("month") => {
            let start = now
                .date_naive()
                .with_day(1)
                .unwrap_or_default()
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default();
            StatsFilter {
                start: Some(start.and_utc().to_rfc3339()),
                end: None,
            }
        }
        Some("year") => {
            let start = now
                .date_naive()
                .with_ordinal(1)
                .unwrap_or_default()
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default();
            StatsFilter {
                start: Some(start.and_utc().to_rfc3339()),
                end: None,
            }
        }
        Some("custom") => {
            let start = query
                .start_date
                .as_deref()
                .ok_or_else(|| ApiError::validation("start_date is required for custom range"))?;
            let end = query
                .end_date
                .as_deref()
                .ok_or_else(|| ApiError::validation("end_date is required for custom range"))?;

            let start = parse_date(start, "start_date")?;
            let end = parse_date(end, "end_date")?;
            if end < start {
                return Err(ApiError::validation("end_date must not precede start_date"));
            }

            StatsFilter {
                start: start
                    .and_hms_opt(0, 0, 0)
                    .map(|dt| dt.and_utc().to_rfc3339()),
                end: end
                    .and_hms_opt(23, 59, 59)
                    .map(|dt| dt.and_utc().to_rfc3339()),
            }
        }
        Some(other) => {
            return Err(ApiError::validation(format!("Unknown range: {other}")));
        }
    };

    Ok(filter)
}

/// GET /stats (admin)
/// Revenue and top-seller numbers over collected orders.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<StatsReport>>, ApiError> {
    let filter = build_filter(&query)?;
    let report = state.store().order_stats(&filter).await?;

    Ok(Json(ApiResponse::success(report)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(range: Option<&str>, start: Option<&str>, end: Option<&str>) -> StatsQuery {
        StatsQuery {
            range: range.map(ToString::to_string),
            start_date: start.map(ToString::to_string),
            end_date: end.map(ToString::to_string),
        }
    }

    #[test]
    fn test_no_range_means_no_bounds() {
        let filter = build_filter(&query(None, None, None)).unwrap();
        assert!(filter.start.is_none());
        assert!(filter.end.is_none());
    }

    #[test]
    fn test_month_and_year_start_at_calendar_boundaries() {
        let today = Utc::now().date_naive();

        let filter = build_filter(&query(Some("month"), None, None)).unwrap();
        let expected = format!("{}-01T00:00:00", today.format("%Y-%m"));
        assert!(filter.start.unwrap().starts_with(&expected));
        assert!(filter.end.is_none());

        let filter = build_filter(&query(Some("year"), None, None)).unwrap();
        let expected = format!("{}-01-01T00:00:00", today.format("%Y"));
        assert!(filter.start.unwrap().starts_with(&expected));
        assert!(filter.end.is_none());
    }

    #[test]
    fn test_custom_range_requires_both_dates() {
        assert!(build_filter(&query(Some("custom"), Some("2026-01-01"), None)).is_err());
        assert!(build_filter(&query(Some("custom"), None, Some("2026-01-31"))).is_err());

        let filter = build_filter(&query(
            Some("custom"),
            Some("2026-01-01"),
            Some("2026-01-31"),
        ))
        .unwrap();
        assert!(filter.start.unwrap().starts_with("2026-01-01T00:00:00"));
        assert!(filter.end.unwrap().starts_with("2026-01-31T23:59:59"));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(build_filter(&query(Some("fortnight"), None, None)).is_err());
        assert!(
            build_filter(&query(Some("custom"), Some("01/01/2026"), Some("2026-01-31"))).is_err()
        );
        assert!(
            build_filter(&query(Some("custom"), Some("2026-02-01"), Some("2026-01-01"))).is_err()
        );
    }
}
