//! Query construction for the location/timeseries join.
//!
//! Filter values are always bound parameters. Column names cannot be bound
//! in SQLite, so requested fields are validated against [`ALLOWED_FIELDS`]
//! before they appear in the SELECT list, and the administrative level is
//! parsed as a number before it names a column.

use chrono::NaiveDate;

use crate::config::{BASE_FIELDS, ROW_LIMIT};
use crate::error_handling::QueryError;

/// Columns of the COVID-19 Data Hub snapshot that may be requested via
/// `campos[]`. Anything else is rejected before query construction.
pub const ALLOWED_FIELDS: &[&str] = &[
    // epidemiological time series
    "confirmed",
    "deaths",
    "recovered",
    "tests",
    "vaccines",
    "people_vaccinated",
    "people_fully_vaccinated",
    "hosp",
    "icu",
    "vent",
    // policy measures
    "school_closing",
    "workplace_closing",
    "cancel_events",
    "gatherings_restrictions",
    "transport_closing",
    "stay_home_restrictions",
    "internal_movement_restrictions",
    "international_movement_restrictions",
    "information_campaigns",
    "testing_policy",
    "contact_tracing",
    "facial_coverings",
    "vaccination_policy",
    "elderly_people_protection",
    // policy indices
    "government_response_index",
    "stringency_index",
    "containment_health_index",
    "economic_support_index",
    // location attributes
    "administrative_area_level",
    "administrative_area_level_1",
    "administrative_area_level_2",
    "administrative_area_level_3",
    "latitude",
    "longitude",
    "population",
    "iso_alpha_3",
    "iso_alpha_2",
    "iso_numeric",
    "key_local",
    "key_gadm",
    "key_nuts",
    "key_jhu_csse",
];

/// Ephemeral, request-scoped description of a dataset query.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// Requested fields (`campos[]`); the base fields are appended on build.
    pub fields: Vec<String>,
    /// Equality filter on `administrative_area_level`.
    pub level: Option<u8>,
    /// Equality filter on `administrative_area_level_<level>`.
    pub location: Option<String>,
    /// Inclusive lower bound on `date` (YYYY-MM-DD).
    pub start_date: Option<String>,
    /// Inclusive upper bound on `date` (YYYY-MM-DD).
    pub end_date: Option<String>,
    /// Row cap.
    pub limit: u32,
}

impl Default for QuerySpec {
    fn default() -> Self {
        QuerySpec {
            fields: Vec::new(),
            level: None,
            location: None,
            start_date: None,
            end_date: None,
            limit: ROW_LIMIT,
        }
    }
}

/// A value bound into the query at execution time.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Bound as an SQLite INTEGER.
    Int(i64),
    /// Bound as SQLite TEXT.
    Text(String),
}

/// The finished query: SQL with `?` placeholders, the values to bind, and
/// the JSON key for each selected column in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    /// The SQL statement with `?` placeholders.
    pub sql: String,
    /// Values to bind, in placeholder order.
    pub params: Vec<SqlParam>,
    /// JSON key per selected column, position-aligned with the SELECT list.
    pub columns: Vec<String>,
}

/// Builds the SQL for a [`QuerySpec`].
///
/// Deterministic: identical specs yield byte-identical SQL and parameters.
pub fn build(spec: &QuerySpec) -> Result<BuiltQuery, QueryError> {
    let mut select = Vec::new();
    let mut columns = Vec::new();

    for field in &spec.fields {
        // The base fields come last; drop duplicates up front.
        if BASE_FIELDS.contains(&field.as_str()) {
            continue;
        }
        if !ALLOWED_FIELDS.contains(&field.as_str()) {
            return Err(QueryError::UnknownField(field.clone()));
        }
        // Repeated campos[] entries collapse to a single column.
        if select.contains(&field.as_str()) {
            continue;
        }
        select.push(field.as_str());
        columns.push(field.clone());
    }
    for base in BASE_FIELDS {
        select.push(base);
        // The row identifier is surfaced as plain "id" in responses.
        columns.push(if *base == "timeseries.id" {
            "id".to_string()
        } else {
            (*base).to_string()
        });
    }

    let mut sql = format!(
        "SELECT {} FROM location LEFT JOIN timeseries ON location.id = timeseries.id",
        select.join(", ")
    );

    let mut filters = Vec::new();
    let mut params = Vec::new();

    if let Some(level) = spec.level {
        if !(1..=3).contains(&level) {
            return Err(QueryError::InvalidLevel(level));
        }
        filters.push("administrative_area_level = ?".to_string());
        params.push(SqlParam::Int(i64::from(level)));
    }
    if let Some(location) = &spec.location {
        let level = spec.level.ok_or(QueryError::LocationWithoutLevel)?;
        filters.push(format!("administrative_area_level_{} = ?", level));
        params.push(SqlParam::Text(location.clone()));
    }
    if let Some(start) = &spec.start_date {
        filters.push("date >= ?".to_string());
        params.push(SqlParam::Text(parse_date(start)?));
    }
    if let Some(end) = &spec.end_date {
        filters.push("date <= ?".to_string());
        params.push(SqlParam::Text(parse_date(end)?));
    }

    if !filters.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&filters.join(" AND "));
    }
    sql.push_str(&format!(" LIMIT {}", spec.limit));

    Ok(BuiltQuery {
        sql,
        params,
        columns,
    })
}

fn parse_date(value: &str) -> Result<String, QueryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|source| QueryError::InvalidDate {
            value: value.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worked_example() -> QuerySpec {
        QuerySpec {
            fields: vec!["population".to_string()],
            level: Some(2),
            location: Some("SP".to_string()),
            start_date: Some("2021-01-01".to_string()),
            end_date: Some("2021-01-31".to_string()),
            limit: 3650,
        }
    }

    #[test]
    fn builds_the_worked_example() {
        let built = build(&worked_example()).expect("build should succeed");
        assert_eq!(
            built.sql,
            "SELECT population, timeseries.id, date \
             FROM location LEFT JOIN timeseries ON location.id = timeseries.id \
             WHERE administrative_area_level = ? \
             AND administrative_area_level_2 = ? \
             AND date >= ? AND date <= ? LIMIT 3650"
        );
        assert_eq!(
            built.params,
            vec![
                SqlParam::Int(2),
                SqlParam::Text("SP".to_string()),
                SqlParam::Text("2021-01-01".to_string()),
                SqlParam::Text("2021-01-31".to_string()),
            ]
        );
        assert_eq!(built.columns, vec!["population", "id", "date"]);
    }

    #[test]
    fn identical_specs_yield_byte_identical_sql() {
        let first = build(&worked_example()).expect("build should succeed");
        let second = build(&worked_example()).expect("build should succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn no_filters_omits_where_clause() {
        let spec = QuerySpec {
            fields: vec!["confirmed".to_string()],
            ..QuerySpec::default()
        };
        let built = build(&spec).expect("build should succeed");
        assert_eq!(
            built.sql,
            "SELECT confirmed, timeseries.id, date \
             FROM location LEFT JOIN timeseries ON location.id = timeseries.id LIMIT 3650"
        );
        assert!(built.params.is_empty());
    }

    #[test]
    fn base_fields_are_not_duplicated() {
        let spec = QuerySpec {
            fields: vec!["date".to_string(), "deaths".to_string()],
            ..QuerySpec::default()
        };
        let built = build(&spec).expect("build should succeed");
        assert_eq!(built.columns, vec!["deaths", "id", "date"]);
    }

    #[test]
    fn requesting_only_base_fields_is_valid() {
        let spec = QuerySpec {
            fields: vec!["date".to_string()],
            ..QuerySpec::default()
        };
        let built = build(&spec).expect("build should succeed");
        assert_eq!(built.columns, vec!["id", "date"]);
        assert_eq!(
            built.sql,
            "SELECT timeseries.id, date \
             FROM location LEFT JOIN timeseries ON location.id = timeseries.id LIMIT 3650"
        );
    }

    #[test]
    fn repeated_fields_collapse_to_one_column() {
        let spec = QuerySpec {
            fields: vec![
                "confirmed".to_string(),
                "confirmed".to_string(),
                "deaths".to_string(),
            ],
            ..QuerySpec::default()
        };
        let built = build(&spec).expect("build should succeed");
        assert_eq!(built.columns, vec!["confirmed", "deaths", "id", "date"]);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let spec = QuerySpec {
            fields: vec!["population; DROP TABLE location".to_string()],
            ..QuerySpec::default()
        };
        assert!(matches!(
            build(&spec),
            Err(QueryError::UnknownField(f)) if f.starts_with("population;")
        ));
    }

    #[test]
    fn location_without_level_is_rejected() {
        let spec = QuerySpec {
            location: Some("SP".to_string()),
            ..QuerySpec::default()
        };
        assert!(matches!(build(&spec), Err(QueryError::LocationWithoutLevel)));
    }

    #[test]
    fn out_of_range_level_is_rejected() {
        let spec = QuerySpec {
            level: Some(4),
            ..QuerySpec::default()
        };
        assert!(matches!(build(&spec), Err(QueryError::InvalidLevel(4))));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let spec = QuerySpec {
            start_date: Some("01/02/2021".to_string()),
            ..QuerySpec::default()
        };
        assert!(matches!(
            build(&spec),
            Err(QueryError::InvalidDate { value, .. }) if value == "01/02/2021"
        ));
    }

    #[test]
    fn injection_in_location_value_stays_a_bound_parameter() {
        let spec = QuerySpec {
            fields: vec![],
            level: Some(1),
            location: Some("\" OR 1=1 --".to_string()),
            ..QuerySpec::default()
        };
        let built = build(&spec).expect("build should succeed");
        assert!(!built.sql.contains("OR 1=1"));
        assert_eq!(
            built.params,
            vec![
                SqlParam::Int(1),
                SqlParam::Text("\" OR 1=1 --".to_string())
            ]
        );
    }
}
