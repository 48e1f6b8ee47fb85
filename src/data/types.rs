//! Core data types for backtest result analysis.
//!
//! A backtest run writes one record per observation date, pairing the
//! theoretical price of the hedged instrument with the value of the
//! replicating portfolio. These types hold that output once it has been
//! loaded and ordered by date.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Accepted layouts for naive timestamps, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Layout used when writing timestamps back out.
const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse an ISO-8601 date or date-time.
///
/// Date-only values map to midnight. Values carrying an offset are
/// normalised to UTC before the offset is dropped.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Format a timestamp so that [`parse_timestamp`] reads it back unchanged.
pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format(OUTPUT_FORMAT).to_string()
}

mod iso_timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unparseable date `{}`", raw)))
    }
}

/// Hedge ratios are written as a list per underlying, but single-asset
/// runs sometimes emit a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(f64),
    Many(Vec<f64>),
}

impl From<OneOrMany> for Vec<f64> {
    fn from(v: OneOrMany) -> Self {
        match v {
            OneOrMany::One(x) => vec![x],
            OneOrMany::Many(xs) => xs,
        }
    }
}

pub(crate) fn deserialize_one_or_many<'de, D>(d: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OneOrMany>::deserialize(d)?.map(Into::into))
}

/// One observation of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Observation date
    #[serde(with = "iso_timestamp")]
    pub date: NaiveDateTime,

    /// Theoretical price of the instrument
    pub price: f64,

    /// Value of the replicating portfolio
    pub value: f64,

    /// Hedge ratios held after rebalancing
    #[serde(
        default,
        deserialize_with = "deserialize_one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub deltas: Option<Vec<f64>>,

    /// Monte Carlo standard deviation of each hedge ratio
    #[serde(
        default,
        deserialize_with = "deserialize_one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub deltas_std_dev: Option<Vec<f64>>,

    /// Monte Carlo standard deviation of the price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_std_dev: Option<f64>,
}

impl ResultRecord {
    /// Create a record with only the required fields set.
    pub fn new(date: NaiveDateTime, price: f64, value: f64) -> Self {
        Self {
            date,
            price,
            value,
            deltas: None,
            deltas_std_dev: None,
            price_std_dev: None,
        }
    }

    /// Portfolio value minus theoretical price.
    pub fn deviation(&self) -> f64 {
        self.value - self.price
    }
}

/// Backtest output ordered ascending by date.
///
/// Records sharing a date keep the order in which they were supplied.
/// The series is read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSeries {
    records: Vec<ResultRecord>,
}

impl ResultSeries {
    /// Build a series, sorting records by date.
    pub fn new(mut records: Vec<ResultRecord>) -> Self {
        // Vec::sort_by_key is stable, which gives first-seen order on ties.
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Chronologically first record.
    pub fn first(&self) -> Option<&ResultRecord> {
        self.records.first()
    }

    /// Chronologically last record.
    pub fn last(&self) -> Option<&ResultRecord> {
        self.records.last()
    }

    /// Date range covered, inclusive.
    pub fn date_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.first()?.date, self.last()?.date))
    }

    pub fn prices(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.records.iter().map(|r| (r.date, r.price))
    }

    pub fn values(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.records.iter().map(|r| (r.date, r.value))
    }

    /// Serialize as a row-oriented JSON array.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a ResultSeries {
    type Item = &'a ResultRecord;
    type IntoIter = std::slice::Iter<'a, ResultRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-01-03"), Some(day(3)));
        assert_eq!(parse_timestamp("2024-01-03T00:00:00"), Some(day(3)));
        assert_eq!(parse_timestamp("2024-01-03 00:00:00"), Some(day(3)));
        assert_eq!(parse_timestamp("2024-01-03T00:00:00Z"), Some(day(3)));
        assert_eq!(parse_timestamp("2024-01-03T02:00:00+02:00"), Some(day(3)));
        assert_eq!(parse_timestamp("03/01/2024"), None);
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_format_timestamp_reparses() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_milli_opt(16, 30, 5, 250)
            .unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(&dt)), Some(dt));
        assert_eq!(format_timestamp(&day(1)), "2024-01-01T00:00:00");
    }

    #[test]
    fn test_series_sorted_and_stable_on_ties() {
        let series = ResultSeries::new(vec![
            ResultRecord::new(day(2), 1.0, 1.0),
            ResultRecord::new(day(1), 2.0, 2.0),
            ResultRecord::new(day(2), 3.0, 3.0),
        ]);

        let prices: Vec<f64> = series.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_sorting_is_idempotent() {
        let series = ResultSeries::new(vec![
            ResultRecord::new(day(3), 12.0, 11.0),
            ResultRecord::new(day(1), 10.0, 10.5),
            ResultRecord::new(day(2), 11.0, 10.8),
        ]);
        let resorted = ResultSeries::new(series.records().to_vec());
        assert_eq!(series, resorted);
    }

    #[test]
    fn test_date_range() {
        assert_eq!(ResultSeries::default().date_range(), None);

        let series = ResultSeries::new(vec![
            ResultRecord::new(day(5), 1.0, 1.0),
            ResultRecord::new(day(2), 1.0, 1.0),
        ]);
        assert_eq!(series.date_range(), Some((day(2), day(5))));
    }

    #[test]
    fn test_json_string_reloads() {
        let series = ResultSeries::new(vec![
            ResultRecord::new(day(2), 11.0, 10.8),
            ResultRecord::new(day(1), 10.0, 10.5),
        ]);
        let json = series.to_json_string().unwrap();
        assert!(json.contains("\"2024-01-01T00:00:00\""));
        assert_eq!(crate::data::load_from_str(&json).unwrap(), series);
    }

    #[test]
    fn test_record_deltas_accept_scalar() {
        let rec: ResultRecord = serde_json::from_str(
            r#"{"date":"2024-01-01","price":1.0,"value":2.0,"deltas":0.5,"deltasStdDev":[0.01]}"#,
        )
        .unwrap();
        assert_eq!(rec.deltas, Some(vec![0.5]));
        assert_eq!(rec.deltas_std_dev, Some(vec![0.01]));
        assert_eq!(rec.price_std_dev, None);
        assert_eq!(rec.deviation(), 1.0);
    }
}
