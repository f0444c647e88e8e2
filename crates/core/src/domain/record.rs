use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One day of cumulative counters for a country, as returned by the case API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    #[serde(rename = "Date", deserialize_with = "deserialize_day")]
    pub date: NaiveDate,
    #[serde(rename = "Confirmed")]
    pub confirmed: i64,
    #[serde(rename = "Active")]
    pub active: i64,
    #[serde(rename = "Deaths")]
    pub deaths: i64,
    #[serde(rename = "Recovered")]
    pub recovered: i64,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, confirmed: i64, active: i64, deaths: i64, recovered: i64) -> Self {
        Self {
            date,
            confirmed,
            active,
            deaths,
            recovered,
        }
    }
}

// The API sends RFC 3339 timestamps at midnight UTC ("2020-01-22T00:00:00Z").
fn deserialize_day<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_day(&raw).map_err(serde::de::Error::custom)
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc).date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("invalid record date {raw:?}: {e}"))
}
