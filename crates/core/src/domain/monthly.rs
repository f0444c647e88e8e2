use crate::domain::record::DailyRecord;
use anyhow::{ensure, Context};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Records in `year` whose month is `month` or later are left out of the series.
///
/// Only the cutoff year itself is affected; later years pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cutoff {
    pub year: i32,
    pub month: u32,
}

impl Default for Cutoff {
    fn default() -> Self {
        Self { year: 2021, month: 8 }
    }
}

impl Cutoff {
    pub fn excludes(&self, year: i32, month: u32) -> bool {
        year == self.year && month >= self.month
    }
}

impl FromStr for Cutoff {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .with_context(|| format!("cutoff must look like YYYY-MM (got {s:?})"))?;
        let year = y
            .parse::<i32>()
            .with_context(|| format!("invalid cutoff year {y:?}"))?;
        let month = m
            .parse::<u32>()
            .with_context(|| format!("invalid cutoff month {m:?}"))?;
        ensure!((1..=12).contains(&month), "cutoff month must be 1..=12 (got {month})");
        Ok(Self { year, month })
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySample {
    pub year: i32,
    pub month: u32,
    /// Day of the record currently standing in for the month.
    pub day_of_month: u32,
    pub confirmed: i64,
    pub active: i64,
    pub death: i64,
    pub recovered: i64,
}

impl MonthlySample {
    fn from_record(record: &DailyRecord) -> Self {
        Self {
            year: record.date.year(),
            month: record.date.month(),
            day_of_month: record.date.day(),
            confirmed: record.confirmed,
            active: record.active,
            death: record.deaths,
            recovered: record.recovered,
        }
    }

    fn overwrite_from(&mut self, record: &DailyRecord) {
        self.day_of_month = record.date.day();
        self.confirmed = record.confirmed;
        self.active = record.active;
        self.death = record.deaths;
        self.recovered = record.recovered;
    }

    pub fn label(&self) -> String {
        format!("{}-{}월", self.year, self.month)
    }
}

/// Monthly samples in the order their month was first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySeries {
    samples: Vec<MonthlySample>,
}

impl MonthlySeries {
    pub fn samples(&self) -> &[MonthlySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The most recently opened month, if any record survived the cutoff.
    pub fn latest(&self) -> Option<&MonthlySample> {
        self.samples.last()
    }

    pub fn labels(&self) -> Vec<String> {
        self.samples.iter().map(MonthlySample::label).collect()
    }
}

/// Collapses daily records into one sample per (year, month).
///
/// Records are expected in non-decreasing date order. Within a month a record
/// replaces the current sample only when its day-of-month is strictly greater,
/// so an out-of-order earlier day never overwrites a later one.
pub fn aggregate_monthly(records: &[DailyRecord], cutoff: Option<Cutoff>) -> MonthlySeries {
    let mut samples: Vec<MonthlySample> = Vec::new();
    let mut index: HashMap<(i32, u32), usize> = HashMap::new();
    let mut dropped: usize = 0;

    for record in records {
        let (year, month, day) = (record.date.year(), record.date.month(), record.date.day());

        if cutoff.is_some_and(|c| c.excludes(year, month)) {
            dropped += 1;
            continue;
        }

        match index.get(&(year, month)) {
            None => {
                index.insert((year, month), samples.len());
                samples.push(MonthlySample::from_record(record));
            }
            Some(&pos) => {
                let sample = &mut samples[pos];
                if sample.day_of_month < day {
                    sample.overwrite_from(record);
                }
            }
        }
    }

    tracing::debug!(
        records = records.len(),
        months = samples.len(),
        dropped,
        "aggregated daily records by month"
    );

    MonthlySeries { samples }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn rec(y: i32, m: u32, d: u32, confirmed: i64, active: i64, deaths: i64, recovered: i64) -> DailyRecord {
        DailyRecord::new(
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            confirmed,
            active,
            deaths,
            recovered,
        )
    }

    #[test]
    fn keeps_the_last_day_of_each_month() {
        let records = vec![
            rec(2020, 1, 20, 1, 1, 0, 0),
            rec(2020, 1, 25, 3, 2, 0, 1),
            rec(2020, 2, 1, 5, 3, 1, 1),
        ];

        let series = aggregate_monthly(&records, Some(Cutoff::default()));
        assert_eq!(
            series.samples(),
            &[
                MonthlySample {
                    year: 2020,
                    month: 1,
                    day_of_month: 25,
                    confirmed: 3,
                    active: 2,
                    death: 0,
                    recovered: 1,
                },
                MonthlySample {
                    year: 2020,
                    month: 2,
                    day_of_month: 1,
                    confirmed: 5,
                    active: 3,
                    death: 1,
                    recovered: 1,
                },
            ]
        );
        assert_eq!(series.latest().map(|s| (s.year, s.month)), Some((2020, 2)));
        assert_eq!(series.labels(), vec!["2020-1월", "2020-2월"]);
    }

    #[test]
    fn out_of_order_earlier_day_does_not_overwrite() {
        let records = vec![rec(2020, 3, 20, 9, 9, 9, 9), rec(2020, 3, 10, 1, 1, 1, 1)];

        let series = aggregate_monthly(&records, None);
        assert_eq!(series.len(), 1);
        assert_eq!(series.samples()[0].day_of_month, 20);
        assert_eq!(series.samples()[0].confirmed, 9);
    }

    #[test]
    fn same_day_repeat_keeps_the_first_record() {
        let records = vec![rec(2020, 4, 5, 1, 1, 0, 0), rec(2020, 4, 5, 7, 7, 7, 7)];

        let series = aggregate_monthly(&records, None);
        assert_eq!(series.samples()[0].confirmed, 1);
    }

    #[test]
    fn records_from_august_2021_on_are_dropped() {
        let records = vec![
            rec(2021, 7, 31, 100, 10, 1, 89),
            rec(2021, 8, 5, 200, 20, 2, 178),
            rec(2021, 12, 1, 300, 30, 3, 267),
        ];

        let series = aggregate_monthly(&records, Some(Cutoff::default()));
        assert_eq!(series.len(), 1);
        assert!(series
            .samples()
            .iter()
            .all(|s| !(s.year == 2021 && s.month >= 8)));
        assert_eq!(series.latest().map(|s| s.confirmed), Some(100));
    }

    #[test]
    fn a_lone_record_past_the_cutoff_yields_nothing() {
        let series = aggregate_monthly(&[rec(2021, 8, 5, 1, 1, 1, 1)], Some(Cutoff::default()));
        assert!(series.is_empty());
        assert!(series.latest().is_none());
    }

    #[test]
    fn cutoff_only_applies_within_its_year() {
        let records = vec![rec(2020, 9, 1, 1, 1, 0, 0), rec(2022, 1, 1, 2, 2, 0, 0)];

        let series = aggregate_monthly(&records, Some(Cutoff::default()));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn one_sample_per_distinct_month_before_cutoff() {
        let mut records = Vec::new();
        for (m, d) in [(1, 3), (1, 9), (2, 1), (2, 28), (3, 15), (5, 2)] {
            records.push(rec(2021, m, d, d as i64, 0, 0, 0));
        }
        records.push(rec(2021, 9, 1, 0, 0, 0, 0));

        let expected: HashSet<(i32, u32)> = records
            .iter()
            .filter(|r| !(r.date.year() == 2021 && r.date.month() >= 8))
            .map(|r| (r.date.year(), r.date.month()))
            .collect();

        let series = aggregate_monthly(&records, Some(Cutoff::default()));
        assert_eq!(series.len(), expected.len());
    }

    #[test]
    fn aggregation_is_repeatable() {
        let records = vec![
            rec(2020, 1, 20, 1, 1, 0, 0),
            rec(2020, 1, 25, 3, 2, 0, 1),
            rec(2020, 2, 1, 5, 3, 1, 1),
        ];

        let first = aggregate_monthly(&records, Some(Cutoff::default()));
        let second = aggregate_monthly(&records, Some(Cutoff::default()));
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_gives_empty_series() {
        let series = aggregate_monthly(&[], Some(Cutoff::default()));
        assert!(series.is_empty());
        assert!(series.labels().is_empty());
        assert!(series.latest().is_none());
    }

    #[test]
    fn cutoff_round_trips_through_display() {
        let c: Cutoff = "2021-08".parse().unwrap();
        assert_eq!(c, Cutoff::default());
        assert_eq!(c.to_string(), "2021-08");
        assert!("2021".parse::<Cutoff>().is_err());
        assert!("2021-0".parse::<Cutoff>().is_err());
    }
}
