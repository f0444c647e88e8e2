//! Chart-ready projections of a [`MonthlySeries`].
//!
//! The JSON shape mirrors what web charting layers expect for labeled
//! multi-series data: `labels` plus `datasets[]`, each dataset aligned with the
//! labels by position.

use crate::domain::monthly::MonthlySeries;
use serde::{Deserialize, Serialize};

pub const CONFIRMED_LABEL: &str = "국내 누적 확인자";
pub const RECOVERED_LABEL: &str = "국내 누적 완치자";
pub const ACTIVE_LABEL: &str = "월별 격리자 현황";
pub const BREAKDOWN_LABEL: &str = "누적 확진, 해제, 사망 비율";
pub const BREAKDOWN_CATEGORIES: [&str; 3] = ["확진자", "격리해제", "사망"];
pub const BREAKDOWN_COLORS: [&str; 3] = ["#ff3d67", "#059bff", "#ffc233"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Single(String),
    PerPoint(Vec<String>),
}

impl ColorSpec {
    pub fn single(color: &str) -> Self {
        Self::Single(color.to_string())
    }

    /// Colour for the data point at `idx`.
    pub fn at(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Single(c) => Some(c.as_str()),
            Self::PerPoint(cs) => cs.get(idx).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<i64>,
    pub background_color: ColorSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<ColorSpec>,
    #[serde(default)]
    pub fill: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    /// A single zero-valued point, shown until real data arrives.
    pub fn placeholder(label: &str, color: ColorSpec, fill: bool) -> Self {
        Self {
            labels: vec![String::new()],
            datasets: vec![Dataset {
                label: label.to_string(),
                data: vec![0],
                background_color: color,
                border_color: None,
                fill,
            }],
        }
    }

    pub fn max_value(&self) -> i64 {
        self.datasets
            .iter()
            .flat_map(|d| d.data.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

pub fn cumulative_chart(series: &MonthlySeries) -> ChartData {
    ChartData {
        labels: series.labels(),
        datasets: vec![
            Dataset {
                label: CONFIRMED_LABEL.to_string(),
                data: series.samples().iter().map(|s| s.confirmed).collect(),
                background_color: ColorSpec::single("salmon"),
                border_color: None,
                fill: true,
            },
            Dataset {
                label: RECOVERED_LABEL.to_string(),
                data: series.samples().iter().map(|s| s.recovered).collect(),
                background_color: ColorSpec::single("green"),
                border_color: None,
                fill: true,
            },
        ],
    }
}

pub fn active_chart(series: &MonthlySeries) -> ChartData {
    ChartData {
        labels: series.labels(),
        datasets: vec![Dataset {
            label: ACTIVE_LABEL.to_string(),
            data: series.samples().iter().map(|s| s.active).collect(),
            background_color: ColorSpec::single("salmon"),
            border_color: Some(ColorSpec::single("salmon")),
            fill: false,
        }],
    }
}

/// Confirmed / recovered / death counts of the latest month.
pub fn breakdown_chart(series: &MonthlySeries) -> Option<ChartData> {
    let latest = series.latest()?;
    let colors = ColorSpec::PerPoint(BREAKDOWN_COLORS.iter().map(|c| c.to_string()).collect());

    Some(ChartData {
        labels: BREAKDOWN_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        datasets: vec![Dataset {
            label: BREAKDOWN_LABEL.to_string(),
            data: vec![latest.confirmed, latest.recovered, latest.death],
            background_color: colors.clone(),
            border_color: Some(colors),
            fill: false,
        }],
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Area,
    Line,
    Doughnut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendPosition {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPanel {
    pub kind: ChartKind,
    pub title: String,
    pub legend: LegendPosition,
    pub data: ChartData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCharts {
    pub cumulative: ChartPanel,
    pub active: ChartPanel,
    pub breakdown: ChartPanel,
}

impl DashboardCharts {
    pub fn placeholder() -> Self {
        Self {
            cumulative: ChartPanel {
                kind: ChartKind::Area,
                title: "누적 확진자 추이".to_string(),
                legend: LegendPosition::Bottom,
                data: ChartData::placeholder(CONFIRMED_LABEL, ColorSpec::single("salmon"), true),
            },
            active: ChartPanel {
                kind: ChartKind::Line,
                title: "월별 격리자 현황".to_string(),
                legend: LegendPosition::Bottom,
                data: ChartData::placeholder(ACTIVE_LABEL, ColorSpec::single("salmon"), false),
            },
            breakdown: ChartPanel {
                kind: ChartKind::Doughnut,
                title: "누적 확진, 해제, 사망".to_string(),
                legend: LegendPosition::Top,
                data: ChartData::placeholder("", ColorSpec::PerPoint(vec![String::new()]), false),
            },
        }
    }

    /// Builds all three panels. An empty series keeps the breakdown placeholder
    /// since there is no latest month to show.
    pub fn from_series(series: &MonthlySeries) -> Self {
        let mut out = Self::placeholder();
        out.cumulative.data = cumulative_chart(series);
        out.active.data = active_chart(series);

        if let (Some(latest), Some(data)) = (series.latest(), breakdown_chart(series)) {
            out.breakdown.title = format!("누적 확진, 해제, 사망 ({}월)", latest.month);
            out.breakdown.data = data;
        }

        out
    }
}
