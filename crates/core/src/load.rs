use crate::chart::DashboardCharts;
use crate::domain::monthly::{aggregate_monthly, Cutoff};
use crate::ingest::provider::CaseSource;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Loaded(DashboardCharts),
    Failed { reason: String },
}

/// Fetches, aggregates and projects once.
///
/// Returns `None` when `cancel` fires before the fetch resolves; whatever the
/// source would have produced is discarded.
pub async fn load_dashboard(
    source: &dyn CaseSource,
    cutoff: Option<Cutoff>,
    cancel: &CancellationToken,
) -> Option<FetchOutcome> {
    let fetched = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!(source = source.source_name(), "load cancelled before fetch completed");
            return None;
        }
        res = source.fetch_daily_records() => res,
    };

    let outcome = match fetched {
        Ok(records) => {
            let series = aggregate_monthly(&records, cutoff);
            if series.is_empty() {
                tracing::warn!(records = records.len(), "no monthly samples survived aggregation");
            }
            FetchOutcome::Loaded(DashboardCharts::from_series(&series))
        }
        Err(err) => {
            tracing::error!(source = source.source_name(), error = %format!("{err:#}"), "case fetch failed");
            FetchOutcome::Failed {
                reason: format!("{err:#}"),
            }
        }
    };

    Some(outcome)
}

/// What the dashboard currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    Pending,
    Ready(DashboardCharts),
    Failed { reason: String },
}

impl DashboardState {
    pub fn apply(&mut self, outcome: FetchOutcome) {
        *self = match outcome {
            FetchOutcome::Loaded(charts) => Self::Ready(charts),
            FetchOutcome::Failed { reason } => Self::Failed { reason },
        };
    }

    /// Charts to draw: real data when ready, placeholders otherwise.
    pub fn charts(&self) -> DashboardCharts {
        match self {
            Self::Ready(charts) => charts.clone(),
            Self::Pending | Self::Failed { .. } => DashboardCharts::placeholder(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}
