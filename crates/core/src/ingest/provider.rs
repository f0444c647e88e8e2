use crate::config::Settings;
use crate::domain::record::DailyRecord;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[async_trait::async_trait]
pub trait CaseSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Daily records for the configured country, oldest first.
    async fn fetch_daily_records(&self) -> Result<Vec<DailyRecord>>;
}

/// Single GET against the day-one totals endpoint. No retries.
#[derive(Debug, Clone)]
pub struct HttpCaseSource {
    http: reqwest::Client,
    base_url: String,
    country: String,
}

impl HttpCaseSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .build()
            .context("failed to build case api http client")?;

        Ok(Self {
            http,
            base_url: settings.api_base_url.clone(),
            country: settings.country.clone(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/total/dayone/country/{}",
            self.base_url.trim_end_matches('/'),
            self.country
        )
    }
}

#[async_trait::async_trait]
impl CaseSource for HttpCaseSource {
    fn source_name(&self) -> &'static str {
        "covid19api_http"
    }

    async fn fetch_daily_records(&self) -> Result<Vec<DailyRecord>> {
        let url = self.url();
        tracing::info!(%url, country = %self.country, "fetching daily case records");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .context("case api request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read case api response")?;

        if !status.is_success() {
            anyhow::bail!("case api HTTP {status}: {}", truncate(&text, 200));
        }

        let records = serde_json::from_str::<Vec<DailyRecord>>(&text)
            .context("case api response is not a JSON array of daily records")?;

        tracing::info!(records = records.len(), "fetched daily case records");
        Ok(records)
    }
}

/// Reads a JSON array of daily records from disk, same shape as the API body.
#[derive(Debug, Clone)]
pub struct JsonFileCaseSource {
    path: PathBuf,
}

impl JsonFileCaseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl CaseSource for JsonFileCaseSource {
    fn source_name(&self) -> &'static str {
        "json_file"
    }

    async fn fetch_daily_records(&self) -> Result<Vec<DailyRecord>> {
        let path = self.path.clone();
        let text = tokio::task::spawn_blocking(move || std::fs::read_to_string(path))
            .await
            .context("file read task panicked")?
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        serde_json::from_str::<Vec<DailyRecord>>(&text)
            .with_context(|| format!("{} is not a JSON array of daily records", self.path.display()))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::{load_dashboard, FetchOutcome};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    /// Answers exactly one request with `status` and `body`, returns the base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}")
    }

    // Local test servers must not be routed through an ambient HTTP proxy.
    fn http_source(base_url: String) -> HttpCaseSource {
        HttpCaseSource {
            http: reqwest::Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
            base_url,
            country: "kr".to_string(),
        }
    }

    async fn failure_reason(source: &dyn CaseSource) -> String {
        let token = CancellationToken::new();
        match load_dashboard(source, None, &token).await {
            Some(FetchOutcome::Failed { reason }) => reason,
            other => panic!("expected a failed load, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_source_loads_records() {
        let base = serve_once(
            "200 OK",
            r#"[{"Date":"2020-01-22T00:00:00Z","Confirmed":1,"Active":1,"Deaths":0,"Recovered":0}]"#,
        )
        .await;

        let records = http_source(base).fetch_daily_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].active, 1);
    }

    #[tokio::test]
    async fn non_success_status_carries_status_and_body() {
        let base = serve_once("503 Service Unavailable", "upstream is down").await;

        let reason = failure_reason(&http_source(base)).await;
        assert!(reason.contains("HTTP 503"), "{reason}");
        assert!(reason.contains("upstream is down"), "{reason}");
    }

    #[tokio::test]
    async fn non_array_body_is_rejected() {
        let base = serve_once("200 OK", r#"{"message":"rate limited"}"#).await;

        let reason = failure_reason(&http_source(base)).await;
        assert!(reason.contains("not a JSON array of daily records"), "{reason}");
    }

    #[tokio::test]
    async fn connection_refused_is_a_request_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let reason = failure_reason(&http_source(format!("http://{addr}"))).await;
        assert!(reason.contains("case api request failed"), "{reason}");
    }

    #[test]
    fn builds_day_one_url_for_country() {
        let settings = Settings {
            api_base_url: "https://api.example.test/".to_string(),
            ..Settings::default()
        };
        let source = HttpCaseSource::from_settings(&settings).unwrap();
        assert_eq!(source.url(), "https://api.example.test/total/dayone/country/kr");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("확진자", 2), "확진");
        assert_eq!(truncate("ok", 10), "ok");
    }

    #[tokio::test]
    async fn file_source_reads_records() {
        let path = std::env::temp_dir().join(format!("kcovid-records-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"Date":"2020-01-22T00:00:00Z","Confirmed":1,"Active":1,"Deaths":0,"Recovered":0}]"#,
        )
        .unwrap();

        let records = JsonFileCaseSource::new(&path).fetch_daily_records().await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confirmed, 1);
    }

    #[tokio::test]
    async fn file_source_reports_missing_file() {
        let err = JsonFileCaseSource::new("/definitely/not/here.json")
            .fetch_daily_records()
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"));
    }

    #[tokio::test]
    async fn file_source_rejects_malformed_json() {
        let path = std::env::temp_dir().join(format!("kcovid-malformed-{}.json", std::process::id()));
        std::fs::write(&path, r#"[{"Date":"2020-01-22T00:00:00Z","Confirmed":"#).unwrap();

        let reason = failure_reason(&JsonFileCaseSource::new(&path)).await;
        std::fs::remove_file(&path).ok();

        assert!(reason.contains("is not a JSON array of daily records"), "{reason}");
    }
}
