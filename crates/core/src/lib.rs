pub mod chart;
pub mod domain;
pub mod ingest;
pub mod load;

pub mod config {
    use crate::domain::monthly::Cutoff;
    use anyhow::Context;
    use std::path::PathBuf;

    pub const DEFAULT_BASE_URL: &str = "https://api.covid19api.com";
    pub const DEFAULT_COUNTRY: &str = "kr";
    pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_base_url: String,
        pub country: String,
        /// `None` disables the cutoff entirely.
        pub cutoff: Option<Cutoff>,
        pub fetch_timeout_secs: u64,
        pub sentry_dsn: Option<String>,
        /// Where the dashboard writes its log file while it owns the terminal.
        pub log_dir: PathBuf,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                api_base_url: DEFAULT_BASE_URL.to_string(),
                country: DEFAULT_COUNTRY.to_string(),
                cutoff: Some(Cutoff::default()),
                fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
                sentry_dsn: None,
                log_dir: std::env::temp_dir(),
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let mut out = Self::default();

            if let Some(url) = non_empty_var("COVID_API_BASE_URL") {
                out.api_base_url = url;
            }
            if let Some(country) = non_empty_var("COVID_COUNTRY") {
                out.country = country.to_lowercase();
            }
            if let Some(cutoff) = non_empty_var("COVID_CUTOFF") {
                out.cutoff = parse_cutoff_setting(&cutoff).context("COVID_CUTOFF is invalid")?;
            }
            if let Some(secs) = non_empty_var("COVID_FETCH_TIMEOUT_SECS") {
                out.fetch_timeout_secs = secs
                    .parse::<u64>()
                    .with_context(|| format!("COVID_FETCH_TIMEOUT_SECS must be an integer (got {secs})"))?;
            }
            out.sentry_dsn = non_empty_var("SENTRY_DSN");
            if let Some(dir) = non_empty_var("KCOVID_LOG_DIR") {
                out.log_dir = PathBuf::from(dir);
            }

            Ok(out)
        }
    }

    /// Parses `YYYY-MM` into a cutoff, or `none` / `off` into no cutoff.
    pub fn parse_cutoff_setting(s: &str) -> anyhow::Result<Option<Cutoff>> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("off") {
            return Ok(None);
        }
        Ok(Some(s.parse::<Cutoff>()?))
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

}
