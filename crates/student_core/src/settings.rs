use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::grade::DEFAULT_PASSING_SCORE;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid service base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("service base url '{0}' must use http or https")]
    UnsupportedScheme(String),
}

/// Plugin settings handed over by the host at initialization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service_base_url: String,
    pub create_service: String,
    pub query_service: String,
    pub students_path: String,
    pub navigation_delay_ms: u64,
    pub passing_score: f64,
    pub signal_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_base_url: "http://127.0.0.1:8080".into(),
            create_service: "createStudent".into(),
            query_service: "queryStudents".into(),
            students_path: "/students".into(),
            navigation_delay_ms: 1500,
            passing_score: DEFAULT_PASSING_SCORE,
            signal_capacity: 256,
        }
    }
}

impl Settings {
    pub fn navigation_delay(&self) -> Duration {
        Duration::from_millis(self.navigation_delay_ms)
    }

    /// Base URL normalized to end with `/` so service names join beneath it.
    pub fn service_base(&self) -> Result<Url, SettingsError> {
        let mut url = Url::parse(self.service_base_url.trim()).map_err(|source| {
            SettingsError::InvalidBaseUrl {
                url: self.service_base_url.clone(),
                source,
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingsError::UnsupportedScheme(self.service_base_url.clone()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}
