use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    error::{ErrorCode, ServiceError},
    protocol::{ServiceRequest, ServiceResponse},
};
use tracing::debug;
use url::Url;

use crate::{ServiceInvoker, Settings, SettingsError};

/// Invokes named services over HTTP: `POST {base}/services/{name}` with the
/// request envelope as JSON, answered by `{ "data": ... }`.
pub struct HttpServiceInvoker {
    http: Client,
    base_url: Url,
}

impl HttpServiceInvoker {
    pub fn new(settings: &Settings) -> Result<Self, SettingsError> {
        Ok(Self {
            http: Client::new(),
            base_url: settings.service_base()?,
        })
    }

    fn service_url(&self, service: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(&format!("services/{service}"))
            .map_err(|err| {
                ServiceError::new(
                    ErrorCode::Validation,
                    format!("invalid service name '{service}': {err}"),
                )
            })
    }
}

#[async_trait]
impl ServiceInvoker for HttpServiceInvoker {
    async fn invoke(
        &self,
        service: &str,
        request: ServiceRequest,
    ) -> Result<ServiceResponse, ServiceError> {
        let url = self.service_url(service)?;
        debug!(service, %url, "invoking service");

        let res = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| ServiceError::transport(format!("{service}: {err}")))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(error_from_response(service, status, &body));
        }

        let mut response: ServiceResponse = res.json().await.map_err(|err| {
            ServiceError::internal(format!("malformed {service} response: {err}"))
        })?;
        response.status.get_or_insert(status.as_u16());
        Ok(response)
    }
}

fn error_from_response(service: &str, status: StatusCode, body: &str) -> ServiceError {
    if let Ok(error) = serde_json::from_str::<ServiceError>(body) {
        return error;
    }
    let message = if body.trim().is_empty() {
        format!("{service} failed with status {status}")
    } else {
        format!("{service} failed with status {status}: {}", body.trim())
    };
    ServiceError::new(code_for_status(status), message)
}

pub fn code_for_status(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
        StatusCode::FORBIDDEN => ErrorCode::Forbidden,
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorCode::Validation,
        StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimited,
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            ErrorCode::Unavailable
        }
        _ => ErrorCode::Internal,
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
