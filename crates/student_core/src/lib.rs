use async_trait::async_trait;
use serde_json::Value;
use shared::{
    error::{ErrorCode, ServiceError},
    protocol::{NoticeKind, ServiceRequest, ServiceResponse},
};

pub mod forms;
pub mod grade;
pub mod http;
pub mod runtime;
pub mod settings;
pub mod store;
pub mod validation;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpServiceInvoker;
pub use runtime::{Dispatcher, StudentRuntime};
pub use settings::{Settings, SettingsError};
pub use store::{reduce, StudentListState, StudentStore};
pub use workflow::{FlowContext, FlowKind, FlowPhase, FlowReport};

pub const ENROLL_SUCCESS_MESSAGE: &str = "Student enrolled successfully!";
pub const ENROLL_FAILURE_MESSAGE: &str = "Failed to enroll student";
pub const ENROLL_RETRY_MESSAGE: &str = "Failed to enroll student. Please try again.";
pub const LOAD_FAILURE_MESSAGE: &str = "Failed to load students";
pub const FORM_ERRORS_MESSAGE: &str = "Please fix the form errors";
pub const VALIDATION_PASSED_MESSAGE: &str = "Validation passed";

/// Request/response access to the named student services.
#[async_trait]
pub trait ServiceInvoker: Send + Sync {
    async fn invoke(
        &self,
        service: &str,
        request: ServiceRequest,
    ) -> Result<ServiceResponse, ServiceError>;
}

pub struct MissingServiceInvoker;

#[async_trait]
impl ServiceInvoker for MissingServiceInvoker {
    async fn invoke(
        &self,
        service: &str,
        _request: ServiceRequest,
    ) -> Result<ServiceResponse, ServiceError> {
        Err(ServiceError::new(
            ErrorCode::Unavailable,
            format!("no service backend configured for {service}"),
        ))
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Field-level access to the form that triggered a callback.
pub trait FormSurface: Send + Sync {
    fn set_field_value(&self, field: &str, value: Value);
    fn set_field_error(&self, field: &str, message: &str);
    fn set_submitting(&self, submitting: bool);
    fn reset_form(&self);
}

/// Notifier that only writes to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => tracing::info!(message, "notification"),
            NoticeKind::Error => tracing::warn!(message, "error notification"),
        }
    }
}

pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        tracing::info!(path, "navigation requested");
    }
}
