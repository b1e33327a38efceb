//! Recording doubles for the host capabilities.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::Value;
use shared::{
    error::ServiceError,
    protocol::{NoticeKind, ServiceRequest, ServiceResponse},
};

use crate::{
    runtime::Dispatcher, workflow::FlowContext, FormSurface, Navigator, Notifier, ServiceInvoker,
    Settings,
};

type Reply = Result<ServiceResponse, ServiceError>;

#[derive(Default)]
pub struct StubServices {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, ServiceRequest)>>,
}

impl StubServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, service: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .entry(service.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn ok(self, service: &str, data: Value) -> Self {
        self.reply(service, Ok(ServiceResponse::with_data(data)))
    }

    pub fn fail(self, service: &str, error: ServiceError) -> Self {
        self.reply(service, Err(error))
    }

    pub fn recorded_calls(&self) -> Vec<(String, ServiceRequest)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ServiceInvoker for StubServices {
    async fn invoke(&self, service: &str, request: ServiceRequest) -> Reply {
        self.calls
            .lock()
            .expect("calls lock")
            .push((service.to_string(), request));
        self.replies
            .lock()
            .expect("replies lock")
            .get_mut(service)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(ServiceError::internal(format!("no stub for {service}"))))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<(NoticeKind, String)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        self.notices.lock().expect("notices lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        self.notices
            .lock()
            .expect("notices lock")
            .push((kind, message.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().expect("paths lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths.lock().expect("paths lock").push(path.to_string());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormOp {
    Value(String, Value),
    Error(String, String),
    Submitting(bool),
    Reset,
}

#[derive(Default)]
pub struct RecordingForm {
    pub ops: Mutex<Vec<FormOp>>,
}

impl RecordingForm {
    pub fn ops(&self) -> Vec<FormOp> {
        self.ops.lock().expect("ops lock").clone()
    }

    fn push(&self, op: FormOp) {
        self.ops.lock().expect("ops lock").push(op);
    }
}

impl FormSurface for RecordingForm {
    fn set_field_value(&self, field: &str, value: Value) {
        self.push(FormOp::Value(field.to_string(), value));
    }

    fn set_field_error(&self, field: &str, message: &str) {
        self.push(FormOp::Error(field.to_string(), message.to_string()));
    }

    fn set_submitting(&self, submitting: bool) {
        self.push(FormOp::Submitting(submitting));
    }

    fn reset_form(&self) {
        self.push(FormOp::Reset);
    }
}

/// A flow context wired to recording doubles.
pub struct Harness {
    pub ctx: FlowContext,
    pub services: Arc<StubServices>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new(services: StubServices) -> Self {
        Self::with_settings(services, Settings::default())
    }

    pub fn with_settings(services: StubServices, settings: Settings) -> Self {
        let services = Arc::new(services);
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let ctx = FlowContext {
            dispatcher: Dispatcher::new(settings.signal_capacity),
            services: services.clone(),
            notifier: notifier.clone(),
            navigator: navigator.clone(),
            settings: Arc::new(settings),
        };
        Self {
            ctx,
            services,
            notifier,
            navigator,
        }
    }
}
