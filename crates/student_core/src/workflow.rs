//! Enroll and load workflows.
//!
//! Each workflow instance is a single async task that suspends at the
//! service call and, for enrollment, at the delay before navigation. Progress
//! is tracked as an explicit [`FlowPhase`] so a finished instance reports
//! where it ended.

use std::sync::Arc;

use serde_json::{Map, Value};
use shared::{
    domain::{EnrollmentForm, StudentRecord},
    error::ServiceError,
    protocol::{NoticeKind, ServiceRequest, ServiceResponse, Signal},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    runtime::Dispatcher, Navigator, Notifier, ServiceInvoker, Settings, ENROLL_FAILURE_MESSAGE,
    ENROLL_SUCCESS_MESSAGE, LOAD_FAILURE_MESSAGE,
};

/// Capabilities a workflow instance needs, shared by every instance.
#[derive(Clone)]
pub struct FlowContext {
    pub dispatcher: Dispatcher,
    pub services: Arc<dyn ServiceInvoker>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    pub settings: Arc<Settings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Enroll,
    Load,
    FormSubmit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    Submitting,
    AwaitingResponse,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowReport {
    pub flow_id: Uuid,
    pub kind: FlowKind,
    pub phase: FlowPhase,
    pub error: Option<ServiceError>,
}

impl FlowReport {
    pub fn succeeded(&self) -> bool {
        self.phase == FlowPhase::Succeeded
    }
}

pub(crate) struct FlowTracker {
    flow_id: Uuid,
    kind: FlowKind,
    phase: FlowPhase,
}

impl FlowTracker {
    pub(crate) fn start(kind: FlowKind) -> Self {
        let flow_id = Uuid::new_v4();
        info!(%flow_id, ?kind, "workflow started");
        Self {
            flow_id,
            kind,
            phase: FlowPhase::Idle,
        }
    }

    pub(crate) fn advance(&mut self, next: FlowPhase) {
        debug!(flow_id = %self.flow_id, from = ?self.phase, to = ?next, "workflow phase");
        self.phase = next;
    }

    pub(crate) fn succeed(mut self) -> FlowReport {
        self.advance(FlowPhase::Succeeded);
        info!(flow_id = %self.flow_id, kind = ?self.kind, "workflow finished");
        self.report(None)
    }

    pub(crate) fn fail(mut self, error: ServiceError) -> FlowReport {
        self.advance(FlowPhase::Failed);
        self.report(Some(error))
    }

    pub(crate) fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    fn report(self, error: Option<ServiceError>) -> FlowReport {
        FlowReport {
            flow_id: self.flow_id,
            kind: self.kind,
            phase: self.phase,
            error,
        }
    }
}

/// Creates a student from an ENROLL_STUDENT payload.
pub async fn enroll_flow(ctx: FlowContext, form: EnrollmentForm) -> FlowReport {
    let mut flow = FlowTracker::start(FlowKind::Enroll);
    flow.advance(FlowPhase::Submitting);
    ctx.dispatcher.dispatch(Signal::EnrollingStudent);

    let body = match serde_json::to_value(&form) {
        Ok(body) => body,
        Err(err) => {
            let err = ServiceError::internal(format!("failed to encode enrollment: {err}"));
            return enrollment_failed(&ctx, flow, err);
        }
    };

    flow.advance(FlowPhase::AwaitingResponse);
    let created = ctx
        .services
        .invoke(&ctx.settings.create_service, ServiceRequest::new(body))
        .await
        .and_then(|response| decode_record(&ctx.settings.create_service, response));

    match created {
        Ok(record) => {
            ctx.dispatcher.dispatch(Signal::StudentEnrolled(record));
            ctx.notifier.notify(NoticeKind::Success, ENROLL_SUCCESS_MESSAGE);
            tokio::time::sleep(ctx.settings.navigation_delay()).await;
            ctx.navigator.navigate(&ctx.settings.students_path);
            flow.succeed()
        }
        Err(err) => enrollment_failed(&ctx, flow, err),
    }
}

fn enrollment_failed(ctx: &FlowContext, flow: FlowTracker, err: ServiceError) -> FlowReport {
    error!(flow_id = %flow.flow_id(), error = %err, "enrollment error");
    ctx.dispatcher.dispatch(Signal::EnrollmentError(err.clone()));
    ctx.notifier.notify(NoticeKind::Error, ENROLL_FAILURE_MESSAGE);
    flow.fail(err)
}

/// Queries students for a LOAD_STUDENTS payload; no payload means no filter.
pub async fn load_flow(ctx: FlowContext, filter: Option<Value>) -> FlowReport {
    let mut flow = FlowTracker::start(FlowKind::Load);
    flow.advance(FlowPhase::Submitting);
    ctx.dispatcher.dispatch(Signal::LoadingStudents);

    let body = filter.unwrap_or_else(|| Value::Object(Map::new()));
    flow.advance(FlowPhase::AwaitingResponse);
    let loaded = ctx
        .services
        .invoke(&ctx.settings.query_service, ServiceRequest::new(body))
        .await
        .and_then(|response| decode_records(&ctx.settings.query_service, response));

    match loaded {
        Ok(students) => {
            debug!(
                flow_id = %flow.flow_id(),
                count = students.as_ref().map_or(0, Vec::len),
                "students loaded"
            );
            ctx.dispatcher.dispatch(Signal::StudentsLoaded(students));
            flow.succeed()
        }
        Err(err) => {
            warn!(flow_id = %flow.flow_id(), error = %err, "failed to load students");
            ctx.dispatcher.dispatch(Signal::LoadError(err.clone()));
            ctx.notifier.notify(NoticeKind::Error, LOAD_FAILURE_MESSAGE);
            flow.fail(err)
        }
    }
}

pub(crate) fn decode_record(
    service: &str,
    response: ServiceResponse,
) -> Result<StudentRecord, ServiceError> {
    serde_json::from_value(response.data).map_err(|err| {
        ServiceError::internal(format!("malformed {service} response: {err}"))
    })
}

fn decode_records(
    service: &str,
    response: ServiceResponse,
) -> Result<Option<Vec<StudentRecord>>, ServiceError> {
    serde_json::from_value(response.data).map_err(|err| {
        ServiceError::internal(format!("malformed {service} response: {err}"))
    })
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
