//! Form callbacks: validate an enrollment, compute a grade, submit an
//! enrollment straight from the form.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use shared::{
    domain::{EnrollmentForm, GradeInput},
    protocol::{NoticeKind, ServiceRequest, Signal},
};
use tracing::error;

use crate::{
    grade::{grade_from_input, GradeError, GradeOutcome},
    validation::{validate, ValidationReport},
    workflow::{decode_record, FlowContext, FlowKind, FlowPhase, FlowReport, FlowTracker},
    FormSurface, Notifier, ENROLL_RETRY_MESSAGE, ENROLL_SUCCESS_MESSAGE, FORM_ERRORS_MESSAGE,
    VALIDATION_PASSED_MESSAGE,
};

pub const PERCENTAGE_FIELD: &str = "Percentage";
pub const PASSED_FIELD: &str = "Passed";

/// Validates the enrollment form, annotating each failing field.
pub fn validate_enrollment(
    input: &EnrollmentForm,
    today: NaiveDate,
    form: Option<&dyn FormSurface>,
    notifier: &dyn Notifier,
) -> ValidationReport {
    let report = validate(input, today);
    if report.is_valid() {
        notifier.notify(NoticeKind::Success, VALIDATION_PASSED_MESSAGE);
        return report;
    }

    if let Some(form) = form {
        for (field, message) in &report.errors {
            form.set_field_error(field.as_str(), message);
        }
    }
    notifier.notify(NoticeKind::Error, FORM_ERRORS_MESSAGE);
    report
}

/// Computes the grade and writes `Percentage` and `Passed` back to the form.
/// A zero max score is reported once and leaves the form untouched.
pub fn apply_grade(
    input: &GradeInput,
    default_passing_score: f64,
    form: Option<&dyn FormSurface>,
    notifier: &dyn Notifier,
) -> Result<GradeOutcome, GradeError> {
    let outcome = grade_from_input(input, default_passing_score).map_err(|err| {
        notifier.notify(NoticeKind::Error, &err.to_string());
        err
    })?;

    if let Some(form) = form {
        form.set_field_value(PERCENTAGE_FIELD, Value::from(outcome.percentage));
        form.set_field_value(PASSED_FIELD, Value::Bool(outcome.passed));
    }
    Ok(outcome)
}

/// Submits the enrollment form directly to the create service and feeds the
/// created record into the store.
pub async fn submit_enrollment(
    ctx: &FlowContext,
    form: Option<Arc<dyn FormSurface>>,
    input: &EnrollmentForm,
) -> FlowReport {
    let mut flow = FlowTracker::start(FlowKind::FormSubmit);
    flow.advance(FlowPhase::Submitting);
    if let Some(form) = &form {
        form.set_submitting(true);
    }

    flow.advance(FlowPhase::AwaitingResponse);
    let created = ctx
        .services
        .invoke(
            &ctx.settings.create_service,
            ServiceRequest::new(input.create_payload()),
        )
        .await
        .and_then(|response| decode_record(&ctx.settings.create_service, response));

    match created {
        Ok(record) => {
            if let Some(form) = &form {
                form.set_submitting(false);
                form.reset_form();
            }
            ctx.notifier.notify(NoticeKind::Success, ENROLL_SUCCESS_MESSAGE);
            ctx.dispatcher.dispatch(Signal::StudentEnrolled(record));
            tokio::time::sleep(ctx.settings.navigation_delay()).await;
            ctx.navigator.navigate(&ctx.settings.students_path);
            flow.succeed()
        }
        Err(err) => {
            if let Some(form) = &form {
                form.set_submitting(false);
            }
            ctx.notifier.notify(NoticeKind::Error, ENROLL_RETRY_MESSAGE);
            error!(flow_id = %flow.flow_id(), error = %err, "enrollment error");
            flow.fail(err)
        }
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
