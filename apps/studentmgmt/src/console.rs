//! Terminal stand-ins for the host's message, navigation and form surfaces.

use serde_json::Value;
use shared::protocol::NoticeKind;
use student_core::{FormSurface, Navigator, Notifier};

pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => println!("ok: {message}"),
            NoticeKind::Error => eprintln!("error: {message}"),
        }
    }
}

pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, path: &str) {
        println!("-> {path}");
    }
}

pub struct ConsoleForm;

impl FormSurface for ConsoleForm {
    fn set_field_value(&self, field: &str, value: Value) {
        println!("  {field} = {value}");
    }

    fn set_field_error(&self, field: &str, message: &str) {
        eprintln!("  {field}: {message}");
    }

    fn set_submitting(&self, submitting: bool) {
        tracing::debug!(submitting, "form submitting state");
    }

    fn reset_form(&self) {
        tracing::debug!("form reset");
    }
}
