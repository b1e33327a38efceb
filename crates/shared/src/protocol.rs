use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{EnrollmentForm, FilterPatch, StudentRecord},
    error::ServiceError,
};

/// Named events carried on the signal bus and folded into the student store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum Signal {
    EnrollStudent(EnrollmentForm),
    EnrollingStudent,
    StudentEnrolled(StudentRecord),
    EnrollmentError(ServiceError),
    LoadStudents(Option<Value>),
    LoadingStudents,
    StudentsLoaded(Option<Vec<StudentRecord>>),
    LoadError(ServiceError),
    SelectStudent(Option<StudentRecord>),
    SetStudentFilter(FilterPatch),
    Logout,
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Signal::EnrollStudent(_) => "ENROLL_STUDENT",
            Signal::EnrollingStudent => "ENROLLING_STUDENT",
            Signal::StudentEnrolled(_) => "STUDENT_ENROLLED",
            Signal::EnrollmentError(_) => "ENROLLMENT_ERROR",
            Signal::LoadStudents(_) => "LOAD_STUDENTS",
            Signal::LoadingStudents => "LOADING_STUDENTS",
            Signal::StudentsLoaded(_) => "STUDENTS_LOADED",
            Signal::LoadError(_) => "LOAD_ERROR",
            Signal::SelectStudent(_) => "SELECT_STUDENT",
            Signal::SetStudentFilter(_) => "SET_STUDENT_FILTER",
            Signal::Logout => "LOGOUT",
        }
    }

    /// ENROLL_STUDENT and LOAD_STUDENTS start a workflow instance.
    pub fn is_trigger(&self) -> bool {
        matches!(self, Signal::EnrollStudent(_) | Signal::LoadStudents(_))
    }
}

/// Request envelope handed to a named service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub body: Value,
}

impl ServiceRequest {
    pub fn new(body: Value) -> Self {
        Self { params: None, body }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ServiceResponse {
    pub fn with_data(data: Value) -> Self {
        Self { data, status: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}
