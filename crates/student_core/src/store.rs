//! Student list state and the reducer that folds signals into it.

use std::sync::Arc;

use shared::{
    domain::{EnrollmentFilters, StudentRecord},
    error::ServiceError,
    protocol::Signal,
};
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentListState {
    pub students: Vec<StudentRecord>,
    pub selected_student: Option<StudentRecord>,
    pub loading: bool,
    pub error: Option<ServiceError>,
    pub filters: EnrollmentFilters,
}

impl StudentListState {
    pub fn initial() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Applies one signal to the student list state.
///
/// `None` yields the initial state. Signals the store does not track return
/// the same `Arc`, so callers can detect "no change" with `Arc::ptr_eq`.
pub fn reduce(state: Option<Arc<StudentListState>>, signal: &Signal) -> Arc<StudentListState> {
    let Some(state) = state else {
        return StudentListState::initial();
    };

    let next = match signal {
        Signal::LoadingStudents => StudentListState {
            loading: true,
            error: None,
            ..(*state).clone()
        },
        Signal::StudentsLoaded(students) => StudentListState {
            students: students.clone().unwrap_or_default(),
            loading: false,
            ..(*state).clone()
        },
        Signal::LoadError(error) => StudentListState {
            loading: false,
            error: Some(error.clone()),
            ..(*state).clone()
        },
        Signal::EnrollmentError(error) => StudentListState {
            error: Some(error.clone()),
            ..(*state).clone()
        },
        Signal::StudentEnrolled(student) => {
            let mut students = state.students.clone();
            students.push(student.clone());
            StudentListState {
                students,
                ..(*state).clone()
            }
        }
        Signal::SelectStudent(student) => StudentListState {
            selected_student: student.clone(),
            ..(*state).clone()
        },
        Signal::SetStudentFilter(patch) => StudentListState {
            filters: patch.apply_to(&state.filters),
            ..(*state).clone()
        },
        Signal::Logout => return StudentListState::initial(),
        Signal::EnrollStudent(_) | Signal::EnrollingStudent | Signal::LoadStudents(_) => {
            return state
        }
    };

    Arc::new(next)
}

/// Single-writer holder of the current state. Readers get cheap snapshots or
/// subscribe for changes.
#[derive(Clone)]
pub struct StudentStore {
    state: Arc<watch::Sender<Arc<StudentListState>>>,
}

impl Default for StudentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StudentStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(StudentListState::initial());
        Self {
            state: Arc::new(state),
        }
    }

    /// Reduces `signal` into the store. Returns whether the state changed.
    pub fn apply(&self, signal: &Signal) -> bool {
        self.state.send_if_modified(|current| {
            let next = reduce(Some(current.clone()), signal);
            if Arc::ptr_eq(&next, current) {
                return false;
            }
            *current = next;
            true
        })
    }

    pub fn snapshot(&self) -> Arc<StudentListState> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<StudentListState>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
