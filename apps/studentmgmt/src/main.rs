use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::{
    domain::{EnrollmentForm, FieldValue, FilterPatch, GradeInput},
    protocol::Signal,
};
use student_core::{
    forms::{apply_grade, submit_enrollment, validate_enrollment},
    FormSurface, HttpServiceInvoker, Settings, StudentRuntime,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod console;

use config::{load_settings, DEFAULT_CONFIG_FILE};
use console::{ConsoleForm, ConsoleNavigator, ConsoleNotifier};

#[derive(Parser, Debug)]
struct Args {
    /// Settings file; missing files fall back to defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone)]
struct StudentArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    grade: Option<String>,
    /// Date of birth, YYYY-MM-DD
    #[arg(long = "dob")]
    date_of_birth: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

impl From<StudentArgs> for EnrollmentForm {
    fn from(args: StudentArgs) -> Self {
        Self {
            name: args.name,
            email: args.email,
            grade: args.grade,
            date_of_birth: args.date_of_birth,
            phone: args.phone,
            ..Self::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check enrollment input without submitting it
    Validate(StudentArgs),
    /// Compute an exam percentage and pass flag
    Grade {
        #[arg(long)]
        score: Option<String>,
        #[arg(long)]
        max_score: Option<String>,
        #[arg(long)]
        passing_score: Option<String>,
    },
    /// Validate and submit a new student
    Enroll(StudentArgs),
    /// Load the student list
    List {
        #[arg(long)]
        grade: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = load_settings(&args.config);

    match args.command {
        Command::Validate(student) => {
            let form = EnrollmentForm::from(student);
            ensure_valid(&form)
        }
        Command::Grade {
            score,
            max_score,
            passing_score,
        } => {
            let input = GradeInput {
                score: score.as_deref().map(FieldValue::from),
                max_score: max_score.as_deref().map(FieldValue::from),
                passing_score: passing_score.as_deref().map(FieldValue::from),
            };
            let outcome = apply_grade(
                &input,
                settings.passing_score,
                Some(&ConsoleForm),
                &ConsoleNotifier,
            )?;
            info!(percentage = outcome.percentage, passed = outcome.passed, "grade computed");
            Ok(())
        }
        Command::Enroll(student) => {
            let form = EnrollmentForm::from(student);
            ensure_valid(&form)?;
            enroll(settings, form).await
        }
        Command::List { grade, status } => list(settings, grade, status).await,
    }
}

fn ensure_valid(form: &EnrollmentForm) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let report = validate_enrollment(form, today, Some(&ConsoleForm), &ConsoleNotifier);
    if !report.is_valid() {
        bail!("enrollment input has {} invalid field(s)", report.errors.len());
    }
    Ok(())
}

fn runtime_for(settings: Settings) -> Result<Arc<StudentRuntime>> {
    let invoker =
        HttpServiceInvoker::new(&settings).context("invalid student service settings")?;
    Ok(StudentRuntime::new_with_dependencies(
        settings,
        Arc::new(invoker),
        Arc::new(ConsoleNotifier),
        Arc::new(ConsoleNavigator),
    ))
}

async fn enroll(settings: Settings, form: EnrollmentForm) -> Result<()> {
    let runtime = runtime_for(settings)?;
    let surface: Arc<dyn FormSurface> = Arc::new(ConsoleForm);
    let report = submit_enrollment(runtime.context(), Some(surface), &form).await;

    match report.error {
        None => {
            if let Some(student) = runtime.state().students.last() {
                println!("{}", serde_json::to_string_pretty(student)?);
            }
            Ok(())
        }
        Some(err) if err.is_retryable() => {
            Err(anyhow!(err).context("student service unavailable; retry later"))
        }
        Some(err) => Err(anyhow!(err).context("enrollment rejected")),
    }
}

async fn list(settings: Settings, grade: Option<String>, status: Option<String>) -> Result<()> {
    let runtime = runtime_for(settings)?;
    let watcher = runtime.spawn_watcher();
    let mut signals = runtime.subscribe_signals();

    if let Some(grade) = grade {
        runtime.dispatch(Signal::SetStudentFilter(FilterPatch::grade(grade)));
    }
    if let Some(status) = status {
        runtime.dispatch(Signal::SetStudentFilter(FilterPatch::status(status)));
    }
    let filters = serde_json::to_value(&runtime.state().filters)?;
    runtime.dispatch(Signal::LoadStudents(Some(filters)));

    let outcome = wait_for_load(&mut signals).await;
    watcher.abort();
    outcome?;

    let state = runtime.state();
    for student in &state.students {
        println!(
            "{:<24} {:<32} grade {}",
            student.name, student.email, student.grade
        );
    }
    info!(count = state.students.len(), "students loaded");
    Ok(())
}

/// Waits for the load workflow to finish. Lagging behind the bus is not
/// fatal; only a closed bus is.
async fn wait_for_load(signals: &mut broadcast::Receiver<Signal>) -> Result<()> {
    loop {
        match signals.recv().await {
            Ok(Signal::StudentsLoaded(_)) => return Ok(()),
            Ok(Signal::LoadError(err)) => {
                return Err(anyhow!(err).context("failed to load students"))
            }
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "signal bus lagged while waiting for students");
            }
            Err(RecvError::Closed) => bail!("signal bus closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ServiceError;

    #[tokio::test]
    async fn load_wait_survives_a_lagging_receiver() {
        let (tx, mut rx) = broadcast::channel(2);
        tx.send(Signal::LoadingStudents).expect("send");
        tx.send(Signal::SelectStudent(None)).expect("send");
        tx.send(Signal::LoadingStudents).expect("send");
        tx.send(Signal::StudentsLoaded(Some(Vec::new()))).expect("send");

        wait_for_load(&mut rx).await.expect("load completes");
    }

    #[tokio::test]
    async fn load_wait_reports_load_error_and_closed_bus() {
        let (tx, mut rx) = broadcast::channel(4);
        tx.send(Signal::LoadError(ServiceError::transport("offline")))
            .expect("send");
        let err = wait_for_load(&mut rx).await.expect_err("load error");
        assert!(err.to_string().contains("failed to load students"));

        drop(tx);
        let err = wait_for_load(&mut rx).await.expect_err("closed");
        assert!(err.to_string().contains("signal bus closed"));
    }
}
