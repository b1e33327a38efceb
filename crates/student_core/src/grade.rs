use shared::domain::{FieldValue, GradeInput};
use thiserror::Error;

pub const DEFAULT_MAX_SCORE: f64 = 100.0;
pub const DEFAULT_PASSING_SCORE: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    #[error("Max score cannot be zero")]
    ZeroMaxScore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeOutcome {
    pub percentage: f64,
    pub passed: bool,
}

/// Percentage of `score` out of `max_score`, rounded to two decimals.
pub fn calculate_grade(
    score: f64,
    max_score: f64,
    passing_score: f64,
) -> Result<GradeOutcome, GradeError> {
    if max_score == 0.0 {
        return Err(GradeError::ZeroMaxScore);
    }

    let percentage = round_to_cents(score / max_score * 100.0);
    Ok(GradeOutcome {
        percentage,
        passed: percentage >= passing_score,
    })
}

/// Resolves loose form values and computes the grade. Missing or unreadable
/// values fall back to a score of 0, a max score of 100 and the given
/// passing score.
pub fn grade_from_input(
    input: &GradeInput,
    default_passing_score: f64,
) -> Result<GradeOutcome, GradeError> {
    let number = |value: &Option<FieldValue>| value.as_ref().and_then(FieldValue::as_number);
    calculate_grade(
        number(&input.score).unwrap_or(0.0),
        number(&input.max_score).unwrap_or(DEFAULT_MAX_SCORE),
        number(&input.passing_score).unwrap_or(default_passing_score),
    )
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
