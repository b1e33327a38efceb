//! Enrollment input validation.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use shared::domain::EnrollmentForm;

pub const MIN_AGE_YEARS: f64 = 5.0;
pub const MAX_AGE_YEARS: f64 = 100.0;
const DAYS_PER_YEAR: f64 = 365.25;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnrollmentField {
    Name,
    Email,
    DateOfBirth,
    Grade,
}

impl EnrollmentField {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentField::Name => "Name",
            EnrollmentField::Email => "Email",
            EnrollmentField::DateOfBirth => "DateOfBirth",
            EnrollmentField::Grade => "Grade",
        }
    }
}

impl fmt::Display for EnrollmentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: BTreeMap<EnrollmentField, String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&self, field: EnrollmentField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }
}

/// Checks every enrollment field and collects all problems.
///
/// `today` anchors the age check so callers (and tests) control the clock.
pub fn validate(input: &EnrollmentForm, today: NaiveDate) -> ValidationReport {
    let mut errors = BTreeMap::new();

    if is_blank(input.name.as_deref()) {
        errors.insert(EnrollmentField::Name, "Student name is required".to_string());
    }

    match input.email.as_deref() {
        None | Some("") => {
            errors.insert(EnrollmentField::Email, "Email is required".to_string());
        }
        Some(email) if !EMAIL_PATTERN.is_match(email) => {
            errors.insert(EnrollmentField::Email, "Invalid email format".to_string());
        }
        Some(_) => {}
    }

    match input.date_of_birth.as_deref() {
        None | Some("") => {
            errors.insert(
                EnrollmentField::DateOfBirth,
                "Date of birth is required".to_string(),
            );
        }
        Some(raw) => {
            let plausible = parse_date(raw)
                .map(|dob| age_in_years(dob, today))
                .is_some_and(|age| (MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&age));
            if !plausible {
                errors.insert(
                    EnrollmentField::DateOfBirth,
                    "Please enter a valid date of birth".to_string(),
                );
            }
        }
    }

    if is_blank(input.grade.as_deref()) {
        errors.insert(EnrollmentField::Grade, "Grade is required".to_string());
    }

    ValidationReport { errors }
}

/// Age as fractional years using a 365.25-day year.
pub fn age_in_years(date_of_birth: NaiveDate, today: NaiveDate) -> f64 {
    (today - date_of_birth).num_days() as f64 / DAYS_PER_YEAR
}

/// Accepts plain `YYYY-MM-DD` dates and RFC 3339 timestamps.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|ts| ts.date_naive())
        })
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
