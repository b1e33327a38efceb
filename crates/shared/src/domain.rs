use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_STATUS_FILTER: &str = "active";

/// A student as returned by the student service.
///
/// Fields the service assigns on its own (identifier, timestamps) are kept
/// untouched in `extra`. Known fields accept `null` and numbers as well as
/// text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "Name", default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(rename = "Email", default, deserialize_with = "lenient_text")]
    pub email: String,
    #[serde(rename = "Grade", default, deserialize_with = "lenient_text")]
    pub grade: String,
    #[serde(rename = "DateOfBirth", default, deserialize_with = "lenient_text")]
    pub date_of_birth: String,
    #[serde(
        rename = "Phone",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "String::is_empty"
    )]
    pub phone: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StudentRecord {
    pub fn id(&self) -> Option<&Value> {
        self.extra.get("id").or_else(|| self.extra.get("Id"))
    }
}

/// Raw enrollment input as collected by the form.
///
/// Keys beyond the five known fields stay in `extra` and travel with the
/// create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentForm {
    #[serde(
        rename = "Name",
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        rename = "Email",
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    #[serde(
        rename = "Grade",
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub grade: Option<String>,
    #[serde(
        rename = "DateOfBirth",
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_of_birth: Option<String>,
    #[serde(
        rename = "Phone",
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EnrollmentForm {
    /// Payload sent by the form submit action: every field present, phone
    /// defaulting to an empty string, extra keys passed through.
    pub fn create_payload(&self) -> Value {
        let field = |value: &Option<String>| match value {
            Some(v) => Value::String(v.clone()),
            None => Value::Null,
        };
        let mut body = self.extra.clone();
        body.insert("Name".into(), field(&self.name));
        body.insert("Email".into(), field(&self.email));
        body.insert("Grade".into(), field(&self.grade));
        body.insert("DateOfBirth".into(), field(&self.date_of_birth));
        body.insert(
            "Phone".into(),
            Value::String(self.phone.clone().unwrap_or_default()),
        );
        Value::Object(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentFilters {
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

impl Default for EnrollmentFilters {
    fn default() -> Self {
        Self {
            grade: None,
            status: default_status(),
        }
    }
}

fn default_status() -> String {
    DEFAULT_STATUS_FILTER.to_string()
}

/// Partial filter update. A key that is absent leaves the current value in
/// place; `"grade": null` clears the grade filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPatch {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub grade: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl FilterPatch {
    pub fn grade(grade: impl Into<String>) -> Self {
        Self {
            grade: Some(Some(grade.into())),
            status: None,
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self {
            grade: None,
            status: Some(status.into()),
        }
    }

    pub fn apply_to(&self, filters: &EnrollmentFilters) -> EnrollmentFilters {
        EnrollmentFilters {
            grade: match &self.grade {
                Some(grade) => grade.clone(),
                None => filters.grade.clone(),
            },
            status: self
                .status
                .clone()
                .unwrap_or_else(|| filters.status.clone()),
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_text(deserializer)?.unwrap_or_default())
}

/// Text field that also takes `null` (as absent) and numbers or booleans
/// (as their JSON text).
fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected text, number or null, found {other}"
        ))),
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A loosely typed form value: forms hand over numbers as either JSON
/// numbers or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Number(value) => *value,
            FieldValue::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Exam score input for the grade calculation callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeInput {
    #[serde(rename = "Score", default)]
    pub score: Option<FieldValue>,
    #[serde(rename = "MaxScore", default)]
    pub max_score: Option<FieldValue>,
    #[serde(rename = "PassingScore", default)]
    pub passing_score: Option<FieldValue>,
}
