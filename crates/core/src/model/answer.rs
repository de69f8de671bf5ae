use serde::{Deserialize, Serialize};
use std::fmt;

/// A learner-submitted answer to a practice question.
///
/// The persisted wire shape is "scalar or list", so serialization is
/// untagged: `true`, `42`, `"3/4"` and `["a", "c"]` all decode without a
/// discriminant. Variant order matters for untagged deserialization:
/// booleans and numbers must be tried before strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Choices(Vec<String>),
}

impl AnswerValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choices(values.into_iter().map(Into::into).collect())
    }

    /// Whether this answer matches an expected answer.
    ///
    /// Multi-select answers compare as sets: the learner may tick choices
    /// in any order.
    #[must_use]
    pub fn matches(&self, expected: &AnswerValue) -> bool {
        match (self, expected) {
            (Self::Choices(got), Self::Choices(want)) => {
                let mut got = got.clone();
                let mut want = want.clone();
                got.sort();
                want.sort();
                got == want
            }
            (got, want) => got == want,
        }
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for AnswerValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
            Self::Choices(values) => write!(f, "{}", values.join(", ")),
        }
    }
}
