use std::fmt::Debug;

use serde::Serialize;
use serde_json::Value;

/// Rendered in place of a UI element that reached the conversation by mistake.
pub const UI_ELEMENT_PLACEHOLDER: &str = "[React element]";

/// Marker for values that describe a piece of UI rather than conversation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiElement {
    pub kind: String,
}

impl UiElement {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Anything that may end up as message text before it is coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum RawText {
    Text(String),
    Missing,
    Element(UiElement),
    Structured(Value),
    /// Debug rendering of a value that could not be serialized.
    Opaque(String),
}

impl RawText {
    /// Captures an arbitrary serializable value.
    pub fn structured<T>(value: &T) -> Self
    where
        T: Serialize + Debug + ?Sized,
    {
        match serde_json::to_value(value) {
            Ok(value) => Self::Structured(value),
            Err(error) => {
                tracing::debug!(%error, "value is not serializable, using debug rendering");
                Self::Opaque(format!("{value:?}"))
            }
        }
    }

    /// True for objects, arrays and UI elements: values that are never valid
    /// as a typed message.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Element(_) | Self::Structured(Value::Object(_) | Value::Array(_))
        )
    }
}

impl From<&str> for RawText {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawText {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for RawText {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<Value> for RawText {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Null => Self::Missing,
            other => Self::Structured(other),
        }
    }
}

impl From<UiElement> for RawText {
    fn from(value: UiElement) -> Self {
        Self::Element(value)
    }
}

impl From<bool> for RawText {
    fn from(value: bool) -> Self {
        Self::Structured(Value::Bool(value))
    }
}

impl From<i64> for RawText {
    fn from(value: i64) -> Self {
        Self::Structured(Value::from(value))
    }
}

impl From<f64> for RawText {
    fn from(value: f64) -> Self {
        Self::Structured(Value::from(value))
    }
}

impl<T> From<Option<T>> for RawText
where
    T: Into<RawText>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

/// Turns any raw value into display-safe text. Never fails.
pub fn to_safe_text(raw: impl Into<RawText>) -> String {
    match raw.into() {
        RawText::Text(text) | RawText::Opaque(text) => text,
        RawText::Missing => String::new(),
        RawText::Element(_) => UI_ELEMENT_PLACEHOLDER.to_string(),
        RawText::Structured(Value::String(text)) => text,
        RawText::Structured(Value::Null) => String::new(),
        RawText::Structured(value) => value.to_string(),
    }
}
