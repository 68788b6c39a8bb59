//! Payload schemas for the book resource.
//!
//! A schema is plain data: the recognised fields, whether each is required and
//! its JSON type. [`validate`] checks a payload against one without touching
//! HTTP or storage. Violations are collected, not short-circuited, and keys
//! outside the schema are rejected rather than ignored.

use std::fmt;

use serde_json::{json, Value};

/// Primitive JSON type a field must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// A JSON number with no fractional part that fits in `i64`
    Integer,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.as_i64().is_some(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: true,
            kind,
        }
    }
}

pub type Schema = &'static [FieldSpec];

/// Body of `POST /books`.
pub const CREATE_BOOK: Schema = &[
    FieldSpec::required("isbn", FieldKind::String),
    FieldSpec::required("amazon_url", FieldKind::String),
    FieldSpec::required("author", FieldKind::String),
    FieldSpec::required("language", FieldKind::String),
    FieldSpec::required("pages", FieldKind::Integer),
    FieldSpec::required("publisher", FieldKind::String),
    FieldSpec::required("title", FieldKind::String),
    FieldSpec::required("year", FieldKind::Integer),
];

/// Body of `PUT /books/{isbn}`. The isbn comes from the path, so it is not a
/// recognised field here.
pub const UPDATE_BOOK: Schema = &[
    FieldSpec::required("amazon_url", FieldKind::String),
    FieldSpec::required("author", FieldKind::String),
    FieldSpec::required("language", FieldKind::String),
    FieldSpec::required("pages", FieldKind::Integer),
    FieldSpec::required("publisher", FieldKind::String),
    FieldSpec::required("title", FieldKind::String),
    FieldSpec::required("year", FieldKind::Integer),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    NotAnObject,
    Missing,
    WrongType { expected: FieldKind },
    Unexpected,
}

/// One reason a payload failed its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub kind: ViolationKind,
}

impl Violation {
    fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    pub fn error(&self) -> String {
        match &self.kind {
            ViolationKind::NotAnObject => "must be a JSON object".to_string(),
            ViolationKind::Missing => "is required".to_string(),
            ViolationKind::WrongType { expected } => format!("must be of type {}", expected.name()),
            ViolationKind::Unexpected => "is not allowed".to_string(),
        }
    }

    /// `{"field": .., "error": ..}` as carried in error response details
    pub fn to_detail(&self) -> Value {
        json!({ "field": self.field, "error": self.error() })
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.error())
    }
}

/// Check `payload` against `schema`, returning every violation found.
///
/// Declared fields are reported in schema order, then unknown keys in payload
/// order. `null` never satisfies a type.
pub fn validate(payload: &Value, schema: Schema) -> Result<(), Vec<Violation>> {
    let Some(object) = payload.as_object() else {
        return Err(vec![Violation::new("body", ViolationKind::NotAnObject)]);
    };

    let mut violations = Vec::new();

    for spec in schema {
        match object.get(spec.name) {
            None if spec.required => {
                violations.push(Violation::new(spec.name, ViolationKind::Missing));
            }
            None => {}
            Some(value) if !spec.kind.matches(value) => {
                violations.push(Violation::new(
                    spec.name,
                    ViolationKind::WrongType {
                        expected: spec.kind,
                    },
                ));
            }
            Some(_) => {}
        }
    }

    for key in object.keys() {
        if !schema.iter().any(|spec| spec.name == key.as_str()) {
            violations.push(Violation::new(key.as_str(), ViolationKind::Unexpected));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
