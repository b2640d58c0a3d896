use crate::core::RecordPayload;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaViolation {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' is not a {expected}")]
    WrongKind { field: String, expected: &'static str },

    #[error("field '{field}' does not match pattern '{pattern}'")]
    PatternMismatch { field: String, pattern: String },
}

/// Validates a scraped payload before it may be persisted.
pub trait RecordSchema: Send + Sync {
    fn validate(&self, payload: &RecordPayload) -> Result<(), SchemaViolation>;
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    /// A string that must match the given pattern.
    Pattern(Regex),
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Declarative field-level schema: required fields must be present, typed
/// fields must hold the declared kind. Unknown fields pass through.
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec::new(name, kind));
        self
    }

    pub fn with_spec(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }
}

impl RecordSchema for FieldSchema {
    fn validate(&self, payload: &RecordPayload) -> Result<(), SchemaViolation> {
        for spec in &self.fields {
            let value = match payload.get(&spec.name) {
                Some(value) => value,
                None if spec.required => {
                    return Err(SchemaViolation::MissingField(spec.name.clone()));
                }
                None => continue,
            };

            match &spec.kind {
                FieldKind::String => {
                    if !value.is_string() {
                        return Err(SchemaViolation::WrongKind {
                            field: spec.name.clone(),
                            expected: "string",
                        });
                    }
                }
                FieldKind::Integer => {
                    if !value.is_i64() && !value.is_u64() {
                        return Err(SchemaViolation::WrongKind {
                            field: spec.name.clone(),
                            expected: "integer",
                        });
                    }
                }
                FieldKind::Float => {
                    if !value.is_number() {
                        return Err(SchemaViolation::WrongKind {
                            field: spec.name.clone(),
                            expected: "number",
                        });
                    }
                }
                FieldKind::Boolean => {
                    if !value.is_boolean() {
                        return Err(SchemaViolation::WrongKind {
                            field: spec.name.clone(),
                            expected: "boolean",
                        });
                    }
                }
                FieldKind::Pattern(pattern) => match value.as_str() {
                    Some(text) if pattern.is_match(text) => {}
                    _ => {
                        return Err(SchemaViolation::PatternMismatch {
                            field: spec.name.clone(),
                            pattern: pattern.as_str().to_string(),
                        });
                    }
                },
            }
        }
        Ok(())
    }
}
