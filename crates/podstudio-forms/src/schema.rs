//! Declarative form schemas
//!
//! A schema is a flat list of field descriptors addressed by dotted
//! field-paths (`speaker1.social.twitter`), plus the nested groups those
//! paths live in. Groups may be optional: an optional group whose value is
//! null or absent switches off every field below it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{FormError, Result};

/// Constraint kind of a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text with a minimum (and optional maximum) length in characters
    Text {
        min_len: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_len: Option<usize>,
    },
    /// E-mail address
    Email,
    /// Absolute URL with a scheme and host
    Url,
    /// One value out of a closed option set
    Choice { options: Vec<String> },
    /// Several values out of a closed option set
    MultiChoice { options: Vec<String>, min_items: usize },
    /// List of free-text entries
    List { min_items: usize },
    /// Anything, including nothing (file handles, blobs)
    Any,
}

impl FieldKind {
    /// Value a field of this kind holds before the user touches it
    pub fn empty_value(&self) -> Value {
        match self {
            FieldKind::Text { .. } | FieldKind::Email | FieldKind::Url | FieldKind::Choice { .. } => {
                Value::String(String::new())
            }
            FieldKind::MultiChoice { .. } | FieldKind::List { .. } => Value::Array(Vec::new()),
            FieldKind::Any => Value::Null,
        }
    }

    /// Option set for enumerated kinds
    pub fn options(&self) -> Option<&[String]> {
        match self {
            FieldKind::Choice { options } | FieldKind::MultiChoice { options, .. } => {
                Some(options)
            }
            _ => None,
        }
    }
}

/// Whether a field or group must hold a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Required,
    Optional,
}

/// Declared shape and rules of one field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Dotted field-path
    pub path: String,
    /// Human-readable label
    pub label: String,
    pub kind: FieldKind,
    pub presence: Presence,
    /// Message reported when the value is unset or breaks the kind's constraint
    pub message: String,
    /// Seed value for create mode (falls back to the kind's empty value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSpec {
    fn new(path: impl Into<String>, kind: FieldKind, message: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            label: default_label(&path),
            path,
            kind,
            presence: Presence::Required,
            message: message.into(),
            default: None,
        }
    }

    /// Text field with a minimum length
    pub fn text(path: impl Into<String>, min_len: usize, message: impl Into<String>) -> Self {
        Self::new(path, FieldKind::Text { min_len, max_len: None }, message)
    }

    pub fn email(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(path, FieldKind::Email, message)
    }

    pub fn url(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(path, FieldKind::Url, message)
    }

    /// Single choice out of `options`; `message` is shown when nothing is selected
    pub fn choice<I, S>(path: impl Into<String>, options: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::new(path, FieldKind::Choice { options }, message)
    }

    /// At least `min_items` choices out of `options`
    pub fn multi_choice<I, S>(
        path: impl Into<String>,
        options: I,
        min_items: usize,
        message: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::new(path, FieldKind::MultiChoice { options, min_items }, message)
    }

    /// List of at least `min_items` free-text entries
    pub fn list(path: impl Into<String>, min_items: usize, message: impl Into<String>) -> Self {
        Self::new(path, FieldKind::List { min_items }, message)
    }

    pub fn any(path: impl Into<String>) -> Self {
        Self::new(path, FieldKind::Any, "").optional()
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn max_len(mut self, max: usize) -> Self {
        if let FieldKind::Text { max_len, .. } = &mut self.kind {
            *max_len = Some(max);
        }
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_optional(&self) -> bool {
        self.presence == Presence::Optional
    }

    /// Seed value for create mode
    pub fn seed_value(&self) -> Value {
        self.default.clone().unwrap_or_else(|| self.kind.empty_value())
    }
}

/// A nested object holding several fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub path: String,
    pub presence: Presence,
}

/// A complete form schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSchema {
    pub id: String,
    pub name: String,
    pub version: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

impl FormSchema {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: "1.0.0".to_string(),
            fields: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a group whose fields are `fields` with paths relative to `path`
    pub fn group<I>(mut self, path: impl Into<String>, presence: Presence, fields: I) -> Self
    where
        I: IntoIterator<Item = FieldSpec>,
    {
        let path = path.into();
        for mut field in fields {
            field.path = format!("{}.{}", path, field.path);
            self.fields.push(field);
        }
        self.groups.push(GroupSpec { path, presence });
        self
    }

    /// Look up a field by its exact path
    pub fn get(&self, path: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.path == path)
    }

    /// Whether `path` names a field, a group, or any prefix of a field path
    pub fn contains(&self, path: &str) -> bool {
        self.fields.iter().any(|f| covers(path, &f.path))
    }

    /// Fields addressed by `selector` (the field itself or everything below a group)
    pub fn fields_under<'a>(&'a self, selector: &'a str) -> impl Iterator<Item = &'a FieldSpec> + 'a {
        self.fields.iter().filter(move |f| covers(selector, &f.path))
    }

    /// Innermost optional group enclosing `field_path`, if any
    pub fn optional_group_of(&self, field_path: &str) -> Option<&GroupSpec> {
        self.groups
            .iter()
            .filter(|g| g.presence == Presence::Optional && is_below(&g.path, field_path))
            .max_by_key(|g| g.path.len())
    }

    /// Reject schemas that declare a path twice
    pub fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.path.as_str()) {
                return Err(FormError::DuplicateField(field.path.clone()));
            }
        }
        Ok(())
    }
}

/// Whether `selector` addresses `field_path` (equal, or a dotted prefix of it)
pub fn covers(selector: &str, field_path: &str) -> bool {
    selector == field_path || is_below(selector, field_path)
}

fn is_below(prefix: &str, path: &str) -> bool {
    path.len() > prefix.len()
        && path.starts_with(prefix)
        && path.as_bytes()[prefix.len()] == b'.'
}

fn default_label(path: &str) -> String {
    path.rsplit('.').next().unwrap_or(path).to_string()
}
