//! Per-field validation rules
//!
//! Each rule inspects one field value and returns the message to show next
//! to the field, or `None` when the value is acceptable.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::schema::{FieldKind, FieldSpec};
use crate::state::{is_unset, json_type_name};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]+$").expect("email pattern compiles")
});

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://[^\s/?#]+(?:[/?#]\S*)?$").expect("url pattern compiles")
});

/// Check one field value against its declared rules
pub fn check_field(field: &FieldSpec, value: Option<&Value>) -> Option<String> {
    let value = match value {
        Some(v) if !is_unset(v) => v,
        _ => return check_unset(field),
    };

    match &field.kind {
        FieldKind::Text { min_len, max_len } => check_text(field, value, *min_len, *max_len),
        FieldKind::Email => check_format(field, value, &EMAIL_PATTERN),
        FieldKind::Url => check_format(field, value, &URL_PATTERN),
        FieldKind::Choice { options } => check_choice(value, options),
        FieldKind::MultiChoice { options, min_items } => {
            check_multi_choice(field, value, options, *min_items)
        }
        FieldKind::List { min_items } => check_list(field, value, *min_items),
        FieldKind::Any => None,
    }
}

/// Unset optional fields pass; unset required fields fail
fn check_unset(field: &FieldSpec) -> Option<String> {
    if field.is_optional() || field.kind == FieldKind::Any {
        return None;
    }
    Some(field.message.clone())
}

fn check_text(
    field: &FieldSpec,
    value: &Value,
    min_len: usize,
    max_len: Option<usize>,
) -> Option<String> {
    let Some(s) = value.as_str() else {
        return Some(type_mismatch("string", value));
    };
    let len = s.chars().count();
    if len < min_len {
        return Some(field.message.clone());
    }
    if let Some(max) = max_len {
        if len > max {
            return Some(format!("{} must be at most {} characters", field.label, max));
        }
    }
    None
}

fn check_format(field: &FieldSpec, value: &Value, pattern: &Regex) -> Option<String> {
    match value.as_str() {
        Some(s) if pattern.is_match(s) => None,
        Some(_) => Some(field.message.clone()),
        None => Some(type_mismatch("string", value)),
    }
}

fn check_choice(value: &Value, options: &[String]) -> Option<String> {
    let Some(s) = value.as_str() else {
        return Some(type_mismatch("string", value));
    };
    if options.iter().any(|o| o == s) {
        None
    } else {
        Some(invalid_option(s, options))
    }
}

fn check_multi_choice(
    field: &FieldSpec,
    value: &Value,
    options: &[String],
    min_items: usize,
) -> Option<String> {
    let Some(items) = value.as_array() else {
        return Some(type_mismatch("array", value));
    };
    if items.len() < min_items {
        return Some(field.message.clone());
    }
    items.iter().find_map(|item| check_choice(item, options))
}

fn check_list(field: &FieldSpec, value: &Value, min_items: usize) -> Option<String> {
    let Some(items) = value.as_array() else {
        return Some(type_mismatch("array", value));
    };
    if items.len() < min_items {
        return Some(field.message.clone());
    }
    items
        .iter()
        .find(|item| !item.is_string())
        .map(|item| type_mismatch("string", item))
}

fn type_mismatch(expected: &str, value: &Value) -> String {
    format!("Expected {}, received {}", expected, json_type_name(value))
}

fn invalid_option(value: &str, options: &[String]) -> String {
    let mut message = format!(
        "Invalid option '{}'. Expected one of: {}",
        value,
        options.join(", ")
    );
    if let Some(suggestion) = closest_option(value, options) {
        message.push_str(&format!(". Did you mean '{}'?", suggestion));
    }
    message
}

/// Nearest option by edit distance, when it is close enough to be a typo
fn closest_option<'a>(value: &str, options: &'a [String]) -> Option<&'a str> {
    let lower = value.to_lowercase();
    options
        .iter()
        .map(|o| (o, levenshtein_distance(&lower, &o.to_lowercase())))
        .filter(|(_, d)| *d <= 2)
        .min_by_key(|(_, d)| *d)
        .map(|(o, _)| o.as_str())
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
