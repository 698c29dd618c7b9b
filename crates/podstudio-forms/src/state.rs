//! Mutable form state addressed by dotted field-paths

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{FormError, Result};
use crate::schema::{FormSchema, Presence};

/// Field-path → value record owned by one wizard instance
///
/// Every schema field holds a defined value at all times: its seed value,
/// or null when it sits inside an optional group that is switched off.
#[derive(Debug, Clone)]
pub struct FormState {
    schema: Arc<FormSchema>,
    values: Value,
    touched: BTreeSet<String>,
}

impl FormState {
    /// State seeded with every field's create-mode default
    pub fn seeded(schema: Arc<FormSchema>) -> Self {
        let mut values = Value::Object(Map::new());

        for group in &schema.groups {
            if group.presence == Presence::Optional {
                set_path(&mut values, &group.path, Value::Null);
            }
        }
        for field in &schema.fields {
            if schema.optional_group_of(&field.path).is_none() {
                set_path(&mut values, &field.path, field.seed_value());
            }
        }

        Self {
            schema,
            values,
            touched: BTreeSet::new(),
        }
    }

    /// Seeded state with `initial` overlaid field by field
    ///
    /// Keys of `initial` the schema does not declare are dropped. Values are
    /// copied verbatim, so stale or out-of-range data stays visible to
    /// validation instead of being coerced.
    pub fn with_initial(schema: Arc<FormSchema>, initial: &Value) -> Result<Self> {
        if !initial.is_object() {
            return Err(FormError::InvalidInitialValues(json_type_name(initial)));
        }

        let mut state = Self::seeded(Arc::clone(&schema));

        for group in &schema.groups {
            match get_path(initial, &group.path) {
                Some(Value::Null) => set_path(&mut state.values, &group.path, Value::Null),
                Some(Value::Object(_)) => state.seed_group(&group.path),
                _ => {}
            }
        }
        for field in &schema.fields {
            if let Some(value) = get_path(initial, &field.path) {
                if state.group_is_live(&field.path) {
                    set_path(&mut state.values, &field.path, value.clone());
                }
            }
        }

        Ok(state)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.values, path)
    }

    /// Write one field-path and mark it touched
    ///
    /// Writing below a switched-off optional group switches the group on and
    /// seeds its other fields first.
    pub fn set(&mut self, path: &str, value: Value) {
        if let Some(group) = self.schema.optional_group_of(path) {
            let group_path = group.path.clone();
            if !matches!(get_path(&self.values, &group_path), Some(Value::Object(_))) {
                self.seed_group(&group_path);
            }
        }
        set_path(&mut self.values, path, value);
        self.touched.insert(path.to_string());
    }

    /// Switch an optional group off (or reset a field to null)
    pub fn clear(&mut self, path: &str) {
        set_path(&mut self.values, path, Value::Null);
        self.touched.insert(path.to_string());
    }

    pub fn is_touched(&self, path: &str) -> bool {
        self.touched.contains(path)
    }

    pub fn touched(&self) -> impl Iterator<Item = &str> {
        self.touched.iter().map(String::as_str)
    }

    /// Raw values as handed to the validator
    pub fn as_value(&self) -> &Value {
        &self.values
    }

    /// Submission payload: schema fields only
    ///
    /// Unset optional fields and switched-off optional groups are omitted.
    pub fn payload(&self) -> Value {
        let mut payload = Value::Object(Map::new());

        for field in &self.schema.fields {
            if !self.group_is_live(&field.path) {
                continue;
            }
            let Some(value) = self.get(&field.path) else {
                continue;
            };
            if field.is_optional() && is_unset(value) {
                continue;
            }
            set_path(&mut payload, &field.path, value.clone());
        }

        payload
    }

    /// Whether every optional group enclosing `field_path` holds an object
    fn group_is_live(&self, field_path: &str) -> bool {
        self.schema
            .groups
            .iter()
            .filter(|g| g.presence == Presence::Optional)
            .filter(|g| crate::schema::covers(&g.path, field_path) && g.path != field_path)
            .all(|g| matches!(self.get(&g.path), Some(Value::Object(_))))
    }

    fn seed_group(&mut self, group_path: &str) {
        set_path(&mut self.values, group_path, Value::Object(Map::new()));
        let seeds: Vec<(String, Value)> = self
            .schema
            .fields_under(group_path)
            .map(|f| (f.path.clone(), f.seed_value()))
            .collect();
        for (path, value) in seeds {
            set_path(&mut self.values, &path, value);
        }
    }
}

/// A value the user has not filled in: null or the empty string
pub fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Read a dotted path out of a JSON value
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// Write a dotted path into a JSON value, creating intermediate objects
pub fn set_path(value: &mut Value, path: &str, new_value: Value) {
    let mut current = value;
    let mut parts = path.split('.').peekable();

    while let Some(part) = parts.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if parts.peek().is_none() {
            map.insert(part.to_string(), new_value);
            return;
        }
        current = map.entry(part.to_string()).or_insert(Value::Null);
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
