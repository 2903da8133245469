//! Auto-population of positional fields in loaded YAML documents.
//!
//! A rule such as `schemas.$1.tables.$2.tableName <- $2` walks every mapping
//! matched by the path, capturing the keys at `$n` positions, and writes the
//! substituted value into the final field.

use serde_yaml::{Mapping, Value};

/// A path template and the value template written at its end.
#[derive(Debug, Clone, Copy)]
pub struct PopulateRule {
    pub path: &'static str,
    pub value: &'static str,
}

impl PopulateRule {
    pub const fn new(path: &'static str, value: &'static str) -> Self {
        Self { path, value }
    }
}

/// Rules applied to `schema.yaml` before it is deserialised.
pub const SCHEMA_RULES: &[PopulateRule] = &[
    PopulateRule::new("schemas.$1.name", "$1"),
    PopulateRule::new("schemas.$1.tables.$2.tableName", "$2"),
    PopulateRule::new("schemas.$1.views.$2.viewName", "$2"),
    PopulateRule::new("schemas.$1.triggers.$2.triggerName", "$2"),
    PopulateRule::new("schemas.$1.procedures.$2.procedureName", "$2"),
];

/// Apply every rule to `document` in order.
pub fn auto_populate(document: &mut Value, rules: &[PopulateRule]) {
    for rule in rules {
        let segments: Vec<&str> = rule.path.split('.').collect();
        let Some((field, parents)) = segments.split_last() else {
            continue;
        };
        let mut captures = Vec::new();
        walk(document, parents, field, rule.value, &mut captures);
    }
}

fn walk(node: &mut Value, path: &[&str], field: &str, template: &str, captures: &mut Vec<String>) {
    if path.is_empty() && node.is_null() {
        *node = Value::Mapping(Mapping::new());
    }
    let Some(mapping) = node.as_mapping_mut() else {
        return;
    };

    let Some((segment, rest)) = path.split_first() else {
        mapping.insert(
            Value::String(field.to_string()),
            Value::String(substitute(template, captures)),
        );
        return;
    };

    if segment.starts_with('$') {
        for (key, child) in mapping.iter_mut() {
            let Some(key) = key_text(key) else {
                continue;
            };
            captures.push(key);
            walk(child, rest, field, template, captures);
            captures.pop();
        }
    } else if let Some(child) = mapping.get_mut(*segment) {
        walk(child, rest, field, template, captures);
    }
}

fn key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn substitute(template: &str, captures: &[String]) -> String {
    let mut out = template.to_string();
    // Highest index first so `$1` never clobbers the prefix of `$10`.
    for (index, capture) in captures.iter().enumerate().rev() {
        out = out.replace(&format!("${}", index + 1), capture);
    }
    out
}
