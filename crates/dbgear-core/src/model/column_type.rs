use std::borrow::Cow;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::manager::Named;

const LENGTH_TYPES: &[&str] = &[
    "VARCHAR",
    "CHAR",
    "BINARY",
    "VARBINARY",
    "BIT",
    "TINYINT",
    "SMALLINT",
    "MEDIUMINT",
    "INT",
    "INTEGER",
    "BIGINT",
];

const PRECISION_TYPES: &[&str] = &["DECIMAL", "NUMERIC", "DEC", "FLOAT", "DOUBLE", "REAL"];

const ITEM_TYPES: &[&str] = &["ENUM", "SET"];

/// One allowed value of an `ENUM`/`SET` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypeItem {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// A column's SQL type, parsed from its compact text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// Text the type was parsed from, e.g. `DECIMAL(10,2)`.
    pub column_type: String,
    pub base_type: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
    pub items: Vec<ColumnTypeItem>,
}

impl ColumnType {
    /// Parse `VARCHAR(255)`, `DECIMAL(10,2)`, `ENUM('a','b:Caption')`,
    /// `INT UNSIGNED` and similar forms.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("column type must not be empty".to_string()));
        }

        let base_end = trimmed
            .find(|ch: char| !ch.is_ascii_alphabetic())
            .unwrap_or(trimmed.len());
        if base_end == 0 {
            return Err(malformed(text, "type must start with a keyword"));
        }
        let base_type = trimmed[..base_end].to_ascii_uppercase();
        let rest = trimmed[base_end..].trim_start();

        let (args, tail) = if rest.starts_with('(') {
            let close = find_closing_paren(rest).ok_or_else(|| malformed(text, "unbalanced parentheses"))?;
            (Some(&rest[1..close]), &rest[close + 1..])
        } else {
            (None, rest)
        };
        if tail.contains('(') || tail.contains(')') {
            return Err(malformed(text, "unbalanced parentheses"));
        }

        let mut parsed = ColumnType {
            column_type: trimmed.to_string(),
            base_type,
            length: None,
            precision: None,
            scale: None,
            unsigned: tail
                .split_whitespace()
                .any(|word| word.eq_ignore_ascii_case("UNSIGNED")),
            items: Vec::new(),
        };

        let Some(args) = args else {
            return Ok(parsed);
        };

        let base = parsed.base_type.as_str();
        if ITEM_TYPES.contains(&base) {
            parsed.items = parse_items(args).map_err(|reason| malformed(text, reason))?;
        } else if PRECISION_TYPES.contains(&base) {
            let mut parts = args.split(',');
            parsed.precision = parts
                .next()
                .map(|part| parse_number(text, part))
                .transpose()?;
            parsed.scale = parts
                .next()
                .map(|part| parse_number(text, part))
                .transpose()?;
            if parts.next().is_some() {
                return Err(malformed(text, "too many arguments"));
            }
        } else if LENGTH_TYPES.contains(&base) || !args.contains(',') {
            parsed.length = Some(parse_number(text, args)?);
        } else {
            return Err(malformed(text, "unexpected argument list"));
        }

        Ok(parsed)
    }

    pub fn item_values(&self) -> Vec<String> {
        self.items.iter().map(|item| item.value.clone()).collect()
    }

    /// Type as written in DDL. Item captions are authoring metadata and are
    /// left out.
    pub fn to_sql(&self) -> String {
        let mut sql = self.base_type.clone();
        if !self.items.is_empty() {
            let items: Vec<String> = self
                .items
                .iter()
                .map(|item| format!("'{}'", item.value.replace('\'', "''")))
                .collect();
            sql.push_str(&format!("({})", items.join(",")));
        } else if let Some(length) = self.length {
            sql.push_str(&format!("({length})"));
        } else if let Some(precision) = self.precision {
            match self.scale {
                Some(scale) => sql.push_str(&format!("({precision},{scale})")),
                None => sql.push_str(&format!("({precision})")),
            }
        }
        if self.unsigned {
            sql.push_str(" UNSIGNED");
        }
        sql
    }

    /// True when the compact text alone reproduces this value.
    fn is_compact(&self) -> bool {
        ColumnType::parse(&self.column_type)
            .map(|parsed| parsed == *self)
            .unwrap_or(false)
    }
}

impl Named for ColumnType {
    const KIND: &'static str = "column type";

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.column_type)
    }
}

fn malformed(text: &str, reason: &str) -> Error {
    Error::Validation(format!("malformed column type {text:?}: {reason}"))
}

fn parse_number(text: &str, part: &str) -> Result<u32> {
    part.trim()
        .parse::<u32>()
        .map_err(|_| malformed(text, "expected a numeric argument"))
}

fn find_closing_paren(rest: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut chars = rest.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\'' if in_quote => {
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                } else {
                    in_quote = false;
                }
            }
            '\'' => in_quote = true,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_items(args: &str) -> std::result::Result<Vec<ColumnTypeItem>, &'static str> {
    let mut items = Vec::new();
    let mut chars = args.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(ch) if ch.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some('\'') => {}
            None if items.is_empty() => return Ok(items),
            _ => return Err("items must be quoted strings"),
        }

        let mut raw = String::new();
        loop {
            match chars.next() {
                Some('\'') if chars.peek() == Some(&'\'') => {
                    chars.next();
                    raw.push('\'');
                }
                Some('\'') => break,
                Some(ch) => raw.push(ch),
                None => return Err("unterminated quoted item"),
            }
        }

        let item = match raw.split_once(':') {
            Some((value, caption)) => ColumnTypeItem {
                value: value.to_string(),
                caption: Some(caption.to_string()),
            },
            None => ColumnTypeItem {
                value: raw,
                caption: None,
            },
        };
        items.push(item);

        while matches!(chars.peek(), Some(ch) if ch.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some(',') => continue,
            None => return Ok(items),
            Some(_) => return Err("items must be separated by commas"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpandedColumnType {
    #[serde(alias = "column_type")]
    column_type: String,
    #[serde(default, alias = "base_type", skip_serializing_if = "Option::is_none")]
    base_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    unsigned: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    items: Vec<ColumnTypeItem>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnTypeRepr {
    Compact(String),
    Expanded(ExpandedColumnType),
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.is_compact() {
            return serializer.serialize_str(&self.column_type);
        }
        ExpandedColumnType {
            column_type: self.column_type.clone(),
            base_type: Some(self.base_type.clone()),
            length: self.length,
            precision: self.precision,
            scale: self.scale,
            unsigned: self.unsigned,
            items: self.items.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match ColumnTypeRepr::deserialize(deserializer)? {
            ColumnTypeRepr::Compact(text) => {
                ColumnType::parse(&text).map_err(serde::de::Error::custom)
            }
            ColumnTypeRepr::Expanded(expanded) => match expanded.base_type {
                Some(base_type) => Ok(ColumnType {
                    column_type: expanded.column_type,
                    base_type: base_type.to_ascii_uppercase(),
                    length: expanded.length,
                    precision: expanded.precision,
                    scale: expanded.scale,
                    unsigned: expanded.unsigned,
                    items: expanded.items,
                }),
                None => {
                    let mut parsed = ColumnType::parse(&expanded.column_type)
                        .map_err(serde::de::Error::custom)?;
                    if !expanded.items.is_empty() {
                        parsed.items = expanded.items;
                    }
                    Ok(parsed)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_length_types() {
        let parsed = ColumnType::parse("varchar(255)").expect("parse");
        assert_eq!(parsed.base_type, "VARCHAR");
        assert_eq!(parsed.length, Some(255));
        assert_eq!(parsed.precision, None);

        let int = ColumnType::parse("INT(11) UNSIGNED").expect("parse");
        assert_eq!(int.base_type, "INT");
        assert_eq!(int.length, Some(11));
        assert!(int.unsigned);
    }

    #[test]
    fn parses_precision_and_scale() {
        let parsed = ColumnType::parse("DECIMAL(10, 2)").expect("parse");
        assert_eq!(parsed.precision, Some(10));
        assert_eq!(parsed.scale, Some(2));
        assert_eq!(parsed.length, None);

        let double = ColumnType::parse("DOUBLE").expect("parse");
        assert_eq!(double.precision, None);
    }

    #[test]
    fn parses_enum_items_with_captions() {
        let parsed = ColumnType::parse("ENUM('active:Active user','it''s', 'off')").expect("parse");
        assert_eq!(parsed.base_type, "ENUM");
        assert_eq!(parsed.item_values(), vec!["active", "it's", "off"]);
        assert_eq!(parsed.items[0].caption.as_deref(), Some("Active user"));
        assert_eq!(parsed.items[1].caption, None);
    }

    #[test]
    fn renders_ddl_type() {
        let enum_type = ColumnType::parse("enum('on:Enabled','it''s')").expect("parse");
        assert_eq!(enum_type.to_sql(), "ENUM('on','it''s')");
        let decimal = ColumnType::parse("decimal(10, 2) unsigned").expect("parse");
        assert_eq!(decimal.to_sql(), "DECIMAL(10,2) UNSIGNED");
        assert_eq!(ColumnType::parse("TEXT").expect("parse").to_sql(), "TEXT");
    }

    #[test]
    fn rejects_malformed_text() {
        for text in ["", "   ", "(10)", "VARCHAR(255", "VARCHAR(abc)", "ENUM(a,b)", "INT)"] {
            let err = ColumnType::parse(text).expect_err(text);
            assert_eq!(err.kind(), crate::error::ErrorKind::Validation, "{text}");
        }
    }

    #[test]
    fn serializes_compact_form_when_lossless() {
        let parsed = ColumnType::parse("DECIMAL(10,2)").expect("parse");
        let yaml = serde_yaml::to_string(&parsed).expect("serialize");
        assert_eq!(yaml.trim(), "DECIMAL(10,2)");

        let mut custom = parsed.clone();
        custom.scale = Some(4);
        let yaml = serde_yaml::to_string(&custom).expect("serialize");
        assert!(yaml.contains("baseType: DECIMAL"));
        let back: ColumnType = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, custom);
    }

    #[test]
    fn expanded_form_without_base_type_is_parsed() {
        let parsed: ColumnType =
            serde_yaml::from_str("columnType: VARCHAR(20)\n").expect("deserialize");
        assert_eq!(parsed.base_type, "VARCHAR");
        assert_eq!(parsed.length, Some(20));
    }
}
