// used to look up types by tag and tags by type
use bimap::BiMap;
// used for the fallback tag table
use std::collections::HashMap;
// used to print out readable forms of values
use std::fmt;
// so regular expressions don't have to be recompiled
use lazy_static::lazy_static;
use regex::Regex;

use crate::NameHasher;
use crate::error::{GsmParamError, Result};

/// Digits tried by the float formatter before giving up and using the maximum.
pub const MAX_FRACTION_DIGITS: usize = 8;
/// A float rendering is accepted once it re-parses to within this distance.
pub const FLOAT_TOLERANCE: f64 = 1e-7;

// ------------- Parameter Types --------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterType {
    Length,
    Angle,
    Real,
    Integer,
    Boolean,
    String,
    Material,
    LineType,
    Fill,
    Pen,
    Separator,
    Title,
    LightSwitch,
    ColorRGB,
    Intensity,
    BuildingMaterial,
    Profile,
    Dictionary,
    Comment,
}

/// What kind of value a parameter type carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Integer,
    Boolean,
    Text,
    Structural,
    Payload,
    Comment,
}

impl ParameterType {
    pub const ALL: [ParameterType; 19] = [
        ParameterType::Length,
        ParameterType::Angle,
        ParameterType::Real,
        ParameterType::Integer,
        ParameterType::Boolean,
        ParameterType::String,
        ParameterType::Material,
        ParameterType::LineType,
        ParameterType::Fill,
        ParameterType::Pen,
        ParameterType::Separator,
        ParameterType::Title,
        ParameterType::LightSwitch,
        ParameterType::ColorRGB,
        ParameterType::Intensity,
        ParameterType::BuildingMaterial,
        ParameterType::Profile,
        ParameterType::Dictionary,
        ParameterType::Comment,
    ];

    /// The name used in directives, which for everything but Comment is also
    /// the element tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterType::Length => "Length",
            ParameterType::Angle => "Angle",
            ParameterType::Real => "RealNum",
            ParameterType::Integer => "Integer",
            ParameterType::Boolean => "Boolean",
            ParameterType::String => "String",
            ParameterType::Material => "Material",
            ParameterType::LineType => "LineType",
            ParameterType::Fill => "FillPattern",
            ParameterType::Pen => "PenColor",
            ParameterType::Separator => "Separator",
            ParameterType::Title => "Title",
            ParameterType::LightSwitch => "LightSwitch",
            ParameterType::ColorRGB => "ColorRGB",
            ParameterType::Intensity => "Intensity",
            ParameterType::BuildingMaterial => "BuildingMaterial",
            ParameterType::Profile => "Profile",
            ParameterType::Dictionary => "Dictionary",
            ParameterType::Comment => "Comment",
        }
    }
    /// The element tag, Comments are XML comment nodes and have none.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            ParameterType::Comment => None,
            other => Some(other.type_name()),
        }
    }
    pub fn from_type_name(name: &str) -> Option<ParameterType> {
        let name = if name == "Real" { "RealNum" } else { name };
        TYPE_NAMES.get_by_right(name).copied()
    }
    pub fn from_tag(tag: &str) -> Option<ParameterType> {
        match ParameterType::from_type_name(tag) {
            Some(ParameterType::Comment) => None,
            found => found,
        }
    }
    pub fn value_kind(&self) -> ValueKind {
        match self {
            ParameterType::Length
            | ParameterType::Angle
            | ParameterType::Real
            | ParameterType::ColorRGB
            | ParameterType::Intensity => ValueKind::Float,
            ParameterType::Integer
            | ParameterType::Material
            | ParameterType::LineType
            | ParameterType::Fill
            | ParameterType::Pen
            | ParameterType::LightSwitch
            | ParameterType::BuildingMaterial
            | ParameterType::Profile => ValueKind::Integer,
            ParameterType::Boolean => ValueKind::Boolean,
            ParameterType::String => ValueKind::Text,
            ParameterType::Separator | ParameterType::Title => ValueKind::Structural,
            ParameterType::Dictionary => ValueKind::Payload,
            ParameterType::Comment => ValueKind::Comment,
        }
    }
}
impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

lazy_static! {
    static ref TYPE_NAMES: BiMap<ParameterType, &'static str> = {
        let mut names = BiMap::new();
        for kind in ParameterType::ALL {
            names.insert(kind, kind.type_name());
        }
        names
    };
    static ref INFERENCE_RULES: Vec<(Regex, ParameterType)> = vec![
        (Regex::new(r"^(?:is|b)[A-Z]").unwrap(), ParameterType::Boolean),
        (Regex::new(r"^(?:i|n)[A-Z]").unwrap(), ParameterType::Integer),
        (Regex::new(r"^(?:st?[A-Z]|mp_)").unwrap(), ParameterType::String),
        (Regex::new(r"^[xyz][A-Z]").unwrap(), ParameterType::Length),
        (Regex::new(r"^a[A-Z]").unwrap(), ParameterType::Angle),
    ];
}

/// Tag lookup used by the document loader. Extra entries let a caller accept
/// tags written by other tools, they never shadow the built-in table.
#[derive(Debug, Clone, Default)]
pub struct TagTable {
    extra: HashMap<String, ParameterType, NameHasher>,
}
impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(mut self, tag: impl Into<String>, kind: ParameterType) -> Self {
        self.extra.insert(tag.into(), kind);
        self
    }
    pub fn resolve(&self, tag: &str) -> Option<ParameterType> {
        ParameterType::from_tag(tag).or_else(|| self.extra.get(tag).copied())
    }
}

// ------------- Values --------------
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
}
impl Scalar {
    /// Empty text counts as "no value" when deciding whether a change needs a warning.
    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(text) if text.is_empty())
    }
}
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scalar::Float(v) => write!(f, "{}", format_float(*v)),
            Scalar::Integer(v) => write!(f, "{}", v),
            Scalar::Boolean(v) => write!(f, "{}", if *v { 1 } else { 0 }),
            Scalar::Text(v) => write!(f, "{}", v),
        }
    }
}
impl From<f64> for Scalar {
    fn from(v: f64) -> Self { Scalar::Float(v) }
}
impl From<i64> for Scalar {
    fn from(v: i64) -> Self { Scalar::Integer(v) }
}
impl From<bool> for Scalar {
    fn from(v: bool) -> Self { Scalar::Boolean(v) }
}
impl From<&str> for Scalar {
    fn from(v: &str) -> Self { Scalar::Text(v.to_string()) }
}
impl From<String> for Scalar {
    fn from(v: String) -> Self { Scalar::Text(v) }
}

/// Values as they arrive from callers and spreadsheets, before coercion.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Text(String),
    Sequence(Vec<RawValue>),
    Mapping(Vec<(String, RawValue)>),
}
impl Default for RawValue {
    fn default() -> Self {
        RawValue::Text(String::new())
    }
}
impl RawValue {
    pub fn from_json(value: &serde_json::Value) -> RawValue {
        use serde_json::Value;
        match value {
            Value::Null => RawValue::Text(String::new()),
            Value::Bool(b) => RawValue::from(*b),
            Value::Number(n) => RawValue::Text(n.to_string()),
            Value::String(s) => RawValue::Text(s.clone()),
            Value::Array(items) => RawValue::Sequence(items.iter().map(RawValue::from_json).collect()),
            Value::Object(map) => RawValue::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), RawValue::from_json(v)))
                    .collect(),
            ),
        }
    }
    /// A row-major text table: a single column gives a plain sequence, anything
    /// wider gives a sequence of rows.
    pub fn from_table(table: &[Vec<String>]) -> RawValue {
        if table.iter().all(|row| row.len() <= 1) {
            RawValue::Sequence(
                table
                    .iter()
                    .map(|row| RawValue::Text(row.first().cloned().unwrap_or_default()))
                    .collect(),
            )
        } else {
            RawValue::Sequence(
                table
                    .iter()
                    .map(|row| RawValue::Sequence(row.iter().cloned().map(RawValue::Text).collect()))
                    .collect(),
            )
        }
    }
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(text) => Some(text),
            _ => None,
        }
    }
    /// Non-empty, and not spelled "0" or "false".
    pub fn is_truthy(&self) -> bool {
        match self {
            RawValue::Text(text) => {
                let text = text.trim();
                !(text.is_empty() || text == "0" || text.eq_ignore_ascii_case("false"))
            }
            RawValue::Sequence(items) => !items.is_empty(),
            RawValue::Mapping(entries) => !entries.is_empty(),
        }
    }
}
impl From<&str> for RawValue {
    fn from(v: &str) -> Self { RawValue::Text(v.to_string()) }
}
impl From<String> for RawValue {
    fn from(v: String) -> Self { RawValue::Text(v) }
}
impl From<f64> for RawValue {
    fn from(v: f64) -> Self { RawValue::Text(v.to_string()) }
}
impl From<i64> for RawValue {
    fn from(v: i64) -> Self { RawValue::Text(v.to_string()) }
}
impl From<bool> for RawValue {
    fn from(v: bool) -> Self { RawValue::Text(if v { "1" } else { "0" }.to_string()) }
}
impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(v: Vec<T>) -> Self { RawValue::Sequence(v.into_iter().map(Into::into).collect()) }
}

// ------------- Coercion and formatting --------------
fn coercion_error(text: &str, expected: &'static str) -> GsmParamError {
    GsmParamError::TypeCoercion {
        text: text.to_string(),
        expected,
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        // spreadsheets hand integers over as "3.0"
        let v = trimmed.parse::<f64>().ok()?;
        (v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
    })
}

pub fn coerce_from_text(kind: ParameterType, text: &str) -> Result<Option<Scalar>> {
    match kind.value_kind() {
        ValueKind::Float => text
            .trim()
            .parse::<f64>()
            .map(|v| Some(Scalar::Float(v)))
            .map_err(|_| coercion_error(text, "a decimal number")),
        ValueKind::Integer => parse_integer(text)
            .map(|v| Some(Scalar::Integer(v)))
            .ok_or_else(|| coercion_error(text, "an integer")),
        ValueKind::Boolean => {
            let trimmed = text.trim();
            let truth = match parse_integer(trimmed) {
                Some(v) => Some(v != 0),
                None => trimmed.parse::<f64>().ok().map(|v| v != 0.0),
            };
            truth
                .map(|v| Some(Scalar::Boolean(v)))
                .ok_or_else(|| coercion_error(text, "a boolean (0 or 1)"))
        }
        ValueKind::Text => Ok(Some(Scalar::Text(unquote(text).to_string()))),
        ValueKind::Structural => Ok(None),
        ValueKind::Payload => Err(GsmParamError::UnsupportedOperation(
            "dictionary values travel only as node payloads".to_string(),
        )),
        ValueKind::Comment => Ok(Some(Scalar::Text(text.to_string()))),
    }
}

/// Strips exactly one pair of surrounding double quotes.
pub fn unquote(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    if !text.starts_with('"') {
        quoted.push('"');
    }
    quoted.push_str(text);
    if !quoted.ends_with('"') || quoted.len() == 1 {
        quoted.push('"');
    }
    quoted
}

/// The shortest fixed-point rendering that re-parses to within the tolerance.
pub fn format_float(value: f64) -> String {
    for digits in 0..MAX_FRACTION_DIGITS {
        let rendered = format!("{:.*}", digits, value);
        if let Ok(reparsed) = rendered.parse::<f64>() {
            if value - FLOAT_TOLERANCE < reparsed && reparsed < value + FLOAT_TOLERANCE {
                return rendered;
            }
        }
    }
    format!("{:.*}", MAX_FRACTION_DIGITS, value)
}

pub fn format(kind: ParameterType, value: Option<&Scalar>) -> String {
    let value = match value {
        Some(value) => value,
        None if kind.value_kind() == ValueKind::Text => return quote(""),
        None => return String::new(),
    };
    match (kind.value_kind(), value) {
        (ValueKind::Float, Scalar::Float(v)) => format_float(*v),
        (ValueKind::Float, Scalar::Integer(v)) => format_float(*v as f64),
        (ValueKind::Integer, Scalar::Float(v)) => format!("{}", v.round() as i64),
        (ValueKind::Text, Scalar::Text(v)) => quote(v),
        (_, other) => other.to_string(),
    }
}

/// Guesses a parameter type from naming conventions. The flag is set when no
/// rule matched and String was used as the fallback.
pub fn infer_type(name: &str) -> (ParameterType, bool) {
    INFERENCE_RULES
        .iter()
        .find(|(rule, _)| rule.is_match(name))
        .map(|(_, kind)| (*kind, false))
        .unwrap_or((ParameterType::String, true))
}
