// used to print out readable forms of parameters
use std::fmt;

// dictionary payloads are serialized node trees
use serde::{Deserialize, Serialize};

// value shape changes are reported as they happen
use tracing::warn;

// our own stuff that we need
use crate::array::{ArrayStore, Row};
use crate::datatype::{coerce_from_text, format, quote, unquote, ParameterType, RawValue, Scalar, TagTable, ValueKind};
use crate::error::{GsmParamError, Result, Warning};
use crate::node::{Element, Node, Text};

/// Longest name a non-Comment parameter may carry.
pub const MAX_NAME_LENGTH: usize = 32;

// ------------- Flags --------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterFlag {
    Child,
    BoldName,
    Unique,
    Hidden,
}
impl ParameterFlag {
    /// In the order they are written.
    pub const ALL: [ParameterFlag; 4] = [
        ParameterFlag::Child,
        ParameterFlag::BoldName,
        ParameterFlag::Unique,
        ParameterFlag::Hidden,
    ];
    pub fn tag(&self) -> &'static str {
        match self {
            ParameterFlag::Child => "ParFlg_Child",
            ParameterFlag::BoldName => "ParFlg_BoldName",
            ParameterFlag::Unique => "ParFlg_Unique",
            ParameterFlag::Hidden => "ParFlg_Hidden",
        }
    }
    pub fn from_tag(tag: &str) -> Option<ParameterFlag> {
        ParameterFlag::ALL.into_iter().find(|flag| flag.tag() == tag)
    }
    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub struct Flags(u8);
impl Flags {
    pub fn empty() -> Self {
        Flags(0)
    }
    pub fn contains(&self, flag: ParameterFlag) -> bool {
        self.0 & flag.bit() != 0
    }
    pub fn insert(&mut self, flag: ParameterFlag) {
        self.0 |= flag.bit();
    }
    pub fn remove(&mut self, flag: ParameterFlag) {
        self.0 &= !flag.bit();
    }
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
    pub fn iter(&self) -> impl Iterator<Item = ParameterFlag> {
        let flags = *self;
        ParameterFlag::ALL.into_iter().filter(move |flag| flags.contains(*flag))
    }
}
impl FromIterator<ParameterFlag> for Flags {
    fn from_iter<I: IntoIterator<Item = ParameterFlag>>(iter: I) -> Self {
        let mut flags = Flags::empty();
        for flag in iter {
            flags.insert(flag);
        }
        flags
    }
}

// ------------- Values --------------
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(Scalar),
    Array(ArrayStore),
    /// Serialized nested block of a Dictionary.
    Payload(String),
}

/// Where a path points inside a parameter: a row, and for 2-D arrays a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPath {
    pub row: usize,
    pub column: Option<usize>,
}
impl CellPath {
    /// Reads "row" or "row.col". Indices start at 1.
    pub fn parse(path: &str) -> Result<CellPath> {
        let index = |part: &str| {
            part.trim()
                .parse::<usize>()
                .ok()
                .filter(|i| *i > 0)
                .ok_or_else(|| GsmParamError::MalformedDocument(format!("invalid array path {:?}", path)))
        };
        let mut parts = path.split('.');
        let row = index(parts.next().unwrap_or_default())?;
        let column = parts.next().map(index).transpose()?;
        if parts.next().is_some() {
            return Err(GsmParamError::MalformedDocument(format!(
                "array path {:?} has more than two indices",
                path
            )));
        }
        Ok(CellPath { row, column })
    }
}

// ------------- Parameter --------------
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    kind: ParameterType,
    description: String,
    flags: Flags,
    value: Option<ParamValue>,
    fix: bool,
    // the node this parameter was read from, dropped on the first change
    source: Option<Element>,
}

// equal parameters serialize the same way, the captured source is not compared
impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.description == other.description
            && self.flags == other.flags
            && self.value == other.value
            && self.fix == other.fix
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

pub fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_LENGTH).collect()
}

fn tabs(depth: usize) -> String {
    format!("\n{}", "\t".repeat(depth))
}

impl Parameter {
    pub fn new(kind: ParameterType, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if kind == ParameterType::Comment { name } else { truncate_name(&name) };
        let value = match kind.value_kind() {
            ValueKind::Text => Some(ParamValue::Scalar(Scalar::Text(String::new()))),
            _ => None,
        };
        Self {
            name,
            kind,
            description: String::new(),
            flags: Flags::empty(),
            value,
            fix: false,
            source: None,
        }
    }
    pub fn comment(text: impl Into<String>) -> Self {
        Self::new(ParameterType::Comment, text)
    }
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(description);
        self
    }
    pub fn with_flags(mut self, flags: impl IntoIterator<Item = ParameterFlag>) -> Self {
        for flag in flags {
            self.set_flag(flag, true);
        }
        self
    }
    pub fn with_value(mut self, value: impl Into<RawValue>) -> Result<Self> {
        self.set_value(value.into())?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> ParameterType {
        self.kind
    }
    pub fn is_comment(&self) -> bool {
        self.kind == ParameterType::Comment
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn flags(&self) -> Flags {
        self.flags
    }
    pub fn has_flag(&self, flag: ParameterFlag) -> bool {
        self.flags.contains(flag)
    }
    pub fn is_fixed(&self) -> bool {
        self.fix
    }
    pub fn value(&self) -> Option<&ParamValue> {
        self.value.as_ref()
    }
    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.value {
            Some(ParamValue::Scalar(scalar)) => Some(scalar),
            _ => None,
        }
    }
    pub fn array(&self) -> Option<&ArrayStore> {
        match &self.value {
            Some(ParamValue::Array(store)) => Some(store),
            _ => None,
        }
    }
    pub fn payload(&self) -> Option<&str> {
        match &self.value {
            Some(ParamValue::Payload(payload)) => Some(payload),
            _ => None,
        }
    }
    /// True while the parameter still matches the node it was read from.
    pub fn is_pristine(&self) -> bool {
        self.source.is_some()
    }

    fn touch(&mut self) {
        self.source = None;
    }
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }
    pub fn set_flag(&mut self, flag: ParameterFlag, on: bool) {
        if self.is_comment() {
            return;
        }
        if on {
            self.flags.insert(flag);
        } else {
            self.flags.remove(flag);
        }
        self.touch();
    }
    pub fn set_fixed(&mut self, fix: bool) {
        self.fix = fix;
        self.touch();
    }
    /// Replaces a Dictionary's nested block with a serialized payload. The
    /// payload must decode and is stored re-encoded.
    pub fn set_payload(&mut self, payload: impl Into<String>) -> Result<()> {
        if self.kind != ParameterType::Dictionary {
            return Err(GsmParamError::UnsupportedOperation(format!(
                "{} is not a Dictionary and cannot hold a payload",
                self.name
            )));
        }
        let payload = encode_payload(&decode_payload(&payload.into())?)?;
        self.value = Some(ParamValue::Payload(payload));
        self.touch();
        Ok(())
    }

    fn coerce(&self, text: &str) -> Result<Scalar> {
        coerce_from_text(self.kind, text)?.ok_or_else(|| {
            GsmParamError::UnsupportedOperation(format!("{} parameters hold no values", self.kind))
        })
    }
    fn coerce_row(&self, value: &RawValue) -> Result<Row> {
        match value {
            RawValue::Text(text) => Ok(Row::Cell(self.coerce(text)?)),
            RawValue::Sequence(columns) => {
                let mut cells = Vec::with_capacity(columns.len());
                for (index, column) in columns.iter().enumerate() {
                    match column {
                        RawValue::Text(text) => cells.push((index + 1, self.coerce(text)?)),
                        _ => {
                            return Err(GsmParamError::UnsupportedOperation(format!(
                                "arrays of {} have at most two dimensions",
                                self.name
                            )));
                        }
                    }
                }
                Ok(Row::columns(cells))
            }
            RawValue::Mapping(_) => Err(self.mapping_error()),
        }
    }
    fn mapping_error(&self) -> GsmParamError {
        GsmParamError::UnsupportedOperation(format!("direct dictionary assignment to {}", self.name))
    }
    fn had_scalar(&self) -> bool {
        matches!(&self.value, Some(ParamValue::Scalar(scalar)) if !scalar.is_blank())
    }

    /// Overwrites the whole value. A sequence makes an array, text makes a
    /// scalar, and switching between the two is reported.
    pub fn set_value(&mut self, value: RawValue) -> Result<Option<Warning>> {
        if self.is_comment() {
            return match value {
                RawValue::Text(text) => {
                    self.name = text;
                    self.touch();
                    Ok(None)
                }
                _ => Err(GsmParamError::UnsupportedOperation("comments hold text only".to_string())),
            };
        }
        match value {
            RawValue::Mapping(_) => Err(self.mapping_error()),
            RawValue::Sequence(items) => {
                let mut rows = Vec::with_capacity(items.len());
                for item in &items {
                    rows.push(self.coerce_row(item)?);
                }
                let warning = self.had_scalar().then(|| Warning::ScalarToArray {
                    name: self.name.clone(),
                });
                self.value = Some(ParamValue::Array(ArrayStore::from_rows(rows)));
                self.touch();
                Ok(report(warning))
            }
            RawValue::Text(text) if self.kind == ParameterType::Dictionary => {
                self.set_payload(text)?;
                Ok(None)
            }
            RawValue::Text(text) => {
                let scalar = coerce_from_text(self.kind, &text)?;
                let warning = self.array().map(|_| Warning::ArrayToScalar {
                    name: self.name.clone(),
                });
                self.value = scalar.map(ParamValue::Scalar);
                self.touch();
                Ok(report(warning))
            }
        }
    }

    /// Writes into one row (or one cell) of the array, turning a scalar
    /// parameter into an array first.
    pub fn write_at(&mut self, path: CellPath, value: RawValue) -> Result<Option<Warning>> {
        if matches!(self.kind.value_kind(), ValueKind::Payload | ValueKind::Structural | ValueKind::Comment) {
            return Err(GsmParamError::UnsupportedOperation(format!(
                "positional write into {}",
                self.name
            )));
        }
        let two_dimensional = self.array().is_some_and(ArrayStore::is_two_dimensional);
        let column = match (path.column, &value) {
            (Some(column), _) => Some(column),
            (None, RawValue::Text(_)) if two_dimensional => Some(1),
            _ => None,
        };
        // everything fallible happens before the parameter is touched
        let pending = match column {
            Some(column) => match &value {
                RawValue::Text(text) => PendingWrite::Cell(column, self.coerce(text)?),
                _ => {
                    return Err(GsmParamError::UnsupportedOperation(format!(
                        "a single cell of {} cannot hold a sequence",
                        self.name
                    )));
                }
            },
            None => PendingWrite::Row(self.coerce_row(&value)?),
        };
        let warning = if self.array().is_some() {
            None
        } else {
            let warning = self.had_scalar().then(|| Warning::ScalarToArray {
                name: self.name.clone(),
            });
            self.value = Some(ParamValue::Array(ArrayStore::new()));
            warning
        };
        if let Some(ParamValue::Array(store)) = &mut self.value {
            match pending {
                PendingWrite::Cell(column, scalar) => store.set_cell(path.row, column, scalar)?,
                PendingWrite::Row(row) => store.set(path.row, row),
            }
        }
        self.touch();
        Ok(report(warning))
    }

    /// Reads one array element ("row" or "row.col"), or the scalar for a
    /// scalar parameter. Never grows the array.
    pub fn value_by_path(&self, path: &str) -> Result<Option<&Scalar>> {
        match &self.value {
            Some(ParamValue::Payload(_)) => Err(self.dictionary_path_error()),
            Some(ParamValue::Array(store)) => {
                let at = CellPath::parse(path)?;
                match (at.column, store.is_two_dimensional()) {
                    (Some(column), true) => Ok(store.cell(at.row, column)),
                    (None, false) => Ok(store.get(at.row).and_then(Row::scalar)),
                    (Some(_), false) => Err(GsmParamError::MalformedDocument(format!(
                        "{} is one-dimensional, {:?} names a column",
                        self.name, path
                    ))),
                    (None, true) => Err(GsmParamError::MalformedDocument(format!(
                        "{} is two-dimensional, {:?} names no column",
                        self.name, path
                    ))),
                }
            }
            _ if self.kind == ParameterType::Dictionary => Err(self.dictionary_path_error()),
            Some(ParamValue::Scalar(scalar)) => Ok(Some(scalar)),
            None => Ok(None),
        }
    }
    pub fn set_value_by_path(&mut self, path: &str, value: RawValue) -> Result<Option<Warning>> {
        if self.kind == ParameterType::Dictionary {
            return Err(self.dictionary_path_error());
        }
        if path.is_empty() {
            return self.set_value(value);
        }
        self.write_at(CellPath::parse(path)?, value)
    }
    fn dictionary_path_error(&self) -> GsmParamError {
        GsmParamError::UnsupportedOperation(format!("path addressing inside dictionary {}", self.name))
    }

    /// One identifier per addressable cell, "name.row" or "name.row.col"
    /// across the declared dimensions, or just the name for scalars.
    pub fn hashable_identifiers(&self, include_name: bool) -> Result<Vec<String>> {
        if self.kind == ParameterType::Dictionary {
            return Err(GsmParamError::UnsupportedOperation(format!(
                "identifiers of dictionary {}",
                self.name
            )));
        }
        if self.is_comment() {
            return Ok(Vec::new());
        }
        let prefix = |suffix: String| {
            if include_name { format!("{}.{}", self.name, suffix) } else { suffix }
        };
        match self.array() {
            Some(store) if !store.is_empty() => {
                let mut identifiers = Vec::new();
                for row in 1..=store.first_dimension() {
                    if store.is_two_dimensional() {
                        for column in 1..=store.second_dimension() {
                            identifiers.push(prefix(format!("{}.{}", row, column)));
                        }
                    } else {
                        identifiers.push(prefix(row.to_string()));
                    }
                }
                Ok(identifiers)
            }
            _ if include_name => Ok(vec![self.name.clone()]),
            _ => Ok(Vec::new()),
        }
    }

    // ------------- Node codec --------------
    pub fn from_node(node: &Node) -> Result<Self> {
        Self::from_node_with(node, &TagTable::default())
    }
    pub fn from_node_with(node: &Node, tags: &TagTable) -> Result<Self> {
        let element = match node {
            Node::Comment(comment) => return Ok(Self::comment(comment.text.clone())),
            Node::Element(element) => element,
        };
        let kind = tags
            .resolve(&element.tag)
            .ok_or_else(|| GsmParamError::UnknownParameterType(element.tag.clone()))?;
        let name = element.attribute("Name").ok_or_else(|| {
            GsmParamError::MalformedDocument(format!("<{}> has no Name attribute", element.tag))
        })?;
        let description = element.child("Description").ok_or_else(|| {
            GsmParamError::MalformedDocument(format!("{} has no Description", name))
        })?;
        let flags: Flags = element
            .child("Flags")
            .map(|flags| {
                flags
                    .child_elements()
                    .filter_map(|flag| ParameterFlag::from_tag(&flag.tag))
                    .collect()
            })
            .unwrap_or_default();
        let value = if kind == ParameterType::Dictionary {
            element
                .child("Value")
                .map(|block| encode_payload(block).map(ParamValue::Payload))
                .transpose()?
        } else if let Some(value) = element.child("Value") {
            coerce_from_text(kind, value.text_content())?.map(ParamValue::Scalar)
        } else if let Some(block) = element.child("ArrayValues") {
            Some(ParamValue::Array(decode_array(kind, name, block)?))
        } else if kind.value_kind() == ValueKind::Text {
            Some(ParamValue::Scalar(Scalar::Text(String::new())))
        } else {
            None
        };
        Ok(Self {
            name: name.to_string(),
            kind,
            description: unquote(description.text_content()).to_string(),
            flags,
            value,
            fix: element.child("Fix").is_some(),
            source: Some(element.clone()),
        })
    }

    /// The node as read when nothing changed, the canonical layout otherwise.
    pub fn to_node(&self) -> Node {
        match &self.source {
            Some(source) => Node::Element(source.clone()),
            None => self.canonical_node(),
        }
    }

    /// Builds the node from scratch, laid out for a parameter nested two
    /// levels deep in its section.
    pub fn canonical_node(&self) -> Node {
        if self.is_comment() {
            return Node::comment(self.name.clone());
        }
        let tag = self.kind.tag().unwrap_or_default();
        let mut element = Element::new(tag)
            .with_attribute("Name", self.name.clone())
            .with_text(Text::plain(tabs(3)))
            .with_tail(tabs(2));

        let value_block = self.value_block();
        let has_value = value_block.is_some();
        let flagged = !self.flags.is_empty();

        let description_tail = if flagged || has_value || self.fix { tabs(3) } else { tabs(2) };
        element.push(
            Element::new("Description")
                .with_text(Text::cdata(quote(&self.description)))
                .with_tail(description_tail),
        );
        if self.fix {
            let fix_tail = if flagged || has_value { tabs(3) } else { tabs(2) };
            element.push(Element::new("Fix").with_tail(fix_tail));
        }
        if flagged {
            let mut flags = Element::new("Flags")
                .with_text(Text::plain(tabs(4)))
                .with_tail(if has_value { tabs(3) } else { tabs(2) });
            for flag in self.flags.iter() {
                flags.push(Element::new(flag.tag()).with_tail(tabs(4)));
            }
            if let Some(last) = flags.children.last_mut() {
                last.set_tail(tabs(3));
            }
            element.push(flags);
        }
        if let Some(block) = value_block {
            element.push(block);
        }
        Node::Element(element)
    }

    fn value_block(&self) -> Option<Element> {
        let cdata = self.kind.value_kind() == ValueKind::Text;
        let text = |scalar: Option<&Scalar>| {
            let rendered = format(self.kind, scalar);
            if cdata { Text::cdata(rendered) } else { Text::plain(rendered) }
        };
        match &self.value {
            Some(ParamValue::Scalar(scalar)) => {
                Some(Element::new("Value").with_text(text(Some(scalar))).with_tail(tabs(2)))
            }
            Some(ParamValue::Array(store)) => {
                let mut block = Element::new("ArrayValues")
                    .with_attribute("FirstDimension", store.first_dimension().to_string())
                    .with_attribute("SecondDimension", store.second_dimension().to_string())
                    .with_tail(tabs(2));
                for (index, row) in store.rows() {
                    match row {
                        Row::Columns(columns) => {
                            for (column, scalar) in columns {
                                block.push(
                                    Element::new("AVal")
                                        .with_attribute("Column", column.to_string())
                                        .with_attribute("Row", index.to_string())
                                        .with_text(text(Some(scalar)))
                                        .with_tail(tabs(4)),
                                );
                            }
                        }
                        Row::Cell(scalar) => block.push(
                            Element::new("AVal")
                                .with_attribute("Row", index.to_string())
                                .with_text(text(Some(scalar)))
                                .with_tail(tabs(4)),
                        ),
                    }
                }
                if let Some(last) = block.children.last_mut() {
                    last.set_tail(tabs(3));
                    block.text = Some(Text::plain(tabs(4)));
                }
                Some(block)
            }
            Some(ParamValue::Payload(payload)) => match decode_payload(payload) {
                Ok(mut block) => {
                    block.indent(3);
                    block.tail = tabs(2);
                    Some(block)
                }
                Err(e) => {
                    warn!(error = %e, parameter = %self.name, "dropping undecodable dictionary payload");
                    None
                }
            },
            None if cdata => Some(Element::new("Value").with_text(text(None)).with_tail(tabs(2))),
            None => None,
        }
    }
}

enum PendingWrite {
    Cell(usize, Scalar),
    Row(Row),
}

fn report(warning: Option<Warning>) -> Option<Warning> {
    if let Some(w) = &warning {
        warn!("{}", w);
    }
    warning
}

fn decode_array(kind: ParameterType, name: &str, block: &Element) -> Result<ArrayStore> {
    let dimension = |attribute: &str| {
        block
            .attribute(attribute)
            .and_then(|d| d.trim().parse::<usize>().ok())
            .ok_or_else(|| {
                GsmParamError::MalformedDocument(format!("ArrayValues of {} lacks a valid {}", name, attribute))
            })
    };
    let mut store = ArrayStore::with_dimensions(dimension("FirstDimension")?, dimension("SecondDimension")?);
    for cell in block.child_elements().filter(|e| e.tag == "AVal") {
        let index = |attribute: &str| cell.attribute(attribute).and_then(|i| i.trim().parse::<usize>().ok());
        let row = index("Row")
            .ok_or_else(|| GsmParamError::MalformedDocument(format!("AVal of {} without a Row", name)))?;
        let scalar = coerce_from_text(kind, cell.text_content())?.ok_or_else(|| {
            GsmParamError::MalformedDocument(format!("{} parameters hold no array values", kind))
        })?;
        if store.is_two_dimensional() {
            let column = index("Column")
                .ok_or_else(|| GsmParamError::MalformedDocument(format!("AVal of {} without a Column", name)))?;
            store.set_cell(row, column, scalar)?;
        } else {
            store.set(row, Row::Cell(scalar));
        }
    }
    Ok(store)
}

// ------------- Dictionary payloads --------------
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct PayloadNode {
    tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<PayloadNode>,
}

impl PayloadNode {
    fn capture(element: &Element) -> PayloadNode {
        let children: Vec<PayloadNode> = element.child_elements().map(PayloadNode::capture).collect();
        let text = match element.text_content() {
            text if children.is_empty() && !text.is_empty() => Some(text.to_string()),
            _ => None,
        };
        PayloadNode {
            tag: element.tag.clone(),
            attributes: element.attributes.clone(),
            text,
            children,
        }
    }
    fn rebuild(&self) -> Element {
        let mut element = Element::new(self.tag.clone());
        element.attributes = self.attributes.clone();
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            element.text = Some(if self.tag == "String" { Text::cdata(text) } else { Text::plain(text) });
        }
        for child in &self.children {
            element.push(child.rebuild());
        }
        element
    }
}

/// Serializes the children of a Dictionary's Value block, in document order.
pub fn encode_payload(block: &Element) -> Result<String> {
    let nodes: Vec<PayloadNode> = block.child_elements().map(PayloadNode::capture).collect();
    Ok(serde_json::to_string(&nodes)?)
}

/// Rebuilds the Value block of a Dictionary from its payload.
pub fn decode_payload(payload: &str) -> Result<Element> {
    let nodes: Vec<PayloadNode> = serde_json::from_str(payload)?;
    let mut block = Element::new("Value");
    for node in &nodes {
        block.push(node.rebuild());
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_truncated_except_for_comments() {
        let long = "a".repeat(40);
        assert_eq!(Parameter::new(ParameterType::Length, long.clone()).name().len(), 32);
        assert_eq!(Parameter::comment(long.clone()).name().len(), 40);
    }

    #[test]
    fn paths_are_one_based() {
        assert_eq!(CellPath::parse("3").unwrap(), CellPath { row: 3, column: None });
        assert_eq!(CellPath::parse("2.4").unwrap(), CellPath { row: 2, column: Some(4) });
        assert!(CellPath::parse("0").is_err());
        assert!(CellPath::parse("a.1").is_err());
        assert!(CellPath::parse("1.2.3").is_err());
    }

    #[test]
    fn flags_iterate_in_written_order() {
        let flags: Flags = [ParameterFlag::Hidden, ParameterFlag::Child].into_iter().collect();
        assert_eq!(flags.iter().collect::<Vec<_>>(), vec![ParameterFlag::Child, ParameterFlag::Hidden]);
    }

    #[test]
    fn failed_writes_leave_the_parameter_alone() {
        let mut p = Parameter::new(ParameterType::Integer, "nCount").with_value("3").unwrap();
        assert!(p.set_value(RawValue::from("three")).is_err());
        assert_eq!(p.scalar(), Some(&Scalar::Integer(3)));
        assert!(p.write_at(CellPath { row: 1, column: None }, RawValue::from("x")).is_err());
        assert_eq!(p.scalar(), Some(&Scalar::Integer(3)));
    }

    #[test]
    fn payload_survives_rebuild() {
        let payload = r#"[{"tag":"RealNum","attributes":[["Name","P1"]],"text":"2.1"}]"#;
        let block = decode_payload(payload).unwrap();
        assert_eq!(encode_payload(&block).unwrap(), payload);
    }
}
