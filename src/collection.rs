// the name index is a HashMap with a fast hasher
use std::collections::HashMap;

// inserts, removals and section reads are traced
use tracing::debug;

// our own stuff that we need
use crate::NameHasher;
use crate::datatype::{ParameterType, RawValue, Scalar, TagTable};
use crate::error::{GsmParamError, Result, Warning};
use crate::node::{Element, Node, Text};
use crate::parameter::{Parameter, ParameterFlag};

/// Everything in a parameter section besides the parameters themselves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionMeta {
    pub sect_version: Option<String>,
    pub section_flags: Option<String>,
    pub sub_ident: Option<String>,
    pub header: Option<Element>,
    pub frame_expression: Option<Element>,
    pub orientation: Option<Element>,
}

/// The parameters of a library part in document order. Comments take part in
/// the order but are never found by name.
#[derive(Debug, Clone, Default)]
pub struct ParameterCollection {
    parameters: Vec<Parameter>,
    index: HashMap<String, usize, NameHasher>,
    section: SectionMeta,
}

impl PartialEq for ParameterCollection {
    fn eq(&self, other: &Self) -> bool {
        self.parameters == other.parameters && self.section == other.section
    }
}

impl ParameterCollection {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn section(&self) -> &SectionMeta {
        &self.section
    }
    pub fn section_mut(&mut self) -> &mut SectionMeta {
        &mut self.section
    }
    pub fn len(&self) -> usize {
        self.parameters.len()
    }
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }
    fn reindex(&mut self) {
        self.index.clear();
        for (position, parameter) in self.parameters.iter().enumerate() {
            if !parameter.is_comment() {
                self.index.insert(parameter.name().to_string(), position);
            }
        }
    }
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
    pub fn by_index(&self, position: usize) -> Option<&Parameter> {
        self.parameters.get(position)
    }
    pub fn by_name(&self, name: &str) -> Option<&Parameter> {
        self.position(name).map(|position| &self.parameters[position])
    }
    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.position(name).map(move |position| &mut self.parameters[position])
    }
    fn existing(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| GsmParamError::MissingReferencedParameter(name.to_string()))
    }

    fn insert_at(&mut self, position: usize, parameter: Parameter) -> Result<()> {
        if !parameter.is_comment() && self.contains(parameter.name()) {
            return Err(GsmParamError::DuplicateParameter(parameter.name().to_string()));
        }
        debug!(parameter = %parameter, position, "inserting");
        self.parameters.insert(position, parameter);
        self.reindex();
        Ok(())
    }
    pub fn append(&mut self, parameter: Parameter) -> Result<()> {
        let end = self.parameters.len();
        self.insert_at(end, parameter)
    }
    pub fn insert_before(&mut self, target: &str, parameter: Parameter) -> Result<()> {
        let position = self.existing(target)?;
        self.insert_at(position, parameter)
    }
    pub fn insert_after(&mut self, target: &str, parameter: Parameter) -> Result<()> {
        let position = self.existing(target)?;
        self.insert_at(position + 1, parameter)
    }
    /// Puts the parameter after the last Child of a Title. Nothing happens,
    /// and false comes back, when the target is not a Title.
    pub fn insert_as_child(&mut self, title: &str, parameter: Parameter) -> Result<bool> {
        let base = self.existing(title)?;
        if self.parameters[base].kind() != ParameterType::Title {
            debug!(target = title, "not a Title, child insert skipped");
            return Ok(false);
        }
        let mut position = base + 1;
        while let Some(next) = self.parameters.get(position) {
            if next.kind() == ParameterType::Title || !next.has_flag(ParameterFlag::Child) {
                break;
            }
            position += 1;
        }
        self.insert_at(position, parameter)?;
        Ok(true)
    }
    /// Missing names are ignored.
    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        let position = self.position(name)?;
        let removed = self.parameters.remove(position);
        debug!(parameter = %removed, position, "removed");
        self.reindex();
        Some(removed)
    }

    pub fn next_after(&self, name: &str) -> Option<&Parameter> {
        self.position(name).and_then(|position| self.parameters.get(position + 1))
    }
    pub fn has_comment(&self, text: &str) -> bool {
        self.parameters
            .iter()
            .any(|p| p.is_comment() && p.name() == text)
    }
    /// The run of Child parameters right after a Title, or None when the name
    /// is not a Title.
    pub fn children_of(&self, title: &str) -> Option<Vec<&Parameter>> {
        let base = self.position(title)?;
        if self.parameters[base].kind() != ParameterType::Title {
            return None;
        }
        Some(
            self.parameters[base + 1..]
                .iter()
                .take_while(|p| p.kind() != ParameterType::Title && p.has_flag(ParameterFlag::Child))
                .collect(),
        )
    }
    /// Parameters of one type, optionally narrowed to a name and a scalar
    /// value. Dictionaries are never listed.
    pub fn filter_by_type(
        &self,
        kind: ParameterType,
        name_filter: Option<&str>,
        value_filter: Option<&Scalar>,
    ) -> Vec<&Parameter> {
        self.parameters
            .iter()
            .filter(|p| p.kind() == kind && p.kind() != ParameterType::Dictionary)
            .filter(|p| name_filter.is_none_or(|name| p.name() == name))
            .filter(|p| value_filter.is_none_or(|value| p.scalar() == Some(value)))
            .collect()
    }
    /// "name", "name.row" or "name.row.col" for every addressable cell of the
    /// matching parameters, optionally only the cells holding a value.
    pub fn identifiers_by_type(
        &self,
        kind: ParameterType,
        name_filter: Option<&str>,
        value_filter: Option<&Scalar>,
    ) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();
        for parameter in self.filter_by_type(kind, name_filter, None) {
            for identifier in parameter.hashable_identifiers(true)? {
                let path = identifier
                    .strip_prefix(parameter.name())
                    .unwrap_or_default()
                    .trim_start_matches('.');
                let keep = match value_filter {
                    Some(value) if path.is_empty() => parameter.scalar() == Some(value),
                    Some(value) => parameter.value_by_path(path)? == Some(value),
                    None => true,
                };
                if keep {
                    identifiers.push(identifier);
                }
            }
        }
        Ok(identifiers)
    }
    /// Writes through "name", "name.row" or "name.row.col".
    pub fn set_value_by_path(&mut self, path: &str, value: RawValue) -> Result<Option<Warning>> {
        let (name, rest) = path.split_once('.').unwrap_or((path, ""));
        if path.contains('.') && rest.is_empty() {
            return Err(GsmParamError::MalformedDocument(format!("{:?} ends without an array index", path)));
        }
        let parameter = self
            .by_name_mut(name)
            .ok_or_else(|| GsmParamError::MissingReferencedParameter(name.to_string()))?;
        parameter.set_value_by_path(rest, value)
    }

    // ------------- Section codec --------------
    pub fn from_node(section: &Element) -> Result<Self> {
        Self::from_node_with(section, &TagTable::default())
    }
    pub fn from_node_with(section: &Element, tags: &TagTable) -> Result<Self> {
        if section.tag != "ParamSection" {
            return Err(GsmParamError::MalformedDocument(format!(
                "expected ParamSection, found <{}>",
                section.tag
            )));
        }
        let header = section.child("ParamSectHeader").ok_or_else(|| {
            GsmParamError::MalformedDocument("ParamSection has no ParamSectHeader".to_string())
        })?;
        let block = section.child("Parameters").ok_or_else(|| {
            GsmParamError::MalformedDocument("ParamSection has no Parameters".to_string())
        })?;
        let mut collection = ParameterCollection::new();
        collection.section = SectionMeta {
            sect_version: section.attribute("SectVersion").map(str::to_string),
            section_flags: section.attribute("SectionFlags").map(str::to_string),
            sub_ident: section.attribute("SubIdent").map(str::to_string),
            header: Some(header.clone()),
            frame_expression: section.child("WDFrameExpression").cloned(),
            orientation: section.child("WDOrientation").cloned(),
        };
        for node in &block.children {
            collection.append(Parameter::from_node_with(node, tags)?)?;
        }
        debug!(parameters = collection.len(), "section read");
        Ok(collection)
    }

    pub fn to_node(&self) -> Element {
        let mut section = Element::new("ParamSection")
            .with_text(Text::plain("\n\t"))
            .with_tail("\n");
        let attributes = [
            ("SectVersion", &self.section.sect_version),
            ("SectionFlags", &self.section.section_flags),
            ("SubIdent", &self.section.sub_ident),
        ];
        for (name, value) in attributes {
            if let Some(value) = value {
                section.attributes.push((name.to_string(), value.clone()));
            }
        }
        if let Some(header) = &self.section.header {
            section.push(header.clone().with_tail("\n\t"));
        }

        let wd_blocks = [&self.section.frame_expression, &self.section.orientation];
        let trailing = wd_blocks.iter().filter(|b| b.is_some()).count();
        let mut block = Element::new("Parameters")
            .with_text(Text::plain("\n\t\t"))
            .with_tail(if trailing > 0 { "\n\t" } else { "\n" });
        let count = self.parameters.len();
        for (position, parameter) in self.parameters.iter().enumerate() {
            let mut node = parameter.to_node();
            let next_is_comment = self.parameters.get(position + 1).is_some_and(Parameter::is_comment);
            let tail = if position + 1 == count {
                "\n\t"
            } else if parameter.is_comment() || next_is_comment {
                "\n\n\t\t"
            } else {
                "\n\t\t"
            };
            node.set_tail(tail);
            block.push(node);
        }
        section.push(block);

        let mut remaining = trailing;
        for wd in wd_blocks.into_iter().flatten() {
            remaining -= 1;
            let mut wd = wd.clone().with_tail(if remaining > 0 { "\n\t" } else { "\n" });
            for child in wd.children.iter_mut() {
                if let Node::Element(element) = child {
                    if let Some(text) = element.text.as_mut() {
                        text.cdata = true;
                    }
                }
            }
            section.push(wd);
        }
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled() -> ParameterCollection {
        let mut collection = ParameterCollection::new();
        collection.append(Parameter::new(ParameterType::Title, "Group")).unwrap();
        collection
            .append(Parameter::new(ParameterType::Length, "xA").with_flags([ParameterFlag::Child]))
            .unwrap();
        collection.append(Parameter::new(ParameterType::Length, "xB")).unwrap();
        collection
    }

    #[test]
    fn children_go_after_the_last_child() {
        let mut collection = titled();
        assert!(collection.insert_as_child("Group", Parameter::new(ParameterType::Length, "xC")).unwrap());
        let names: Vec<_> = collection.iter().map(Parameter::name).collect();
        assert_eq!(names, vec!["Group", "xA", "xC", "xB"]);
    }

    #[test]
    fn child_insert_under_a_non_title_does_nothing() {
        let mut collection = titled();
        assert!(!collection.insert_as_child("xB", Parameter::new(ParameterType::Length, "xC")).unwrap());
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut collection = titled();
        assert!(matches!(
            collection.append(Parameter::new(ParameterType::Angle, "xA")),
            Err(GsmParamError::DuplicateParameter(_))
        ));
        collection.append(Parameter::comment("same")).unwrap();
        collection.append(Parameter::comment("same")).unwrap();
    }

    #[test]
    fn removal_keeps_the_index_current() {
        let mut collection = titled();
        assert!(collection.remove("nothing").is_none());
        assert_eq!(collection.remove("xA").map(|p| p.name().to_string()), Some("xA".to_string()));
        assert_eq!(collection.position("xB"), Some(1));
        assert!(!collection.contains("xA"));
    }
}
