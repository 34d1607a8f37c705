// the registry and the visited set use the fast name hasher
use std::collections::{HashMap, HashSet};

// macros missing from the registry are traced, not fatal
use tracing::debug;

// our own stuff that we need
use crate::NameHasher;
use crate::collection::ParameterCollection;
use crate::datatype::TagTable;
use crate::error::{GsmParamError, Result};
use crate::node::Element;

/// Script blocks of a library part document, in the order they are searched.
pub const SCRIPT_NAMES: [&str; 8] = [
    "Script_1D",
    "Script_2D",
    "Script_3D",
    "Script_PR",
    "Script_UI",
    "Script_VL",
    "Script_FWM",
    "Script_BWM",
];

/// A library part as far as parameter usage is concerned: its scripts, the
/// macros it calls and its parameters.
#[derive(Debug, Clone, Default)]
pub struct LibraryPart {
    name: String,
    guid: Option<String>,
    scripts: Vec<(String, String)>,
    called_macros: Vec<String>,
    parameters: ParameterCollection,
}

impl LibraryPart {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    pub fn with_script(mut self, kind: impl Into<String>, body: impl Into<String>) -> Self {
        self.scripts.push((kind.into(), body.into()));
        self
    }
    pub fn with_called_macro(mut self, name: impl Into<String>) -> Self {
        self.called_macros.push(name.into());
        self
    }
    pub fn with_parameters(mut self, parameters: ParameterCollection) -> Self {
        self.parameters = parameters;
        self
    }
    pub fn from_node(name: impl Into<String>, root: &Element) -> Result<Self> {
        Self::from_node_with(name, root, &TagTable::default())
    }
    pub fn from_node_with(name: impl Into<String>, root: &Element, tags: &TagTable) -> Result<Self> {
        let section = root.child("ParamSection").ok_or_else(|| {
            GsmParamError::MalformedDocument(format!("<{}> has no ParamSection", root.tag))
        })?;
        let mut part = LibraryPart::new(name).with_parameters(ParameterCollection::from_node_with(section, tags)?);
        part.guid = root
            .attribute("MainGUID")
            .or_else(|| root.attribute("UNID"))
            .map(str::to_string);
        for script in SCRIPT_NAMES {
            if let Some(body) = root.child(script) {
                part.scripts.push((script.to_string(), body.text_content().to_string()));
            }
        }
        if let Some(called) = root.child("CalledMacros") {
            for macro_call in called.child_elements().filter(|e| e.tag == "Macro") {
                if let Some(name) = macro_call.child("MName") {
                    let name = name.text_content().trim().trim_matches(|c| c == '\'' || c == '"');
                    part.called_macros.push(name.to_string());
                }
            }
        }
        debug!(part = %part.name, scripts = part.scripts.len(), macros = part.called_macros.len(), "library part read");
        Ok(part)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn guid(&self) -> Option<&str> {
        self.guid.as_deref()
    }
    pub fn scripts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.scripts.iter().map(|(k, b)| (k.as_str(), b.as_str()))
    }
    pub fn called_macros(&self) -> &[String] {
        &self.called_macros
    }
    pub fn parameters(&self) -> &ParameterCollection {
        &self.parameters
    }
    pub fn parameters_mut(&mut self) -> &mut ParameterCollection {
        &mut self.parameters
    }

    /// Whether a script of this part, or of any macro it calls directly or
    /// indirectly, mentions the parameter. `visited` collects the parts
    /// already searched so call cycles end.
    pub fn is_referenced(
        &self,
        parameter: &str,
        registry: &PartRegistry,
        visited: &mut HashSet<String, NameHasher>,
    ) -> bool {
        visited.insert(PartRegistry::key(&self.name));
        if self.scripts.iter().any(|(_, body)| body.contains(parameter)) {
            return true;
        }
        for called in &self.called_macros {
            if visited.contains(&PartRegistry::key(called)) {
                continue;
            }
            match registry.lookup(called) {
                Some(part) => {
                    if part.is_referenced(parameter, registry, visited) {
                        return true;
                    }
                }
                None => debug!(part = %self.name, called = %called, "called macro not in registry"),
            }
        }
        false
    }

    /// Names of parameters no script reaches. Advisory only.
    pub fn unused_parameters(&self, registry: &PartRegistry) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| !p.is_comment())
            .filter(|p| !self.is_referenced(p.name(), registry, &mut HashSet::default()))
            .map(|p| p.name())
            .collect()
    }
}

/// Library parts known in one run, looked up by name without regard to case.
#[derive(Debug, Clone, Default)]
pub struct PartRegistry {
    parts: HashMap<String, LibraryPart, NameHasher>,
}
impl PartRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    fn key(name: &str) -> String {
        name.to_uppercase()
    }
    /// Returns the part previously registered under the same name.
    pub fn register(&mut self, part: LibraryPart) -> Option<LibraryPart> {
        self.parts.insert(Self::key(part.name()), part)
    }
    pub fn lookup(&self, name: &str) -> Option<&LibraryPart> {
        self.parts.get(&Self::key(name))
    }
    pub fn len(&self) -> usize {
        self.parts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
