// pest is used to parse directives, see directive.pest for the grammar
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

// skipped directives and warnings are logged, batches summarized
use tracing::{debug, info, warn};

// our own stuff that we need
use crate::collection::ParameterCollection;
use crate::datatype::{infer_type, ParameterType, RawValue, ValueKind};
use crate::error::{GsmParamError, Location, Result, Warning};
use crate::parameter::{truncate_name, CellPath, Flags, Parameter, ParameterFlag};
use crate::settings::Settings;

#[derive(Parser)]
#[grammar = "directive.pest"]
struct DirectiveParser;

/// A parsed edit directive, e.g. `xWidth -t Length -d Overall width -c Frame`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Directive {
    pub name: String,
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub child_of: Option<String>,
    pub after: Option<String>,
    pub front_of: Option<String>,
    pub bold: bool,
    pub unique: bool,
    pub hidden: bool,
    pub inherit: bool,
    pub remove: bool,
    pub first_dimension: Option<usize>,
    pub second_dimension: Option<usize>,
    /// Tokens that matched no option.
    pub ignored: Vec<String>,
}

fn option_value(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::value)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

fn dimension(pair: Pair<Rule>) -> Result<usize> {
    let text = option_value(pair);
    text.parse::<usize>()
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| GsmParamError::AmbiguousDirective(format!("{:?} is not a positive array index", text)))
}

impl Directive {
    pub fn parse(text: &str) -> Result<Directive> {
        let parsed = DirectiveParser::parse(Rule::directive, text.trim())?
            .next()
            .ok_or_else(|| GsmParamError::AmbiguousDirective(format!("empty directive {:?}", text)))?;
        let mut directive = Directive::default();
        for part in parsed.into_inner() {
            match part.as_rule() {
                Rule::name => directive.name = part.as_str().to_string(),
                Rule::type_opt => directive.type_name = Some(option_value(part)),
                Rule::desc_opt => {
                    let words: Vec<&str> = part
                        .into_inner()
                        .filter(|p| p.as_rule() == Rule::desc_word)
                        .map(|p| p.as_str())
                        .collect();
                    directive.description = Some(words.join(" "));
                }
                Rule::child_opt => directive.child_of = Some(option_value(part)),
                Rule::after_opt => directive.after = Some(option_value(part)),
                Rule::frontof_opt => directive.front_of = Some(option_value(part)),
                Rule::first_opt => directive.first_dimension = Some(dimension(part)?),
                Rule::second_opt => directive.second_dimension = Some(dimension(part)?),
                Rule::bold_flag => directive.bold = true,
                Rule::unique_flag => directive.unique = true,
                Rule::hidden_flag => directive.hidden = true,
                Rule::inherit_flag => directive.inherit = true,
                Rule::remove_flag => directive.remove = true,
                Rule::legacy_flag => debug!(flag = part.as_str(), "legacy flag accepted"),
                Rule::stray => directive.ignored.push(part.as_str().to_string()),
                _ => (),
            }
        }
        if directive.second_dimension.is_some() && directive.first_dimension.is_none() {
            return Err(GsmParamError::AmbiguousDirective(format!(
                "{}: a second dimension needs a first one",
                directive.name
            )));
        }
        Ok(directive)
    }
    fn is_comment(&self) -> bool {
        self.type_name
            .as_deref()
            .and_then(ParameterType::from_type_name)
            == Some(ParameterType::Comment)
    }
}

/// One spreadsheet cell: the directive heading its row, the value in the
/// column being applied, and optionally a whole table for array values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub directive: String,
    pub value: RawValue,
    pub table: Option<Vec<Vec<String>>>,
    pub row: Option<usize>,
    pub column: Option<usize>,
}
impl Cell {
    pub fn new(directive: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self {
            directive: directive.into(),
            value: value.into(),
            ..Default::default()
        }
    }
    pub fn with_table(mut self, table: Vec<Vec<String>>) -> Self {
        self.table = Some(table);
        self
    }
    pub fn at(mut self, row: usize, column: usize) -> Self {
        self.row = Some(row);
        self.column = Some(column);
        self
    }
    pub fn location(&self) -> Location {
        Location {
            row: self.row,
            column: self.column,
            name: self.directive.split_whitespace().next().unwrap_or_default().to_string(),
        }
    }
    fn whole_value(&self) -> RawValue {
        match &self.table {
            Some(table) => RawValue::from_table(table),
            None => self.value.clone(),
        }
    }
    fn positional_value(&self, directive: &Directive) -> RawValue {
        match &self.table {
            Some(table) if directive.second_dimension.is_none() && !table.is_empty() => {
                RawValue::Sequence(table[0].iter().cloned().map(RawValue::Text).collect())
            }
            _ => self.value.clone(),
        }
    }
    fn is_blank(&self) -> bool {
        self.table.is_none() && self.value.as_text().is_some_and(|t| t.trim().is_empty())
    }
}

/// Outcome of a batch.
#[derive(Debug, Default)]
pub struct Report {
    pub applied: usize,
    pub warnings: Vec<Warning>,
    pub failures: Vec<GsmParamError>,
}
impl Report {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.failures.is_empty()
    }
}

#[derive(Clone, Copy)]
enum Placement<'d> {
    Child(&'d str),
    After(&'d str),
    FrontOf(&'d str),
    Append,
}

pub struct Engine<'c> {
    collection: &'c mut ParameterCollection,
    settings: Settings,
}
impl<'c> Engine<'c> {
    pub fn new(collection: &'c mut ParameterCollection) -> Self {
        Self::with_settings(collection, Settings::default())
    }
    pub fn with_settings(collection: &'c mut ParameterCollection, settings: Settings) -> Self {
        Self { collection, settings }
    }
    pub fn collection(&self) -> &ParameterCollection {
        self.collection
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Applies one directive completely or not at all.
    pub fn execute(&mut self, cell: &Cell) -> Result<Vec<Warning>> {
        self.apply(cell).map_err(|e| e.at(cell.location()))
    }
    /// Applies directives in order. A failing directive is recorded and the
    /// rest still run.
    pub fn execute_all<'a>(&mut self, cells: impl IntoIterator<Item = &'a Cell>) -> Report {
        let mut report = Report::default();
        for cell in cells {
            match self.execute(cell) {
                Ok(warnings) => {
                    report.applied += 1;
                    report.warnings.extend(warnings);
                }
                Err(e) => {
                    warn!(error = %e, "directive skipped");
                    report.failures.push(e);
                }
            }
        }
        info!(
            applied = report.applied,
            warnings = report.warnings.len(),
            failures = report.failures.len(),
            "directives applied"
        );
        report
    }

    fn apply(&mut self, cell: &Cell) -> Result<Vec<Warning>> {
        let directive = Directive::parse(&cell.directive)?;
        let mut warnings = Vec::new();
        for token in &directive.ignored {
            raise(&mut warnings, Warning::IgnoredToken { token: token.clone() });
        }
        if directive.is_comment() {
            self.create_banner(&directive, &mut warnings)?;
            return Ok(warnings);
        }
        let name = truncate_name(&directive.name);
        if self.collection.contains(&name) {
            self.update(&name, &directive, cell, &mut warnings)?;
        } else if directive.remove {
            debug!(parameter = %name, "nothing to remove");
        } else {
            self.create(&directive, cell, &mut warnings)?;
        }
        Ok(warnings)
    }

    fn update(&mut self, name: &str, directive: &Directive, cell: &Cell, warnings: &mut Vec<Warning>) -> Result<()> {
        if directive.remove {
            if cell.value.is_truthy() || cell.table.as_ref().is_some_and(|t| !t.is_empty()) {
                self.collection.remove(name);
            } else {
                debug!(parameter = %name, "remove not confirmed by the cell");
            }
            return Ok(());
        }
        let parameter = self
            .collection
            .by_name_mut(name)
            .ok_or_else(|| GsmParamError::MissingReferencedParameter(name.to_string()))?;
        if let Some(row) = directive.first_dimension {
            let path = CellPath {
                row,
                column: directive.second_dimension,
            };
            warnings.extend(parameter.write_at(path, cell.positional_value(directive))?);
        } else {
            if !(parameter.kind() == ParameterType::Dictionary && cell.is_blank()) {
                warnings.extend(parameter.set_value(cell.whole_value())?);
            }
            if let Some(description) = &directive.description {
                parameter.set_description(description.clone());
            }
        }
        Ok(())
    }

    /// Where a new parameter goes. Targets are checked here, before anything
    /// is changed.
    fn placement<'d>(&self, directive: &'d Directive) -> Result<Placement<'d>> {
        let placement = if let Some(target) = &directive.child_of {
            Placement::Child(target)
        } else if let Some(target) = &directive.after {
            Placement::After(target)
        } else if let Some(target) = &directive.front_of {
            Placement::FrontOf(target)
        } else {
            Placement::Append
        };
        if let Placement::Child(target) | Placement::After(target) | Placement::FrontOf(target) = placement {
            let found = self
                .collection
                .by_name(target)
                .ok_or_else(|| GsmParamError::MissingReferencedParameter(target.to_string()))?;
            if let Placement::Child(_) = placement {
                if found.kind() != ParameterType::Title && self.settings.strict_child_target {
                    return Err(GsmParamError::AmbiguousDirective(format!(
                        "{} is not a Title and cannot take children",
                        target
                    )));
                }
            }
        }
        Ok(placement)
    }

    fn flags(&self, directive: &Directive) -> Result<Flags> {
        let mut flags = Flags::empty();
        if directive.inherit {
            let (target, via_after) = match (&directive.child_of, &directive.after, &directive.front_of) {
                (Some(target), _, _) => (target, false),
                (None, Some(target), _) => (target, true),
                (None, None, Some(target)) => (target, false),
                _ => {
                    return Err(GsmParamError::AmbiguousDirective(format!(
                        "{}: nothing to inherit from without -c, -a or -f",
                        directive.name
                    )));
                }
            };
            let source = self
                .collection
                .by_name(target)
                .ok_or_else(|| GsmParamError::MissingReferencedParameter(target.to_string()))?;
            if via_after && source.has_flag(ParameterFlag::BoldName) && !directive.bold {
                flags.insert(ParameterFlag::Child);
            }
            for flag in source.flags().iter() {
                flags.insert(flag);
            }
            // -c always makes a Child
            if directive.child_of.is_some() {
                flags.insert(ParameterFlag::Child);
            }
        } else {
            let requested = [
                (directive.child_of.is_some(), ParameterFlag::Child),
                (directive.bold, ParameterFlag::BoldName),
                (directive.unique, ParameterFlag::Unique),
                (directive.hidden, ParameterFlag::Hidden),
            ];
            for (wanted, flag) in requested {
                if wanted {
                    flags.insert(flag);
                }
            }
        }
        Ok(flags)
    }

    fn create(&mut self, directive: &Directive, cell: &Cell, warnings: &mut Vec<Warning>) -> Result<()> {
        let kind = match &directive.type_name {
            Some(type_name) => ParameterType::from_type_name(type_name)
                .ok_or_else(|| GsmParamError::UnknownParameterType(type_name.clone()))?,
            None => {
                let (kind, fallback) = infer_type(&directive.name);
                if fallback {
                    raise(warnings, Warning::InferredFallback {
                        name: directive.name.clone(),
                    });
                }
                kind
            }
        };
        let placement = self.placement(directive)?;
        let flags = self.flags(directive)?;

        let mut parameter = Parameter::new(kind, directive.name.clone()).with_flags(flags.iter());
        match kind.value_kind() {
            ValueKind::Structural | ValueKind::Comment => (),
            ValueKind::Payload if cell.is_blank() => (),
            _ => match directive.first_dimension {
                Some(row) => {
                    let path = CellPath {
                        row,
                        column: directive.second_dimension,
                    };
                    parameter.write_at(path, cell.positional_value(directive))?;
                }
                None => {
                    parameter.set_value(cell.whole_value())?;
                }
            },
        }
        if let Some(description) = &directive.description {
            parameter.set_description(description.clone());
        }

        let name = parameter.name().to_string();
        if !self.place(placement, parameter, warnings)? {
            return Ok(());
        }
        let banner = self.settings.banner_for(&directive.name);
        if kind == ParameterType::Title && !self.collection.has_comment(&banner) {
            self.collection.insert_before(&name, Parameter::comment(banner))?;
        }
        Ok(())
    }

    fn create_banner(&mut self, directive: &Directive, warnings: &mut Vec<Warning>) -> Result<()> {
        let text = self.settings.banner_for(&directive.name);
        if self.collection.has_comment(&text) {
            debug!(comment = %text.trim(), "banner already present");
            return Ok(());
        }
        let placement = self.placement(directive)?;
        self.place(placement, Parameter::comment(text), warnings)?;
        Ok(())
    }

    /// Inserts the parameter, returning false when a child insert was refused.
    fn place(&mut self, placement: Placement, mut parameter: Parameter, warnings: &mut Vec<Warning>) -> Result<bool> {
        match placement {
            Placement::Child(target) => {
                let inserted = self.collection.insert_as_child(target, parameter)?;
                if !inserted {
                    raise(warnings, Warning::ChildTargetNotTitle {
                        target: target.to_string(),
                    });
                }
                Ok(inserted)
            }
            Placement::After(target) => {
                if self
                    .collection
                    .next_after(target)
                    .is_some_and(|next| next.has_flag(ParameterFlag::Child))
                {
                    parameter.set_flag(ParameterFlag::Child, true);
                }
                self.collection.insert_after(target, parameter)?;
                Ok(true)
            }
            Placement::FrontOf(target) => {
                if self
                    .collection
                    .by_name(target)
                    .is_some_and(|found| found.has_flag(ParameterFlag::Child))
                {
                    parameter.set_flag(ParameterFlag::Child, true);
                }
                self.collection.insert_before(target, parameter)?;
                Ok(true)
            }
            Placement::Append => {
                self.collection.append(parameter)?;
                Ok(true)
            }
        }
    }
}

fn raise(warnings: &mut Vec<Warning>, warning: Warning) {
    warn!("{}", warning);
    warnings.push(warning);
}
