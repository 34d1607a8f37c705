use std::fs;
use std::path::{Path, PathBuf};

// command line parsing
use clap::{Parser, Subcommand};
// the directives file is a JSON list of cells
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// our own stuff that we need

use gsmparam::collection::ParameterCollection;
use gsmparam::datatype::{ParameterType, RawValue};
use gsmparam::directive::{Cell, Engine};
use gsmparam::library::{LibraryPart, PartRegistry};
use gsmparam::node::{parse_document, Element};
use gsmparam::settings::Settings;
use gsmparam::{GsmParamError, Result};

#[derive(Parser, Debug)]
#[command(name = "gsmparam", version, about = "Edit the parameters of GSM library parts")]
struct Cli {
    /// Settings file (toml, yaml or json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a JSON list of directives to a parameter section or library part
    Apply {
        document: PathBuf,
        directives: PathBuf,
        /// Where to write the result, defaults to overwriting the document
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the cell identifiers of all parameters of one type
    Ids {
        document: PathBuf,
        type_name: String,
        #[arg(long)]
        name: Option<String>,
    },
}

/// One entry of the directives file.
#[derive(Deserialize, Debug)]
struct CellRecord {
    directive: String,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    table: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    row: Option<usize>,
    #[serde(default)]
    column: Option<usize>,
}
impl CellRecord {
    fn into_cell(self) -> Cell {
        let text = |v: &serde_json::Value| match RawValue::from_json(v) {
            RawValue::Text(text) => text,
            other => format!("{:?}", other),
        };
        Cell {
            directive: self.directive,
            value: RawValue::from_json(&self.value),
            table: self
                .table
                .map(|rows| rows.iter().map(|row| row.iter().map(text).collect()).collect()),
            row: self.row,
            column: self.column,
        }
    }
}

/// A loaded document: either a bare ParamSection or a whole library part.
struct Loaded {
    root: Element,
    part: Option<LibraryPart>,
    parameters: ParameterCollection,
}

fn load(path: &Path) -> Result<Loaded> {
    let text = fs::read_to_string(path)?;
    let root = parse_document(&text)?;
    if root.tag == "ParamSection" {
        let parameters = ParameterCollection::from_node(&root)?;
        return Ok(Loaded { root, part: None, parameters });
    }
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let part = LibraryPart::from_node(name, &root)?;
    let parameters = part.parameters().clone();
    Ok(Loaded {
        root,
        part: Some(part),
        parameters,
    })
}

fn apply(settings: Settings, document: &Path, directives: &Path, output: Option<&Path>) -> Result<()> {
    let mut loaded = load(document)?;
    let records = fs::read_to_string(directives)?;
    let records: Vec<CellRecord> = serde_json::from_str(&records)
        .map_err(|e| GsmParamError::MalformedDocument(format!("{}: {}", directives.display(), e)))?;
    let cells: Vec<Cell> = records.into_iter().map(CellRecord::into_cell).collect();

    let report_unused = settings.report_unused;
    let report = Engine::with_settings(&mut loaded.parameters, settings).execute_all(&cells);
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    for failure in &report.failures {
        println!("failed: {}", failure);
    }

    let section = loaded.parameters.to_node();
    let written = match loaded.part.take() {
        Some(part) => {
            if report_unused {
                let part = part.with_parameters(loaded.parameters.clone());
                let mut registry = PartRegistry::new();
                registry.register(part.clone());
                for unused in part.unused_parameters(&registry) {
                    println!("unused: {}", unused);
                }
            }
            let mut root = loaded.root;
            root.replace_child("ParamSection", section);
            root.to_document()
        }
        None => section.to_document(),
    };
    let target = output.unwrap_or(document);
    fs::write(target, written)?;
    info!(path = %target.display(), applied = report.applied, "written");
    Ok(())
}

fn ids(document: &Path, type_name: &str, name: Option<&str>) -> Result<()> {
    let kind = ParameterType::from_type_name(type_name)
        .ok_or_else(|| GsmParamError::UnknownParameterType(type_name.to_string()))?;
    let loaded = load(document)?;
    for identifier in loaded.parameters.identifiers_by_type(kind, name, None)? {
        println!("{}", identifier);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)))
        .init();

    let outcome = match &cli.command {
        Command::Apply {
            document,
            directives,
            output,
        } => apply(settings, document, directives, output.as_deref()),
        Command::Ids {
            document,
            type_name,
            name,
        } => ids(document, type_name, name.as_deref()),
    };
    if let Err(e) = outcome {
        error!(error = %e, "gsmparam failed");
        std::process::exit(1);
    }
}
