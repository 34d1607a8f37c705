//! gsmparam – editing the parameters of GSM library parts.
//!
//! A library part document carries a *parameter section*: an ordered list of
//! typed, named parameters that the part's scripts read. This crate loads such
//! a section, lets it be changed programmatically or through spreadsheet
//! driven *directives*, and writes it back so that untouched parameters come
//! out byte for byte as they went in.
//!
//! The building blocks:
//! * A [`datatype::ParameterType`] is one of a closed set of types (lengths,
//!   angles, integers, pens, booleans, strings, titles, dictionaries, ...), each
//!   with its own coercion from text and canonical formatting.
//! * An [`array::ArrayStore`] holds 1-D or 2-D array values sparsely, 1-indexed
//!   and growing on write.
//! * A [`parameter::Parameter`] couples name, type, description, flags and value,
//!   and converts to and from its XML node.
//! * A [`collection::ParameterCollection`] keeps parameters in document order
//!   with a name index and the placement rules for titles and their children.
//!
//! ## Modules
//! * [`datatype`] – Parameter types, scalar values, coercion, formatting and
//!   type inference from naming conventions.
//! * [`array`] – Sparse array storage.
//! * [`parameter`] – The parameter entity and its node codec.
//! * [`collection`] – The ordered collection and the section round trip.
//! * [`directive`] – The directive grammar (`directive.pest`) and the
//!   [`directive::Engine`] applying directives to a collection.
//! * [`library`] – Library parts, the per-run registry and the "is this
//!   parameter used by any script" query.
//! * [`node`] – The document tree, its loader and its writer.
//! * [`settings`] – Configuration read from a file and the environment.
//!
//! ## Directives
//! A directive names a parameter and says what to do with it, e.g.
//! `xWidth -t Length -d Overall width -c Frame -b`. Existing parameters get
//! their value (or one array cell, with `-1`/`-2`) overwritten, missing ones
//! are created and placed. Every directive applies fully or not at all, and
//! applying the same directive twice changes nothing the second time.
//!
//! ## Quick Start
//! ```
//! use gsmparam::collection::ParameterCollection;
//! use gsmparam::directive::{Cell, Engine};
//! use gsmparam::parameter::ParameterFlag;
//! let mut parameters = ParameterCollection::new();
//! let mut engine = Engine::new(&mut parameters);
//! engine.execute(&Cell::new("Frame -t Title", "")).unwrap();
//! engine.execute(&Cell::new("xWidth -c Frame -d Overall width", "1.2")).unwrap();
//! let width = parameters.by_name("xWidth").unwrap();
//! assert!(width.has_flag(ParameterFlag::Child));
//! // banner comment, Title, xWidth
//! assert_eq!(parameters.len(), 3);
//! ```

// used for hashmaps and hashsets keyed by parameter and part names
use seahash::SeaHasher;
use std::hash::BuildHasherDefault;

pub mod array;
pub mod collection;
pub mod datatype;
pub mod directive;
pub mod error;
pub mod library;
pub mod node;
pub mod parameter;
pub mod settings;

pub use error::{GsmParamError, Result};

pub type NameHasher = BuildHasherDefault<SeaHasher>;
