//! swad2prado — convert SWAD question-bank exports into Moodle XML for PRADO
//!
//! A configurable [`Mapping`] says where questions, answers and correctness
//! flags live in the source document (as ElementTree-style path
//! expressions). The converter extracts [`Question`]s with it and writes a
//! Moodle quiz: one category entry followed by one `multichoice` entry per
//! question, with bodies as CDATA HTML.
//!
//! Basic example (no-run):
//!
//! ```rust,no_run
//! use std::path::Path;
//! use swad2prado::{ConvertOptions, convert_file, mapping};
//!
//! let mapping = mapping::resolve(None)?;
//! let options = ConvertOptions::new("$course$/top/Imported from SWAD");
//! convert_file(Path::new("swad.xml"), Path::new("prado.xml"), &mapping, &options)?;
//! # Ok::<(), swad2prado::ConvertError>(())
//! ```

pub mod convert;
pub mod element_path;
pub mod error;
pub mod extract;
pub mod mapping;
pub mod model;
pub mod moodle;
pub mod parser;
pub mod serialize;
pub mod xml_out;

pub use crate::convert::*;
pub use crate::error::*;
pub use crate::mapping::{Mapping, MappingOverride};
pub use crate::model::*;
pub use crate::parser::{parse_swad, parse_swad_from_file, parse_swad_from_reader};
