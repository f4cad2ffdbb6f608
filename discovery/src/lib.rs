//! Operator discovery and binding synthesis for CDO.
//!
//! This crate turns the free-form help output of the `cdo` command-line tool
//! into callable operator bindings at start-up:
//!
//! 1. The `--operators` listing becomes an [`OperatorTable`](listing::OperatorTable).
//! 2. Each operator's `-h` page is split into sections and parsed into call
//!    specs ([`parser`]), expanding template pages that document a family of
//!    operators.
//! 3. Every concrete call spec becomes a [`Binding`](binding::Binding) with a
//!    signature, documentation and a formatter that builds the tool's
//!    command line.
//! 4. Bindings are registered first-writer-wins in a
//!    [`BindingRegistry`](registry::BindingRegistry).
//!
//! Parsing never fails: lines outside a section's grammar are skipped.
//! Operators whose help cannot be fetched are reported as warnings and
//! left unbound.
//!
//! # Main entry points
//!
//! - [`parse_help_text`]: parse and bind one saved help page offline.
//! - [`parser::parse_help_page`]: inspect every intermediate parse product.
//! - [`discover::Cdo::new`]: discover and bind every operator of an
//!   installed tool.
//!
//! # Example
//!
//! ```
//! use cdo_schema_discovery::binding::CallArgs;
//! use cdo_schema_discovery::parse_help_text;
//!
//! let help = "\
//! NAME
//!     remapbil - Bilinear interpolation
//!
//! SYNOPSIS
//!     remapbil,grid  infile outfile
//!
//! PARAMETER
//!     grid  STRING  Target grid description file or name
//! ";
//!
//! let registry = parse_help_text(help);
//! let remapbil = registry.get("remapbil").unwrap();
//! let request = remapbil
//!     .prepare(&CallArgs::new().arg("grid", "r360x180").infile("in.nc").outfile("out.nc"))
//!     .unwrap();
//! assert_eq!(request.operator.as_deref(), Some("remapbil,r360x180"));
//! ```

pub mod binding;
pub mod cache;
pub mod config;
pub mod discover;
pub mod docstring;
pub mod error;
pub mod invoker;
pub mod listing;
pub mod parser;
pub mod registry;
pub mod report;

pub use error::{BindingError, CdoError, ConfigError, InvocationError, Result};

use registry::{BindingRegistry, attach_help_text};

/// Parses one help page and returns a registry of its bindings.
///
/// No commands are executed.
pub fn parse_help_text(help_text: &str) -> BindingRegistry {
    let mut registry = BindingRegistry::new();
    attach_help_text(help_text, &mut registry);
    registry
}
