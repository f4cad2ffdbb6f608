//! Core operator schema types recovered from CDO help text.
//!
//! This crate defines the data model shared by the help-text parsers and the
//! binding synthesizer:
//!
//! - [`OperatorSummary`]: one row of the `--operators` listing (name,
//!   description, input/output arity, alias target).
//! - [`SectionMap`]: the named sections of one help page.
//! - [`ParameterSpec`]: declared parameters with their semantic
//!   [`ParamType`] and description.
//! - [`OperatorDocs`]: per-operator short/long descriptions from an inner
//!   `OPERATORS` section.
//! - [`CallSpec`] / [`ConcreteCallSpec`]: the call shape declared by a
//!   `SYNOPSIS` line, before and after template expansion.
//!
//! Validation ([`validate_call_spec`]) catches call shapes that cannot be
//! turned into a binding, such as duplicate parameters or a placeholder that
//! survived expansion.
//!
//! # Example
//!
//! ```
//! use cdo_schema_core::*;
//!
//! let spec = CallSpec::new("<operator>")
//!     .with_required("grid")
//!     .with_inputs(["infile"])
//!     .with_outputs(["outfile"]);
//! assert!(spec.is_template);
//!
//! let concrete = spec.instantiate("remapbil");
//! assert_eq!(concrete.operator, "remapbil");
//! assert_eq!(concrete.input_count(), 1);
//! assert!(validate_call_spec(&concrete).is_empty());
//! ```

mod types;
mod validate;

pub use types::*;
pub use validate::{RESERVED_PARAM_NAMES, ValidationError, validate_call_spec};
