//! Call spec validation.
//!
//! Catches call shapes that cannot become a binding: an empty operator
//! name, a placeholder that survived template expansion, a parameter
//! declared twice, or a parameter that shadows a file argument.
//!
//! # Examples
//!
//! ```
//! use cdo_schema_core::*;
//!
//! let ok = CallSpec::new("selname").with_required("names").instantiate("selname");
//! assert!(validate_call_spec(&ok).is_empty());
//!
//! let dup = CallSpec::new("x").with_required("a").with_optional("a").instantiate("x");
//! assert_eq!(validate_call_spec(&dup), vec![ValidationError::DuplicateParameter("a".into())]);
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{ConcreteCallSpec, TEMPLATE_PLACEHOLDER};

/// Parameter names used by the input/output file arguments of a binding.
pub const RESERVED_PARAM_NAMES: &[&str] = &["infiles", "outfile"];

/// Structural problems in a [`ConcreteCallSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("operator name cannot be empty")]
    EmptyOperatorName,
    #[error("template placeholder was not expanded")]
    UnexpandedTemplate,
    #[error("parameter name cannot be empty")]
    EmptyParameterName,
    #[error("duplicate parameter: {0}")]
    DuplicateParameter(String),
    /// Parameter collides with a file argument name.
    #[error("parameter shadows a file argument: {0}")]
    ReservedParameter(String),
}

/// Validates one concrete call spec, returning every problem found.
pub fn validate_call_spec(spec: &ConcreteCallSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let operator = spec.operator.trim();
    if operator.is_empty() {
        errors.push(ValidationError::EmptyOperatorName);
    } else if operator.contains(TEMPLATE_PLACEHOLDER) {
        errors.push(ValidationError::UnexpandedTemplate);
    }

    let mut seen = HashSet::new();
    for name in spec.param_names() {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyParameterName);
            continue;
        }
        if RESERVED_PARAM_NAMES.contains(&name) {
            errors.push(ValidationError::ReservedParameter(name.to_string()));
        }
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateParameter(name.to_string()));
        }
    }

    errors
}
