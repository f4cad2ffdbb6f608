//! Template expansion for help pages that document operator families.

use cdo_schema_core::{CallSpec, ConcreteCallSpec, OperatorDocs};
use tracing::debug;

/// Concrete operator names for a template page.
///
/// Prefers the names of the page's `OPERATORS` entries. When there are none,
/// falls back to [`name_section_operators`].
pub fn template_candidates(docs: &OperatorDocs, name_section: &str) -> Vec<String> {
    if !docs.is_empty() {
        return docs.names();
    }
    name_section_operators(name_section)
}

/// Extracts operator names from a `NAME` line such as
/// `sinfo, sinfon - Short information`.
///
/// Uses the first line containing both a comma and a hyphen; the text left
/// of the first hyphen is split on commas.
pub fn name_section_operators(name_section: &str) -> Vec<String> {
    let Some(line) = name_section
        .lines()
        .find(|line| line.contains(',') && line.contains('-'))
    else {
        return Vec::new();
    };
    let left = line.split_once('-').map_or(line, |(left, _)| left);
    left.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Expands template specs into one concrete spec per candidate name.
///
/// Non-template specs pass through unchanged. A template with no candidate
/// names expands to nothing.
pub fn expand_templates(specs: &[CallSpec], candidates: &[String]) -> Vec<ConcreteCallSpec> {
    let mut expanded = Vec::new();
    for spec in specs {
        if !spec.is_template {
            expanded.extend(spec.clone().into_concrete());
            continue;
        }
        if candidates.is_empty() {
            debug!("Template synopsis has no candidate operator names");
        }
        expanded.extend(candidates.iter().map(|name| spec.instantiate(name)));
    }
    expanded
}
