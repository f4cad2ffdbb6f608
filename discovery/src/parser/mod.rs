//! Help page parser for CDO operator documentation.
//!
//! A help page (`cdo -h <operator>`) is free text with a handful of
//! section headers, each alone on its own line. Parsing runs in stages:
//!
//! 1. [`split_sections`] cuts the page into a [`SectionMap`].
//! 2. [`parse_parameters`] reads the `PARAMETER` table.
//! 3. [`parse_operator_docs`] reads an inner `OPERATORS` list, present when
//!    one page documents a family of operators.
//! 4. [`parse_synopsis`] turns each `SYNOPSIS` line into a [`CallSpec`].
//! 5. [`expand_templates`] replaces `<operator>` specs with one concrete
//!    spec per family member.
//!
//! Every stage is forgiving: lines that do not match their grammar are
//! skipped, never reported as errors. The format is owned by the tool and
//! has no stability guarantee.
//!
//! The usual entry point is [`parse_help_page`].

mod operators;
mod parameters;
mod sections;
mod synopsis;
mod template;

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use cdo_schema_core::{
    CallSpec, ConcreteCallSpec, OperatorDocs, ParameterSpec, Section, SectionMap,
};

pub use operators::parse_operator_docs;
pub use parameters::parse_parameters;
pub use sections::split_sections;
pub use synopsis::parse_synopsis;
pub use template::{expand_templates, name_section_operators, template_candidates};

/// Regex patterns for the help page grammars.
static PATTERNS: LazyLock<HelpPatterns> = LazyLock::new(HelpPatterns::new);

struct HelpPatterns {
    section_header: Regex,
    param_line: Regex,
    operator_line: Regex,
    synopsis_line: Regex,
    optional_group: Regex,
}

impl HelpPatterns {
    fn new() -> Self {
        // All regexes here are compile-time constants. An expect() failure indicates
        // a programmer error in the pattern, not a runtime condition.
        Self {
            section_header: Regex::new(
                r"^(NAME|SYNOPSIS|DESCRIPTION|OPERATORS|PARAMETER|ENVIRONMENT)\s*$",
            )
            .expect("static regex must compile"),
            // name  TYPE  description
            param_line: Regex::new(r"^\s*([a-zA-Z0-9_]+)\s+([A-Z]+)\s+(.*\S)\s*$")
                .expect("static regex must compile"),
            // name  (two or more spaces)  short description
            operator_line: Regex::new(r"(?i)^\s*([a-z0-9_]+)\s{2,}(.+)$")
                .expect("static regex must compile"),
            // op,p1,[o1]  infile outfile
            synopsis_line: Regex::new(r"^\s*([a-zA-Z0-9_<>,\[\]]+)\s+(.+)$")
                .expect("static regex must compile"),
            optional_group: Regex::new(r"\[([^\]]+)\]").expect("static regex must compile"),
        }
    }
}

/// Every intermediate product of parsing one help page.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct HelpPage {
    pub sections: SectionMap,
    pub parameters: ParameterSpec,
    pub operator_docs: OperatorDocs,
    /// Call specs as declared, templates included.
    pub call_specs: Vec<CallSpec>,
    /// Call specs after template expansion.
    pub concrete_specs: Vec<ConcreteCallSpec>,
}

impl HelpPage {
    /// Body of the `DESCRIPTION` section, or `""`.
    pub fn description(&self) -> &str {
        self.sections.body(Section::Description)
    }
}

/// Runs the full parse pipeline over one help page.
///
/// # Examples
///
/// ```
/// use cdo_schema_discovery::parser::parse_help_page;
///
/// let help = "\
/// NAME
///     sinfo, sinfon - Dataset information
///
/// SYNOPSIS
///     <operator>  infiles
///
/// OPERATORS
///     sinfo   Short information listed by parameter identifier
///     sinfon  Short information listed by parameter name
/// ";
///
/// let page = parse_help_page(help);
/// let names: Vec<_> = page.concrete_specs.iter().map(|s| s.operator.as_str()).collect();
/// assert_eq!(names, ["sinfo", "sinfon"]);
/// ```
pub fn parse_help_page(help_text: &str) -> HelpPage {
    let sections = split_sections(help_text);
    let parameters = parse_parameters(sections.body(Section::Parameter));
    let operator_docs = parse_operator_docs(sections.body(Section::Operators));
    let call_specs = parse_synopsis(sections.body(Section::Synopsis));

    let candidates = if call_specs.iter().any(|spec| spec.is_template) {
        template_candidates(&operator_docs, sections.body(Section::Name))
    } else {
        Vec::new()
    };
    let concrete_specs = expand_templates(&call_specs, &candidates);

    debug!(
        sections = sections.len(),
        parameters = parameters.len(),
        operator_docs = operator_docs.len(),
        call_specs = call_specs.len(),
        concrete_specs = concrete_specs.len(),
        "Parsed help page"
    );

    HelpPage {
        sections,
        parameters,
        operator_docs,
        call_specs,
        concrete_specs,
    }
}
