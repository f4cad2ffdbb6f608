//! Binding registry and the attachment driver.
//!
//! [`BindingRegistry`] maps operator names to [`Binding`]s and only ever
//! accepts the first binding for a name. [`attach_operators`] fetches each
//! operator's help page, parses it, synthesizes bindings and registers
//! them. Fetching and parsing run in parallel; registration happens
//! afterwards in listing order, so the first-writer-wins rule does not
//! depend on which worker finishes first.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use cdo_schema_core::validate_call_spec;

use crate::binding::Binding;
use crate::error::InvocationError;
use crate::invoker::Runner;
use crate::parser::parse_help_page;
use crate::report::AttachReport;

/// Operator bindings keyed by name.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: BTreeMap<String, Binding>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `binding` unless its operator is already bound.
    ///
    /// Returns `true` when the binding was added.
    pub fn register_if_absent(&mut self, binding: Binding) -> bool {
        if self.bindings.contains_key(binding.operator()) {
            return false;
        }
        self.bindings.insert(binding.operator().to_string(), binding);
        true
    }

    pub fn get(&self, operator: &str) -> Option<&Binding> {
        self.bindings.get(operator)
    }

    pub fn contains(&self, operator: &str) -> bool {
        self.bindings.contains_key(operator)
    }

    /// Bound operator names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }
}

/// Bindings synthesized from one help page, plus rejected-spec warnings.
#[derive(Debug, Clone, Default)]
pub struct PageBindings {
    pub bindings: Vec<Binding>,
    pub warnings: Vec<String>,
}

/// Parses one help page and synthesizes a binding per concrete call spec.
///
/// Specs that fail validation are left out with a warning.
pub fn synthesize_page(help_text: &str) -> PageBindings {
    let page = parse_help_page(help_text);
    let mut out = PageBindings::default();

    for spec in &page.concrete_specs {
        let errors = validate_call_spec(spec);
        if !errors.is_empty() {
            let detail = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            out.warnings
                .push(format!("rejected call spec for '{}': {detail}", spec.operator));
            continue;
        }
        out.bindings.push(Binding::synthesize(
            spec,
            &page.parameters,
            page.description(),
            &page.operator_docs,
        ));
    }

    out
}

/// Registers every binding synthesized from `help_text`.
pub fn attach_help_text(help_text: &str, registry: &mut BindingRegistry) -> AttachReport {
    let mut report = AttachReport::default();
    register_page(synthesize_page(help_text), registry, &mut report);
    report
}

fn register_page(page: PageBindings, registry: &mut BindingRegistry, report: &mut AttachReport) {
    for warning in page.warnings {
        warn!("{warning}");
        report.warnings.push(warning);
    }
    for binding in page.bindings {
        let operator = binding.operator().to_string();
        if registry.register_if_absent(binding) {
            report.attached.push(operator);
        } else {
            debug!(operator = %operator, "Operator already bound, keeping first binding");
            report.duplicates.push(operator);
        }
    }
}

/// Fetches, parses and attaches bindings for every operator in `operators`.
///
/// A failed help fetch is reported as one warning and that operator is
/// skipped; the run as a whole never fails. `jobs` caps the number of
/// parallel fetches (`None` = adaptive default).
pub fn attach_operators(
    operators: &[String],
    runner: &Runner,
    registry: &mut BindingRegistry,
    jobs: Option<usize>,
) -> AttachReport {
    let fetch_one = |operator: &String| -> (String, Result<PageBindings, InvocationError>) {
        let page = runner
            .operator_help(operator)
            .map(|help_text| synthesize_page(&help_text));
        (operator.clone(), page)
    };

    let jobs = jobs
        .filter(|jobs| *jobs > 0)
        .unwrap_or_else(|| default_parallel_jobs(operators.len()));

    // Results keep the input order, which fixes registration order.
    let results: Vec<(String, Result<PageBindings, InvocationError>)> =
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => {
                use rayon::prelude::*;
                pool.install(|| operators.par_iter().map(fetch_one).collect())
            }
            Err(err) => {
                debug!(error = %err, "Failed to build thread pool, fetching sequentially");
                operators.iter().map(fetch_one).collect()
            }
        };

    let mut report = AttachReport::default();
    for (operator, result) in results {
        match result {
            Ok(page) => register_page(page, registry, &mut report),
            Err(err) => {
                let warning = format!("could not attach operator '{operator}': {}", err.to_string().trim());
                warn!(operator = %operator, error = %err, "Could not attach operator");
                report.failed.push(operator);
                report.warnings.push(warning);
            }
        }
    }

    info!(
        operators = operators.len(),
        jobs,
        summary = %report.summary(),
        "Attached operator bindings"
    );
    report
}

fn default_parallel_jobs(operator_count: usize) -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    let adaptive_cap = if operator_count >= 500 { 8 } else { 12 };
    cpu_count.min(adaptive_cap).max(1).min(operator_count.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::CdoConfig;
    use crate::invoker::ProcessInvoker;

    const FAMILY_HELP: &str = "\
NAME
    sinfo, sinfon - Short information

SYNOPSIS
    <operator>  infiles

OPERATORS
    sinfo   Short information listed by parameter identifier
    sinfon  Short information listed by parameter name
";

    const OVERLAP_HELP: &str = "\
SYNOPSIS
    sinfo,extra  infiles

OPERATORS
    sinfo   A competing description
";

    struct HelpPages;

    impl ProcessInvoker for HelpPages {
        fn invoke(&self, argv: &[String]) -> Result<String, InvocationError> {
            match argv.last().map(String::as_str) {
                Some("sinfo") | Some("sinfon") => Ok(FAMILY_HELP.to_string()),
                Some("broken") => Err(InvocationError::NonZeroExit {
                    status: Some(1),
                    stderr: "cdo: operator not found".to_string(),
                }),
                _ => Ok(String::new()),
            }
        }
    }

    #[test]
    fn test_register_if_absent_first_writer_wins() {
        let mut registry = BindingRegistry::new();
        let first = attach_help_text(FAMILY_HELP, &mut registry);
        assert_eq!(first.attached, vec!["sinfo", "sinfon"]);

        let second = attach_help_text(OVERLAP_HELP, &mut registry);
        assert!(second.attached.is_empty());
        assert_eq!(second.duplicates, vec!["sinfo"]);

        assert_eq!(registry.len(), 2);
        let sinfo = registry.get("sinfo").unwrap();
        assert!(sinfo.spec().required_params.is_empty());
        assert!(sinfo.doc().starts_with("Short information listed by parameter identifier"));
    }

    #[test]
    fn test_attach_operators_tolerates_failures() {
        let runner = Runner::with_invoker(CdoConfig::default(), Arc::new(HelpPages));
        let names = ["broken", "sinfo", "sinfon"].map(String::from);
        let mut registry = BindingRegistry::new();

        let report = attach_operators(&names, &runner, &mut registry, Some(2));

        assert_eq!(registry.names(), vec!["sinfo", "sinfon"]);
        assert_eq!(report.failed, vec!["broken"]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("operator not found"));
        assert_eq!(report.attached, vec!["sinfo", "sinfon"]);
        assert_eq!(report.duplicates, vec!["sinfo", "sinfon"]);
    }

    #[test]
    fn test_invalid_spec_is_rejected_with_warning() {
        let help = "SYNOPSIS\n    dup,a,[a]  infile\n    fine  infile\n";
        let mut registry = BindingRegistry::new();
        let report = attach_help_text(help, &mut registry);
        assert_eq!(registry.names(), vec!["fine"]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("duplicate parameter: a"));
    }

    #[test]
    fn test_default_parallel_jobs_bounds() {
        assert_eq!(default_parallel_jobs(0), 1);
        assert_eq!(default_parallel_jobs(1), 1);
        assert!(default_parallel_jobs(1000) <= 8);
    }
}
