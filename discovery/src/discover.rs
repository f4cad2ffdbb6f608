//! Operator discovery and the [`Cdo`] facade.
//!
//! [`Cdo::new`] lists the tool's operators, fetches every help page,
//! and binds each documented operator. Afterwards operators are called by
//! name with [`Cdo::call`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::binding::{Binding, CallArgs};
use crate::cache;
use crate::config::CdoConfig;
use crate::error::{CdoError, Result};
use crate::invoker::{ProcessInvoker, RunRequest, Runner, SystemInvoker};
use crate::listing::OperatorTable;
use crate::registry::{BindingRegistry, attach_operators};
use crate::report::AttachReport;

/// Bound operators of one tool installation.
#[derive(Debug)]
pub struct Cdo {
    runner: Runner,
    table: OperatorTable,
    registry: BindingRegistry,
    report: AttachReport,
}

impl Cdo {
    /// Discovers and binds operators by running the configured executable.
    ///
    /// Fails only when the operator listing itself cannot be produced;
    /// individual operators that fail are skipped and reported.
    pub fn new(config: CdoConfig) -> Result<Self> {
        let timeout = config.timeout_ms.map(std::time::Duration::from_millis);
        Self::with_invoker(config, Arc::new(SystemInvoker::new(timeout)))
    }

    /// Like [`new`](Self::new), running every command through `invoker`.
    pub fn with_invoker(config: CdoConfig, invoker: Arc<dyn ProcessInvoker>) -> Result<Self> {
        let runner = Runner::with_invoker(config.clone(), Arc::clone(&invoker));

        let cache = cache::open_for_config(&config, Arc::clone(&invoker));
        let discovery_runner = match &cache {
            Some(cache) => Runner::with_invoker(config.clone(), cache.clone()),
            None => runner.clone(),
        };

        let listing = discovery_runner.operators_listing()?;
        let table = OperatorTable::parse(&listing);
        info!(operators = table.len(), "Loaded operator table");

        let mut registry = BindingRegistry::new();
        let report = attach_operators(&table.names(), &discovery_runner, &mut registry, config.jobs);

        if let Some(cache) = cache
            && let Err(err) = cache.flush()
        {
            warn!(error = %err, "Failed to write help cache");
        }

        Ok(Self {
            runner,
            table,
            registry,
            report,
        })
    }

    /// Operator names from the listing, sorted.
    pub fn list_operators(&self) -> Vec<String> {
        self.table.names()
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.table
    }

    pub fn bindings(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn binding(&self, operator: &str) -> Option<&Binding> {
        self.registry.get(operator)
    }

    /// Outcome of the attachment run performed at construction.
    pub fn report(&self) -> &AttachReport {
        &self.report
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Calls a bound operator, returning captured stdout.
    pub fn call(&self, operator: &str, args: &CallArgs) -> Result<String> {
        let binding = self
            .binding(operator)
            .ok_or_else(|| CdoError::UnknownOperator(operator.to_string()))?;
        Ok(binding.call(&self.runner, args)?)
    }

    /// Runs an arbitrary request without going through a binding.
    pub fn run(&self, request: &RunRequest) -> Result<String> {
        Ok(self.runner.run(request)?)
    }
}
