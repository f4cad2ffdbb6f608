//! Operator table built from the `--operators` listing.
//!
//! Each listing line has the shape `NAME [DESCRIPTION] (IN|OUT)`, where the
//! arities are integers and may be negative. A description containing
//! `--> TARGET` marks an alias. Lines outside this grammar are skipped.
//!
//! # Example
//!
//! ```
//! use cdo_schema_discovery::listing::OperatorTable;
//!
//! let listing = "\
//! sinfo            Short information listed by parameter id   (-1|0)
//! seltimestep      Select timesteps                           (1|1)
//! selstep          Select timesteps --> seltimestep           (1|1)
//! ";
//!
//! let table = OperatorTable::parse(listing);
//! assert_eq!(table.names(), ["selstep", "seltimestep", "sinfo"]);
//! assert_eq!(table.get("sinfo").map(|op| op.inputs), Some(-1));
//! assert_eq!(table.aliases().count(), 1);
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use cdo_schema_core::OperatorSummary;

static LISTING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)(?:\s+(.*?))?\s*\(([-\d]+)\|([-\d]+)\)\s*$")
        .expect("static regex must compile")
});

static ALIAS_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-->\s*(\S+)").expect("static regex must compile"));

/// Operator summaries keyed and ordered by name.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct OperatorTable {
    operators: BTreeMap<String, OperatorSummary>,
}

impl OperatorTable {
    /// Parses the full listing text. A repeated name keeps its last line.
    pub fn parse(listing: &str) -> Self {
        let mut operators = BTreeMap::new();
        for line in listing.lines() {
            if let Some(summary) = parse_listing_line(line) {
                operators.insert(summary.name.clone(), summary);
            }
        }
        debug!(operators = operators.len(), "Parsed operator listing");
        Self { operators }
    }

    /// Operator names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.operators.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&OperatorSummary> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &OperatorSummary> {
        self.operators.values().filter(|summary| summary.is_alias)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperatorSummary> {
        self.operators.values()
    }
}

/// Parses one listing line, returning `None` when it does not fit the grammar.
pub fn parse_listing_line(raw_line: &str) -> Option<OperatorSummary> {
    let line = raw_line.trim_end();
    if line.is_empty() {
        return None;
    }
    let caps = LISTING_LINE.captures(line)?;

    let (Ok(inputs), Ok(outputs)) = (caps[3].parse::<i32>(), caps[4].parse::<i32>()) else {
        debug!(line, "Skipping listing line with malformed arity");
        return None;
    };

    let mut summary = OperatorSummary::new(&caps[1], inputs, outputs);
    let description = caps.get(2).map_or("", |m| m.as_str()).trim_end();
    if !description.is_empty() {
        summary = summary.with_description(description);
    }
    if let Some(target) = ALIAS_TARGET.captures(description).and_then(|c| c.get(1)) {
        summary = summary.with_alias_target(target.as_str());
    }
    Some(summary)
}
