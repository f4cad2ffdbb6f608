//! Offline help page parsing example.
//!
//! Parses a captured `cdo -h` page for an operator family, prints the
//! bindings it yields and the command line each would run. No commands are
//! executed.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cdo-schema-discovery --example parse_help
//! ```

use cdo_schema_discovery::binding::CallArgs;
use cdo_schema_discovery::config::CdoConfig;
use cdo_schema_discovery::invoker::Runner;
use cdo_schema_discovery::parse_help_text;

fn main() {
    let help_text = r#"
NAME
    merstd, mermean - Meridional statistics

SYNOPSIS
    <operator>,[weights]  infile outfile

DESCRIPTION
    This module computes meridional statistical values of the input fields.
    Depending on the chosen operator the meridional minimum, maximum, range,
    sum, average, variance or standard deviation is written to outfile.

OPERATORS
    merstd   Meridional standard deviation
             For every latitude the standard deviation over all longitudes
             is computed.
    mermean  Meridional mean

PARAMETER
    weights  BOOL  weights=FALSE disables weighting by grid cell area
"#;

    let registry = parse_help_text(help_text);
    let runner = Runner::new(CdoConfig::default());

    println!("Bound {} operator(s)", registry.len());
    for binding in registry.iter() {
        println!();
        println!("{}", binding.signature_line());
        println!("{}", "=".repeat(binding.operator().len()));
        println!("{}", binding.doc());

        let args = CallArgs::new()
            .flag("weights")
            .infile("tas.nc")
            .outfile(&format!("tas_{}.nc", binding.operator()));
        match binding.prepare(&args) {
            Ok(request) => println!("\n$ {}", runner.command_line(&request).join(" ")),
            Err(err) => eprintln!("\nCannot prepare call: {err}"),
        }
    }
}
