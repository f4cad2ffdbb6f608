use cdo_schema_core::{ParamMeta, ParamType, ParameterSpec};
use tracing::debug;

use super::PATTERNS;

/// Parses a `PARAMETER` section body.
///
/// Each line is `NAME  TYPE  DESCRIPTION`. Unknown type tokens map to
/// [`ParamType::String`]; lines that do not fit the grammar are skipped.
pub fn parse_parameters(block: &str) -> ParameterSpec {
    let mut params = ParameterSpec::new();
    for line in block.lines() {
        let Some(caps) = PATTERNS.param_line.captures(line) else {
            if !line.trim().is_empty() {
                debug!(line, "Skipping unparsable parameter line");
            }
            continue;
        };
        let ty = ParamType::from_token(&caps[2]);
        params.insert(&caps[1], ParamMeta::new(ty, caps[3].trim()));
    }
    params
}
