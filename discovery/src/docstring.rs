//! Human-readable documentation for synthesized bindings.

use cdo_schema_core::{ConcreteCallSpec, OperatorDocs, ParamType, ParameterSpec};

/// Builds the documentation text for one concrete operator.
///
/// Layout: summary line, first `DESCRIPTION` paragraph, a `Parameters`
/// listing in call order, a `Returns` block, and `Notes` carrying the
/// operator's long-form documentation when there is any. Missing inputs
/// fall back to generic text; this never fails.
///
/// # Examples
///
/// ```
/// use cdo_schema_core::{CallSpec, OperatorDocs, ParameterSpec};
/// use cdo_schema_discovery::docstring::build_docstring;
///
/// let spec = CallSpec::new("info").with_inputs(["infiles"]).instantiate("info");
/// let doc = build_docstring("info", &spec, &ParameterSpec::new(), "", &OperatorDocs::new());
/// assert!(doc.starts_with("CDO operator 'info'"));
/// assert!(doc.contains("infiles : string or sequence of string"));
/// ```
pub fn build_docstring(
    operator: &str,
    spec: &ConcreteCallSpec,
    params: &ParameterSpec,
    description: &str,
    docs: &OperatorDocs,
) -> String {
    let op_doc = docs.get(operator);
    let summary = op_doc
        .map(|doc| doc.short.as_str())
        .filter(|short| !short.is_empty())
        .map_or_else(|| format!("CDO operator '{operator}'"), String::from);

    let mut lines = vec![summary, String::new()];

    let paragraph = first_paragraph(description);
    if !paragraph.is_empty() {
        lines.push(paragraph);
        lines.push(String::new());
    }

    lines.push("Parameters".to_string());
    lines.push("----------".to_string());
    for name in &spec.required_params {
        let (ty, desc) = params.get(name).map_or_else(
            || (ParamType::String, format!("{name} parameter.")),
            |meta| (meta.ty, meta.description.clone()),
        );
        lines.push(format!("{name} : {ty}"));
        lines.push(format!("    {desc}"));
    }
    for name in &spec.optional_params {
        let (ty, desc) = params.get(name).map_or_else(
            || (ParamType::Bool, format!("Optional flag {name}.")),
            |meta| (meta.ty, meta.description.clone()),
        );
        let default_note = if ty == ParamType::Bool {
            " (default: false)"
        } else {
            ""
        };
        lines.push(format!("{name} : {ty}, optional{default_note}"));
        lines.push(format!("    {desc}"));
    }
    if spec.takes_inputs() {
        lines.push("infiles : string or sequence of string".to_string());
        lines.push("    Input file(s); path or list of paths.".to_string());
    }
    if spec.takes_output() {
        lines.push("outfile : string".to_string());
        lines.push("    Output file path.".to_string());
    }
    lines.push("overrides : mapping, optional".to_string());
    lines.push(
        "    Execution overrides forwarded to the runner (e.g. options=\"-f nc4\").".to_string(),
    );

    lines.push(String::new());
    lines.push("Returns".to_string());
    lines.push("-------".to_string());
    lines.push("string".to_string());
    lines.push("    Captured CDO textual output (if any).".to_string());

    let long_body = op_doc.map(|doc| doc.long_text()).unwrap_or_default();
    if !long_body.is_empty() {
        lines.push(String::new());
        lines.push("Notes".to_string());
        lines.push("-----".to_string());
        lines.push(long_body);
    }

    lines.join("\n")
}

/// First blank-line separated paragraph, folded onto one line.
fn first_paragraph(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .skip_while(|line| line.is_empty())
        .take_while(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdo_schema_core::{CallSpec, OperatorDoc, ParamMeta};

    fn spec() -> ConcreteCallSpec {
        CallSpec::new("remapbil")
            .with_required("grid")
            .with_optional("map3d")
            .with_optional("nlev")
            .with_inputs(["infile"])
            .with_outputs(["outfile"])
            .into_concrete()
            .unwrap()
    }

    #[test]
    fn test_full_docstring() {
        let mut params = ParameterSpec::new();
        params.insert("grid", ParamMeta::new(ParamType::String, "Target grid"));
        params.insert("nlev", ParamMeta::new(ParamType::Int, "Number of levels"));

        let mut docs = OperatorDocs::new();
        let mut doc = OperatorDoc::new("remapbil", "Bilinear interpolation");
        doc.long_lines = vec!["Works on curvilinear grids.".into(), String::new()];
        docs.insert(doc);

        let description = "    Interpolates fields\n    between grids.\n\n    Second paragraph.";
        let text = build_docstring("remapbil", &spec(), &params, description, &docs);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Bilinear interpolation");
        assert_eq!(lines[2], "Interpolates fields between grids.");
        assert!(!text.contains("Second paragraph"));
        assert!(text.contains("grid : string\n    Target grid"));
        assert!(text.contains("map3d : bool, optional (default: false)\n    Optional flag map3d."));
        assert!(text.contains("nlev : int, optional\n    Number of levels"));
        assert!(text.contains("infiles : string or sequence of string"));
        assert!(text.contains("outfile : string"));
        assert!(text.ends_with("Notes\n-----\nWorks on curvilinear grids."));

        let grid = text.find("grid : ").unwrap();
        let map3d = text.find("map3d : ").unwrap();
        let infiles = text.find("infiles : ").unwrap();
        assert!(grid < map3d && map3d < infiles);
    }

    #[test]
    fn test_fallbacks_never_fail() {
        let spec = CallSpec::new("x").with_required("p").instantiate("x");
        let text = build_docstring("x", &spec, &ParameterSpec::new(), "", &OperatorDocs::new());
        assert!(text.starts_with("CDO operator 'x'\n\nParameters"));
        assert!(text.contains("p : string\n    p parameter."));
        assert!(!text.contains("infiles"));
        assert!(!text.contains("outfile"));
        assert!(!text.contains("Notes"));
    }

    #[test]
    fn test_first_paragraph_skips_leading_blank_lines() {
        assert_eq!(first_paragraph("\n\n  a\n  b\n\n  c"), "a b");
        assert_eq!(first_paragraph(""), "");
    }
}
