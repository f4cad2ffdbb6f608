use cdo_schema_core::CallSpec;
use tracing::debug;

use super::PATTERNS;

/// Parses a `SYNOPSIS` section body into call specs.
///
/// Each line is `operator[,required...][,[optional,...]]  io-tokens...`.
/// Bracketed groups contribute optional parameters in left-to-right order;
/// the remaining comma-separated tokens are the operator followed by the
/// required parameters. With two or more I/O tokens the last one is the
/// output; otherwise every token is an input. Blank lines, `#` comments and
/// lines outside the grammar are skipped.
pub fn parse_synopsis(block: &str) -> Vec<CallSpec> {
    block.lines().filter_map(parse_synopsis_line).collect()
}

fn parse_synopsis_line(line: &str) -> Option<CallSpec> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let Some(caps) = PATTERNS.synopsis_line.captures(line) else {
        debug!(line, "Skipping unparsable synopsis line");
        return None;
    };
    let op_and_params = caps.get(1)?.as_str();
    let io_part = caps.get(2)?.as_str();

    let optional_params = PATTERNS
        .optional_group
        .captures_iter(op_and_params)
        .filter_map(|group| group.get(1))
        .flat_map(|group| group.as_str().split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect::<Vec<_>>();

    let required_part = PATTERNS.optional_group.replace_all(op_and_params, "");
    let mut parts = required_part.split(',').filter(|part| !part.is_empty());
    let Some(operator) = parts.next() else {
        debug!(line, "Synopsis line has no operator token");
        return None;
    };

    let mut spec = CallSpec::new(operator);
    spec.required_params = parts.map(String::from).collect();
    spec.optional_params = optional_params;

    let mut io_tokens = io_part.split_whitespace().collect::<Vec<_>>();
    if io_tokens.len() >= 2 {
        let output = io_tokens.pop();
        spec = spec.with_outputs(output);
    }
    Some(spec.with_inputs(io_tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_optional_and_io_tokens() {
        let specs = parse_synopsis("foo,p1,[flag] in1 in2 out");
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.operator, "foo");
        assert_eq!(spec.required_params, vec!["p1"]);
        assert_eq!(spec.optional_params, vec!["flag"]);
        assert_eq!(spec.input_count(), 2);
        assert_eq!(spec.output_count(), 1);
        assert!(!spec.is_template);
    }

    #[test]
    fn test_optional_groups_keep_order() {
        let specs = parse_synopsis("    op,a,[b,c],d,[e]  infile outfile");
        let spec = &specs[0];
        assert_eq!(spec.required_params, vec!["a", "d"]);
        assert_eq!(spec.optional_params, vec!["b", "c", "e"]);
    }

    #[test]
    fn test_single_io_token_is_input() {
        let specs = parse_synopsis("    info  infiles");
        assert_eq!(specs[0].input_tokens, vec!["infiles"]);
        assert_eq!(specs[0].output_count(), 0);
    }

    #[test]
    fn test_template_line() {
        let specs = parse_synopsis("    <operator>,p1  infile outfile");
        assert!(specs[0].is_template);
        assert_eq!(specs[0].required_params, vec!["p1"]);
    }

    #[test]
    fn test_skips_comments_blank_and_malformed_lines() {
        let block = "\
# comment line

    lonelytoken
    bad-token!  infile
    [opt]  infile
    ok  infile outfile
";
        let specs = parse_synopsis(block);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].operator, "ok");
    }

    #[test]
    fn test_multiple_call_shapes() {
        let block = "    selname,names  infile outfile\n    selcode,codes  infile outfile\n";
        let names: Vec<_> = parse_synopsis(block)
            .into_iter()
            .map(|spec| spec.operator)
            .collect();
        assert_eq!(names, vec!["selname", "selcode"]);
    }
}
