use cdo_schema_core::{OperatorDoc, OperatorDocs};

use super::PATTERNS;

/// Maximum indentation removed from continuation lines.
const CONTINUATION_INDENT: usize = 8;

/// Parses an inner `OPERATORS` section body.
///
/// A line `name  short description` (two or more spaces between the
/// columns) opens an entry. Other non-blank lines continue the open entry's
/// long description; blank lines add an empty continuation so paragraph
/// breaks survive. Lines before the first entry are dropped.
pub fn parse_operator_docs(block: &str) -> OperatorDocs {
    let mut docs = OperatorDocs::new();
    let mut current: Option<usize> = None;

    for line in block.lines() {
        if line.trim().is_empty() {
            if let Some(doc) = current.and_then(|idx| docs.get_index_mut(idx)) {
                doc.long_lines.push(String::new());
            }
            continue;
        }

        if let Some(caps) = PATTERNS.operator_line.captures(line) {
            let doc = OperatorDoc::new(&caps[1], caps[2].trim());
            current = Some(docs.insert(doc));
            continue;
        }

        if let Some(doc) = current.and_then(|idx| docs.get_index_mut(idx)) {
            doc.long_lines.push(strip_indent(line.trim_end()).to_string());
        }
    }

    docs
}

fn strip_indent(line: &str) -> &str {
    let cut = line
        .char_indices()
        .take(CONTINUATION_INDENT)
        .find(|(_, ch)| !ch.is_whitespace())
        .map_or_else(
            || {
                line.char_indices()
                    .nth(CONTINUATION_INDENT)
                    .map_or(line.len(), |(idx, _)| idx)
            },
            |(idx, _)| idx,
        );
    &line[cut..]
}
