//! Section identification for help pages.

use cdo_schema_core::{Section, SectionMap};

use super::PATTERNS;

/// Splits a help page into its recognized sections.
///
/// A header is one of the six section tokens alone on a line, starting at
/// column zero (trailing whitespace allowed). Each body runs to the next
/// header or the end of text, with surrounding blank lines removed. A
/// repeated header replaces the earlier body. Text before the first header
/// is dropped.
pub fn split_sections(help_text: &str) -> SectionMap {
    let mut sections = SectionMap::new();
    let mut current: Option<Section> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in help_text.lines() {
        if let Some(section) = header_of(line) {
            if let Some(previous) = current.take() {
                sections.insert(previous, trim_blank_lines(&body));
            }
            current = Some(section);
            body.clear();
            continue;
        }
        if current.is_some() {
            body.push(line);
        }
    }

    if let Some(previous) = current {
        sections.insert(previous, trim_blank_lines(&body));
    }

    sections
}

fn header_of(line: &str) -> Option<Section> {
    let caps = PATTERNS.section_header.captures(line)?;
    Section::from_header(caps.get(1)?.as_str())
}

fn trim_blank_lines(lines: &[&str]) -> String {
    let is_blank = |line: &&str| line.trim().is_empty();
    let start = lines.iter().position(|l| !is_blank(l)).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !is_blank(l)).map_or(start, |idx| idx + 1);
    lines[start..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_present_sections_only() {
        let help = "NAME\n    info - Information\n\nSYNOPSIS\n    info  infiles\n\n";
        let sections = split_sections(help);
        assert_eq!(sections.get(Section::Name), Some("    info - Information"));
        assert_eq!(sections.get(Section::Synopsis), Some("    info  infiles"));
        assert!(!sections.contains(Section::Parameter));
        assert!(!sections.contains(Section::Description));
    }

    #[test]
    fn test_arbitrary_order_round_trips() {
        let bodies = [
            (Section::Parameter, "    p  INT  a number"),
            (Section::Environment, "    CDO_FOO  something"),
            (Section::Name, "    x - y"),
        ];
        let mut text = String::new();
        for (section, body) in &bodies {
            text.push_str(&format!("{}\n\n{body}\n\n", section.header()));
        }

        let sections = split_sections(&text);
        assert_eq!(sections.len(), bodies.len());
        for (section, body) in &bodies {
            assert_eq!(sections.get(*section), Some(*body));
        }
    }

    #[test]
    fn test_header_must_be_alone_and_exact() {
        let help = "NAME\n    a\nSynopsis\n  NAME\nNAME of thing\nOPERATORS   \n    b  c\n";
        let sections = split_sections(help);
        assert_eq!(
            sections.get(Section::Name),
            Some("    a\nSynopsis\n  NAME\nNAME of thing")
        );
        assert_eq!(sections.get(Section::Operators), Some("    b  c"));
    }

    #[test]
    fn test_repeated_header_last_wins() {
        let sections = split_sections("NAME\nfirst\nNAME\nsecond\n");
        assert_eq!(sections.get(Section::Name), Some("second"));
    }

    #[test]
    fn test_empty_section_body() {
        let sections = split_sections("NAME\n\nSYNOPSIS\n");
        assert_eq!(sections.get(Section::Name), Some(""));
        assert_eq!(sections.get(Section::Synopsis), Some(""));
    }
}
