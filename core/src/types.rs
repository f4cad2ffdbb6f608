//! Operator schema type definitions.
//!
//! This module defines the data model recovered from the operator listing
//! and from individual help pages. All types serialize with [`serde`] so
//! that parsed pages can be dumped as JSON for inspection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal operator token used by template synopsis lines.
pub const TEMPLATE_PLACEHOLDER: &str = "<operator>";

/// One record of the `--operators` listing.
///
/// `inputs` and `outputs` are carried exactly as printed. A negative value
/// is the tool's marker for a variable number of streams and is not
/// reinterpreted here.
///
/// # Examples
///
/// ```
/// use cdo_schema_core::OperatorSummary;
///
/// let op = OperatorSummary::new("sinfo", 1, 0).with_description("Short information");
/// assert!(!op.is_alias);
/// assert_eq!(op.description.as_deref(), Some("Short information"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorSummary {
    pub name: String,
    pub description: Option<String>,
    pub inputs: i32,
    pub outputs: i32,
    pub is_alias: bool,
    pub alias_target: Option<String>,
}

impl OperatorSummary {
    pub fn new(name: &str, inputs: i32, outputs: i32) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            inputs,
            outputs,
            is_alias: false,
            alias_target: None,
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Marks the record as an alias of `target`.
    pub fn with_alias_target(mut self, target: &str) -> Self {
        self.is_alias = true;
        self.alias_target = Some(target.to_string());
        self
    }

    /// Returns `true` when the listing declares a variable number of inputs.
    pub fn has_variadic_inputs(&self) -> bool {
        self.inputs < 0
    }
}

/// Section headers recognized in a help page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Section {
    Name,
    Synopsis,
    Description,
    Operators,
    Parameter,
    Environment,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Name,
        Section::Synopsis,
        Section::Description,
        Section::Operators,
        Section::Parameter,
        Section::Environment,
    ];

    /// Header text exactly as it appears in help output.
    pub fn header(self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Synopsis => "SYNOPSIS",
            Self::Description => "DESCRIPTION",
            Self::Operators => "OPERATORS",
            Self::Parameter => "PARAMETER",
            Self::Environment => "ENVIRONMENT",
        }
    }

    /// Matches a header token. Case-sensitive and exact.
    ///
    /// # Examples
    ///
    /// ```
    /// use cdo_schema_core::Section;
    ///
    /// assert_eq!(Section::from_header("SYNOPSIS"), Some(Section::Synopsis));
    /// assert_eq!(Section::from_header("Synopsis"), None);
    /// ```
    pub fn from_header(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.header() == token)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Section bodies of one help page, keyed by header.
///
/// Headers absent from the page are absent from the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMap {
    sections: BTreeMap<Section, String>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a section body, replacing any earlier body for the same header.
    pub fn insert(&mut self, section: Section, body: String) {
        self.sections.insert(section, body);
    }

    pub fn get(&self, section: Section) -> Option<&str> {
        self.sections.get(&section).map(String::as_str)
    }

    /// Returns the body, or `""` when the section is absent.
    pub fn body(&self, section: Section) -> &str {
        self.get(section).unwrap_or_default()
    }

    pub fn contains(&self, section: Section) -> bool {
        self.sections.contains_key(&section)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Section, &str)> {
        self.sections.iter().map(|(section, body)| (*section, body.as_str()))
    }
}

/// Semantic type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Bool,
    Int,
    Float,
}

impl ParamType {
    /// Maps a declared type token (case-insensitive) to a semantic type.
    ///
    /// Unknown tokens fall back to [`ParamType::String`].
    ///
    /// # Examples
    ///
    /// ```
    /// use cdo_schema_core::ParamType;
    ///
    /// assert_eq!(ParamType::from_token("INTEGER"), ParamType::Int);
    /// assert_eq!(ParamType::from_token("num"), ParamType::Float);
    /// assert_eq!(ParamType::from_token("WORDS"), ParamType::String);
    /// ```
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => Self::Bool,
            "INT" | "INTEGER" => Self::Int,
            "FLOAT" | "DOUBLE" | "NUM" => Self::Float,
            _ => Self::String,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type and description of one declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamMeta {
    pub ty: ParamType,
    pub description: String,
}

impl ParamMeta {
    pub fn new(ty: ParamType, description: &str) -> Self {
        Self {
            ty,
            description: description.to_string(),
        }
    }
}

/// Parameters declared in a `PARAMETER` section, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    params: BTreeMap<String, ParamMeta>,
}

impl ParameterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, meta: ParamMeta) {
        self.params.insert(name.to_string(), meta);
    }

    pub fn get(&self, name: &str) -> Option<&ParamMeta> {
        self.params.get(name)
    }

    /// Declared type of `name`, if the page declares it.
    pub fn type_of(&self, name: &str) -> Option<ParamType> {
        self.params.get(name).map(|meta| meta.ty)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamMeta)> {
        self.params.iter().map(|(name, meta)| (name.as_str(), meta))
    }
}

/// Documentation for one operator of a multi-operator help page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDoc {
    pub name: String,
    pub short: String,
    pub long_lines: Vec<String>,
}

impl OperatorDoc {
    pub fn new(name: &str, short: &str) -> Self {
        Self {
            name: name.to_string(),
            short: short.to_string(),
            long_lines: Vec::new(),
        }
    }

    /// Long-form text: continuation lines joined by newlines and trimmed.
    pub fn long_text(&self) -> String {
        self.long_lines.join("\n").trim().to_string()
    }
}

/// Operator docs of one page, in first-seen order.
///
/// Re-inserting a name replaces the earlier entry but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDocs {
    entries: Vec<OperatorDoc>,
}

impl OperatorDocs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `doc` and returns its index.
    pub fn insert(&mut self, doc: OperatorDoc) -> usize {
        match self.entries.iter().position(|entry| entry.name == doc.name) {
            Some(idx) => {
                self.entries[idx] = doc;
                idx
            }
            None => {
                self.entries.push(doc);
                self.entries.len() - 1
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&OperatorDoc> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn get_index_mut(&mut self, idx: usize) -> Option<&mut OperatorDoc> {
        self.entries.get_mut(idx)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperatorDoc> {
        self.entries.iter()
    }
}

/// Call shape parsed from one `SYNOPSIS` line.
///
/// The operator is either a real name or the [`TEMPLATE_PLACEHOLDER`].
/// Parameter order is the declared call order.
///
/// # Examples
///
/// ```
/// use cdo_schema_core::CallSpec;
///
/// let spec = CallSpec::new("selname")
///     .with_required("names")
///     .with_inputs(["infile"])
///     .with_outputs(["outfile"]);
/// assert!(!spec.is_template);
/// assert_eq!(spec.output_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSpec {
    pub operator: String,
    pub required_params: Vec<String>,
    pub optional_params: Vec<String>,
    pub input_tokens: Vec<String>,
    pub output_tokens: Vec<String>,
    pub is_template: bool,
}

impl CallSpec {
    pub fn new(operator: &str) -> Self {
        Self {
            operator: operator.to_string(),
            required_params: Vec::new(),
            optional_params: Vec::new(),
            input_tokens: Vec::new(),
            output_tokens: Vec::new(),
            is_template: operator == TEMPLATE_PLACEHOLDER,
        }
    }

    pub fn with_required(mut self, name: &str) -> Self {
        self.required_params.push(name.to_string());
        self
    }

    pub fn with_optional(mut self, name: &str) -> Self {
        self.optional_params.push(name.to_string());
        self
    }

    pub fn with_inputs<'a>(mut self, tokens: impl IntoIterator<Item = &'a str>) -> Self {
        self.input_tokens
            .extend(tokens.into_iter().map(String::from));
        self
    }

    pub fn with_outputs<'a>(mut self, tokens: impl IntoIterator<Item = &'a str>) -> Self {
        self.output_tokens
            .extend(tokens.into_iter().map(String::from));
        self
    }

    pub fn input_count(&self) -> usize {
        self.input_tokens.len()
    }

    pub fn output_count(&self) -> usize {
        self.output_tokens.len()
    }

    /// Copies this shape under a concrete operator name.
    pub fn instantiate(&self, operator: &str) -> ConcreteCallSpec {
        ConcreteCallSpec {
            operator: operator.to_string(),
            required_params: self.required_params.clone(),
            optional_params: self.optional_params.clone(),
            input_tokens: self.input_tokens.clone(),
            output_tokens: self.output_tokens.clone(),
        }
    }

    /// Converts a non-template spec; templates yield `None`.
    pub fn into_concrete(self) -> Option<ConcreteCallSpec> {
        if self.is_template {
            return None;
        }
        Some(ConcreteCallSpec {
            operator: self.operator,
            required_params: self.required_params,
            optional_params: self.optional_params,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
        })
    }
}

/// A call shape bound to a real operator name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcreteCallSpec {
    pub operator: String,
    pub required_params: Vec<String>,
    pub optional_params: Vec<String>,
    pub input_tokens: Vec<String>,
    pub output_tokens: Vec<String>,
}

impl ConcreteCallSpec {
    pub fn input_count(&self) -> usize {
        self.input_tokens.len()
    }

    pub fn output_count(&self) -> usize {
        self.output_tokens.len()
    }

    pub fn takes_inputs(&self) -> bool {
        !self.input_tokens.is_empty()
    }

    pub fn takes_output(&self) -> bool {
        !self.output_tokens.is_empty()
    }

    /// All declared parameter names: required first, then optional.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.required_params
            .iter()
            .chain(self.optional_params.iter())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_docs_replace_keeps_position() {
        let mut docs = OperatorDocs::new();
        docs.insert(OperatorDoc::new("sinfo", "first"));
        docs.insert(OperatorDoc::new("sinfon", "second"));
        docs.insert(OperatorDoc::new("sinfo", "third"));

        assert_eq!(docs.names(), vec!["sinfo", "sinfon"]);
        assert_eq!(docs.get("sinfo").map(|d| d.short.as_str()), Some("third"));
    }

    #[test]
    fn test_long_text_trims_blank_edges() {
        let mut doc = OperatorDoc::new("info", "Info");
        doc.long_lines = vec![String::new(), "Prints details.".into(), String::new()];
        assert_eq!(doc.long_text(), "Prints details.");
    }

    #[test]
    fn test_template_spec_is_not_concrete() {
        let spec = CallSpec::new(TEMPLATE_PLACEHOLDER).with_required("p1");
        assert!(spec.clone().into_concrete().is_none());
        let concrete = spec.instantiate("sinfo");
        assert_eq!(concrete.required_params, vec!["p1"]);
    }

    #[test]
    fn test_section_map_last_insert_wins() {
        let mut map = SectionMap::new();
        map.insert(Section::Name, "a".into());
        map.insert(Section::Name, "b".into());
        assert_eq!(map.get(Section::Name), Some("b"));
        assert_eq!(map.body(Section::Parameter), "");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_section_serializes_as_header() {
        let json = serde_json::to_string(&Section::Parameter).unwrap();
        assert_eq!(json, "\"PARAMETER\"");
    }
}
