//! Callable bindings synthesized from concrete call specs.
//!
//! A [`Binding`] is data, not generated code: it holds the operator's
//! [`ConcreteCallSpec`], a formal signature derived from it, and its
//! documentation. Calls go through [`Binding::prepare`], which checks named
//! [`CallArgs`] against the signature and formats them into a
//! [`RunRequest`], and [`Binding::call`], which runs that request.
//!
//! Formal parameter order is: required parameters, `infiles` (when the
//! synopsis declares inputs), `outfile` (when it declares an output),
//! optional parameters, then the execution `overrides`.
//!
//! # Example
//!
//! ```
//! use cdo_schema_core::{CallSpec, OperatorDocs, ParameterSpec};
//! use cdo_schema_discovery::binding::{Binding, CallArgs};
//!
//! let spec = CallSpec::new("remapbil")
//!     .with_required("grid")
//!     .with_inputs(["infile"])
//!     .with_outputs(["outfile"])
//!     .into_concrete()
//!     .unwrap();
//! let binding = Binding::synthesize(&spec, &ParameterSpec::new(), "", &OperatorDocs::new());
//!
//! let request = binding
//!     .prepare(&CallArgs::new().arg("grid", "r360x180").infile("in.nc").outfile("out.nc"))
//!     .unwrap();
//! assert_eq!(request.operator.as_deref(), Some("remapbil,r360x180"));
//! assert_eq!(request.inputs, ["in.nc"]);
//! assert_eq!(request.output.as_deref(), Some("out.nc"));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use cdo_schema_core::{ConcreteCallSpec, OperatorDocs, ParamType, ParameterSpec};

use crate::docstring::build_docstring;
use crate::error::BindingError;
use crate::invoker::{RunRequest, Runner};

/// Name of the input-files parameter.
pub const INFILES: &str = "infiles";
/// Name of the output-file parameter.
pub const OUTFILE: &str = "outfile";
/// Name of the execution-overrides catch-all.
pub const OVERRIDES: &str = "overrides";

/// Override carrying extra tool options (e.g. `"-f nc4"`).
pub const OPTIONS_OVERRIDE: &str = "options";
/// Override promoting command-line logging to `info`.
pub const VERBOSE_OVERRIDE: &str = "verbose";

/// A value passed to a binding parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Paths(Vec<String>),
}

impl ArgValue {
    /// Truthiness used for flag-style parameters.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Str(s) => !s.is_empty(),
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Bool(b) => *b,
            Self::Paths(paths) => !paths.is_empty(),
        }
    }

    /// Renders a scalar as an operator parameter. Path lists have no
    /// scalar form.
    fn render(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(format!("{f:?}")),
            Self::Bool(b) => Some(b.to_string()),
            Self::Paths(_) => None,
        }
    }

    /// Normalizes to a list of paths, wrapping a single scalar.
    fn into_paths(self) -> Vec<String> {
        match self {
            Self::Paths(paths) => paths,
            other => other.render().into_iter().collect(),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paths(paths) => write!(f, "[{}]", paths.join(", ")),
            other => f.write_str(&other.render().unwrap_or_default()),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(value: Vec<String>) -> Self {
        Self::Paths(value)
    }
}

impl From<Vec<&str>> for ArgValue {
    fn from(value: Vec<&str>) -> Self {
        Self::Paths(value.into_iter().map(String::from).collect())
    }
}

/// Named arguments for one binding call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    values: BTreeMap<String, ArgValue>,
    overrides: BTreeMap<String, ArgValue>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a named parameter.
    pub fn arg(mut self, name: &str, value: impl Into<ArgValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Sets a boolean parameter to `true`.
    pub fn flag(self, name: &str) -> Self {
        self.arg(name, true)
    }

    /// Sets a single input file.
    pub fn infile(self, path: &str) -> Self {
        self.arg(INFILES, path)
    }

    /// Sets a sequence of input files.
    pub fn infiles<S: AsRef<str>>(self, paths: impl IntoIterator<Item = S>) -> Self {
        let paths = paths
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect::<Vec<_>>();
        self.arg(INFILES, paths)
    }

    pub fn outfile(self, path: &str) -> Self {
        self.arg(OUTFILE, path)
    }

    /// Sets the `options` execution override.
    pub fn option(self, options: &str) -> Self {
        self.override_value(OPTIONS_OVERRIDE, options)
    }

    /// Sets an arbitrary execution override.
    pub fn override_value(mut self, name: &str, value: impl Into<ArgValue>) -> Self {
        self.overrides.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Role of one formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum ParamKind {
    Required(ParamType),
    InputFiles,
    OutputFile,
    Optional(ParamType),
    Overrides,
}

/// One formal parameter of a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormalParam {
    pub name: String,
    pub kind: ParamKind,
}

impl FormalParam {
    fn new(name: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }

    /// Default applied when the caller omits the parameter.
    pub fn default_value(&self) -> Option<ArgValue> {
        match self.kind {
            ParamKind::Optional(ParamType::Bool) => Some(ArgValue::Bool(false)),
            _ => None,
        }
    }
}

impl fmt::Display for FormalParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamKind::Required(ty) => write!(f, "{}: {ty}", self.name),
            ParamKind::InputFiles => write!(f, "{}: string | [string]", self.name),
            ParamKind::OutputFile => write!(f, "{}: string", self.name),
            ParamKind::Optional(ParamType::Bool) => write!(f, "{}: bool = false", self.name),
            ParamKind::Optional(ty) => write!(f, "{}: {ty} = none", self.name),
            ParamKind::Overrides => write!(f, "**{}", self.name),
        }
    }
}

/// Parameter-binding shape of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingShape {
    /// Only required parameters; no files, no optional parameters.
    RequiredOnly,
    /// Required parameters plus input and/or output files.
    RequiredWithFiles,
    /// Has optional parameters.
    Full,
}

impl BindingShape {
    fn of(spec: &ConcreteCallSpec) -> Self {
        if !spec.optional_params.is_empty() {
            Self::Full
        } else if spec.takes_inputs() || spec.takes_output() {
            Self::RequiredWithFiles
        } else {
            Self::RequiredOnly
        }
    }
}

/// A callable operator binding.
#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    operator: String,
    spec: ConcreteCallSpec,
    signature: Vec<FormalParam>,
    shape: BindingShape,
    doc: String,
}

impl Binding {
    /// Synthesizes the binding for `spec.operator`.
    ///
    /// Parameter types come from `params`; required parameters missing from
    /// it are strings and optional ones are flags.
    pub fn synthesize(
        spec: &ConcreteCallSpec,
        params: &ParameterSpec,
        description: &str,
        docs: &OperatorDocs,
    ) -> Self {
        let mut signature = Vec::new();
        for name in &spec.required_params {
            let ty = params.type_of(name).unwrap_or(ParamType::String);
            signature.push(FormalParam::new(name, ParamKind::Required(ty)));
        }
        if spec.takes_inputs() {
            signature.push(FormalParam::new(INFILES, ParamKind::InputFiles));
        }
        if spec.takes_output() {
            signature.push(FormalParam::new(OUTFILE, ParamKind::OutputFile));
        }
        for name in &spec.optional_params {
            let ty = params.type_of(name).unwrap_or(ParamType::Bool);
            signature.push(FormalParam::new(name, ParamKind::Optional(ty)));
        }
        signature.push(FormalParam::new(OVERRIDES, ParamKind::Overrides));

        Self {
            operator: spec.operator.clone(),
            doc: build_docstring(&spec.operator, spec, params, description, docs),
            shape: BindingShape::of(spec),
            spec: spec.clone(),
            signature,
        }
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn spec(&self) -> &ConcreteCallSpec {
        &self.spec
    }

    pub fn signature(&self) -> &[FormalParam] {
        &self.signature
    }

    pub fn shape(&self) -> BindingShape {
        self.shape
    }

    /// Synthesized documentation text.
    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// One-line signature, e.g. `remapbil(grid: string, infiles: ..., **overrides)`.
    pub fn signature_line(&self) -> String {
        let params = self
            .signature
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        format!("{}({})", self.operator, params.join(", "))
    }

    /// Checks `args` against the signature and formats the tool request.
    pub fn prepare(&self, args: &CallArgs) -> Result<RunRequest, BindingError> {
        if let Some(unknown) = args.names().find(|name| !self.accepts(name)) {
            return Err(BindingError::UnknownArgument {
                operator: self.operator.clone(),
                name: unknown.to_string(),
            });
        }

        let mut op_params = Vec::new();
        for name in &self.spec.required_params {
            let value = self.require(args, name)?;
            op_params.push(self.render(name, value)?);
        }
        for param in &self.signature {
            let ParamKind::Optional(ty) = param.kind else {
                continue;
            };
            let Some(value) = args.get(&param.name) else {
                continue;
            };
            if ty == ParamType::Bool {
                if value.is_truthy() {
                    op_params.push(param.name.clone());
                }
            } else {
                op_params.push(self.render(&param.name, value)?);
            }
        }

        let mut operator_token = self.operator.clone();
        if !op_params.is_empty() {
            operator_token.push(',');
            operator_token.push_str(&op_params.join(","));
        }

        let mut request = RunRequest::operator(&operator_token);
        if self.spec.takes_inputs() {
            request.inputs = self.require(args, INFILES)?.clone().into_paths();
        }
        if self.spec.takes_output() {
            let value = self.require(args, OUTFILE)?;
            request.output = Some(self.render(OUTFILE, value)?);
        }
        self.apply_overrides(args, &mut request)?;

        Ok(request)
    }

    /// Prepares and runs the call, returning captured stdout.
    pub fn call(&self, runner: &Runner, args: &CallArgs) -> Result<String, BindingError> {
        let request = self.prepare(args)?;
        Ok(runner.run(&request)?)
    }

    fn accepts(&self, name: &str) -> bool {
        self.signature
            .iter()
            .any(|param| param.kind != ParamKind::Overrides && param.name == name)
    }

    fn require<'a>(&self, args: &'a CallArgs, name: &str) -> Result<&'a ArgValue, BindingError> {
        args.get(name).ok_or_else(|| BindingError::MissingArgument {
            operator: self.operator.clone(),
            name: name.to_string(),
        })
    }

    fn render(&self, name: &str, value: &ArgValue) -> Result<String, BindingError> {
        value.render().ok_or_else(|| BindingError::InvalidArgument {
            operator: self.operator.clone(),
            name: name.to_string(),
            reason: "expected a single value, got a list".to_string(),
        })
    }

    fn apply_overrides(&self, args: &CallArgs, request: &mut RunRequest) -> Result<(), BindingError> {
        for (name, value) in &args.overrides {
            match name.as_str() {
                OPTIONS_OVERRIDE => match value {
                    ArgValue::Paths(words) => request.options.extend(words.iter().cloned()),
                    other => {
                        let text = self.render(name, other)?;
                        request
                            .options
                            .extend(text.split_whitespace().map(String::from));
                    }
                },
                VERBOSE_OVERRIDE => request.verbose = value.is_truthy(),
                _ => {
                    return Err(BindingError::UnknownOverride {
                        operator: self.operator.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
