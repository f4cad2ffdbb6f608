//! End-to-end discovery against a scripted tool.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cdo_schema_discovery::binding::CallArgs;
use cdo_schema_discovery::config::CdoConfig;
use cdo_schema_discovery::discover::Cdo;
use cdo_schema_discovery::invoker::{ProcessInvoker, RunRequest};
use cdo_schema_discovery::{BindingError, CdoError, InvocationError};

/// Answers `--operators` and `-h <op>` from fixtures and records every call.
#[derive(Default)]
struct ScriptedCdo {
    calls: Mutex<Vec<Vec<String>>>,
    help_calls: AtomicUsize,
}

impl ProcessInvoker for ScriptedCdo {
    fn invoke(&self, argv: &[String]) -> Result<String, InvocationError> {
        self.calls.lock().unwrap().push(argv.to_vec());
        let words: Vec<&str> = argv.iter().map(String::as_str).collect();
        match words.as_slice() {
            [.., "--operators"] => Ok(fixture("operators-listing.txt")),
            [.., "-h", operator] => {
                self.help_calls.fetch_add(1, Ordering::SeqCst);
                help_page(operator)
            }
            [.., "missing.nc", _] => Err(InvocationError::NonZeroExit {
                status: Some(1),
                stderr: "cdo remapbil: Open failed on >missing.nc<".to_string(),
            }),
            _ => Ok(format!("ran: {}", words[1..].join(" "))),
        }
    }
}

fn help_page(operator: &str) -> Result<String, InvocationError> {
    let name = match operator {
        "sinfo" | "sinfon" => "sinfo-help.txt",
        "remapbil" => "remapbil-help.txt",
        "selname" | "selcode" => "select-help.txt",
        "ymonadd" | "ymonsub" => "ymonarith-help.txt",
        "abs" => {
            return Err(InvocationError::NonZeroExit {
                status: Some(1),
                stderr: "cdo: help for abs unavailable".to_string(),
            });
        }
        _ => return Ok(String::new()),
    };
    Ok(fixture(name))
}

#[test]
fn test_initialization_binds_everything_but_the_failed_operator() {
    let invoker = Arc::new(ScriptedCdo::default());
    let cdo = Cdo::with_invoker(CdoConfig::default(), invoker.clone()).unwrap();

    assert_eq!(cdo.list_operators().len(), 12);
    assert_eq!(
        cdo.bindings().names(),
        vec![
            "remapbil", "selcode", "selltype", "selname", "sinfo", "sinfon", "ymonadd", "ymonsub"
        ]
    );

    let report = cdo.report();
    assert_eq!(report.failed, vec!["abs"]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("'abs'"));
    assert_eq!(
        report.attached,
        vec![
            "remapbil", "selname", "selcode", "selltype", "sinfo", "sinfon", "ymonadd", "ymonsub"
        ]
    );
    assert_eq!(report.duplicates, vec!["selname", "selcode", "selltype", "sinfo", "sinfon", "ymonadd", "ymonsub"]);
    assert_eq!(invoker.help_calls.load(Ordering::SeqCst), 12);
}

#[test]
fn test_binding_call_builds_command_line() {
    let invoker = Arc::new(ScriptedCdo::default());
    let config = CdoConfig {
        default_options: vec!["-s".into()],
        ..CdoConfig::default()
    };
    let cdo = Cdo::with_invoker(config, invoker.clone()).unwrap();

    let args = CallArgs::new()
        .arg("grid", "r360x180")
        .infile("in.nc")
        .outfile("out.nc")
        .option("-f nc4");
    let output = cdo.call("remapbil", &args).unwrap();
    assert_eq!(output, "ran: -s -f nc4 remapbil,r360x180 in.nc out.nc");
}

#[test]
fn test_run_raw_request_bypasses_bindings() {
    let config = CdoConfig {
        default_options: vec!["-s".into()],
        ..CdoConfig::default()
    };
    let cdo = Cdo::with_invoker(config, Arc::new(ScriptedCdo::default())).unwrap();

    let request = RunRequest::operator("showname").with_inputs(["in.nc"]);
    assert_eq!(cdo.run(&request).unwrap(), "ran: -s showname in.nc");
}

#[test]
fn test_binding_call_propagates_tool_failure() {
    let cdo = Cdo::with_invoker(CdoConfig::default(), Arc::new(ScriptedCdo::default())).unwrap();

    let args = CallArgs::new()
        .arg("grid", "r360x180")
        .infile("missing.nc")
        .outfile("out.nc");
    let err = cdo.call("remapbil", &args).unwrap_err();
    match err {
        CdoError::Binding(BindingError::Invocation(ref inner)) => {
            assert_eq!(inner.stderr(), Some("cdo remapbil: Open failed on >missing.nc<"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_listing_failure_is_fatal() {
    struct Broken;
    impl ProcessInvoker for Broken {
        fn invoke(&self, _argv: &[String]) -> Result<String, InvocationError> {
            Err(InvocationError::NonZeroExit {
                status: Some(127),
                stderr: "cdo: not installed".to_string(),
            })
        }
    }

    let err = Cdo::with_invoker(CdoConfig::default(), Arc::new(Broken)).unwrap_err();
    assert!(matches!(err, CdoError::Invocation(_)));
}

#[test]
fn test_help_cache_skips_repeat_fetches() {
    let cache_dir = tempfile::tempdir().unwrap();
    // Any existing file works as a fingerprintable executable; the scripted
    // invoker never runs it.
    let config = CdoConfig {
        executable: fixture_path("operators-listing.txt").display().to_string(),
        cache_dir: Some(cache_dir.path().to_path_buf()),
        ..CdoConfig::default()
    };

    let first = Arc::new(ScriptedCdo::default());
    let cdo = Cdo::with_invoker(config.clone(), first.clone()).unwrap();
    assert_eq!(first.help_calls.load(Ordering::SeqCst), 12);

    // Only the failed fetch is retried.
    let second = Arc::new(ScriptedCdo::default());
    let cached = Cdo::with_invoker(config, second.clone()).unwrap();
    assert_eq!(second.help_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cached.bindings().names(), cdo.bindings().names());
}

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture file must be readable")
}
