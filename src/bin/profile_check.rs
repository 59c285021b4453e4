//! Structural validator for capability profile documents.
//!
//! Runs each document through the same pipeline the simulation layer uses at
//! load time: schema-version allowlist, JSON Schema validation, and field
//! coercion against the block registry. Baseline-dependent findings (bound
//! violations, inactive capabilities) only exist against a real device and
//! are not reported here.

use anyhow::{Result, bail};
use capsim::{SUPPORTED_SCHEMAS, validate_document};
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse()?;
    let mut failures = 0usize;
    for path in &args.paths {
        match validate_document(path) {
            Ok(doc) => {
                println!("ok: {} (schema {})", path.display(), doc.schema_version);
            }
            Err(err) => {
                failures += 1;
                eprintln!("error: {err}");
                if args.fail_fast {
                    bail!("{} failed validation", path.display());
                }
            }
        }
    }
    if failures > 0 {
        bail!("{failures} document(s) failed validation");
    }
    Ok(())
}

struct CliArgs {
    paths: Vec<PathBuf>,
    fail_fast: bool,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut paths = Vec::new();
        let mut fail_fast = false;
        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--fail-fast" => fail_fast = true,
                "--help" | "-h" => {
                    println!("usage: profile-check [--fail-fast] <profile.json>...");
                    println!("supported schemas: {}", SUPPORTED_SCHEMAS.join(", "));
                    std::process::exit(0);
                }
                other if other.starts_with("--") => bail!("Unknown flag: {other}"),
                other => paths.push(PathBuf::from(other)),
            }
        }
        if paths.is_empty() {
            bail!("No profile documents given; see --help");
        }
        Ok(Self { paths, fail_fast })
    }
}
