//!
//! Compiles a policy in memory and reports diagnostics and signal use.
//!
//! Usage: `coc-check <policy.yaml> [--schema FILE] [--demographics FILE]`

use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};

use coc_compiler::{Policy, compile};
use coc_tools::{load_demographics, load_schema};

#[derive(Parser, Debug)]
#[command(name = "coc-check")]
#[command(about = "Compile a cascade-of-care policy and report diagnostics")]
struct Args {
    /// Path to the policy YAML file
    policy: PathBuf,

    /// Engine schema JSON (bundled schema if omitted)
    #[arg(long = "schema")]
    schema: Option<PathBuf>,

    /// Demographics JSON declaring individual properties
    #[arg(long = "demographics")]
    demographics: Option<PathBuf>,
}

fn main() {
    coc_tools::init_logging();

    let args = Args::parse();

    if !args.policy.is_file() {
        error!("Policy '{}' does not exist", args.policy.display());
        process::exit(1);
    }

    info!("Loading policy from: {}", args.policy.display());

    let policy = match Policy::load(&args.policy) {
        Ok(policy) => policy,
        Err(e) => {
            error!("Failed to load policy: {}", e);
            process::exit(1);
        }
    };

    let inputs = load_schema(args.schema.as_deref()).and_then(|schema| {
        Ok((schema, load_demographics(args.demographics.as_deref())?))
    });
    let (schema, demographics) = match inputs {
        Ok(inputs) => inputs,
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    };

    let mut config = serde_json::json!({});
    let compile_result = compile(&policy, schema, &demographics, &mut config);
    let diagnostics = compile_result.format_diagnostics();

    if compile_result.has_errors() {
        error!("Errors found:\n{}", diagnostics);
        process::exit(1);
    }

    if !compile_result.diagnostics.is_empty() {
        warn!("Warnings found:\n{}", diagnostics);
    }

    if let Some(campaign) = compile_result.campaign.as_ref() {
        let signals = campaign.signal_report();
        info!("Successfully compiled policy '{}'", policy.metadata.name);
        info!("  - Sections: {}", policy.sections().join(", "));
        info!("  - Events: {}", campaign.len());
        info!("  - Signals: {}", signals.len());
        info!("  - Custom signals: {}", signals.custom_signals().len());
        info!("  - Unconsumed signals: {}", signals.unconsumed().len());
        info!("  - Config effects: {}", campaign.config_effects().len());
    } else {
        info!("No errors found.");
    }
}
