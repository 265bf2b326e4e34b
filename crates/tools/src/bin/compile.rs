//!
//! Compile a policy into an engine campaign file.
//!
//! Usage: `coc-compile <policy.yaml> --out FILE [--schema FILE] [--config FILE]
//! [--config-out FILE] [--demographics FILE] [--strict]`

use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};

use coc_campaign::write_json_atomic;
use coc_compiler::{Policy, compile};
use coc_tools::{load_config, load_demographics, load_schema};

#[derive(Parser, Debug)]
#[command(name = "coc-compile")]
#[command(about = "Compile a cascade-of-care policy into an engine campaign")]
struct Args {
    /// Path to the policy YAML file
    policy: PathBuf,

    /// Output path for the campaign JSON
    #[arg(long = "out", default_value = "campaign.json")]
    out: PathBuf,

    /// Engine schema JSON (bundled schema if omitted)
    #[arg(long = "schema")]
    schema: Option<PathBuf>,

    /// Engine config JSON receiving the campaign's config effects
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Where to write the updated config (defaults to --config)
    #[arg(long = "config-out")]
    config_out: Option<PathBuf>,

    /// Demographics JSON declaring individual properties
    #[arg(long = "demographics")]
    demographics: Option<PathBuf>,

    /// Treat dangling property restrictions as errors
    #[arg(long = "strict")]
    strict: bool,
}

fn main() {
    coc_tools::init_logging();

    let args = Args::parse();

    let mut policy = match Policy::load(&args.policy) {
        Ok(policy) => policy,
        Err(e) => {
            error!("Failed to load policy {}: {}", args.policy.display(), e);
            process::exit(1);
        }
    };
    if args.strict {
        policy.strict = true;
    }

    let inputs = load_schema(args.schema.as_deref()).and_then(|schema| {
        let demographics = load_demographics(args.demographics.as_deref())?;
        let config = load_config(args.config.as_deref())?;
        Ok((schema, demographics, config))
    });
    let (schema, demographics, mut config) = match inputs {
        Ok(inputs) => inputs,
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    };

    let compile_result = compile(&policy, schema, &demographics, &mut config);
    if compile_result.has_errors() {
        error!("{}", compile_result.format_diagnostics().trim_end());
        process::exit(1);
    }

    if !compile_result.diagnostics.is_empty() {
        warn!("{}", compile_result.format_diagnostics().trim_end());
    }

    let artifact = match compile_result.success() {
        Ok(artifact) => artifact,
        Err(_) => {
            error!("No campaign produced");
            process::exit(1);
        }
    };

    if let Err(e) = artifact.write(&args.out) {
        error!("Failed to write {}: {}", args.out.display(), e);
        process::exit(1);
    }
    info!(
        "Wrote {} events to {}",
        artifact.event_count(),
        args.out.display()
    );

    if let Some(config_out) = args.config_out.as_ref().or(args.config.as_ref()) {
        if let Err(e) = write_json_atomic(config_out, &config) {
            error!("Failed to write {}: {}", config_out.display(), e);
            process::exit(1);
        }
        info!("Wrote engine config to {}", config_out.display());
    }
}
