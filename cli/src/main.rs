use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;

use clap::Parser;
use ipcbench_core::{
    DryRunRunner, ProcessRunner, Profile, RunSummary, load_profiles, resolve_profile, run_all, write_report,
};

use anyhow::Context;
use tracing::info;

#[cfg(test)]
mod main_test;

static PERF_TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "ipcbench_core=info,ipcbench=info";

#[derive(Debug, Parser)]
#[command(
    name = "ipcbench",
    author,
    version,
    about = "Run IPC microbenchmark executables and average their TIME output",
    long_about = None
)]
struct CliArgs {
    /// Profile to run: sweep, memcpy, shm, pull, or one defined in --config
    #[arg(value_name = "PROFILE", default_value = "sweep")]
    profile: String,

    /// List the available profiles and exit
    #[arg(long)]
    list: bool,

    /// TOML file with additional `[[profile]]` tables
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the benchmark executables
    #[arg(long, value_name = "DIR", default_value = ".")]
    bin_dir: PathBuf,

    /// Override the profile's repeat count
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    repeats: Option<u32>,

    /// Also write per-point aggregates as JSON
    #[arg(long, value_name = "FILE", conflicts_with = "dry_run")]
    summary_json: Option<PathBuf>,

    /// Print the commands that would run instead of running them
    #[arg(long)]
    dry_run: bool,
}

/// How `IPCBENCH_TRACE` asks for diagnostics.
#[derive(Debug, PartialEq, Eq)]
enum TraceSetting {
    Off,
    /// `1`, `true`, `on`: fall back to `RUST_LOG`, then the built-in filter.
    Enabled,
    /// Anything else is taken as an `EnvFilter` directive.
    Filter(String),
}

impl TraceSetting {
    fn parse(raw: &str) -> Self {
        let value = raw.trim();
        let is = |word: &str| value.eq_ignore_ascii_case(word);
        if value.is_empty() || is("0") || is("false") || is("off") {
            TraceSetting::Off
        } else if is("1") || is("true") || is("on") {
            TraceSetting::Enabled
        } else {
            TraceSetting::Filter(value.to_string())
        }
    }

    fn filter(self) -> Option<String> {
        match self {
            TraceSetting::Off => None,
            TraceSetting::Enabled => Some(std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_TRACE_FILTER.to_string())),
            TraceSetting::Filter(expr) => Some(expr),
        }
    }
}

// Report lines own stdout, so the subscriber always writes to stderr.
fn maybe_init_perf_tracing() {
    let Some(directives) = std::env::var("IPCBENCH_TRACE")
        .ok()
        .and_then(|raw| TraceSetting::parse(&raw).filter())
    else {
        return;
    };

    PERF_TRACE_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_TRACE_FILTER));
        let _ = fmt().with_writer(std::io::stderr).with_env_filter(filter).try_init();
    });
}

fn available_profiles(custom: &[Profile]) -> Vec<Profile> {
    let mut profiles: Vec<Profile> = custom.to_vec();
    for builtin in Profile::builtins() {
        if !profiles.iter().any(|p| p.name == builtin.name) {
            profiles.push(builtin);
        }
    }
    profiles
}

fn print_profiles<W: Write>(out: &mut W, custom: &[Profile]) -> anyhow::Result<()> {
    for profile in available_profiles(custom) {
        writeln!(
            out,
            "{:<10} {} ({} runs)",
            profile.name,
            profile.description,
            profile.trial_count()
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Walk the profile without spawning anything, one command line per trial.
fn write_dry_run<W: Write>(profile: &Profile, bin_dir: &Path, out: W) -> anyhow::Result<()> {
    let mut runner = DryRunRunner::new(bin_dir, out);
    run_all(&mut runner, profile).for_each(drop);
    runner.finish()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    maybe_init_perf_tracing();

    let args = CliArgs::parse();

    let custom = match &args.config {
        Some(path) => load_profiles(path)?,
        None => Vec::new(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.list {
        return print_profiles(&mut out, &custom);
    }

    let mut profile = resolve_profile(&args.profile, &custom)?;
    if let Some(repeats) = args.repeats {
        profile = profile.with_repeats(repeats);
    }
    profile
        .validate()
        .with_context(|| format!("invalid profile '{}'", profile.name))?;

    if args.dry_run {
        return write_dry_run(&profile, &args.bin_dir, &mut out);
    }

    info!(
        profile = %profile.name,
        bin_dir = %args.bin_dir.display(),
        trials = profile.trial_count(),
        "starting run"
    );
    let mut runner = ProcessRunner::new(&args.bin_dir);
    let points = write_report(run_all(&mut runner, &profile), &mut out)?;

    let summary = RunSummary::generated_now(&profile, points);
    info!(
        points = summary.points.len(),
        incomplete = summary.incomplete_points(),
        "run finished"
    );
    if let Some(path) = &args.summary_json {
        summary.write_json(path)?;
    }
    Ok(())
}
