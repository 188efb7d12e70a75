pub mod perf;

pub use perf::{
    config::{load_profiles, parse_profiles, resolve_profile},
    harness::{HarnessRun, ReportLine, run_all, write_report},
    profiles::{Axis, GridPoint, LineStyle, OuterAxis, PlanStep, Profile, SecondaryArg},
    runner::{DryRunRunner, ProcessRunner, TrialRunner},
    summary::{PointSummary, RunSummary},
    timing::{extract_time, format_average},
};
