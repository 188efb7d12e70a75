use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use tracing::{debug, info, warn};

use super::profiles::{GridPoint, LineStyle, PlanStep, Profile};
use super::runner::TrialRunner;
use super::summary::PointSummary;
use super::timing::{extract_time, format_average};

/// One line of harness output.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportLine {
    TestHeader(String),
    AxisHeader { label: String, value: u64 },
    TrialError { test: String, size: u64 },
    Aggregate { point: PointSummary, style: LineStyle },
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportLine::TestHeader(test) => write!(f, "{}", test),
            ReportLine::AxisHeader { label, value } => write!(f, "{}: {}", label, value),
            ReportLine::TrialError { test, size } => write!(f, "ERROR: {} {}", test, size),
            ReportLine::Aggregate { point, style } => {
                write!(f, "{}", style.render(point.size_kb(), &format_average(point.average_seconds)))
            }
        }
    }
}

/// Lazily runs a profile: children are only spawned as lines are pulled.
pub struct HarnessRun<'a, R: TrialRunner> {
    runner: &'a mut R,
    profile: &'a Profile,
    steps: std::vec::IntoIter<PlanStep>,
    pending: VecDeque<ReportLine>,
}

/// Start running every test of `profile` through `runner`.
pub fn run_all<'a, R: TrialRunner>(runner: &'a mut R, profile: &'a Profile) -> HarnessRun<'a, R> {
    HarnessRun {
        runner,
        profile,
        steps: profile.plan().into_iter(),
        pending: VecDeque::new(),
    }
}

impl<R: TrialRunner> HarnessRun<'_, R> {
    fn measure(&mut self, test: &str, point: GridPoint) {
        let repeats = self.profile.repeats;
        let args = point.args();
        let mut sum = 0.0;
        let mut parsed = 0u32;

        for trial in 0..repeats {
            match self.runner.run_trial(test, &args) {
                Ok(output) => match extract_time(&output) {
                    Some(seconds) => {
                        sum += seconds;
                        parsed += 1;
                    }
                    None => {
                        debug!(test, size = point.size, trial, "no TIME token in output");
                        self.pending.push_back(ReportLine::TrialError {
                            test: test.to_string(),
                            size: point.size,
                        });
                    }
                },
                Err(err) => {
                    warn!(test, size = point.size, trial, "trial failed: {:#}", err);
                    self.pending.push_back(ReportLine::TrialError {
                        test: test.to_string(),
                        size: point.size,
                    });
                }
            }
        }

        // Divides by the configured repeat count even when trials failed.
        let average = sum / f64::from(repeats);
        self.pending.push_back(ReportLine::Aggregate {
            point: PointSummary {
                test: test.to_string(),
                outer_label: self.profile.outer.as_ref().map(|o| o.label.clone()),
                outer_value: point.outer,
                size: point.size,
                secondary: point.secondary,
                repeats,
                parsed,
                sum_seconds: sum,
                average_seconds: average,
            },
            style: self.profile.line_style,
        });
    }
}

impl<R: TrialRunner> Iterator for HarnessRun<'_, R> {
    type Item = ReportLine;

    fn next(&mut self) -> Option<ReportLine> {
        if let Some(line) = self.pending.pop_front() {
            return Some(line);
        }
        match self.steps.next()? {
            PlanStep::Test(test) => {
                info!(profile = %self.profile.name, test = %test, "starting test");
                Some(ReportLine::TestHeader(test))
            }
            PlanStep::Outer { label, value } => Some(ReportLine::AxisHeader { label, value }),
            PlanStep::Point { test, point } => {
                self.measure(&test, point);
                self.pending.pop_front()
            }
        }
    }
}

/// Write every line to `out` as it is produced, flushing after each one, and
/// collect the aggregates.
pub fn write_report<I, W>(lines: I, out: &mut W) -> Result<Vec<PointSummary>>
where
    I: IntoIterator<Item = ReportLine>,
    W: Write,
{
    let mut points = Vec::new();
    for line in lines {
        writeln!(out, "{}", line).context("write report line")?;
        out.flush().context("flush report output")?;
        if let ReportLine::Aggregate { point, .. } = line {
            points.push(point);
        }
    }
    Ok(points)
}
