use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::profiles::Profile;

/// Aggregate for one grid point.
///
/// `parsed` counts the trials that produced a timing. `average_seconds` is
/// still `sum_seconds / repeats`, so a point with `parsed < repeats` is biased
/// low; consumers can filter on that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSummary {
    pub test: String,
    pub outer_label: Option<String>,
    pub outer_value: Option<u64>,
    pub size: u64,
    pub secondary: Option<u64>,
    pub repeats: u32,
    pub parsed: u32,
    pub sum_seconds: f64,
    pub average_seconds: f64,
}

impl PointSummary {
    pub fn size_kb(&self) -> u64 {
        self.size / 1000
    }

    pub fn is_complete(&self) -> bool {
        self.parsed == self.repeats
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub profile: String,
    pub repeats: u32,
    pub points: Vec<PointSummary>,
}

impl RunSummary {
    pub fn new(profile: &Profile, points: Vec<PointSummary>, timestamp: DateTime<Utc>) -> Self {
        Self {
            generated_at: timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            profile: profile.name.clone(),
            repeats: profile.repeats,
            points,
        }
    }

    pub fn generated_now(profile: &Profile, points: Vec<PointSummary>) -> Self {
        Self::new(profile, points, Utc::now())
    }

    pub fn incomplete_points(&self) -> usize {
        self.points.iter().filter(|p| !p.is_complete()).count()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).with_context(|| format!("write {}", path.display()))
    }
}
