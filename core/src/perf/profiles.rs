use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

const PAYLOAD_SCALE: u64 = 50_000_000;
const BLOCK_SCALE: u64 = 40_000;

/// One grid dimension: indices, each multiplied by `scale`.
///
/// Ranges are kept as bounds and expanded only while iterating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    indices: AxisIndices,
    scale: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AxisIndices {
    Range { start: u64, end: u64 },
    List(Vec<u64>),
}

impl Axis {
    /// Upper bound on the number of values a single axis may hold.
    pub const MAX_POINTS: u64 = 100_000;

    /// Inclusive `start..=end` range of indices; empty when `start > end`.
    pub fn range(start: u64, end: u64, scale: u64) -> Self {
        Self {
            indices: AxisIndices::Range { start, end },
            scale,
        }
    }

    pub fn list(indices: Vec<u64>, scale: u64) -> Self {
        Self {
            indices: AxisIndices::List(indices),
            scale,
        }
    }

    pub fn scale(&self) -> u64 {
        self.scale
    }

    /// Number of values; saturates for a full `0..=u64::MAX` range.
    pub fn len(&self) -> u64 {
        match &self.indices {
            AxisIndices::Range { start, end } if start > end => 0,
            AxisIndices::Range { start, end } => (end - start).saturating_add(1),
            AxisIndices::List(values) => values.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scaled values in declaration order.
    pub fn values(&self) -> Box<dyn Iterator<Item = u64> + '_> {
        let scale = self.scale;
        match &self.indices {
            AxisIndices::Range { start, end } => Box::new((*start..=*end).map(move |idx| idx.saturating_mul(scale))),
            AxisIndices::List(values) => Box::new(values.iter().map(move |idx| idx.saturating_mul(scale))),
        }
    }

    fn max_index(&self) -> Option<u64> {
        match &self.indices {
            AxisIndices::Range { start, end } if start > end => None,
            AxisIndices::Range { end, .. } => Some(*end),
            AxisIndices::List(values) => values.iter().copied().max(),
        }
    }

    fn check_bounds(&self, what: &str) -> Result<()> {
        let len = self.len();
        if len > Self::MAX_POINTS {
            bail!("{} has {} values, more than the limit of {}", what, len, Self::MAX_POINTS);
        }
        if let Some(idx) = self.max_index()
            && idx.checked_mul(self.scale).is_none()
        {
            bail!("{} value {} * {} overflows u64", what, idx, self.scale);
        }
        Ok(())
    }
}

/// Slower-varying dimension, reported with a `<label>: <value>` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuterAxis {
    pub label: String,
    pub axis: Axis,
}

/// How the optional second command-line argument is derived for a trial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecondaryArg {
    /// Only the payload size is passed.
    #[default]
    None,
    /// The outer axis value itself (block size, shm segment size).
    Outer,
    /// `size / outer` with integer division: the number of blocks.
    SizePerOuter,
}

impl SecondaryArg {
    pub fn derive(self, size: u64, outer: Option<u64>) -> Option<u64> {
        match self {
            SecondaryArg::None => None,
            SecondaryArg::Outer => outer,
            SecondaryArg::SizePerOuter => outer.and_then(|block| size.checked_div(block)),
        }
    }
}

/// Shape of the aggregate result line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineStyle {
    /// `<kb>, <average>`
    #[default]
    Plain,
    /// `<kb>, <average>, ` (the uds pull sweep always printed an empty third column)
    TrailingBlank,
}

impl LineStyle {
    pub fn render(self, size_kb: u64, average: &str) -> String {
        match self {
            LineStyle::Plain => format!("{}, {}", size_kb, average),
            LineStyle::TrailingBlank => format!("{}, {}, ", size_kb, average),
        }
    }
}

/// One concrete combination of axis values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPoint {
    pub outer: Option<u64>,
    pub size: u64,
    pub secondary: Option<u64>,
}

impl GridPoint {
    /// Arguments handed to the benchmark executable, in order.
    pub fn args(&self) -> Vec<u64> {
        let mut args = vec![self.size];
        args.extend(self.secondary);
        args
    }
}

/// Flattened traversal of a profile, before anything is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    Test(String),
    Outer { label: String, value: u64 },
    Point { test: String, point: GridPoint },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub description: String,
    pub tests: Vec<String>,
    pub outer: Option<OuterAxis>,
    pub inner: Axis,
    pub secondary: SecondaryArg,
    pub repeats: u32,
    pub line_style: LineStyle,
}

impl Profile {
    /// Every executable over the plain payload sweep.
    pub fn sweep() -> Self {
        Self {
            name: "sweep".to_string(),
            description: "all transfer tests over payloads of 0-500MB".to_string(),
            tests: [
                "memcpy-simple",
                "memcpy-blocks",
                "pipe-copy",
                "shm-1buf",
                "shm-2buf",
                "uds-copy",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            outer: None,
            inner: Axis::range(0, 10, PAYLOAD_SCALE),
            secondary: SecondaryArg::None,
            repeats: 10,
            line_style: LineStyle::Plain,
        }
    }

    /// Block-wise memcpy with block sizes of 40KB-400KB.
    pub fn memcpy() -> Self {
        Self {
            name: "memcpy".to_string(),
            description: "memcpy-blocks across block sizes".to_string(),
            tests: vec!["memcpy-blocks".to_string()],
            outer: Some(OuterAxis {
                label: "BLOCK".to_string(),
                axis: Axis::range(1, 10, BLOCK_SCALE),
            }),
            inner: Axis::range(0, 4, PAYLOAD_SCALE),
            secondary: SecondaryArg::Outer,
            repeats: 4,
            line_style: LineStyle::Plain,
        }
    }

    /// Shared-memory copies across segment sizes.
    pub fn shm() -> Self {
        Self {
            name: "shm".to_string(),
            description: "single and double buffered shm across segment sizes".to_string(),
            tests: vec!["shm-1buf".to_string(), "shm-2buf".to_string()],
            outer: Some(OuterAxis {
                label: "SHM".to_string(),
                axis: Axis::range(1, 10, BLOCK_SCALE),
            }),
            inner: Axis::range(0, 4, PAYLOAD_SCALE),
            secondary: SecondaryArg::Outer,
            repeats: 4,
            line_style: LineStyle::Plain,
        }
    }

    /// Unix socket pull transfers split into a fixed number of blocks.
    pub fn pull() -> Self {
        Self {
            name: "pull".to_string(),
            description: "uds-copy-pull split into 1000 and 10000 blocks".to_string(),
            tests: vec!["uds-copy-pull".to_string()],
            outer: Some(OuterAxis {
                label: "BLOCKS".to_string(),
                axis: Axis::list(vec![1000, 10000], 1),
            }),
            inner: Axis::range(1, 10, PAYLOAD_SCALE),
            secondary: SecondaryArg::SizePerOuter,
            repeats: 20,
            line_style: LineStyle::TrailingBlank,
        }
    }

    pub fn builtins() -> Vec<Profile> {
        vec![Self::sweep(), Self::memcpy(), Self::shm(), Self::pull()]
    }

    pub fn builtin(name: &str) -> Option<Profile> {
        Self::builtins().into_iter().find(|p| p.name == name)
    }

    pub fn with_repeats(mut self, repeats: u32) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("profile name must not be empty");
        }
        if self.repeats == 0 {
            bail!("repeats must be at least 1");
        }
        if self.tests.is_empty() {
            bail!("no tests listed");
        }
        if let Some(empty) = self.tests.iter().find(|t| t.trim().is_empty()) {
            bail!("test name {:?} is empty", empty);
        }
        if self.inner.is_empty() {
            bail!("inner axis has no values");
        }
        self.inner.check_bounds("inner axis")?;

        match (&self.outer, self.secondary) {
            (None, SecondaryArg::Outer | SecondaryArg::SizePerOuter) => {
                bail!("secondary argument {:?} requires an outer axis", self.secondary)
            }
            (Some(outer), _) => {
                if outer.axis.is_empty() {
                    bail!("outer axis '{}' has no values", outer.label);
                }
                outer.axis.check_bounds(&format!("outer axis '{}'", outer.label))?;
                if self.secondary == SecondaryArg::SizePerOuter && outer.axis.values().any(|v| v == 0) {
                    return Err(anyhow!(
                        "outer axis '{}' contains 0, which cannot divide the payload size",
                        outer.label
                    ));
                }
            }
            (None, SecondaryArg::None) => {}
        }
        Ok(())
    }

    /// One row per outer value (a single `None` row without an outer axis),
    /// each holding its points in ascending size order.
    fn rows(&self) -> Vec<(Option<u64>, Vec<GridPoint>)> {
        let outers: Vec<Option<u64>> = match &self.outer {
            Some(outer) => outer.axis.values().map(Some).collect(),
            None => vec![None],
        };
        outers
            .into_iter()
            .map(|outer| {
                let points = self
                    .inner
                    .values()
                    .map(|size| GridPoint {
                        outer,
                        size,
                        secondary: self.secondary.derive(size, outer),
                    })
                    .collect();
                (outer, points)
            })
            .collect()
    }

    /// Grid points for a single test, outer axis slowest.
    pub fn grid_points(&self) -> Vec<GridPoint> {
        self.rows().into_iter().flat_map(|(_, points)| points).collect()
    }

    /// Full sequence of headers and grid points across all tests.
    pub fn plan(&self) -> Vec<PlanStep> {
        let rows = self.rows();
        let label = self.outer.as_ref().map(|o| o.label.as_str());
        let mut steps = Vec::new();
        for test in &self.tests {
            steps.push(PlanStep::Test(test.clone()));
            for (outer, points) in &rows {
                if let (Some(label), Some(value)) = (label, outer) {
                    steps.push(PlanStep::Outer {
                        label: label.to_string(),
                        value: *value,
                    });
                }
                steps.extend(points.iter().map(|point| PlanStep::Point {
                    test: test.clone(),
                    point: *point,
                }));
            }
        }
        steps
    }

    /// Total number of child processes a run of this profile launches.
    pub fn trial_count(&self) -> u64 {
        let outer = self.outer.as_ref().map_or(1, |o| o.axis.len());
        (self.tests.len() as u64)
            .saturating_mul(outer)
            .saturating_mul(self.inner.len())
            .saturating_mul(u64::from(self.repeats))
    }
}
