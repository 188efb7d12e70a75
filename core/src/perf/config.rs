//! Profile files.
//!
//! ```toml
//! [[profile]]
//! name = "quick"
//! tests = ["memcpy-simple"]
//! repeats = 2
//! inner = { start = 0, end = 2, scale = 1000000 }
//! outer = { label = "BLOCK", values = [1, 2], scale = 4096 }
//! secondary = "outer"
//! ```

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use super::profiles::{Axis, LineStyle, OuterAxis, Profile, SecondaryArg};

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ProfileFile {
    #[serde(default, rename = "profile")]
    profiles: Vec<ProfileSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileSection {
    name: String,
    #[serde(default)]
    description: Option<String>,
    tests: Vec<String>,
    repeats: u32,
    inner: AxisSection,
    #[serde(default)]
    outer: Option<OuterSection>,
    #[serde(default)]
    secondary: Option<SecondaryArg>,
    #[serde(default)]
    line_style: Option<LineStyle>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AxisSection {
    #[serde(default)]
    start: Option<u64>,
    #[serde(default)]
    end: Option<u64>,
    #[serde(default)]
    values: Option<Vec<u64>>,
    #[serde(default)]
    scale: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OuterSection {
    label: String,
    #[serde(default)]
    start: Option<u64>,
    #[serde(default)]
    end: Option<u64>,
    #[serde(default)]
    values: Option<Vec<u64>>,
    #[serde(default)]
    scale: Option<u64>,
}

impl AxisSection {
    fn into_axis(self) -> Result<Axis> {
        let scale = self.scale.unwrap_or(1);
        match (self.start, self.end, self.values) {
            (Some(start), Some(end), None) => {
                if start > end {
                    bail!("axis start {} is greater than end {}", start, end);
                }
                Ok(Axis::range(start, end, scale))
            }
            (None, None, Some(values)) => Ok(Axis::list(values, scale)),
            _ => Err(anyhow!("axis needs either `start` and `end`, or `values`")),
        }
    }
}

impl OuterSection {
    fn into_outer(self) -> Result<OuterAxis> {
        let axis = AxisSection {
            start: self.start,
            end: self.end,
            values: self.values,
            scale: self.scale,
        }
        .into_axis()
        .with_context(|| format!("outer axis '{}'", self.label))?;
        Ok(OuterAxis {
            label: self.label,
            axis,
        })
    }
}

impl ProfileSection {
    fn into_profile(self) -> Result<Profile> {
        // A profile with an outer axis passes it along unless told otherwise.
        let secondary = match self.secondary {
            Some(secondary) => secondary,
            None if self.outer.is_some() => SecondaryArg::Outer,
            None => SecondaryArg::None,
        };
        let profile = Profile {
            description: self.description.unwrap_or_default(),
            tests: self.tests,
            inner: self.inner.into_axis().context("inner axis")?,
            outer: self.outer.map(OuterSection::into_outer).transpose()?,
            secondary,
            repeats: self.repeats,
            line_style: self.line_style.unwrap_or_default(),
            name: self.name,
        };
        profile.validate()?;
        Ok(profile)
    }
}

/// Parse and validate every `[[profile]]` table in `text`.
pub fn parse_profiles(text: &str) -> Result<Vec<Profile>> {
    let file: ProfileFile = toml::from_str(text).context("parse profile TOML")?;
    let mut seen = HashSet::new();
    let mut profiles = Vec::with_capacity(file.profiles.len());
    for section in file.profiles {
        let name = section.name.clone();
        if !seen.insert(name.clone()) {
            bail!("profile '{}' is defined more than once", name);
        }
        let profile = section
            .into_profile()
            .with_context(|| format!("invalid profile '{}'", name))?;
        profiles.push(profile);
    }
    Ok(profiles)
}

pub fn load_profiles(path: &Path) -> Result<Vec<Profile>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_profiles(&text).with_context(|| format!("load profiles from {}", path.display()))
}

/// Look `name` up in `custom` first, then among the built-in profiles.
pub fn resolve_profile(name: &str, custom: &[Profile]) -> Result<Profile> {
    if let Some(profile) = custom.iter().find(|p| p.name == name) {
        return Ok(profile.clone());
    }
    if let Some(profile) = Profile::builtin(name) {
        return Ok(profile);
    }
    let mut known: Vec<String> = custom.iter().map(|p| p.name.clone()).collect();
    for builtin in Profile::builtins() {
        if !known.contains(&builtin.name) {
            known.push(builtin.name);
        }
    }
    Err(anyhow!("unknown profile '{}' (available: {})", name, known.join(", ")))
}
