//! Package versions and version constraints
//!
//! Versions are written the way package authors write them (`0.8.7`, `1.1`,
//! `1.1.pre`, `2.0.0-beta.1`) and normalised onto [`semver::Version`] for
//! ordering. The original text is kept for display so users see the version
//! exactly as published.
//!
//! Constraints are conjunctions of comparators:
//!
//! ```text
//! *               any version
//! 1.0.0           same as "= 1.0.0"
//! >= 0.5, < 1.0   conjunction
//! ~> 1.2          >= 1.2.0, < 2.0.0
//! ~> 1.2.3        >= 1.2.3, < 1.3.0
//! ```
//!
//! Prerelease eligibility is not decided here; see the resolver.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BpmError, Result};

/// A published package version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageVersion {
    raw: String,
    parsed: semver::Version,
    /// Number of numeric segments the author wrote (1..=3)
    segments: usize,
}

impl PackageVersion {
    /// Parse a version string, accepting 1-3 numeric segments and an optional
    /// prerelease suffix separated by `-` or `.`
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        let invalid = || BpmError::InvalidVersion {
            input: input.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid());
        }

        let (main, build) = match raw.split_once('+') {
            Some((main, build)) => (main, Some(build)),
            None => (raw, None),
        };

        let (core, pre) = match main.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => split_dotted_prerelease(main),
        };

        let numbers: Vec<&str> = core.split('.').collect();
        if numbers.is_empty()
            || numbers.len() > 3
            || numbers
                .iter()
                .any(|n| n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(invalid());
        }

        let mut normalised = (0..3)
            .map(|i| numbers.get(i).copied().unwrap_or("0"))
            .collect::<Vec<_>>()
            .join(".");
        if let Some(pre) = pre.filter(|p| !p.is_empty()) {
            normalised.push('-');
            normalised.push_str(&pre);
        }
        if let Some(build) = build {
            normalised.push('+');
            normalised.push_str(build);
        }

        let parsed = semver::Version::parse(&normalised).map_err(|_| invalid())?;
        Ok(Self {
            raw: raw.to_string(),
            parsed,
            segments: numbers.len(),
        })
    }

    /// Whether this version carries a prerelease tag
    pub fn is_prerelease(&self) -> bool {
        !self.parsed.pre.is_empty()
    }

    /// The version as originally written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Upper bound for the pessimistic operator: bump the second-to-last
    /// written segment and zero the rest
    fn pessimistic_upper(&self) -> semver::Version {
        let v = &self.parsed;
        match self.segments {
            0 | 1 | 2 => semver::Version::new(v.major + 1, 0, 0),
            _ => semver::Version::new(v.major, v.minor + 1, 0),
        }
    }
}

/// Splits `1.1.pre` into (`1.1`, `pre`): numeric segments first, the rest is
/// the prerelease tag
fn split_dotted_prerelease(input: &str) -> (&str, Option<String>) {
    let mut end = 0;
    for (index, segment) in input.split('.').enumerate() {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        end += segment.len() + usize::from(index > 0);
    }

    if end >= input.len() || end == 0 {
        (input, None)
    } else {
        (&input[..end], Some(input[end + 1..].to_string()))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.parsed == other.parsed
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parsed.hash(state);
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parsed.cmp(&other.parsed)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PackageVersion {
    type Err = BpmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageVersion {
    type Error = BpmError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PackageVersion> for String {
    fn from(value: PackageVersion) -> Self {
        value.raw
    }
}

/// Comparison operator of a single comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// `~>`
    Pessimistic,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Pessimistic => "~>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: PackageVersion,
}

impl Comparator {
    fn matches(&self, candidate: &PackageVersion) -> bool {
        let ordering = candidate.cmp(&self.version);
        match self.op {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Ge => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Le => ordering != Ordering::Greater,
            Op::Pessimistic => {
                ordering != Ordering::Less && candidate.parsed < self.version.pessimistic_upper()
            }
        }
    }
}

/// A version constraint: every comparator must hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Constraint {
    comparators: Vec<Comparator>,
}

impl Constraint {
    /// The constraint every version satisfies
    pub fn any() -> Self {
        Self {
            comparators: Vec::new(),
        }
    }

    /// `= version`
    pub fn exact(version: PackageVersion) -> Self {
        Self {
            comparators: vec![Comparator {
                op: Op::Eq,
                version,
            }],
        }
    }

    /// `>= version`
    pub fn at_least(version: PackageVersion) -> Self {
        Self {
            comparators: vec![Comparator {
                op: Op::Ge,
                version,
            }],
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::any());
        }

        let comparators = trimmed
            .split(',')
            .map(|part| parse_comparator(part.trim(), input))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { comparators })
    }

    /// Whether `version` satisfies every comparator
    pub fn matches(&self, version: &PackageVersion) -> bool {
        self.comparators.iter().all(|c| c.matches(version))
    }

    /// Whether any comparator names a prerelease version, which counts as an
    /// explicit opt-in to prereleases
    pub fn mentions_prerelease(&self) -> bool {
        self.comparators.iter().any(|c| c.version.is_prerelease())
    }
}

fn parse_comparator(part: &str, whole: &str) -> Result<Comparator> {
    const OPERATORS: [(&str, Op); 7] = [
        ("~>", Op::Pessimistic),
        (">=", Op::Ge),
        ("<=", Op::Le),
        ("!=", Op::Ne),
        ("=", Op::Eq),
        (">", Op::Gt),
        ("<", Op::Lt),
    ];

    let (op, rest) = OPERATORS
        .iter()
        .find_map(|(symbol, op)| part.strip_prefix(symbol).map(|rest| (*op, rest)))
        .unwrap_or((Op::Eq, part));

    let version = PackageVersion::parse(rest.trim()).map_err(|_| BpmError::InvalidConstraint {
        input: whole.to_string(),
    })?;

    Ok(Comparator { op, version })
}

impl Default for Constraint {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comparators.is_empty() {
            return f.write_str("*");
        }
        let parts: Vec<String> = self
            .comparators
            .iter()
            .map(|c| format!("{} {}", c.op.symbol(), c.version))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

impl FromStr for Constraint {
    type Err = BpmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Constraint {
    type Error = BpmError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Constraint> for String {
    fn from(value: Constraint) -> Self {
        value.to_string()
    }
}
