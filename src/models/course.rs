//! Course and term data structures.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Outline;
use crate::schedule::ScheduleEntry;

/// Academic semester within a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    #[serde(rename = "1")]
    First,
    #[serde(rename = "2")]
    Second,
    #[serde(rename = "X")]
    Summer,
}

impl Semester {
    /// Code used by the remote service (`1`, `2`, or `X`).
    pub fn code(&self) -> &'static str {
        match self {
            Semester::First => "1",
            Semester::Second => "2",
            Semester::Summer => "X",
        }
    }
}

impl FromStr for Semester {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Semester::First),
            "2" => Ok(Semester::Second),
            "X" | "x" => Ok(Semester::Summer),
            other => Err(AppError::validation(format!(
                "invalid semester '{other}' (expected 1, 2, or X)"
            ))),
        }
    }
}

/// One academic term, e.g. `114-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub year: u16,
    pub semester: Semester,
}

impl Term {
    pub fn new(year: u16, semester: Semester) -> Self {
        Self { year, semester }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.semester.code())
    }
}

impl FromStr for Term {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, sem) = s
            .split_once('-')
            .ok_or_else(|| AppError::validation(format!("invalid term '{s}' (expected e.g. 114-1)")))?;
        let year = year
            .parse::<u16>()
            .map_err(|_| AppError::validation(format!("invalid term year in '{s}'")))?;
        Ok(Term::new(year, sem.parse()?))
    }
}

/// Enrollment headcount for a course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub limit: u32,
    pub current: u32,
}

/// A course discovered in a term's listings.
///
/// Created during discovery, mutated once when an outline is attached, never
/// deleted within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Identifier assigned by the remote service, unique within a term.
    pub id: String,
    pub name: String,
    pub teacher: String,
    pub credit: f64,
    pub hours: f64,
    #[serde(rename = "type")]
    pub course_type: String,
    pub enrollment: Enrollment,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
    pub english_taught: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Schedule source string exactly as the service sent it.
    pub raw_schedule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
}

impl Course {
    pub fn has_outline(&self) -> bool {
        self.outline.is_some()
    }
}
