use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;

use crate::analysis::Diagnostics;
use crate::config::SolverConfig;
use crate::constraints::RuleSummary;
use crate::defrag::DefragReport;
use crate::score::HardSoftScore;

// Type aliases for clarity
pub type TeacherId = String;
pub type CourseId = String;
pub type GroupId = String;
pub type RoomName = String;
pub type TimeslotId = String;
pub type AssignmentId = String;
pub type Hour = u32;

/// Course component tag for core subjects. Every other tag is "specialized".
pub const BASICAS: &str = "BASICAS";
pub const STANDARD_ROOM: &str = "standard";
pub const LAB_ROOM: &str = "lab";

/// Blocks span 1 to 4 contiguous hours.
pub const MIN_BLOCK_LENGTH: u32 = 1;
pub const MAX_BLOCK_LENGTH: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn short_name(self) -> &'static str {
        match self {
            Weekday::Monday => "Lun",
            Weekday::Tuesday => "Mar",
            Weekday::Wednesday => "Mie",
            Weekday::Thursday => "Jue",
            Weekday::Friday => "Vie",
            Weekday::Saturday => "Sab",
            Weekday::Sunday => "Dom",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A teacher with qualifications and explicit per-day hourly availability.
///
/// An hour missing from `availability` means unavailable; nothing is implied.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    #[serde(default)]
    pub name: String,
    pub qualified_courses: BTreeSet<String>,
    pub availability: BTreeMap<Weekday, BTreeSet<Hour>>,
    pub max_hours_per_week: u32,
}

impl Teacher {
    pub fn is_qualified_for(&self, course_name: &str) -> bool {
        self.qualified_courses.contains(course_name)
    }

    pub fn is_available_at(&self, day: Weekday, hour: Hour) -> bool {
        self.availability
            .get(&day)
            .is_some_and(|hours| hours.contains(&hour))
    }

    /// True when every hour in `hours` is available on `day`.
    pub fn is_available_during(&self, day: Weekday, hours: Range<Hour>) -> bool {
        hours.into_iter().all(|hour| self.is_available_at(day, hour))
    }

    pub fn is_available_for_block(&self, timeslot: &BlockTimeslot) -> bool {
        self.is_available_during(timeslot.day_of_week, timeslot.hours())
    }

    pub fn total_available_hours(&self) -> u32 {
        self.availability.values().map(|hours| hours.len() as u32).sum()
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

/// A course, tagged with the component that drives the time-of-day rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
    pub component: String,
    pub room_requirement: String,
    pub required_hours_per_week: u32,
}

impl Course {
    pub fn is_basicas(&self) -> bool {
        self.component == BASICAS
    }
}

/// A physical room. Rooms are keyed by name.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub name: RoomName,
    #[serde(default)]
    pub building: String,
    #[serde(rename = "type")]
    pub room_type: String,
}

impl Room {
    /// Exact tag match for `standard` and `lab`; any other requirement is never satisfiable.
    pub fn satisfies_requirement(&self, requirement: &str) -> bool {
        match requirement {
            STANDARD_ROOM | LAB_ROOM => self.room_type == requirement,
            _ => false,
        }
    }

    pub fn is_standard(&self) -> bool {
        self.room_type == STANDARD_ROOM
    }
}

/// A student group and the courses it is allowed to take.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub course_names: BTreeSet<String>,
    #[serde(default)]
    pub preferred_room: Option<RoomName>,
}

/// A catalog entry: `length_hours` contiguous hours starting at `start_hour` on one day.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTimeslot {
    pub id: TimeslotId,
    pub day_of_week: Weekday,
    pub start_hour: Hour,
    pub length_hours: u32,
}

impl BlockTimeslot {
    pub fn end_hour(&self) -> Hour {
        self.start_hour + self.length_hours
    }

    pub fn hours(&self) -> Range<Hour> {
        self.start_hour..self.end_hour()
    }

    /// Half-open interval intersection on the same weekday. Adjacent blocks do not overlap.
    pub fn overlaps(&self, other: &BlockTimeslot) -> bool {
        self.day_of_week == other.day_of_week
            && self.start_hour < other.end_hour()
            && other.start_hour < self.end_hour()
    }

    /// True when one block ends exactly where the other starts on the same day.
    pub fn is_adjacent_to(&self, other: &BlockTimeslot) -> bool {
        self.day_of_week == other.day_of_week
            && (self.end_hour() == other.start_hour || other.end_hour() == self.start_hour)
    }
}

impl fmt::Display for BlockTimeslot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{} ({}h)",
            self.day_of_week,
            self.start_hour,
            self.end_hour(),
            self.length_hours
        )
    }
}

/// The decision entity: one block of a course taught to a group.
///
/// Only `timeslot_id` is mutated while solving. Teacher and room are fixed inputs.
/// This is also the persisted/exported representation of an assignment.
/// Equality and hashing are by `id` alone.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBlockAssignment {
    pub id: AssignmentId,
    pub group_id: GroupId,
    pub course_id: CourseId,
    pub block_length: u32,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub timeslot_id: Option<TimeslotId>,
    #[serde(default)]
    pub room_name: Option<RoomName>,
}

impl PartialEq for CourseBlockAssignment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CourseBlockAssignment {}

impl Hash for CourseBlockAssignment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The complete input for the scheduling problem.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingInput {
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub timeslots: Vec<BlockTimeslot>,
    #[serde(default)]
    pub assignments: Vec<CourseBlockAssignment>,
    #[serde(default)]
    pub solver_config: Option<SolverConfig>,
}

/// The final output of the solver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingOutput {
    pub assignments: Vec<CourseBlockAssignment>,
    pub score: HardSoftScore,
    pub feasible: bool,
    pub constraints: Vec<RuleSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defragmentation: Option<DefragReport>,
    pub diagnostics: Diagnostics,
}
