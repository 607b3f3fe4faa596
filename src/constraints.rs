use itertools::Itertools;
use log::trace;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::data::{BlockTimeslot, CourseBlockAssignment, Hour, Weekday};
use crate::schedule::Schedule;
use crate::score::HardSoftScore;

pub const TEACHER_QUALIFIED: &str = "Teacher must be qualified";
pub const TEACHER_AVAILABLE: &str = "Teacher must be available for entire block";
pub const NO_TEACHER_DOUBLE_BOOKING: &str = "No teacher double-booking";
pub const NO_ROOM_DOUBLE_BOOKING: &str = "No room double-booking";
pub const ROOM_TYPE_SATISFIES_REQUIREMENT: &str = "Room type must satisfy course requirement";
pub const NO_GROUP_CONFLICT: &str = "Group cannot have two courses at same time";
pub const NON_BASICAS_END_BY_2PM: &str = "Non-BASICAS courses must finish by 2pm";
pub const NON_STANDARD_ROOM_END_BY_1PM: &str = "Non-standard rooms must finish by 1pm";
pub const ONE_BLOCK_PER_COURSE_PER_DAY: &str = "Maximum 1 block per non-BASICAS course per group per day";
pub const BASICAS_SAME_DAY_CONSECUTIVE: &str = "BASICAS blocks on the same day must be consecutive";
pub const TEACHER_MAX_HOURS: &str = "Teacher exceeds max hours per week";
pub const TEACHER_IDLE_GAPS: &str = "Minimize teacher idle gaps (availability-aware)";

pub const NON_BASICAS_END_LIMIT: Hour = 14;
pub const NON_STANDARD_ROOM_END_LIMIT: Hour = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintLevel {
    Hard,
    Soft,
}

/// One penalised match of a rule, with the entities responsible for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintViolation {
    pub constraint_name: &'static str,
    pub weight: i64,
    pub entities: Vec<String>,
    pub description: String,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_name, self.description)
    }
}

/// A named, pure scoring rule over the whole schedule.
#[derive(Clone, Copy)]
pub struct Constraint {
    pub name: &'static str,
    pub level: ConstraintLevel,
    evaluator: fn(&Schedule, &'static str) -> Vec<ConstraintViolation>,
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("level", &self.level)
            .finish()
    }
}

impl Constraint {
    const fn hard(
        name: &'static str,
        evaluator: fn(&Schedule, &'static str) -> Vec<ConstraintViolation>,
    ) -> Self {
        Self {
            name,
            level: ConstraintLevel::Hard,
            evaluator,
        }
    }

    const fn soft(
        name: &'static str,
        evaluator: fn(&Schedule, &'static str) -> Vec<ConstraintViolation>,
    ) -> Self {
        Self {
            name,
            level: ConstraintLevel::Soft,
            evaluator,
        }
    }

    pub fn violations(&self, schedule: &Schedule) -> Vec<ConstraintViolation> {
        (self.evaluator)(schedule, self.name)
    }

    pub fn weight(&self, schedule: &Schedule) -> i64 {
        self.violations(schedule).iter().map(|v| v.weight).sum()
    }

    /// The (negative) score contribution of a given total weight.
    pub fn penalty(&self, weight: i64) -> HardSoftScore {
        match self.level {
            ConstraintLevel::Hard => HardSoftScore::of_hard(-weight),
            ConstraintLevel::Soft => HardSoftScore::of_soft(-weight),
        }
    }
}

static SCHOOL_CONSTRAINTS: [Constraint; 12] = [
    Constraint::hard(TEACHER_QUALIFIED, teacher_must_be_qualified),
    Constraint::hard(TEACHER_AVAILABLE, teacher_must_be_available),
    Constraint::hard(NO_TEACHER_DOUBLE_BOOKING, no_teacher_double_booking),
    Constraint::hard(NO_ROOM_DOUBLE_BOOKING, no_room_double_booking),
    Constraint::hard(ROOM_TYPE_SATISFIES_REQUIREMENT, room_type_must_satisfy_requirement),
    Constraint::hard(NO_GROUP_CONFLICT, group_cannot_have_two_courses_at_same_time),
    Constraint::hard(NON_BASICAS_END_BY_2PM, non_basicas_must_finish_by_2pm),
    Constraint::hard(NON_STANDARD_ROOM_END_BY_1PM, non_standard_rooms_must_finish_by_1pm),
    Constraint::hard(ONE_BLOCK_PER_COURSE_PER_DAY, one_block_per_course_per_group_per_day),
    Constraint::hard(BASICAS_SAME_DAY_CONSECUTIVE, basicas_same_day_blocks_consecutive),
    Constraint::soft(TEACHER_MAX_HOURS, teacher_max_hours_per_week),
    Constraint::soft(TEACHER_IDLE_GAPS, minimize_teacher_idle_gaps),
];

/// The full rule set, hard rules first.
pub fn school_constraints() -> &'static [Constraint] {
    &SCHOOL_CONSTRAINTS
}

/// Total score of the schedule under every rule.
pub fn calculate_score(schedule: &Schedule) -> HardSoftScore {
    let mut score = HardSoftScore::ZERO;
    for constraint in school_constraints() {
        score += constraint.penalty(constraint.weight(schedule));
    }
    score
}

/// Per-rule outcome, for diagnosis after a solve.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSummary {
    pub name: &'static str,
    pub level: ConstraintLevel,
    pub match_count: usize,
    pub weight: i64,
    pub violations: Vec<ConstraintViolation>,
}

pub fn summarize(schedule: &Schedule) -> Vec<RuleSummary> {
    school_constraints()
        .iter()
        .map(|constraint| {
            let violations = constraint.violations(schedule);
            let weight = violations.iter().map(|v| v.weight).sum();
            trace!("{}: {} matches, weight {}", constraint.name, violations.len(), weight);
            RuleSummary {
                name: constraint.name,
                level: constraint.level,
                match_count: violations.len(),
                weight,
                violations,
            }
        })
        .collect()
}

/// Score implied by a set of summaries, without re-evaluating the rules.
pub fn score_of(summaries: &[RuleSummary]) -> HardSoftScore {
    let mut score = HardSoftScore::ZERO;
    for summary in summaries {
        score += match summary.level {
            ConstraintLevel::Hard => HardSoftScore::of_hard(-summary.weight),
            ConstraintLevel::Soft => HardSoftScore::of_soft(-summary.weight),
        };
    }
    score
}

// ==================== HELPERS ====================

/// Assigned blocks, paired with their resolved time slot.
fn placed(schedule: &Schedule) -> impl Iterator<Item = (&CourseBlockAssignment, &BlockTimeslot)> {
    schedule
        .assignments()
        .iter()
        .filter_map(|a| schedule.timeslot_of(a).map(|slot| (a, slot)))
}

/// Placed blocks bucketed by `key`, buckets in key order, members in input order.
fn bucketed<'a, K, F>(
    schedule: &'a Schedule,
    key: F,
) -> Vec<(K, Vec<(&'a CourseBlockAssignment, &'a BlockTimeslot)>)>
where
    K: Eq + Hash + Ord,
    F: Fn(&'a CourseBlockAssignment, &'a BlockTimeslot) -> Option<K>,
{
    let buckets: HashMap<K, Vec<_>> = placed(schedule)
        .filter_map(|(a, slot)| key(a, slot).map(|k| (k, (a, slot))))
        .into_group_map();
    buckets
        .into_iter()
        .sorted_by(|(k1, _), (k2, _)| k1.cmp(k2))
        .collect()
}

/// Unordered pairs of placed blocks sharing `key` whose blocks overlap.
fn overlapping_pairs<'a, K, F>(
    schedule: &'a Schedule,
    name: &'static str,
    what: &str,
    key: F,
) -> Vec<ConstraintViolation>
where
    K: Eq + Hash + Ord + fmt::Display,
    F: Fn(&'a CourseBlockAssignment, &'a BlockTimeslot) -> Option<K>,
{
    let mut violations = Vec::new();
    for (shared, members) in bucketed(schedule, key) {
        for ((a1, s1), (a2, s2)) in members.iter().tuple_combinations() {
            if s1.overlaps(s2) {
                violations.push(pair_violation(
                    schedule,
                    name,
                    a1,
                    a2,
                    format!("{} {} booked twice", what, shared),
                ));
            }
        }
    }
    violations
}

fn single_violation(
    schedule: &Schedule,
    name: &'static str,
    assignment: &CourseBlockAssignment,
    reason: String,
) -> ConstraintViolation {
    ConstraintViolation {
        constraint_name: name,
        weight: 1,
        entities: vec![assignment.id.clone()],
        description: format!("{} ({})", schedule.describe(assignment), reason),
    }
}

fn pair_violation(
    schedule: &Schedule,
    name: &'static str,
    a1: &CourseBlockAssignment,
    a2: &CourseBlockAssignment,
    reason: String,
) -> ConstraintViolation {
    ConstraintViolation {
        constraint_name: name,
        weight: 1,
        entities: vec![a1.id.clone(), a2.id.clone()],
        description: format!(
            "{}  <->  {} ({})",
            schedule.describe(a1),
            schedule.describe(a2),
            reason
        ),
    }
}

/// A free stretch between two consecutive blocks of the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayGap {
    pub before: usize,
    pub after: usize,
    pub start: Hour,
    pub end: Hour,
}

impl DayGap {
    pub fn hours(&self) -> u32 {
        self.end - self.start
    }
}

/// Gaps between adjacent blocks of one day, measured from the earlier block's
/// end to the later block's start. `blocks` must be sorted by start hour.
/// Overlapping or touching neighbours produce no gap.
pub fn day_gaps(blocks: &[&BlockTimeslot]) -> Vec<DayGap> {
    blocks
        .iter()
        .enumerate()
        .tuple_windows()
        .filter_map(|((i, prev), (j, next))| {
            (next.start_hour > prev.end_hour()).then(|| DayGap {
                before: i,
                after: j,
                start: prev.end_hour(),
                end: next.start_hour,
            })
        })
        .collect()
}

// ==================== HARD CONSTRAINTS ====================

fn teacher_must_be_qualified(schedule: &Schedule, name: &'static str) -> Vec<ConstraintViolation> {
    schedule
        .assignments()
        .iter()
        .filter_map(|a| {
            let teacher = schedule.teacher_of(a)?;
            let course = schedule.course_of(a)?;
            (!teacher.is_qualified_for(&course.name)).then(|| {
                single_violation(
                    schedule,
                    name,
                    a,
                    format!("{} is not qualified for {}", teacher.display_name(), course.name),
                )
            })
        })
        .collect()
}

fn teacher_must_be_available(schedule: &Schedule, name: &'static str) -> Vec<ConstraintViolation> {
    placed(schedule)
        .filter_map(|(a, slot)| {
            let teacher = schedule.teacher_of(a)?;
            (!teacher.is_available_for_block(slot)).then(|| {
                single_violation(
                    schedule,
                    name,
                    a,
                    format!("{} unavailable during {}", teacher.display_name(), slot),
                )
            })
        })
        .collect()
}

fn no_teacher_double_booking(schedule: &Schedule, name: &'static str) -> Vec<ConstraintViolation> {
    overlapping_pairs(schedule, name, "teacher", |a, _| a.teacher_id.clone())
}

fn no_room_double_booking(schedule: &Schedule, name: &'static str) -> Vec<ConstraintViolation> {
    overlapping_pairs(schedule, name, "room", |a, _| a.room_name.clone())
}

fn room_type_must_satisfy_requirement(
    schedule: &Schedule,
    name: &'static str,
) -> Vec<ConstraintViolation> {
    schedule
        .assignments()
        .iter()
        .filter_map(|a| {
            let room = schedule.room_of(a)?;
            let course = schedule.course_of(a)?;
            (!room.satisfies_requirement(&course.room_requirement)).then(|| {
                single_violation(
                    schedule,
                    name,
                    a,
                    format!(
                        "room type '{}' does not satisfy '{}'",
                        room.room_type, course.room_requirement
                    ),
                )
            })
        })
        .collect()
}

fn group_cannot_have_two_courses_at_same_time(
    schedule: &Schedule,
    name: &'static str,
) -> Vec<ConstraintViolation> {
    overlapping_pairs(schedule, name, "group", |a, _| Some(a.group_id.clone()))
}

fn non_basicas_must_finish_by_2pm(
    schedule: &Schedule,
    name: &'static str,
) -> Vec<ConstraintViolation> {
    placed(schedule)
        .filter(|(a, _)| !a.pinned)
        .filter_map(|(a, slot)| {
            let course = schedule.course_of(a)?;
            (!course.is_basicas() && slot.end_hour() > NON_BASICAS_END_LIMIT).then(|| {
                single_violation(schedule, name, a, format!("ends at {}:00", slot.end_hour()))
            })
        })
        .collect()
}

fn non_standard_rooms_must_finish_by_1pm(
    schedule: &Schedule,
    name: &'static str,
) -> Vec<ConstraintViolation> {
    placed(schedule)
        .filter(|(a, _)| !a.pinned)
        .filter_map(|(a, slot)| {
            let room = schedule.room_of(a)?;
            (!room.is_standard() && slot.end_hour() > NON_STANDARD_ROOM_END_LIMIT).then(|| {
                single_violation(
                    schedule,
                    name,
                    a,
                    format!("{} room ends at {}:00", room.room_type, slot.end_hour()),
                )
            })
        })
        .collect()
}

fn one_block_per_course_per_group_per_day(
    schedule: &Schedule,
    name: &'static str,
) -> Vec<ConstraintViolation> {
    let buckets = bucketed(schedule, |a, slot| {
        let course = schedule.course_of(a)?;
        (!course.is_basicas()).then(|| (a.group_id.clone(), a.course_id.clone(), slot.day_of_week))
    });

    buckets
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|((group, course, day), members)| ConstraintViolation {
            constraint_name: name,
            weight: members.len() as i64 - 1,
            entities: members.iter().map(|(a, _)| a.id.clone()).collect(),
            description: format!(
                "group {} has {} blocks of course {} on {}: {}",
                group,
                members.len(),
                course,
                day,
                members.iter().map(|(a, _)| schedule.describe(a)).join("; ")
            ),
        })
        .collect()
}

fn basicas_same_day_blocks_consecutive(
    schedule: &Schedule,
    name: &'static str,
) -> Vec<ConstraintViolation> {
    let buckets = bucketed(schedule, |a, slot| {
        let course = schedule.course_of(a)?;
        course
            .is_basicas()
            .then(|| (a.group_id.clone(), a.course_id.clone(), slot.day_of_week))
    });

    let mut violations = Vec::new();
    for (_, members) in buckets {
        for ((a1, s1), (a2, s2)) in members.iter().tuple_combinations() {
            if !s1.is_adjacent_to(s2) {
                violations.push(pair_violation(
                    schedule,
                    name,
                    a1,
                    a2,
                    "same-day blocks are not consecutive".to_string(),
                ));
            }
        }
    }
    violations
}

// ==================== SOFT CONSTRAINTS ====================

fn teacher_max_hours_per_week(schedule: &Schedule, name: &'static str) -> Vec<ConstraintViolation> {
    let buckets = bucketed(schedule, |a, _| a.teacher_id.clone());

    buckets
        .into_iter()
        .filter_map(|(teacher_id, members)| {
            let teacher = schedule.teacher(&teacher_id)?;
            let total: u32 = members.iter().map(|(a, _)| a.block_length).sum();
            (total > teacher.max_hours_per_week).then(|| {
                let excess = total - teacher.max_hours_per_week;
                ConstraintViolation {
                    constraint_name: name,
                    weight: i64::from(excess),
                    entities: vec![teacher_id.clone()],
                    description: format!(
                        "{}: assigned={} hours, max={} hours, excess={} hours",
                        teacher.display_name(),
                        total,
                        teacher.max_hours_per_week,
                        excess
                    ),
                }
            })
        })
        .collect()
}

fn minimize_teacher_idle_gaps(schedule: &Schedule, name: &'static str) -> Vec<ConstraintViolation> {
    let buckets = bucketed(schedule, |a, slot| {
        a.teacher_id.clone().map(|t| (t, slot.day_of_week))
    });

    let mut violations = Vec::new();
    for ((teacher_id, day), mut members) in buckets {
        let Some(teacher) = schedule.teacher(&teacher_id) else {
            continue;
        };
        members.sort_by(|(a1, s1), (a2, s2)| {
            s1.start_hour.cmp(&s2.start_hour).then_with(|| a1.id.cmp(&a2.id))
        });
        let slots: Vec<&BlockTimeslot> = members.iter().map(|(_, slot)| *slot).collect();

        for gap in day_gaps(&slots) {
            if !teacher.is_available_during(day, gap.start..gap.end) {
                continue;
            }
            let (before, _) = members[gap.before];
            let (after, _) = members[gap.after];
            violations.push(ConstraintViolation {
                constraint_name: name,
                weight: i64::from(gap.hours()),
                entities: vec![before.id.clone(), after.id.clone()],
                description: idle_gap_description(teacher.display_name(), day, &gap),
            });
        }
    }
    violations
}

fn idle_gap_description(who: &str, day: Weekday, gap: &DayGap) -> String {
    format!(
        "{} idle on {} {}-{} (gap={} hours)",
        who,
        day,
        gap.start,
        gap.end,
        gap.hours()
    )
}
