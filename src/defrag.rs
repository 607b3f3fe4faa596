//! Repair phase run once after construction.
//!
//! Construction can leave a block in a slot of the wrong length when every
//! slot of the right length was already taken by smaller blocks. This phase
//! finds such blocks, looks for a slot of the right length whose occupants can
//! all be moved elsewhere, moves them, and then places the block.
//!
//! Relocation only looks at length, overlap (group, room, teacher) and teacher
//! availability. Any other rule disturbed along the way is left to local search.

use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::data::{BlockTimeslot, CourseBlockAssignment, TimeslotId};
use crate::schedule::{Schedule, ScoreDirector, change_timeslot};

/// One timeslot change applied by the phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relocation {
    pub assignment: String,
    pub from: Option<TimeslotId>,
    pub to: TimeslotId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefragReport {
    pub total: usize,
    pub fixed: usize,
    pub unresolved: Vec<String>,
    pub relocations: Vec<Relocation>,
    pub terminated_early: bool,
}

/// Runs the phase against the director's working schedule.
///
/// `is_terminated` is polled once before each violation. Work already applied
/// stays applied when it returns `true`.
pub fn defragment<D, T>(director: &mut D, mut is_terminated: T) -> DefragReport
where
    D: ScoreDirector + ?Sized,
    T: FnMut() -> bool,
{
    info!("=== Starting defragmentation phase ===");

    let violations = find_violations(director.working_schedule());
    let mut report = DefragReport {
        total: violations.len(),
        ..DefragReport::default()
    };
    info!("Found {} violations to fix", violations.len());

    if violations.is_empty() {
        info!("No violations found. Defragmentation phase complete.");
        return report;
    }

    for &violation in &violations {
        if is_terminated() {
            info!(
                "Phase terminated early. Fixed {}/{} violations.",
                report.fixed, report.total
            );
            report.terminated_early = true;
            break;
        }

        let schedule = director.working_schedule();
        let assignment = &schedule.assignments()[violation];

        // an earlier repair may already have moved this block
        if !schedule.has_length_mismatch(assignment) {
            debug!("{} no longer mismatched", assignment.id);
            report.fixed += 1;
            continue;
        }

        info!(
            "Attempting to fix: {} (block_length={}, timeslot_length={})",
            schedule.describe(assignment),
            assignment.block_length,
            schedule
                .timeslot_of(assignment)
                .map_or(0, |slot| slot.length_hours)
        );

        let Some((target, plan)) = find_suitable_slot(schedule, violation) else {
            warn!("No suitable slot found for {}", assignment.id);
            report.unresolved.push(assignment.id.clone());
            continue;
        };
        let target_slot = schedule.timeslots()[target].clone();
        info!("Found suitable slot: {}", target_slot);

        clear_space(director, &plan, &mut report);
        apply(director, violation, &target_slot, &mut report);
        report.fixed += 1;
        info!(
            "Successfully fixed violation {}/{}",
            report.fixed, report.total
        );
    }

    info!(
        "=== Defragmentation phase complete: fixed {}/{} violations ===",
        report.fixed, report.total
    );
    report
}

/// Non-pinned, placed assignments whose slot length differs from their block
/// length, longest blocks first.
pub fn find_violations(schedule: &Schedule) -> Vec<usize> {
    let mut violations: Vec<usize> = schedule
        .assignments()
        .iter()
        .enumerate()
        .filter(|(_, a)| !a.pinned && schedule.has_length_mismatch(a))
        .map(|(i, _)| i)
        .collect();
    let assignments = schedule.assignments();
    violations.sort_by(|&i, &j| assignments[j].block_length.cmp(&assignments[i].block_length));
    violations
}

/// Number of outstanding length mismatches, pinned or not.
pub fn count_length_mismatches(schedule: &Schedule) -> usize {
    schedule
        .assignments()
        .iter()
        .filter(|a| schedule.has_length_mismatch(a))
        .count()
}

/// First catalog slot of the right length that the violation can be moved into,
/// with the relocations that clear it.
fn find_suitable_slot(schedule: &Schedule, violation: usize) -> Option<(usize, Vec<(usize, usize)>)> {
    let assignment = &schedule.assignments()[violation];
    let candidates = schedule
        .timeslots()
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.length_hours == assignment.block_length);

    debug!(
        "Checking candidate timeslots with length {}",
        assignment.block_length
    );
    for (position, candidate) in candidates {
        if let Some(plan) = plan_relocations(schedule, violation, candidate) {
            return Some((position, plan));
        }
    }
    None
}

/// Blocker moves, as `(assignment, timeslot)` positions, that empty `candidate`
/// for the violation. Blockers are placed one after another on a scratch copy,
/// so no two of them are sent to the same free slot. `None` when the slot
/// cannot be cleared.
fn plan_relocations(schedule: &Schedule, violation: usize, candidate: &BlockTimeslot) -> Option<Vec<(usize, usize)>> {
    let assignment = &schedule.assignments()[violation];

    if let Some(teacher) = schedule.teacher_of(assignment) {
        if !teacher.is_available_for_block(candidate) {
            debug!("  x {} not available at {}", teacher.id, candidate);
            return None;
        }
    }

    let conflicts = find_conflicts(schedule, violation, candidate);
    if conflicts.is_empty() {
        debug!("  ok {}: free", candidate);
        return Some(Vec::new());
    }
    if conflicts.iter().any(|&conflict| schedule.assignments()[conflict].pinned) {
        debug!("  x pinned conflict at {}", candidate);
        return None;
    }

    let mut scratch = schedule.clone();
    let mut plan = Vec::with_capacity(conflicts.len());
    for conflict in conflicts {
        let Some(alternative) = find_alternative_slot(&scratch, conflict, candidate) else {
            debug!("  x cannot move {} away from {}", scratch.assignments()[conflict].id, candidate);
            return None;
        };
        let slot_id = scratch.timeslots()[alternative].id.clone();
        scratch.assignment_mut(conflict).timeslot_id = Some(slot_id);
        plan.push((conflict, alternative));
    }

    debug!("  ok {}: {} conflicts can be moved", candidate, plan.len());
    Some(plan)
}

/// True when two assignments compete for the same group, room or teacher.
fn shares_resource(a: &CourseBlockAssignment, b: &CourseBlockAssignment) -> bool {
    a.group_id == b.group_id
        || (a.room_name.is_some() && a.room_name == b.room_name)
        || (a.teacher_id.is_some() && a.teacher_id == b.teacher_id)
}

/// Assignments that would overlap `assignment` if it were placed at `timeslot`,
/// across group, room and teacher, excluding itself.
fn find_conflicts(schedule: &Schedule, assignment: usize, timeslot: &BlockTimeslot) -> BTreeSet<usize> {
    let subject = &schedule.assignments()[assignment];
    schedule
        .overlapping(timeslot)
        .filter(|&(i, other)| i != assignment && shares_resource(subject, other))
        .map(|(i, _)| i)
        .collect()
}

/// First slot of the blocking assignment's own length, other than its current
/// one and clear of `target`, where its teacher is available and it collides
/// with nothing else.
fn find_alternative_slot(schedule: &Schedule, blocking: usize, target: &BlockTimeslot) -> Option<usize> {
    let assignment = &schedule.assignments()[blocking];
    let teacher = schedule.teacher_of(assignment);

    schedule
        .timeslots()
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.length_hours == assignment.block_length)
        .filter(|(_, slot)| assignment.timeslot_id.as_ref() != Some(&slot.id))
        .filter(|(_, slot)| !slot.overlaps(target))
        .filter(|(_, slot)| teacher.is_none_or(|t| t.is_available_for_block(slot)))
        .find(|(_, slot)| find_conflicts(schedule, blocking, slot).is_empty())
        .map(|(position, _)| position)
}

/// Moves every blocker to the slot planned for it.
fn clear_space<D>(director: &mut D, plan: &[(usize, usize)], report: &mut DefragReport)
where
    D: ScoreDirector + ?Sized,
{
    debug!("  Clearing {} conflicts", plan.len());
    for &(conflict, alternative) in plan {
        let schedule = director.working_schedule();
        let alternative = schedule.timeslots()[alternative].clone();
        debug!(
            "    Moving {} to {}",
            schedule.describe(&schedule.assignments()[conflict]),
            alternative
        );
        apply(director, conflict, &alternative, report);
    }
}

fn apply<D>(director: &mut D, assignment: usize, timeslot: &BlockTimeslot, report: &mut DefragReport)
where
    D: ScoreDirector + ?Sized,
{
    let entity = &director.working_schedule().assignments()[assignment];
    let relocation = Relocation {
        assignment: entity.id.clone(),
        from: entity.timeslot_id.clone(),
        to: timeslot.id.clone(),
    };
    if change_timeslot(director, assignment, Some(timeslot.id.clone())) {
        report.relocations.push(relocation);
    }
}
