use std::cmp::{Ordering, Reverse};

use crate::data::CourseBlockAssignment;
use crate::schedule::Schedule;

/// Total available hours of the assignment's teacher; no teacher sorts as unbounded.
fn teacher_scarcity(schedule: &Schedule, assignment: &CourseBlockAssignment) -> u64 {
    schedule
        .teacher_of(assignment)
        .map_or(u64::MAX, |teacher| u64::from(teacher.total_available_hours()))
}

/// Difficulty order for greedy construction: hardest first.
///
/// Scarce teachers first, then longer blocks, then group id, course id and
/// assignment id ascending so the order is total and reproducible.
pub fn compare_difficulty(
    schedule: &Schedule,
    a: &CourseBlockAssignment,
    b: &CourseBlockAssignment,
) -> Ordering {
    teacher_scarcity(schedule, a)
        .cmp(&teacher_scarcity(schedule, b))
        .then_with(|| Reverse(a.block_length).cmp(&Reverse(b.block_length)))
        .then_with(|| a.group_id.cmp(&b.group_id))
        .then_with(|| a.course_id.cmp(&b.course_id))
        .then_with(|| a.id.cmp(&b.id))
}

/// Assignment positions sorted hardest first.
pub fn difficulty_order(schedule: &Schedule) -> Vec<usize> {
    let assignments = schedule.assignments();
    let mut order: Vec<usize> = (0..assignments.len()).collect();
    order.sort_by(|&i, &j| compare_difficulty(schedule, &assignments[i], &assignments[j]));
    order
}
