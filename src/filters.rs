use crate::data::{BlockTimeslot, CourseBlockAssignment};
use crate::schedule::Schedule;

/// A move the optimizer may propose, expressed over assignment / catalog positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateMove {
    /// Set one assignment's time slot (`None` unassigns).
    Change {
        assignment: usize,
        timeslot: Option<usize>,
    },
    /// Exchange the time slots of two assignments.
    Swap { left: usize, right: usize },
}

/// A cheap structural guard consulted before a move is ever scored.
pub trait MoveFilter {
    fn accept(&self, schedule: &Schedule, candidate: &CandidateMove) -> bool;
}

fn teacher_can_take(
    schedule: &Schedule,
    assignment: &CourseBlockAssignment,
    timeslot: &BlockTimeslot,
) -> bool {
    schedule
        .teacher_of(assignment)
        .is_none_or(|teacher| teacher.is_available_for_block(timeslot))
}

/// Rejects change moves onto a slot whose length differs from the block length,
/// or onto a slot the assignment's teacher cannot cover. Other moves pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingLengthMoveFilter;

impl MoveFilter for MatchingLengthMoveFilter {
    fn accept(&self, schedule: &Schedule, candidate: &CandidateMove) -> bool {
        let CandidateMove::Change {
            assignment,
            timeslot: Some(timeslot),
        } = *candidate
        else {
            return true;
        };
        let (Some(assignment), Some(timeslot)) = (
            schedule.assignments().get(assignment),
            schedule.timeslots().get(timeslot),
        ) else {
            return true;
        };

        assignment.block_length == timeslot.length_hours
            && teacher_can_take(schedule, assignment, timeslot)
    }
}

/// Rejects swaps between blocks of different lengths, and swaps that would put
/// either teacher into a slot they cannot cover. Other moves pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingLengthSwapFilter;

impl MoveFilter for MatchingLengthSwapFilter {
    fn accept(&self, schedule: &Schedule, candidate: &CandidateMove) -> bool {
        let CandidateMove::Swap { left, right } = *candidate else {
            return true;
        };
        let (Some(left), Some(right)) = (
            schedule.assignments().get(left),
            schedule.assignments().get(right),
        ) else {
            return true;
        };

        if left.block_length != right.block_length {
            return false;
        }

        let (Some(left_slot), Some(right_slot)) =
            (schedule.timeslot_of(left), schedule.timeslot_of(right))
        else {
            return true;
        };

        teacher_can_take(schedule, left, right_slot) && teacher_can_take(schedule, right, left_slot)
    }
}

/// Both filters, as the local search consults them.
pub fn accepts(schedule: &Schedule, candidate: &CandidateMove) -> bool {
    MatchingLengthMoveFilter.accept(schedule, candidate)
        && MatchingLengthSwapFilter.accept(schedule, candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Course, Group, Teacher, Weekday};
    use std::collections::{BTreeMap, BTreeSet};

    fn fixture() -> Schedule {
        let mut availability = BTreeMap::new();
        availability.insert(Weekday::Monday, (8..12).collect::<BTreeSet<u32>>());
        let teacher = Teacher {
            id: "t1".to_string(),
            name: String::new(),
            qualified_courses: BTreeSet::new(),
            availability,
            max_hours_per_week: 20,
        };
        let course = Course {
            id: "c1".to_string(),
            name: "Math".to_string(),
            abbreviation: String::new(),
            component: "BASICAS".to_string(),
            room_requirement: "standard".to_string(),
            required_hours_per_week: 4,
        };
        let group = Group {
            id: "g1".to_string(),
            name: "1A".to_string(),
            course_names: BTreeSet::new(),
            preferred_room: None,
        };
        let slots = vec![
            (8, 2),
            (10, 2),
            (12, 2),
            (8, 1),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (start, length))| BlockTimeslot {
            id: format!("s{}", i),
            day_of_week: Weekday::Monday,
            start_hour: start,
            length_hours: length,
        })
        .collect();
        let assignment = |id: &str, length: u32, teacher: Option<&str>, slot: Option<&str>| {
            CourseBlockAssignment {
                id: id.to_string(),
                group_id: "g1".to_string(),
                course_id: "c1".to_string(),
                block_length: length,
                pinned: false,
                teacher_id: teacher.map(str::to_string),
                timeslot_id: slot.map(str::to_string),
                room_name: None,
            }
        };
        Schedule::new(
            vec![teacher],
            vec![course],
            vec![],
            vec![group],
            slots,
            vec![
                assignment("a0", 2, Some("t1"), Some("s0")),
                assignment("a1", 2, None, Some("s2")),
                assignment("a2", 1, None, Some("s3")),
                assignment("a3", 2, None, None),
            ],
        )
        .unwrap()
    }

    #[test]
    fn change_filter_checks_length_and_teacher() {
        let schedule = fixture();
        let change = |assignment, timeslot| CandidateMove::Change {
            assignment,
            timeslot: Some(timeslot),
        };
        assert!(MatchingLengthMoveFilter.accept(&schedule, &change(0, 1)));
        // teacher leaves at 12
        assert!(!MatchingLengthMoveFilter.accept(&schedule, &change(0, 2)));
        assert!(!MatchingLengthMoveFilter.accept(&schedule, &change(0, 3)));
        assert!(MatchingLengthMoveFilter.accept(&schedule, &change(1, 2)));
        assert!(MatchingLengthMoveFilter.accept(
            &schedule,
            &CandidateMove::Change {
                assignment: 0,
                timeslot: None
            }
        ));
        assert!(MatchingLengthMoveFilter.accept(&schedule, &CandidateMove::Swap { left: 0, right: 2 }));
    }

    #[test]
    fn swap_filter_checks_length_and_both_teachers() {
        let schedule = fixture();
        assert!(!MatchingLengthSwapFilter.accept(&schedule, &CandidateMove::Swap { left: 1, right: 2 }));
        // a0's teacher cannot take s2 (12-14)
        assert!(!MatchingLengthSwapFilter.accept(&schedule, &CandidateMove::Swap { left: 0, right: 1 }));
        // a1 has no teacher, so only the right-hand side can fail
        assert!(!MatchingLengthSwapFilter.accept(&schedule, &CandidateMove::Swap { left: 1, right: 0 }));
        // unassigned side passes once lengths agree
        assert!(MatchingLengthSwapFilter.accept(&schedule, &CandidateMove::Swap { left: 1, right: 3 }));
        assert!(accepts(
            &schedule,
            &CandidateMove::Change {
                assignment: 1,
                timeslot: Some(1)
            }
        ));
    }
}
