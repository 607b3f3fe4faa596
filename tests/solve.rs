mod common;

use block_scheduler::config::SolverConfig;
use block_scheduler::constraints::ConstraintLevel;
use block_scheduler::data::SchedulingInput;
use block_scheduler::solver;
use common::*;

fn week_problem() -> SchedulingInput {
    school(vec![
        in_room(taught(block("g1-math-1", "g1", "math", 2), "t1"), "A1"),
        in_room(taught(block("g1-math-2", "g1", "math", 2), "t1"), "A1"),
        in_room(taught(block("g1-prog", "g1", "prog", 2), "t2"), "LAB"),
        in_room(taught(block("g2-math", "g2", "math", 2), "t1"), "A1"),
        in_room(taught(block("g2-phys", "g2", "phys", 1), "t1"), "A1"),
        in_room(taught(block("g3-prog", "g3", "prog", 1), "t2"), "LAB"),
        pinned(at(
            in_room(taught(block("g3-phys", "g3", "phys", 1), "t1"), "A1"),
            "Jue-8-1",
        )),
    ])
}

#[test]
fn solves_a_small_week_feasibly() {
    let output = solver::solve(&week_problem(), &SolverConfig::default()).unwrap();

    assert!(output.feasible, "{:#?}", output.constraints);
    assert!(output.score.is_feasible());
    assert!(output.diagnostics.unassigned.is_empty());
    assert!(output.diagnostics.length_mismatches.is_empty());
    assert!(
        output
            .constraints
            .iter()
            .filter(|rule| rule.level == ConstraintLevel::Hard)
            .all(|rule| rule.match_count == 0)
    );
}

#[test]
fn pinned_blocks_keep_their_slot() {
    let output = solver::solve(&week_problem(), &SolverConfig::default()).unwrap();
    let pinned = output
        .assignments
        .iter()
        .find(|a| a.id == "g3-phys")
        .unwrap();
    assert_eq!(pinned.timeslot_id.as_deref(), Some("Jue-8-1"));
}

#[test]
fn disabled_phases_leave_the_input_alone() {
    let mut input = week_problem();
    input.solver_config = Some(SolverConfig {
        construction: false,
        defragmentation: false,
        local_search: false,
        ..SolverConfig::default()
    });

    let output = solver::solve(&input, &SolverConfig::default()).unwrap();

    assert!(output.defragmentation.is_none());
    assert_eq!(output.diagnostics.unassigned.len(), 6);
}

#[test]
fn analyze_reports_what_is_there() {
    let input = school(vec![
        at(in_room(taught(block("a", "g1", "math", 2), "t1"), "A1"), "Lun-8-1"),
        at(in_room(taught(block("b", "g1", "math", 1), "t1"), "A1"), "Lun-11-1"),
    ]);

    let output = solver::analyze(&input).unwrap();

    assert_eq!(output.diagnostics.length_mismatches.len(), 1);
    assert_eq!(output.diagnostics.length_mismatches[0].assignment, "a");
    assert_eq!(output.diagnostics.group_idle_gaps.len(), 1);
    assert_eq!(output.diagnostics.group_idle_gaps[0].hours, 2);
    assert!(output.defragmentation.is_none());
    assert_eq!(output.assignments[0].timeslot_id.as_deref(), Some("Lun-8-1"));
}
