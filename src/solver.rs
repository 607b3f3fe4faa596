use log::{debug, info, trace};
use std::time::{Duration, Instant};

use crate::analysis::diagnose;
use crate::config::SolverConfig;
use crate::constraints::{calculate_score, score_of, summarize};
use crate::data::{SchedulingInput, SchedulingOutput};
use crate::defrag::{DefragReport, count_length_mismatches, defragment};
use crate::difficulty::difficulty_order;
use crate::error::SetupError;
use crate::filters::{self, CandidateMove};
use crate::schedule::{Schedule, ScoreDirector, change_timeslot};
use crate::score::HardSoftScore;

/// Score director that recalculates the full score lazily after a change.
///
/// The rules are pure functions of the schedule, so a recalculation is always exact.
#[derive(Debug)]
pub struct EasyScoreDirector {
    schedule: Schedule,
    score: HardSoftScore,
    dirty: bool,
    changes: u64,
}

impl EasyScoreDirector {
    pub fn new(schedule: Schedule) -> Self {
        let score = calculate_score(&schedule);
        Self {
            schedule,
            score,
            dirty: false,
            changes: 0,
        }
    }

    pub fn changes(&self) -> u64 {
        self.changes
    }

    pub fn into_schedule(self) -> Schedule {
        self.schedule
    }
}

impl ScoreDirector for EasyScoreDirector {
    fn working_schedule(&self) -> &Schedule {
        &self.schedule
    }

    fn working_schedule_mut(&mut self) -> &mut Schedule {
        &mut self.schedule
    }

    fn before_variable_changed(&mut self, _assignment: usize) {}

    fn after_variable_changed(&mut self, _assignment: usize) {
        self.changes += 1;
        self.dirty = true;
    }

    fn trigger_variable_listeners(&mut self) {}

    fn calculate_score(&mut self) -> HardSoftScore {
        if self.dirty {
            self.score = calculate_score(&self.schedule);
            self.dirty = false;
        }
        self.score
    }
}

/// Wall-clock limit shared by all phases of one solve.
#[derive(Debug, Clone, Copy)]
pub struct Termination {
    deadline: Instant,
}

impl Termination {
    pub fn after(limit: Duration) -> Self {
        Self {
            deadline: Instant::now() + limit,
        }
    }

    pub fn is_terminated(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Greedy initial placement of every unassigned, non-pinned block, hardest first.
///
/// Each block takes the slot with the best resulting score. Ties go to a slot of
/// the right length that the teacher can cover, then to catalog order.
pub fn construct<D>(director: &mut D, termination: &Termination) -> usize
where
    D: ScoreDirector + ?Sized,
{
    let order = difficulty_order(director.working_schedule());
    let slot_count = director.working_schedule().timeslots().len();
    let mut placed = 0;

    for assignment in order {
        if termination.is_terminated() {
            info!("Construction terminated early after placing {} blocks", placed);
            break;
        }
        let entity = &director.working_schedule().assignments()[assignment];
        if entity.pinned || entity.timeslot_id.is_some() {
            continue;
        }

        let mut best: Option<(HardSoftScore, bool, usize)> = None;
        for position in 0..slot_count {
            let schedule = director.working_schedule();
            let preferred = filters::accepts(
                schedule,
                &CandidateMove::Change {
                    assignment,
                    timeslot: Some(position),
                },
            );
            let slot_id = schedule.timeslots()[position].id.clone();

            change_timeslot(director, assignment, Some(slot_id));
            let score = director.calculate_score();
            if best.is_none_or(|(s, p, _)| (score, preferred) > (s, p)) {
                best = Some((score, preferred, position));
            }
        }

        let Some((_, _, position)) = best else {
            debug!("No timeslot to try for assignment {}", assignment);
            continue;
        };
        let chosen = director.working_schedule().timeslots()[position].id.clone();
        change_timeslot(director, assignment, Some(chosen));
        placed += 1;
        trace!(
            "Placed {}",
            director
                .working_schedule()
                .describe(&director.working_schedule().assignments()[assignment])
        );
    }

    info!(
        "Construction placed {} blocks, score {}",
        placed,
        director.calculate_score()
    );
    placed
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalSearchStats {
    pub evaluated: u64,
    pub improvements: u64,
}

/// Applies a move and returns the values needed to undo it.
fn apply_move<D>(director: &mut D, candidate: CandidateMove) -> Vec<(usize, Option<String>)>
where
    D: ScoreDirector + ?Sized,
{
    let schedule = director.working_schedule();
    let current = |i: usize| schedule.assignments()[i].timeslot_id.clone();
    let (undo, changes) = match candidate {
        CandidateMove::Change {
            assignment,
            timeslot,
        } => {
            let target = timeslot.map(|p| schedule.timeslots()[p].id.clone());
            (
                vec![(assignment, current(assignment))],
                vec![(assignment, target)],
            )
        }
        CandidateMove::Swap { left, right } => (
            vec![(left, current(left)), (right, current(right))],
            vec![(left, current(right)), (right, current(left))],
        ),
    };
    for (assignment, timeslot) in changes {
        change_timeslot(director, assignment, timeslot);
    }
    undo
}

/// Deterministic first-improvement hill climbing over change and swap moves.
///
/// Every candidate passes through the move filters before it is scored. Stops at
/// a local optimum, after `max_steps` evaluated moves, or when time runs out.
pub fn local_search<D>(director: &mut D, termination: &Termination, max_steps: u64) -> LocalSearchStats
where
    D: ScoreDirector + ?Sized,
{
    let mut stats = LocalSearchStats::default();
    let mut current = director.calculate_score();
    let assignment_count = director.working_schedule().assignments().len();
    let slot_count = director.working_schedule().timeslots().len();
    info!("Local search starting from {}", current);

    'search: loop {
        let mut improved = false;

        for assignment in 0..assignment_count {
            if director.working_schedule().assignments()[assignment].pinned {
                continue;
            }

            let changes = (0..slot_count).map(|p| CandidateMove::Change {
                assignment,
                timeslot: Some(p),
            });
            let swaps = (assignment + 1..assignment_count)
                .map(|other| CandidateMove::Swap {
                    left: assignment,
                    right: other,
                });

            for candidate in changes.chain(swaps) {
                if termination.is_terminated() || stats.evaluated >= max_steps {
                    break 'search;
                }
                let schedule = director.working_schedule();
                if !is_doable(schedule, &candidate) || !filters::accepts(schedule, &candidate) {
                    continue;
                }

                stats.evaluated += 1;
                let undo = apply_move(director, candidate);
                let score = director.calculate_score();
                if score > current {
                    debug!("Step {}: {:?} improves {} -> {}", stats.evaluated, candidate, current, score);
                    current = score;
                    stats.improvements += 1;
                    improved = true;
                } else {
                    for (position, timeslot) in undo {
                        change_timeslot(director, position, timeslot);
                    }
                }
            }
        }

        if !improved {
            break;
        }
    }

    info!(
        "Local search finished: {} moves evaluated, {} improvements, score {}",
        stats.evaluated, stats.improvements, current
    );
    stats
}

/// A move that would actually change something and touches no pinned entity.
fn is_doable(schedule: &Schedule, candidate: &CandidateMove) -> bool {
    let assignments = schedule.assignments();
    match *candidate {
        CandidateMove::Change {
            assignment,
            timeslot,
        } => {
            let target = timeslot.map(|p| &schedule.timeslots()[p].id);
            !assignments[assignment].pinned && assignments[assignment].timeslot_id.as_ref() != target
        }
        CandidateMove::Swap { left, right } => {
            !assignments[left].pinned
                && !assignments[right].pinned
                && assignments[left].timeslot_id != assignments[right].timeslot_id
        }
    }
}

fn build_output(schedule: Schedule, defragmentation: Option<DefragReport>) -> SchedulingOutput {
    let constraints = summarize(&schedule);
    let score = score_of(&constraints);
    let diagnostics = diagnose(&schedule);
    SchedulingOutput {
        assignments: schedule.into_assignments(),
        score,
        feasible: score.is_feasible(),
        constraints,
        defragmentation,
        diagnostics,
    }
}

/// Solves the block scheduling problem: construction, repair, then local search.
pub fn solve(input: &SchedulingInput, defaults: &SolverConfig) -> Result<SchedulingOutput, SetupError> {
    let start_time = Instant::now();
    let config = input.solver_config.as_ref().unwrap_or(defaults);
    let schedule = Schedule::from_input(input)?;

    info!(
        "Setting up block schedule with {} teachers, {} courses, {} rooms, {} groups, {} timeslots and {} assignments...",
        schedule.teachers().len(),
        schedule.courses().len(),
        schedule.rooms().len(),
        schedule.groups().len(),
        schedule.timeslots().len(),
        schedule.assignments().len()
    );

    let termination = Termination::after(Duration::from_secs(config.time_limit_secs));
    let mut director = EasyScoreDirector::new(schedule);

    if config.construction {
        construct(&mut director, &termination);
    }

    let defragmentation = config.defragmentation.then(|| {
        let report = defragment(&mut director, || termination.is_terminated());
        info!(
            "Length mismatches after repair: {}",
            count_length_mismatches(director.working_schedule())
        );
        report
    });

    if config.local_search {
        local_search(&mut director, &termination, config.max_local_search_steps);
    }

    info!(
        "Solution found in {:.2?} after {} changes, score {}",
        start_time.elapsed(),
        director.changes(),
        director.calculate_score()
    );
    Ok(build_output(director.into_schedule(), defragmentation))
}

/// Scores and diagnoses a schedule exactly as given.
pub fn analyze(input: &SchedulingInput) -> Result<SchedulingOutput, SetupError> {
    let schedule = Schedule::from_input(input)?;
    Ok(build_output(schedule, None))
}

/// Runs only the repair phase on the given schedule.
pub fn repair(input: &SchedulingInput, defaults: &SolverConfig) -> Result<SchedulingOutput, SetupError> {
    let config = input.solver_config.as_ref().unwrap_or(defaults);
    let termination = Termination::after(Duration::from_secs(config.time_limit_secs));
    let mut director = EasyScoreDirector::new(Schedule::from_input(input)?);
    let report = defragment(&mut director, || termination.is_terminated());
    Ok(build_output(director.into_schedule(), Some(report)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BlockTimeslot, Course, CourseBlockAssignment, Group, Room, Teacher, Weekday};
    use std::collections::{BTreeMap, BTreeSet};

    fn input() -> SchedulingInput {
        let days = [Weekday::Monday, Weekday::Tuesday];
        let mut availability = BTreeMap::new();
        for day in days {
            availability.insert(day, (8..14).collect::<BTreeSet<u32>>());
        }
        let mut timeslots = Vec::new();
        for day in days {
            for length in 1..=2 {
                for start in 8..(14 - length + 1) {
                    timeslots.push(BlockTimeslot {
                        id: format!("{}-{}-{}", day.short_name(), start, length),
                        day_of_week: day,
                        start_hour: start,
                        length_hours: length,
                    });
                }
            }
        }
        let block = |id: &str, group: &str, length: u32| CourseBlockAssignment {
            id: id.to_string(),
            group_id: group.to_string(),
            course_id: "math".to_string(),
            block_length: length,
            pinned: false,
            teacher_id: Some("t1".to_string()),
            timeslot_id: None,
            room_name: Some("R1".to_string()),
        };
        SchedulingInput {
            teachers: vec![Teacher {
                id: "t1".to_string(),
                name: "Ana".to_string(),
                qualified_courses: ["Math".to_string()].into_iter().collect(),
                availability,
                max_hours_per_week: 20,
            }],
            courses: vec![Course {
                id: "math".to_string(),
                name: "Math".to_string(),
                abbreviation: "MAT".to_string(),
                component: "BASICAS".to_string(),
                room_requirement: "standard".to_string(),
                required_hours_per_week: 3,
            }],
            rooms: vec![Room {
                name: "R1".to_string(),
                building: "A".to_string(),
                room_type: "standard".to_string(),
            }],
            groups: ["g1", "g2"]
                .iter()
                .map(|id| Group {
                    id: id.to_string(),
                    name: id.to_string(),
                    course_names: BTreeSet::new(),
                    preferred_room: None,
                })
                .collect(),
            timeslots,
            assignments: vec![
                block("g1-a", "g1", 2),
                block("g1-b", "g1", 1),
                block("g2-a", "g2", 2),
                block("g2-b", "g2", 1),
            ],
            solver_config: None,
        }
    }

    #[test]
    fn solve_places_everything_feasibly() {
        let output = solve(&input(), &SolverConfig::default()).unwrap();

        assert!(output.assignments.iter().all(|a| a.timeslot_id.is_some()));
        assert!(output.feasible, "score {}", output.score);
        assert!(output.diagnostics.length_mismatches.is_empty());
        assert_eq!(output.defragmentation.map(|r| r.total), Some(0));
    }

    #[test]
    fn construction_prefers_matching_lengths() {
        let schedule = Schedule::from_input(&input()).unwrap();
        let mut director = EasyScoreDirector::new(schedule);
        let placed = construct(&mut director, &Termination::after(Duration::from_secs(60)));

        assert_eq!(placed, 4);
        assert_eq!(count_length_mismatches(director.working_schedule()), 0);
        assert!(director.calculate_score().is_feasible());
    }

    #[test]
    fn local_search_never_moves_pinned_blocks() {
        let mut problem = input();
        problem.assignments[0].pinned = true;
        problem.assignments[0].timeslot_id = Some("Lun-12-2".to_string());
        let output = solve(&problem, &SolverConfig::default()).unwrap();
        assert_eq!(output.assignments[0].timeslot_id.as_deref(), Some("Lun-12-2"));
    }

    #[test]
    fn director_tracks_changes() {
        let schedule = Schedule::from_input(&input()).unwrap();
        let mut director = EasyScoreDirector::new(schedule);
        let before = director.calculate_score();
        assert!(change_timeslot(&mut director, 0, Some("Lun-8-2".to_string())));
        assert_eq!(director.changes(), 1);
        assert_eq!(director.calculate_score(), before);
    }

    #[test]
    fn construction_without_timeslots_changes_nothing() {
        let mut problem = input();
        problem.timeslots.clear();
        let mut director = EasyScoreDirector::new(Schedule::from_input(&problem).unwrap());

        let placed = construct(&mut director, &Termination::after(Duration::from_secs(60)));

        assert_eq!(placed, 0);
        assert_eq!(director.changes(), 0);
    }

    #[test]
    fn setup_errors_surface_before_solving() {
        let mut problem = input();
        problem.assignments[1].course_id = "history".to_string();
        let err = solve(&problem, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SetupError::UnknownReference { kind: "course", .. }));
    }
}
