use log::{trace, warn};
use std::collections::HashMap;

use crate::data::{
    AssignmentId, BlockTimeslot, Course, CourseBlockAssignment, Group, MAX_BLOCK_LENGTH,
    MIN_BLOCK_LENGTH, Room, SchedulingInput, Teacher, TimeslotId,
};
use crate::error::SetupError;
use crate::score::HardSoftScore;

/// Capability of a decision entity: a pinned flag and a single mutable time-slot field.
pub trait PlanningEntity {
    fn planning_id(&self) -> &str;
    fn is_pinned(&self) -> bool;
    fn timeslot_id(&self) -> Option<&TimeslotId>;
    fn set_timeslot_id(&mut self, timeslot: Option<TimeslotId>);
}

impl PlanningEntity for CourseBlockAssignment {
    fn planning_id(&self) -> &str {
        &self.id
    }

    fn is_pinned(&self) -> bool {
        self.pinned
    }

    fn timeslot_id(&self) -> Option<&TimeslotId> {
        self.timeslot_id.as_ref()
    }

    fn set_timeslot_id(&mut self, timeslot: Option<TimeslotId>) {
        self.timeslot_id = timeslot;
    }
}

/// The optimizer's handle on the working schedule.
///
/// Any direct mutation of an assignment's time slot must be bracketed by
/// `before_variable_changed` / `after_variable_changed` and followed by
/// `trigger_variable_listeners`, so incremental bookkeeping stays valid.
/// Use [`change_timeslot`] rather than calling these by hand.
pub trait ScoreDirector {
    fn working_schedule(&self) -> &Schedule;
    fn working_schedule_mut(&mut self) -> &mut Schedule;
    fn before_variable_changed(&mut self, assignment: usize);
    fn after_variable_changed(&mut self, assignment: usize);
    fn trigger_variable_listeners(&mut self);
    fn calculate_score(&mut self) -> HardSoftScore;
}

/// Moves one assignment to `timeslot`, following the full notification protocol.
///
/// Pinned assignments are never touched; returns `false` for them.
pub fn change_timeslot<D>(director: &mut D, assignment: usize, timeslot: Option<TimeslotId>) -> bool
where
    D: ScoreDirector + ?Sized,
{
    let Some(entity) = director.working_schedule().assignments().get(assignment) else {
        warn!("Ignoring timeslot change for unknown assignment index {}", assignment);
        return false;
    };
    if entity.is_pinned() {
        warn!("Refusing to move pinned assignment {}", entity.planning_id());
        return false;
    }
    trace!(
        "Assignment {}: {:?} -> {:?}",
        entity.planning_id(),
        entity.timeslot_id(),
        timeslot
    );

    director.before_variable_changed(assignment);
    director
        .working_schedule_mut()
        .assignment_mut(assignment)
        .set_timeslot_id(timeslot);
    director.after_variable_changed(assignment);
    director.trigger_variable_listeners();
    true
}

/// The working schedule: read-only facts plus the decision entities.
///
/// All references are validated on construction, so a lookup returning `None`
/// only ever means the optional field was empty.
#[derive(Debug, Clone)]
pub struct Schedule {
    teachers: Vec<Teacher>,
    courses: Vec<Course>,
    rooms: Vec<Room>,
    groups: Vec<Group>,
    timeslots: Vec<BlockTimeslot>,
    assignments: Vec<CourseBlockAssignment>,
    teacher_index: HashMap<String, usize>,
    course_index: HashMap<String, usize>,
    room_index: HashMap<String, usize>,
    group_index: HashMap<String, usize>,
    timeslot_index: HashMap<String, usize>,
    assignment_index: HashMap<AssignmentId, usize>,
}

fn build_index<T>(
    items: &[T],
    kind: &'static str,
    key: impl Fn(&T) -> &str,
) -> Result<HashMap<String, usize>, SetupError> {
    let mut index = HashMap::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let id = key(item);
        if index.insert(id.to_string(), position).is_some() {
            return Err(SetupError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(index)
}

fn check_reference(
    index: &HashMap<String, usize>,
    assignment: &CourseBlockAssignment,
    kind: &'static str,
    id: &str,
) -> Result<(), SetupError> {
    if index.contains_key(id) {
        Ok(())
    } else {
        Err(SetupError::UnknownReference {
            assignment: assignment.id.clone(),
            kind,
            id: id.to_string(),
        })
    }
}

impl Schedule {
    pub fn new(
        teachers: Vec<Teacher>,
        courses: Vec<Course>,
        rooms: Vec<Room>,
        groups: Vec<Group>,
        timeslots: Vec<BlockTimeslot>,
        assignments: Vec<CourseBlockAssignment>,
    ) -> Result<Self, SetupError> {
        let teacher_index = build_index(&teachers, "teacher", |t| t.id.as_str())?;
        let course_index = build_index(&courses, "course", |c| c.id.as_str())?;
        let room_index = build_index(&rooms, "room", |r| r.name.as_str())?;
        let group_index = build_index(&groups, "group", |g| g.id.as_str())?;
        let timeslot_index = build_index(&timeslots, "timeslot", |t| t.id.as_str())?;
        let assignment_index = build_index(&assignments, "assignment", |a| a.id.as_str())?;

        for timeslot in &timeslots {
            if !(MIN_BLOCK_LENGTH..=MAX_BLOCK_LENGTH).contains(&timeslot.length_hours) {
                return Err(SetupError::InvalidTimeslotLength {
                    timeslot: timeslot.id.clone(),
                    length: timeslot.length_hours,
                });
            }
        }

        for group in &groups {
            if let Some(room) = &group.preferred_room {
                if !room_index.contains_key(room) {
                    return Err(SetupError::UnknownPreferredRoom {
                        group: group.id.clone(),
                        room: room.clone(),
                    });
                }
            }
        }

        for assignment in &assignments {
            if !(MIN_BLOCK_LENGTH..=MAX_BLOCK_LENGTH).contains(&assignment.block_length) {
                return Err(SetupError::InvalidBlockLength {
                    assignment: assignment.id.clone(),
                    length: assignment.block_length,
                });
            }
            check_reference(&group_index, assignment, "group", &assignment.group_id)?;
            check_reference(&course_index, assignment, "course", &assignment.course_id)?;
            if let Some(teacher) = &assignment.teacher_id {
                check_reference(&teacher_index, assignment, "teacher", teacher)?;
            }
            if let Some(timeslot) = &assignment.timeslot_id {
                check_reference(&timeslot_index, assignment, "timeslot", timeslot)?;
            }
            if let Some(room) = &assignment.room_name {
                check_reference(&room_index, assignment, "room", room)?;
            }
        }

        Ok(Self {
            teachers,
            courses,
            rooms,
            groups,
            timeslots,
            assignments,
            teacher_index,
            course_index,
            room_index,
            group_index,
            timeslot_index,
            assignment_index,
        })
    }

    pub fn from_input(input: &SchedulingInput) -> Result<Self, SetupError> {
        Self::new(
            input.teachers.clone(),
            input.courses.clone(),
            input.rooms.clone(),
            input.groups.clone(),
            input.timeslots.clone(),
            input.assignments.clone(),
        )
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// The time-slot catalog, in enumeration order.
    pub fn timeslots(&self) -> &[BlockTimeslot] {
        &self.timeslots
    }

    pub fn assignments(&self) -> &[CourseBlockAssignment] {
        &self.assignments
    }

    /// Mutable access to a single decision entity. Callers outside a score
    /// director should go through [`change_timeslot`].
    pub fn assignment_mut(&mut self, index: usize) -> &mut CourseBlockAssignment {
        &mut self.assignments[index]
    }

    pub fn into_assignments(self) -> Vec<CourseBlockAssignment> {
        self.assignments
    }

    pub fn teacher(&self, id: &str) -> Option<&Teacher> {
        self.teacher_index.get(id).map(|&i| &self.teachers[i])
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.course_index.get(id).map(|&i| &self.courses[i])
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.room_index.get(name).map(|&i| &self.rooms[i])
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.group_index.get(id).map(|&i| &self.groups[i])
    }

    pub fn timeslot(&self, id: &str) -> Option<&BlockTimeslot> {
        self.timeslot_index.get(id).map(|&i| &self.timeslots[i])
    }

    pub fn assignment_position(&self, id: &str) -> Option<usize> {
        self.assignment_index.get(id).copied()
    }

    pub fn teacher_of(&self, assignment: &CourseBlockAssignment) -> Option<&Teacher> {
        assignment.teacher_id.as_deref().and_then(|id| self.teacher(id))
    }

    pub fn course_of(&self, assignment: &CourseBlockAssignment) -> Option<&Course> {
        self.course(&assignment.course_id)
    }

    pub fn group_of(&self, assignment: &CourseBlockAssignment) -> Option<&Group> {
        self.group(&assignment.group_id)
    }

    pub fn room_of(&self, assignment: &CourseBlockAssignment) -> Option<&Room> {
        assignment.room_name.as_deref().and_then(|name| self.room(name))
    }

    pub fn timeslot_of(&self, assignment: &CourseBlockAssignment) -> Option<&BlockTimeslot> {
        assignment.timeslot_id.as_deref().and_then(|id| self.timeslot(id))
    }

    /// Assigned, non-matching block: the slot length differs from the block length.
    pub fn has_length_mismatch(&self, assignment: &CourseBlockAssignment) -> bool {
        self.timeslot_of(assignment)
            .is_some_and(|slot| slot.length_hours != assignment.block_length)
    }

    /// Assignments whose current block overlaps `timeslot`.
    pub fn overlapping<'a>(
        &'a self,
        timeslot: &'a BlockTimeslot,
    ) -> impl Iterator<Item = (usize, &'a CourseBlockAssignment)> + 'a {
        self.assignments
            .iter()
            .enumerate()
            .filter(move |(_, a)| self.timeslot_of(a).is_some_and(|slot| slot.overlaps(timeslot)))
    }

    /// Human-readable label used in diagnostics and logs.
    pub fn describe(&self, assignment: &CourseBlockAssignment) -> String {
        let group = self
            .group_of(assignment)
            .map_or(assignment.group_id.as_str(), |g| g.name.as_str());
        let course = self
            .course_of(assignment)
            .map_or(assignment.course_id.as_str(), |c| c.name.as_str());
        let slot = self
            .timeslot_of(assignment)
            .map_or_else(|| "UNASSIGNED".to_string(), |s| s.to_string());
        let teacher = self
            .teacher_of(assignment)
            .map_or("UNASSIGNED", |t| t.display_name());
        let room = assignment.room_name.as_deref().unwrap_or("UNASSIGNED");
        format!(
            "{} {} [{}] block={} ({}h) teacher={} room={}",
            assignment.id, group, course, slot, assignment.block_length, teacher, room
        )
    }
}
