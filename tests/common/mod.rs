#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use block_scheduler::constraints::summarize;
use block_scheduler::data::{
    BlockTimeslot, Course, CourseBlockAssignment, Group, Hour, Room, SchedulingInput, Teacher, Weekday,
};
use block_scheduler::schedule::Schedule;

pub const WEEK: [Weekday; 5] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
];

pub fn teacher(id: &str, qualified: &[&str], days: &[Weekday], hours: Range<Hour>) -> Teacher {
    Teacher {
        id: id.to_string(),
        name: id.to_uppercase(),
        qualified_courses: qualified.iter().map(|c| c.to_string()).collect(),
        availability: days
            .iter()
            .map(|&day| (day, hours.clone().collect::<BTreeSet<Hour>>()))
            .collect::<BTreeMap<_, _>>(),
        max_hours_per_week: 30,
    }
}

pub fn course(id: &str, name: &str, component: &str, requirement: &str) -> Course {
    Course {
        id: id.to_string(),
        name: name.to_string(),
        abbreviation: name.chars().take(3).collect::<String>().to_uppercase(),
        component: component.to_string(),
        room_requirement: requirement.to_string(),
        required_hours_per_week: 4,
    }
}

pub fn room(name: &str, room_type: &str) -> Room {
    Room {
        name: name.to_string(),
        building: "Main".to_string(),
        room_type: room_type.to_string(),
    }
}

pub fn group(id: &str) -> Group {
    Group {
        id: id.to_string(),
        name: format!("Group {}", id),
        course_names: BTreeSet::new(),
        preferred_room: None,
    }
}

pub fn slot_id(day: Weekday, start: Hour, length: u32) -> String {
    format!("{}-{}-{}", day.short_name(), start, length)
}

pub fn slot(day: Weekday, start: Hour, length: u32) -> BlockTimeslot {
    BlockTimeslot {
        id: slot_id(day, start, length),
        day_of_week: day,
        start_hour: start,
        length_hours: length,
    }
}

/// Every slot of every length in `lengths` that fits between `from` and `to` on each day.
pub fn catalog(days: &[Weekday], from: Hour, to: Hour, lengths: Range<u32>) -> Vec<BlockTimeslot> {
    let mut slots = Vec::new();
    for &day in days {
        for length in lengths.clone() {
            for start in from..=to.saturating_sub(length) {
                slots.push(slot(day, start, length));
            }
        }
    }
    slots
}

pub fn block(id: &str, group: &str, course: &str, length: u32) -> CourseBlockAssignment {
    CourseBlockAssignment {
        id: id.to_string(),
        group_id: group.to_string(),
        course_id: course.to_string(),
        block_length: length,
        pinned: false,
        teacher_id: None,
        timeslot_id: None,
        room_name: None,
    }
}

pub fn taught(mut assignment: CourseBlockAssignment, teacher: &str) -> CourseBlockAssignment {
    assignment.teacher_id = Some(teacher.to_string());
    assignment
}

pub fn in_room(mut assignment: CourseBlockAssignment, room: &str) -> CourseBlockAssignment {
    assignment.room_name = Some(room.to_string());
    assignment
}

pub fn at(mut assignment: CourseBlockAssignment, timeslot: &str) -> CourseBlockAssignment {
    assignment.timeslot_id = Some(timeslot.to_string());
    assignment
}

pub fn pinned(mut assignment: CourseBlockAssignment) -> CourseBlockAssignment {
    assignment.pinned = true;
    assignment
}

/// A small school: two teachers, a BASICAS and a specialised course, a
/// standard room and a lab, three groups, Monday to Friday 7-15.
pub fn school(assignments: Vec<CourseBlockAssignment>) -> SchedulingInput {
    SchedulingInput {
        teachers: vec![
            teacher("t1", &["Math", "Physics"], &WEEK, 7..15),
            teacher("t2", &["Programming"], &WEEK[..3], 8..14),
        ],
        courses: vec![
            course("math", "Math", "BASICAS", "standard"),
            course("phys", "Physics", "BASICAS", "standard"),
            course("prog", "Programming", "TECNICO", "lab"),
        ],
        rooms: vec![room("A1", "standard"), room("LAB", "lab")],
        groups: vec![group("g1"), group("g2"), group("g3")],
        timeslots: catalog(&WEEK, 7, 15, 1..5),
        assignments,
        solver_config: None,
    }
}

pub fn build(input: &SchedulingInput) -> Schedule {
    Schedule::from_input(input).unwrap()
}

pub fn match_count(schedule: &Schedule, rule: &str) -> usize {
    summarize(schedule)
        .into_iter()
        .find(|summary| summary.name == rule)
        .map(|summary| summary.match_count)
        .unwrap()
}
