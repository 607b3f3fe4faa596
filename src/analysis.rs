//! Diagnostics reported next to the scored rules. Nothing here affects the score.

use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;

use crate::constraints::day_gaps;
use crate::data::{BlockTimeslot, GroupId, Hour, LAB_ROOM, RoomName, TeacherId, TimeslotId, Weekday};
use crate::schedule::Schedule;

/// A block sitting in a slot of a different length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthMismatch {
    pub assignment: String,
    pub block_length: u32,
    pub timeslot: TimeslotId,
    pub timeslot_length: u32,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupIdleGap {
    pub group: GroupId,
    pub day: Weekday,
    pub start: Hour,
    pub end: Hour,
    pub hours: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherLoad {
    pub teacher: TeacherId,
    pub blocks: usize,
    pub assigned_hours: u32,
    pub max_hours: u32,
    pub available_hours: u32,
}

/// A movable block held outside its group's home room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferredRoomMismatch {
    pub assignment: String,
    pub group: GroupId,
    pub preferred: RoomName,
    pub assigned: RoomName,
}

/// Two movable blocks of one teacher on the same day in different buildings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherBuildingChange {
    pub teacher: TeacherId,
    pub day: Weekday,
    pub first: String,
    pub second: String,
    pub from_building: String,
    pub to_building: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub unassigned: Vec<String>,
    pub length_mismatches: Vec<LengthMismatch>,
    pub group_idle_gaps: Vec<GroupIdleGap>,
    pub teacher_loads: Vec<TeacherLoad>,
    pub preferred_room_mismatches: Vec<PreferredRoomMismatch>,
    pub teacher_building_changes: Vec<TeacherBuildingChange>,
}

pub fn diagnose(schedule: &Schedule) -> Diagnostics {
    Diagnostics {
        unassigned: schedule
            .assignments()
            .iter()
            .filter(|a| a.timeslot_id.is_none())
            .map(|a| a.id.clone())
            .collect(),
        length_mismatches: length_mismatches(schedule),
        group_idle_gaps: group_idle_gaps(schedule),
        teacher_loads: teacher_loads(schedule),
        preferred_room_mismatches: preferred_room_mismatches(schedule),
        teacher_building_changes: teacher_building_changes(schedule),
    }
}

pub fn length_mismatches(schedule: &Schedule) -> Vec<LengthMismatch> {
    schedule
        .assignments()
        .iter()
        .filter_map(|a| {
            let slot = schedule.timeslot_of(a)?;
            (slot.length_hours != a.block_length).then(|| LengthMismatch {
                assignment: a.id.clone(),
                block_length: a.block_length,
                timeslot: slot.id.clone(),
                timeslot_length: slot.length_hours,
                pinned: a.pinned,
            })
        })
        .collect()
}

/// Free hours between consecutive blocks of a group on one day, measured from
/// block end to next block start, the same way teacher idle gaps are.
pub fn group_idle_gaps(schedule: &Schedule) -> Vec<GroupIdleGap> {
    let by_group_day: HashMap<(GroupId, Weekday), Vec<&BlockTimeslot>> = schedule
        .assignments()
        .iter()
        .filter_map(|a| {
            let slot = schedule.timeslot_of(a)?;
            Some(((a.group_id.clone(), slot.day_of_week), slot))
        })
        .into_group_map();

    by_group_day
        .into_iter()
        .sorted_by(|(k1, _), (k2, _)| k1.cmp(k2))
        .flat_map(|((group, day), mut slots)| {
            slots.sort_by_key(|slot| slot.start_hour);
            day_gaps(&slots)
                .into_iter()
                .map(move |gap| GroupIdleGap {
                    group: group.clone(),
                    day,
                    start: gap.start,
                    end: gap.end,
                    hours: gap.hours(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn teacher_loads(schedule: &Schedule) -> Vec<TeacherLoad> {
    schedule
        .teachers()
        .iter()
        .map(|teacher| {
            let placed = schedule
                .assignments()
                .iter()
                .filter(|a| a.teacher_id.as_ref() == Some(&teacher.id) && a.timeslot_id.is_some())
                .collect::<Vec<_>>();
            TeacherLoad {
                teacher: teacher.id.clone(),
                blocks: placed.len(),
                assigned_hours: placed.iter().map(|a| a.block_length).sum(),
                max_hours: teacher.max_hours_per_week,
                available_hours: teacher.total_available_hours(),
            }
        })
        .collect()
}

/// Lab courses are expected away from the home room and are not reported.
pub fn preferred_room_mismatches(schedule: &Schedule) -> Vec<PreferredRoomMismatch> {
    schedule
        .assignments()
        .iter()
        .filter(|a| !a.pinned)
        .filter(|a| {
            schedule
                .course_of(a)
                .is_none_or(|course| course.room_requirement != LAB_ROOM)
        })
        .filter_map(|a| {
            let group = schedule.group_of(a)?;
            let preferred = group.preferred_room.as_ref()?;
            let assigned = a.room_name.as_ref()?;
            (assigned != preferred).then(|| PreferredRoomMismatch {
                assignment: a.id.clone(),
                group: group.id.clone(),
                preferred: preferred.clone(),
                assigned: assigned.clone(),
            })
        })
        .collect()
}

/// Every pair of same-day blocks of one teacher whose rooms sit in different
/// buildings. Rooms without a building are skipped.
pub fn teacher_building_changes(schedule: &Schedule) -> Vec<TeacherBuildingChange> {
    schedule
        .assignments()
        .iter()
        .filter(|a| !a.pinned)
        .filter_map(|a| {
            let teacher = a.teacher_id.as_ref()?;
            let slot = schedule.timeslot_of(a)?;
            let room = schedule.room_of(a)?;
            (!room.building.is_empty()).then_some((a, teacher, slot, room))
        })
        .tuple_combinations()
        .filter(|((_, t1, s1, r1), (_, t2, s2, r2))| {
            t1 == t2 && s1.day_of_week == s2.day_of_week && r1.building != r2.building
        })
        .map(|((a1, teacher, slot, r1), (a2, _, _, r2))| TeacherBuildingChange {
            teacher: teacher.clone(),
            day: slot.day_of_week,
            first: a1.id.clone(),
            second: a2.id.clone(),
            from_building: r1.building.clone(),
            to_building: r2.building.clone(),
        })
        .collect()
}
