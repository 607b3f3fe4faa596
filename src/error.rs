use thiserror::Error;

/// Malformed problem input, detected before a solve starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("assignment '{assignment}' references unknown {kind} '{id}'")]
    UnknownReference {
        assignment: String,
        kind: &'static str,
        id: String,
    },

    #[error("group '{group}' prefers unknown room '{room}'")]
    UnknownPreferredRoom { group: String, room: String },

    #[error("assignment '{assignment}' has block length {length}, expected 1..=4")]
    InvalidBlockLength { assignment: String, length: u32 },

    #[error("timeslot '{timeslot}' has length {length}, expected 1..=4")]
    InvalidTimeslotLength { timeslot: String, length: u32 },
}
