//! Die-related types
//!
//! This module contains the six-sided die face, its presentation tables,
//! and the roll state shared between the arbiter and its visual sinks.

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;

use rand::Rng;

/// Number of faces on the die
pub const FACE_COUNT: u8 = 6;

/// A face value of a six-sided die. Only 1..=6 can be represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DieFace(u8);

impl DieFace {
    pub const ONE: DieFace = DieFace(1);
    pub const SIX: DieFace = DieFace(6);

    /// All faces in ascending order
    pub const ALL: [DieFace; 6] = [
        DieFace(1),
        DieFace(2),
        DieFace(3),
        DieFace(4),
        DieFace(5),
        DieFace(6),
    ];

    pub fn new(value: u8) -> Option<DieFace> {
        (1..=FACE_COUNT).contains(&value).then_some(DieFace(value))
    }

    /// Independent uniform draw over 1..=6
    pub fn roll(rng: &mut impl Rng) -> DieFace {
        DieFace(rng.gen_range(1..=FACE_COUNT))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Zero-based index for the fixed per-face tables
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Pip positions on a 3x3 grid as (row, column)
    pub fn pips(self) -> &'static [(u8, u8)] {
        PIP_LAYOUTS[self.index()]
    }

    /// Euler rotation (x, y, z radians) that turns this face toward the viewer
    pub fn orientation(self) -> [f32; 3] {
        FACE_ORIENTATIONS[self.index()]
    }
}

impl Default for DieFace {
    fn default() -> Self {
        DieFace::ONE
    }
}

impl fmt::Display for DieFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for DieFace {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DieFace::new(value).ok_or(value)
    }
}

const PIP_LAYOUTS: [&[(u8, u8)]; 6] = [
    &[(1, 1)],
    &[(0, 0), (2, 2)],
    &[(0, 0), (1, 1), (2, 2)],
    &[(0, 0), (0, 2), (2, 0), (2, 2)],
    &[(0, 0), (0, 2), (1, 1), (2, 0), (2, 2)],
    &[(0, 0), (0, 1), (0, 2), (2, 0), (2, 1), (2, 2)],
];

const FACE_ORIENTATIONS: [[f32; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, FRAC_PI_2, 0.0],
    [0.0, PI, 0.0],
    [0.0, -FRAC_PI_2, 0.0],
    [FRAC_PI_2, 0.0, 0.0],
    [-FRAC_PI_2, 0.0, 0.0],
];

/// Arbiter state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RollState {
    #[default]
    Idle,
    Rolling,
}

/// Where a roll request came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollTrigger {
    Shake,
    Manual,
}

impl RollTrigger {
    pub fn name(&self) -> &'static str {
        match self {
            RollTrigger::Shake => "shake",
            RollTrigger::Manual => "manual",
        }
    }
}

/// Result of a roll request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollOutcome {
    /// The arbiter was idle and a new sequence started
    Started,
    /// A sequence was already in flight; the trigger was dropped
    IgnoredRolling,
    /// The arbiter has been shut down
    IgnoredShutdown,
    /// Called outside an async runtime, so no sequence could be scheduled
    IgnoredNoRuntime,
}

impl RollOutcome {
    pub fn started(&self) -> bool {
        matches!(self, RollOutcome::Started)
    }
}

/// What a visual sink sees on every state change
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollSnapshot {
    pub displayed_value: DieFace,
    pub is_rolling: bool,
    pub completed_rolls: u64,
}

/// Roll state owned by a single arbiter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollSession {
    pub state: RollState,
    pub displayed_value: DieFace,
    pub completed_rolls: u64,
}

impl RollSession {
    pub fn snapshot(&self) -> RollSnapshot {
        RollSnapshot {
            displayed_value: self.displayed_value,
            is_rolling: self.state == RollState::Rolling,
            completed_rolls: self.completed_rolls,
        }
    }
}
