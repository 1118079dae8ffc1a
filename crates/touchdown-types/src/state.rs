// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Touchdown Kernel State, Mode and Action Types
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TouchdownError, TouchdownResult};

/// Number of scalars in a raw lander observation.
pub const OBSERVATION_LEN: usize = 8;

/// Decode a leg-contact sensor reading. NaN reads as "no contact".
#[inline]
fn contact_flag(value: f64) -> bool {
    value >= 0.5
}

/// Continuous lander state for a single control tick.
///
/// Layout matches the observation vector
/// `[x, y, vx, vy, angle, angular_velocity, left_leg, right_leg]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LanderState {
    /// Horizontal position relative to the pad centre.
    pub x: f64,
    /// Altitude above the pad.
    pub y: f64,
    pub vx: f64,
    /// Vertical velocity; negative while descending.
    pub vy: f64,
    /// Tilt in radians; zero is upright.
    pub angle: f64,
    pub angular_velocity: f64,
    pub left_leg_contact: bool,
    pub right_leg_contact: bool,
}

impl LanderState {
    /// Build a state from a raw observation slice.
    ///
    /// Contact sensors are read as `true` when `>= 0.5`. Any length other
    /// than [`OBSERVATION_LEN`] is rejected.
    pub fn from_observation(obs: &[f64]) -> TouchdownResult<Self> {
        let obs: &[f64; OBSERVATION_LEN] = obs.try_into().map_err(|_| {
            TouchdownError::Validation(format!(
                "observation must have {OBSERVATION_LEN} elements, got {}",
                obs.len()
            ))
        })?;
        Ok(Self::from(*obs))
    }

    /// Both legs report ground contact.
    pub fn both_legs_down(&self) -> bool {
        self.left_leg_contact && self.right_leg_contact
    }

    /// True when every continuous field is finite.
    pub fn is_finite(&self) -> bool {
        [
            self.x,
            self.y,
            self.vx,
            self.vy,
            self.angle,
            self.angular_velocity,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

impl From<[f64; OBSERVATION_LEN]> for LanderState {
    fn from(obs: [f64; OBSERVATION_LEN]) -> Self {
        let [x, y, vx, vy, angle, angular_velocity, left, right] = obs;
        Self {
            x,
            y,
            vx,
            vy,
            angle,
            angular_velocity,
            left_leg_contact: contact_flag(left),
            right_leg_contact: contact_flag(right),
        }
    }
}

/// Discrete control phase derived from the proposition set each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Not near the ground.
    Cruise,
    /// Near the ground, not yet aligned.
    Approach,
    /// Near the ground, over the pad, upright and slow.
    Align,
    /// Both legs in contact.
    Touchdown,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Cruise, Mode::Approach, Mode::Align, Mode::Touchdown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Cruise => "cruise",
            Mode::Approach => "approach",
            Mode::Align => "align",
            Mode::Touchdown => "touchdown",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actuator command understood by the environment.
///
/// Discriminants match the environment's discrete action indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Thruster {
    NoOp = 0,
    FireLeft = 1,
    FireMain = 2,
    FireRight = 3,
}

impl Thruster {
    pub const ALL: [Thruster; 4] = [
        Thruster::NoOp,
        Thruster::FireLeft,
        Thruster::FireMain,
        Thruster::FireRight,
    ];

    /// Environment action index.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Output flag name used by one-hot transition tables.
    pub fn flag_name(self) -> &'static str {
        match self {
            Thruster::NoOp => "no_op",
            Thruster::FireLeft => "fire_left",
            Thruster::FireMain => "fire_main",
            Thruster::FireRight => "fire_right",
        }
    }
}

impl FromStr for Thruster {
    type Err = TouchdownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_op" | "do_nothing" => Ok(Thruster::NoOp),
            "fire_left" => Ok(Thruster::FireLeft),
            "fire_main" => Ok(Thruster::FireMain),
            "fire_right" => Ok(Thruster::FireRight),
            other => Err(TouchdownError::Validation(format!(
                "unknown thruster flag '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Thruster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag_name())
    }
}

/// Controller output for one tick.
///
/// `Terminate` is a signal to the caller that a safe touchdown has been
/// reached. It has no actuator index and must never be forwarded to the
/// environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Actuate(Thruster),
    Terminate,
}

impl Action {
    pub const NO_OP: Action = Action::Actuate(Thruster::NoOp);

    pub fn is_terminate(&self) -> bool {
        matches!(self, Action::Terminate)
    }

    /// Thruster to forward to the environment, `None` for `Terminate`.
    pub fn thruster(&self) -> Option<Thruster> {
        match self {
            Action::Actuate(t) => Some(*t),
            Action::Terminate => None,
        }
    }
}

impl From<Thruster> for Action {
    fn from(t: Thruster) -> Self {
        Action::Actuate(t)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Actuate(t) => t.fmt(f),
            Action::Terminate => f.write_str("terminate"),
        }
    }
}
