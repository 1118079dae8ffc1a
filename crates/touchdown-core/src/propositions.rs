// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Proposition Extractor
// ─────────────────────────────────────────────────────────────────────
//! Maps continuous lander state to named boolean facts.
//!
//! Every magnitude test is written so that a NaN field yields `false`
//! ("condition not satisfied"): a corrupted reading never makes the lander
//! look safe, aligned or grounded.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use touchdown_types::{LanderState, LanderThresholds, TouchdownError, VerticalSpeedPolicy};

/// Named atomic proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proposition {
    #[serde(alias = "p")]
    OverPad,
    #[serde(alias = "q")]
    Upright,
    #[serde(alias = "r")]
    VelocitySafe,
    #[serde(alias = "a")]
    AngularVelocitySafe,
    #[serde(alias = "s")]
    Touchdown,
    NearGround,
    /// Environment crash event. No lander reading signals one, so it always
    /// reads `false`; synthesized tables may still declare it as an input.
    Crash,
}

impl Proposition {
    /// Propositions derived from lander state.
    pub const ALL: [Proposition; 6] = [
        Proposition::OverPad,
        Proposition::Upright,
        Proposition::VelocitySafe,
        Proposition::AngularVelocitySafe,
        Proposition::Touchdown,
        Proposition::NearGround,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Proposition::OverPad => "over_pad",
            Proposition::Upright => "upright",
            Proposition::VelocitySafe => "velocity_safe",
            Proposition::AngularVelocitySafe => "angular_velocity_safe",
            Proposition::Touchdown => "touchdown",
            Proposition::NearGround => "near_ground",
            Proposition::Crash => "crash",
        }
    }
}

impl FromStr for Proposition {
    type Err = TouchdownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let prop = match s {
            "over_pad" | "p" => Proposition::OverPad,
            "upright" | "q" => Proposition::Upright,
            "velocity_safe" | "r" => Proposition::VelocitySafe,
            "angular_velocity_safe" | "a" => Proposition::AngularVelocitySafe,
            "touchdown" | "s" => Proposition::Touchdown,
            "near_ground" => Proposition::NearGround,
            "crash" => Proposition::Crash,
            other => {
                return Err(TouchdownError::Validation(format!(
                    "unknown proposition '{other}'"
                )))
            }
        };
        Ok(prop)
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Truth values of every proposition for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PropositionSet {
    pub over_pad: bool,
    pub upright: bool,
    pub velocity_safe: bool,
    /// Always `true` when angular velocity is not tracked.
    pub angular_velocity_safe: bool,
    pub touchdown: bool,
    pub near_ground: bool,
}

impl PropositionSet {
    pub fn get(&self, prop: Proposition) -> bool {
        match prop {
            Proposition::OverPad => self.over_pad,
            Proposition::Upright => self.upright,
            Proposition::VelocitySafe => self.velocity_safe,
            Proposition::AngularVelocitySafe => self.angular_velocity_safe,
            Proposition::Touchdown => self.touchdown,
            Proposition::NearGround => self.near_ground,
            Proposition::Crash => false,
        }
    }

    pub fn set(&mut self, prop: Proposition, value: bool) {
        match prop {
            Proposition::OverPad => self.over_pad = value,
            Proposition::Upright => self.upright = value,
            Proposition::VelocitySafe => self.velocity_safe = value,
            Proposition::AngularVelocitySafe => self.angular_velocity_safe = value,
            Proposition::Touchdown => self.touchdown = value,
            Proposition::NearGround => self.near_ground = value,
            Proposition::Crash => {}
        }
    }

    /// Over the pad, upright, slow and not spinning.
    pub fn aligned(&self) -> bool {
        self.over_pad && self.upright && self.velocity_safe && self.angular_velocity_safe
    }

    /// Assignment restricted to `props`, bit `i` holding `props[i]`.
    pub fn project(&self, props: &[Proposition]) -> u32 {
        props
            .iter()
            .enumerate()
            .filter(|(_, p)| self.get(**p))
            .fold(0, |bits, (i, _)| bits | (1 << i))
    }

    /// Inverse of [`project`](Self::project); unlisted propositions are `false`.
    pub fn from_bits(props: &[Proposition], bits: u32) -> Self {
        let mut set = Self::default();
        for (i, p) in props.iter().enumerate() {
            set.set(*p, bits & (1 << i) != 0);
        }
        set
    }
}

#[inline]
fn within(value: f64, bound: f64) -> bool {
    value.abs() <= bound
}

/// Derive the proposition set for `state` under `thresholds`.
pub fn extract(state: &LanderState, thresholds: &LanderThresholds) -> PropositionSet {
    let vy_safe = match thresholds.vertical_speed_policy {
        VerticalSpeedPolicy::Magnitude => within(state.vy, thresholds.vy_threshold),
        VerticalSpeedPolicy::DescentOnly => state.vy >= -thresholds.vy_threshold,
    };

    PropositionSet {
        over_pad: within(state.x, thresholds.x_threshold),
        upright: within(state.angle, thresholds.angle_threshold),
        velocity_safe: within(state.vx, thresholds.vx_threshold) && vy_safe,
        angular_velocity_safe: thresholds
            .angular_velocity_threshold
            .map_or(true, |bound| within(state.angular_velocity, bound)),
        touchdown: state.both_legs_down(),
        near_ground: state.y <= thresholds.y_threshold,
    }
}
