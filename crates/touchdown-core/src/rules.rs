// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Priority Action Resolver
// ─────────────────────────────────────────────────────────────────────
//! Ordered guarded rules over (mode, state).
//!
//! The configured [`RuleTable`] is walked highest priority first and the
//! first guard that fires decides the action. If none fires, the
//! mode-specific correction runs (when enabled), and finally `no_op`.
//!
//! Thruster convention: `fire_left` pushes the lander toward negative `x`
//! and rotates toward negative `angle`; `fire_right` does the opposite.
//! Positive spin is damped with `fire_right`.
//!
//! Every bound comparison is strict. A state sitting exactly on a bound
//! does not trigger a correction, which keeps the controller from
//! chattering at the edge.
//!
//! [`RuleTable`]: touchdown_types::RuleTable

use serde::{Deserialize, Serialize};

use touchdown_types::{
    Action, LanderState, LanderThresholds, Mode, PriorityRule, RuleTable, Thruster,
};

use crate::propositions::PropositionSet;

/// What decided the action on a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Firing {
    Rule(PriorityRule),
    ModeCorrection(Mode),
    Default,
}

/// `fire_left` above `+bound`, `fire_right` below `-bound`.
#[inline]
fn push_back(value: f64, bound: f64) -> Option<Thruster> {
    if value > bound {
        Some(Thruster::FireLeft)
    } else if value < -bound {
        Some(Thruster::FireRight)
    } else {
        None
    }
}

#[inline]
fn descent_exceeded(state: &LanderState, limit: f64) -> bool {
    state.vy < -limit
}

/// Grounded with a soft vertical speed and near-zero horizontal drift.
fn soft_stop(state: &LanderState, thresholds: &LanderThresholds) -> bool {
    state.vy >= -thresholds.touchdown_vy_floor
        && state.vx.abs() < thresholds.touchdown_vx_threshold
}

/// Evaluate one guarded rule.
pub fn evaluate_rule(
    rule: PriorityRule,
    mode: Mode,
    state: &LanderState,
    props: &PropositionSet,
    thresholds: &LanderThresholds,
) -> Option<Action> {
    match rule {
        PriorityRule::TouchdownStop => {
            (mode == Mode::Touchdown && soft_stop(state, thresholds)).then_some(Action::Terminate)
        }
        PriorityRule::ExcessDescent => {
            descent_exceeded(state, thresholds.descent_limit(props.near_ground))
                .then_some(Action::Actuate(Thruster::FireMain))
        }
        PriorityRule::ExcessAngularVelocity => {
            let bound = thresholds.angular_velocity_threshold?;
            if state.angular_velocity > bound {
                Some(Action::Actuate(Thruster::FireRight))
            } else if state.angular_velocity < -bound {
                Some(Action::Actuate(Thruster::FireLeft))
            } else {
                None
            }
        }
        PriorityRule::HorizontalBound => {
            push_back(state.x, thresholds.x_threshold).map(Action::Actuate)
        }
        PriorityRule::TiltBound => {
            push_back(state.angle, thresholds.angle_threshold).map(Action::Actuate)
        }
    }
}

/// Correction applied when no safety rule fired.
pub fn mode_correction(
    mode: Mode,
    state: &LanderState,
    props: &PropositionSet,
    thresholds: &LanderThresholds,
) -> Option<Action> {
    let descent = || {
        descent_exceeded(state, thresholds.descent_limit(props.near_ground))
            .then_some(Thruster::FireMain)
    };

    let thruster = match mode {
        Mode::Cruise => push_back(state.x, thresholds.x_threshold),
        Mode::Approach => push_back(state.angle, thresholds.angle_threshold).or_else(descent),
        Mode::Align => descent(),
        Mode::Touchdown => None,
    };
    thruster.map(Action::Actuate)
}

/// Resolve the action for this tick, reporting which stage decided it.
pub fn resolve_traced(
    mode: Mode,
    state: &LanderState,
    props: &PropositionSet,
    thresholds: &LanderThresholds,
    table: &RuleTable,
) -> (Action, Firing) {
    for &rule in table.rules() {
        if let Some(action) = evaluate_rule(rule, mode, state, props, thresholds) {
            return (action, Firing::Rule(rule));
        }
    }

    if table.mode_correction() {
        if let Some(action) = mode_correction(mode, state, props, thresholds) {
            return (action, Firing::ModeCorrection(mode));
        }
    }

    (Action::NO_OP, Firing::Default)
}

pub fn resolve(
    mode: Mode,
    state: &LanderState,
    props: &PropositionSet,
    thresholds: &LanderThresholds,
    table: &RuleTable,
) -> Action {
    resolve_traced(mode, state, props, thresholds, table).0
}
