// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Touchdown Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, threshold configuration, and error hierarchy for the
//! Touchdown Kernel, the per-tick safety controller for a 2D lander.

pub mod config;
pub mod error;
pub mod state;

pub use config::{
    ControllerConfig, LanderThresholds, Preset, PriorityRule, RuleTable, VerticalSpeedPolicy,
};
pub use error::{TouchdownError, TouchdownResult};
pub use state::{Action, LanderState, Mode, Thruster, OBSERVATION_LEN};
