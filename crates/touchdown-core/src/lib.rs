// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Touchdown Kernel Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Proposition extraction, mode classification, priority resolution and
//! the controller backends for a 2D lander.
//!
//! One `step` per control tick: state → propositions → mode → action.
//!
//! # Safety Invariants
//!
//! 1. **Touchdown dominates classification**: with both legs down the mode
//!    is `Touchdown`, whatever the other propositions say.
//!
//! 2. **Crash avoidance dominates goal seeking**: rule tables are validated
//!    to be subsequences of the canonical order (descent, spin, horizontal
//!    bound, tilt), so a centering correction can never preempt a descent
//!    correction.
//!
//! 3. **Strict bounds**: a state exactly on a bound never triggers the
//!    correction for that bound.
//!
//! 4. **NaN is never safe**: a non-finite field fails every magnitude test
//!    instead of raising.
//!
//! 5. **Broken tables fail at load**: a transition table that is not total
//!    and deterministic over its reachable states is rejected at
//!    construction; a non one-hot output at runtime is a `Protocol` error,
//!    never a guessed action.

pub mod controller;
pub mod mode;
pub mod propositions;
pub mod rules;
pub mod table;

pub use controller::{Decision, LandingController, RuleController};
pub use mode::classify;
pub use propositions::{extract, Proposition, PropositionSet};
pub use rules::{resolve, resolve_traced, Firing};
pub use table::{CompiledTable, TableController, TableState, TransitionTable};
