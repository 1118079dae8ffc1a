// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Mode Classifier
// ─────────────────────────────────────────────────────────────────────
//! Collapses a proposition set into one control mode.
//!
//! Precedence, first match wins:
//! 1. `touchdown` → `Touchdown`, whatever else holds (a hard but grounded
//!    landing is still a landing).
//! 2. `near_ground` → `Align` when aligned, otherwise `Approach`.
//! 3. otherwise `Cruise`.

use touchdown_types::Mode;

use crate::propositions::PropositionSet;

pub fn classify(props: &PropositionSet) -> Mode {
    if props.touchdown {
        Mode::Touchdown
    } else if props.near_ground {
        if props.aligned() {
            Mode::Align
        } else {
            Mode::Approach
        }
    } else {
        Mode::Cruise
    }
}
