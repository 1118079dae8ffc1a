// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Controller Facade
// ─────────────────────────────────────────────────────────────────────
//! Backend-agnostic controller contract and the rule-based backend.
//!
//! Callers drive a controller with one `step` per control tick and must
//! treat [`Action::Terminate`] as "stop issuing actions for this episode",
//! never as an actuator command.

use serde::{Deserialize, Serialize};

use touchdown_types::{
    Action, ControllerConfig, LanderState, Mode, Preset, TouchdownResult,
};

use crate::mode::classify;
use crate::propositions::{extract, PropositionSet};
use crate::rules::{resolve_traced, Firing};

/// Per-tick controller contract shared by every backend.
pub trait LandingController: Send {
    /// Human-readable backend name for logging.
    fn name(&self) -> &str;

    /// Map the current state to an action.
    fn step(&mut self, state: &LanderState) -> TouchdownResult<Action>;

    /// Clear per-episode state. Call before reusing a controller.
    fn reset(&mut self);

    /// [`step`](Self::step) on a raw 8-element observation.
    fn step_observation(&mut self, obs: &[f64]) -> TouchdownResult<Action> {
        let state = LanderState::from_observation(obs)?;
        self.step(&state)
    }
}

/// Full trace of one rule-based decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub propositions: PropositionSet,
    pub mode: Mode,
    pub firing: Firing,
    pub action: Action,
}

/// Threshold-driven rule controller.
///
/// The decision depends only on the configuration and the current state.
/// The previous mode is kept solely to log transitions.
#[derive(Debug, Clone)]
pub struct RuleController {
    config: ControllerConfig,
    last_mode: Option<Mode>,
}

impl RuleController {
    pub fn new(config: ControllerConfig) -> TouchdownResult<Self> {
        config.validate()?;
        log::info!(
            "Rule controller ready: {} rules, mode correction {}",
            config.rules.rules().len(),
            if config.rules.mode_correction() { "on" } else { "off" }
        );
        Ok(Self {
            config,
            last_mode: None,
        })
    }

    pub fn from_preset(preset: Preset) -> TouchdownResult<Self> {
        Self::new(ControllerConfig::preset(preset))
    }

    /// Extract, classify and resolve, returning the full trace.
    pub fn decide(&mut self, state: &LanderState) -> Decision {
        if !state.is_finite() {
            log::warn!("Non-finite lander state, bound checks read as unsatisfied: {state:?}");
        }

        let thresholds = &self.config.thresholds;
        let propositions = extract(state, thresholds);
        let mode = classify(&propositions);
        let (action, firing) =
            resolve_traced(mode, state, &propositions, thresholds, &self.config.rules);

        if self.last_mode != Some(mode) {
            log::debug!(
                "Mode transition: {} -> {mode}",
                self.last_mode.map_or("start", |m| m.as_str())
            );
            self.last_mode = Some(mode);
        }
        if action.is_terminate() {
            log::info!("Safe touchdown reached at x={:.3}, vy={:.3}", state.x, state.vy);
        }

        Decision {
            propositions,
            mode,
            firing,
            action,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Mode seen on the most recent tick, `None` before the first tick.
    pub fn mode(&self) -> Option<Mode> {
        self.last_mode
    }
}

impl LandingController for RuleController {
    fn name(&self) -> &str {
        "rule"
    }

    fn step(&mut self, state: &LanderState) -> TouchdownResult<Action> {
        Ok(self.decide(state).action)
    }

    fn reset(&mut self) {
        self.last_mode = None;
        log::info!("Rule controller reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use touchdown_types::{LanderThresholds, PriorityRule, RuleTable, Thruster};

    fn canonical() -> RuleController {
        RuleController::new(ControllerConfig::default()).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ControllerConfig {
            thresholds: LanderThresholds {
                vx_threshold: -1.0,
                ..Default::default()
            },
            rules: RuleTable::canonical(),
        };
        assert!(RuleController::new(config).is_err());
    }

    #[test]
    fn test_step_is_deterministic() {
        let mut ctrl = canonical();
        let states = [
            [0.0, 0.5, 0.0, -0.3, 0.0, 0.0, 0.0, 0.0],
            [0.95, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.2, 0.25, 0.05, -0.6, 0.2, -0.3, 1.0, 0.0],
            [0.0, 0.0, 0.0, -0.1, 0.0, 0.0, 1.0, 1.0],
        ];
        for obs in states {
            let first = ctrl.step_observation(&obs).unwrap();
            let second = ctrl.step_observation(&obs).unwrap();
            let fresh = canonical().step_observation(&obs).unwrap();
            assert_eq!(first, second);
            assert_eq!(first, fresh);
        }
    }

    #[test]
    fn test_centered_descent_scenario() {
        let mut ctrl = canonical();
        let state = LanderState::from([0.0, 0.5, 0.0, -0.3, 0.0, 0.0, 0.0, 0.0]);
        let decision = ctrl.decide(&state);
        // y = 0.5 is above the 0.3 near-ground bound.
        assert_eq!(decision.mode, Mode::Cruise);
        assert_eq!(decision.action, Action::NO_OP);
        assert_eq!(decision.firing, Firing::Default);
    }

    #[test]
    fn test_off_pad_scenario_corrects_left() {
        let config = ControllerConfig {
            thresholds: LanderThresholds {
                x_threshold: 0.9,
                ..Default::default()
            },
            rules: RuleTable::canonical(),
        };
        let mut ctrl = RuleController::new(config).unwrap();
        let decision = ctrl.decide(&LanderState::from([0.95, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        assert_eq!(decision.mode, Mode::Approach);
        assert_eq!(decision.action, Action::Actuate(Thruster::FireLeft));
        assert_eq!(decision.firing, Firing::Rule(PriorityRule::HorizontalBound));
    }

    #[test]
    fn test_terminate_on_soft_touchdown() {
        let mut ctrl = canonical();
        let action = ctrl
            .step_observation(&[0.0, 0.0, 0.0, -0.1, 0.0, 0.0, 1.0, 1.0])
            .unwrap();
        assert_eq!(action, Action::Terminate);
        assert_eq!(ctrl.mode(), Some(Mode::Touchdown));
    }

    #[test]
    fn test_step_observation_rejects_short_vector() {
        let mut ctrl = canonical();
        assert!(ctrl.step_observation(&[0.0; 6]).is_err());
    }

    #[test]
    fn test_reset_clears_mode() {
        let mut ctrl = canonical();
        ctrl.step_observation(&[0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(ctrl.mode(), Some(Mode::Cruise));
        ctrl.reset();
        assert_eq!(ctrl.mode(), None);
    }

    #[test]
    fn test_first_tick_after_episode_without_reset() {
        let mut ctrl = canonical();
        ctrl.step_observation(&[0.0, 0.0, 0.0, -0.1, 0.0, 0.0, 1.0, 1.0])
            .unwrap();
        // New episode starts high up; no reset called.
        let action = ctrl
            .step_observation(&[0.0, 1.4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(action, Action::NO_OP);
        assert_eq!(ctrl.mode(), Some(Mode::Cruise));
    }

    #[test]
    fn test_presets_build() {
        for preset in Preset::ALL {
            let mut ctrl = RuleController::from_preset(preset).unwrap();
            let action = ctrl
                .step_observation(&[0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
                .unwrap();
            assert_eq!(action, Action::NO_OP, "{preset}");
        }
    }

    #[test]
    fn test_fsm_basic_terminates_and_brakes_in_approach() {
        let mut ctrl = RuleController::from_preset(Preset::FsmBasic).unwrap();
        let landed = ctrl
            .step_observation(&[0.0, 0.0, 0.0, -0.1, 0.0, 0.0, 1.0, 1.0])
            .unwrap();
        assert_eq!(landed, Action::Terminate);

        // Centred and upright but sinking past the 0.1 limit.
        let decision = ctrl.decide(&LanderState::from([0.0, 0.1, 0.0, -0.3, 0.0, 0.0, 0.0, 0.0]));
        assert_eq!(decision.mode, Mode::Approach);
        assert_eq!(decision.action, Action::Actuate(Thruster::FireMain));
        assert_eq!(decision.firing, Firing::ModeCorrection(Mode::Approach));
    }

    #[test]
    fn test_rate_limited_spin_beats_mode_correction() {
        let mut ctrl = RuleController::from_preset(Preset::RateLimited).unwrap();
        // Cruise correction alone would fire_left to re-centre.
        let decision = ctrl.decide(&LanderState::from([0.5, 1.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0]));
        assert_eq!(decision.mode, Mode::Cruise);
        assert_eq!(decision.action, Action::Actuate(Thruster::FireRight));
        assert_eq!(
            decision.firing,
            Firing::Rule(PriorityRule::ExcessAngularVelocity)
        );
    }

    #[test]
    fn test_synthesized_climb_near_pad_is_aligned() {
        let climbing = LanderState::from([0.0, 0.2, 0.0, 1.5, 0.0, 0.0, 0.0, 0.0]);
        let mut ctrl = RuleController::from_preset(Preset::Synthesized).unwrap();
        let decision = ctrl.decide(&climbing);
        assert_eq!(decision.mode, Mode::Align);
        assert_eq!(decision.action, Action::NO_OP);
        // The magnitude policy treats the same climb as unsafe.
        assert_eq!(canonical().decide(&climbing).mode, Mode::Approach);
    }

    #[test]
    fn test_descent_guarded_fires_main_first() {
        let mut ctrl = RuleController::from_preset(Preset::DescentGuarded).unwrap();
        // Off-pad and tilted, but the descent guard comes first.
        let action = ctrl
            .step_observation(&[0.5, 0.1, 0.0, -0.2, 0.3, 0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(action, Action::Actuate(Thruster::FireMain));
    }

    #[test]
    fn test_safety_envelope_ignores_goal_seeking() {
        let mut ctrl = RuleController::from_preset(Preset::SafetyEnvelope).unwrap();
        // Off-pad but inside the 0.9 envelope: no centering without mode correction.
        let action = ctrl
            .step_observation(&[0.5, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(action, Action::NO_OP);
    }

    #[test]
    fn test_trait_object_dispatch() {
        let mut ctrl: Box<dyn LandingController> = Box::new(canonical());
        assert_eq!(ctrl.name(), "rule");
        let action = ctrl
            .step(&LanderState::from([0.0, 1.0, 0.0, -3.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(action, Action::Actuate(Thruster::FireMain));
    }
}
