// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Touchdown Kernel Configuration
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TouchdownError, TouchdownResult};

/// How `vy` enters the `velocity_safe` proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalSpeedPolicy {
    /// `|vy| <= vy_threshold`: fast climbs are unsafe too.
    #[default]
    Magnitude,
    /// `vy >= -vy_threshold`: only excessive descent is unsafe.
    DescentOnly,
}

/// Immutable threshold record shared by the extractor and the resolver.
///
/// Every bound is a non-negative magnitude. Vertical bounds are descent
/// speeds and are compared against the negated bound (`vy < -bound`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanderThresholds {
    /// Horizontal distance from pad centre counted as "over the pad", and
    /// the horizontal bound enforced by the position rule.
    /// Default: 0.1.
    pub x_threshold: f64,

    /// Tilt counted as upright, and the tilt bound.
    /// Default: 0.1 rad.
    pub angle_threshold: f64,

    /// Horizontal speed counted as safe.
    /// Default: 0.1.
    pub vx_threshold: f64,

    /// Descent-speed limit away from the ground.
    /// Default: 1.0.
    pub vy_threshold: f64,

    /// Stricter descent-speed limit used while near the ground. `None` keeps
    /// `vy_threshold` in every altitude regime.
    /// Default: Some(0.5).
    pub near_ground_vy_threshold: Option<f64>,

    /// Angular-velocity bound. `None` disables tracking: the proposition
    /// reads as always true and the spin rule may not be configured.
    /// Default: Some(0.1).
    pub angular_velocity_threshold: Option<f64>,

    /// Altitude at or below which the lander is near the ground.
    /// Default: 0.3.
    pub y_threshold: f64,

    /// Descent speed a grounded lander may still have and count as stopped.
    /// Default: 0.5.
    pub touchdown_vy_floor: f64,

    /// Horizontal speed below which a grounded lander counts as stopped.
    /// Default: 0.1.
    pub touchdown_vx_threshold: f64,

    /// Default: `Magnitude`.
    pub vertical_speed_policy: VerticalSpeedPolicy,
}

impl Default for LanderThresholds {
    fn default() -> Self {
        Self {
            x_threshold: 0.1,
            angle_threshold: 0.1,
            vx_threshold: 0.1,
            vy_threshold: 1.0,
            near_ground_vy_threshold: Some(0.5),
            angular_velocity_threshold: Some(0.1),
            y_threshold: 0.3,
            touchdown_vy_floor: 0.5,
            touchdown_vx_threshold: 0.1,
            vertical_speed_policy: VerticalSpeedPolicy::Magnitude,
        }
    }
}

fn check_bound(name: &str, value: f64) -> TouchdownResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(TouchdownError::Config(format!(
            "{name} must be a finite non-negative bound, got {value}"
        )));
    }
    Ok(())
}

impl LanderThresholds {
    /// Validate threshold parameters.
    pub fn validate(&self) -> TouchdownResult<()> {
        check_bound("x_threshold", self.x_threshold)?;
        check_bound("angle_threshold", self.angle_threshold)?;
        check_bound("vx_threshold", self.vx_threshold)?;
        check_bound("vy_threshold", self.vy_threshold)?;
        check_bound("y_threshold", self.y_threshold)?;
        check_bound("touchdown_vy_floor", self.touchdown_vy_floor)?;
        check_bound("touchdown_vx_threshold", self.touchdown_vx_threshold)?;
        if let Some(av) = self.angular_velocity_threshold {
            check_bound("angular_velocity_threshold", av)?;
        }
        if let Some(near) = self.near_ground_vy_threshold {
            check_bound("near_ground_vy_threshold", near)?;
            if near > self.vy_threshold {
                return Err(TouchdownError::Config(format!(
                    "near_ground_vy_threshold ({near}) must not be looser than vy_threshold ({})",
                    self.vy_threshold
                )));
            }
        }
        Ok(())
    }

    /// Descent-speed limit for the current altitude regime.
    pub fn descent_limit(&self, near_ground: bool) -> f64 {
        match (near_ground, self.near_ground_vy_threshold) {
            (true, Some(strict)) => strict,
            _ => self.vy_threshold,
        }
    }

    pub fn tracks_angular_velocity(&self) -> bool {
        self.angular_velocity_threshold.is_some()
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> TouchdownResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TouchdownError::Config(format!("JSON parse error: {e}")))
    }
}

/// Guarded safety rule, listed in canonical priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityRule {
    /// Grounded and slow → terminate.
    TouchdownStop,
    /// Descending faster than the altitude-regime limit → main engine.
    ExcessDescent,
    /// Spinning faster than the angular-velocity bound → counter-thrust.
    ExcessAngularVelocity,
    /// Outside the horizontal bound → push back toward centre.
    HorizontalBound,
    /// Tilted past the angle bound → counter-rotate.
    TiltBound,
}

impl PriorityRule {
    /// Highest priority first.
    pub const CANONICAL_ORDER: [PriorityRule; 5] = [
        PriorityRule::TouchdownStop,
        PriorityRule::ExcessDescent,
        PriorityRule::ExcessAngularVelocity,
        PriorityRule::HorizontalBound,
        PriorityRule::TiltBound,
    ];

    /// Position in the canonical order; lower fires first.
    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityRule::TouchdownStop => "touchdown_stop",
            PriorityRule::ExcessDescent => "excess_descent",
            PriorityRule::ExcessAngularVelocity => "excess_angular_velocity",
            PriorityRule::HorizontalBound => "horizontal_bound",
            PriorityRule::TiltBound => "tilt_bound",
        }
    }
}

impl fmt::Display for PriorityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, immutable list of guarded rules.
///
/// Rules may be omitted but never reordered: the list must be a
/// subsequence of [`PriorityRule::CANONICAL_ORDER`] so that crash
/// avoidance always dominates goal seeking. When `mode_correction` is set,
/// the mode-specific correction runs after every listed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RuleTableRepr")]
pub struct RuleTable {
    rules: Vec<PriorityRule>,
    mode_correction: bool,
}

#[derive(Deserialize)]
struct RuleTableRepr {
    rules: Vec<PriorityRule>,
    #[serde(default = "default_mode_correction")]
    mode_correction: bool,
}

fn default_mode_correction() -> bool {
    true
}

impl TryFrom<RuleTableRepr> for RuleTable {
    type Error = TouchdownError;

    fn try_from(repr: RuleTableRepr) -> Result<Self, Self::Error> {
        RuleTable::new(repr.rules, repr.mode_correction)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::canonical()
    }
}

impl RuleTable {
    pub fn new(rules: Vec<PriorityRule>, mode_correction: bool) -> TouchdownResult<Self> {
        let table = Self {
            rules,
            mode_correction,
        };
        table.validate()?;
        Ok(table)
    }

    /// Every rule in canonical order, followed by mode correction.
    pub fn canonical() -> Self {
        Self {
            rules: PriorityRule::CANONICAL_ORDER.to_vec(),
            mode_correction: true,
        }
    }

    pub fn validate(&self) -> TouchdownResult<()> {
        for pair in self.rules.windows(2) {
            if pair[0] == pair[1] {
                return Err(TouchdownError::Config(format!(
                    "rule '{}' listed more than once",
                    pair[0]
                )));
            }
            if pair[0].rank() > pair[1].rank() {
                return Err(TouchdownError::Config(format!(
                    "rule '{}' must not take precedence over '{}'",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &[PriorityRule] {
        &self.rules
    }

    pub fn contains(&self, rule: PriorityRule) -> bool {
        self.rules.contains(&rule)
    }

    pub fn mode_correction(&self) -> bool {
        self.mode_correction
    }
}

/// Named configuration presets, one per tuned controller variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Full rule table with the default thresholds.
    Canonical,
    /// Mode machine only; stops on touchdown.
    FsmBasic,
    /// Mode machine behind a descent-speed guard.
    DescentGuarded,
    /// Descent and spin guards over a wider pad window.
    RateLimited,
    /// Hard safety limits only, no goal seeking.
    SafetyEnvelope,
    /// Proposition abstraction used when synthesizing transition tables.
    Synthesized,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::Canonical,
        Preset::FsmBasic,
        Preset::DescentGuarded,
        Preset::RateLimited,
        Preset::SafetyEnvelope,
        Preset::Synthesized,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Canonical => "canonical",
            Preset::FsmBasic => "fsm_basic",
            Preset::DescentGuarded => "descent_guarded",
            Preset::RateLimited => "rate_limited",
            Preset::SafetyEnvelope => "safety_envelope",
            Preset::Synthesized => "synthesized",
        }
    }
}

impl FromStr for Preset {
    type Err = TouchdownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| TouchdownError::Validation(format!("unknown preset '{s}'")))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a controller needs at construction: thresholds plus the
/// ordered rule table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub thresholds: LanderThresholds,
    pub rules: RuleTable,
}

impl ControllerConfig {
    pub fn new(thresholds: LanderThresholds, rules: RuleTable) -> TouchdownResult<Self> {
        let config = Self { thresholds, rules };
        config.validate()?;
        Ok(config)
    }

    pub fn preset(preset: Preset) -> Self {
        use PriorityRule::*;

        let narrow = LanderThresholds {
            x_threshold: 0.1,
            angle_threshold: 0.1,
            vx_threshold: 0.1,
            vy_threshold: 0.1,
            near_ground_vy_threshold: None,
            angular_velocity_threshold: None,
            y_threshold: 0.2,
            ..LanderThresholds::default()
        };

        let (thresholds, rules, mode_correction) = match preset {
            Preset::Canonical => (
                LanderThresholds::default(),
                PriorityRule::CANONICAL_ORDER.to_vec(),
                true,
            ),
            Preset::FsmBasic => (narrow, vec![TouchdownStop], true),
            Preset::DescentGuarded => (narrow, vec![ExcessDescent], true),
            Preset::RateLimited => (
                LanderThresholds {
                    x_threshold: 0.3,
                    near_ground_vy_threshold: None,
                    ..LanderThresholds::default()
                },
                vec![ExcessDescent, ExcessAngularVelocity],
                true,
            ),
            Preset::SafetyEnvelope => (
                LanderThresholds {
                    x_threshold: 0.9,
                    angle_threshold: 0.4,
                    angular_velocity_threshold: None,
                    y_threshold: 0.2,
                    ..LanderThresholds::default()
                },
                vec![TouchdownStop, ExcessDescent, HorizontalBound, TiltBound],
                false,
            ),
            Preset::Synthesized => (
                LanderThresholds {
                    x_threshold: 0.4,
                    near_ground_vy_threshold: None,
                    vertical_speed_policy: VerticalSpeedPolicy::DescentOnly,
                    ..LanderThresholds::default()
                },
                PriorityRule::CANONICAL_ORDER.to_vec(),
                true,
            ),
        };

        Self {
            thresholds,
            rules: RuleTable {
                rules,
                mode_correction,
            },
        }
    }

    /// Validate thresholds, rule order, and rule/threshold consistency.
    pub fn validate(&self) -> TouchdownResult<()> {
        self.thresholds.validate()?;
        self.rules.validate()?;
        if self.rules.contains(PriorityRule::ExcessAngularVelocity)
            && !self.thresholds.tracks_angular_velocity()
        {
            return Err(TouchdownError::Config(
                "excess_angular_velocity rule requires angular_velocity_threshold".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from JSON string. Missing sections take their defaults.
    pub fn from_json(json: &str) -> TouchdownResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TouchdownError::Config(format!("JSON parse error: {e}")))
    }

    pub fn to_json(&self) -> TouchdownResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TouchdownError::Config(format!("JSON encode error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_valid() {
        let t = LanderThresholds::default();
        assert!(t.validate().is_ok());
        assert_eq!(t.x_threshold, 0.1);
        assert_eq!(t.vy_threshold, 1.0);
        assert_eq!(t.y_threshold, 0.3);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let t = LanderThresholds {
            angle_threshold: -0.1,
            ..Default::default()
        };
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("angle_threshold"));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let t = LanderThresholds {
            y_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(t.validate(), Err(TouchdownError::Config(_))));
    }

    #[test]
    fn test_near_ground_limit_must_be_stricter() {
        let t = LanderThresholds {
            vy_threshold: 0.4,
            near_ground_vy_threshold: Some(0.5),
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_descent_limit_by_regime() {
        let t = LanderThresholds::default();
        assert_eq!(t.descent_limit(false), 1.0);
        assert_eq!(t.descent_limit(true), 0.5);
        let single = LanderThresholds {
            near_ground_vy_threshold: None,
            ..Default::default()
        };
        assert_eq!(single.descent_limit(true), 1.0);
    }

    #[test]
    fn test_thresholds_from_json_partial() {
        let t = LanderThresholds::from_json(r#"{"x_threshold": 0.9}"#).unwrap();
        assert_eq!(t.x_threshold, 0.9);
        assert_eq!(t.angle_threshold, 0.1);
    }

    #[test]
    fn test_thresholds_from_json_invalid() {
        let err = LanderThresholds::from_json("{not json").unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_rule_table_rejects_reorder() {
        let err = RuleTable::new(
            vec![PriorityRule::HorizontalBound, PriorityRule::ExcessDescent],
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("precedence"));
    }

    #[test]
    fn test_rule_table_rejects_duplicate() {
        let err = RuleTable::new(
            vec![PriorityRule::ExcessDescent, PriorityRule::ExcessDescent],
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rule_table_subsequence_ok() {
        let table = RuleTable::new(
            vec![PriorityRule::TouchdownStop, PriorityRule::TiltBound],
            false,
        )
        .unwrap();
        assert!(table.contains(PriorityRule::TiltBound));
        assert!(!table.contains(PriorityRule::ExcessDescent));
        assert!(!table.mode_correction());
    }

    #[test]
    fn test_rule_table_json_validated() {
        let bad = r#"{"rules": ["tilt_bound", "touchdown_stop"]}"#;
        assert!(serde_json::from_str::<RuleTable>(bad).is_err());
        let good = r#"{"rules": ["excess_descent"]}"#;
        let table: RuleTable = serde_json::from_str(good).unwrap();
        assert!(table.mode_correction());
    }

    #[test]
    fn test_all_presets_valid() {
        for preset in Preset::ALL {
            let config = ControllerConfig::preset(preset);
            assert!(config.validate().is_ok(), "{preset} failed validation");
        }
    }

    #[test]
    fn test_vertical_policy_presets_differ() {
        let canonical = ControllerConfig::preset(Preset::Canonical);
        let synthesized = ControllerConfig::preset(Preset::Synthesized);
        assert_eq!(
            canonical.thresholds.vertical_speed_policy,
            VerticalSpeedPolicy::Magnitude
        );
        assert_eq!(
            synthesized.thresholds.vertical_speed_policy,
            VerticalSpeedPolicy::DescentOnly
        );
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("rate_limited".parse::<Preset>().unwrap(), Preset::RateLimited);
        assert!(matches!(
            "v4".parse::<Preset>(),
            Err(TouchdownError::Validation(_))
        ));
    }

    #[test]
    fn test_spin_rule_requires_tracking() {
        let config = ControllerConfig {
            thresholds: LanderThresholds {
                angular_velocity_threshold: None,
                ..Default::default()
            },
            rules: RuleTable::canonical(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_controller_config_json() {
        let config = ControllerConfig::preset(Preset::SafetyEnvelope);
        let json = config.to_json().unwrap();
        let back = ControllerConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
    }
}
