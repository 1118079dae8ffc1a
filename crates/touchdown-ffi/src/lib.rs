// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Touchdown Kernel PyO3 FFI Bindings
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied — PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrappers around the Rust Touchdown Kernel, so a
//! gymnasium episode loop can drive the controller directly.
//!
//! # Action convention
//!
//! `step()` returns the environment action index (`0`–`3`) or the string
//! `"terminate"`. The caller must stop stepping the environment on
//! `"terminate"` rather than forwarding it.
//!
//! # Error mapping
//!
//! - Configuration, validation and table-load errors → `ValueError`.
//! - Transition-table protocol violations while stepping → `RuntimeError`.
//!
//! Install: `pip install -e crates/touchdown-ffi` (requires maturin).
//!
//! Usage from Python:
//! ```python
//! from touchdown_kernel import ControllerConfig, RuleController
//!
//! ctrl = RuleController(ControllerConfig("canonical"))
//! action = ctrl.step(observation.tolist())
//! if action == "terminate":
//!     ...
//! ```

use std::str::FromStr;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use touchdown_core::{LandingController, Proposition, TableController};
use touchdown_types::{Action, ControllerConfig, Preset, TouchdownError};

const TERMINATE: &str = "terminate";

fn to_py_err(err: TouchdownError) -> PyErr {
    if err.is_runtime() {
        PyRuntimeError::new_err(err.to_string())
    } else {
        PyValueError::new_err(err.to_string())
    }
}

fn action_to_py(py: Python<'_>, action: Action) -> PyResult<PyObject> {
    let obj = match action.thruster() {
        Some(thruster) => thruster.index().into_pyobject(py)?.into_any().unbind(),
        None => TERMINATE.into_pyobject(py)?.into_any().unbind(),
    };
    Ok(obj)
}

// ─── PyControllerConfig ─────────────────────────────────────────────

/// Python-visible controller configuration (thresholds + rule table).
#[pyclass(name = "ControllerConfig")]
#[derive(Clone)]
struct PyControllerConfig {
    inner: ControllerConfig,
}

#[pymethods]
impl PyControllerConfig {
    #[new]
    #[pyo3(signature = (preset = "canonical"))]
    fn new(preset: &str) -> PyResult<Self> {
        let preset = Preset::from_str(preset).map_err(to_py_err)?;
        Ok(Self {
            inner: ControllerConfig::preset(preset),
        })
    }

    /// Construct from JSON string. Missing fields take canonical defaults.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config = ControllerConfig::from_json(json).map_err(to_py_err)?;
        config.validate().map_err(to_py_err)?;
        Ok(Self { inner: config })
    }

    /// Names accepted by the constructor.
    #[staticmethod]
    fn presets() -> Vec<&'static str> {
        Preset::ALL.iter().map(|p| p.name()).collect()
    }

    fn to_json(&self) -> PyResult<String> {
        self.inner.to_json().map_err(to_py_err)
    }

    #[getter]
    fn x_threshold(&self) -> f64 {
        self.inner.thresholds.x_threshold
    }

    #[getter]
    fn angle_threshold(&self) -> f64 {
        self.inner.thresholds.angle_threshold
    }

    #[getter]
    fn vy_threshold(&self) -> f64 {
        self.inner.thresholds.vy_threshold
    }

    #[getter]
    fn y_threshold(&self) -> f64 {
        self.inner.thresholds.y_threshold
    }

    #[getter]
    fn rules(&self) -> Vec<&'static str> {
        self.inner.rules.rules().iter().map(|r| r.as_str()).collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "ControllerConfig(x={}, angle={}, vy={}, y={}, rules={})",
            self.inner.thresholds.x_threshold,
            self.inner.thresholds.angle_threshold,
            self.inner.thresholds.vy_threshold,
            self.inner.thresholds.y_threshold,
            self.inner.rules.rules().len(),
        )
    }
}

fn config_or_default(config: Option<PyRef<'_, PyControllerConfig>>) -> ControllerConfig {
    config.map(|c| c.inner.clone()).unwrap_or_default()
}

// ─── RuleController ─────────────────────────────────────────────────

/// Threshold-driven rule controller exposed to Python.
#[pyclass(name = "RuleController")]
struct PyRuleController {
    inner: touchdown_core::RuleController,
}

#[pymethods]
impl PyRuleController {
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<PyRef<'_, PyControllerConfig>>) -> PyResult<Self> {
        let inner =
            touchdown_core::RuleController::new(config_or_default(config)).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Map an 8-element observation to an action index or `"terminate"`.
    fn step(&mut self, py: Python<'_>, observation: Vec<f64>) -> PyResult<PyObject> {
        let action = self.inner.step_observation(&observation).map_err(to_py_err)?;
        action_to_py(py, action)
    }

    /// Full decision trace as a dict: propositions, mode, firing, action.
    fn decide<'py>(
        &mut self,
        py: Python<'py>,
        observation: Vec<f64>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let state =
            touchdown_types::LanderState::from_observation(&observation).map_err(to_py_err)?;
        let decision = self.inner.decide(&state);

        let props = PyDict::new(py);
        for p in Proposition::ALL {
            props.set_item(p.as_str(), decision.propositions.get(p))?;
        }
        let firing = match decision.firing {
            touchdown_core::Firing::Rule(rule) => rule.as_str().to_string(),
            touchdown_core::Firing::ModeCorrection(mode) => format!("{mode}_correction"),
            touchdown_core::Firing::Default => "default".to_string(),
        };

        let dict = PyDict::new(py);
        dict.set_item("propositions", props)?;
        dict.set_item("mode", decision.mode.as_str())?;
        dict.set_item("firing", firing)?;
        dict.set_item("action", action_to_py(py, decision.action)?)?;
        Ok(dict)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    /// Mode of the most recent tick, `None` before the first step.
    #[getter]
    fn mode(&self) -> Option<&'static str> {
        self.inner.mode().map(|m| m.as_str())
    }

    fn __repr__(&self) -> String {
        format!(
            "RuleController(rules={}, mode={})",
            self.inner.config().rules.rules().len(),
            self.inner.mode().map_or("none", |m| m.as_str()),
        )
    }
}

// ─── TableController ────────────────────────────────────────────────

/// Synthesized transition-table controller exposed to Python.
#[pyclass(name = "TableController")]
struct PyTableController {
    inner: TableController,
}

#[pymethods]
impl PyTableController {
    /// Args:
    ///     table_json: Serialized transition table.
    ///     config: Supplies the proposition thresholds; rules are unused.
    #[new]
    #[pyo3(signature = (table_json, config = None))]
    fn new(table_json: &str, config: Option<PyRef<'_, PyControllerConfig>>) -> PyResult<Self> {
        let thresholds = config_or_default(config).thresholds;
        let inner = TableController::from_json(thresholds, table_json).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn step(&mut self, py: Python<'_>, observation: Vec<f64>) -> PyResult<PyObject> {
        let action = self.inner.step_observation(&observation).map_err(to_py_err)?;
        action_to_py(py, action)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    #[getter]
    fn current_state(&self) -> String {
        self.inner.current_state().to_string()
    }

    /// Auxiliary output flags of the last transition.
    fn aux_outputs<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        for (name, value) in self.inner.aux_outputs() {
            dict.set_item(name, *value)?;
        }
        Ok(dict)
    }
}

// ─── Module Registration ────────────────────────────────────────────

/// Touchdown Kernel — Rust safety controller for the lunar lander.
///
/// - `ControllerConfig` — thresholds + rule table (presets, JSON)
/// - `RuleController` — threshold-driven priority controller
/// - `TableController` — synthesized transition-table controller
#[pymodule]
fn touchdown_kernel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyControllerConfig>()?;
    m.add_class::<PyRuleController>()?;
    m.add_class::<PyTableController>()?;
    m.add("TERMINATE", TERMINATE)?;
    Ok(())
}
