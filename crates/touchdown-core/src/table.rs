// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Table-Driven Controller Backend
// ─────────────────────────────────────────────────────────────────────
//! Executes a transition table produced offline by a discrete synthesizer
//! (GR(1)/LTL), behind the same [`LandingController`] contract as the
//! rule backend.
//!
//! A table is a finite-state machine over the proposition abstraction:
//! `(state, assignment) -> (next state, outputs)`. Guards list only the
//! propositions they constrain; absent keys are don't-care. Outputs must
//! set exactly one of `no_op`/`do_nothing`, `fire_left`, `fire_main`,
//! `fire_right`; any other output flag is carried as an auxiliary flag.
//! A row naming the same thruster under both spellings is rejected.
//!
//! # Load-time guarantees
//!
//! [`CompiledTable::compile`] rejects a table unless, for every state
//! reachable from `initial` and every assignment of the declared inputs,
//! exactly one transition matches. Gaps and overlaps are configuration
//! errors, never runtime conditions. Output one-hotness is checked on every
//! step and reported as a protocol violation.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use touchdown_types::{
    Action, LanderState, LanderThresholds, Thruster, TouchdownError, TouchdownResult,
};

use crate::controller::LandingController;
use crate::propositions::{extract, Proposition, PropositionSet};

/// One row of a serialized transition table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    /// Required proposition values; unlisted inputs are don't-care.
    #[serde(default)]
    pub guard: BTreeMap<String, bool>,
    pub outputs: BTreeMap<String, bool>,
}

/// Serialized transition-table artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionTable {
    /// Propositions the table reads, in assignment bit order.
    pub inputs: Vec<Proposition>,
    pub initial: String,
    pub transitions: Vec<Transition>,
}

impl TransitionTable {
    pub fn from_json(json: &str) -> TouchdownResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TouchdownError::Table(format!("JSON parse error: {e}")))
    }

    pub fn to_json(&self) -> TouchdownResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TouchdownError::Table(format!("JSON encode error: {e}")))
    }
}

/// Index of a state in a compiled table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableState(usize);

#[derive(Debug, Clone)]
struct CompiledTransition {
    to: TableState,
    care_mask: u32,
    care_bits: u32,
    /// `no_op`, `fire_left`, `fire_main`, `fire_right`, by thruster index.
    action_flags: [bool; 4],
    aux: BTreeMap<String, bool>,
}

impl CompiledTransition {
    #[inline]
    fn matches(&self, bits: u32) -> bool {
        bits & self.care_mask == self.care_bits
    }

    fn decode(&self) -> TouchdownResult<Thruster> {
        let mut set = Thruster::ALL
            .iter()
            .zip(self.action_flags)
            .filter(|(_, on)| *on)
            .map(|(t, _)| *t);
        match (set.next(), set.next()) {
            (Some(thruster), None) => Ok(thruster),
            (None, _) => Err(TouchdownError::Protocol(
                "transition output sets no action flag".to_string(),
            )),
            (Some(first), Some(second)) => Err(TouchdownError::Protocol(format!(
                "transition output is not one-hot: {first} and {second} both set"
            ))),
        }
    }
}

/// Result of advancing a compiled table by one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStep {
    pub next: TableState,
    pub thruster: Thruster,
    /// Auxiliary output flags of the taken transition (e.g. `landed`).
    pub aux: BTreeMap<String, bool>,
}

/// Validated, index-based form of a [`TransitionTable`].
#[derive(Debug, Clone)]
pub struct CompiledTable {
    inputs: Vec<Proposition>,
    state_names: Vec<String>,
    initial: TableState,
    /// Outgoing transitions per state.
    outgoing: Vec<Vec<CompiledTransition>>,
    reachable: Vec<TableState>,
}

fn format_assignment(inputs: &[Proposition], bits: u32) -> String {
    let parts: Vec<String> = inputs
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{p}={}", bits & (1 << i) != 0))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

impl CompiledTable {
    /// Validate and index a table.
    pub fn compile(table: &TransitionTable) -> TouchdownResult<Self> {
        let inputs = table.inputs.clone();
        for (i, p) in inputs.iter().enumerate() {
            if inputs[..i].contains(p) {
                return Err(TouchdownError::Table(format!(
                    "input '{p}' declared more than once"
                )));
            }
        }

        let mut index: HashMap<&str, TableState> = HashMap::new();
        let mut state_names = Vec::new();
        for t in &table.transitions {
            for name in [t.from.as_str(), t.to.as_str()] {
                if !index.contains_key(name) {
                    index.insert(name, TableState(state_names.len()));
                    state_names.push(name.to_string());
                }
            }
        }

        let initial = *index.get(table.initial.as_str()).ok_or_else(|| {
            TouchdownError::Table(format!(
                "initial state '{}' has no transitions",
                table.initial
            ))
        })?;

        let mut outgoing: Vec<Vec<CompiledTransition>> = vec![Vec::new(); state_names.len()];
        for (row, t) in table.transitions.iter().enumerate() {
            let (mut care_mask, mut care_bits) = (0u32, 0u32);
            for (key, &value) in &t.guard {
                let prop: Proposition = key.parse().map_err(|_| {
                    TouchdownError::Table(format!("row {row}: unknown proposition '{key}'"))
                })?;
                let bit = inputs.iter().position(|p| *p == prop).ok_or_else(|| {
                    TouchdownError::Table(format!(
                        "row {row}: guard on undeclared input '{prop}'"
                    ))
                })?;
                care_mask |= 1 << bit;
                if value {
                    care_bits |= 1 << bit;
                }
            }

            let mut action_flags = [false; 4];
            let mut flag_keys: [Option<&str>; 4] = [None; 4];
            let mut aux = BTreeMap::new();
            for (name, &value) in &t.outputs {
                match name.parse::<Thruster>() {
                    Ok(thruster) => {
                        let slot = usize::from(thruster.index());
                        if let Some(prev) = flag_keys[slot] {
                            return Err(TouchdownError::Table(format!(
                                "row {row}: outputs set {thruster} through both '{prev}' and '{name}'"
                            )));
                        }
                        flag_keys[slot] = Some(name.as_str());
                        action_flags[slot] = value;
                    }
                    Err(_) => {
                        aux.insert(name.clone(), value);
                    }
                }
            }

            outgoing[index[t.from.as_str()].0].push(CompiledTransition {
                to: index[t.to.as_str()],
                care_mask,
                care_bits,
                action_flags,
                aux,
            });
        }

        let compiled = Self {
            inputs,
            state_names,
            initial,
            outgoing,
            reachable: Vec::new(),
        };
        let reachable = compiled.reachable_from_initial();
        let compiled = Self {
            reachable,
            ..compiled
        };
        compiled.check_total_and_deterministic()?;

        log::info!(
            "Transition table compiled: {} states ({} reachable), {} inputs",
            compiled.state_names.len(),
            compiled.reachable.len(),
            compiled.inputs.len()
        );
        Ok(compiled)
    }

    fn reachable_from_initial(&self) -> Vec<TableState> {
        let mut seen = vec![false; self.state_names.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([self.initial]);
        seen[self.initial.0] = true;
        while let Some(state) = queue.pop_front() {
            order.push(state);
            for t in &self.outgoing[state.0] {
                if !seen[t.to.0] {
                    seen[t.to.0] = true;
                    queue.push_back(t.to);
                }
            }
        }
        order
    }

    fn check_total_and_deterministic(&self) -> TouchdownResult<()> {
        for &state in &self.reachable {
            for bits in self.assignments() {
                let matched = self.match_count(state, bits);
                if matched != 1 {
                    let kind = if matched == 0 { "no" } else { "multiple" };
                    return Err(TouchdownError::Table(format!(
                        "state '{}' has {kind} transitions ({matched}) for {}",
                        self.state_name(state),
                        format_assignment(&self.inputs, bits)
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every assignment of the declared inputs, as bit vectors.
    pub fn assignments(&self) -> impl Iterator<Item = u32> {
        0..(1u32 << self.inputs.len())
    }

    fn matching(&self, state: TableState, bits: u32) -> impl Iterator<Item = &CompiledTransition> {
        self.outgoing[state.0]
            .iter()
            .filter(move |t| t.matches(bits))
    }

    /// Number of transitions that match `bits` in `state`.
    pub fn match_count(&self, state: TableState, bits: u32) -> usize {
        self.matching(state, bits).count()
    }

    /// Advance from `state` on the current propositions.
    pub fn step(&self, state: TableState, props: &PropositionSet) -> TouchdownResult<TableStep> {
        let bits = props.project(&self.inputs);
        let mut matched = self
            .outgoing
            .get(state.0)
            .into_iter()
            .flatten()
            .filter(|t| t.matches(bits));
        let transition = match (matched.next(), matched.next()) {
            (Some(t), None) => t,
            (None, _) => {
                return Err(TouchdownError::Protocol(format!(
                    "no transition from '{}' for {}",
                    self.state_name(state),
                    format_assignment(&self.inputs, bits)
                )))
            }
            (Some(_), Some(_)) => {
                return Err(TouchdownError::Protocol(format!(
                    "ambiguous transition from '{}' for {}",
                    self.state_name(state),
                    format_assignment(&self.inputs, bits)
                )))
            }
        };

        Ok(TableStep {
            next: transition.to,
            thruster: transition.decode()?,
            aux: transition.aux.clone(),
        })
    }

    pub fn inputs(&self) -> &[Proposition] {
        &self.inputs
    }

    pub fn initial(&self) -> TableState {
        self.initial
    }

    pub fn reachable(&self) -> &[TableState] {
        &self.reachable
    }

    pub fn state_name(&self, state: TableState) -> &str {
        self.state_names
            .get(state.0)
            .map_or("<invalid>", String::as_str)
    }
}

/// Controller backed by a synthesized transition table.
///
/// The current table state is the only controller-owned mutable state; it
/// is path-dependent, so [`reset`](LandingController::reset) must be called
/// between episodes. Once both legs are down the controller terminates.
#[derive(Debug, Clone)]
pub struct TableController {
    thresholds: LanderThresholds,
    table: CompiledTable,
    current: TableState,
    last_aux: BTreeMap<String, bool>,
}

impl TableController {
    pub fn new(thresholds: LanderThresholds, table: &TransitionTable) -> TouchdownResult<Self> {
        thresholds.validate()?;
        let table = CompiledTable::compile(table)?;
        if table.inputs().contains(&Proposition::AngularVelocitySafe)
            && !thresholds.tracks_angular_velocity()
        {
            return Err(TouchdownError::Config(
                "table reads angular_velocity_safe but angular_velocity_threshold is unset"
                    .to_string(),
            ));
        }
        let current = table.initial();
        Ok(Self {
            thresholds,
            table,
            current,
            last_aux: BTreeMap::new(),
        })
    }

    pub fn from_json(thresholds: LanderThresholds, json: &str) -> TouchdownResult<Self> {
        Self::new(thresholds, &TransitionTable::from_json(json)?)
    }

    pub fn current_state(&self) -> &str {
        self.table.state_name(self.current)
    }

    /// Auxiliary outputs of the last transition taken.
    pub fn aux_outputs(&self) -> &BTreeMap<String, bool> {
        &self.last_aux
    }

    pub fn table(&self) -> &CompiledTable {
        &self.table
    }
}

impl LandingController for TableController {
    fn name(&self) -> &str {
        "table"
    }

    fn step(&mut self, state: &LanderState) -> TouchdownResult<Action> {
        let props = extract(state, &self.thresholds);
        let step = self.table.step(self.current, &props).map_err(|e| {
            log::error!("Transition table violated its contract: {e}");
            e
        })?;

        if step.next != self.current {
            log::debug!(
                "Table state: {} -> {}",
                self.table.state_name(self.current),
                self.table.state_name(step.next)
            );
        }
        self.current = step.next;
        self.last_aux = step.aux;

        if props.touchdown {
            log::info!("Touchdown detected, table controller terminating");
            return Ok(Action::Terminate);
        }
        Ok(Action::Actuate(step.thruster))
    }

    fn reset(&mut self) {
        self.current = self.table.initial();
        self.last_aux.clear();
        log::info!("Table controller reset to '{}'", self.current_state());
    }
}
