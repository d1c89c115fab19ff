//! Entry points for the UI and export layers
//!
//! Raw values come in, a validated [`ParameterSet`] and a [`ResultSeries`]
//! go out. Nothing here keeps state between calls except the optional
//! [`CachedSimulators`] wrapper, which only memoizes.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::compare::ScenarioComparison;
use crate::config::ModelConfig;
use crate::error::{Result, SimError, ValidationError};
use crate::memo::SimulationCache;
use crate::params::{ParameterKey, ParameterKind, ParameterSet, RawValues, UnknownParameters};
use crate::policy::PolicySimulator;
use crate::reactor::{self, ReactorSimulator};
use crate::series::ResultSeries;

/// Which operation to run on a parameter set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Reactor steady-state sweep
    Sweep,
    /// Reactor step response
    Transient,
    /// Policy year-by-year projection
    Projection,
}

impl SimulationMode {
    pub fn default_for(kind: ParameterKind) -> Self {
        match kind {
            ParameterKind::Reactor => SimulationMode::Sweep,
            ParameterKind::Policy => SimulationMode::Projection,
        }
    }

    fn operation(self) -> &'static str {
        match self {
            SimulationMode::Sweep => "sweep",
            SimulationMode::Transient => "transient",
            SimulationMode::Projection => "projection",
        }
    }

    /// Parameters the operation reads; `None` means all of them
    fn inputs(self) -> Option<&'static [&'static str]> {
        match self {
            SimulationMode::Sweep => Some(reactor::SWEEP_INPUTS),
            SimulationMode::Transient => Some(reactor::TRANSIENT_INPUTS),
            SimulationMode::Projection => None,
        }
    }

    /// Cache key covering only what the operation reads
    fn cache_key(self, params: &ParameterSet) -> ParameterKey {
        match self.inputs() {
            Some(names) => params.key_for(names),
            None => params.key(),
        }
    }

    fn supports(self, kind: ParameterKind) -> bool {
        matches!(
            (kind, self),
            (ParameterKind::Reactor, SimulationMode::Sweep)
                | (ParameterKind::Reactor, SimulationMode::Transient)
                | (ParameterKind::Policy, SimulationMode::Projection)
        )
    }
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

/// Request as sent by the UI layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub kind: ParameterKind,
    #[serde(default)]
    pub mode: Option<SimulationMode>,
    #[serde(default)]
    pub values: RawValues,
}

/// Validated input and computed output, ready for rendering or export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResponse {
    pub mode: SimulationMode,
    pub parameters: ParameterSet,
    pub series: ResultSeries,
}

/// Both simulators, configured once
#[derive(Debug, Clone, Default)]
pub struct Simulators {
    pub reactor: ReactorSimulator,
    pub policy: PolicySimulator,
    pub unknown_parameters: UnknownParameters,
}

impl Simulators {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            reactor: ReactorSimulator::new(config.reactor.clone()),
            policy: PolicySimulator::new(config.policy.clone()),
            unknown_parameters: config.validation.unknown_parameters,
        }
    }

    /// Validate raw values for `kind` under the configured unknown-name policy
    pub fn parameters(&self, kind: ParameterKind, values: &RawValues) -> Result<ParameterSet> {
        ParameterSet::from_raw(kind, values, self.unknown_parameters).map_err(|err| {
            warn!("rejected {kind} input: {err}");
            SimError::from(err)
        })
    }

    pub fn simulate_reactor(&self, values: &RawValues) -> Result<ResultSeries> {
        let params = self.parameters(ParameterKind::Reactor, values)?;
        self.reactor.run(&params)
    }

    pub fn simulate_reactor_transient(&self, values: &RawValues) -> Result<ResultSeries> {
        let params = self.parameters(ParameterKind::Reactor, values)?;
        self.reactor.transient(&params)
    }

    pub fn simulate_policy(&self, values: &RawValues) -> Result<ResultSeries> {
        let params = self.parameters(ParameterKind::Policy, values)?;
        self.policy.project(&params)
    }

    /// Run an already validated parameter set in the given mode
    pub fn execute(&self, mode: SimulationMode, params: &ParameterSet) -> Result<ResultSeries> {
        check_mode(params.kind(), mode)?;
        match mode {
            SimulationMode::Sweep => self.reactor.run(params),
            SimulationMode::Transient => self.reactor.transient(params),
            SimulationMode::Projection => self.policy.project(params),
        }
    }

    pub fn handle_request(&self, request: &SimulationRequest) -> Result<SimulationResponse> {
        let mode = request.mode.unwrap_or_else(|| SimulationMode::default_for(request.kind));
        check_mode(request.kind, mode)?;
        let parameters = self.parameters(request.kind, &request.values)?;
        debug!("handling {} {mode} request", request.kind);
        let series = self.execute(mode, &parameters)?;
        Ok(SimulationResponse {
            mode,
            parameters,
            series,
        })
    }

    /// Project a baseline and an alternative policy over the same years
    pub fn compare_policies(&self, baseline: &RawValues, scenario: &RawValues) -> Result<ScenarioComparison> {
        let baseline = self.simulate_policy(baseline)?;
        let scenario = self.simulate_policy(scenario)?;
        Ok(ScenarioComparison::new(baseline, scenario)?)
    }
}

fn check_mode(kind: ParameterKind, mode: SimulationMode) -> std::result::Result<(), ValidationError> {
    if mode.supports(kind) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedMode {
            kind,
            mode: mode.to_string(),
        })
    }
}

/// Reactor sweep with reference coefficients
pub fn simulate_reactor(values: &RawValues) -> Result<ResultSeries> {
    Simulators::default().simulate_reactor(values)
}

/// Policy projection with reference coefficients
pub fn simulate_policy(values: &RawValues) -> Result<ResultSeries> {
    Simulators::default().simulate_policy(values)
}

/// Simulators behind a shared memoization layer, for concurrent request handlers
#[derive(Debug, Clone, Default)]
pub struct CachedSimulators {
    simulators: Arc<Simulators>,
    cache: Arc<SimulationCache>,
}

impl CachedSimulators {
    pub fn new(simulators: Simulators) -> Self {
        Self::with_cache(simulators, SimulationCache::new())
    }

    pub fn with_cache(simulators: Simulators, cache: SimulationCache) -> Self {
        Self {
            simulators: Arc::new(simulators),
            cache: Arc::new(cache),
        }
    }

    /// Configured simulators behind a cache sized by `[cache] max_entries`
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::with_cache(
            Simulators::from_config(config),
            SimulationCache::with_capacity(config.cache.max_entries),
        )
    }

    pub fn cache(&self) -> &SimulationCache {
        &self.cache
    }

    pub async fn handle_request(&self, request: &SimulationRequest) -> Result<SimulationResponse> {
        let mode = request.mode.unwrap_or_else(|| SimulationMode::default_for(request.kind));
        check_mode(request.kind, mode)?;
        let parameters = self.simulators.parameters(request.kind, &request.values)?;
        let series = self
            .cache
            .get_or_compute_keyed(mode.operation(), mode.cache_key(&parameters), &parameters, |params| {
                self.simulators.execute(mode, params)
            })
            .await?;
        Ok(SimulationResponse {
            mode,
            parameters,
            series: ResultSeries::clone(&series),
        })
    }
}
