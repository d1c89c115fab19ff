//! Thorium reactor digital twin
//!
//! Maps operating inputs (power setting, coolant temperature and flow, fuel
//! composition, burnup) to thermal and electrical output, conversion
//! efficiency, burnup rate and waste intensity. `run` sweeps one input across
//! its range to produce a chartable curve, `transient` follows the core
//! through a step change in power demand.

use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{report_defect, NumericDomainError, Result, ValidationError};
use crate::params::{ParamSpec, ParameterKind, ParameterSet};
use crate::physics;
use crate::series::ResultSeries;

/// Reference design values (920 MWth heavy-water moderated thorium core)
pub mod constants {
    pub const NOMINAL_THERMAL_MW: f64 = 920.0;
    pub const HEAVY_METAL_T: f64 = 52.0;
    pub const SINK_TEMPERATURE_K: f64 = 303.15;
    pub const THERMAL_TIME_CONSTANT_S: f64 = 20.0;
    pub const FUEL_TEMPERATURE_RISE_K: f64 = 400.0;
    pub const TRANSIENT_DT_S: f64 = 1.0;
}

/// Output metric names
pub mod metrics {
    pub const THERMAL_OUTPUT: &str = "thermal_output_MW";
    pub const ELECTRICAL_OUTPUT: &str = "electrical_output_MW";
    pub const EFFICIENCY: &str = "efficiency";
    pub const THERMAL_FRACTION: &str = "thermal_fraction";
    pub const BURNUP_RATE: &str = "fuel_burnup_rate_GWd_per_t_yr";
    pub const WASTE_INTENSITY: &str = "waste_intensity_kg_per_TWh";
    pub const FUEL_TEMPERATURE: &str = "fuel_temperature_K";
}

pub const REACTOR_SCHEMA: &[ParamSpec] = &[
    ParamSpec { name: "power_setting", unit: "fraction", min: 0.0, max: 1.0, default: None, integer: false },
    ParamSpec { name: "coolant_temperature_K", unit: "K", min: 573.15, max: 1473.15, default: Some(873.15), integer: false },
    ParamSpec { name: "coolant_flow", unit: "fraction", min: 0.1, max: 1.0, default: Some(1.0), integer: false },
    ParamSpec { name: "thorium_fraction", unit: "fraction", min: 0.0, max: 1.0, default: Some(1.0), integer: false },
    ParamSpec { name: "burnup_GWd_per_t", unit: "GWd/t", min: 10.0, max: 120.0, default: Some(40.0), integer: false },
    ParamSpec { name: "sweep_axis", unit: "0=power, 1=temperature", min: 0.0, max: 1.0, default: Some(0.0), integer: true },
    ParamSpec { name: "sweep_steps", unit: "intervals", min: 0.0, max: 100.0, default: Some(10.0), integer: true },
    ParamSpec { name: "transient_seconds", unit: "s", min: 1.0, max: 3600.0, default: Some(120.0), integer: true },
];

/// Parameters read by [`ReactorSimulator::run`]
pub const SWEEP_INPUTS: &[&str] = &[
    "power_setting",
    "coolant_temperature_K",
    "coolant_flow",
    "thorium_fraction",
    "burnup_GWd_per_t",
    "sweep_axis",
    "sweep_steps",
];

/// Parameters read by [`ReactorSimulator::transient`]
pub const TRANSIENT_INPUTS: &[&str] = &[
    "power_setting",
    "coolant_temperature_K",
    "coolant_flow",
    "thorium_fraction",
    "transient_seconds",
];

/// Design coefficients of the modelled core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReactorCoefficients {
    pub nominal_thermal_mw: f64,
    pub heavy_metal_t: f64,
    pub sink_temperature_k: f64,
    pub thermal_time_constant_s: f64,
    pub fuel_temperature_rise_k: f64,
}

impl Default for ReactorCoefficients {
    fn default() -> Self {
        Self {
            nominal_thermal_mw: constants::NOMINAL_THERMAL_MW,
            heavy_metal_t: constants::HEAVY_METAL_T,
            sink_temperature_k: constants::SINK_TEMPERATURE_K,
            thermal_time_constant_s: constants::THERMAL_TIME_CONSTANT_S,
            fuel_temperature_rise_k: constants::FUEL_TEMPERATURE_RISE_K,
        }
    }
}

/// Input varied by a steady-state sweep
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SweepAxis {
    PowerSetting,
    CoolantTemperature,
}

impl SweepAxis {
    fn from_code(code: f64) -> std::result::Result<Self, ValidationError> {
        match code as i64 {
            0 => Ok(SweepAxis::PowerSetting),
            1 => Ok(SweepAxis::CoolantTemperature),
            _ => Err(ValidationError::OutOfRange {
                parameter: "sweep_axis".into(),
                value: code,
                min: 0.0,
                max: 1.0,
            }),
        }
    }

    pub fn parameter(self) -> &'static str {
        match self {
            SweepAxis::PowerSetting => "power_setting",
            SweepAxis::CoolantTemperature => "coolant_temperature_K",
        }
    }
}

/// Operating inputs of one steady-state evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
struct OperatingPoint {
    power_setting: f64,
    coolant_temperature_k: f64,
    coolant_flow: f64,
    thorium_fraction: f64,
    burnup: f64,
}

#[derive(Debug, Clone, Copy)]
struct ReactorInputs {
    point: OperatingPoint,
    axis: SweepAxis,
    sweep_steps: usize,
    transient_seconds: usize,
}

impl ReactorInputs {
    fn from_params(params: &ParameterSet) -> std::result::Result<Self, ValidationError> {
        params.expect_kind(ParameterKind::Reactor)?;
        Ok(Self {
            point: OperatingPoint {
                power_setting: params.require("power_setting")?,
                coolant_temperature_k: params.require("coolant_temperature_K")?,
                coolant_flow: params.require("coolant_flow")?,
                thorium_fraction: params.require("thorium_fraction")?,
                burnup: params.require("burnup_GWd_per_t")?,
            },
            axis: SweepAxis::from_code(params.require("sweep_axis")?)?,
            sweep_steps: params.require("sweep_steps")? as usize,
            transient_seconds: params.require("transient_seconds")? as usize,
        })
    }

    /// Values of the swept input; the supplied point alone when `sweep_steps` is 0
    fn sweep_grid(&self) -> std::result::Result<Array1<f64>, ValidationError> {
        let current = match self.axis {
            SweepAxis::PowerSetting => self.point.power_setting,
            SweepAxis::CoolantTemperature => self.point.coolant_temperature_k,
        };
        if self.sweep_steps == 0 {
            return Ok(Array1::from_elem(1, current));
        }
        let parameter = self.axis.parameter();
        let spec = ParameterKind::Reactor
            .spec(parameter)
            .ok_or_else(|| ValidationError::Missing {
                parameter: parameter.to_string(),
            })?;
        let mut grid = Array1::linspace(spec.min, spec.max, self.sweep_steps + 1)
            .mapv(|value| value.clamp(spec.min, spec.max));
        // endpoints must hit the declared bounds exactly
        grid[self.sweep_steps] = spec.max;
        Ok(grid)
    }

    fn at(&self, value: f64) -> OperatingPoint {
        let mut point = self.point;
        match self.axis {
            SweepAxis::PowerSetting => point.power_setting = value,
            SweepAxis::CoolantTemperature => point.coolant_temperature_k = value,
        }
        point
    }
}

/// Steady-state performance at one operating point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReactorPoint {
    pub power_setting: f64,
    pub coolant_temperature_k: f64,
    pub thermal_output_mw: f64,
    pub electrical_output_mw: f64,
    pub efficiency: f64,
    pub thermal_fraction: f64,
    pub fuel_burnup_rate: f64,
    pub waste_intensity: f64,
}

/// Deterministic reactor performance model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactorSimulator {
    coefficients: ReactorCoefficients,
}

impl ReactorSimulator {
    pub fn new(coefficients: ReactorCoefficients) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &ReactorCoefficients {
        &self.coefficients
    }

    /// Steady-state performance at the supplied inputs
    pub fn steady_state(&self, params: &ParameterSet) -> Result<ReactorPoint> {
        let inputs = ReactorInputs::from_params(params)?;
        self.evaluate(&inputs.point)
            .map_err(|err| report_defect("reactor", err))
    }

    /// Steady-state curve across the configured sweep axis
    pub fn run(&self, params: &ParameterSet) -> Result<ResultSeries> {
        let inputs = ReactorInputs::from_params(params)?;
        let grid = inputs.sweep_grid()?;
        debug!(
            "reactor sweep over {} with {} points",
            inputs.axis.parameter(),
            grid.len()
        );

        let points = grid
            .iter()
            .map(|&value| self.evaluate(&inputs.at(value)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| report_defect("reactor", err))?;

        let column = |f: fn(&ReactorPoint) -> f64| points.iter().map(f).collect::<Vec<_>>();
        ResultSeries::builder(inputs.axis.parameter(), grid.to_vec())
            .metric(metrics::THERMAL_OUTPUT, column(|p| p.thermal_output_mw))
            .metric(metrics::ELECTRICAL_OUTPUT, column(|p| p.electrical_output_mw))
            .metric(metrics::EFFICIENCY, column(|p| p.efficiency))
            .metric(metrics::THERMAL_FRACTION, column(|p| p.thermal_fraction))
            .metric(metrics::BURNUP_RATE, column(|p| p.fuel_burnup_rate))
            .metric(metrics::WASTE_INTENSITY, column(|p| p.waste_intensity))
            .meta("model", "reactor")
            .meta("mode", "sweep")
            .meta("sweep_axis", inputs.axis.parameter())
            .build()
            .map_err(|err| report_defect("reactor", err))
    }

    /// Response to a step in demand from zero to the power setting
    ///
    /// Thermal power follows a first-order lag whose time constant shrinks
    /// with coolant flow; efficiency is taken at the supplied temperature.
    pub fn transient(&self, params: &ParameterSet) -> Result<ResultSeries> {
        let inputs = ReactorInputs::from_params(params)?;
        let point = inputs.point;
        let c = &self.coefficients;
        debug!("reactor transient over {} s", inputs.transient_seconds);

        let (labels, thermal) = self
            .lag_trajectory(&point, inputs.transient_seconds)
            .map_err(|err| report_defect("reactor", err))?;
        let efficiency =
            physics::conversion_efficiency(point.coolant_temperature_k, point.thorium_fraction, c.sink_temperature_k)
                .map_err(|err| report_defect("reactor", err))?;

        let fractions: Vec<f64> = thermal
            .iter()
            .map(|mw| physics::clamp_fraction(mw / c.nominal_thermal_mw))
            .collect();
        let electrical: Vec<f64> = thermal.iter().map(|mw| mw * efficiency).collect();
        let fuel_temperature: Vec<f64> = fractions
            .iter()
            .map(|&fraction| {
                physics::fuel_temperature(point.coolant_temperature_k, fraction, c.fuel_temperature_rise_k)
            })
            .collect();

        ResultSeries::builder("time_s", labels)
            .metric(metrics::THERMAL_OUTPUT, thermal)
            .metric(metrics::ELECTRICAL_OUTPUT, electrical)
            .metric(metrics::THERMAL_FRACTION, fractions)
            .metric(metrics::FUEL_TEMPERATURE, fuel_temperature)
            .meta("model", "reactor")
            .meta("mode", "transient")
            .build()
            .map_err(|err| report_defect("reactor", err))
    }

    fn lag_trajectory(
        &self,
        point: &OperatingPoint,
        seconds: usize,
    ) -> std::result::Result<(Vec<f64>, Vec<f64>), NumericDomainError> {
        let c = &self.coefficients;
        let target = physics::thermal_power(point.power_setting, point.coolant_flow, c.nominal_thermal_mw);
        let tau = c.thermal_time_constant_s / point.coolant_flow;

        let mut labels = Vec::with_capacity(seconds + 1);
        let mut thermal = Vec::with_capacity(seconds + 1);
        let mut power = 0.0;
        for step in 0..=seconds {
            labels.push(step as f64 * constants::TRANSIENT_DT_S);
            thermal.push(power);
            power = physics::lag_step(power, target, constants::TRANSIENT_DT_S, tau)?;
        }
        Ok((labels, thermal))
    }

    fn evaluate(&self, point: &OperatingPoint) -> std::result::Result<ReactorPoint, NumericDomainError> {
        let c = &self.coefficients;
        let thermal = physics::thermal_power(point.power_setting, point.coolant_flow, c.nominal_thermal_mw);
        let efficiency =
            physics::conversion_efficiency(point.coolant_temperature_k, point.thorium_fraction, c.sink_temperature_k)?;

        Ok(ReactorPoint {
            power_setting: point.power_setting,
            coolant_temperature_k: point.coolant_temperature_k,
            thermal_output_mw: thermal,
            electrical_output_mw: thermal * efficiency,
            efficiency,
            thermal_fraction: physics::clamp_fraction(thermal / c.nominal_thermal_mw),
            fuel_burnup_rate: physics::burnup_rate(thermal, c.heavy_metal_t)?,
            waste_intensity: physics::waste_intensity(point.burnup, point.thorium_fraction),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    fn reactor(pairs: &[(&str, f64)]) -> ParameterSet {
        ParameterSet::from_pairs(ParameterKind::Reactor, pairs).unwrap()
    }

    #[test]
    fn test_power_sweep_shape() {
        let series = ReactorSimulator::default()
            .run(&reactor(&[("power_setting", 0.7)]))
            .unwrap();
        assert_eq!(series.label_name(), "power_setting");
        assert_eq!(series.len(), 11);
        assert_eq!(series.labels()[0], 0.0);
        assert_eq!(series.labels()[10], 1.0);
        assert_eq!(series.metadata()["sweep_axis"], "power_setting");
    }

    #[test]
    fn test_zero_power_gives_zero_output() {
        let sim = ReactorSimulator::default();
        let point = sim.steady_state(&reactor(&[("power_setting", 0.0)])).unwrap();
        assert_eq!(point.thermal_output_mw, 0.0);
        assert_eq!(point.electrical_output_mw, 0.0);
        assert_eq!(point.fuel_burnup_rate, 0.0);

        let series = sim.run(&reactor(&[("power_setting", 0.5)])).unwrap();
        assert_eq!(series.metric(metrics::THERMAL_OUTPUT).unwrap()[0], 0.0);
        assert_eq!(series.metric(metrics::ELECTRICAL_OUTPUT).unwrap()[0], 0.0);
    }

    #[test]
    fn test_flow_limits_thermal_output() {
        let point = ReactorSimulator::default()
            .steady_state(&reactor(&[("power_setting", 1.0), ("coolant_flow", 0.6)]))
            .unwrap();
        assert!((point.thermal_fraction - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_temperature_sweep_spans_declared_range() {
        let series = ReactorSimulator::default()
            .run(&reactor(&[("power_setting", 1.0), ("sweep_axis", 1.0), ("sweep_steps", 9.0)]))
            .unwrap();
        assert_eq!(series.label_name(), "coolant_temperature_K");
        assert_eq!(series.len(), 10);
        assert_eq!(series.labels()[0], 573.15);
        assert_eq!(series.labels()[9], 1473.15);
        let efficiency = series.metric(metrics::EFFICIENCY).unwrap();
        assert!(efficiency.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_zero_steps_is_single_steady_state_point() {
        let params = reactor(&[("power_setting", 0.42), ("sweep_steps", 0.0)]);
        let sim = ReactorSimulator::default();
        let series = sim.run(&params).unwrap();
        let point = sim.steady_state(&params).unwrap();
        assert_eq!(series.labels(), &[0.42]);
        assert_eq!(series.metric(metrics::THERMAL_OUTPUT).unwrap(), &[point.thermal_output_mw]);
    }

    #[test]
    fn test_uranium_less_efficient_and_more_waste() {
        let sim = ReactorSimulator::default();
        let thorium = sim.steady_state(&reactor(&[("power_setting", 1.0)])).unwrap();
        let uranium = sim
            .steady_state(&reactor(&[("power_setting", 1.0), ("thorium_fraction", 0.0)]))
            .unwrap();
        assert!(thorium.efficiency > uranium.efficiency);
        assert!(thorium.waste_intensity < uranium.waste_intensity);
    }

    #[test]
    fn test_transient_rises_towards_target() {
        let series = ReactorSimulator::default()
            .transient(&reactor(&[("power_setting", 0.8), ("transient_seconds", 400.0)]))
            .unwrap();
        assert_eq!(series.len(), 401);
        let thermal = series.metric(metrics::THERMAL_OUTPUT).unwrap();
        assert_eq!(thermal[0], 0.0);
        assert!(thermal.windows(2).all(|w| w[1] >= w[0]));
        let target = 0.8 * constants::NOMINAL_THERMAL_MW;
        assert!(thermal[400] <= target);
        assert!(target - thermal[400] < 1e-3);
    }

    #[test]
    fn test_transient_at_zero_power_stays_cold() {
        let series = ReactorSimulator::default()
            .transient(&reactor(&[("power_setting", 0.0), ("transient_seconds", 10.0)]))
            .unwrap();
        assert!(series.metric(metrics::THERMAL_OUTPUT).unwrap().iter().all(|&mw| mw == 0.0));
        assert!(series
            .metric(metrics::FUEL_TEMPERATURE)
            .unwrap()
            .iter()
            .all(|&t| t == 873.15));
    }

    #[test]
    fn test_policy_parameters_rejected() {
        let params = ParameterSet::from_pairs(
            ParameterKind::Policy,
            &[("adoption_rate", 0.1), ("ev_growth_rate", 0.1), ("horizon_years", 5.0)],
        )
        .unwrap();
        let err = ReactorSimulator::default().run(&params).unwrap_err();
        assert!(matches!(err, SimError::Validation(ValidationError::WrongKind { .. })));
    }

    #[test]
    fn test_full_power_reference_point() {
        // 600 °C outlet, pure thorium: 30 % + 300/100 % = 33 %
        let point = ReactorSimulator::default()
            .steady_state(&reactor(&[("power_setting", 1.0), ("coolant_temperature_K", 873.15)]))
            .unwrap();
        assert_eq!(point.thermal_output_mw, 920.0);
        assert!((point.efficiency - 0.33).abs() < 1e-12);
        assert!((point.electrical_output_mw - 920.0 * 0.33).abs() < 1e-9);
        assert!((point.fuel_burnup_rate - 920.0 * 365.25 / 52_000.0).abs() < 1e-12);
        assert!((point.fuel_burnup_rate - 6.462_115_384_615).abs() < 1e-9);
        // 5 + 40/50 kg/TWh
        assert!((point.waste_intensity - 5.8).abs() < 1e-12);
    }

    #[test]
    fn test_sweep_ignores_transient_length() {
        let sim = ReactorSimulator::default();
        let short = reactor(&[("power_setting", 0.6), ("transient_seconds", 10.0)]);
        let long = reactor(&[("power_setting", 0.6), ("transient_seconds", 900.0)]);
        assert_eq!(sim.run(&short).unwrap(), sim.run(&long).unwrap());
        assert_eq!(short.key_for(SWEEP_INPUTS), long.key_for(SWEEP_INPUTS));
    }

    #[test]
    fn test_transient_ignores_sweep_and_burnup() {
        let sim = ReactorSimulator::default();
        let a = reactor(&[("power_setting", 0.6), ("transient_seconds", 30.0)]);
        let b = reactor(&[
            ("power_setting", 0.6),
            ("transient_seconds", 30.0),
            ("burnup_GWd_per_t", 90.0),
            ("sweep_axis", 1.0),
            ("sweep_steps", 3.0),
        ]);
        assert_eq!(sim.transient(&a).unwrap(), sim.transient(&b).unwrap());
        assert_eq!(a.key_for(TRANSIENT_INPUTS), b.key_for(TRANSIENT_INPUTS));
    }

    #[test]
    fn test_degenerate_coefficients_surface_as_defect() {
        let sim = ReactorSimulator::new(ReactorCoefficients {
            heavy_metal_t: 0.0,
            ..ReactorCoefficients::default()
        });
        let err = sim.run(&reactor(&[("power_setting", 0.5)])).unwrap_err();
        assert!(matches!(err, SimError::NumericDomain(_)));
    }
}
