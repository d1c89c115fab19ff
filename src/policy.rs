//! National thorium adoption and EV penetration projection
//!
//! Year by year, installed thorium capacity (as a fraction of the planned
//! reactor fleet) and EV share of the vehicle fleet grow by their yearly
//! increments, saturating at 1. Each year's thorium generation displaces
//! fossil generation, and each EV replaces a combustion vehicle charged from
//! whatever fossil share remains on the grid. Savings accumulate; year 0 is
//! the initial state with nothing saved yet.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{report_defect, NumericDomainError, Result, ValidationError};
use crate::params::{ParamSpec, ParameterKind, ParameterSet};
use crate::physics::clamp_fraction;
use crate::series::ResultSeries;

pub mod constants {
    pub const CAPACITY_FACTOR: f64 = 0.85;
    pub const HOURS_PER_YEAR: f64 = 8760.0;
    /// Share of national generation that is fossil and can be displaced
    pub const FOSSIL_SHARE: f64 = 0.75;
    pub const EV_KWH_PER_KM: f64 = 0.15;
    pub const KM_PER_VEHICLE_YEAR: f64 = 10_000.0;
}

/// Output metric names
pub mod metrics {
    pub const CAPACITY: &str = "thorium_capacity_fraction";
    pub const EV_FRACTION: &str = "ev_fraction";
    pub const THORIUM_GENERATION: &str = "thorium_generation_TWh";
    pub const GRID_SHARE: &str = "thorium_grid_share";
    pub const DISPLACED_FOSSIL: &str = "displaced_fossil_TWh";
    pub const ANNUAL_CO2_SAVED: &str = "annual_co2_saved_Mt";
    pub const CO2_SAVED: &str = "co2_saved_Mt";
    pub const EVS_SUPPORTED: &str = "evs_supported";
}

pub const POLICY_SCHEMA: &[ParamSpec] = &[
    ParamSpec { name: "adoption_rate", unit: "fraction/year", min: 0.0, max: 1.0, default: None, integer: false },
    ParamSpec { name: "ev_growth_rate", unit: "fraction/year", min: 0.0, max: 1.0, default: None, integer: false },
    ParamSpec { name: "horizon_years", unit: "years", min: 0.0, max: 100.0, default: None, integer: true },
    ParamSpec { name: "initial_capacity", unit: "fraction", min: 0.0, max: 1.0, default: Some(0.0), integer: false },
    ParamSpec { name: "initial_ev_fraction", unit: "fraction", min: 0.0, max: 1.0, default: Some(0.0), integer: false },
    ParamSpec { name: "reactor_capacity_MW", unit: "MWe", min: 100.0, max: 5000.0, default: Some(300.0), integer: false },
    ParamSpec { name: "reactor_units", unit: "count", min: 1.0, max: 100.0, default: Some(5.0), integer: true },
    ParamSpec { name: "national_generation_TWh", unit: "TWh/year", min: 100.0, max: 10_000.0, default: Some(1700.0), integer: false },
    ParamSpec { name: "vehicle_fleet_millions", unit: "million vehicles", min: 1.0, max: 500.0, default: Some(60.0), integer: false },
    ParamSpec { name: "grid_emission_factor", unit: "Mt CO2/TWh", min: 0.1, max: 1.5, default: Some(0.8), integer: false },
    ParamSpec { name: "ice_emission_g_per_km", unit: "g CO2/km", min: 50.0, max: 400.0, default: Some(170.0), integer: false },
];

/// Fleet and grid coefficients shared by every scenario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyCoefficients {
    pub capacity_factor: f64,
    pub fossil_share: f64,
    pub ev_kwh_per_km: f64,
    pub km_per_vehicle_year: f64,
}

impl Default for PolicyCoefficients {
    fn default() -> Self {
        Self {
            capacity_factor: constants::CAPACITY_FACTOR,
            fossil_share: constants::FOSSIL_SHARE,
            ev_kwh_per_km: constants::EV_KWH_PER_KM,
            km_per_vehicle_year: constants::KM_PER_VEHICLE_YEAR,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PolicyInputs {
    adoption_rate: f64,
    ev_growth_rate: f64,
    horizon_years: usize,
    initial_capacity: f64,
    initial_ev_fraction: f64,
    reactor_capacity_mw: f64,
    reactor_units: f64,
    national_generation_twh: f64,
    vehicle_fleet: f64,
    grid_emission_factor: f64,
    ice_emission_g_per_km: f64,
}

impl PolicyInputs {
    fn from_params(params: &ParameterSet) -> std::result::Result<Self, ValidationError> {
        params.expect_kind(ParameterKind::Policy)?;
        Ok(Self {
            adoption_rate: params.require("adoption_rate")?,
            ev_growth_rate: params.require("ev_growth_rate")?,
            horizon_years: params.require("horizon_years")? as usize,
            initial_capacity: params.require("initial_capacity")?,
            initial_ev_fraction: params.require("initial_ev_fraction")?,
            reactor_capacity_mw: params.require("reactor_capacity_MW")?,
            reactor_units: params.require("reactor_units")?,
            national_generation_twh: params.require("national_generation_TWh")?,
            vehicle_fleet: params.require("vehicle_fleet_millions")? * 1e6,
            grid_emission_factor: params.require("grid_emission_factor")?,
            ice_emission_g_per_km: params.require("ice_emission_g_per_km")?,
        })
    }
}

/// Adoption state carried from one year to the next
#[derive(Debug, Clone, Copy, PartialEq)]
struct YearState {
    capacity: f64,
    ev_fraction: f64,
    co2_saved: f64,
}

impl YearState {
    fn initial(inputs: &PolicyInputs) -> Self {
        Self {
            capacity: inputs.initial_capacity,
            ev_fraction: inputs.initial_ev_fraction,
            co2_saved: 0.0,
        }
    }
}

/// Energy-mix quantities derived from one year's adoption state
#[derive(Debug, Clone, Copy, PartialEq)]
struct YearImpact {
    thorium_twh: f64,
    grid_share: f64,
    displaced_twh: f64,
    co2_saved: f64,
    evs_supported: f64,
}

/// Deterministic multi-year policy projection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicySimulator {
    coefficients: PolicyCoefficients,
}

impl PolicySimulator {
    pub fn new(coefficients: PolicyCoefficients) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &PolicyCoefficients {
        &self.coefficients
    }

    /// Project years 0 through the horizon, inclusive
    pub fn project(&self, params: &ParameterSet) -> Result<ResultSeries> {
        let inputs = PolicyInputs::from_params(params)?;
        debug!(
            "policy projection over {} years (adoption {}, ev growth {})",
            inputs.horizon_years, inputs.adoption_rate, inputs.ev_growth_rate
        );

        let years = inputs.horizon_years + 1;
        let mut labels = Vec::with_capacity(years);
        let mut capacity = Vec::with_capacity(years);
        let mut ev_fraction = Vec::with_capacity(years);
        let mut generation = Vec::with_capacity(years);
        let mut grid_share = Vec::with_capacity(years);
        let mut displaced = Vec::with_capacity(years);
        let mut annual = Vec::with_capacity(years);
        let mut cumulative = Vec::with_capacity(years);
        let mut evs = Vec::with_capacity(years);

        let mut state = YearState::initial(&inputs);
        for year in 0..years {
            let impact = self
                .impact(&inputs, &state)
                .map_err(|err| report_defect("policy", err))?;
            let saved_this_year = if year == 0 {
                0.0
            } else {
                state.co2_saved += impact.co2_saved;
                impact.co2_saved
            };

            labels.push(year as f64);
            capacity.push(state.capacity);
            ev_fraction.push(state.ev_fraction);
            generation.push(impact.thorium_twh);
            grid_share.push(impact.grid_share);
            displaced.push(impact.displaced_twh);
            annual.push(saved_this_year);
            cumulative.push(state.co2_saved);
            evs.push(impact.evs_supported);

            state = YearState {
                capacity: (state.capacity + inputs.adoption_rate).min(1.0),
                ev_fraction: (state.ev_fraction + inputs.ev_growth_rate).min(1.0),
                co2_saved: state.co2_saved,
            };
        }

        ResultSeries::builder("year", labels)
            .metric(metrics::CAPACITY, capacity)
            .metric(metrics::EV_FRACTION, ev_fraction)
            .metric(metrics::THORIUM_GENERATION, generation)
            .metric(metrics::GRID_SHARE, grid_share)
            .metric(metrics::DISPLACED_FOSSIL, displaced)
            .metric(metrics::ANNUAL_CO2_SAVED, annual)
            .metric(metrics::CO2_SAVED, cumulative)
            .metric(metrics::EVS_SUPPORTED, evs)
            .meta("model", "policy")
            .build()
            .map_err(|err| report_defect("policy", err))
    }

    /// Annual generation of the fully built thorium fleet [TWh]
    fn fleet_twh(&self, inputs: &PolicyInputs) -> f64 {
        inputs.reactor_capacity_mw * inputs.reactor_units * self.coefficients.capacity_factor
            * constants::HOURS_PER_YEAR
            / 1e6
    }

    fn impact(&self, inputs: &PolicyInputs, state: &YearState) -> std::result::Result<YearImpact, NumericDomainError> {
        let c = &self.coefficients;
        let national = inputs.national_generation_twh;
        if national <= 0.0 {
            return Err(NumericDomainError::new(
                "thorium_grid_share",
                format!("national generation {national} TWh"),
            ));
        }
        let ev_kwh_per_year = c.ev_kwh_per_km * c.km_per_vehicle_year;
        if ev_kwh_per_year <= 0.0 {
            return Err(NumericDomainError::new(
                "evs_supported",
                format!("EV demand {ev_kwh_per_year} kWh/year"),
            ));
        }

        let thorium_twh = state.capacity * self.fleet_twh(inputs);
        let fossil_twh = national * c.fossil_share;
        let displaced_twh = thorium_twh.min(fossil_twh);
        let grid_saved = displaced_twh * inputs.grid_emission_factor;

        // Mt/TWh equals kg/kWh; remaining fossil mix sets the charging intensity
        let grid_intensity = inputs.grid_emission_factor * (fossil_twh - displaced_twh) / national;
        let ev_g_per_km = c.ev_kwh_per_km * grid_intensity * 1000.0;
        let saving_g_per_km = (inputs.ice_emission_g_per_km - ev_g_per_km).max(0.0);
        let ev_saved = inputs.vehicle_fleet * state.ev_fraction * c.km_per_vehicle_year * saving_g_per_km / 1e12;

        Ok(YearImpact {
            thorium_twh,
            grid_share: clamp_fraction(thorium_twh / national),
            displaced_twh,
            co2_saved: grid_saved + ev_saved,
            evs_supported: thorium_twh * 1e9 / ev_kwh_per_year,
        })
    }
}
