//! Reactor physics kernels
//!
//! Small closed-form relations used by the digital twin. Every function is
//! pure; the ones that divide or take a ratio check their domain and report a
//! [`NumericDomainError`] instead of producing NaN or infinity.

use crate::error::NumericDomainError;

/// Absolute zero offset for Celsius conversion
pub const KELVIN_OFFSET: f64 = 273.15;

/// Clamp a ratio that is a fraction by construction but may drift past
/// [0, 1] through rounding.
pub fn clamp_fraction(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Thermal power delivered to the coolant
///
/// Heat removal is limited by coolant flow, so the core cannot run above the
/// flow fraction.
///
/// # Arguments
/// * `power_setting` - Demanded power as fraction of nominal
/// * `coolant_flow` - Coolant flow as fraction of nominal
/// * `nominal_mw` - Nominal thermal power [MW]
///
/// # Returns
/// Thermal power [MW], exactly 0 when `power_setting` is 0
pub fn thermal_power(power_setting: f64, coolant_flow: f64, nominal_mw: f64) -> f64 {
    nominal_mw * power_setting.min(coolant_flow)
}

/// Carnot limit for a heat engine between two reservoirs
///
/// # Arguments
/// * `hot_k` - Hot reservoir temperature [K]
/// * `cold_k` - Cold reservoir temperature [K]
///
/// # Returns
/// Maximum thermodynamic efficiency in [0, 1]
pub fn carnot_limit(hot_k: f64, cold_k: f64) -> Result<f64, NumericDomainError> {
    if hot_k <= 0.0 || !hot_k.is_finite() {
        return Err(NumericDomainError::new(
            "carnot_limit",
            format!("hot reservoir temperature {hot_k} K"),
        ));
    }
    Ok(clamp_fraction(1.0 - cold_k / hot_k))
}

/// Empirical thermal-to-electric conversion efficiency
///
/// Thorium and uranium cores follow separate linear fits in core
/// temperature; mixed loads blend them by thorium fraction. The result is
/// capped by the Carnot limit against the heat sink.
///
/// # Arguments
/// * `coolant_temp_k` - Core outlet coolant temperature [K]
/// * `thorium_fraction` - Share of the fissile load bred from Th-232
/// * `sink_temp_k` - Condenser temperature [K]
///
/// # Returns
/// Efficiency as fraction in [0, 1]
pub fn conversion_efficiency(
    coolant_temp_k: f64,
    thorium_fraction: f64,
    sink_temp_k: f64,
) -> Result<f64, NumericDomainError> {
    let above_reference = coolant_temp_k - KELVIN_OFFSET - 300.0;
    let thorium = (30.0 + above_reference / 100.0) / 100.0;
    let uranium = (25.0 + above_reference / 120.0) / 100.0;
    let blended = thorium_fraction * thorium + (1.0 - thorium_fraction) * uranium;
    let limit = carnot_limit(coolant_temp_k, sink_temp_k)?;
    Ok(clamp_fraction(blended.min(limit)))
}

/// Fuel burnup accumulation rate
///
/// # Arguments
/// * `thermal_mw` - Thermal power [MW]
/// * `heavy_metal_t` - Heavy metal loaded in the core [t]
///
/// # Returns
/// Burnup rate [GWd/t per year]
pub fn burnup_rate(thermal_mw: f64, heavy_metal_t: f64) -> Result<f64, NumericDomainError> {
    if heavy_metal_t <= 0.0 {
        return Err(NumericDomainError::new(
            "burnup_rate",
            format!("heavy metal inventory {heavy_metal_t} t"),
        ));
    }
    Ok(thermal_mw * 365.25 / (1000.0 * heavy_metal_t))
}

/// Long-lived waste produced per unit of electricity
///
/// # Arguments
/// * `burnup` - Discharge burnup [GWd/t]
/// * `thorium_fraction` - Share of the fissile load bred from Th-232
///
/// # Returns
/// Waste intensity [kg/TWh]
pub fn waste_intensity(burnup: f64, thorium_fraction: f64) -> f64 {
    let thorium = 5.0 + burnup / 50.0;
    let uranium = 10.0 + burnup / 40.0;
    thorium_fraction * thorium + (1.0 - thorium_fraction) * uranium
}

/// One explicit Euler step of a first-order lag
///
/// # Arguments
/// * `current` - Current value
/// * `target` - Value the lag relaxes towards
/// * `dt` - Time step [s]
/// * `tau` - Time constant [s]
///
/// # Returns
/// Value after `dt`; never overshoots `target`
pub fn lag_step(current: f64, target: f64, dt: f64, tau: f64) -> Result<f64, NumericDomainError> {
    if tau <= 0.0 {
        return Err(NumericDomainError::new("lag_step", format!("time constant {tau} s")));
    }
    let gain = clamp_fraction(dt / tau);
    Ok(current + (target - current) * gain)
}

/// Average fuel temperature
///
/// # Arguments
/// * `coolant_temp_k` - Coolant temperature [K]
/// * `power_fraction` - Thermal power as fraction of nominal
/// * `nominal_rise_k` - Fuel-to-coolant temperature rise at nominal power [K]
///
/// # Returns
/// Fuel temperature [K]
pub fn fuel_temperature(coolant_temp_k: f64, power_fraction: f64, nominal_rise_k: f64) -> f64 {
    coolant_temp_k + nominal_rise_k * power_fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thermal_power_zero_at_zero_setting() {
        assert_eq!(thermal_power(0.0, 1.0, 2500.0), 0.0);
        assert_eq!(thermal_power(0.8, 0.5, 1000.0), 500.0);
    }

    #[test]
    fn test_efficiency_matches_fuel_fits() {
        // 600 °C core: thorium 33 %, uranium 27.5 %
        let thorium = conversion_efficiency(873.15, 1.0, 303.15).unwrap();
        let uranium = conversion_efficiency(873.15, 0.0, 303.15).unwrap();
        assert!((thorium - 0.33).abs() < 1e-12);
        assert!((uranium - 0.275).abs() < 1e-12);
        assert!(thorium > uranium);
    }

    #[test]
    fn test_efficiency_capped_by_carnot() {
        let limit = carnot_limit(573.15, 503.15).unwrap();
        let eff = conversion_efficiency(573.15, 1.0, 503.15).unwrap();
        assert!((eff - limit).abs() < 1e-12);
    }

    #[test]
    fn test_domain_errors() {
        assert!(carnot_limit(0.0, 300.0).is_err());
        assert!(burnup_rate(100.0, 0.0).is_err());
        assert!(lag_step(0.0, 1.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_lag_step_does_not_overshoot() {
        let next = lag_step(0.0, 10.0, 5.0, 2.0).unwrap();
        assert_eq!(next, 10.0);
        let next = lag_step(0.0, 10.0, 1.0, 4.0).unwrap();
        assert_eq!(next, 2.5);
    }

    #[test]
    fn test_waste_intensity() {
        assert_eq!(waste_intensity(50.0, 1.0), 6.0);
        assert_eq!(waste_intensity(40.0, 0.0), 11.0);
    }
}
