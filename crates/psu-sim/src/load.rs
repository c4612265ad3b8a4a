//! Resistive load model
//!
//! A plain resistor across the supply terminals reproduces both regulation
//! regimes: constant-voltage when V/R stays under the current limit, and
//! constant-current when the limit clamps it. That is enough physics to
//! drive every consumer of the measurement loop.

use rand::Rng;

/// Default load resistance in ohms
pub const DEFAULT_RESISTANCE: f64 = 10.0;

/// Lower bound for the load resistance, keeps V/R finite
pub const MIN_RESISTANCE: f64 = 0.1;

/// One simulated measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample {
    /// Measured terminal voltage in volts
    pub voltage: f64,
    /// Measured output current in amps
    pub current: f64,
    /// Measured power in watts, product of the noisy voltage and current
    pub power: f64,
}

impl LoadSample {
    /// A sample with the output disabled
    pub const ZERO: LoadSample = LoadSample {
        voltage: 0.0,
        current: 0.0,
        power: 0.0,
    };
}

/// Resistive load across the simulated supply terminals
#[derive(Debug, Clone)]
pub struct LoadModel {
    resistance: f64,
}

impl Default for LoadModel {
    fn default() -> Self {
        Self {
            resistance: DEFAULT_RESISTANCE,
        }
    }
}

impl LoadModel {
    /// Create a load with the default resistance
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a load with a specific resistance (floored at [`MIN_RESISTANCE`])
    pub fn with_resistance(resistance: f64) -> Self {
        let mut load = Self::new();
        load.set_resistance(resistance);
        load
    }

    /// Current load resistance in ohms
    pub fn resistance(&self) -> f64 {
        self.resistance
    }

    /// Set the load resistance, floored at [`MIN_RESISTANCE`]
    pub fn set_resistance(&mut self, resistance: f64) {
        self.resistance = resistance.max(MIN_RESISTANCE);
    }

    /// Produce one measurement for the given setpoints
    ///
    /// Ideal current is V/R; the supply's current limit clamps it; the
    /// terminal voltage follows from the clamped current. Independent
    /// uniform noise (±1 mV, ±0.1 mA) lands on voltage and current, and
    /// power is recomputed from the noisy pair.
    pub fn sample(&self, voltage_setpoint: f64, current_setpoint: f64) -> LoadSample {
        let ideal_current = voltage_setpoint / self.resistance;
        let current = ideal_current.min(current_setpoint);
        let voltage = current * self.resistance;

        let mut rng = rand::thread_rng();
        let voltage = voltage + rng.gen_range(-0.001..=0.001);
        let current = current + rng.gen_range(-0.0001..=0.0001);

        LoadSample {
            voltage,
            current,
            power: voltage * current,
        }
    }
}
