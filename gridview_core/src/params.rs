//! Simulation run parameters posted to the server before playback.
//!
//! The server accepts `POST /run_model` with a flat JSON object. Three of
//! the knobs admit a sentinel in place of a number: an uncapped car count
//! and spawn rate serialize as `999`, and "always run the light" chances
//! serialize as `1`. Validation happens here, caller-side; the synchronizer
//! itself treats the payload as opaque.

use serde_json::{json, Value};
use thiserror::Error;

/// Cap on the number of concurrently simulated cars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarCap {
    Capped(u32),
    Infinite,
}

/// Per-step probability of spawning a new car.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnRate {
    Rate(f64),
    Infinite,
}

/// Probability of a driver running a yellow or red light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightChance {
    Chance(f64),
    Always,
}

/// The recognized simulation knobs and their allowed ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    /// Grid side length, `6..=60`.
    pub dimensions: u32,
    /// Simulation steps to run, `1..=500`.
    pub steps: u32,
    /// `Capped(1..=70)` or `Infinite`.
    pub max_cars: CarCap,
    /// `Rate(0.0..=1.0)` or `Infinite`.
    pub spawn_rate: SpawnRate,
    /// `Chance(0.0..=0.5)` or `Always`.
    pub chance_run_yellow_light: LightChance,
    /// `Chance(0.0..=0.1)` or `Always`.
    pub chance_run_red_light: LightChance,
    pub smart_lights: bool,
    /// Green-phase duration in steps, `5..=50`.
    pub green_duration: u32,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            dimensions: 12,
            steps: 100,
            max_cars: CarCap::Capped(10),
            spawn_rate: SpawnRate::Rate(0.5),
            chance_run_yellow_light: LightChance::Chance(0.2),
            chance_run_red_light: LightChance::Chance(0.01),
            smart_lights: false,
            green_duration: 15,
        }
    }
}

impl RunParameters {
    /// Checks every knob against its allowed range.
    pub fn validate(&self) -> Result<(), ParamsError> {
        check_int("dimensions", self.dimensions, 6, 60)?;
        check_int("steps", self.steps, 1, 500)?;
        if let CarCap::Capped(n) = self.max_cars {
            check_int("max_cars", n, 1, 70)?;
        }
        if let SpawnRate::Rate(r) = self.spawn_rate {
            check_float("spawn_rate", r, 0.0, 1.0)?;
        }
        if let LightChance::Chance(c) = self.chance_run_yellow_light {
            check_float("chance_run_yellow_light", c, 0.0, 0.5)?;
        }
        if let LightChance::Chance(c) = self.chance_run_red_light {
            check_float("chance_run_red_light", c, 0.0, 0.1)?;
        }
        check_int("green_duration", self.green_duration, 5, 50)?;
        Ok(())
    }

    /// Validates and serializes to the server's wire payload.
    ///
    /// Sentinels use the numeric encodings the server recognizes: `999` for
    /// uncapped cars / spawn rate, `1` for always-run chances.
    pub fn to_wire(&self) -> Result<Value, ParamsError> {
        self.validate()?;
        Ok(json!({
            "dimensions": self.dimensions,
            "steps": self.steps,
            "max_cars": match self.max_cars {
                CarCap::Capped(n) => n,
                CarCap::Infinite => 999,
            },
            "spawn_rate": match self.spawn_rate {
                SpawnRate::Rate(r) => r,
                SpawnRate::Infinite => 999.0,
            },
            "chance_run_yellow_light": match self.chance_run_yellow_light {
                LightChance::Chance(c) => c,
                LightChance::Always => 1.0,
            },
            "chance_run_red_light": match self.chance_run_red_light {
                LightChance::Chance(c) => c,
                LightChance::Always => 1.0,
            },
            "smart_lights": self.smart_lights,
            "green_duration": self.green_duration,
        }))
    }
}

fn check_int(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ParamsError> {
    if value < min || value > max {
        return Err(ParamsError::OutOfRange {
            field,
            value: value as f64,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(())
}

fn check_float(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ParamsError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ParamsError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

/// A knob outside its allowed range.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParamsError {
    #[error("{field} out of range: {value} (allowed {min}..={max})")]
    OutOfRange { field: &'static str, value: f64, min: f64, max: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(RunParameters::default().validate().is_ok());
    }

    #[test]
    fn wire_payload_uses_server_field_names() {
        let wire = RunParameters::default().to_wire().unwrap();
        assert_eq!(wire["dimensions"], 12);
        assert_eq!(wire["steps"], 100);
        assert_eq!(wire["max_cars"], 10);
        assert_eq!(wire["spawn_rate"], 0.5);
        assert_eq!(wire["chance_run_yellow_light"], 0.2);
        assert_eq!(wire["chance_run_red_light"], 0.01);
        assert_eq!(wire["smart_lights"], false);
        assert_eq!(wire["green_duration"], 15);
    }

    #[test]
    fn sentinels_use_numeric_encodings() {
        let params = RunParameters {
            max_cars: CarCap::Infinite,
            spawn_rate: SpawnRate::Infinite,
            chance_run_yellow_light: LightChance::Always,
            chance_run_red_light: LightChance::Always,
            ..Default::default()
        };
        let wire = params.to_wire().unwrap();
        assert_eq!(wire["max_cars"], 999);
        assert_eq!(wire["spawn_rate"], 999.0);
        assert_eq!(wire["chance_run_yellow_light"], 1.0);
        assert_eq!(wire["chance_run_red_light"], 1.0);
    }

    #[test]
    fn out_of_range_knobs_are_rejected() {
        let too_small_grid = RunParameters { dimensions: 5, ..Default::default() };
        assert!(matches!(
            too_small_grid.validate(),
            Err(ParamsError::OutOfRange { field: "dimensions", .. })
        ));

        let hot_red = RunParameters {
            chance_run_red_light: LightChance::Chance(0.2),
            ..Default::default()
        };
        assert!(matches!(
            hot_red.validate(),
            Err(ParamsError::OutOfRange { field: "chance_run_red_light", .. })
        ));

        let nan_rate = RunParameters {
            spawn_rate: SpawnRate::Rate(f64::NAN),
            ..Default::default()
        };
        assert!(nan_rate.validate().is_err());
    }

    #[test]
    fn sentinel_values_skip_range_checks() {
        let params = RunParameters {
            max_cars: CarCap::Infinite,
            spawn_rate: SpawnRate::Infinite,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }
}
