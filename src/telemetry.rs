//! # Simulated Engine Data
//!
//! Stand-in for a real ECU feed so the dashboard has something to show.
//! Runs an 18 second loop: crank, idle, acceleration, high-load cruise.
//!
//! Output depends only on elapsed time, so two simulators advanced by the
//! same total produce the same sample.

use core::f32::consts::PI;

use libm::{fmodf, sinf};

/// Length of one simulated drive cycle in seconds
pub const CYCLE_SECONDS: f32 = 18.0;

/// One set of engine readings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineSample {
    /// Engine speed (rev/min), 0..=8500
    pub rpm: f32,
    /// Manifold absolute pressure (kPa), 0..=250
    pub map_kpa: f32,
    /// Coolant temperature (°F), 60..=250
    pub coolant_f: f32,
    /// Oil pressure (psi), 0..=100
    pub oil_psi: f32,
    /// Battery voltage, 10..=16
    pub battery_v: f32,
    /// Throttle position (%), 0..=100
    pub throttle_pct: f32,
    /// Air/fuel ratio, 10..=20
    pub afr: f32,
    /// Boost pressure (psi), -15..=30
    pub boost_psi: f32,
    /// Vehicle speed (mph), 0..=200
    pub speed_mph: f32,
}

/// Time-driven engine simulator
#[derive(Debug, Clone, Default)]
pub struct SimulatedEcu {
    elapsed_ms: u64,
}

impl SimulatedEcu {
    pub const fn new() -> Self {
        Self { elapsed_ms: 0 }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Move time forward and return the readings at the new instant
    pub fn advance(&mut self, delta_ms: u32) -> EngineSample {
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms as u64);
        self.sample()
    }

    /// Readings at the current instant
    pub fn sample(&self) -> EngineSample {
        let t = self.elapsed_ms as f32 / 1000.0;
        let phase = fmodf(t, CYCLE_SECONDS);

        let rpm = rpm_at(phase);
        let load = (rpm / 6500.0).min(1.0);

        // Coolant warms up over the first 20 s and then holds
        let warmup = (t / 20.0).min(1.0);

        let throttle = if phase < 8.0 {
            5.0 + sinf((phase - 3.0) * 0.5) * 2.0
        } else if phase < 13.0 {
            (phase - 8.0) / 5.0 * 100.0
        } else {
            70.0 + sinf((phase - 13.0) * 2.0) * 10.0
        };

        let boost = if load > 0.6 {
            (load - 0.6) * 25.0 + sinf(t)
        } else {
            sinf(t * 0.5) * 0.5
        };

        let speed = (rpm / 7000.0) * (throttle / 100.0) * 150.0 + sinf(t * 0.3) * 2.0;

        EngineSample {
            rpm: rpm.clamp(0.0, 8500.0),
            map_kpa: (20.0 + load * 80.0 + sinf(t * 0.5) * 5.0).clamp(0.0, 250.0),
            coolant_f: (70.0 + warmup * 120.0 + sinf(t * 0.3) * 3.0).clamp(60.0, 250.0),
            oil_psi: (20.0 + (rpm / 7000.0).min(1.0) * 50.0 + sinf(t * 0.4) * 2.0).clamp(0.0, 100.0),
            battery_v: (13.5 - load * 0.8 + sinf(t * 0.2) * 0.1).clamp(10.0, 16.0),
            throttle_pct: throttle.clamp(0.0, 100.0),
            afr: (14.7 + (1.0 - load) + sinf(t * 1.2) * 0.3).clamp(10.0, 20.0),
            boost_psi: boost.clamp(-15.0, 30.0),
            speed_mph: speed.clamp(0.0, 200.0),
        }
    }
}

fn rpm_at(phase: f32) -> f32 {
    if phase < 3.0 {
        // Cranking up to ~1200
        phase / 3.0 * 1200.0 + sinf(phase * 3.0) * 100.0
    } else if phase < 8.0 {
        1000.0 + sinf((phase - 3.0) * 2.0) * 50.0
    } else if phase < 13.0 {
        let accel = (phase - 8.0) / 5.0;
        1000.0 + accel * 4000.0 + sinf(accel * 4.0 * PI) * 200.0
    } else {
        6000.0 + sinf((phase - 13.0) * 1.5) * 150.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_in_range(sample: &EngineSample) {
        assert!((0.0..=8500.0).contains(&sample.rpm));
        assert!((0.0..=250.0).contains(&sample.map_kpa));
        assert!((60.0..=250.0).contains(&sample.coolant_f));
        assert!((0.0..=100.0).contains(&sample.oil_psi));
        assert!((10.0..=16.0).contains(&sample.battery_v));
        assert!((0.0..=100.0).contains(&sample.throttle_pct));
        assert!((10.0..=20.0).contains(&sample.afr));
        assert!((-15.0..=30.0).contains(&sample.boost_psi));
        assert!((0.0..=200.0).contains(&sample.speed_mph));
    }

    #[test]
    fn test_samples_stay_in_range() {
        let mut ecu = SimulatedEcu::new();
        // Two full cycles at 50 ms
        for _ in 0..720 {
            let sample = ecu.advance(50);
            assert_in_range(&sample);
        }
        assert_eq!(ecu.elapsed_ms(), 36_000);
    }

    #[test]
    fn test_phases() {
        let mut ecu = SimulatedEcu::new();
        assert_eq!(ecu.sample().rpm, 0.0);

        let idle = ecu.advance(5_000);
        assert!((900.0..1100.0).contains(&idle.rpm), "idle rpm {}", idle.rpm);

        let cruise = ecu.advance(10_000);
        assert!(cruise.rpm > 5800.0, "cruise rpm {}", cruise.rpm);
        assert!(cruise.boost_psi > idle.boost_psi);
        assert!(cruise.throttle_pct > 50.0);
    }

    #[test]
    fn test_deterministic_in_elapsed_time() {
        let mut fine = SimulatedEcu::new();
        for _ in 0..100 {
            fine.advance(37);
        }
        let mut coarse = SimulatedEcu::new();
        coarse.advance(3_700);
        assert_eq!(fine.sample(), coarse.sample());
    }
}
