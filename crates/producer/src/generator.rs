//! Figure-eight trajectory generator.

use chrono::Utc;
use contracts::{Coordinate, TrajectoryConfig};

/// Deterministic figure-eight path.
///
/// ```text
/// x = amplitude * sin(phase)
/// y = amplitude * sin(phase) * cos(phase)
/// ```
///
/// Only the timestamp depends on the wall clock.
#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    center_lon: f64,
    center_lat: f64,
    amplitude: f64,
    angular_step: f64,
    phase: f64,
}

impl TrajectoryGenerator {
    pub fn new(config: &TrajectoryConfig) -> Self {
        Self {
            center_lon: config.center_lon,
            center_lat: config.center_lat,
            amplitude: config.amplitude,
            angular_step: config.angular_step,
            phase: 0.0,
        }
    }

    /// Next point stamped with the current wall-clock time
    pub fn next(&mut self) -> Coordinate {
        self.next_at(Utc::now().timestamp_millis())
    }

    /// Next point stamped with `timestamp_ms`
    pub fn next_at(&mut self, timestamp_ms: i64) -> Coordinate {
        let (sin, cos) = self.phase.sin_cos();
        let x = self.amplitude * sin;
        let y = self.amplitude * sin * cos;

        self.phase += self.angular_step;

        Coordinate::new(self.center_lon + x, self.center_lat + y, timestamp_ms)
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Phase (radians) of the next point
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl Default for TrajectoryGenerator {
    fn default() -> Self {
        Self::new(&TrajectoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_first_point_is_centre() {
        let mut generator = TrajectoryGenerator::default();
        let c = generator.next_at(1000);

        assert!((c.longitude - 107.02243).abs() < EPS);
        assert!((c.latitude - 20.76300).abs() < EPS);
        assert_eq!(c.timestamp_ms, 1000);
    }

    #[test]
    fn test_second_point_follows_curve() {
        let mut generator = TrajectoryGenerator::default();
        generator.next_at(0);
        let c = generator.next_at(20);

        let expected_lon = 107.02243 + 0.05 * 0.01_f64.sin();
        let expected_lat = 20.76300 + 0.05 * 0.01_f64.sin() * 0.01_f64.cos();
        assert!((c.longitude - expected_lon).abs() < EPS);
        assert!((c.latitude - expected_lat).abs() < EPS);
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut generator = TrajectoryGenerator::default();
        let first = generator.next_at(0);
        generator.next_at(0);
        generator.next_at(0);
        assert!((generator.phase() - 0.03).abs() < EPS);

        generator.reset();
        assert_eq!(generator.phase(), 0.0);
        assert_eq!(generator.next_at(0), first);
    }

    #[test]
    fn test_stays_within_amplitude() {
        let config = TrajectoryConfig {
            amplitude: 0.2,
            angular_step: 0.37,
            ..Default::default()
        };
        let mut generator = TrajectoryGenerator::new(&config);

        for _ in 0..1000 {
            let c = generator.next_at(0);
            assert!((c.longitude - config.center_lon).abs() <= 0.2 + EPS);
            assert!((c.latitude - config.center_lat).abs() <= 0.1 + EPS);
        }
    }

    #[test]
    fn test_wall_clock_timestamp() {
        let before = Utc::now().timestamp_millis();
        let c = TrajectoryGenerator::default().next();
        let after = Utc::now().timestamp_millis();
        assert!(c.timestamp_ms >= before && c.timestamp_ms <= after);
    }
}
