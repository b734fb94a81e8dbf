//! Agent energetics: metabolic cost and walking speed of a suited explorer.
//!
//! The model is a Santee-style metabolic expression. Walking speed is a
//! piecewise-linear slope-limited profile peaking at 1.6 m/s on the level
//! and collapsing to a 0.05 m/s scramble beyond roughly ±20° of grade.
//! Metabolic rate combines a level-walking term with a grade term (uphill
//! work against gravity; partial recovery of negative work downhill),
//! floored at the basal rate. Edge energy is rate × traversal time.
//!
//! Both functions are pure in `(dr, slope, gravity, mass)`. The admissible
//! scalar bounds consumed by the search heuristic are obtained by sampling
//! the model over the full slope domain, so they lower/upper-bound every
//! edge the solver can ever evaluate.

use crate::units::{Joules, MetresPerSecond, Radians, Seconds};
use serde::{Deserialize, Serialize};

/// The planet the grid lives on; owns surface gravity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Planet {
    #[default]
    Earth,
    Moon,
    Mars,
}

impl Planet {
    /// Surface gravity in m/s².
    pub fn gravity(self) -> f64 {
        match self {
            Planet::Earth => 9.81,
            Planet::Moon => 1.622,
            Planet::Mars => 3.711,
        }
    }
}

/// Walking agent parameterisation: a suited explorer of a given mass on a
/// given planet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Total suited mass in kilograms.
    pub mass_kg: f64,
}

impl Agent {
    pub fn new(mass_kg: f64) -> Self {
        Agent { mass_kg }
    }
}

impl Default for Agent {
    fn default() -> Self {
        // The historical default crew configuration.
        Agent { mass_kg: 80.0 }
    }
}

/// Slope-limited walking speed.
///
/// Piecewise linear in slope degrees, continuous, with its 1.6 m/s peak on
/// the level and the 0.05 m/s floor beyond the climbable range.
pub fn walking_speed(slope: Radians) -> MetresPerSecond {
    let s = slope.to_degrees().value();
    let v = if s <= -20.0 {
        0.05
    } else if s <= -10.0 {
        0.095 * s + 1.95
    } else if s <= 0.0 {
        0.06 * s + 1.6
    } else if s <= 6.0 {
        -0.2 * s + 1.6
    } else if s <= 15.0 {
        -0.039 * s + 0.634
    } else {
        0.05
    };
    MetresPerSecond(v)
}

/// Metabolic rate in watts at walking speed `v` on grade `slope`.
fn metabolic_rate(agent: Agent, gravity: f64, slope: Radians, v: MetresPerSecond) -> f64 {
    let m = agent.mass_kg;
    let theta = slope.value();
    let v = v.value();

    let level = (3.28 * m + 71.1) * (0.661 * v * theta.cos() + 0.115);
    let grade = if theta >= 0.0 {
        3.5 * m * gravity * v * theta.sin()
    } else {
        // Descending returns some of the potential energy, at the reduced
        // efficiency of negative muscular work.
        0.3 * 2.4 * m * gravity * v * theta.sin()
    };
    let basal = 0.115 * (3.28 * m + 71.1);
    (level + grade).max(basal)
}

/// Energy and speed for one step of planar length `dr` metres on grade
/// `slope`.
///
/// Returns the metabolic energy of the step and the walking speed on that
/// grade; callers derive duration as `dr / v`.
pub fn energy_and_speed(
    agent: Agent,
    gravity: f64,
    dr: f64,
    slope: Radians,
) -> (Joules, MetresPerSecond) {
    let v = walking_speed(slope);
    let rate_w = metabolic_rate(agent, gravity, slope, v);
    let duration: Seconds = crate::units::Metres(dr).over(v);
    (Joules(rate_w * duration.value()), v)
}

/// Admissible scalar bounds for the search heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergeticsBounds {
    /// Lower bound on metabolic energy per planar metre over all grades.
    pub min_energy_per_metre: f64,
    /// Upper bound on walking speed over all grades.
    pub max_speed: f64,
}

/// Slope sampling step for the bound scan, in degrees.
const BOUND_SCAN_STEP_DEG: f64 = 0.1;

/// Relative slack applied to the scanned extrema, covering whatever the
/// finite sampling grid misses between two samples.
const BOUND_MARGIN: f64 = 1e-4;

/// Compute admissible bounds for `agent` under `gravity` by scanning the
/// full slope domain.
///
/// Energy per metre diverges as |slope| → 90° (speed floors while the rate
/// does not), so the interior minimum found by the scan bounds every
/// traversable grade regardless of the max-slope setting.
pub fn admissible_bounds(agent: Agent, gravity: f64) -> EnergeticsBounds {
    let mut min_energy_per_metre = f64::INFINITY;
    let mut max_speed: f64 = 0.0;
    let steps = (89.0 / BOUND_SCAN_STEP_DEG) as i64;
    for step in -steps..=steps {
        let slope = crate::units::Degrees(step as f64 * BOUND_SCAN_STEP_DEG).to_radians();
        let (energy, v) = energy_and_speed(agent, gravity, 1.0, slope);
        min_energy_per_metre = min_energy_per_metre.min(energy.value());
        max_speed = max_speed.max(v.value());
    }
    EnergeticsBounds {
        min_energy_per_metre: min_energy_per_metre * (1.0 - BOUND_MARGIN),
        max_speed: max_speed * (1.0 + BOUND_MARGIN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Degrees;

    const G: f64 = 9.81;

    fn agent() -> Agent {
        Agent::new(80.0)
    }

    #[test]
    fn test_speed_peaks_on_the_level() {
        let level = walking_speed(Radians(0.0));
        assert!((level.value() - 1.6).abs() < 1e-12);
        for deg in [-30.0, -15.0, -5.0, 3.0, 10.0, 25.0] {
            let v = walking_speed(Degrees(deg).to_radians());
            assert!(v.value() <= level.value());
            assert!(v.value() >= 0.05 - 1e-12);
        }
    }

    #[test]
    fn test_speed_profile_is_continuous_at_breakpoints() {
        for deg in [-20.0, -10.0, 0.0, 6.0, 15.0] {
            let below = walking_speed(Degrees(deg - 1e-9).to_radians());
            let above = walking_speed(Degrees(deg + 1e-9).to_radians());
            assert!((below.value() - above.value()).abs() < 1e-6, "jump at {deg}");
        }
    }

    #[test]
    fn test_speed_non_increasing_in_abs_slope() {
        for sign in [-1.0, 1.0] {
            let mut prev = walking_speed(Radians(0.0)).value();
            for step in 1..=60 {
                let deg = sign * (step as f64) * 0.5;
                let v = walking_speed(Degrees(deg).to_radians()).value();
                assert!(v <= prev + 1e-12, "speed rose at {deg} deg");
                prev = v;
            }
        }
    }

    #[test]
    fn test_energy_scales_linearly_with_distance() {
        let slope = Degrees(4.0).to_radians();
        let (e1, _) = energy_and_speed(agent(), G, 1.0, slope);
        let (e3, _) = energy_and_speed(agent(), G, 3.0, slope);
        assert!((e3.value() - 3.0 * e1.value()).abs() < 1e-9);
    }

    #[test]
    fn test_uphill_costs_more_than_level() {
        let (level, _) = energy_and_speed(agent(), G, 1.0, Radians(0.0));
        let (up, _) = energy_and_speed(agent(), G, 1.0, Degrees(10.0).to_radians());
        let (steeper, _) = energy_and_speed(agent(), G, 1.0, Degrees(20.0).to_radians());
        assert!(up.value() > level.value());
        assert!(steeper.value() > up.value());
    }

    #[test]
    fn test_rate_never_drops_below_basal() {
        // Steep descent: the grade term would swamp the level term without
        // the basal floor.
        let (e, v) = energy_and_speed(agent(), G, 1.0, Degrees(-19.0).to_radians());
        let basal = 0.115 * (3.28 * 80.0 + 71.1);
        assert!(e.value() >= basal * (1.0 / v.value()) - 1e-9);
        assert!(e.value() > 0.0);
    }

    #[test]
    fn test_lower_gravity_lowers_uphill_cost() {
        let slope = Degrees(12.0).to_radians();
        let (earth, _) = energy_and_speed(agent(), Planet::Earth.gravity(), 1.0, slope);
        let (moon, _) = energy_and_speed(agent(), Planet::Moon.gravity(), 1.0, slope);
        assert!(moon.value() < earth.value());
    }

    #[test]
    fn test_bounds_are_admissible() {
        let bounds = admissible_bounds(agent(), G);
        assert!(bounds.min_energy_per_metre > 0.0);
        assert!(bounds.max_speed >= 1.6);
        assert!(bounds.max_speed < 1.61);
        for deg in [-45.0, -20.0, -8.5, -1.0, 0.0, 2.5, 10.0, 33.0, 60.0] {
            let slope = Degrees(deg).to_radians();
            let (e, v) = energy_and_speed(agent(), G, 1.0, slope);
            assert!(
                bounds.min_energy_per_metre <= e.value() + 1e-9,
                "energy bound violated at {deg} deg"
            );
            assert!(bounds.max_speed >= v.value() - 1e-9);
        }
    }
}
