//! PID gain vector and the typed index used to address one coefficient.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Coefficient: which gain is being addressed
// ---------------------------------------------------------------------------

/// The three PID coefficients, in tuning order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coefficient {
    Proportional,
    Integral,
    Derivative,
}

impl Coefficient {
    /// Human-readable name for logging.
    pub fn name(self) -> &'static str {
        match self {
            Coefficient::Proportional => "kp",
            Coefficient::Integral     => "ki",
            Coefficient::Derivative   => "kd",
        }
    }

    /// All three coefficients in tuning order.
    pub fn all() -> &'static [Coefficient] {
        &[
            Coefficient::Proportional,
            Coefficient::Integral,
            Coefficient::Derivative,
        ]
    }

    /// Position in a `[kp, ki, kd]` array.
    pub fn index(self) -> usize {
        match self {
            Coefficient::Proportional => 0,
            Coefficient::Integral     => 1,
            Coefficient::Derivative   => 2,
        }
    }

    /// The coefficient tuned after this one, wrapping around.
    pub fn next(self) -> Coefficient {
        match self {
            Coefficient::Proportional => Coefficient::Integral,
            Coefficient::Integral     => Coefficient::Derivative,
            Coefficient::Derivative   => Coefficient::Proportional,
        }
    }
}

impl std::fmt::Display for Coefficient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Gains
// ---------------------------------------------------------------------------

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Gains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.kp, self.ki, self.kd]
    }

    pub fn from_array([kp, ki, kd]: [f64; 3]) -> Self {
        Self { kp, ki, kd }
    }

    /// `true` when every gain is a finite number.
    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}

impl Default for Gains {
    /// Hand-tuned gains used when auto-tuning is disabled.
    fn default() -> Self {
        Self { kp: 0.25, ki: 0.0, kd: 8.0 }
    }
}

impl Index<Coefficient> for Gains {
    type Output = f64;

    fn index(&self, c: Coefficient) -> &f64 {
        match c {
            Coefficient::Proportional => &self.kp,
            Coefficient::Integral     => &self.ki,
            Coefficient::Derivative   => &self.kd,
        }
    }
}

impl IndexMut<Coefficient> for Gains {
    fn index_mut(&mut self, c: Coefficient) -> &mut f64 {
        match c {
            Coefficient::Proportional => &mut self.kp,
            Coefficient::Integral     => &mut self.ki,
            Coefficient::Derivative   => &mut self.kd,
        }
    }
}

impl std::fmt::Display for Gains {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}]", self.kp, self.ki, self.kd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficient_next_cycles_through_all_three() {
        let mut c = Coefficient::Proportional;
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(c);
            c = c.next();
        }
        assert_eq!(seen, Coefficient::all());
        assert_eq!(c, Coefficient::Proportional);
    }

    #[test]
    fn test_coefficient_index_matches_array_position() {
        for (i, &c) in Coefficient::all().iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn test_coefficient_display() {
        assert_eq!(Coefficient::Proportional.to_string(), "kp");
        assert_eq!(Coefficient::Integral.to_string(), "ki");
        assert_eq!(Coefficient::Derivative.to_string(), "kd");
    }

    #[test]
    fn test_gains_index_agrees_with_array() {
        let g = Gains::new(1.0, 2.0, 3.0);
        let arr = g.to_array();
        for &c in Coefficient::all() {
            assert_eq!(g[c], arr[c.index()]);
        }
    }

    #[test]
    fn test_gains_index_mut() {
        let mut g = Gains::new(0.0, 0.0, 0.0);
        g[Coefficient::Derivative] += 2.0;
        assert_eq!(g.kd, 2.0);
    }

    #[test]
    fn test_gains_array_conversion() {
        assert_eq!(Gains::from_array([0.4, 0.0, 0.0]), Gains::new(0.4, 0.0, 0.0));
    }

    #[test]
    fn test_gains_default_is_hand_tuned_set() {
        assert_eq!(Gains::default(), Gains::new(0.25, 0.0, 8.0));
    }

    #[test]
    fn test_gains_is_finite() {
        assert!(Gains::default().is_finite());
        assert!(!Gains::new(f64::NAN, 0.0, 0.0).is_finite());
    }
}
