//! A closed interval over `f64` with outward rounding.

use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_traits::{One, Zero};

use crate::rounding;

/// A closed, bounded subset of the reals, stored as `[lo, hi]`.
///
/// Every operation rounds outward: the result interval contains `f(v)` for
/// every real `v` in the operands. Endpoints may be infinite (an interval at
/// `+inf` is used as the "no root yet" sentinel by the root finder), but
/// never NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    lo: f64,
    hi: f64,
}

impl Interval {
    /// The unit interval `[0, 1]`.
    pub const UNIT: Self = Self { lo: 0.0, hi: 1.0 };

    /// The whole real line `[-inf, inf]`.
    pub const ENTIRE: Self = Self {
        lo: f64::NEG_INFINITY,
        hi: f64::INFINITY,
    };

    /// Create an interval from ordered endpoints.
    ///
    /// # Panics
    ///
    /// Panics if `lo > hi` or either endpoint is NaN.
    #[must_use]
    pub fn new(lo: f64, hi: f64) -> Self {
        assert!(lo <= hi, "invalid interval endpoints: [{lo}, {hi}]");
        Self { lo, hi }
    }

    /// Create a degenerate (single point) interval.
    #[must_use]
    pub fn point(v: f64) -> Self {
        Self::new(v, v)
    }

    /// Lower endpoint.
    #[must_use]
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// Upper endpoint.
    #[must_use]
    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Width `hi - lo`.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /// Midpoint of the interval.
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.lo + self.hi)
    }

    /// Whether both endpoints are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite()
    }

    /// Whether `v` lies in the interval.
    #[must_use]
    pub fn contains(&self, v: f64) -> bool {
        self.lo <= v && v <= self.hi
    }

    /// Whether `0` lies in the interval.
    #[must_use]
    pub fn zero_in(&self) -> bool {
        self.contains(0.0)
    }

    /// Smallest interval containing both operands.
    #[must_use]
    pub fn hull(a: Self, b: Self) -> Self {
        Self {
            lo: a.lo.min(b.lo),
            hi: a.hi.max(b.hi),
        }
    }

    /// Split at the midpoint into lower and upper halves.
    ///
    /// # Panics
    ///
    /// Panics if the interval is not finite.
    #[must_use]
    pub fn bisect(&self) -> (Self, Self) {
        assert!(self.is_finite(), "cannot bisect {self}");
        let mid = self.midpoint();
        (Self::new(self.lo, mid), Self::new(mid, self.hi))
    }

    /// Square root. The lower endpoint is clamped to zero so that intervals
    /// grazing zero from below (from outward rounding) stay in the domain.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the interval is entirely negative.
    #[must_use]
    pub fn sqrt(self) -> Self {
        debug_assert!(self.hi >= 0.0, "sqrt of a negative interval {self}");
        Self {
            lo: rounding::sqrt_down(self.lo.max(0.0)),
            hi: rounding::sqrt_up(self.hi.max(0.0)),
        }
    }

    /// Natural exponential.
    #[must_use]
    pub fn exp(self) -> Self {
        Self {
            lo: rounding::down(self.lo.exp()).max(0.0),
            hi: rounding::up(self.hi.exp()),
        }
    }

    /// Natural logarithm. Lower endpoints at or below zero map to `-inf`.
    ///
    /// # Panics
    ///
    /// Panics if the interval is entirely non-positive.
    #[must_use]
    pub fn ln(self) -> Self {
        assert!(self.hi > 0.0, "log of a non-positive interval {self}");
        let lo = if self.lo <= 0.0 {
            f64::NEG_INFINITY
        } else {
            rounding::down(self.lo.ln())
        };
        Self {
            lo,
            hi: rounding::up(self.hi.ln()),
        }
    }

    /// Sine, handling interior extrema.
    #[must_use]
    pub fn sin(self) -> Self {
        use std::f64::consts::{FRAC_PI_2, TAU};
        if !self.is_finite() || self.width() >= TAU {
            return Self::new(-1.0, 1.0);
        }
        let (s_lo, s_hi) = (self.lo.sin(), self.hi.sin());
        let mut lo = rounding::down(s_lo.min(s_hi));
        let mut hi = rounding::up(s_lo.max(s_hi));
        if contains_critical_point(self, -FRAC_PI_2, TAU) {
            lo = -1.0;
        }
        if contains_critical_point(self, FRAC_PI_2, TAU) {
            hi = 1.0;
        }
        Self::new(lo.max(-1.0), hi.min(1.0))
    }

    /// Cosine, handling interior extrema.
    #[must_use]
    pub fn cos(self) -> Self {
        use std::f64::consts::{PI, TAU};
        if !self.is_finite() || self.width() >= TAU {
            return Self::new(-1.0, 1.0);
        }
        let (c_lo, c_hi) = (self.lo.cos(), self.hi.cos());
        let mut lo = rounding::down(c_lo.min(c_hi));
        let mut hi = rounding::up(c_lo.max(c_hi));
        if contains_critical_point(self, PI, TAU) {
            lo = -1.0;
        }
        if contains_critical_point(self, 0.0, TAU) {
            hi = 1.0;
        }
        Self::new(lo.max(-1.0), hi.min(1.0))
    }
}

/// Whether `x` contains a point of the form `offset + k * period`.
///
/// The test is inflated by a small relative slack so reduction error can only
/// make the answer `true` (which merely widens the enclosure).
fn contains_critical_point(x: Interval, offset: f64, period: f64) -> bool {
    let k = ((x.lo - offset) / period).ceil();
    let p = offset + k * period;
    p <= x.hi + period * 1e-14 * (k.abs() + 1.0)
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.16e}, {:.16e}]", self.lo, self.hi)
    }
}

impl From<f64> for Interval {
    fn from(v: f64) -> Self {
        Self::point(v)
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::point(0.0)
    }
}

impl Neg for Interval {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            lo: -self.hi,
            hi: -self.lo,
        }
    }
}

impl Add for Interval {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            lo: rounding::add_down(self.lo, rhs.lo),
            hi: rounding::add_up(self.hi, rhs.hi),
        }
    }
}

impl Sub for Interval {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            lo: rounding::sub_down(self.lo, rhs.hi),
            hi: rounding::sub_up(self.hi, rhs.lo),
        }
    }
}

impl Mul for Interval {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        // Endpoint products; `f64::min`/`f64::max` drop any NaN produced by
        // 0 * inf, which only widens toward the remaining finite candidates.
        let d = [
            rounding::mul_down(self.lo, rhs.lo),
            rounding::mul_down(self.lo, rhs.hi),
            rounding::mul_down(self.hi, rhs.lo),
            rounding::mul_down(self.hi, rhs.hi),
        ];
        let u = [
            rounding::mul_up(self.lo, rhs.lo),
            rounding::mul_up(self.lo, rhs.hi),
            rounding::mul_up(self.hi, rhs.lo),
            rounding::mul_up(self.hi, rhs.hi),
        ];
        Self {
            lo: d.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
            hi: u.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
        }
    }
}

impl Div for Interval {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        if rhs.zero_in() {
            return Self::ENTIRE;
        }
        let d = [
            rounding::div_down(self.lo, rhs.lo),
            rounding::div_down(self.lo, rhs.hi),
            rounding::div_down(self.hi, rhs.lo),
            rounding::div_down(self.hi, rhs.hi),
        ];
        let u = [
            rounding::div_up(self.lo, rhs.lo),
            rounding::div_up(self.lo, rhs.hi),
            rounding::div_up(self.hi, rhs.lo),
            rounding::div_up(self.hi, rhs.hi),
        ];
        Self {
            lo: d.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
            hi: u.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
        }
    }
}

macro_rules! scalar_ops {
    ($($op:ident :: $fn:ident),*) => {$(
        impl $op<f64> for Interval {
            type Output = Self;
            fn $fn(self, rhs: f64) -> Self {
                <Self as $op>::$fn(self, Self::point(rhs))
            }
        }
        impl $op<Interval> for f64 {
            type Output = Interval;
            fn $fn(self, rhs: Interval) -> Interval {
                <Interval as $op>::$fn(Interval::point(self), rhs)
            }
        }
    )*};
}

scalar_ops!(Add::add, Sub::sub, Mul::mul, Div::div);

macro_rules! assign_ops {
    ($($op:ident :: $fn:ident => $base:ident :: $method:ident),*) => {$(
        impl $op for Interval {
            fn $fn(&mut self, rhs: Self) {
                *self = $base::$method(*self, rhs);
            }
        }
        impl $op<f64> for Interval {
            fn $fn(&mut self, rhs: f64) {
                *self = $base::$method(*self, Self::point(rhs));
            }
        }
    )*};
}

assign_ops!(
    AddAssign::add_assign => Add::add,
    SubAssign::sub_assign => Sub::sub,
    MulAssign::mul_assign => Mul::mul,
    DivAssign::div_assign => Div::div
);

impl Zero for Interval {
    fn zero() -> Self {
        Self::point(0.0)
    }

    fn is_zero(&self) -> bool {
        self.lo == 0.0 && self.hi == 0.0
    }
}

impl One for Interval {
    fn one() -> Self {
        Self::point(1.0)
    }
}
