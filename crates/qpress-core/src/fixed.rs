use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Every accumulator inside the simulation loop (tonnes, kWh, km, m³) uses
/// this type so that sums are exact and two runs of the same scenario agree
/// bit for bit.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time (one time step each).
pub type Ticks = u64;

/// Countdown timers are whole minutes and may overshoot below zero.
pub type Minutes = i64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for output tables and KPIs.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Clamp a value to be non-negative.
#[inline]
pub fn non_negative(v: Fixed64) -> Fixed64 {
    v.max(Fixed64::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn out_of_range_saturates() {
        assert_eq!(f64_to_fixed64(1e30), Fixed64::MAX);
        assert_eq!(f64_to_fixed64(-1e30), Fixed64::MIN);
    }

    #[test]
    fn non_negative_clamps() {
        assert_eq!(non_negative(f64_to_fixed64(-0.25)), Fixed64::ZERO);
        assert_eq!(non_negative(f64_to_fixed64(0.25)), f64_to_fixed64(0.25));
    }

    #[test]
    fn fixed64_determinism() {
        let a = f64_to_fixed64(1.0 / 3.0);
        let b = f64_to_fixed64(1.0 / 3.0);
        assert_eq!(a, b);
        assert_eq!(a * f64_to_fixed64(3.0), b * f64_to_fixed64(3.0));
    }
}
