//! Closed-form annuity formulas shared by the funding target and the EPF/PRS
//! projections.
//!
//! Rates are per-period fractions (0.0025 is 0.25% per period). General
//! branches use ordinary (end-of-period) timing. When the two rates fall
//! inside the tolerance band each formula returns its closed form instead of
//! dividing by a near-zero difference.

/// Below this `|rate - growth|` the PV of a growing annuity switches to its
/// removable-singularity form.
pub const PV_RATE_TOLERANCE: f64 = 1e-6;

/// Same for the FV of a growing annuity, which works on annual rates.
pub const FV_RATE_TOLERANCE: f64 = 1e-4;

const ZERO_RATE_EPSILON: f64 = 1e-12;

/// Present value of `periods` payments starting at `payment` and growing by
/// `growth` each period, discounted at `rate`.
pub fn pv_growing_annuity(payment: f64, rate: f64, growth: f64, periods: u32) -> f64 {
    let n = periods as f64;

    if (rate - growth).abs() < PV_RATE_TOLERANCE {
        // Discount and growth cancel, every payment is worth its face value.
        return payment * n;
    }

    if rate.abs() < ZERO_RATE_EPSILON {
        return payment * (1.0 - (1.0 + growth).powf(n)) / -growth;
    }

    let ratio = (1.0 + growth) / (1.0 + rate);
    payment * (1.0 - ratio.powf(n)) / (rate - growth)
}

/// Future value after `periods` of contributions starting at `payment` and
/// growing by `growth` each period, compounding at `rate`.
pub fn fv_growing_annuity(payment: f64, rate: f64, growth: f64, periods: u32) -> f64 {
    let n = periods as f64;

    if (rate - growth).abs() < FV_RATE_TOLERANCE {
        return payment * n * (1.0 + rate).powf(n);
    }

    let term_a = (1.0 + rate).powf(n);
    let term_b = (1.0 + growth).powf(n);
    payment * (term_a - term_b) / (rate - growth)
}

/// Accumulation factor of a level ordinary annuity: the FV of paying 1 at the
/// end of each of `periods` periods.
pub fn fv_level_annuity_factor(rate: f64, periods: u32) -> f64 {
    let n = periods as f64;
    if rate.abs() < ZERO_RATE_EPSILON {
        return n;
    }
    ((1.0 + rate).powf(n) - 1.0) / rate
}

pub fn fv_level_annuity(payment: f64, rate: f64, periods: u32) -> f64 {
    payment * fv_level_annuity_factor(rate, periods)
}

/// Lump sum compounded once per period.
pub fn compound(amount: f64, rate: f64, periods: u32) -> f64 {
    amount * (1.0 + rate).powf(periods as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn brute_force_pv(payment: f64, rate: f64, growth: f64, periods: u32) -> f64 {
        (1..=periods)
            .map(|k| payment * (1.0 + growth).powi(k as i32 - 1) / (1.0 + rate).powi(k as i32))
            .sum()
    }

    fn brute_force_fv_growing(payment: f64, rate: f64, growth: f64, periods: u32) -> f64 {
        let mut balance = 0.0;
        let mut contribution = payment;
        for _ in 0..periods {
            balance = balance * (1.0 + rate) + contribution;
            contribution *= 1.0 + growth;
        }
        balance
    }

    fn brute_force_fv_level(payment: f64, rate: f64, periods: u32) -> f64 {
        let mut balance = 0.0;
        for _ in 0..periods {
            balance = balance * (1.0 + rate) + payment;
        }
        balance
    }

    #[test]
    fn pv_growing_matches_payment_by_payment_discounting() {
        let pv = pv_growing_annuity(3_333.33, 0.04 / 12.0, 0.03 / 12.0, 240);
        let expected = brute_force_pv(3_333.33, 0.04 / 12.0, 0.03 / 12.0, 240);
        assert_relative_eq!(pv, expected, max_relative = 1e-10);
        assert_relative_eq!(pv, 723_170.93, epsilon = 0.01);
    }

    #[test]
    fn pv_growing_equal_rates_uses_face_value() {
        let rate = 0.03 / 12.0;
        assert_eq!(pv_growing_annuity(1_000.0, rate, rate, 240), 240_000.0);
        assert_eq!(pv_growing_annuity(1_000.0, 0.0, 0.0, 12), 12_000.0);
    }

    #[test]
    fn pv_growing_inside_tolerance_band_uses_face_value() {
        let growth = 0.03 / 12.0;
        assert_eq!(pv_growing_annuity(1_000.0, growth + 5e-7, growth, 240), 240_000.0);
        assert_eq!(pv_growing_annuity(1_000.0, growth - 5e-7, growth, 240), 240_000.0);
    }

    #[test]
    fn pv_growing_is_stable_under_small_rate_perturbation() {
        let growth = 0.03 / 12.0;
        for delta in [0.0, 1e-5, -1e-5] {
            let rate = (0.03 + delta) / 12.0;
            assert_eq!(pv_growing_annuity(3_333.33, rate, growth, 240), 3_333.33 * 240.0);
        }
    }

    #[test]
    fn pv_growing_just_outside_band_follows_general_formula() {
        // The general branch tends to P*n/(1+r), one period of discount below
        // the face-value closed form.
        let growth = 0.03 / 12.0;
        let rate = growth + 1e-5;
        let general = pv_growing_annuity(3_333.33, rate, growth, 240);
        assert_relative_eq!(
            general,
            brute_force_pv(3_333.33, rate, growth, 240),
            max_relative = 1e-8
        );
        assert_relative_eq!(general, 3_333.33 * 240.0 / (1.0 + rate), max_relative = 5e-3);
    }

    #[test]
    fn pv_growing_zero_discount_sums_geometric_series() {
        let pv = pv_growing_annuity(100.0, 0.0, 0.01, 24);
        assert_relative_eq!(
            pv,
            brute_force_pv(100.0, 0.0, 0.01, 24),
            max_relative = 1e-10
        );
        assert!(pv > 100.0 * 24.0);
    }

    #[test]
    fn fv_growing_matches_year_by_year_accumulation() {
        let fv = fv_growing_annuity(13_800.0, 0.04, 0.03, 30);
        let expected = brute_force_fv_growing(13_800.0, 0.04, 0.03, 30);
        assert_relative_eq!(fv, expected, max_relative = 1e-10);
        assert_relative_eq!(fv, 1_126_266.35, epsilon = 0.01);
    }

    #[test]
    fn fv_growing_equal_rates_uses_closed_form() {
        let fv = fv_growing_annuity(13_800.0, 0.04, 0.04, 30);
        assert_relative_eq!(fv, 13_800.0 * 30.0 * 1.04_f64.powi(30), max_relative = 1e-12);
    }

    #[test]
    fn fv_growing_inside_tolerance_band_uses_closed_form() {
        let closed_form = 13_800.0 * 30.0 * 1.04_f64.powf(30.0);
        assert_eq!(fv_growing_annuity(13_800.0, 0.04, 0.04 + 5e-5, 30), closed_form);
        assert_eq!(fv_growing_annuity(13_800.0, 0.04, 0.04 - 5e-5, 30), closed_form);
    }

    #[test]
    fn fv_growing_just_outside_band_follows_general_formula() {
        // Outside the band the general branch tends to C*N*(1+r)^(N-1).
        let general = fv_growing_annuity(13_800.0, 0.04, 0.04 - 2e-4, 30);
        assert_relative_eq!(
            general,
            brute_force_fv_growing(13_800.0, 0.04, 0.04 - 2e-4, 30),
            max_relative = 1e-8
        );
        assert_relative_eq!(
            general,
            13_800.0 * 30.0 * 1.04_f64.powi(29),
            max_relative = 5e-3
        );
    }

    #[test]
    fn fv_level_matches_month_by_month_accumulation() {
        let fv = fv_level_annuity(1_150.0, 0.04 / 12.0, 360);
        assert_relative_eq!(
            fv,
            brute_force_fv_level(1_150.0, 0.04 / 12.0, 360),
            max_relative = 1e-10
        );
    }

    #[test]
    fn fv_level_zero_rate_is_simple_product() {
        assert_eq!(fv_level_annuity_factor(0.0, 360), 360.0);
        assert_eq!(fv_level_annuity(250.0, 0.0, 12), 3_000.0);
    }

    #[test]
    fn compound_grows_lump_sum() {
        assert_relative_eq!(compound(100.0, 0.10, 3), 133.1, max_relative = 1e-12);
        assert_eq!(compound(100.0, 0.05, 0), 100.0);
    }
}
