use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::SolarFinanceError;
use crate::types::{Money, Rate};
use crate::SolarFinanceResult;

/// Lower edge of the IRR search interval.
pub const IRR_LOWER_BOUND: Rate = dec!(-0.99);
/// Upper edge of the IRR search interval.
pub const IRR_UPPER_BOUND: Rate = dec!(10.0);
/// Absolute NPV tolerance (base currency) at which a rate counts as a root.
pub const IRR_TOLERANCE: Money = dec!(0.000001);
pub const MAX_IRR_ITERATIONS: u32 = 100;

/// Rates probed, in ascending order, to bracket a sign change before bisecting.
const IRR_SCAN_POINTS: [Rate; 18] = [
    IRR_LOWER_BOUND,
    dec!(-0.9),
    dec!(-0.75),
    dec!(-0.5),
    dec!(-0.25),
    dec!(0),
    dec!(0.05),
    dec!(0.1),
    dec!(0.2),
    dec!(0.35),
    dec!(0.5),
    dec!(0.75),
    dec!(1),
    dec!(2),
    dec!(3.5),
    dec!(5),
    dec!(7.5),
    IRR_UPPER_BOUND,
];

/// Net Present Value of a series of cash flows, index 0 undiscounted.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> SolarFinanceResult<Money> {
    if rate <= dec!(-1) {
        return Err(SolarFinanceError::invalid(
            "discount_rate",
            "must be greater than -100%",
        ));
    }
    npv_checked(rate, cash_flows).ok_or_else(|| {
        SolarFinanceError::Computation(format!(
            "NPV at rate {rate} exceeds the representable range"
        ))
    })
}

/// NPV with checked arithmetic. `None` when the value cannot be represented, which only
/// happens for rates close to -100%.
fn npv_checked(rate: Rate, cash_flows: &[Money]) -> Option<Money> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut total = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) => discount = d,
                // Past the Decimal range every remaining term rounds to zero.
                None if one_plus_r > Decimal::ONE => break,
                None => return None,
            }
        }
        if discount.is_zero() {
            return None;
        }
        total = total.checked_add(cf.checked_div(discount)?)?;
    }

    Some(total)
}

/// Internal Rate of Return by bracketing and bisection over
/// [`IRR_LOWER_BOUND`, `IRR_UPPER_BOUND`].
///
/// Returns `None` when fewer than two flows are given or when NPV does not change sign
/// anywhere in the interval. A rate is only returned if it lies inside a bracket that
/// contains a sign change (or evaluates to |NPV| below [`IRR_TOLERANCE`]).
pub fn irr(cash_flows: &[Money]) -> Option<Rate> {
    if cash_flows.len() < 2 {
        return None;
    }

    let mut previous: Option<(Rate, Money)> = None;
    for rate in IRR_SCAN_POINTS {
        let Some(value) = npv_checked(rate, cash_flows) else {
            previous = None;
            continue;
        };
        if value.abs() < IRR_TOLERANCE {
            return Some(rate);
        }
        if let Some((lo, lo_value)) = previous {
            if (lo_value < Decimal::ZERO) != (value < Decimal::ZERO) {
                return Some(bisect(cash_flows, lo, lo_value, rate));
            }
        }
        previous = Some((rate, value));
    }

    None
}

/// Bisection inside a bracket `[lo, hi]` known to contain a sign change.
fn bisect(cash_flows: &[Money], mut lo: Rate, mut lo_value: Money, mut hi: Rate) -> Rate {
    let mut mid = (lo + hi) / dec!(2);

    for _ in 0..MAX_IRR_ITERATIONS {
        mid = (lo + hi) / dec!(2);
        let Some(value) = npv_checked(mid, cash_flows) else {
            // Unrepresentable values only occur towards the low edge.
            lo = mid;
            continue;
        };
        if value.abs() < IRR_TOLERANCE {
            return mid;
        }
        if (value < Decimal::ZERO) == (lo_value < Decimal::ZERO) {
            lo = mid;
            lo_value = value;
        } else {
            hi = mid;
        }
    }

    mid
}

/// Discount factors (1+r)^y for y = 0..=years.
pub fn discount_factors(rate: Rate, years: u32) -> SolarFinanceResult<Vec<Decimal>> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return Err(SolarFinanceError::invalid(
            "discount_rate",
            "must be greater than -100%",
        ));
    }

    let mut factors = Vec::with_capacity(years as usize + 1);
    let mut factor = Decimal::ONE;
    factors.push(factor);
    for year in 1..=years {
        factor = factor.checked_mul(one_plus_r).ok_or_else(|| {
            SolarFinanceError::Computation(format!("discount factor overflow at year {year}"))
        })?;
        if factor.is_zero() {
            return Err(SolarFinanceError::Computation(format!(
                "discount factor underflow at year {year}"
            )));
        }
        factors.push(factor);
    }

    Ok(factors)
}
