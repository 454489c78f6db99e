use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::ImmoError;
use crate::types::{Money, Rate};
use crate::ImmoResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const STEP_THRESHOLD: Decimal = dec!(0.000000000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;

/// Candidate rates scanned for a sign change when Newton-Raphson stalls.
const IRR_BRACKETS: [Decimal; 14] = [
    dec!(-0.99),
    dec!(-0.9),
    dec!(-0.75),
    dec!(-0.5),
    dec!(-0.25),
    dec!(0),
    dec!(0.1),
    dec!(0.25),
    dec!(0.5),
    dec!(1),
    dec!(2),
    dec!(5),
    dec!(10),
    dec!(100),
];

/// Net Present Value of a series of cash flows. The first flow is undiscounted.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ImmoResult<Money> {
    if rate <= dec!(-1) {
        return Err(ImmoError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r).ok_or_else(|| {
                ImmoError::invalid("rate", format!("NPV discount factor overflowed at period {t}"))
            })?;
        }
        if discount.is_zero() {
            return Err(ImmoError::invalid(
                "rate",
                format!("NPV discount factor vanished at period {t}"),
            ));
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| {
                ImmoError::invalid("rate", format!("NPV exceeds the representable range at period {t}"))
            })?;
    }

    Ok(result)
}

/// Periodic rate equivalent to an annual rate under monthly compounding:
/// (1 + annual)^(1/12) - 1.
pub fn monthly_equivalent_rate(annual_rate: Rate) -> ImmoResult<Rate> {
    if annual_rate <= dec!(-1) {
        return Err(ImmoError::invalid(
            "discount_rate",
            "Annual rate must be greater than -100%",
        ));
    }
    if annual_rate.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let factor = (Decimal::ONE + annual_rate)
        .checked_powd(Decimal::ONE / dec!(12))
        .ok_or_else(|| ImmoError::invalid("discount_rate", "Monthly rate conversion overflowed"))?;
    Ok(factor - Decimal::ONE)
}

/// Internal Rate of Return.
///
/// Newton-Raphson from `guess`; when the iteration stalls or leaves the
/// representable range, falls back to bisection on the first bracketing
/// interval found in `IRR_BRACKETS`. Flows without a sign change have no IRR
/// and are reported as `MetricsUnavailable`, never as 0.
pub fn irr(cash_flows: &[Money], guess: Rate) -> ImmoResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(ImmoError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let has_negative = cash_flows.iter().any(|cf| cf.is_sign_negative() && !cf.is_zero());
    let has_positive = cash_flows.iter().any(|cf| cf.is_sign_positive() && !cf.is_zero());
    if !(has_negative && has_positive) {
        return Err(ImmoError::MetricsUnavailable {
            metric: "irr".into(),
            reason: "cash flows have no sign change".into(),
        });
    }

    if let Some(rate) = newton_raphson(cash_flows, guess) {
        return Ok(rate);
    }

    bisection(cash_flows)
}

fn newton_raphson(cash_flows: &[Money], guess: Rate) -> Option<Rate> {
    let mut rate = guess;

    for _ in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) = npv_and_derivative(cash_flows, rate)?;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Some(rate);
        }
        if dnpv.is_zero() {
            return None;
        }

        let step = npv_val.checked_div(dnpv)?;
        rate -= step;

        if rate <= dec!(-0.99) || rate > dec!(100) {
            return None;
        }
        if step.abs() < STEP_THRESHOLD {
            return Some(rate);
        }
    }

    None
}

fn bisection(cash_flows: &[Money]) -> ImmoResult<Rate> {
    let evaluated: Vec<(Rate, Money)> = IRR_BRACKETS
        .iter()
        .filter_map(|r| npv_and_derivative(cash_flows, *r).map(|(v, _)| (*r, v)))
        .collect();

    let bracket = evaluated.windows(2).find(|w| {
        let (a, b) = (w[0].1, w[1].1);
        a.is_zero() || b.is_zero() || (a.is_sign_negative() != b.is_sign_negative())
    });

    let Some(pair) = bracket else {
        return Err(ImmoError::MetricsUnavailable {
            metric: "irr".into(),
            reason: "no root found between -99% and 10000%".into(),
        });
    };

    let (mut lo, mut f_lo) = pair[0];
    let (mut hi, f_hi) = pair[1];
    if f_lo.is_zero() {
        return Ok(lo);
    }
    if f_hi.is_zero() {
        return Ok(hi);
    }

    let mut last_delta = f_lo;
    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let Some((f_mid, _)) = npv_and_derivative(cash_flows, mid) else {
            break;
        };
        last_delta = f_mid;
        if f_mid.abs() < CONVERGENCE_THRESHOLD || (hi - lo).abs() < STEP_THRESHOLD {
            return Ok(mid);
        }
        if f_mid.is_sign_negative() == f_lo.is_sign_negative() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Err(ImmoError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_BISECTION_ITERATIONS,
        last_delta,
    })
}

/// NPV(r) = sum CF_t / (1+r)^t and its derivative d(NPV)/dr.
/// `None` when the arithmetic leaves the Decimal range.
fn npv_and_derivative(cash_flows: &[Money], rate: Decimal) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }
    let mut npv = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        npv = npv.checked_add(cf.checked_mul(discount)?)?;
        if t > 0 {
            // d/dr of CF_t / (1+r)^t = -t * CF_t / (1+r)^(t+1)
            let term = Decimal::from(t as i64)
                .checked_mul(*cf)?
                .checked_mul(discount)?
                .checked_div(one_plus_r)?;
            dnpv = dnpv.checked_sub(term)?;
        }
        discount = discount.checked_div(one_plus_r)?;
    }

    Some((npv, dnpv))
}

/// Payment (PMT), spreadsheet sign convention: a positive present value
/// yields a negative payment.
pub fn pmt(rate: Rate, nper: u32, present_value: Money, future_value: Money) -> ImmoResult<Money> {
    if nper == 0 {
        return Err(ImmoError::invalid("nper", "Number of periods must be > 0"));
    }

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / Decimal::from(nper));
    }

    let one_plus_r = Decimal::ONE + rate;
    let factor = one_plus_r
        .checked_powu(u64::from(nper))
        .ok_or_else(|| ImmoError::invalid("nper", "Compounding factor overflowed"))?;
    let annuity_factor = (factor - Decimal::ONE) / rate;

    if annuity_factor.is_zero() {
        return Err(ImmoError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    let numerator = present_value
        .checked_mul(factor)
        .ok_or_else(|| ImmoError::invalid("present_value", "Payment numerator overflowed"))?;
    Ok(-(numerator + future_value) / annuity_factor)
}
