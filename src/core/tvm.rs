use super::types::Inputs;

/// Threshold for treating a rate or a residual amount as zero.
pub const EPS: f64 = 1e-12;

pub fn exact_age(years: u32, months: u32) -> f64 {
    years as f64 + months as f64 / 12.0
}

/// Monthly rate that compounds to `roi_percent` over twelve months.
pub fn effective_monthly_rate(roi_percent: f64) -> f64 {
    let annual_rate = roi_percent / 100.0;
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

/// Monthly shortfall savings must cover once retired. Negative when passive
/// income exceeds retirement expenses.
pub fn net_monthly_retirement(inputs: &Inputs) -> f64 {
    inputs.living_expense_per_month_after_retirement - inputs.income_per_month_after_retirement
}

/// Converts a span in years to whole months, rounding to nearest and never
/// going below zero. Spans beyond `u32::MAX` months saturate.
pub fn months_between(from_age: f64, to_age: f64) -> u32 {
    ((to_age - from_age) * 12.0).round().max(0.0) as u32
}

pub fn future_value(present_value: f64, rate: f64, periods: u32) -> f64 {
    present_value * (1.0 + rate).powf(periods as f64)
}

pub fn present_value(future_value: f64, rate: f64, periods: u32) -> f64 {
    future_value / (1.0 + rate).powf(periods as f64)
}

/// Present value of `periods` end-of-period payments.
pub fn present_value_annuity(payment: f64, rate: f64, periods: u32) -> f64 {
    if periods == 0 {
        return 0.0;
    }
    if rate.abs() < EPS {
        return payment * periods as f64;
    }
    payment * (1.0 - (1.0 + rate).powf(-(periods as f64))) / rate
}

/// Future value of `periods` end-of-period payments.
pub fn future_value_annuity(payment: f64, rate: f64, periods: u32) -> f64 {
    if periods == 0 {
        return 0.0;
    }
    if rate.abs() < EPS {
        return payment * periods as f64;
    }
    payment * ((1.0 + rate).powf(periods as f64) - 1.0) / rate
}

/// Level payment that compounds to `target` after `periods` payments.
/// Inverse of [`future_value_annuity`]; `periods` must be non-zero.
pub fn sinking_fund_payment(target: f64, rate: f64, periods: u32) -> f64 {
    if rate.abs() < EPS {
        return target / periods as f64;
    }
    target * rate / ((1.0 + rate).powf(periods as f64) - 1.0)
}
