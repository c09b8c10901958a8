use super::simulator::simulate;
use super::tvm::{
    EPS, effective_monthly_rate, exact_age, future_value, months_between,
    net_monthly_retirement, present_value_annuity, sinking_fund_payment,
};
use super::types::{CalculationResults, Inputs, Outcome, PlanFigures};

/// Required monthly earnings outside this open range are reported as
/// unrealistic.
const MIN_SANE_MONTHLY_EARNINGS: f64 = -1e9;
const MAX_SANE_MONTHLY_EARNINGS: f64 = 1e12;

#[derive(Debug, Clone, Copy)]
struct Earnings {
    total: f64,
    yearly: f64,
    monthly: f64,
}

impl Earnings {
    const NONE: Earnings = Earnings {
        total: 0.0,
        yearly: 0.0,
        monthly: 0.0,
    };
}

/// Solves for the earnings that spend savings down to exactly zero at life
/// expectancy and charts the resulting wealth path.
///
/// Never fails: special cases are reported through `outcome`, `message` and
/// `is_achievable`.
pub fn solve(inputs: &Inputs) -> CalculationResults {
    let exact_current_age = exact_age(inputs.current_age, inputs.current_age_months);
    let monthly_rate = effective_monthly_rate(inputs.roi_rate);

    let months_until_retirement = months_between(exact_current_age, inputs.retirement_age);
    let months_in_retirement = months_between(inputs.retirement_age, inputs.life_expectancy);

    let net_retirement = net_monthly_retirement(inputs);
    let wealth_needed_at_retirement =
        present_value_annuity(net_retirement, monthly_rate, months_in_retirement);
    let future_value_of_savings =
        future_value(inputs.current_savings, monthly_rate, months_until_retirement);
    // Signed: a negative value is a surplus and becomes planned dissaving.
    let additional_wealth_needed = wealth_needed_at_retirement - future_value_of_savings;

    let monthly_savings_needed = if months_until_retirement == 0 {
        0.0
    } else {
        sinking_fund_payment(additional_wealth_needed, monthly_rate, months_until_retirement)
    };

    let (earnings, outcome) = if months_until_retirement == 0 {
        solve_at_retirement(additional_wealth_needed)
    } else if additional_wealth_needed <= 0.0 {
        (
            Earnings::NONE,
            Outcome::AlreadySufficient {
                surplus: -additional_wealth_needed,
            },
        )
    } else {
        solve_before_retirement(
            inputs.living_expense_per_month,
            monthly_savings_needed,
            months_until_retirement,
        )
    };

    let is_achievable = match outcome {
        Outcome::OnTrack | Outcome::AlreadySufficient { .. } | Outcome::ExactMatch => true,
        Outcome::LumpSumRequired { .. } | Outcome::ImmediateSurplus { .. } | Outcome::Unrealistic => {
            false
        }
    };

    let wealth_chart = simulate(inputs, monthly_savings_needed, exact_current_age);

    CalculationResults {
        total_earnings_needed: earnings.total,
        yearly_earnings_needed: earnings.yearly,
        monthly_earnings_needed: earnings.monthly,
        wealth_chart,
        is_achievable,
        message: outcome.message(),
        outcome,
        figures: PlanFigures {
            exact_current_age,
            monthly_rate,
            months_until_retirement,
            months_in_retirement,
            net_monthly_retirement: net_retirement,
            wealth_needed_at_retirement,
            future_value_of_savings,
            additional_wealth_needed,
            monthly_savings_needed,
        },
    }
}

fn solve_at_retirement(additional_wealth_needed: f64) -> (Earnings, Outcome) {
    if !additional_wealth_needed.is_finite() {
        let earnings = Earnings {
            total: additional_wealth_needed,
            yearly: additional_wealth_needed,
            monthly: additional_wealth_needed,
        };
        (earnings, Outcome::Unrealistic)
    } else if additional_wealth_needed.abs() < EPS {
        (Earnings::NONE, Outcome::ExactMatch)
    } else if additional_wealth_needed > 0.0 {
        (
            Earnings {
                total: additional_wealth_needed,
                yearly: additional_wealth_needed,
                monthly: f64::INFINITY,
            },
            Outcome::LumpSumRequired {
                amount: additional_wealth_needed,
            },
        )
    } else {
        (
            Earnings::NONE,
            Outcome::ImmediateSurplus {
                amount: -additional_wealth_needed,
            },
        )
    }
}

fn solve_before_retirement(
    living_expense_per_month: f64,
    monthly_savings_needed: f64,
    months_until_retirement: u32,
) -> (Earnings, Outcome) {
    let monthly = living_expense_per_month + monthly_savings_needed;
    let earnings = Earnings {
        total: monthly * months_until_retirement as f64,
        yearly: monthly * 12.0,
        monthly,
    };
    let outcome = if is_sane_monthly_earnings(monthly) {
        Outcome::OnTrack
    } else {
        Outcome::Unrealistic
    };
    (earnings, outcome)
}

fn is_sane_monthly_earnings(monthly: f64) -> bool {
    monthly.is_finite() && monthly > MIN_SANE_MONTHLY_EARNINGS && monthly < MAX_SANE_MONTHLY_EARNINGS
}
