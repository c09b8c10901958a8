use super::tvm::{effective_monthly_rate, months_between, net_monthly_retirement};
use super::types::{CalculationResults, Inputs, Phase, YearBreakdown, YearlyWealth};

/// Retirement starts once the simulated age is within this margin of the
/// retirement age, so float drift on the boundary month cannot flip phase.
const RETIREMENT_BOUNDARY_EPS: f64 = 1e-9;

/// Walks the plan month by month from `exact_current_age` to life expectancy
/// and samples the balance at every whole age.
///
/// Before retirement `monthly_savings_needed` is added each month (negative
/// means drawing savings down); afterwards the net retirement shortfall is
/// withdrawn. Sampled wealth is floored at zero.
pub fn simulate(
    inputs: &Inputs,
    monthly_savings_needed: f64,
    exact_current_age: f64,
) -> Vec<YearlyWealth> {
    let balances = simulate_monthly_balances(inputs, monthly_savings_needed, exact_current_age);
    let total_months = balances.len() - 1;

    let start_year = exact_current_age.floor() as i64;
    let end_year = inputs.life_expectancy.floor() as i64;
    let years = end_year.saturating_sub(start_year).max(0) as usize;
    let mut chart = Vec::with_capacity(years.saturating_add(1));
    for year in start_year..=end_year.max(start_year) {
        let months_from_start = ((year as f64 - exact_current_age) * 12.0).round();
        let idx = months_from_start.clamp(0.0, total_months as f64) as usize;
        chart.push(YearlyWealth {
            age: year,
            wealth: balances[idx].max(0.0),
        });
    }
    chart
}

/// Balance at the start of every month, index 0 being today. Always holds at
/// least one entry.
fn simulate_monthly_balances(
    inputs: &Inputs,
    monthly_savings_needed: f64,
    exact_current_age: f64,
) -> Vec<f64> {
    let monthly_rate = effective_monthly_rate(inputs.roi_rate);
    let net_retirement = net_monthly_retirement(inputs);
    let total_months = months_between(exact_current_age, inputs.life_expectancy) as usize;

    let mut balances = Vec::with_capacity(total_months + 1);
    let mut balance = inputs.current_savings;
    for t in 0..=total_months {
        balances.push(balance);
        let age_at_t = exact_current_age + t as f64 / 12.0;
        let is_retired = age_at_t + RETIREMENT_BOUNDARY_EPS >= inputs.retirement_age;
        let cashflow = if is_retired {
            -net_retirement
        } else {
            monthly_savings_needed
        };
        balance = balance * (1.0 + monthly_rate) + cashflow;
    }
    balances
}

/// Per-age income and expense detail for each point of the results' chart.
///
/// Working-phase income is the reported `monthly_earnings_needed`, not the
/// cash flow the chart was simulated with. When savings already cover the
/// plan the earnings fields are zero while the chart spends the surplus down,
/// so those rows show no income.
pub fn run_yearly_breakdown(inputs: &Inputs, results: &CalculationResults) -> Vec<YearBreakdown> {
    let annual_rate = inputs.roi_rate / 100.0;
    let working_income = if results.monthly_earnings_needed.is_finite() {
        results.monthly_earnings_needed * 12.0
    } else {
        0.0
    };

    results
        .wealth_chart
        .iter()
        .map(|point| {
            let phase = if point.age as f64 >= inputs.retirement_age {
                Phase::Retirement
            } else {
                Phase::Working
            };
            let (income, expense) = match phase {
                Phase::Working => (working_income, inputs.living_expense_per_month * 12.0),
                Phase::Retirement => (
                    inputs.income_per_month_after_retirement * 12.0,
                    inputs.living_expense_per_month_after_retirement * 12.0,
                ),
            };
            let roi_income = point.wealth * annual_rate;
            YearBreakdown {
                age: point.age,
                phase,
                wealth: point.wealth,
                income,
                roi_income,
                expense,
                net: income + roi_income - expense,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tvm::{exact_age, future_value, future_value_annuity};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_inputs() -> Inputs {
        Inputs {
            current_age: 30,
            current_age_months: 0,
            current_savings: 200_000.0,
            retirement_age: 50.0,
            life_expectancy: 80.0,
            living_expense_per_month: 10_000.0,
            roi_rate: 4.0,
            income_per_month_after_retirement: 2_000.0,
            living_expense_per_month_after_retirement: 10_000.0,
        }
    }

    #[test]
    fn chart_covers_every_whole_age_inclusive() {
        let inputs = sample_inputs();
        let chart = simulate(&inputs, 0.0, 30.0);
        assert_eq!(chart.len(), 51);
        assert_eq!(chart[0].age, 30);
        assert_eq!(chart[50].age, 80);
        assert_eq!(chart[0].wealth, 200_000.0);
    }

    #[test]
    fn fractional_start_age_samples_nearest_month() {
        let mut inputs = sample_inputs();
        inputs.current_age_months = 6;
        inputs.roi_rate = 0.0;
        let start = exact_age(inputs.current_age, inputs.current_age_months);

        let chart = simulate(&inputs, 1_000.0, start);
        assert_eq!(chart[0].age, 30);
        // Age 30 lies before the start; it clamps to today's balance.
        assert_eq!(chart[0].wealth, 200_000.0);
        assert_eq!(chart[1].age, 31);
        assert_eq!(chart[1].wealth, 206_000.0);
    }

    #[test]
    fn accumulation_matches_closed_form() {
        let inputs = sample_inputs();
        let rate = effective_monthly_rate(inputs.roi_rate);
        let chart = simulate(&inputs, 1_500.0, 30.0);

        let expected_at_40 =
            future_value(inputs.current_savings, rate, 120) + future_value_annuity(1_500.0, rate, 120);
        assert_approx_tol(chart[10].wealth, expected_at_40, 1e-4);
    }

    #[test]
    fn retirement_withdraws_net_shortfall_at_zero_rate() {
        let mut inputs = sample_inputs();
        inputs.roi_rate = 0.0;
        inputs.current_age = 50;
        inputs.current_savings = 1_000_000.0;

        let chart = simulate(&inputs, 123.0, 50.0);
        assert_eq!(chart[0].wealth, 1_000_000.0);
        assert_eq!(chart[1].wealth, 1_000_000.0 - 8_000.0 * 12.0);
    }

    #[test]
    fn passive_income_surplus_grows_wealth_in_retirement() {
        let mut inputs = sample_inputs();
        inputs.roi_rate = 0.0;
        inputs.current_age = 60;
        inputs.retirement_age = 60.0;
        inputs.current_savings = 0.0;
        inputs.income_per_month_after_retirement = 3_000.0;
        inputs.living_expense_per_month_after_retirement = 2_000.0;

        let chart = simulate(&inputs, 0.0, 60.0);
        assert_eq!(chart[1].wealth, 12_000.0);
    }

    #[test]
    fn depleted_balance_is_floored_at_zero() {
        let mut inputs = sample_inputs();
        inputs.current_savings = 0.0;
        inputs.retirement_age = 30.0;

        let chart = simulate(&inputs, 0.0, 30.0);
        assert_eq!(chart[0].wealth, 0.0);
        assert!(chart.iter().all(|p| p.wealth == 0.0));
    }

    #[test]
    fn no_remaining_months_yields_single_point() {
        let mut inputs = sample_inputs();
        inputs.current_age = 80;
        inputs.life_expectancy = 80.0;

        let chart = simulate(&inputs, 0.0, 80.0);
        assert_eq!(chart.len(), 1);
        assert_eq!(chart[0].age, 80);
        assert_eq!(chart[0].wealth, 200_000.0);
    }

    #[test]
    fn start_past_life_expectancy_still_reports_today() {
        let mut inputs = sample_inputs();
        inputs.current_age = 85;

        let chart = simulate(&inputs, 0.0, 85.0);
        assert_eq!(chart.len(), 1);
        assert_eq!(chart[0].age, 85);
    }

    #[test]
    fn retirement_cashflow_starts_on_the_boundary_month_despite_float_drift() {
        let inputs = Inputs {
            current_age: 1,
            current_age_months: 8,
            current_savings: 0.0,
            retirement_age: 2.0,
            life_expectancy: 3.0,
            living_expense_per_month: 0.0,
            roi_rate: 0.0,
            income_per_month_after_retirement: 0.0,
            living_expense_per_month_after_retirement: 1.0,
        };
        let start = exact_age(1, 8);
        assert!(start + 4.0 / 12.0 < 2.0);

        let balances = simulate_monthly_balances(&inputs, 100.0, start);
        // Four months of saving, then one withdrawal per month.
        assert_eq!(balances[4], 400.0);
        assert_eq!(balances[5], 399.0);
        assert_eq!(balances[6], 398.0);

        let chart = simulate(&inputs, 100.0, start);
        assert_eq!(chart[1].age, 2);
        assert_eq!(chart[1].wealth, 400.0);
    }

    #[test]
    fn extreme_negative_ages_do_not_overflow() {
        let mut inputs = sample_inputs();
        inputs.retirement_age = -1e30;
        inputs.life_expectancy = -1e30;

        let chart = simulate(&inputs, 0.0, 30.0);
        assert_eq!(chart.len(), 1);
        assert_eq!(chart[0].age, 30);
        assert_eq!(chart[0].wealth, 200_000.0);
    }

    #[test]
    fn breakdown_reports_no_working_income_when_savings_already_suffice() {
        let mut inputs = sample_inputs();
        inputs.current_savings = 10_000_000.0;
        let results = crate::core::solve(&inputs);
        assert!(results.figures.monthly_savings_needed < 0.0);

        let rows = run_yearly_breakdown(&inputs, &results);
        assert_eq!(rows[0].phase, Phase::Working);
        assert_eq!(rows[0].income, 0.0);
    }

    #[test]
    fn breakdown_splits_working_and_retirement_years() {
        let inputs = sample_inputs();
        let results = crate::core::solve(&inputs);
        let rows = run_yearly_breakdown(&inputs, &results);

        assert_eq!(rows.len(), results.wealth_chart.len());
        assert_eq!(rows[0].phase, Phase::Working);
        assert_approx_tol(rows[0].income, results.monthly_earnings_needed * 12.0, 1e-9);
        assert_approx_tol(rows[0].expense, 120_000.0, 1e-9);
        assert_approx_tol(rows[0].roi_income, 200_000.0 * 0.04, 1e-9);

        let at_retirement = &rows[20];
        assert_eq!(at_retirement.age, 50);
        assert_eq!(at_retirement.phase, Phase::Retirement);
        assert_approx_tol(at_retirement.income, 24_000.0, 1e-9);
        assert_approx_tol(at_retirement.expense, 120_000.0, 1e-9);
        assert_approx_tol(
            at_retirement.net,
            at_retirement.income + at_retirement.roi_income - at_retirement.expense,
            1e-9,
        );
    }

    #[test]
    fn breakdown_ignores_non_finite_working_income() {
        let mut inputs = sample_inputs();
        inputs.current_age = 50;
        inputs.current_age_months = 0;
        inputs.retirement_age = 50.5;
        inputs.current_savings = 0.0;
        let mut results = crate::core::solve(&inputs);
        results.monthly_earnings_needed = f64::INFINITY;

        let rows = run_yearly_breakdown(&inputs, &results);
        assert_eq!(rows[0].phase, Phase::Working);
        assert_eq!(rows[0].income, 0.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_chart_ages_step_by_one_and_wealth_is_non_negative(
            current_age in 0u32..90,
            months in 0u32..12,
            savings in 0u32..2_000_000,
            retirement_offset in -10i32..40,
            life_offset in -5i32..60,
            roi_bp in -300i32..1500,
            monthly_savings in -20_000i32..20_000,
            net_retirement in -5_000i32..15_000
        ) {
            let start = exact_age(current_age, months);
            let retirement_age = current_age as f64 + retirement_offset as f64;
            let inputs = Inputs {
                current_age,
                current_age_months: months,
                current_savings: savings as f64,
                retirement_age,
                life_expectancy: (retirement_age + life_offset as f64).max(0.0),
                living_expense_per_month: 2_000.0,
                roi_rate: roi_bp as f64 / 100.0,
                income_per_month_after_retirement: 0.0,
                living_expense_per_month_after_retirement: net_retirement as f64,
            };

            let chart = simulate(&inputs, monthly_savings as f64, start);
            prop_assert!(!chart.is_empty());
            prop_assert_eq!(chart[0].age, start.floor() as i64);
            if inputs.life_expectancy.floor() >= start.floor() {
                prop_assert_eq!(chart.last().map(|p| p.age), Some(inputs.life_expectancy.floor() as i64));
            }
            for pair in chart.windows(2) {
                prop_assert_eq!(pair[1].age, pair[0].age + 1);
            }
            for point in &chart {
                prop_assert!(point.wealth >= 0.0);
            }
        }
    }
}
