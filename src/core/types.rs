use serde::{Deserialize, Serialize};

/// One calculation request. Ages are in years, money amounts per month unless
/// the name says otherwise, and `roi_rate` is an annual percentage (4 = 4%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inputs {
    pub current_age: u32,
    pub current_age_months: u32,
    pub current_savings: f64,
    pub retirement_age: f64,
    pub life_expectancy: f64,
    pub living_expense_per_month: f64,
    pub roi_rate: f64,
    pub income_per_month_after_retirement: f64,
    pub living_expense_per_month_after_retirement: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyWealth {
    pub age: i64,
    pub wealth: f64,
}

/// Which special case, if any, the solver landed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Outcome {
    OnTrack,
    AlreadySufficient { surplus: f64 },
    ExactMatch,
    LumpSumRequired { amount: f64 },
    ImmediateSurplus { amount: f64 },
    Unrealistic,
}

impl Outcome {
    pub fn message(self) -> Option<String> {
        match self {
            Outcome::OnTrack => None,
            Outcome::AlreadySufficient { surplus } => Some(format!(
                "You already have enough savings! Your savings exceed the plan by {surplus:.2} at retirement, so no additional earnings are needed."
            )),
            Outcome::ExactMatch => Some(
                "You are at retirement now and your current savings exactly match the plan."
                    .to_string(),
            ),
            Outcome::LumpSumRequired { amount } => Some(format!(
                "You need an immediate lump sum of {amount:.2} to fund the plan."
            )),
            Outcome::ImmediateSurplus { amount } => Some(format!(
                "You currently have a surplus of {amount:.2} available to spend/gift immediately."
            )),
            Outcome::Unrealistic => {
                Some("Required monthly income is not finite/realistic.".to_string())
            }
        }
    }
}

/// Intermediate quantities of one solve, reported alongside the results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFigures {
    pub exact_current_age: f64,
    pub monthly_rate: f64,
    pub months_until_retirement: u32,
    pub months_in_retirement: u32,
    pub net_monthly_retirement: f64,
    pub wealth_needed_at_retirement: f64,
    pub future_value_of_savings: f64,
    pub additional_wealth_needed: f64,
    pub monthly_savings_needed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResults {
    pub total_earnings_needed: f64,
    pub yearly_earnings_needed: f64,
    pub monthly_earnings_needed: f64,
    pub wealth_chart: Vec<YearlyWealth>,
    pub is_achievable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub outcome: Outcome,
    pub figures: PlanFigures,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Phase {
    Working,
    Retirement,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBreakdown {
    pub age: i64,
    pub phase: Phase,
    pub wealth: f64,
    pub income: f64,
    pub roi_income: f64,
    pub expense: f64,
    pub net: f64,
}
