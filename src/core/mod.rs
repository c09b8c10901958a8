mod simulator;
mod solver;
pub mod tvm;
mod types;

pub use simulator::{run_yearly_breakdown, simulate};
pub use solver::solve;
pub use types::{
    CalculationResults, Inputs, Outcome, Phase, PlanFigures, YearBreakdown, YearlyWealth,
};
