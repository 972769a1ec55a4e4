use super::annuity::{
    compound, fv_growing_annuity, fv_level_annuity, fv_level_annuity_factor, pv_growing_annuity,
};
use super::error::ProjectionError;
use super::types::{ProjectionInput, ProjectionResult};

/// Annual EPF dividend assumed for both the existing balance and new
/// contributions, in percent.
pub const DEFAULT_EPF_DIVIDEND_RATE: f64 = 4.0;

/// Share of the last drawn salary targeted when the user gives no target.
const INCOME_REPLACEMENT_RATIO: f64 = 2.0 / 3.0;

const MONTHS_PER_YEAR: u32 = 12;

/// Deterministic retirement funding projection.
///
/// The engine is pure: [`ProjectionEngine::compute`] performs no I/O and keeps
/// no state between calls. Callers validate user input first; the engine
/// only rejects inputs that would make the formulas meaningless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionEngine {
    epf_dividend_rate: f64,
}

impl Default for ProjectionEngine {
    fn default() -> Self {
        Self {
            epf_dividend_rate: DEFAULT_EPF_DIVIDEND_RATE,
        }
    }
}

/// One savings vehicle: an existing balance plus a monthly contribution
/// stream, both compounding at `annual_rate`.
#[derive(Debug, Clone, Copy)]
struct SavingsStream {
    balance: f64,
    monthly_contribution: f64,
    annual_rate: f64,
    /// Annual contribution growth when the contribution follows salary.
    contribution_growth: Option<f64>,
}

impl SavingsStream {
    fn project(self, years: u32, months: u32) -> f64 {
        let grown_balance = compound(self.balance, self.annual_rate, years);
        if self.monthly_contribution <= 0.0 {
            return grown_balance;
        }

        let contributions = match self.contribution_growth {
            Some(growth) => fv_growing_annuity(
                self.monthly_contribution * MONTHS_PER_YEAR as f64,
                self.annual_rate,
                growth,
                years,
            ),
            None => fv_level_annuity(
                self.monthly_contribution,
                self.annual_rate / MONTHS_PER_YEAR as f64,
                months,
            ),
        };
        grown_balance + contributions
    }
}

impl ProjectionEngine {
    pub fn with_epf_dividend_rate(epf_dividend_rate: f64) -> Self {
        Self { epf_dividend_rate }
    }

    pub fn epf_dividend_rate(&self) -> f64 {
        self.epf_dividend_rate
    }

    pub fn compute(&self, input: &ProjectionInput) -> Result<ProjectionResult, ProjectionError> {
        self.check_preconditions(input)?;

        let years_to_retirement = input.retirement_age - input.current_age;
        let years_in_retirement = input.life_expectancy - input.retirement_age;
        let months_to_retirement = years_to_retirement
            .checked_mul(MONTHS_PER_YEAR)
            .ok_or_else(|| ProjectionError::invalid("retirementAge", "horizon too long"))?;
        let months_in_retirement = years_in_retirement
            .checked_mul(MONTHS_PER_YEAR)
            .ok_or_else(|| ProjectionError::invalid("lifeExpectancy", "horizon too long"))?;

        let salary = input.current_salary;
        let monthly_contribution_prs = input.resolved_prs_contribution();
        let monthly_employee_epf = salary * input.employee_epf_contribution_rate / 100.0;
        let disposable_monthly_salary = salary - monthly_employee_epf - monthly_contribution_prs;

        let salary_growth = input.salary_growth_rate();
        let last_drawn_salary = compound(salary, salary_growth, years_to_retirement);

        let target_monthly_income = match input.target_monthly_income_input {
            Some(target) if target > 0.0 => target,
            // Discount a payable, cent-rounded amount.
            _ => round_money(last_drawn_salary * INCOME_REPLACEMENT_RATIO),
        };

        let total_funds_needed = pv_growing_annuity(
            target_monthly_income,
            input.post_retirement_return / 100.0 / MONTHS_PER_YEAR as f64,
            input.inflation_rate / 100.0 / MONTHS_PER_YEAR as f64,
            months_in_retirement,
        );

        let contributions_follow_salary = salary_growth > 0.0;
        let monthly_epf_contribution = salary * input.monthly_epf_contribution_rate / 100.0;
        let projected_epf = SavingsStream {
            balance: input.epf_balance,
            monthly_contribution: monthly_epf_contribution,
            annual_rate: self.epf_dividend_rate / 100.0,
            contribution_growth: contributions_follow_salary.then_some(salary_growth),
        }
        .project(years_to_retirement, months_to_retirement);

        let prs_follows_salary =
            contributions_follow_salary && input.monthly_contribution_prs_percentage > 0.0;
        let projected_prs = SavingsStream {
            balance: input.prs_balance,
            monthly_contribution: monthly_contribution_prs,
            annual_rate: input.pre_retirement_return / 100.0,
            contribution_growth: prs_follows_salary.then_some(salary_growth),
        }
        .project(years_to_retirement, months_to_retirement);

        let total_funds_needed = round_money(total_funds_needed);
        let total_projected_savings = round_money(projected_epf + projected_prs);
        let funding_gap = round_money((total_funds_needed - total_projected_savings).max(0.0));

        let additional_monthly_savings_required = if funding_gap > 0.0 && years_to_retirement > 0
        {
            let factor = fv_level_annuity_factor(
                input.pre_retirement_return / 100.0 / MONTHS_PER_YEAR as f64,
                months_to_retirement,
            );
            funding_gap / factor
        } else {
            0.0
        };

        Ok(ProjectionResult {
            years_to_retirement,
            years_in_retirement,
            last_drawn_salary: round_money(last_drawn_salary),
            target_monthly_income: round_money(target_monthly_income),
            monthly_epf_contribution: round_money(monthly_epf_contribution),
            monthly_employee_epf_contribution: round_money(monthly_employee_epf),
            monthly_contribution_prs: round_money(monthly_contribution_prs),
            disposable_monthly_salary: round_money(disposable_monthly_salary),
            total_funds_needed,
            projected_epf_balance: round_money(projected_epf),
            projected_prs_balance: round_money(projected_prs),
            total_projected_savings,
            funding_gap,
            additional_monthly_savings_required: round_money(additional_monthly_savings_required),
        })
    }

    fn check_preconditions(&self, input: &ProjectionInput) -> Result<(), ProjectionError> {
        if input.current_age >= input.retirement_age {
            return Err(ProjectionError::invalid(
                "retirementAge",
                format!(
                    "must be greater than currentAge ({} >= {})",
                    input.current_age, input.retirement_age
                ),
            ));
        }
        if input.retirement_age >= input.life_expectancy {
            return Err(ProjectionError::invalid(
                "lifeExpectancy",
                format!(
                    "must be greater than retirementAge ({} >= {})",
                    input.retirement_age, input.life_expectancy
                ),
            ));
        }
        if !input.current_salary.is_finite() || input.current_salary <= 0.0 {
            return Err(ProjectionError::invalid("currentSalary", "must be > 0"));
        }

        for (field, amount) in [
            ("epfBalance", input.epf_balance),
            ("prsBalance", input.prs_balance),
            ("monthlyContributionPrs", input.monthly_contribution_prs),
            (
                "monthlyContributionPrsPercentage",
                input.monthly_contribution_prs_percentage,
            ),
            ("monthlyEpfContributionRate", input.monthly_epf_contribution_rate),
            ("employeeEpfContributionRate", input.employee_epf_contribution_rate),
        ] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(ProjectionError::invalid(field, "must be finite and >= 0"));
            }
        }
        if let Some(target) = input.target_monthly_income_input {
            if !target.is_finite() {
                return Err(ProjectionError::invalid(
                    "targetMonthlyIncomeInput",
                    "must be finite",
                ));
            }
        }

        for (field, rate) in [
            ("preRetirementReturn", input.pre_retirement_return),
            ("postRetirementReturn", input.post_retirement_return),
            ("inflationRate", input.inflation_rate),
            ("salaryIncrementRate", input.salary_increment_rate),
            ("epfDividendRate", self.epf_dividend_rate),
        ] {
            if !rate.is_finite() || rate <= -100.0 {
                return Err(ProjectionError::invalid(field, "must be finite and > -100"));
            }
        }
        Ok(())
    }
}

/// Rounds a currency amount to cents.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
