use serde::{Deserialize, Serialize};

/// Fully-populated projection parameters. Rates are annual percentages
/// (4.0 means 4%); money is in the user's currency unit, monthly where named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionInput {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub current_salary: f64,
    pub epf_balance: f64,
    pub prs_balance: f64,
    pub monthly_contribution_prs: f64,
    pub monthly_contribution_prs_percentage: f64,
    /// Total employer + employee EPF rate.
    pub monthly_epf_contribution_rate: f64,
    /// Employee-only EPF rate; only feeds disposable income.
    pub employee_epf_contribution_rate: f64,
    pub target_monthly_income_input: Option<f64>,
    pub pre_retirement_return: f64,
    pub post_retirement_return: f64,
    pub inflation_rate: f64,
    pub enable_salary_increments: bool,
    pub salary_increment_rate: f64,
}

impl ProjectionInput {
    /// Percentage-based PRS contribution wins over the fixed amount.
    pub fn resolved_prs_contribution(&self) -> f64 {
        if self.monthly_contribution_prs_percentage > 0.0 {
            self.current_salary * self.monthly_contribution_prs_percentage / 100.0
        } else {
            self.monthly_contribution_prs
        }
    }

    /// Annual salary growth as a fraction, zero when increments are disabled.
    pub fn salary_growth_rate(&self) -> f64 {
        if self.enable_salary_increments {
            self.salary_increment_rate / 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub years_to_retirement: u32,
    pub years_in_retirement: u32,
    pub last_drawn_salary: f64,
    pub target_monthly_income: f64,
    pub monthly_epf_contribution: f64,
    pub monthly_employee_epf_contribution: f64,
    pub monthly_contribution_prs: f64,
    pub disposable_monthly_salary: f64,
    pub total_funds_needed: f64,
    pub projected_epf_balance: f64,
    pub projected_prs_balance: f64,
    pub total_projected_savings: f64,
    pub funding_gap: f64,
    pub additional_monthly_savings_required: f64,
}
