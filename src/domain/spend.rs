//! Conversion of a payment into hours of disposable income.

use validator::Validate;

use super::error::ConfigError;

/// Monthly figures the conversion is based on
#[derive(Debug, Clone, Copy, PartialEq, Validate)]
pub struct IncomeProfile {
    #[validate(range(min = 0.0, message = "Monthly income cannot be negative"))]
    pub monthly_income: f64,
    #[validate(range(min = 0.0, message = "Monthly outgoings cannot be negative"))]
    pub monthly_outgoings: f64,
    #[validate(range(exclusive_min = 0.0, message = "Monthly working hours must be positive"))]
    pub monthly_working_hours: f64,
}

impl IncomeProfile {
    /// Build a profile, rejecting figures that would make the conversion divide by zero.
    pub fn new(
        monthly_income: f64,
        monthly_outgoings: f64,
        monthly_working_hours: f64,
    ) -> Result<Self, ConfigError> {
        let profile = Self {
            monthly_income,
            monthly_outgoings,
            monthly_working_hours,
        };
        profile.check()?;
        Ok(profile)
    }

    fn check(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("MONTHLY_INCOME", self.monthly_income),
            ("MONTHLY_OUTGOINGS", self.monthly_outgoings),
            ("MONTHLY_WORKING_HOURS", self.monthly_working_hours),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(key, "must be a finite number"));
            }
        }

        self.validate()
            .map_err(|e| ConfigError::invalid("income profile", e.to_string()))?;

        if self.monthly_income == self.monthly_outgoings {
            return Err(ConfigError::invalid(
                "MONTHLY_OUTGOINGS",
                "must differ from MONTHLY_INCOME, otherwise there is no disposable income",
            ));
        }
        Ok(())
    }

    pub fn disposable_income(&self) -> f64 {
        self.monthly_income - self.monthly_outgoings
    }

    pub fn disposable_hourly_income(&self) -> f64 {
        self.disposable_income() / self.monthly_working_hours
    }

    /// Hours of disposable income represented by `amount_minor_units`.
    ///
    /// Debits arrive negative, so a payment of -1000 pence yields a positive figure.
    pub fn hours_spent(&self, amount_minor_units: i64) -> f64 {
        let spent = -(amount_minor_units as f64) / 100.0;
        spent / self.disposable_hourly_income()
    }
}
