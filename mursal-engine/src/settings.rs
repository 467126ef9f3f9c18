//! Hot-reloadable automation settings
//!
//! Templates, per-kind switches, and delay knobs are read afresh at the
//! top of every cycle, so an operator edit through the admin layer takes
//! effect on the next poll without a restart.

use std::sync::Arc;

use mursal_common::{EnabledKinds, TemplateSet};
use serde::{Deserialize, Serialize};

/// Settings the engine snapshots once per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationSettings {
    /// Message templates.
    #[serde(default)]
    pub templates: TemplateSet,

    /// Per-kind enable switches.
    #[serde(default)]
    pub enabled: EnabledKinds,

    /// Company name substituted into templates.
    #[serde(default = "default_company_name")]
    pub company_name: String,

    /// Hours between a new-order message and its reminder.
    #[serde(default = "default_reminder_delay_hours")]
    pub reminder_delay_hours: f64,

    /// Hours between a rejection and the discounted follow-up offer.
    #[serde(default = "default_rejected_offer_delay_hours")]
    pub rejected_offer_delay_hours: f64,

    /// Discount applied to rejected-offer follow-ups, in percent.
    #[serde(default = "default_rejected_offer_discount_percent")]
    pub rejected_offer_discount_percent: f64,
}

fn default_company_name() -> String {
    String::new()
}

const fn default_reminder_delay_hours() -> f64 {
    24.0
}

const fn default_rejected_offer_delay_hours() -> f64 {
    24.0
}

const fn default_rejected_offer_discount_percent() -> f64 {
    20.0
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            templates: TemplateSet::default(),
            enabled: EnabledKinds::default(),
            company_name: default_company_name(),
            reminder_delay_hours: default_reminder_delay_hours(),
            rejected_offer_delay_hours: default_rejected_offer_delay_hours(),
            rejected_offer_discount_percent: default_rejected_offer_discount_percent(),
        }
    }
}

impl AutomationSettings {
    /// Reminder delay as a duration.
    #[must_use]
    pub fn reminder_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.reminder_delay_hours.max(0.0) * 3600.0)
    }

    /// Rejected-offer delay as a duration.
    #[must_use]
    pub fn rejected_offer_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.rejected_offer_delay_hours.max(0.0) * 3600.0)
    }

    /// Apply the configured discount to an amount.
    ///
    /// Returns `(discounted, saved)`, both rounded to whole currency
    /// units.
    #[must_use]
    pub fn discount(&self, amount: f64) -> (f64, f64) {
        let fraction = (self.rejected_offer_discount_percent / 100.0).clamp(0.0, 1.0);
        let discounted = (amount * (1.0 - fraction)).round();
        (discounted, amount - discounted)
    }
}

/// Shared handle letting the admin layer swap settings at runtime.
pub type SharedSettings = Arc<parking_lot::RwLock<AutomationSettings>>;

/// Wrap settings for sharing with the engine and workers.
#[must_use]
pub fn shared(settings: AutomationSettings) -> SharedSettings {
    Arc::new(parking_lot::RwLock::new(settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AutomationSettings::default();
        assert!((settings.reminder_delay_hours - 24.0).abs() < f64::EPSILON);
        assert!((settings.rejected_offer_discount_percent - 20.0).abs() < f64::EPSILON);
        assert_eq!(
            settings.reminder_delay(),
            std::time::Duration::from_secs(86400)
        );
    }

    #[test]
    fn test_discount_computation() {
        let settings = AutomationSettings::default();
        let (discounted, saved) = settings.discount(250.0);
        assert!((discounted - 200.0).abs() < f64::EPSILON);
        assert!((saved - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_discount_rounds_to_whole_units() {
        let settings = AutomationSettings {
            rejected_offer_discount_percent: 15.0,
            ..Default::default()
        };
        let (discounted, saved) = settings.discount(99.0);
        // 99 * 0.85 = 84.15, rounded to 84.
        assert!((discounted - 84.0).abs() < f64::EPSILON);
        assert!((saved - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_discount_clamped_to_valid_range() {
        let settings = AutomationSettings {
            rejected_offer_discount_percent: 150.0,
            ..Default::default()
        };
        let (discounted, _) = settings.discount(100.0);
        assert!((discounted - 0.0).abs() < f64::EPSILON);
    }
}
