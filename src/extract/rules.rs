//! Pattern rules that turn combat log lines into event magnitudes.
//!
//! Each rule matches one combat line type: a `(combat)` marker, the bold
//! numeric field and a directional phrase such as `>to<` or
//! `remote armor repaired by <`.

use regex::Regex;

use super::totals::{EventTotals, Total};

/// Color code the client uses on neutralizer lines the listener caused.
pub const NEUT_DONE_COLOR: &str = "ff7fffff";

/// Color code the client uses on neutralizer lines the listener suffered.
pub const NEUT_RECEIVED_COLOR: &str = "ffe57f7f";

/// Combat line type recognised by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DamageOut,
    DamageIn,
    ArmorRepairedOut,
    HullRepairedOut,
    ShieldBoostedOut,
    ArmorRepairedIn,
    HullRepairedIn,
    ShieldBoostedIn,
    CapTransmittedOut,
    CapTransmittedIn,
    EnergyNeutralizedOut,
    EnergyNeutralizedIn,
    /// Nosferatu drain in the listener's favour (`+N energy drained from`).
    EnergyDrainedFrom,
    /// Nosferatu drain against the listener (`-N energy drained to`).
    EnergyDrainedTo,
}

/// Error type for rule construction.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// Invalid regex pattern.
    #[error("Invalid extraction pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// A single extraction rule.
///
/// The first capture group of `pattern` must hold the digits to sum.
/// Every match is credited to each category in `credits`.
#[derive(Debug, Clone)]
pub struct Rule {
    kind: EventKind,
    pattern: Regex,
    credits: &'static [Total],
}

impl Rule {
    /// Create a new rule.
    ///
    /// # Errors
    ///
    /// Returns `ExtractError::InvalidPattern` if the regex is invalid.
    pub fn new(
        kind: EventKind,
        pattern: &str,
        credits: &'static [Total],
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            kind,
            pattern: Regex::new(pattern)?,
            credits,
        })
    }

    /// Sum of every captured magnitude in `text`.
    #[must_use]
    pub fn sum(&self, text: &str) -> u64 {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| m.as_str().parse::<u64>().ok())
            .fold(0u64, u64::saturating_add)
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Categories this rule contributes to.
    #[must_use]
    pub fn credits(&self) -> &'static [Total] {
        self.credits
    }

    /// Get the pattern string (for debugging/display).
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Reduces a block of log text to [`EventTotals`].
///
/// Holds only compiled rules, so the same block always yields the same
/// totals and totals of concatenated blocks add up.
#[derive(Debug, Clone)]
pub struct Extractor {
    rules: Vec<Rule>,
}

impl Extractor {
    /// Create an extractor with the built-in combat rules.
    #[must_use]
    pub fn new() -> Self {
        let rules = Self::default_rules()
            .into_iter()
            .filter_map(|result| match result {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to compile default extraction rule");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// Create an extractor from an explicit rule set.
    #[must_use]
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Extract event totals from a delta block.
    #[must_use]
    pub fn extract(&self, text: &str) -> EventTotals {
        let mut totals = EventTotals::zero();
        if text.is_empty() {
            return totals;
        }
        for rule in &self.rules {
            let amount = rule.sum(text);
            if amount == 0 {
                continue;
            }
            for &total in rule.credits() {
                totals.credit(total, amount);
            }
        }
        totals
    }

    fn default_rules() -> Vec<Result<Rule, ExtractError>> {
        use EventKind as K;
        use Total as T;

        vec![
            Rule::new(
                K::DamageOut,
                r"\(combat\) <.*?><b>([0-9]+).*>to<",
                &[T::DamageOut],
            ),
            Rule::new(
                K::DamageIn,
                r"\(combat\) <.*?><b>([0-9]+).*>from<",
                &[T::DamageIn],
            ),
            Rule::new(
                K::ArmorRepairedOut,
                r"\(combat\) <.*?><b>([0-9]+).*> remote armor repaired to <",
                &[T::LogisticsOut],
            ),
            Rule::new(
                K::HullRepairedOut,
                r"\(combat\) <.*?><b>([0-9]+).*> remote hull repaired to <",
                &[T::LogisticsOut],
            ),
            Rule::new(
                K::ShieldBoostedOut,
                r"\(combat\) <.*?><b>([0-9]+).*> remote shield boosted to <",
                &[T::LogisticsOut],
            ),
            Rule::new(
                K::ArmorRepairedIn,
                r"\(combat\) <.*?><b>([0-9]+).*> remote armor repaired by <",
                &[T::LogisticsIn],
            ),
            Rule::new(
                K::HullRepairedIn,
                r"\(combat\) <.*?><b>([0-9]+).*> remote hull repaired by <",
                &[T::LogisticsIn],
            ),
            Rule::new(
                K::ShieldBoostedIn,
                r"\(combat\) <.*?><b>([0-9]+).*> remote shield boosted by <",
                &[T::LogisticsIn],
            ),
            Rule::new(
                K::CapTransmittedOut,
                r"\(combat\) <.*?><b>([0-9]+).*> remote capacitor transmitted to <",
                &[T::CapTransferredOut],
            ),
            Rule::new(
                K::CapTransmittedIn,
                r"\(combat\) <.*?><b>([0-9]+).*> remote capacitor transmitted by <",
                &[T::CapReceivedIn],
            ),
            Rule::new(
                K::EnergyNeutralizedOut,
                &format!(r"\(combat\) <.*?{NEUT_DONE_COLOR}><b>([0-9]+).*> energy neutralized <"),
                &[T::CapDamageDone],
            ),
            Rule::new(
                K::EnergyNeutralizedIn,
                &format!(
                    r"\(combat\) <.*?{NEUT_RECEIVED_COLOR}><b>([0-9]+).*> energy neutralized <"
                ),
                &[T::CapDamageReceived],
            ),
            // Drained energy is both capacitor gained and capacitor damage dealt.
            Rule::new(
                K::EnergyDrainedFrom,
                r"\(combat\) <.*?><b>\+([0-9]+).*> energy drained from <",
                &[T::CapReceivedIn, T::CapDamageDone],
            ),
            Rule::new(
                K::EnergyDrainedTo,
                r"\(combat\) <.*?><b>-([0-9]+).*> energy drained to <",
                &[T::CapDamageReceived],
            ),
        ]
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}
