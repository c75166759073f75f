use std::fmt;
use std::str::FromStr;

/// Profitability tier of a menu item, ordered `Low < Medium < High`.
///
/// Labels only ever come out of a label decoder artifact; the variants here
/// are the tiers the page knows how to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProfitabilityLabel {
    Low,
    Medium,
    High,
}

/// How a result should be framed when shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Success,
    Caution,
    Warning,
}

impl Framing {
    /// CSS class used by the result panel
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "result-success",
            Self::Caution => "result-caution",
            Self::Warning => "result-warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognised profitability label '{0}'")]
pub struct UnknownLabel(pub String);

impl ProfitabilityLabel {
    pub const ALL: [ProfitabilityLabel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn framing(&self) -> Framing {
        match self {
            Self::High => Framing::Success,
            Self::Medium => Framing::Caution,
            Self::Low => Framing::Warning,
        }
    }

    /// Tier message shown under the predicted label
    pub fn message(&self) -> &'static str {
        match self {
            Self::High => "This menu item is predicted to be highly profitable! 🚀",
            Self::Medium => "This menu item has moderate profit potential ⚖️",
            Self::Low => "This menu item is likely to be less profitable ⚠️",
        }
    }
}

impl fmt::Display for ProfitabilityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfitabilityLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("High".parse::<ProfitabilityLabel>(), Ok(ProfitabilityLabel::High));
        assert_eq!(" medium ".parse::<ProfitabilityLabel>(), Ok(ProfitabilityLabel::Medium));
        assert_eq!("LOW".parse::<ProfitabilityLabel>(), Ok(ProfitabilityLabel::Low));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "Very High".parse::<ProfitabilityLabel>().unwrap_err();
        assert_eq!(err, UnknownLabel("Very High".to_string()));
    }

    #[test]
    fn test_ordering() {
        assert!(ProfitabilityLabel::Low < ProfitabilityLabel::Medium);
        assert!(ProfitabilityLabel::Medium < ProfitabilityLabel::High);
    }

    #[test]
    fn test_framing_per_tier() {
        assert_eq!(ProfitabilityLabel::High.framing(), Framing::Success);
        assert_eq!(ProfitabilityLabel::Medium.framing(), Framing::Caution);
        assert_eq!(ProfitabilityLabel::Low.framing(), Framing::Warning);
    }
}
