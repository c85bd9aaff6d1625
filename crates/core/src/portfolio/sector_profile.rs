//! Cross-sectional return and volatility priors by sector.
//!
//! Used whenever price history is missing for a holding, and as the
//! shrinkage target when history is available.

use serde::{Deserialize, Serialize};

/// Long-run annual total return and volatility assumptions for a sector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorProfile {
    pub expected_return: f64,
    pub volatility: f64,
}

const DEFAULT_PROFILE: SectorProfile = SectorProfile {
    expected_return: 0.08,
    volatility: 0.20,
};

/// Looks up the prior for a sector label. Matching is case-insensitive and
/// tolerant of common aliases ("Tech", "REITs", "Bonds").
pub fn sector_profile(sector: &str) -> SectorProfile {
    let key = sector.trim().to_ascii_lowercase();
    let (expected_return, volatility) = match key.as_str() {
        s if s.starts_with("tech") || s == "information technology" => (0.10, 0.28),
        "communication services" | "communications" | "telecom" => (0.08, 0.24),
        "consumer discretionary" => (0.09, 0.24),
        "consumer staples" => (0.07, 0.15),
        "energy" => (0.08, 0.30),
        "financials" | "financial" | "banks" => (0.085, 0.24),
        "health care" | "healthcare" => (0.08, 0.18),
        "industrials" => (0.08, 0.21),
        "materials" => (0.075, 0.23),
        s if s.starts_with("real estate") || s.starts_with("reit") => (0.075, 0.22),
        "utilities" => (0.065, 0.16),
        s if s.starts_with("bond") || s == "fixed income" => (0.045, 0.07),
        "cash" | "money market" => (0.04, 0.01),
        s if s.contains("bdc") || s.contains("business development") => (0.09, 0.26),
        s if s.contains("covered call") || s.contains("option income") => (0.075, 0.17),
        s if s.contains("etf") || s.contains("index") || s.contains("broad market") => (0.08, 0.17),
        _ => return DEFAULT_PROFILE,
    };
    SectorProfile {
        expected_return,
        volatility,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sectors() {
        assert_eq!(sector_profile("Utilities").volatility, 0.16);
        assert_eq!(sector_profile("technology").expected_return, 0.10);
        assert_eq!(sector_profile("REITs").volatility, 0.22);
        assert_eq!(sector_profile("Bonds").expected_return, 0.045);
    }

    #[test]
    fn test_unknown_sector_uses_default() {
        assert_eq!(sector_profile("Space Mining"), DEFAULT_PROFILE);
    }
}
