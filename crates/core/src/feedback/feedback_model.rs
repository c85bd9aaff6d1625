use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    Buy,
    Sell,
    Hold,
    Rebalance,
}

/// A past investment decision and how it turned out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub date: NaiveDate,
    pub action: DecisionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// Realized or marked return of the decision, as a fraction
    pub outcome_return: f64,
    /// Market move over the period leading up to the decision
    #[serde(default)]
    pub market_change_before: f64,
    #[serde(default)]
    pub followed_recommendation: bool,
    /// Days between the recommendation/trigger and the action
    #[serde(default)]
    pub days_to_act: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SatisfactionScore {
    pub date: NaiveDate,
    /// 1 (very unhappy) to 10 (very happy)
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceChange {
    pub date: NaiveDate,
    pub field: String,
    pub from: String,
    pub to: String,
}

impl PreferenceChange {
    /// True for edits to risk tolerance or other risk settings.
    pub fn is_risk_setting(&self) -> bool {
        self.field.to_ascii_lowercase().contains("risk")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFeedback {
    #[serde(default)]
    pub decisions: Vec<Decision>,
    #[serde(default)]
    pub satisfaction_scores: Vec<SatisfactionScore>,
    /// Free-form tags such as "panic_selling" or "fomo"
    #[serde(default)]
    pub behavioral_patterns: Vec<String>,
    #[serde(default)]
    pub preference_changes: Vec<PreferenceChange>,
}

impl UserFeedback {
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
            && self.satisfaction_scores.is_empty()
            && self.behavioral_patterns.is_empty()
            && self.preference_changes.is_empty()
    }

    /// Decisions sorted by date, oldest first.
    pub fn decisions_by_date(&self) -> Vec<&Decision> {
        let mut out: Vec<&Decision> = self.decisions.iter().collect();
        out.sort_by_key(|d| d.date);
        out
    }

    /// Satisfaction scores sorted by date, oldest first.
    pub fn scores_by_date(&self) -> Vec<f64> {
        let mut scores: Vec<&SatisfactionScore> = self.satisfaction_scores.iter().collect();
        scores.sort_by_key(|s| s.date);
        scores
            .into_iter()
            .map(|s| s.score)
            .filter(|s| s.is_finite())
            .collect()
    }

    /// Latest date mentioned anywhere in the feedback.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        let decision_dates = self.decisions.iter().map(|d| d.date);
        let score_dates = self.satisfaction_scores.iter().map(|s| s.date);
        let pref_dates = self.preference_changes.iter().map(|p| p.date);
        decision_dates.chain(score_dates).chain(pref_dates).max()
    }

    /// Share of decisions that followed an engine recommendation. `None` without decisions.
    pub fn follow_through_rate(&self) -> Option<f64> {
        if self.decisions.is_empty() {
            return None;
        }
        let followed = self
            .decisions
            .iter()
            .filter(|d| d.followed_recommendation)
            .count();
        Some(followed as f64 / self.decisions.len() as f64)
    }

    /// True when any behavioral tag contains one of `needles` (case-insensitive).
    pub fn has_pattern(&self, needles: &[&str]) -> bool {
        self.behavioral_patterns.iter().any(|tag| {
            let tag = tag.to_ascii_lowercase();
            needles.iter().any(|n| tag.contains(n))
        })
    }
}
