use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreClass {
    AutoYes,
    Conditional,
    AutoNo,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreThresholds {
    pub auto_yes_min_ncs: f64,
    pub auto_yes_max_fws: f64,
    /// FWS strictly above this vetoes the setup regardless of NCS.
    pub auto_no_fws: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            auto_yes_min_ncs: 70.0,
            auto_yes_max_fws: 30.0,
            auto_no_fws: 65.0,
        }
    }
}

pub fn classify_scores(ncs: f64, fws: f64, t: &ScoreThresholds) -> ScoreClass {
    if fws > t.auto_no_fws {
        ScoreClass::AutoNo
    } else if ncs >= t.auto_yes_min_ncs && fws <= t.auto_yes_max_fws {
        ScoreClass::AutoYes
    } else {
        ScoreClass::Conditional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        let t = ScoreThresholds::default();
        assert_eq!(classify_scores(70.0, 30.0, &t), ScoreClass::AutoYes);
        assert_eq!(classify_scores(95.0, 66.0, &t), ScoreClass::AutoNo);
        assert_eq!(classify_scores(69.0, 20.0, &t), ScoreClass::Conditional);
        assert_eq!(classify_scores(90.0, 31.0, &t), ScoreClass::Conditional);
        assert_eq!(classify_scores(10.0, 65.0, &t), ScoreClass::Conditional);
    }
}
