//! Explanation feature ranking.

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::XaiFeature;

use super::{COLOR_ACCENT, COLOR_HIGH, COLOR_MEDIUM, COLOR_NORMAL};

/// Criticality band by impact magnitude, independent of sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactBand {
    /// |impact| >= 0.7
    High,
    /// |impact| >= 0.4
    Medium,
    Low,
}

impl ImpactBand {
    pub fn of(impact: f64) -> Self {
        let magnitude = impact.abs();
        if magnitude >= 0.7 {
            ImpactBand::High
        } else if magnitude >= 0.4 {
            ImpactBand::Medium
        } else {
            ImpactBand::Low
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            ImpactBand::High => COLOR_HIGH,
            ImpactBand::Medium => COLOR_MEDIUM,
            ImpactBand::Low => COLOR_ACCENT,
        }
    }
}

/// Which way the feature pushed the model's decision. Sign alone decides the
/// framing; the band above carries the magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactDirection {
    /// impact > 0 -- contributes toward "suspicious".
    Suspicious,
    /// impact <= 0 -- contributes toward "normal".
    Normal,
}

impl ImpactDirection {
    pub fn of(impact: f64) -> Self {
        if impact > 0.0 {
            ImpactDirection::Suspicious
        } else {
            ImpactDirection::Normal
        }
    }

    pub fn legend_color(self) -> &'static str {
        match self {
            ImpactDirection::Suspicious => COLOR_HIGH,
            ImpactDirection::Normal => COLOR_NORMAL,
        }
    }
}

/// A feature annotated for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedFeature {
    pub name: String,
    pub value: serde_json::Value,
    pub impact: f64,
    pub band: ImpactBand,
    pub direction: ImpactDirection,
    pub explanation: String,
}

/// Order features by descending impact magnitude for display. The backend
/// makes no ordering promise, so display order is always derived here; ties
/// keep their original relative order (stable sort).
pub fn rank_features(features: &[XaiFeature]) -> Vec<RankedFeature> {
    let mut ranked: Vec<RankedFeature> = features
        .iter()
        .map(|feature| RankedFeature {
            name: feature.name.clone(),
            value: feature.value.clone(),
            impact: feature.impact,
            band: ImpactBand::of(feature.impact),
            direction: ImpactDirection::of(feature.impact),
            explanation: feature.explanation.clone(),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.impact
            .abs()
            .partial_cmp(&a.impact.abs())
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(name: &str, impact: f64) -> XaiFeature {
        XaiFeature {
            name: name.into(),
            value: serde_json::json!(1),
            impact,
            explanation: String::new(),
        }
    }

    #[test]
    fn sorts_by_descending_absolute_impact() {
        let ranked = rank_features(&[
            feature("a", 0.2),
            feature("b", -0.9),
            feature("c", 0.5),
        ]);
        let impacts: Vec<f64> = ranked.iter().map(|f| f.impact).collect();
        assert_eq!(impacts, vec![-0.9, 0.5, 0.2]);
    }

    #[test]
    fn ties_keep_original_order() {
        let ranked = rank_features(&[
            feature("first", 0.5),
            feature("second", -0.5),
            feature("third", 0.5),
        ]);
        let names: Vec<&str> = ranked.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn bands_ignore_sign() {
        assert_eq!(ImpactBand::of(0.8), ImpactBand::High);
        assert_eq!(ImpactBand::of(-0.8), ImpactBand::High);
        assert_eq!(ImpactBand::of(0.4), ImpactBand::Medium);
        assert_eq!(ImpactBand::of(-0.39), ImpactBand::Low);
    }

    #[test]
    fn direction_follows_sign() {
        assert_eq!(ImpactDirection::of(0.1), ImpactDirection::Suspicious);
        assert_eq!(ImpactDirection::of(0.0), ImpactDirection::Normal);
        assert_eq!(ImpactDirection::of(-0.3), ImpactDirection::Normal);
    }
}
