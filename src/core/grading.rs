use crate::models::Grade;
use serde::{Deserialize, Serialize};

/// Lower bounds (inclusive) of each letter grade
///
/// Shared by the neighborhood and match engines. A score equal to a
/// threshold receives the higher grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeThresholds {
    pub version: String,
    pub a_plus: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            version: "grades-v1".to_string(),
            a_plus: 95.0,
            a: 85.0,
            b: 70.0,
            c: 55.0,
            d: 40.0,
        }
    }
}

impl GradeThresholds {
    pub fn grade_for(&self, score: f64) -> Grade {
        if score >= self.a_plus {
            Grade::APlus
        } else if score >= self.a {
            Grade::A
        } else if score >= self.b {
            Grade::B
        } else if score >= self.c {
            Grade::C
        } else if score >= self.d {
            Grade::D
        } else {
            Grade::F
        }
    }

    /// Thresholds must be strictly descending from A+ to D
    pub fn is_consistent(&self) -> bool {
        self.a_plus > self.a && self.a > self.b && self.b > self.c && self.c > self.d && self.d >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_ties_favor_higher_grade() {
        let thresholds = GradeThresholds::default();
        assert_eq!(thresholds.grade_for(95.0), Grade::APlus);
        assert_eq!(thresholds.grade_for(85.0), Grade::A);
        assert_eq!(thresholds.grade_for(70.0), Grade::B);
        assert_eq!(thresholds.grade_for(55.0), Grade::C);
        assert_eq!(thresholds.grade_for(40.0), Grade::D);
        assert_eq!(thresholds.grade_for(39.9), Grade::F);
        assert_eq!(thresholds.grade_for(0.0), Grade::F);
        assert_eq!(thresholds.grade_for(100.0), Grade::APlus);
    }

    #[test]
    fn test_default_thresholds_consistent() {
        assert!(GradeThresholds::default().is_consistent());

        let inverted = GradeThresholds {
            b: 90.0,
            ..GradeThresholds::default()
        };
        assert!(!inverted.is_consistent());
    }
}
