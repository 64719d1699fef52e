//! PHQ-9 and GAD-7 self-assessment scoring.
//!
//! # Invariants
//! - Every answer is on the 0..=3 frequency scale.
//! - Severity buckets follow the published cut-offs for each questionnaire.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_ANSWER: u8 = 3;
/// Zero-based index of the PHQ-9 self-harm item.
const PHQ9_SELF_HARM_ITEM: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Questionnaire {
    /// Depression screening, nine items.
    Phq9,
    /// Anxiety screening, seven items.
    Gad7,
}

impl Questionnaire {
    pub fn item_count(self) -> usize {
        match self {
            Self::Phq9 => 9,
            Self::Gad7 => 7,
        }
    }

    pub fn max_score(self) -> u8 {
        // Item counts are small constants, the cast cannot truncate.
        self.item_count() as u8 * MAX_ANSWER
    }

    fn severity(self, total: u8) -> Severity {
        match (self, total) {
            (_, 0..=4) => Severity::Minimal,
            (_, 5..=9) => Severity::Mild,
            (_, 10..=14) => Severity::Moderate,
            (Self::Phq9, 15..=19) => Severity::ModeratelySevere,
            _ => Severity::Severe,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minimal,
    Mild,
    Moderate,
    /// PHQ-9 only.
    ModeratelySevere,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub questionnaire: Questionnaire,
    pub total: u8,
    pub severity: Severity,
    /// Set when the PHQ-9 self-harm item is answered above zero.
    pub self_harm_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssessmentError {
    WrongAnswerCount { expected: usize, actual: usize },
    AnswerOutOfRange { index: usize, value: u8 },
}

impl Display for AssessmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongAnswerCount { expected, actual } => {
                write!(f, "expected {expected} answers, got {actual}")
            }
            Self::AnswerOutOfRange { index, value } => write!(
                f,
                "answer {value} at item {index} is outside 0..={MAX_ANSWER}"
            ),
        }
    }
}

impl Error for AssessmentError {}

/// Scores a completed questionnaire.
pub fn score(
    questionnaire: Questionnaire,
    answers: &[u8],
) -> Result<AssessmentResult, AssessmentError> {
    if answers.len() != questionnaire.item_count() {
        return Err(AssessmentError::WrongAnswerCount {
            expected: questionnaire.item_count(),
            actual: answers.len(),
        });
    }
    if let Some((index, &value)) = answers
        .iter()
        .enumerate()
        .find(|&(_, &value)| value > MAX_ANSWER)
    {
        return Err(AssessmentError::AnswerOutOfRange { index, value });
    }

    let total = answers.iter().sum::<u8>();
    let self_harm_flag = matches!(questionnaire, Questionnaire::Phq9)
        && answers[PHQ9_SELF_HARM_ITEM] > 0;

    Ok(AssessmentResult {
        questionnaire,
        total,
        severity: questionnaire.severity(total),
        self_harm_flag,
    })
}

#[cfg(test)]
mod tests {
    use super::{score, AssessmentError, Questionnaire, Severity};

    #[test]
    fn phq9_buckets_follow_cutoffs() {
        let cases = [
            (0, Severity::Minimal),
            (4, Severity::Minimal),
            (5, Severity::Mild),
            (10, Severity::Moderate),
            (15, Severity::ModeratelySevere),
            (20, Severity::Severe),
            (27, Severity::Severe),
        ];
        for (total, expected) in cases {
            assert_eq!(Questionnaire::Phq9.severity(total), expected, "total {total}");
        }
    }

    #[test]
    fn gad7_has_no_moderately_severe_bucket() {
        let result = score(Questionnaire::Gad7, &[3, 3, 3, 3, 3, 0, 0]).unwrap();
        assert_eq!(result.total, 15);
        assert_eq!(result.severity, Severity::Severe);
        assert!(!result.self_harm_flag);
    }

    #[test]
    fn phq9_flags_self_harm_item() {
        let result = score(Questionnaire::Phq9, &[0, 0, 0, 0, 0, 0, 0, 0, 1]).unwrap();
        assert_eq!(result.severity, Severity::Minimal);
        assert!(result.self_harm_flag);
    }

    #[test]
    fn rejects_wrong_count_and_out_of_range_answers() {
        assert_eq!(
            score(Questionnaire::Gad7, &[0; 6]).unwrap_err(),
            AssessmentError::WrongAnswerCount {
                expected: 7,
                actual: 6
            }
        );
        assert_eq!(
            score(Questionnaire::Gad7, &[0, 0, 4, 0, 0, 0, 0]).unwrap_err(),
            AssessmentError::AnswerOutOfRange { index: 2, value: 4 }
        );
    }

    #[test]
    fn max_scores() {
        assert_eq!(Questionnaire::Phq9.max_score(), 27);
        assert_eq!(Questionnaire::Gad7.max_score(), 21);
    }
}
