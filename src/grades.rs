// Grade records and everything computed from them: the periods on offer,
// per-subject weighted averages and the ranking shown at the end.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Label of the synthetic row holding the overall average.
pub const OVERALL_LABEL: &str = "MOYENNE GENERALE";

/// What an undefined average is displayed as.
pub const UNDEFINED_DISPLAY: &str = "NaN";

/// One grade as returned by EcoleDirecte. Scores and coefficients keep
/// their French formatting (`"17,5"`).
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct GradeRecord {
    #[serde(rename = "libelleMatiere")]
    pub subject_label: String,
    #[serde(rename = "codePeriode")]
    pub period_code: String,
    #[serde(rename = "valeur")]
    pub score_achieved: String,
    #[serde(rename = "noteSur")]
    pub score_max: String,
    #[serde(rename = "coef")]
    pub coefficient: String,
    /// Set for annotations such as "Abs" that are not scores.
    #[serde(rename = "enLettre", default)]
    pub is_non_numeric: bool,
}

/// Average of one subject over the selected period.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectAverage {
    pub subject: String,
    /// `None` when the subject has no weight in the period or a score out
    /// of zero.
    pub average: Option<f64>,
    pub display: String,
}

impl SubjectAverage {
    /// The value shown to the user, read back from its display string.
    pub fn displayed_value(&self) -> Option<f64> {
        self.average
            .and_then(|_| self.display.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }
}

/// A row of the final table.
#[derive(tabled::Tabled, Debug, Clone, PartialEq)]
pub struct AverageRow {
    #[tabled(rename = "Matière")]
    pub label: String,
    #[tabled(rename = "Moyenne")]
    pub value: String,
}

/// Averages of every subject of a period, plus the overall average.
#[derive(Debug, Clone, PartialEq)]
pub struct AverageReport {
    /// Subjects in the order they were first met.
    pub subjects: Vec<SubjectAverage>,
    pub overall: Option<f64>,
    pub precision: usize,
}

impl AverageReport {
    pub fn overall_display(&self) -> String {
        format_average(self.overall, self.precision)
    }

    /// Subjects from best to worst by displayed value, followed by the
    /// overall average row. Undefined averages come last.
    pub fn ranked(&self) -> Vec<AverageRow> {
        let mut subjects: Vec<&SubjectAverage> = self.subjects.iter().collect();
        subjects.sort_by(|a, b| match (a.displayed_value(), b.displayed_value()) {
            (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        subjects
            .into_iter()
            .map(|s| AverageRow {
                label: s.subject.clone(),
                value: s.display.clone(),
            })
            .chain(std::iter::once(AverageRow {
                label: OVERALL_LABEL.to_string(),
                value: self.overall_display(),
            }))
            .collect()
    }
}

/// Distinct period codes, in the order they first appear.
pub fn available_periods(records: &[GradeRecord]) -> Vec<String> {
    let mut periods: Vec<String> = Vec::new();
    for record in records {
        if !periods.contains(&record.period_code) {
            periods.push(record.period_code.clone());
        }
    }
    periods
}

/// Parse a decimal written with a comma separator (`"17,5"`).
pub fn parse_locale_decimal(text: &str) -> Result<f64> {
    let normalized = text.trim().replacen(',', ".", 1);
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::InvalidNumber(text.to_string())),
    }
}

fn format_average(average: Option<f64>, precision: usize) -> String {
    match average {
        Some(value) => format!("{value:.precision$}"),
        None => UNDEFINED_DISPLAY.to_string(),
    }
}

/// Weighted sums of one subject.
#[derive(Default)]
struct Accumulator {
    weighted: f64,
    weights: f64,
}

/// Compute per-subject and overall averages of `period`, scaled to `over`
/// and displayed with `precision` decimals.
///
/// Every record of the period gives its subject an entry, but only numeric
/// records are summed. A subject whose average is not finite (weights
/// summing to zero, a max score of zero) has no average, and it leaves the
/// overall average undefined as well.
pub fn compute_averages(
    records: &[GradeRecord],
    period: &str,
    over: f64,
    precision: usize,
) -> Result<AverageReport> {
    let mut groups: Vec<(String, Accumulator)> = Vec::new();

    for record in records.iter().filter(|r| r.period_code == period) {
        let index = match groups.iter().position(|(s, _)| *s == record.subject_label) {
            Some(index) => index,
            None => {
                groups.push((record.subject_label.clone(), Accumulator::default()));
                groups.len() - 1
            }
        };
        if record.is_non_numeric {
            continue;
        }

        let value = parse_locale_decimal(&record.score_achieved)?
            / parse_locale_decimal(&record.score_max)?;
        let weight = parse_locale_decimal(&record.coefficient)?;
        let acc = &mut groups[index].1;
        acc.weighted += value * weight;
        acc.weights += weight;
    }

    let mut subjects = Vec::with_capacity(groups.len());
    let mut total = Some(0.0);
    for (subject, acc) in groups {
        // A zero weight sum or a zero max score leaves the average undefined.
        let average = Some(acc.weighted / acc.weights * over).filter(|a| a.is_finite());
        if average.is_none() {
            tracing::warn!(%subject, "average of this subject is undefined");
        }
        total = total.zip(average).map(|(t, a)| t + a);
        subjects.push(SubjectAverage {
            display: format_average(average, precision),
            subject,
            average,
        });
    }

    let overall = if subjects.is_empty() {
        None
    } else {
        total.map(|t| t / subjects.len() as f64)
    };

    Ok(AverageReport {
        subjects,
        overall,
        precision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str, period: &str, value: &str, max: &str, coef: &str) -> GradeRecord {
        GradeRecord {
            subject_label: subject.to_string(),
            period_code: period.to_string(),
            score_achieved: value.to_string(),
            score_max: max.to_string(),
            coefficient: coef.to_string(),
            is_non_numeric: false,
        }
    }

    fn annotation(subject: &str, period: &str) -> GradeRecord {
        GradeRecord {
            is_non_numeric: true,
            ..record(subject, period, "Abs", "20", "1")
        }
    }

    #[test]
    fn periods_are_distinct_in_first_seen_order() {
        let records: Vec<GradeRecord> = ["A", "A", "B", "C", "B"]
            .iter()
            .map(|p| record("Math", p, "10", "20", "1"))
            .collect();
        assert_eq!(available_periods(&records), vec!["A", "B", "C"]);
        assert!(available_periods(&[]).is_empty());
    }

    #[test]
    fn locale_decimals_use_comma() {
        assert_eq!(parse_locale_decimal("17,5").unwrap(), 17.5);
        assert_eq!(parse_locale_decimal("20").unwrap(), 20.0);
        assert_eq!(parse_locale_decimal(" 0,85 ").unwrap(), 0.85);
        assert_eq!(parse_locale_decimal("3.25").unwrap(), 3.25);
        assert!(matches!(
            parse_locale_decimal("Abs"),
            Err(Error::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_locale_decimal(""),
            Err(Error::InvalidNumber(_))
        ));
        assert!(parse_locale_decimal("NaN").is_err());
        assert!(parse_locale_decimal("inf").is_err());
        assert!(parse_locale_decimal("-infinity").is_err());
    }

    #[test]
    fn weighted_average_scaled_to_over() {
        let records = vec![
            record("Math", "A001", "17", "20", "2"),
            record("Math", "A001", "9", "10", "1"),
        ];
        let report = compute_averages(&records, "A001", 20.0, 2).unwrap();
        assert_eq!(report.subjects.len(), 1);
        let math = &report.subjects[0];
        let expected = (0.85 * 2.0 + 0.90 * 1.0) / 3.0 * 20.0;
        assert!((math.average.unwrap() - expected).abs() < 1e-9);
        assert_eq!(math.display, "17.33");
        assert_eq!(report.overall_display(), "17.33");
    }

    #[test]
    fn other_periods_are_ignored() {
        let records = vec![
            record("Math", "A001", "10", "20", "1"),
            record("Math", "A002", "20", "20", "1"),
            record("Physique", "A002", "5", "20", "1"),
        ];
        let report = compute_averages(&records, "A001", 20.0, 1).unwrap();
        assert_eq!(report.subjects.len(), 1);
        assert_eq!(report.subjects[0].display, "10.0");
    }

    #[test]
    fn annotations_are_not_parsed_but_keep_their_subject() {
        let records = vec![
            record("Math", "A001", "12", "20", "1"),
            annotation("Math", "A001"),
        ];
        let report = compute_averages(&records, "A001", 20.0, 2).unwrap();
        assert_eq!(report.subjects[0].display, "12.00");
    }

    #[test]
    fn annotation_only_subject_is_undefined_and_poisons_overall() {
        let records = vec![
            record("Math", "A001", "12", "20", "1"),
            annotation("EPS", "A001"),
        ];
        let report = compute_averages(&records, "A001", 20.0, 2).unwrap();
        assert_eq!(report.subjects.len(), 2);

        let eps = &report.subjects[1];
        assert_eq!(eps.subject, "EPS");
        assert_eq!(eps.average, None);
        assert_eq!(eps.display, UNDEFINED_DISPLAY);
        assert_ne!(eps.display, "0.00");

        assert_eq!(report.overall, None);
        assert_eq!(report.overall_display(), UNDEFINED_DISPLAY);
    }

    #[test]
    fn overall_is_unweighted_mean_of_unrounded_averages() {
        let records = vec![
            record("Math", "A001", "1", "3", "1"),
            record("Histoire", "A001", "1", "3", "1"),
            record("Anglais", "A001", "16", "20", "5"),
        ];
        let report = compute_averages(&records, "A001", 20.0, 2).unwrap();
        assert_eq!(report.subjects[0].display, "6.67");
        let expected = (20.0 / 3.0 + 20.0 / 3.0 + 16.0) / 3.0;
        assert!((report.overall.unwrap() - expected).abs() < 1e-9);
        assert_eq!(report.overall_display(), "9.78");
    }

    #[test]
    fn zero_max_score_is_undefined_and_ranked_last() {
        let records = vec![
            record("A", "A001", "15", "20", "1"),
            record("Z", "A001", "0", "0", "1"),
            record("B", "A001", "18", "20", "1"),
            record("Y", "A001", "12", "0", "1"),
        ];
        let report = compute_averages(&records, "A001", 20.0, 2).unwrap();
        assert_eq!(report.subjects[1].average, None);
        assert_eq!(report.subjects[3].average, None);
        assert_eq!(report.overall, None);

        let rows = report.ranked();
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "A", "Z", "Y", OVERALL_LABEL]);
        assert_eq!(rows[2].value, UNDEFINED_DISPLAY);
    }

    #[test]
    fn empty_period_has_undefined_overall() {
        let report = compute_averages(&[], "A001", 20.0, 2).unwrap();
        assert!(report.subjects.is_empty());
        assert_eq!(report.overall, None);
    }

    #[test]
    fn bad_numbers_are_errors() {
        let records = vec![record("Math", "A001", "", "20", "1")];
        assert!(matches!(
            compute_averages(&records, "A001", 20.0, 2),
            Err(Error::InvalidNumber(_))
        ));
    }

    #[test]
    fn same_inputs_same_report() {
        let records = vec![
            record("Math", "A001", "13,5", "20", "1,5"),
            record("SVT", "A001", "8", "10", "1"),
            annotation("SVT", "A001"),
        ];
        let first = compute_averages(&records, "A001", 10.0, 3).unwrap();
        let second = compute_averages(&records, "A001", 10.0, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.ranked(), second.ranked());
    }

    #[test]
    fn ranked_sorts_descending_then_overall() {
        let report = AverageReport {
            subjects: vec![
                SubjectAverage {
                    subject: "A".into(),
                    average: Some(15.0),
                    display: "15.00".into(),
                },
                SubjectAverage {
                    subject: "B".into(),
                    average: Some(18.5),
                    display: "18.50".into(),
                },
                SubjectAverage {
                    subject: "C".into(),
                    average: Some(12.0),
                    display: "12.00".into(),
                },
            ],
            overall: Some(15.166666),
            precision: 2,
        };
        let labels: Vec<String> = report.ranked().into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["B", "A", "C", OVERALL_LABEL]);
        assert_eq!(report.ranked().last().unwrap().value, "15.17");
    }

    #[test]
    fn ranked_uses_displayed_value_and_keeps_ties_stable() {
        // 12.004 and 12.001 both display as 12.00, so first-seen order wins.
        let report = AverageReport {
            subjects: vec![
                SubjectAverage {
                    subject: "Undefined".into(),
                    average: None,
                    display: UNDEFINED_DISPLAY.into(),
                },
                SubjectAverage {
                    subject: "Low".into(),
                    average: Some(12.001),
                    display: "12.00".into(),
                },
                SubjectAverage {
                    subject: "High".into(),
                    average: Some(12.004),
                    display: "12.00".into(),
                },
            ],
            overall: None,
            precision: 2,
        };
        let labels: Vec<String> = report.ranked().into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["Low", "High", "Undefined", OVERALL_LABEL]);
    }
}
