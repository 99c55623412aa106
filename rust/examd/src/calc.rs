use crate::model::{ResultRecord, Student, Subject};
use serde::Serialize;

/// Overall percentage a student must reach, on top of passing every subject.
pub const PASSING_PERCENTAGE: f64 = 50.0;

pub fn percentage(value: f64, max: f64) -> f64 {
    if max == 0.0 {
        return 0.0;
    }
    value / max * 100.0
}

/// Passing threshold used when a subject has no explicit minimum.
pub fn default_min_grade(max_grade: f64) -> f64 {
    (max_grade * 0.5).floor()
}

pub fn effective_min_grade(subject: &Subject) -> f64 {
    subject
        .min_grade
        .unwrap_or_else(|| default_min_grade(subject.max_grade))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GradeBand {
    Excellent,
    VeryGood,
    Good,
    Acceptable,
    Pass,
    Fail,
}

impl GradeBand {
    pub fn from_percentage(p: f64) -> Self {
        if p >= 90.0 {
            GradeBand::Excellent
        } else if p >= 80.0 {
            GradeBand::VeryGood
        } else if p >= 70.0 {
            GradeBand::Good
        } else if p >= 60.0 {
            GradeBand::Acceptable
        } else if p >= PASSING_PERCENTAGE {
            GradeBand::Pass
        } else {
            GradeBand::Fail
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GradeBand::Excellent => "ممتاز",
            GradeBand::VeryGood => "جيد جداً",
            GradeBand::Good => "جيد",
            GradeBand::Acceptable => "مقبول",
            GradeBand::Pass => "ناجح",
            GradeBand::Fail => "راسب",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectLine {
    pub subject: Subject,
    pub grade: f64,
    pub percentage: f64,
    pub min_grade: f64,
    pub failed: bool,
    pub band: GradeBand,
    pub band_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResult {
    pub student: Student,
    pub results: Vec<SubjectLine>,
    pub total_grade: f64,
    pub max_total_grade: f64,
    pub percentage: f64,
    pub has_failed_subject: bool,
    pub passed: bool,
    pub band: GradeBand,
    pub band_label: &'static str,
}

/// Score a student against the subjects of their section.
///
/// A subject without a recorded grade scores 0. Grades recorded against
/// subjects outside the student's section are ignored. The verdict needs all
/// three of: no manual fail, no subject under its minimum, and an overall
/// percentage of at least [`PASSING_PERCENTAGE`].
pub fn evaluate(student: &Student, subjects: &[Subject], results: &[ResultRecord]) -> StudentResult {
    let mut lines = Vec::with_capacity(subjects.len());
    let mut has_failed_subject = false;

    for subject in subjects
        .iter()
        .filter(|s| s.section_id == student.section_id)
    {
        let grade = results
            .iter()
            .find(|r| r.subject_id == subject.id)
            .map(|r| r.grade)
            .unwrap_or(0.0);

        let min_grade = effective_min_grade(subject);
        let failed = grade < min_grade;
        if failed {
            has_failed_subject = true;
        }

        let p = percentage(grade, subject.max_grade);
        let band = GradeBand::from_percentage(p);
        lines.push(SubjectLine {
            subject: subject.clone(),
            grade,
            percentage: p,
            min_grade,
            failed,
            band,
            band_label: band.label(),
        });
    }

    let total_grade: f64 = lines.iter().map(|l| l.grade).sum();
    let max_total_grade: f64 = lines.iter().map(|l| l.subject.max_grade).sum();
    let overall = percentage(total_grade, max_total_grade);

    let passed = !student.manual_fail && !has_failed_subject && overall >= PASSING_PERCENTAGE;
    let band = GradeBand::from_percentage(overall);

    StudentResult {
        student: student.clone(),
        results: lines,
        total_grade,
        max_total_grade,
        percentage: overall,
        has_failed_subject,
        passed,
        band,
        band_label: band.label(),
    }
}

/// Pass/fail tally over evaluated students, as shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub evaluated_students: usize,
    pub passed_students: usize,
    pub failed_students: usize,
    pub average_score: f64,
}

/// Students whose section carries no marks (max total 0) are left out of
/// every figure, including the average.
pub fn tally<'a>(evaluated: impl IntoIterator<Item = &'a StudentResult>) -> Tally {
    let mut out = Tally::default();
    let mut percentage_sum = 0.0;
    for r in evaluated {
        if r.max_total_grade <= 0.0 {
            continue;
        }
        out.evaluated_students += 1;
        percentage_sum += r.percentage;
        if r.passed {
            out.passed_students += 1;
        } else {
            out.failed_students += 1;
        }
    }
    if out.evaluated_students > 0 {
        out.average_score = percentage_sum / out.evaluated_students as f64;
    }
    out
}
