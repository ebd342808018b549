//! Completion evaluation.
//!
//! A content item counts as completed iff its progress record has
//! `completed == true`. Percentages are rounded half-up to one decimal.

/// Round half-up to one decimal place (`floor(x * 10 + 0.5) / 10`).
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Fraction of a course's content a student completed, in `[0, 1]`.
///
/// Zero when the course has no content. Completed counts above the content
/// count (records for content since removed from the course) are capped so
/// the percentage never exceeds 100; callers still report the raw count.
pub fn completion_fraction(completed: u64, total_content: u64) -> f64 {
    if total_content == 0 {
        return 0.0;
    }
    completed.min(total_content) as f64 / total_content as f64
}

/// Completion percentage rounded to one decimal.
pub fn completion_percentage(completed: u64, total_content: u64) -> f64 {
    round_one_decimal(completion_fraction(completed, total_content) * 100.0)
}

/// One student's completion within a course.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentCompletion {
    pub user_id: String,
    pub completed_content: u64,
    pub percentage: f64,
}

impl StudentCompletion {
    pub fn new(user_id: impl Into<String>, completed_content: u64, total_content: u64) -> Self {
        Self {
            user_id: user_id.into(),
            completed_content,
            percentage: completion_percentage(completed_content, total_content),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percentage >= 100.0
    }
}

/// Share of students (in percent, one decimal) that completed every
/// content item. Zero for an empty roster.
pub fn course_completion_rate(students: &[StudentCompletion]) -> f64 {
    if students.is_empty() {
        return 0.0;
    }
    let done = students.iter().filter(|s| s.is_complete()).count();
    round_one_decimal(done as f64 / students.len() as f64 * 100.0)
}

/// Mean of `values` rounded to one decimal, zero when empty.
pub fn rounded_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0u64), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return 0.0;
    }
    round_one_decimal(sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_content_is_zero_percent() {
        assert_eq!(completion_fraction(0, 0), 0.0);
        assert_eq!(completion_percentage(3, 0), 0.0);
        assert!(!completion_percentage(0, 0).is_nan());
    }

    #[test]
    fn test_percentage_rounding() {
        // 1/3 = 33.333.. -> 33.3
        assert_eq!(completion_percentage(1, 3), 33.3);
        // 2/3 = 66.666.. -> 66.7
        assert_eq!(completion_percentage(2, 3), 66.7);
        assert_eq!(completion_percentage(4, 4), 100.0);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_one_decimal(0.25), 0.3);
        assert_eq!(round_one_decimal(12.34), 12.3);
        assert_eq!(round_one_decimal(0.0), 0.0);
    }

    #[test]
    fn test_completed_count_is_capped() {
        assert_eq!(completion_percentage(7, 5), 100.0);
    }

    #[test]
    fn test_course_completion_rate() {
        let roster = vec![
            StudentCompletion::new("a", 4, 4),
            StudentCompletion::new("b", 2, 4),
            StudentCompletion::new("c", 0, 4),
        ];
        assert_eq!(course_completion_rate(&roster), 33.3);
        assert_eq!(course_completion_rate(&[]), 0.0);
    }

    #[test]
    fn test_rounded_mean() {
        assert_eq!(rounded_mean([1.0, 2.0, 2.0]), 1.7);
        assert_eq!(rounded_mean(Vec::<f64>::new()), 0.0);
    }
}
