use crate::error::JobError;
use std::time::Duration;

/// Part of the source that ends up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Duration,
    pub end: Duration,
    /// The source fits into the limit, so nothing is cut off.
    pub whole_source: bool,
}

impl TimeWindow {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// The output always starts at the beginning of the source and lasts at
/// most `max_duration`.
pub fn plan(source_secs: f64, max_duration: Duration) -> Result<TimeWindow, JobError> {
    if !source_secs.is_finite() || source_secs <= 0.0 {
        return Err(JobError::InvalidDuration(source_secs));
    }

    let source = Duration::try_from_secs_f64(source_secs)
        .map_err(|_| JobError::InvalidDuration(source_secs))?;

    Ok(TimeWindow {
        start: Duration::ZERO,
        end: source.min(max_duration),
        whole_source: source <= max_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{expect, Expect};

    fn assert_plan(source_secs: f64, expected: Expect) {
        let actual = plan(source_secs, Duration::from_secs(3))
            .map(|window| format!("{window:?}"))
            .unwrap_or_else(|err| err.to_string());

        expected.assert_eq(&actual);
    }

    #[test]
    fn smoke_plan() {
        assert_plan(
            5.0,
            expect!["TimeWindow { start: 0ns, end: 3s, whole_source: false }"],
        );
        assert_plan(
            3.0,
            expect!["TimeWindow { start: 0ns, end: 3s, whole_source: true }"],
        );
        assert_plan(
            1.5,
            expect!["TimeWindow { start: 0ns, end: 1.5s, whole_source: true }"],
        );
    }

    #[test]
    fn invalid_duration() {
        assert_plan(0.0, expect!["invalid source duration: 0s"]);
        assert_plan(-1.0, expect!["invalid source duration: -1s"]);
        assert_plan(f64::NAN, expect!["invalid source duration: NaNs"]);
        assert_plan(
            1e20,
            expect!["invalid source duration: 100000000000000000000s"],
        );
    }
}
