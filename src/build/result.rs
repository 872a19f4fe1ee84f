//! Build result types.
//!
//! Contains types for representing the outcome of build operations.

use std::path::PathBuf;
use std::time::Duration;

/// Status of a single build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Build succeeded
    Success,
    /// Build failed with error
    Failed(String),
}

impl BuildStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildStatus::Failed(_))
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "success"),
            BuildStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of building a single target (one stylesheet or one image).
#[derive(Debug, Clone)]
pub struct TargetResult {
    /// Target ID that was built
    pub target_id: String,
    /// Build status
    pub status: BuildStatus,
    /// Output files produced
    pub outputs: Vec<PathBuf>,
    /// Build duration
    pub duration: Duration,
}

impl TargetResult {
    /// Create a successful result.
    pub fn success(target_id: String, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { target_id, status: BuildStatus::Success, outputs, duration }
    }

    /// Create a failed result.
    pub fn failed(target_id: String, error: String, duration: Duration) -> Self {
        Self { target_id, status: BuildStatus::Failed(error), outputs: vec![], duration }
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete build run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each target
    pub targets: Vec<TargetResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target result.
    pub fn add_result(&mut self, result: TargetResult) {
        self.targets.push(result);
    }

    /// Append every target of another result.
    pub fn extend(&mut self, other: BuildResult) {
        self.targets.extend(other.targets);
        self.total_duration += other.total_duration;
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Get the number of successful targets.
    pub fn success_count(&self) -> usize {
        self.targets.iter().filter(|r| matches!(r.status, BuildStatus::Success)).count()
    }

    /// Get the number of failed targets.
    pub fn failed_count(&self) -> usize {
        self.targets.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the overall build succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Generate a summary string.
    pub fn summary(&self) -> String {
        let total = self.targets.len();
        let failed = self.failed_count();

        if failed > 0 {
            format!(
                "Build failed: {} succeeded, {} failed ({} total) in {}",
                self.success_count(),
                failed,
                total,
                format_duration(self.total_duration)
            )
        } else {
            format!(
                "Build succeeded: {} targets in {}",
                total,
                format_duration(self.total_duration)
            )
        }
    }
}

/// Format a duration for display
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_status_is_success() {
        assert!(BuildStatus::Success.is_success());
        assert!(!BuildStatus::Failed("error".to_string()).is_success());
    }

    #[test]
    fn test_build_status_display() {
        assert_eq!(format!("{}", BuildStatus::Success), "success");
        assert_eq!(format!("{}", BuildStatus::Failed("oops".to_string())), "failed: oops");
    }

    #[test]
    fn test_target_result_success() {
        let result = TargetResult::success(
            "style:main.less".to_string(),
            vec![PathBuf::from("css/main.css")],
            Duration::from_millis(12),
        );
        assert!(result.is_success());
        assert_eq!(result.outputs.len(), 1);
    }

    #[test]
    fn test_build_result_counts() {
        let mut result = BuildResult::new();
        result.add_result(TargetResult::success("a".to_string(), vec![], Duration::ZERO));
        result.add_result(TargetResult::failed("c".to_string(), "bad".to_string(), Duration::ZERO));

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failed_count(), 1);
        assert!(!result.is_success());
    }

    #[test]
    fn test_build_result_extend() {
        let mut first = BuildResult::new().with_duration(Duration::from_millis(10));
        first.add_result(TargetResult::success("a".to_string(), vec![], Duration::ZERO));
        let mut second = BuildResult::new().with_duration(Duration::from_millis(5));
        second.add_result(TargetResult::success("b".to_string(), vec![], Duration::ZERO));

        first.extend(second);
        assert_eq!(first.targets.len(), 2);
        assert_eq!(first.total_duration, Duration::from_millis(15));
    }

    #[test]
    fn test_build_result_summary() {
        let mut result = BuildResult::new().with_duration(Duration::from_millis(250));
        result.add_result(TargetResult::success("a".to_string(), vec![], Duration::ZERO));
        assert_eq!(result.summary(), "Build succeeded: 1 targets in 250ms");

        result.add_result(TargetResult::failed("b".to_string(), "x".to_string(), Duration::ZERO));
        assert!(result.summary().starts_with("Build failed: 1 succeeded, 1 failed"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
