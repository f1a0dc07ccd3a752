//! Built-in rule set and weight tables.

use super::{ClassificationRule, WeightTable};
use crate::issue::Category;

/// Standard classification rules shipped with the engine.
pub(super) fn standard_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new("builtin-security", "Security issue", Category::Security)
            .title_keywords(&[
                "security",
                "vulnerability",
                "cve",
                "exploit",
                "xss",
                "csrf",
                "injection",
            ])
            .body_keywords(&["security", "vulnerability", "attacker", "exploit"])
            .labels(&["security", "vulnerability"])
            .title_patterns(&[r"/\bcve-\d{4}-\d+\b/i"]),
        ClassificationRule::new("builtin-bug", "Bug report", Category::Bug)
            .title_keywords(&["bug", "crash", "error", "broken", "fail", "panic"])
            .body_keywords(&["steps to reproduce", "stack trace", "exception", "regression"])
            .labels(&["bug", "defect"])
            .body_patterns(&[r"/expected\s+(behaviou?r|result)/i"])
            .exclude_keywords(&["feature request"]),
        ClassificationRule::new("builtin-performance", "Performance", Category::Performance)
            .title_keywords(&["slow", "performance", "latency", "memory leak", "timeout"])
            .body_keywords(&["benchmark", "cpu", "memory usage", "profil"])
            .labels(&["performance", "perf"]),
        ClassificationRule::new("builtin-feature", "Feature request", Category::Feature)
            .title_keywords(&["feature", "add support", "request", "proposal"])
            .body_keywords(&["would be nice", "it would be great", "use case"])
            .labels(&["feature", "feature-request"])
            .title_patterns(&[r"^\s*\[?feat(ure)?\]?[:\s]"]),
        ClassificationRule::new("builtin-enhancement", "Enhancement", Category::Enhancement)
            .title_keywords(&["improve", "enhance", "better", "allow"])
            .labels(&["enhancement", "improvement"]),
        ClassificationRule::new("builtin-documentation", "Documentation", Category::Documentation)
            .title_keywords(&["docs", "documentation", "readme", "typo"])
            .body_keywords(&["documentation", "docs"])
            .labels(&["documentation", "docs"]),
        ClassificationRule::new("builtin-question", "Question", Category::Question)
            .title_keywords(&["how to", "how do", "question", "why does"])
            .labels(&["question"])
            .title_patterns(&[r"\?\s*$"])
            .with_weight(0.8),
        ClassificationRule::new("builtin-test", "Testing", Category::Test)
            .title_keywords(&["flaky", "coverage"])
            .title_patterns(&[r"\btests?\b"])
            .labels(&["test"]),
        ClassificationRule::new("builtin-ci-cd", "CI/CD", Category::CiCd)
            .title_keywords(&["pipeline", "workflow", "build fails", "release"])
            .title_patterns(&[r"\bci\b"])
            .labels(&["ci/cd", "ci-cd", "github-actions", "build"]),
        ClassificationRule::new("builtin-dependencies", "Dependencies", Category::Dependencies)
            .title_keywords(&["bump", "upgrade", "dependency", "dependencies"])
            .labels(&["dependencies", "deps"]),
        ClassificationRule::new("builtin-refactor", "Refactoring", Category::Refactor)
            .title_keywords(&["refactor", "cleanup", "clean up", "tech debt"])
            .labels(&["refactor", "tech-debt"]),
        ClassificationRule::new("builtin-duplicate", "Duplicate", Category::Duplicate)
            .body_keywords(&["duplicate of"])
            .labels(&["duplicate"]),
        ClassificationRule::new("builtin-good-first-issue", "Good first issue", Category::GoodFirstIssue)
            .labels(&["good first issue", "good-first-issue", "beginner"]),
        ClassificationRule::new("builtin-help-wanted", "Help wanted", Category::HelpWanted)
            .labels(&["help wanted", "help-wanted"]),
    ]
}

pub(super) fn category_weights() -> WeightTable {
    WeightTable::new()
        .with("security", 1.0)
        .with("bug", 0.9)
        .with("performance", 0.8)
        .with("feature", 0.7)
        .with("enhancement", 0.6)
        .with("dependencies", 0.5)
        .with("ci-cd", 0.5)
        .with("refactor", 0.45)
        .with("test", 0.4)
        .with("documentation", 0.4)
        .with("help-wanted", 0.4)
        .with("good-first-issue", 0.4)
        .with("question", 0.3)
        .with("duplicate", 0.1)
        .with("invalid", 0.1)
        .with("wontfix", 0.05)
}

pub(super) fn priority_weights() -> WeightTable {
    WeightTable::new()
        .with("critical", 1.0)
        .with("high", 0.8)
        .with("medium", 0.5)
        .with("low", 0.3)
        .with("backlog", 0.1)
}
