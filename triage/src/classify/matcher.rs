//! Rule matcher
//!
//! Scores one rule against one issue. The score is additive over matched
//! clauses, scaled by the rule weight, and clamped to [0, 1]. An exclude
//! keyword short-circuits to zero before anything else is looked at.

use super::pattern::compile_pattern;
use super::CategoryClassification;
use crate::config::{ClassificationRule, Configuration};
use crate::error::PatternError;
use crate::issue::{Category, Issue};
use regex::Regex;
use std::time::{Duration, Instant};
use tracing::warn;

pub const TITLE_KEYWORD_SCORE: f64 = 0.3;
pub const BODY_KEYWORD_SCORE: f64 = 0.2;
pub const LABEL_SCORE: f64 = 0.4;
pub const TITLE_PATTERN_SCORE: f64 = 0.25;
pub const BODY_PATTERN_SCORE: f64 = 0.2;

/// Keyword with a pre-lowered copy for case-insensitive matching.
#[derive(Debug, Clone)]
struct Keyword {
    raw: String,
    lower: String,
}

impl Keyword {
    fn from_list(items: &[String]) -> Vec<Self> {
        items
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Self {
                raw: s.clone(),
                lower: s.to_lowercase(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    raw: String,
    regex: Regex,
}

/// A rule with keywords lowered and patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub weight: f64,
    title_keywords: Vec<Keyword>,
    body_keywords: Vec<Keyword>,
    labels: Vec<Keyword>,
    exclude_keywords: Vec<Keyword>,
    title_patterns: Vec<CompiledPattern>,
    body_patterns: Vec<CompiledPattern>,
}

impl CompiledRule {
    /// Compile a rule. Patterns that fail to compile are dropped and returned
    /// alongside the rule.
    pub fn compile(rule: &ClassificationRule) -> (Self, Vec<PatternError>) {
        let mut errors = Vec::new();
        let mut compile_all = |patterns: &[String]| -> Vec<CompiledPattern> {
            patterns
                .iter()
                .filter_map(|raw| match compile_pattern(raw) {
                    Ok(regex) => Some(CompiledPattern {
                        raw: raw.clone(),
                        regex,
                    }),
                    Err(e) => {
                        warn!(rule = %rule.id, pattern = %raw, error = %e, "Skipping invalid rule pattern");
                        errors.push(e);
                        None
                    }
                })
                .collect()
        };
        let title_patterns = compile_all(&rule.conditions.title_patterns);
        let body_patterns = compile_all(&rule.conditions.body_patterns);

        let compiled = Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            category: rule.category,
            weight: rule.weight,
            title_keywords: Keyword::from_list(&rule.conditions.title_keywords),
            body_keywords: Keyword::from_list(&rule.conditions.body_keywords),
            labels: Keyword::from_list(&rule.conditions.labels),
            exclude_keywords: Keyword::from_list(&rule.conditions.exclude_keywords),
            title_patterns,
            body_patterns,
        };
        (compiled, errors)
    }

    /// Number of patterns that survived compilation
    pub fn pattern_count(&self) -> usize {
        self.title_patterns.len() + self.body_patterns.len()
    }
}

/// The enabled rules of a configuration, compiled once.
///
/// Standard rules come first, then custom rules, each in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    disabled: usize,
    pattern_errors: Vec<PatternError>,
}

impl RuleSet {
    pub fn compile(config: &Configuration) -> Self {
        let mut set = Self::default();
        for rule in config.all_rules() {
            if !rule.enabled {
                set.disabled += 1;
                continue;
            }
            let (compiled, errors) = CompiledRule::compile(rule);
            set.rules.push(compiled);
            set.pattern_errors.extend(errors);
        }
        set
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules skipped because they are disabled
    pub fn disabled_count(&self) -> usize {
        self.disabled
    }

    /// Patterns rejected at compile time
    pub fn pattern_errors(&self) -> &[PatternError] {
        &self.pattern_errors
    }
}

/// Issue text prepared once for evaluation against many rules.
#[derive(Debug, Clone)]
pub struct MatchInput<'a> {
    title: &'a str,
    body: &'a str,
    title_lower: String,
    body_lower: String,
    labels_lower: Vec<String>,
}

impl<'a> MatchInput<'a> {
    pub fn new(issue: &'a Issue) -> Self {
        let body = issue.body_text();
        Self {
            title: &issue.title,
            body,
            title_lower: issue.title.to_lowercase(),
            body_lower: body.to_lowercase(),
            labels_lower: issue.labels_lower(),
        }
    }
}

/// Evaluates compiled rules against prepared issue text.
#[derive(Debug, Clone, Default)]
pub struct RuleMatcher {
    /// Wall-clock budget per rule; `None` = unlimited
    budget: Option<Duration>,
}

impl RuleMatcher {
    /// `budget_ms == 0` disables the per-rule budget.
    pub fn new(budget_ms: u64) -> Self {
        Self {
            budget: (budget_ms > 0).then(|| Duration::from_millis(budget_ms)),
        }
    }

    /// Score one rule against one issue.
    pub fn evaluate(&self, rule: &CompiledRule, input: &MatchInput<'_>) -> CategoryClassification {
        self.evaluate_since(rule, input, Instant::now())
    }

    /// Score one rule with the budget measured from `started`.
    fn evaluate_since(
        &self,
        rule: &CompiledRule,
        input: &MatchInput<'_>,
        started: Instant,
    ) -> CategoryClassification {
        let mut result = CategoryClassification {
            category: rule.category,
            confidence: 0.0,
            reasons: Vec::new(),
            keywords: Vec::new(),
            rule_id: Some(rule.id.clone()),
            rule_name: Some(rule.name.clone()),
        };

        if let Some(kw) = rule
            .exclude_keywords
            .iter()
            .find(|kw| input.title_lower.contains(&kw.lower) || input.body_lower.contains(&kw.lower))
        {
            result
                .reasons
                .push(format!("Excluded by keyword: \"{}\"", kw.raw));
            return result;
        }

        let mut raw = 0.0;

        for kw in &rule.title_keywords {
            if input.title_lower.contains(&kw.lower) {
                raw += TITLE_KEYWORD_SCORE;
                result
                    .reasons
                    .push(format!("Title contains keyword: \"{}\"", kw.raw));
                push_unique(&mut result.keywords, &kw.raw);
            }
        }

        for kw in &rule.body_keywords {
            if input.body_lower.contains(&kw.lower) {
                raw += BODY_KEYWORD_SCORE;
                result
                    .reasons
                    .push(format!("Body contains keyword: \"{}\"", kw.raw));
                push_unique(&mut result.keywords, &kw.raw);
            }
        }

        for label in &rule.labels {
            if input.labels_lower.iter().any(|l| l.contains(&label.lower)) {
                raw += LABEL_SCORE;
                result
                    .reasons
                    .push(format!("Has matching label: \"{}\"", label.raw));
            }
        }

        let pattern_clauses = rule
            .title_patterns
            .iter()
            .map(|p| (p, input.title, TITLE_PATTERN_SCORE, "Title"))
            .chain(
                rule.body_patterns
                    .iter()
                    .map(|p| (p, input.body, BODY_PATTERN_SCORE, "Body")),
            );

        for (pattern, text, score, field) in pattern_clauses {
            if self.over_budget(started) {
                warn!(
                    rule = %rule.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Rule exceeded evaluation budget, skipping remaining patterns"
                );
                break;
            }
            if pattern.regex.is_match(text) {
                raw += score;
                result
                    .reasons
                    .push(format!("{} matches pattern: {}", field, pattern.raw));
            }
        }

        result.confidence = (raw * rule.weight).clamp(0.0, 1.0);
        result
    }

    fn over_budget(&self, started: Instant) -> bool {
        self.budget
            .map(|budget| started.elapsed() >= budget)
            .unwrap_or(false)
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
