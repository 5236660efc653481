use crate::steps::model::StepFilter;
use regex::Regex;
use std::sync::LazyLock;

static ATTEMPTS_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\(attempts:\s*\d+\s*/\s*\d+\)\s*$").expect("attempts suffix pattern")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("whitespace pattern"));

/// Known test-name fragments and the log keywords that belong to them. Tests
/// whose name matches none of these get no log steps.
const LEGACY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "create xtm project",
        &[
            "create xtm project",
            "creating project",
            "project name",
            "project created",
            "xtm project",
            "saved project name",
        ],
    ),
    (
        "create scheduler job",
        &[
            "create scheduler job",
            "scheduler",
            "scheduled job",
            "job created",
        ],
    ),
    (
        "search project relay",
        &[
            "search project relay",
            "searching for project",
            "project found",
            "relay search",
        ],
    ),
    (
        "search project",
        &["searching for project", "project found", "search results"],
    ),
    (
        "verify pulled project production status",
        &[
            "pulled project",
            "production status",
            "project status",
        ],
    ),
    (
        "ai task verification",
        &["ai task", "task verification", "verifying task"],
    ),
    (
        "project search and segment navigation",
        &[
            "searching for project",
            "segment",
            "navigating to segments",
        ],
    ),
    (
        "verify mt copy edit count",
        &["mt copy edit", "copy edit count", "quote mt"],
    ),
    (
        "apollo",
        &["apollo", "get /", "post /", "status:"],
    ),
];

/// Lowercases, drops a trailing `(Attempts: n/m)` annotation and collapses
/// underscores and whitespace runs to single spaces.
pub fn normalize_test_name(name: &str) -> String {
    let stripped = ATTEMPTS_SUFFIX.replace(name, "");
    WHITESPACE
        .replace_all(stripped.trim(), " ")
        .trim()
        .to_lowercase()
}

pub fn legacy_keywords(test_name: &str) -> Vec<&'static str> {
    let normalized = normalize_test_name(test_name);
    let mut keywords: Vec<&'static str> = vec![];
    LEGACY_KEYWORDS
        .iter()
        .filter(|(pattern, _)| normalized.contains(pattern))
        .flat_map(|(_, words)| words.iter().copied())
        .for_each(|word| {
            if !keywords.contains(&word) {
                keywords.push(word);
            }
        });
    keywords
}

impl StepFilter {
    /// Filter derived from the display name through the legacy table.
    pub fn for_test_name(test_name: &str) -> Self {
        StepFilter::from_keywords(legacy_keywords(test_name))
    }
}
