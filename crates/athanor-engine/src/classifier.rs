//! Keyword classification of raw request text
//!
//! The first phase needs a rough reading of the request: what kind of
//! content, for whom, in what tone, around what theme. Classification is
//! driven by keyword tables so new categories are a data change, not a
//! code change. A swappable NLP classifier can replace this behind the
//! same function signature if the tables stop being enough.

/// One keyword rule: if the lowercased input contains `keyword`, the
/// category applies. First match wins, so more specific keywords belong
/// earlier in the table.
struct Rule {
    keyword: &'static str,
    category: &'static str,
}

const TYPE_RULES: &[Rule] = &[
    Rule { keyword: "email", category: "email content" },
    Rule { keyword: "code", category: "code snippets" },
    Rule { keyword: "article", category: "article content" },
    Rule { keyword: "documentation", category: "technical documentation" },
    Rule { keyword: "story", category: "creative writing" },
];
const TYPE_DEFAULT: &str = "content";

const AUDIENCE_RULES: &[Rule] = &[
    Rule { keyword: "developer", category: "developers" },
    Rule { keyword: "engineer", category: "developers" },
    Rule { keyword: "business", category: "business professionals" },
    Rule { keyword: "student", category: "students" },
];
const AUDIENCE_DEFAULT: &str = "general audience";

const TONE_RULES: &[Rule] = &[
    Rule { keyword: "formal", category: "formal tone" },
    Rule { keyword: "casual", category: "casual tone" },
    Rule { keyword: "friendly", category: "friendly tone" },
];
const TONE_DEFAULT: &str = "professional tone";

/// Number of leading words used as the theme summary.
const THEME_WORDS: usize = 5;

/// Categories extracted from a raw request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub content_type: String,
    pub audience: String,
    pub tone: String,
    pub theme: String,
}

fn apply_rules(input_lower: &str, rules: &[Rule], default: &str) -> String {
    rules
        .iter()
        .find(|rule| input_lower.contains(rule.keyword))
        .map_or(default, |rule| rule.category)
        .to_string()
}

/// Classify a raw request by keyword lookup.
#[must_use]
pub fn classify(input: &str) -> Classification {
    let lower = input.to_lowercase();

    let words: Vec<&str> = input.split_whitespace().collect();
    let theme = if words.len() > THEME_WORDS {
        format!("{}...", words[..THEME_WORDS].join(" "))
    } else {
        input.to_string()
    };

    Classification {
        content_type: apply_rules(&lower, TYPE_RULES, TYPE_DEFAULT),
        audience: apply_rules(&lower, AUDIENCE_RULES, AUDIENCE_DEFAULT),
        tone: apply_rules(&lower, TONE_RULES, TONE_DEFAULT),
        theme,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_email_for_business() {
        let result = classify("Write a formal email to business partners");
        assert_eq!(result.content_type, "email content");
        assert_eq!(result.audience, "business professionals");
        assert_eq!(result.tone, "formal tone");
    }

    #[test]
    fn defaults_apply_without_keywords() {
        let result = classify("something vague");
        assert_eq!(result.content_type, "content");
        assert_eq!(result.audience, "general audience");
        assert_eq!(result.tone, "professional tone");
        assert_eq!(result.theme, "something vague");
    }

    #[test]
    fn theme_truncates_long_input() {
        let result = classify("one two three four five six seven");
        assert_eq!(result.theme, "one two three four five...");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let result = classify("CODE review helper for DEVELOPERS");
        assert_eq!(result.content_type, "code snippets");
        assert_eq!(result.audience, "developers");
    }
}
