use regex::Regex;
use regex::RegexBuilder;
use tracing::debug;

/// Compiles a keyword or search fragment case-insensitively. A fragment that
/// is not a valid pattern is matched literally instead. Blank input yields
/// `None`.
pub fn compile_case_insensitive(fragment: &str) -> Option<Regex> {
    if fragment.is_empty() {
        return None;
    }
    match RegexBuilder::new(fragment).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(err) => {
            debug!(fragment, error = %err, "pattern invalid, matching literally");
            RegexBuilder::new(&regex::escape(fragment))
                .case_insensitive(true)
                .build()
                .ok()
        }
    }
}

/// Number of non-empty matches of `regex` in `text`.
pub fn count_matches(regex: &Regex, text: &str) -> usize {
    regex
        .find_iter(text)
        .filter(|found| !found.as_str().is_empty())
        .count()
}
