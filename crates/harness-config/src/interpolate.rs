//! Single-pass `${key}` placeholder substitution

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern must compile"));

/// Replace every `${key}` whose key is in `context`
///
/// Substituted text is not rescanned, and unknown keys are left as written.
///
/// # Examples
/// ```
/// use harness_config::interpolate;
/// use indexmap::IndexMap;
///
/// let mut context = IndexMap::new();
/// context.insert("basedir".to_owned(), "/work".to_owned());
/// assert_eq!(interpolate("${basedir}/target ${other}", &context), "/work/target ${other}");
/// ```
#[must_use]
pub fn interpolate<'a>(text: &'a str, context: &IndexMap<String, String>) -> Cow<'a, str> {
    if context.is_empty() {
        return Cow::Borrowed(text);
    }
    PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
        context
            .get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn substitutes_known_keys() {
        let ctx = context(&[("basedir", "/b"), ("name", "n")]);
        assert_eq!(interpolate("${basedir}/${name}", &ctx), "/b/n");
    }

    #[test]
    fn unknown_keys_pass_through() {
        let ctx = context(&[("basedir", "/b")]);
        assert_eq!(interpolate("${project.build.directory}", &ctx), "${project.build.directory}");
    }

    #[test]
    fn not_recursive() {
        let ctx = context(&[("a", "${b}"), ("b", "x")]);
        assert_eq!(interpolate("${a}", &ctx), "${b}");
    }

    #[test]
    fn empty_context_borrows() {
        assert!(matches!(interpolate("${a}", &IndexMap::new()), Cow::Borrowed(_)));
    }
}
