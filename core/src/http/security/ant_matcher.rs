//! Ant-style path matching for request rules.
//!
//! # Pattern Syntax
//!
//! - `?` matches exactly one character
//! - `*` matches zero or more characters within a path segment
//! - `**` matches zero or more path segments
//! - `{name}` matches one segment and captures it
//!
//! Empty segments are ignored on both sides, so `/api/v1/admin/` and
//! `//api/v1/admin` are governed by a rule written for `/api/v1/admin`.
//!
//! # Examples
//!
//! ```rust
//! use parking_security_core::http::security::ant_matcher::AntMatcher;
//!
//! let matcher = AntMatcher::new("/login/**");
//! assert!(matcher.matches("/login"));
//! assert!(matcher.matches("/login/oauth2/code/naver"));
//! assert!(!matcher.matches("/loginProc"));
//! ```
//!
//! # Spring Equivalent
//!
//! `org.springframework.util.AntPathMatcher`

use std::collections::HashMap;

/// A compiled Ant-style pattern.
#[derive(Debug, Clone)]
pub struct AntMatcher {
    pattern: String,
    segments: Vec<PatternSegment>,
}

#[derive(Debug, Clone, PartialEq)]
enum PatternSegment {
    Literal(String),
    /// `*`
    AnySegment,
    /// `**`
    AnyPath,
    /// A segment containing `*` or `?`
    Glob(Vec<char>),
    /// `{name}`
    Variable(String),
}

impl AntMatcher {
    pub fn new(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|part| match part {
                "**" => PatternSegment::AnyPath,
                "*" => PatternSegment::AnySegment,
                p if p.len() > 2 && p.starts_with('{') && p.ends_with('}') => {
                    PatternSegment::Variable(p[1..p.len() - 1].to_string())
                }
                p if p.contains(['*', '?']) => PatternSegment::Glob(p.chars().collect()),
                p => PatternSegment::Literal(p.to_string()),
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// The pattern as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = split_path(path).collect();
        match_segments(&self.segments, &path, &mut None)
    }

    /// Matches `path` and returns the captured `{name}` segments.
    ///
    /// ```rust
    /// use parking_security_core::http::security::ant_matcher::AntMatcher;
    ///
    /// let matcher = AntMatcher::new("/oauth2/authorization/{registrationId}");
    /// let vars = matcher.extract_variables("/oauth2/authorization/kakao").unwrap();
    /// assert_eq!(vars["registrationId"], "kakao");
    /// ```
    pub fn extract_variables(&self, path: &str) -> Option<HashMap<String, String>> {
        let path: Vec<&str> = split_path(path).collect();
        let mut variables = HashMap::new();
        if match_segments(&self.segments, &path, &mut Some(&mut variables)) {
            Some(variables)
        } else {
            None
        }
    }
}

/// An ordered set of patterns; matches when any member matches.
#[derive(Debug, Clone, Default)]
pub struct AntMatchers {
    matchers: Vec<AntMatcher>,
}

impl AntMatchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            matchers: patterns.iter().map(|p| AntMatcher::new(p.as_ref())).collect(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, pattern: &str) -> Self {
        self.matchers.push(AntMatcher::new(pattern));
        self
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }

    /// First member matching `path`.
    pub fn find_match(&self, path: &str) -> Option<&AntMatcher> {
        self.matchers.iter().find(|m| m.matches(path))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.matchers.iter().map(AntMatcher::pattern)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_segments(
    pattern: &[PatternSegment],
    path: &[&str],
    variables: &mut Option<&mut HashMap<String, String>>,
) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((PatternSegment::AnyPath, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..], variables))
        }
        Some((segment, rest)) => match path.split_first() {
            None => false,
            Some((head, tail)) => {
                match_segment(segment, head, variables) && match_segments(rest, tail, variables)
            }
        },
    }
}

fn match_segment(
    segment: &PatternSegment,
    text: &str,
    variables: &mut Option<&mut HashMap<String, String>>,
) -> bool {
    match segment {
        PatternSegment::Literal(literal) => literal == text,
        PatternSegment::AnySegment => true,
        PatternSegment::AnyPath => true,
        PatternSegment::Glob(glob) => {
            let text: Vec<char> = text.chars().collect();
            match_glob(glob, &text)
        }
        PatternSegment::Variable(name) => {
            if let Some(vars) = variables {
                vars.insert(name.clone(), text.to_string());
            }
            true
        }
    }
}

fn match_glob(glob: &[char], text: &[char]) -> bool {
    match glob.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => (0..=text.len()).any(|skip| match_glob(rest, &text[skip..])),
        Some(('?', rest)) => !text.is_empty() && match_glob(rest, &text[1..]),
        Some((c, rest)) => text.first() == Some(c) && match_glob(rest, &text[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let matcher = AntMatcher::new("/api/v1/join");
        assert!(matcher.matches("/api/v1/join"));
        assert!(!matcher.matches("/api/v1/joins"));
        assert!(!matcher.matches("/api/v1/join/extra"));
    }

    #[test]
    fn test_empty_segments_are_normalized() {
        let matcher = AntMatcher::new("/api/v1/admin");
        assert!(matcher.matches("/api/v1/admin/"));
        assert!(matcher.matches("//api//v1/admin"));
    }

    #[test]
    fn test_double_wildcard_matches_zero_segments() {
        let matcher = AntMatcher::new("/api/v1/my/**");
        assert!(matcher.matches("/api/v1/my"));
        assert!(matcher.matches("/api/v1/my/profile"));
        assert!(matcher.matches("/api/v1/my/cars/12/history"));
        assert!(!matcher.matches("/api/v1/mypage"));
        assert!(!matcher.matches("/api/v1/admin"));
    }

    #[test]
    fn test_double_wildcard_middle() {
        let matcher = AntMatcher::new("/api/**/edit");
        assert!(matcher.matches("/api/edit"));
        assert!(matcher.matches("/api/lots/3/edit"));
        assert!(!matcher.matches("/api/lots/3"));
    }

    #[test]
    fn test_single_wildcard() {
        let matcher = AntMatcher::new("/lots/*/spaces");
        assert!(matcher.matches("/lots/7/spaces"));
        assert!(!matcher.matches("/lots/spaces"));
        assert!(!matcher.matches("/lots/7/8/spaces"));
    }

    #[test]
    fn test_glob_segment() {
        let matcher = AntMatcher::new("/static/*.css");
        assert!(matcher.matches("/static/login.css"));
        assert!(!matcher.matches("/static/login.js"));

        let matcher = AntMatcher::new("/v?/status");
        assert!(matcher.matches("/v1/status"));
        assert!(!matcher.matches("/v10/status"));
    }

    #[test]
    fn test_root_pattern() {
        let matcher = AntMatcher::new("/");
        assert!(matcher.matches("/"));
        assert!(!matcher.matches("/login"));

        assert!(AntMatcher::new("/**").matches("/"));
        assert!(AntMatcher::new("/**").matches("/anything/at/all"));
    }

    #[test]
    fn test_variable_extraction() {
        let matcher = AntMatcher::new("/login/oauth2/code/{registrationId}");
        let vars = matcher
            .extract_variables("/login/oauth2/code/naver")
            .expect("pattern should match");
        assert_eq!(vars.get("registrationId"), Some(&"naver".to_string()));

        assert!(matcher.extract_variables("/login/oauth2/code").is_none());
    }

    #[test]
    fn test_ant_matchers_set() {
        let matchers = AntMatchers::from_patterns(&["/login/**", "/oauth2/**", "/confirm"]);

        assert!(matchers.matches("/login"));
        assert!(matchers.matches("/oauth2/authorization/google"));
        assert!(matchers.matches("/confirm"));
        assert!(!matchers.matches("/api/v1/my"));
        assert_eq!(matchers.find_match("/oauth2/x").map(|m| m.pattern()), Some("/oauth2/**"));
        assert_eq!(matchers.len(), 3);
    }
}
