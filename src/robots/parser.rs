//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate (Google's
//! matcher). Crawl-delay is not part of that matcher, so it is read here.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Upper bound applied to any Crawl-delay a server announces
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Parsed robots.txt data
///
/// This is a wrapper around the robotstxt crate's matcher, providing a
/// simplified interface for checking if paths are allowed.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content
    content: String,
    /// Set when robots.txt was unavailable; everything is allowed
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.trim_start_matches('\u{feff}').to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when robots.txt cannot be fetched or decoded.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Whether this policy came from a fetch failure rather than a file
    pub fn is_allow_all(&self) -> bool {
        self.allow_all
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks if a path is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `path` - The path (plus query) to check, e.g. `/page.html?id=1`
    /// * `user_agent` - The user agent token to match groups against
    ///
    /// # Returns
    ///
    /// * `true` - If the path is allowed
    /// * `false` - If the path is disallowed
    pub fn is_allowed(&self, path: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, path)
    }

    /// Gets the Crawl-delay of the group that applies to `user_agent`
    ///
    /// A group made for the agent wins over the `*` group. Consecutive
    /// User-agent lines share one group; any other directive closes the list
    /// of agents for that group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        if self.allow_all {
            return None;
        }

        let agent = user_agent.to_ascii_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut for_agent: Option<f64> = None;
        let mut for_wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !in_agent_lines {
                        group_agents.clear();
                        in_agent_lines = true;
                    }
                    group_agents.push(value.to_ascii_lowercase());
                }
                "crawl-delay" => {
                    in_agent_lines = false;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }
                    if agent != "*" && group_agents.iter().any(|ua| ua == &agent) {
                        for_agent.get_or_insert(delay);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        for_wildcard.get_or_insert(delay);
                    }
                }
                _ => in_agent_lines = false,
            }
        }

        for_agent
            .or(for_wildcard)
            .map(|secs| Duration::from_secs_f64(secs.min(MAX_CRAWL_DELAY.as_secs_f64())))
    }
}
