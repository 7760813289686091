// ── Component ↔ data source bindings ──

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// When a bound data source is refreshed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum RefreshPolicy {
    /// Only when something (a rule's `refetch`, the host) asks for it.
    #[default]
    Manual,
    /// Whenever the page containing the component is entered.
    OnEnterPage,
    /// Every `secs` seconds while the context is running.
    Interval { secs: u64 },
}

impl RefreshPolicy {
    pub fn interval(&self) -> Option<Duration> {
        match self {
            Self::Interval { secs } if *secs > 0 => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// Association between a UI component path and a named data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Component path, e.g. `home.news`. Also the path of the
    /// `onLoadSuccess` / `onLoadError` events this binding emits.
    pub component: String,
    /// Registered data source id.
    pub source: String,
    #[serde(default)]
    pub refresh: RefreshPolicy,
}

impl Binding {
    pub fn new(component: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            source: source.into(),
            refresh: RefreshPolicy::Manual,
        }
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    /// Whether entering `page` should refresh this binding.
    ///
    /// A page with no path enters every on-enter-page binding; otherwise the
    /// component path must equal the page path or continue it past a `.`
    /// or `/` separator (`home` enters `home.news`, not `homepage.news`).
    pub fn refreshes_on_enter(&self, page: Option<&str>) -> bool {
        self.refresh == RefreshPolicy::OnEnterPage
            && page.is_none_or(|page| within_page(&self.component, page))
    }

    /// StateStore key under which this binding publishes `suffix`.
    pub fn state_key(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.component)
    }
}

fn within_page(component: &str, page: &str) -> bool {
    component
        .strip_prefix(page)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['.', '/']))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_never_ticks() {
        assert_eq!(RefreshPolicy::Interval { secs: 0 }.interval(), None);
        assert_eq!(
            RefreshPolicy::Interval { secs: 5 }.interval(),
            Some(Duration::from_secs(5))
        );
        assert_eq!(RefreshPolicy::Manual.interval(), None);
    }

    #[test]
    fn enter_page_matches_component_prefix() {
        let binding =
            Binding::new("home.news", "news").with_refresh(RefreshPolicy::OnEnterPage);
        assert!(binding.refreshes_on_enter(None));
        assert!(binding.refreshes_on_enter(Some("home")));
        assert!(binding.refreshes_on_enter(Some("home.news")));
        assert!(!binding.refreshes_on_enter(Some("settings")));
        assert!(!binding.refreshes_on_enter(Some("home.ne")));

        let lookalike =
            Binding::new("homepage.news", "news").with_refresh(RefreshPolicy::OnEnterPage);
        assert!(!lookalike.refreshes_on_enter(Some("home")));

        let slashed = Binding::new("home/feed", "news").with_refresh(RefreshPolicy::OnEnterPage);
        assert!(slashed.refreshes_on_enter(Some("home")));

        let manual = Binding::new("home.news", "news");
        assert!(!manual.refreshes_on_enter(Some("home")));
    }

    #[test]
    fn deserializes_refresh_policy() {
        let binding: Binding = serde_json::from_str(
            r#"{"component": "feed", "source": "news", "refresh": {"policy": "interval", "secs": 30}}"#,
        )
        .unwrap();
        assert_eq!(binding.refresh, RefreshPolicy::Interval { secs: 30 });

        let default: Binding =
            serde_json::from_str(r#"{"component": "feed", "source": "news"}"#).unwrap();
        assert_eq!(default.refresh, RefreshPolicy::Manual);
    }
}
