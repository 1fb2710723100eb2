//! Static route table for the dashboard shell.

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const TOPICS_PATH: &str = "/topics";
pub const BRIEFS_PATH: &str = "/briefs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    About,
    Login,
    Dashboard,
    Topics,
    DailyBriefs,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::About => "Perception",
            View::Login => "Sign In",
            View::Dashboard => "Dashboard",
            View::Topics => "Topics",
            View::DailyBriefs => "Daily Briefs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub view: View,
    /// Wrapped by the session gate
    pub protected: bool,
}

pub const ROUTES: [Route; 5] = [
    Route { path: HOME_PATH, view: View::About, protected: false },
    Route { path: LOGIN_PATH, view: View::Login, protected: false },
    Route { path: DASHBOARD_PATH, view: View::Dashboard, protected: true },
    Route { path: TOPICS_PATH, view: View::Topics, protected: true },
    Route { path: BRIEFS_PATH, view: View::DailyBriefs, protected: true },
];

/// Links shown in the navigation bar, in order
pub const NAV_LINKS: [(&str, &str); 3] = [
    ("Dashboard", DASHBOARD_PATH),
    ("Topics", TOPICS_PATH),
    ("Daily Briefs", BRIEFS_PATH),
];

/// Exact-match lookup; no prefixes or parameters
pub fn resolve(path: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|r| r.path == path)
}

/// The navigation bar is hidden on the landing page and the login page.
pub fn shows_navigation(path: &str) -> bool {
    path != HOME_PATH && path != LOGIN_PATH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_routes_are_protected() {
        let protected: Vec<_> = ROUTES
            .iter()
            .filter(|r| r.protected)
            .map(|r| r.path)
            .collect();
        assert_eq!(protected, vec!["/dashboard", "/topics", "/briefs"]);
    }

    #[test]
    fn resolve_is_exact() {
        assert_eq!(resolve("/briefs").map(|r| r.view), Some(View::DailyBriefs));
        assert_eq!(resolve("/").map(|r| r.view), Some(View::About));
        assert!(resolve("/briefs/").is_none());
        assert!(resolve("/settings").is_none());
    }

    #[test]
    fn navigation_hidden_on_home_and_login_only() {
        assert!(!shows_navigation("/"));
        assert!(!shows_navigation("/login"));
        assert!(shows_navigation("/dashboard"));
        assert!(shows_navigation("/topics"));
        assert!(shows_navigation("/briefs"));
    }
}
