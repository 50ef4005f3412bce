//! Application route table.
//!
//! Patterns are `/`-separated; a segment starting with `:` matches any single
//! non-empty segment.

pub const BASE_TITLE: &str = "Marathon Hub";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub pattern: String,
    pub title: String,
    pub protected: bool,
}

impl Route {
    pub fn new<P: Into<String>, T: Into<String>>(pattern: P, title: T, protected: bool) -> Self {
        Self {
            pattern: pattern.into(),
            title: title.into(),
            protected,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut want = segments(&self.pattern);
        let mut got = segments(strip_query(path));
        loop {
            match (want.next(), got.next()) {
                (None, None) => return true,
                (Some(w), Some(g)) if w.starts_with(':') && !g.is_empty() => continue,
                (Some(w), Some(g)) if w == g => continue,
                _ => return false,
            }
        }
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The Marathon Hub routes: public landing and auth pages, everything else behind sign-in.
    pub fn marathon_hub() -> Self {
        Self::new(vec![
            Route::new("/", "Marathon Hub - Manage Your Marathon Events", false),
            Route::new("/login", "Login - Marathon Hub", false),
            Route::new("/register", "Register - Marathon Hub", false),
            Route::new("/marathons", "Browse Marathons - Marathon Hub", true),
            Route::new("/marathon/:id", "Marathon Details - Marathon Hub", true),
            Route::new("/add-marathon", "Create Marathon - Marathon Hub", true),
            Route::new("/my-marathons", "My Marathons - Marathon Hub", true),
            Route::new("/my-applications", "My Applications - Marathon Hub", true),
        ])
    }

    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(path))
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|r| r.protected)
    }

    pub fn document_title(&self, path: &str) -> &str {
        self.resolve(path).map(|r| r.title.as_str()).unwrap_or(BASE_TITLE)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
