//! Route parsing for the client's navigable paths.

use std::fmt;

/// A navigable location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`: hero, filter bar and gallery grid
    Home,
    /// `/image/{id}`: detail view and comments
    Image(String),
    /// `/admin`: administrator dashboard
    Admin,
    NotFound(String),
}

impl Route {
    /// Parse a path. Query strings, fragments and trailing slashes are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.trim();
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');

        if trimmed.is_empty() {
            return Route::Home;
        }

        let Some(rest) = trimmed.strip_prefix('/') else {
            return Route::NotFound(path.to_string());
        };

        let segments: Vec<&str> = rest.split('/').collect();
        match segments.as_slice() {
            ["admin"] => Route::Admin,
            ["image", id] if !id.is_empty() => Route::Image((*id).to_string()),
            _ => Route::NotFound(path.to_string()),
        }
    }

    /// Absolute link for sharing
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => write!(f, "/"),
            Route::Image(id) => write!(f, "/image/{}", id),
            Route::Admin => write!(f, "/admin"),
            Route::NotFound(path) => write!(f, "{}", path),
        }
    }
}
