//! Administrator dashboard.
//!
//! Every operation here is admin-only. The dashboard itself is reached through
//! the `/admin` route guard; individual operations re-check the capability so
//! a stale tab cannot act after the session changes.

pub mod images;
pub mod moderation;
pub mod stats;
pub mod upload;

use std::fmt;

use crate::access::{guard_route, RouteGuard};
use crate::routes::Route;
use crate::session::SessionController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Overview,
    Images,
    Upload,
    Comments,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Overview,
        Tab::Images,
        Tab::Upload,
        Tab::Comments,
        Tab::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Images => "images",
            Tab::Upload => "upload",
            Tab::Comments => "comments",
            Tab::Settings => "settings",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dashboard view state, only meaningful once the guard renders
#[derive(Debug, Default)]
pub struct Dashboard {
    pub tab: Tab,
    pub image_search: String,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the `/admin` guard; only `Render` opens the dashboard
    pub fn open(&mut self, session: &SessionController) -> RouteGuard {
        let guard = guard_route(session, &Route::Admin);
        if guard == RouteGuard::Render {
            self.tab = Tab::Overview;
        }
        guard
    }
}
