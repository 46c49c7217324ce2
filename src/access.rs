//! Capability checks for gallery actions.
//!
//! Every feature asks the same question before acting: is there a session, and
//! is it allowed to do this? Actions that merely need a signed-in actor trigger
//! sign-in and are aborted; the action is not replayed afterwards.

use anyhow::Result;

use crate::routes::Route;
use crate::session::{SessionController, SignInOutcome};

/// An action a consumer wants to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ViewGallery,
    ViewImage,
    Share,
    LikeImage,
    Bookmark,
    Download,
    PostComment,
    LikeComment,
    ReportComment,
    /// Carries the email of the comment's author
    DeleteComment(String),
    AdminDashboard,
    ManageImages,
    ModerateComments,
    UploadImages,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::ViewGallery => "view_gallery",
            Action::ViewImage => "view_image",
            Action::Share => "share",
            Action::LikeImage => "like_image",
            Action::Bookmark => "bookmark",
            Action::Download => "download",
            Action::PostComment => "post_comment",
            Action::LikeComment => "like_comment",
            Action::ReportComment => "report_comment",
            Action::DeleteComment(_) => "delete_comment",
            Action::AdminDashboard => "admin_dashboard",
            Action::ManageImages => "manage_images",
            Action::ModerateComments => "moderate_comments",
            Action::UploadImages => "upload_images",
        }
    }

    pub fn requirement(&self) -> Requirement {
        match self {
            Action::ViewGallery | Action::ViewImage | Action::Share => Requirement::Public,
            Action::LikeImage
            | Action::Bookmark
            | Action::Download
            | Action::PostComment
            | Action::LikeComment
            | Action::ReportComment => Requirement::SignedIn,
            Action::DeleteComment(_) => Requirement::OwnerOrAdmin,
            Action::AdminDashboard
            | Action::ManageImages
            | Action::ModerateComments
            | Action::UploadImages => Requirement::Admin,
        }
    }
}

/// What an action demands of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Public,
    SignedIn,
    OwnerOrAdmin,
    Admin,
}

/// Capability decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Anonymous actor on a sign-in gated action
    SignInRequired,
    Deny,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::SignInRequired => "sign_in_required",
            Decision::Deny => "deny",
        }
    }
}

/// Pure capability check, no side effects
pub fn decide(session: &SessionController, action: &Action) -> Decision {
    match action.requirement() {
        Requirement::Public => Decision::Allow,
        Requirement::SignedIn => {
            if session.is_signed_in() {
                Decision::Allow
            } else {
                Decision::SignInRequired
            }
        }
        Requirement::OwnerOrAdmin => {
            let Action::DeleteComment(author_email) = action else {
                return Decision::Deny;
            };
            match session.user() {
                Some(user) if session.is_admin() || user.email == *author_email => {
                    Decision::Allow
                }
                _ => Decision::Deny,
            }
        }
        Requirement::Admin => {
            if session.is_admin() {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }
    }
}

/// Outcome of running the gating protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Proceed with the action
    Proceed,
    /// Sign-in was triggered and the action dropped
    Aborted(SignInOutcome),
    Denied,
}

/// Check the action; on `SignInRequired` invoke sign-in and abort.
pub fn gate(session: &mut SessionController, action: &Action) -> Gate {
    match decide(session, action) {
        Decision::Allow => Gate::Proceed,
        Decision::SignInRequired => Gate::Aborted(session.sign_in()),
        Decision::Deny => Gate::Denied,
    }
}

/// Result of a gated operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Blocked(Gate),
}

#[cfg(test)]
impl<T> Outcome<T> {
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Blocked(_) => None,
        }
    }
}

/// Run `op` only if the gate lets the action through
pub fn run_gated<T>(
    session: &mut SessionController,
    action: &Action,
    op: impl FnOnce(&SessionController) -> Result<T>,
) -> Result<Outcome<T>> {
    match gate(session, action) {
        Gate::Proceed => Ok(Outcome::Done(op(session)?)),
        blocked => Ok(Outcome::Blocked(blocked)),
    }
}

/// Rendering decision for a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteGuard {
    Render,
    /// Session not restored yet; render nothing to avoid flashing signed-out UI
    Loading,
    /// Anonymous on an admin route: show the sign-in prompt instead
    SignInRequired,
    /// Signed in without the role: redirect
    Denied { redirect: Route },
}

/// Guard for route rendering. Only `/admin` is protected.
pub fn guard_route(session: &SessionController, route: &Route) -> RouteGuard {
    if !matches!(route, Route::Admin) {
        return RouteGuard::Render;
    }
    if session.loading() {
        return RouteGuard::Loading;
    }
    if !session.is_signed_in() {
        return RouteGuard::SignInRequired;
    }
    if session.is_admin() {
        RouteGuard::Render
    } else {
        RouteGuard::Denied {
            redirect: Route::Home,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{admin_user, anonymous, demo_user, signed_in_as, ADMIN};
    use crate::session::{DemoIdentityProvider, MemoryStore};

    #[test]
    fn test_requirements() {
        assert_eq!(Action::ViewGallery.requirement(), Requirement::Public);
        assert_eq!(Action::Share.requirement(), Requirement::Public);
        assert_eq!(Action::LikeImage.requirement(), Requirement::SignedIn);
        assert_eq!(Action::Download.requirement(), Requirement::SignedIn);
        assert_eq!(
            Action::DeleteComment("a@b.c".to_string()).requirement(),
            Requirement::OwnerOrAdmin
        );
        assert_eq!(Action::UploadImages.requirement(), Requirement::Admin);
    }

    #[test]
    fn test_anonymous_decisions() {
        let session = anonymous();
        assert_eq!(decide(&session, &Action::ViewImage), Decision::Allow);
        assert_eq!(
            decide(&session, &Action::PostComment),
            Decision::SignInRequired
        );
        assert_eq!(
            decide(&session, &Action::DeleteComment("demo@example.com".into())),
            Decision::Deny
        );
        assert_eq!(decide(&session, &Action::AdminDashboard), Decision::Deny);
    }

    #[test]
    fn test_signed_in_decisions() {
        let session = signed_in_as(demo_user());
        assert_eq!(decide(&session, &Action::Bookmark), Decision::Allow);
        assert_eq!(
            decide(&session, &Action::DeleteComment("demo@example.com".into())),
            Decision::Allow
        );
        assert_eq!(
            decide(&session, &Action::DeleteComment("john@example.com".into())),
            Decision::Deny
        );
        assert_eq!(decide(&session, &Action::ModerateComments), Decision::Deny);
    }

    #[test]
    fn test_admin_decisions() {
        let session = signed_in_as(admin_user());
        assert_eq!(decide(&session, &Action::ManageImages), Decision::Allow);
        assert_eq!(
            decide(&session, &Action::DeleteComment("john@example.com".into())),
            Decision::Allow
        );
    }

    #[test]
    fn test_gate_signs_in_and_aborts() {
        let mut session = anonymous();
        let gate_result = gate(&mut session, &Action::LikeImage);
        assert_eq!(gate_result, Gate::Aborted(SignInOutcome::SignedIn));
        assert!(session.is_signed_in());

        // The retry goes through
        assert_eq!(gate(&mut session, &Action::LikeImage), Gate::Proceed);
    }

    #[test]
    fn test_gate_denied_does_not_sign_in() {
        let mut session = anonymous();
        assert_eq!(gate(&mut session, &Action::AdminDashboard), Gate::Denied);
        assert!(!session.is_signed_in());
    }

    #[test]
    fn test_run_gated_skips_op_when_blocked() {
        let mut session = anonymous();
        let mut ran = false;
        let outcome = run_gated(&mut session, &Action::Download, |_| {
            ran = true;
            Ok(1)
        })
        .unwrap();
        assert!(!ran);
        assert!(matches!(outcome, Outcome::Blocked(Gate::Aborted(_))));

        let outcome = run_gated(&mut session, &Action::Download, |s| {
            Ok(s.user().map(|u| u.email.clone()))
        })
        .unwrap();
        assert_eq!(
            outcome.done(),
            Some(Some("demo@example.com".to_string()))
        );
    }

    #[test]
    fn test_admin_route_guard() {
        let loading = SessionController::new(
            Box::new(MemoryStore::new()),
            Box::new(DemoIdentityProvider::new(demo_user())),
            ADMIN,
        );
        assert_eq!(guard_route(&loading, &Route::Admin), RouteGuard::Loading);

        assert_eq!(
            guard_route(&anonymous(), &Route::Admin),
            RouteGuard::SignInRequired
        );
        assert_eq!(
            guard_route(&signed_in_as(demo_user()), &Route::Admin),
            RouteGuard::Denied {
                redirect: Route::Home
            }
        );
        assert_eq!(
            guard_route(&signed_in_as(admin_user()), &Route::Admin),
            RouteGuard::Render
        );
    }

    #[test]
    fn test_public_routes_always_render() {
        let session = anonymous();
        assert_eq!(guard_route(&session, &Route::Home), RouteGuard::Render);
        assert_eq!(
            guard_route(&session, &Route::Image("img-1".to_string())),
            RouteGuard::Render
        );
    }
}
