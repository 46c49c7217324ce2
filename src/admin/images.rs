use anyhow::{anyhow, Result};

use crate::access::{run_gated, Action, Outcome};
use crate::gallery::{Catalog, Image, ImageStatus};
use crate::notice::Notice;
use crate::session::SessionController;

/// A catalog change made from the images tab
#[derive(Debug, Clone, PartialEq)]
pub struct ImageChange {
    pub image: Image,
    pub notice: Notice,
}

/// Images whose title or category contains `term`, case-insensitive.
/// Drafts are included.
pub fn search<'a>(catalog: &'a Catalog, term: &str) -> Vec<&'a Image> {
    let term = term.trim().to_lowercase();
    catalog
        .all()
        .iter()
        .filter(|img| {
            term.is_empty()
                || img.title.to_lowercase().contains(&term)
                || img.category.as_str().to_lowercase().contains(&term)
        })
        .collect()
}

/// Flip an image between published and draft
pub fn toggle_status(
    session: &mut SessionController,
    catalog: &mut Catalog,
    image_id: &str,
) -> Result<Outcome<ImageChange>> {
    run_gated(session, &Action::ManageImages, |_| {
        let image = catalog
            .get_mut(image_id)
            .ok_or_else(|| anyhow!("Image not found: {}", image_id))?;
        image.status = image.status.toggled();
        Ok(ImageChange {
            image: image.clone(),
            notice: Notice::new("Status updated", "Image status has been changed"),
        })
    })
}

pub fn delete(
    session: &mut SessionController,
    catalog: &mut Catalog,
    image_id: &str,
) -> Result<Outcome<ImageChange>> {
    run_gated(session, &Action::ManageImages, |_| {
        let image = catalog
            .remove(image_id)
            .ok_or_else(|| anyhow!("Image not found: {}", image_id))?;
        Ok(ImageChange {
            image,
            notice: Notice::new("Image deleted", "The image has been removed from the gallery"),
        })
    })
}

/// Table status cell
pub fn status_label(status: ImageStatus) -> &'static str {
    match status {
        ImageStatus::Published => "Published",
        ImageStatus::Draft => "Draft",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Gate;
    use crate::gallery::Filter;
    use crate::session::tests::{admin_user, anonymous, demo_user, signed_in_as};
    use chrono::{TimeZone, Utc};

    fn catalog() -> Catalog {
        Catalog::seeded(Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_search_title_and_category() {
        let catalog = catalog();
        let by_title = search(&catalog, "mountain");
        assert!(by_title.iter().any(|img| img.id == "img-1"));
        let by_category = search(&catalog, "ARCHITECTURE");
        assert!(!by_category.is_empty());
        assert!(by_category
            .iter()
            .all(|img| img.category.as_str() == "Architecture"
                || img.title.to_lowercase().contains("architecture")));
        assert_eq!(search(&catalog, "  ").len(), 20);
    }

    #[test]
    fn test_toggle_status_hides_from_gallery() {
        let mut session = signed_in_as(admin_user());
        let mut catalog = catalog();
        let change = toggle_status(&mut session, &mut catalog, "img-1")
            .unwrap()
            .done()
            .unwrap();
        assert_eq!(change.image.status, ImageStatus::Draft);
        assert_eq!(change.notice.title, "Status updated");

        let filter = Filter::default();
        assert_eq!(catalog.visible(&filter).count(), 19);
        // Still listed for administrators
        assert_eq!(search(&catalog, "").len(), 20);

        toggle_status(&mut session, &mut catalog, "img-1").unwrap();
        assert_eq!(catalog.visible(&filter).count(), 20);
    }

    #[test]
    fn test_delete_image() {
        let mut session = signed_in_as(admin_user());
        let mut catalog = catalog();
        let change = delete(&mut session, &mut catalog, "img-2")
            .unwrap()
            .done()
            .unwrap();
        assert_eq!(change.image.id, "img-2");
        assert_eq!(change.notice.title, "Image deleted");
        assert!(catalog.get("img-2").is_none());
        assert!(delete(&mut session, &mut catalog, "img-2").is_err());
    }

    #[test]
    fn test_non_admin_denied() {
        let mut catalog = catalog();
        let mut session = signed_in_as(demo_user());
        let outcome = delete(&mut session, &mut catalog, "img-2").unwrap();
        assert_eq!(outcome, Outcome::Blocked(Gate::Denied));
        assert!(catalog.get("img-2").is_some());

        let mut session = anonymous();
        let outcome = toggle_status(&mut session, &mut catalog, "img-2").unwrap();
        assert_eq!(outcome, Outcome::Blocked(Gate::Denied));
        assert!(!session.is_signed_in());
    }
}
