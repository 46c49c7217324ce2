//! Per-image interactions: likes, bookmarks, downloads and sharing.

use anyhow::Result;
use std::collections::HashSet;

use crate::access::{run_gated, Action, Outcome};
use crate::gallery::{Catalog, Quality};
use crate::notice::Notice;
use crate::routes::Route;
use crate::session::SessionController;

/// Like state after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub likes: u64,
}

/// A resolved download link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTicket {
    pub url: String,
    pub filename: String,
    pub notice: Notice,
}

/// What the current client has liked and bookmarked
#[derive(Debug, Default)]
pub struct Engagement {
    liked: HashSet<String>,
    bookmarked: HashSet<String>,
}

impl Engagement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_liked(&self, image_id: &str) -> bool {
        self.liked.contains(image_id)
    }

    pub fn is_bookmarked(&self, image_id: &str) -> bool {
        self.bookmarked.contains(image_id)
    }

    /// Like count as displayed, including this client's like
    pub fn like_count(&self, catalog: &Catalog, image_id: &str) -> u64 {
        match catalog.get(image_id) {
            Some(image) => image.likes,
            // Placeholder images are not in the catalog; the like is local only
            None => catalog.detail(image_id).likes + u64::from(self.is_liked(image_id)),
        }
    }

    /// Flip the like on an image (gated)
    pub fn toggle_like(
        &mut self,
        session: &mut SessionController,
        catalog: &mut Catalog,
        image_id: &str,
    ) -> Result<Outcome<LikeState>> {
        run_gated(session, &Action::LikeImage, |_| {
            let liked = if self.liked.remove(image_id) {
                false
            } else {
                self.liked.insert(image_id.to_string());
                true
            };
            if let Some(image) = catalog.get_mut(image_id) {
                image.likes = if liked {
                    image.likes + 1
                } else {
                    image.likes.saturating_sub(1)
                };
            }
            Ok(LikeState {
                liked,
                likes: self.like_count(catalog, image_id),
            })
        })
    }

    /// Flip the bookmark on an image (gated)
    pub fn toggle_bookmark(
        &mut self,
        session: &mut SessionController,
        image_id: &str,
    ) -> Result<Outcome<Notice>> {
        run_gated(session, &Action::Bookmark, |_| {
            if self.bookmarked.remove(image_id) {
                Ok(Notice::new(
                    "Removed from bookmarks",
                    "Image removed from your collection",
                ))
            } else {
                self.bookmarked.insert(image_id.to_string());
                Ok(Notice::new(
                    "Added to bookmarks",
                    "Image saved to your collection",
                ))
            }
        })
    }

    /// Bookmarked image ids, sorted
    pub fn bookmarks(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.bookmarked.iter().map(String::as_str).collect();
        ids.sort();
        ids
    }
}

/// Resolve a download link for one quality (gated)
pub fn download(
    session: &mut SessionController,
    catalog: &Catalog,
    image_id: &str,
    quality: Quality,
) -> Result<Outcome<DownloadTicket>> {
    run_gated(session, &Action::Download, |_| {
        let image = catalog.detail(image_id);
        Ok(DownloadTicket {
            url: image.qualities.get(quality).to_string(),
            filename: format!("{}-{}.jpg", image.title, quality.as_str()),
            notice: Notice::new(
                "Download started",
                format!("Downloading {} in {} quality", image.title, quality.as_str()),
            ),
        })
    })
}

/// Share link for an image; public, no session needed
pub fn share(base_url: &str, image_id: &str) -> (String, Notice) {
    let link = Route::Image(image_id.to_string()).url(base_url);
    (
        link,
        Notice::new("Link copied", "Image link copied to clipboard"),
    )
}
