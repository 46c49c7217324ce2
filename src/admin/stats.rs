use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::activity::ActivityLog;
use crate::comments::{relative_time, CommentBoard};
use crate::gallery::Catalog;
use crate::session::SessionController;

pub const RECENT_ACTIVITY: usize = 4;
pub const TOP_IMAGES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub images: usize,
    pub users: usize,
    pub downloads: u64,
    pub comments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLine {
    pub kind: String,
    pub message: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopImage {
    pub id: String,
    pub title: String,
    pub downloads: u64,
    pub likes: u64,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    pub totals: Totals,
    pub recent: Vec<ActivityLine>,
    pub top: Vec<TopImage>,
}

/// Users are the distinct identities seen in comments plus the current one
pub fn totals(catalog: &Catalog, board: &CommentBoard, session: &SessionController) -> Totals {
    let mut users: BTreeSet<&str> = board
        .all()
        .iter()
        .map(|c| c.author.email.as_str())
        .collect();
    if let Some(user) = session.user() {
        users.insert(user.email.as_str());
    }
    Totals {
        images: catalog.len(),
        users: users.len(),
        downloads: catalog.all().iter().map(|img| img.downloads).sum(),
        comments: board.all().len(),
    }
}

/// Most downloaded first; ties keep catalog order
pub fn top_images(catalog: &Catalog, limit: usize) -> Vec<TopImage> {
    let mut images: Vec<_> = catalog.all().iter().collect();
    images.sort_by(|a, b| b.downloads.cmp(&a.downloads));
    images
        .into_iter()
        .take(limit)
        .map(|img| TopImage {
            id: img.id.clone(),
            title: img.title.clone(),
            downloads: img.downloads,
            likes: img.likes,
            views: img.views(),
        })
        .collect()
}

pub fn recent_activity(
    log: &ActivityLog,
    limit: usize,
    now: &DateTime<Utc>,
) -> Result<Vec<ActivityLine>> {
    Ok(log
        .recent(limit)?
        .into_iter()
        .map(|entry| ActivityLine {
            message: entry.message(),
            time: relative_time(&entry.ts, now),
            kind: entry.event_type,
        })
        .collect())
}

pub fn overview(
    catalog: &Catalog,
    board: &CommentBoard,
    session: &SessionController,
    log: &ActivityLog,
    now: &DateTime<Utc>,
) -> Result<Overview> {
    Ok(Overview {
        totals: totals(catalog, board, session),
        recent: recent_activity(log, RECENT_ACTIVITY, now)?,
        top: top_images(catalog, TOP_IMAGES),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{admin_user, anonymous, signed_in_as};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        Catalog::seeded(Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_totals() {
        let catalog = catalog();
        let board = CommentBoard::seeded();
        let anon = totals(&catalog, &board, &anonymous());
        assert_eq!(anon.images, 20);
        assert_eq!(anon.comments, 6);
        // john, sarah, mike, spam
        assert_eq!(anon.users, 4);
        let expected: u64 = catalog.all().iter().map(|i| i.downloads).sum();
        assert_eq!(anon.downloads, expected);

        let admin = totals(&catalog, &board, &signed_in_as(admin_user()));
        assert_eq!(admin.users, 5);
    }

    #[test]
    fn test_top_images_sorted() {
        let top = top_images(&catalog(), TOP_IMAGES);
        assert_eq!(top.len(), 4);
        assert!(top.windows(2).all(|w| w[0].downloads >= w[1].downloads));
        assert_eq!(top[0].views, top[0].downloads * 3 / 2);
    }

    #[test]
    fn test_recent_activity_from_log() {
        let dir = TempDir::new().unwrap();
        let mut log = ActivityLog::new(&dir.path().join("activity.jsonl"), "c").unwrap();
        log.upload("img-x", "Mountain Sunset");
        log.comment_post("c-9", "img-2", "Ocean Waves");

        let now = Utc::now();
        let recent = recent_activity(&log, RECENT_ACTIVITY, &now).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].kind, "comment_post");
        assert_eq!(recent[0].message, "New comment on \"Ocean Waves\"");
        assert_eq!(recent[1].time, "Just now");
    }

    #[test]
    fn test_overview_with_disabled_log() {
        let log = ActivityLog::disabled("c");
        let now = Utc::now();
        let overview = overview(
            &catalog(),
            &CommentBoard::seeded(),
            &anonymous(),
            &log,
            &now,
        )
        .unwrap();
        assert!(overview.recent.is_empty());
        assert_eq!(overview.top.len(), TOP_IMAGES);
    }
}
