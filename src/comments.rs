//! Comment threads and their moderation state.

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{run_gated, Action, Outcome};
use crate::config::default_avatar;
use crate::notice::Notice;
use crate::session::{SessionController, User};

/// Reports at which a comment is flagged for review
pub const FLAG_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Approved,
    Pending,
    Flagged,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Pending => "pending",
            Self::Flagged => "flagged",
            Self::Rejected => "rejected",
        }
    }

    /// Label for the moderation table badge
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Pending => "Pending",
            Self::Flagged => "Flagged",
            Self::Rejected => "Rejected",
        }
    }

    /// Rejected comments are hidden from public threads
    pub fn is_public(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Author {
    pub name: String,
    pub email: String,
    pub avatar_url: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            name: if user.name.is_empty() {
                "Anonymous".to_string()
            } else {
                user.name.clone()
            },
            email: user.email.clone(),
            avatar_url: if user.avatar_url.is_empty() {
                default_avatar()
            } else {
                user.avatar_url.clone()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Comment {
    pub id: String,
    pub image_id: String,
    pub content: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub is_liked: bool,
    #[serde(default)]
    pub status: ModerationStatus,
    #[serde(default)]
    pub reports: u32,
}

/// Result of submitting the comment form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostResult {
    Posted { id: String, notice: Notice },
    /// Blank text; nothing happens
    Ignored,
}

/// `Just now`, `5h ago`, `3d ago`, then a plain date
pub fn relative_time(created: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let hours = (*now - *created).num_hours();
    if hours < 1 {
        "Just now".to_string()
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if hours < 168 {
        format!("{}d ago", hours / 24)
    } else {
        created.format("%-m/%-d/%Y").to_string()
    }
}

/// `Jan 15, 2024, 10:30 AM`
pub fn moderation_date(ts: &DateTime<Utc>) -> String {
    ts.format("%b %-d, %Y, %I:%M %p").to_string()
}

#[allow(clippy::too_many_arguments)]
fn seed_comment(
    id: &str,
    image_id: &str,
    content: &str,
    (name, email): (&str, &str),
    created_at: DateTime<Utc>,
    likes: u64,
    is_liked: bool,
    status: ModerationStatus,
    reports: u32,
) -> Comment {
    Comment {
        id: id.to_string(),
        image_id: image_id.to_string(),
        content: content.to_string(),
        author: Author {
            name: name.to_string(),
            email: email.to_string(),
            avatar_url: default_avatar(),
        },
        created_at,
        likes,
        is_liked,
        status,
        reports,
    }
}

fn at(month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

/// All comments across images, newest first within each thread
#[derive(Debug, Clone, Default)]
pub struct CommentBoard {
    comments: Vec<Comment>,
}

impl CommentBoard {
    /// Demo threads plus the moderation queue fixtures
    pub fn seeded() -> Self {
        use ModerationStatus::*;
        let comments = vec![
            seed_comment(
                "c-1",
                "img-1",
                "Absolutely stunning photograph! The composition and lighting are perfect.",
                ("John Doe", "john@example.com"),
                at(1, 15, 10, 30),
                12,
                false,
                Approved,
                0,
            ),
            seed_comment(
                "c-2",
                "img-1",
                "This reminds me of my trip to the mountains last summer. Beautiful capture!",
                ("Sarah Wilson", "sarah@example.com"),
                at(1, 14, 15, 45),
                8,
                true,
                Approved,
                0,
            ),
            seed_comment(
                "c-3",
                "img-1",
                "The colors in this image are so vibrant and natural. Great work!",
                ("Mike Johnson", "mike@example.com"),
                at(1, 13, 9, 20),
                15,
                false,
                Approved,
                0,
            ),
            seed_comment(
                "c-4",
                "img-2",
                "Wow, this brings back memories of my trip to the mountains!",
                ("Sarah Wilson", "sarah@example.com"),
                at(1, 14, 15, 45),
                0,
                false,
                Pending,
                0,
            ),
            seed_comment(
                "c-5",
                "img-3",
                "This is inappropriate content that should be removed.",
                ("Spam User", "spam@example.com"),
                at(1, 13, 9, 20),
                0,
                false,
                Flagged,
                FLAG_THRESHOLD,
            ),
            seed_comment(
                "c-6",
                "img-9",
                "Beautiful colors and lighting in this shot!",
                ("Mike Johnson", "mike@example.com"),
                at(1, 12, 14, 10),
                0,
                false,
                Approved,
                0,
            ),
        ];
        Self { comments }
    }

    pub fn all(&self) -> &[Comment] {
        &self.comments
    }

    pub fn get(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Comment> {
        self.comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow!("Comment not found: {}", id))
    }

    /// Public thread for one image
    pub fn thread(&self, image_id: &str) -> Vec<&Comment> {
        self.comments
            .iter()
            .filter(|c| c.image_id == image_id && c.status.is_public())
            .collect()
    }

    /// Submit the comment form (gated). Blank text is ignored.
    pub fn post(
        &mut self,
        session: &mut SessionController,
        image_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome<PostResult>> {
        run_gated(session, &Action::PostComment, |session| {
            if text.trim().is_empty() {
                return Ok(PostResult::Ignored);
            }
            let user = session
                .user()
                .ok_or_else(|| anyhow!("No active session"))?;
            let id = uuid::Uuid::new_v4().to_string();
            let comment = Comment {
                id: id.clone(),
                image_id: image_id.to_string(),
                content: text.to_string(),
                author: Author::from(user),
                created_at: now,
                likes: 0,
                is_liked: false,
                status: ModerationStatus::Approved,
                reports: 0,
            };
            // Front of the whole list keeps each thread newest first
            self.comments.insert(0, comment);
            Ok(PostResult::Posted {
                id,
                notice: Notice::new(
                    "Comment posted",
                    "Your comment has been added successfully",
                ),
            })
        })
    }

    /// Flip the like on a comment (gated). Returns the new like count.
    pub fn toggle_like(
        &mut self,
        session: &mut SessionController,
        comment_id: &str,
    ) -> Result<Outcome<u64>> {
        run_gated(session, &Action::LikeComment, |_| {
            let comment = self.get_mut(comment_id)?;
            if comment.is_liked {
                comment.likes = comment.likes.saturating_sub(1);
            } else {
                comment.likes += 1;
            }
            comment.is_liked = !comment.is_liked;
            Ok(comment.likes)
        })
    }

    /// Delete a comment; only its author or an administrator may
    pub fn delete(
        &mut self,
        session: &mut SessionController,
        comment_id: &str,
    ) -> Result<Outcome<Notice>> {
        let author_email = self
            .get(comment_id)
            .map(|c| c.author.email.clone())
            .ok_or_else(|| anyhow!("Comment not found: {}", comment_id))?;
        run_gated(session, &Action::DeleteComment(author_email), |_| {
            self.remove(comment_id)?;
            Ok(Notice::new("Comment deleted", "The comment has been removed"))
        })
    }

    /// Report a comment (gated). Enough reports flag it for review.
    pub fn report(
        &mut self,
        session: &mut SessionController,
        comment_id: &str,
    ) -> Result<Outcome<Notice>> {
        run_gated(session, &Action::ReportComment, |_| {
            let comment = self.get_mut(comment_id)?;
            comment.reports += 1;
            if comment.reports >= FLAG_THRESHOLD
                && matches!(
                    comment.status,
                    ModerationStatus::Approved | ModerationStatus::Pending
                )
            {
                comment.status = ModerationStatus::Flagged;
            }
            Ok(Notice::new(
                "Comment reported",
                "Thanks, a moderator will review it",
            ))
        })
    }

    /// Unconditional removal, used after access has been checked
    pub fn remove(&mut self, comment_id: &str) -> Result<Comment> {
        let pos = self
            .comments
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or_else(|| anyhow!("Comment not found: {}", comment_id))?;
        Ok(self.comments.remove(pos))
    }

    /// Set moderation status, used after access has been checked
    pub fn set_status(&mut self, comment_id: &str, status: ModerationStatus) -> Result<()> {
        self.get_mut(comment_id)?.status = status;
        Ok(())
    }

    pub fn count_with(&self, status: ModerationStatus) -> usize {
        self.comments.iter().filter(|c| c.status == status).count()
    }
}
