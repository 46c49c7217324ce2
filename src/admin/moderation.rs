use anyhow::{bail, Result};

use crate::access::{run_gated, Action, Outcome};
use crate::comments::{moderation_date, CommentBoard, ModerationStatus};
use crate::gallery::Catalog;
use crate::notice::Notice;
use crate::session::SessionController;

/// One row of the moderation table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub comment_id: String,
    pub author: String,
    pub email: String,
    pub content: String,
    pub image_title: String,
    pub status: ModerationStatus,
    pub badge: String,
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub pending: usize,
    pub flagged: usize,
}

pub fn rows(board: &CommentBoard, catalog: &Catalog) -> Vec<Row> {
    board
        .all()
        .iter()
        .map(|c| Row {
            comment_id: c.id.clone(),
            author: c.author.name.clone(),
            email: c.author.email.clone(),
            content: c.content.clone(),
            image_title: catalog.detail(&c.image_id).title,
            status: c.status,
            badge: match c.status {
                ModerationStatus::Flagged => format!("Flagged ({})", c.reports),
                other => other.badge().to_string(),
            },
            date: moderation_date(&c.created_at),
        })
        .collect()
}

pub fn counts(board: &CommentBoard) -> Counts {
    Counts {
        pending: board.count_with(ModerationStatus::Pending),
        flagged: board.count_with(ModerationStatus::Flagged),
    }
}

/// Make a pending, flagged or rejected comment public
pub fn approve(
    session: &mut SessionController,
    board: &mut CommentBoard,
    comment_id: &str,
) -> Result<Outcome<Notice>> {
    run_gated(session, &Action::ModerateComments, |_| {
        transition(board, comment_id, ModerationStatus::Approved)?;
        Ok(Notice::new(
            "Comment approved",
            "The comment is now visible to all users",
        ))
    })
}

/// Hide a pending, flagged or approved comment
pub fn reject(
    session: &mut SessionController,
    board: &mut CommentBoard,
    comment_id: &str,
) -> Result<Outcome<Notice>> {
    run_gated(session, &Action::ModerateComments, |_| {
        transition(board, comment_id, ModerationStatus::Rejected)?;
        Ok(Notice::new(
            "Comment rejected",
            "The comment has been hidden from public view",
        ))
    })
}

pub fn delete(
    session: &mut SessionController,
    board: &mut CommentBoard,
    comment_id: &str,
) -> Result<Outcome<Notice>> {
    run_gated(session, &Action::ModerateComments, |_| {
        board.remove(comment_id)?;
        Ok(Notice::new(
            "Comment deleted",
            "The comment has been permanently removed",
        ))
    })
}

fn transition(board: &mut CommentBoard, comment_id: &str, to: ModerationStatus) -> Result<()> {
    let Some(current) = board.get(comment_id).map(|c| c.status) else {
        bail!("Comment not found: {}", comment_id);
    };
    if current == to {
        bail!("Comment is already {}", to.as_str());
    }
    board.set_status(comment_id, to)
}
