//! Main board feed: pages over the unified post index and hydrates every
//! entry into a view, with the viewer's own ballot overlaid on polls.
//!
//! Hydration costs one post lookup per entry plus a tally and a ballot lookup
//! per poll, i.e. O(page_size × options_per_poll) rows per page. That is the
//! scaling limit of the board; there is no cache in front of it.

use tracing::warn;
use uuid::Uuid;

use mojung_db::Database;
use mojung_types::api::{MessageView, PostView, VoteView};
use mojung_types::error::{BoardError, BoardResult, IntegrityError, ValidationError};
use mojung_types::models::{OptionCount, Post, PostIndexEntry};

#[derive(Debug, PartialEq, Eq)]
pub enum FeedPage {
    Posts(Vec<PostView>),
    /// Nothing has been posted at all.
    NoPosts,
    /// Posts exist, but not this far back.
    OutOfRange,
}

pub struct FeedAggregator<'a> {
    db: &'a Database,
}

impl<'a> FeedAggregator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// `page_number` is 1-based. Entries whose post has gone missing are
    /// logged and left out instead of failing the page.
    pub fn page(&self, page_number: i64, page_size: u64, viewer: Option<Uuid>) -> BoardResult<FeedPage> {
        if page_number <= 0 || page_size == 0 {
            return Err(ValidationError::InvalidPage.into());
        }

        let total = self.db.index_len()?;
        if total == 0 {
            return Ok(FeedPage::NoPosts);
        }

        let Some(skip) = (page_number as u64 - 1).checked_mul(page_size) else {
            return Ok(FeedPage::OutOfRange);
        };
        if skip >= total {
            return Ok(FeedPage::OutOfRange);
        }

        let entries = self.db.index_page(skip, page_size)?;
        if entries.is_empty() {
            return Ok(FeedPage::OutOfRange);
        }

        let mut views = Vec::with_capacity(entries.len());
        for entry in &entries {
            match self.hydrate(entry, viewer) {
                Ok(view) => views.push(view),
                Err(BoardError::Integrity(e @ IntegrityError::DanglingReference { .. })) => {
                    warn!("Skipping feed entry {}: {}", entry.seq, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(FeedPage::Posts(views))
    }

    pub fn hydrate(&self, entry: &PostIndexEntry, viewer: Option<Uuid>) -> BoardResult<PostView> {
        let post = self
            .db
            .find_post(entry.post_id, entry.kind)?
            .ok_or(IntegrityError::DanglingReference {
                post_id: entry.post_id,
            })?;

        match post {
            Post::Message(message) => Ok(PostView::Message(MessageView {
                id: message.id,
                generator_id: message.generator_id,
                recipient: message.recipient,
                content: message.content,
                created_at: message.created_at,
            })),
            Post::Vote(vote) => {
                let tally = self.db.tally(vote.id)?;
                let selected_option_id = match viewer {
                    Some(voter) => self.db.ballot_of(voter, vote.id)?,
                    None => None,
                };

                // Aligned with `options`, whatever order the tally came in.
                let option_counts: Vec<OptionCount> = vote
                    .options
                    .iter()
                    .map(|o| OptionCount {
                        option_id: o.option_id.clone(),
                        count: tally.get(&o.option_id).unwrap_or(0),
                    })
                    .collect();

                Ok(PostView::Vote(VoteView {
                    id: vote.id,
                    generator_id: vote.generator_id,
                    title: vote.title,
                    total_ballots: tally.total(),
                    options: vote.options,
                    option_counts,
                    selected_option_id,
                    created_at: vote.created_at,
                }))
            }
        }
    }
}
