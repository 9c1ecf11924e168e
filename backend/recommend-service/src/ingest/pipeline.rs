use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

use tracing::{error, info};

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::ingest::parser::{self, LineOutcome};
use crate::models::{Post, User};

pub const DEFAULT_BATCH_SIZE: usize = 1_000;

/// One flush attempt, successful or lost. Batch boundaries are observable
/// so callers can re-run lost batches from their own checkpoints.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub users_staged: usize,
    pub posts_staged: usize,
    pub users_inserted: u64,
    pub posts_inserted: u64,
    /// Commit failure for this batch; the run continued regardless.
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn committed(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub lines_read: u64,
    /// Unparseable lines (bad JSON or bad timestamp), skipped with a log line.
    pub malformed: u64,
    /// Lines lacking a post or author identity, skipped silently.
    pub missing_identity: u64,
    /// Valid records staged for insertion.
    pub posts_staged: u64,
    pub batches: Vec<BatchOutcome>,
}

impl IngestReport {
    pub fn committed_batches(&self) -> usize {
        self.batches.iter().filter(|b| b.committed()).count()
    }

    pub fn lost_batches(&self) -> usize {
        self.batches.len() - self.committed_batches()
    }

    pub fn posts_inserted(&self) -> u64 {
        self.batches.iter().map(|b| b.posts_inserted).sum()
    }

    pub fn users_inserted(&self) -> u64 {
        self.batches.iter().map(|b| b.users_inserted).sum()
    }
}

/// Streams newline-delimited post records into the record store in
/// bounded-size atomic batches.
///
/// Malformed lines never abort a run; a failed batch commit loses that one
/// batch and the run continues (at-most-once durability per batch, no
/// retry).
pub struct IngestPipeline {
    store: Arc<dyn RecordStore>,
    batch_size: usize,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_batch_size(store, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(store: Arc<dyn RecordStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn ingest<R: BufRead>(&self, reader: R) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut pending_posts: Vec<Post> = Vec::new();
        let mut pending_users: HashMap<String, User> = HashMap::new();

        for line in reader.lines() {
            let line =
                line.map_err(|e| AppError::Internal(format!("failed to read input: {}", e)))?;
            report.lines_read += 1;

            match parser::parse_line(&line) {
                Ok(LineOutcome::Record(record)) => {
                    report.posts_staged += 1;
                    // First sighting wins within a batch; later records for
                    // the same author never update the pending user.
                    pending_users
                        .entry(record.author.user_id.clone())
                        .or_insert(record.author);
                    pending_posts.push(record.post);

                    if pending_posts.len() >= self.batch_size {
                        self.flush(&mut pending_users, &mut pending_posts, &mut report)
                            .await;
                    }
                }
                Ok(LineOutcome::MissingIdentity) => {
                    report.missing_identity += 1;
                }
                Err(err) => {
                    report.malformed += 1;
                    error!(line = report.lines_read, %err, "Skipping malformed input line");
                }
            }
        }

        if !pending_posts.is_empty() {
            self.flush(&mut pending_users, &mut pending_posts, &mut report)
                .await;
        }

        info!(
            lines = report.lines_read,
            staged = report.posts_staged,
            malformed = report.malformed,
            missing_identity = report.missing_identity,
            batches = report.batches.len(),
            lost = report.lost_batches(),
            "Ingestion run finished"
        );
        Ok(report)
    }

    async fn flush(
        &self,
        pending_users: &mut HashMap<String, User>,
        pending_posts: &mut Vec<Post>,
        report: &mut IngestReport,
    ) {
        let index = report.batches.len();
        let users_staged = pending_users.len();
        let posts_staged = pending_posts.len();

        let users: Vec<User> = pending_users.drain().map(|(_, user)| user).collect();
        let posts = std::mem::take(pending_posts);

        match self.store.bulk_insert(users, posts).await {
            Ok(commit) => {
                info!(
                    batch = index,
                    users_staged,
                    posts_staged,
                    users_inserted = commit.users_inserted,
                    posts_inserted = commit.posts_inserted,
                    "Bulk insert completed"
                );
                report.batches.push(BatchOutcome {
                    index,
                    users_staged,
                    posts_staged,
                    users_inserted: commit.users_inserted,
                    posts_inserted: commit.posts_inserted,
                    error: None,
                });
            }
            Err(err) => {
                error!(
                    batch = index,
                    posts_staged,
                    %err,
                    "Batch commit failed; batch lost, continuing with next batch"
                );
                report.batches.push(BatchOutcome {
                    index,
                    users_staged,
                    posts_staged,
                    users_inserted: 0,
                    posts_inserted: 0,
                    error: Some(err.to_string()),
                });
            }
        }
    }
}
