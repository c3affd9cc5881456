//! `CommitsWithData` / `GitCommits` repository functions — the commit
//! window (spec §3 "Commit window", §4.9 "Commit window cache").

use sqlx::PgPool;

use gold_core::model::{Commit, CommitId, CommitWindow};

use crate::errors::Result;

/// Load the last `window_size` commits for which any data was ingested,
/// oldest first (index 0) through head (index `len()-1`), matching
/// [`CommitWindow`]'s documented ordering.
pub async fn load_commit_window(pool: &PgPool, window_size: u32) -> Result<CommitWindow> {
    let rows = sqlx::query_as::<_, CommitRow>(
        "SELECT gc.commit_id, gc.git_hash, gc.author_email, gc.subject, gc.commit_time
         FROM commits_with_data cwd
         JOIN git_commits gc ON gc.commit_id = cwd.commit_id
         ORDER BY gc.commit_time DESC, gc.commit_id DESC
         LIMIT $1",
    )
    .bind(window_size as i64)
    .fetch_all(pool)
    .await?;

    let mut commits: Vec<Commit> = rows.into_iter().map(CommitRow::into_commit).collect();
    // Query returned head-first for the LIMIT to bite the right end;
    // flip back to the window's oldest-first convention.
    commits.reverse();
    Ok(CommitWindow::new(commits))
}

#[derive(sqlx::FromRow)]
struct CommitRow {
    commit_id: String,
    git_hash: Option<String>,
    author_email: Option<String>,
    subject: Option<String>,
    commit_time: chrono::DateTime<chrono::Utc>,
}

impl CommitRow {
    fn into_commit(self) -> Commit {
        Commit {
            id: CommitId(self.commit_id),
            git_hash: self.git_hash,
            author: self.author_email,
            subject: self.subject,
            timestamp: self.commit_time,
        }
    }
}

/// The most recent commit in `commits_with_data`, for
/// [`crate::repo::paramset`]'s "last commit with data" status field
/// (spec §4.3 `ComputeGUIStatus`). `None` if no commit has any data yet.
pub async fn most_recent_commit(pool: &PgPool) -> Result<Option<Commit>> {
    let row = sqlx::query_as::<_, CommitRow>(
        "SELECT gc.commit_id, gc.git_hash, gc.author_email, gc.subject, gc.commit_time
         FROM commits_with_data cwd
         JOIN git_commits gc ON gc.commit_id = cwd.commit_id
         ORDER BY gc.commit_time DESC, gc.commit_id DESC
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.map(CommitRow::into_commit))
}
