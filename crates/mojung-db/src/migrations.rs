use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL UNIQUE,
                display_name    TEXT NOT NULL,
                password        TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'active',
                created_at      TEXT NOT NULL
            );

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                generator_id    TEXT NOT NULL REFERENCES users(id),
                recipient       TEXT NOT NULL,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE votes (
                id              TEXT PRIMARY KEY,
                generator_id    TEXT NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE vote_options (
                vote_id         TEXT NOT NULL REFERENCES votes(id),
                option_id       TEXT NOT NULL,
                position        INTEGER NOT NULL,
                content         TEXT NOT NULL,
                PRIMARY KEY (vote_id, option_id)
            );

            -- Unified chronological index over messages and votes.
            CREATE TABLE post_index (
                seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id         TEXT NOT NULL UNIQUE,
                kind            TEXT NOT NULL CHECK (kind IN ('MESSAGE', 'VOTE')),
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_post_index_created
                ON post_index(created_at DESC, seq DESC);

            -- One ballot per voter per poll.
            CREATE TABLE ballots (
                voter_id        TEXT NOT NULL REFERENCES users(id),
                vote_id         TEXT NOT NULL REFERENCES votes(id),
                option_id       TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                PRIMARY KEY (voter_id, vote_id)
            );

            CREATE INDEX idx_ballots_vote
                ON ballots(vote_id, option_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
