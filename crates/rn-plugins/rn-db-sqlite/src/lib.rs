//! # rn-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rn-core` domain models.
//!
//! Member sets live in one table each with `(item_id, user_id)` as primary
//! key, so an add is an `INSERT OR IGNORE` and a remove a `DELETE`: each is a
//! single statement and concurrent updates from different users never
//! overwrite one another. Timestamps are stored as microseconds since the
//! epoch so feed ordering is numeric.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rn_core::models::{Item, Membership, MembershipOp};
use rn_core::traits::{ContentEdit, ItemRepo, ListingFilter, RankEntry, VoteBound};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS items (
        id           BLOB PRIMARY KEY,
        author_id    TEXT NOT NULL,
        title        TEXT NOT NULL,
        url          TEXT,
        text         TEXT,
        created_at   INTEGER NOT NULL,
        is_show_item INTEGER NOT NULL,
        edited_at    INTEGER,
        deleted_at   INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS items_feed
        ON items (is_show_item, created_at DESC, id DESC)
        WHERE deleted_at IS NULL",
    "CREATE TABLE IF NOT EXISTS item_votes (
        item_id BLOB NOT NULL,
        user_id TEXT NOT NULL,
        PRIMARY KEY (item_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS item_favorites (
        item_id BLOB NOT NULL,
        user_id TEXT NOT NULL,
        PRIMARY KEY (item_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS item_hides (
        item_id BLOB NOT NULL,
        user_id TEXT NOT NULL,
        PRIMARY KEY (item_id, user_id)
    )",
];

const SELECT_ITEM: &str = "SELECT i.id, i.author_id, i.title, i.url, i.text, i.created_at,
        i.is_show_item, i.edited_at, i.deleted_at,
        (SELECT json_group_array(user_id) FROM item_votes WHERE item_id = i.id) AS voters,
        (SELECT json_group_array(user_id) FROM item_favorites WHERE item_id = i.id) AS favorited_by,
        (SELECT json_group_array(user_id) FROM item_hides WHERE item_id = i.id) AS hidden_by
    FROM items i";

const FEED_FILTER: &str = "WHERE i.deleted_at IS NULL
        AND i.is_show_item = ?
        AND i.created_at <= ?
        AND (? IS NULL OR i.created_at > ?)
        AND (? IS NULL OR NOT EXISTS (
            SELECT 1 FROM item_hides h WHERE h.item_id = i.id AND h.user_id = ?
        ))
        AND (SELECT COUNT(*) FROM item_votes v WHERE v.item_id = i.id) BETWEEN ? AND ?";

const SELECT_RANK_ENTRY: &str = "SELECT i.id, i.created_at,
        (SELECT COUNT(*) FROM item_votes v WHERE v.item_id = i.id) AS votes
    FROM items i";

pub struct SqliteItemRepo {
    pool: SqlitePool,
}

// Helper for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> anyhow::Result<Uuid> {
    Ok(Uuid::from_slice(blob)?)
}

fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(micros: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {micros}"))
}

/// Inclusive vote-count range for `BETWEEN`.
fn vote_range(bound: VoteBound) -> (i64, i64) {
    let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
    match bound {
        VoteBound::Any => (0, i64::MAX),
        VoteBound::AtLeast(min) => (count(min), i64::MAX),
        VoteBound::Below(max) => (0, count(max) - 1),
    }
}

fn table(set: Membership) -> &'static str {
    match set {
        Membership::Voters => "item_votes",
        Membership::FavoritedBy => "item_favorites",
        Membership::HiddenBy => "item_hides",
    }
}

fn members(row: &SqliteRow, column: &str) -> anyhow::Result<HashSet<String>> {
    let raw: String = row.try_get(column)?;
    Ok(serde_json::from_str(&raw)?)
}

fn row_to_item(row: &SqliteRow) -> anyhow::Result<Item> {
    Ok(Item {
        id: blob_to_uuid(row.try_get::<Vec<u8>, _>("id")?.as_slice())?,
        by: row.try_get("author_id")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        text: row.try_get("text")?,
        created_at: from_micros(row.try_get("created_at")?)?,
        voters: members(row, "voters")?,
        favorited_by: members(row, "favorited_by")?,
        hidden_by: members(row, "hidden_by")?,
        is_show_item: row.try_get("is_show_item")?,
        edited_at: row
            .try_get::<Option<i64>, _>("edited_at")?
            .map(from_micros)
            .transpose()?,
        deleted_at: row
            .try_get::<Option<i64>, _>("deleted_at")?
            .map(from_micros)
            .transpose()?,
    })
}

fn row_to_rank_entry(row: &SqliteRow) -> anyhow::Result<RankEntry> {
    Ok(RankEntry {
        id: blob_to_uuid(row.try_get::<Vec<u8>, _>("id")?.as_slice())?,
        created_at: from_micros(row.try_get("created_at")?)?,
        votes: usize::try_from(row.try_get::<i64, _>("votes")?)?,
    })
}

impl SqliteItemRepo {
    /// Connects and creates the schema if needed.
    ///
    /// `sqlite::memory:` databases live inside one connection, so the pool
    /// is pinned to a single connection that is never recycled.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let mut pool_options = SqlitePoolOptions::new();
        if url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        log::info!("sqlite item store ready at {url}");
        Ok(Self { pool })
    }

    async fn fetch(&self, id: Uuid) -> anyhow::Result<Option<Item>> {
        let row = sqlx::query(&format!("{SELECT_ITEM} WHERE i.id = ?"))
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_item).transpose()
    }

    async fn fetch_live(&self, id: Uuid) -> anyhow::Result<Option<Item>> {
        Ok(self.fetch(id).await?.filter(|item| !item.is_deleted()))
    }

    async fn list(
        &self,
        filter: &ListingFilter,
        tail: &str,
        page: Option<(usize, usize)>,
    ) -> anyhow::Result<Vec<Item>> {
        let sql = format!("{SELECT_ITEM} {FEED_FILTER} {tail}");
        let mut query = bind_filter(sqlx::query(&sql), filter);
        if let Some((limit, offset)) = page {
            query = query.bind(limit as i64).bind(offset as i64);
        }

        query
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_item)
            .collect()
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

/// Binds the parameters of `FEED_FILTER`, in order.
fn bind_filter<'q>(query: SqliteQuery<'q>, filter: &ListingFilter) -> SqliteQuery<'q> {
    let after = filter.created_after.map(to_micros);
    let (min_votes, max_votes) = vote_range(filter.votes);

    query
        .bind(filter.show)
        .bind(to_micros(filter.created_until))
        .bind(after)
        .bind(after)
        .bind(filter.viewer.clone())
        .bind(filter.viewer.clone())
        .bind(min_votes)
        .bind(max_votes)
}

#[async_trait]
impl ItemRepo for SqliteItemRepo {
    /// Inserts the item row and any members in one transaction.
    async fn insert_item(&self, item: Item) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO items (id, author_id, title, url, text, created_at, is_show_item, edited_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(item.id))
        .bind(&item.by)
        .bind(&item.title)
        .bind(&item.url)
        .bind(&item.text)
        .bind(to_micros(item.created_at))
        .bind(item.is_show_item)
        .bind(item.edited_at.map(to_micros))
        .bind(item.deleted_at.map(to_micros))
        .execute(&mut *tx)
        .await?;

        for set in [Membership::Voters, Membership::FavoritedBy, Membership::HiddenBy] {
            let sql = format!("INSERT INTO {} (item_id, user_id) VALUES (?, ?)", table(set));
            for user_id in item.members(set) {
                sqlx::query(&sql)
                    .bind(uuid_to_blob(item.id))
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> anyhow::Result<Option<Item>> {
        self.fetch(id).await
    }

    async fn update_membership(
        &self,
        id: Uuid,
        set: Membership,
        op: MembershipOp,
        user_id: &str,
    ) -> anyhow::Result<Option<Item>> {
        let table = table(set);
        let result = match op {
            MembershipOp::Add => {
                sqlx::query(&format!(
                    "INSERT OR IGNORE INTO {table} (item_id, user_id)
                     SELECT id, ? FROM items WHERE id = ? AND deleted_at IS NULL"
                ))
                .bind(user_id)
                .bind(uuid_to_blob(id))
                .execute(&self.pool)
                .await?
            }
            MembershipOp::Remove => {
                sqlx::query(&format!(
                    "DELETE FROM {table} WHERE item_id = ? AND user_id = ?
                     AND EXISTS (SELECT 1 FROM items WHERE id = ? AND deleted_at IS NULL)"
                ))
                .bind(uuid_to_blob(id))
                .bind(user_id)
                .bind(uuid_to_blob(id))
                .execute(&self.pool)
                .await?
            }
        };
        log::debug!("{table} {op:?} on {id}: {} row(s)", result.rows_affected());

        self.fetch_live(id).await
    }

    async fn update_content(&self, id: Uuid, edit: ContentEdit) -> anyhow::Result<Option<Item>> {
        let result = sqlx::query(
            "UPDATE items SET title = ?, text = ?, edited_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(edit.title)
        .bind(edit.text)
        .bind(to_micros(edit.edited_at))
        .bind(uuid_to_blob(id))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch(id).await
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<Option<Item>> {
        let result =
            sqlx::query("UPDATE items SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(to_micros(at))
                .bind(uuid_to_blob(id))
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch(id).await
    }

    async fn list_newest(
        &self,
        filter: &ListingFilter,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<Vec<Item>> {
        self.list(
            filter,
            "ORDER BY i.created_at DESC, i.id DESC LIMIT ? OFFSET ?",
            Some((limit, offset)),
        )
        .await
    }

    async fn list_rank_entries(&self, filter: &ListingFilter) -> anyhow::Result<Vec<RankEntry>> {
        let sql = format!("{SELECT_RANK_ENTRY} {FEED_FILTER}");

        bind_filter(sqlx::query(&sql), filter)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_rank_entry)
            .collect()
    }

    async fn get_items(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("{SELECT_ITEM} WHERE i.id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(uuid_to_blob(*id));
        }

        query
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_item)
            .collect()
    }
}
