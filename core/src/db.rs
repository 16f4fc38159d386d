use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::models::{
    DaySummary, MergeStats, Moment, MomentChange, NewMoment, PraiseCard, SyncTombstone,
    validate_moment_change,
};
use crate::praise::offline_praise_for;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS moments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    timezone TEXT NOT NULL,
                    server_id TEXT UNIQUE,
                    praise TEXT,
                    praise_cards TEXT,
                    tags TEXT NOT NULL DEFAULT '[]',
                    favorite INTEGER NOT NULL DEFAULT 0,
                    synced INTEGER NOT NULL DEFAULT 0,
                    sync_error TEXT,
                    offline_praise TEXT,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_moments_created ON moments(created_at);
                CREATE INDEX IF NOT EXISTS idx_moments_synced ON moments(synced);

                CREATE TABLE IF NOT EXISTS day_summaries (
                    date TEXT PRIMARY KEY,
                    moment_count INTEGER NOT NULL,
                    tags TEXT NOT NULL DEFAULT '[]',
                    morning INTEGER NOT NULL DEFAULT 0,
                    afternoon INTEGER NOT NULL DEFAULT 0,
                    evening INTEGER NOT NULL DEFAULT 0,
                    night INTEGER NOT NULL DEFAULT 0,
                    summary TEXT,
                    in_progress INTEGER NOT NULL DEFAULT 0,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS sync_tombstones (
                    uuid TEXT NOT NULL,
                    server_id TEXT,
                    deleted_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_tombstones_uuid ON sync_tombstones(uuid);

                CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    // Expects columns in table order:
    // 0: id, 1: uuid, 2: content, 3: created_at, 4: timezone, 5: server_id,
    // 6: praise, 7: praise_cards, 8: tags, 9: favorite, 10: synced,
    // 11: sync_error, 12: offline_praise, 13: updated_at
    fn moment_from_row(row: &rusqlite::Row) -> rusqlite::Result<Moment> {
        let cards_json: Option<String> = row.get(7)?;
        let tags_json: String = row.get(8)?;
        Ok(Moment {
            id: row.get(0)?,
            uuid: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
            timezone: row.get(4)?,
            server_id: row.get(5)?,
            praise: row.get(6)?,
            praise_cards: cards_json.and_then(|j| serde_json::from_str(&j).ok()),
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            favorite: row.get(9)?,
            synced: row.get(10)?,
            sync_error: row.get(11)?,
            offline_praise: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn day_summary_from_row(row: &rusqlite::Row) -> rusqlite::Result<DaySummary> {
        let tags_json: String = row.get(1)?;
        Ok(DaySummary {
            date: row.get(0)?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            moment_count: row.get(2)?,
            morning: row.get(3)?,
            afternoon: row.get(4)?,
            evening: row.get(5)?,
            night: row.get(6)?,
            summary: row.get(7)?,
            in_progress: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    // --- Moments ---

    /// Insert a locally created moment. The uuid minted here is the record's
    /// identity for its whole life; the offline praise line is assigned up
    /// front so the moment has something to show before the server answers.
    pub fn insert_moment(&self, moment: &NewMoment) -> Result<Moment> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        let tags_json = serde_json::to_string(&moment.tags)?;
        let offline = offline_praise_for(&uuid);
        self.conn.execute(
            "INSERT INTO moments (uuid, content, created_at, timezone, tags, offline_praise, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![uuid, moment.content, now, moment.timezone, tags_json, offline, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_moment(id)
    }

    pub fn get_moment(&self, id: i64) -> Result<Moment> {
        self.conn
            .query_row(
                "SELECT * FROM moments WHERE id = ?1",
                params![id],
                Self::moment_from_row,
            )
            .context("Moment not found")
    }

    pub fn get_moment_by_uuid(&self, uuid: &str) -> Result<Option<Moment>> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM moments WHERE uuid = ?1",
                params![uuid],
                Self::moment_from_row,
            )
            .optional()?)
    }

    pub fn list_moments(&self, limit: Option<i64>, favorites_only: bool) -> Result<Vec<Moment>> {
        let limit = limit.unwrap_or(i64::MAX);
        let sql = if favorites_only {
            "SELECT * FROM moments WHERE favorite = 1 ORDER BY created_at DESC, id DESC LIMIT ?1"
        } else {
            "SELECT * FROM moments ORDER BY created_at DESC, id DESC LIMIT ?1"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let moments = stmt
            .query_map(params![limit], Self::moment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(moments)
    }

    pub fn delete_moment(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM moments WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Uuid and server id for a local row, used to record a tombstone before
    /// the row goes away.
    pub fn moment_identity(&self, id: i64) -> Result<Option<(String, Option<String>)>> {
        Ok(self
            .conn
            .query_row(
                "SELECT uuid, server_id FROM moments WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?)
    }

    /// Toggle the favorite flag. Bumps the LWW clock and marks the row dirty
    /// so the next sync pass pushes it.
    pub fn set_favorite(&self, id: i64, favorite: bool) -> Result<Moment> {
        let now = Local::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE moments SET favorite = ?1, updated_at = ?2, synced = 0 WHERE id = ?3",
            params![favorite, now, id],
        )?;
        if changed == 0 {
            anyhow::bail!("Moment not found");
        }
        self.get_moment(id)
    }

    // --- Sync metadata ---

    pub fn mark_synced(&self, uuid: &str, server_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE moments SET server_id = ?1, synced = 1, sync_error = NULL WHERE uuid = ?2",
            params![server_id, uuid],
        )?;
        Ok(())
    }

    /// Mark a favorite/content push as acknowledged without touching ids.
    pub fn mark_update_synced(&self, uuid: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE moments SET synced = 1, sync_error = NULL WHERE uuid = ?1",
            params![uuid],
        )?;
        Ok(())
    }

    pub fn set_sync_error(&self, uuid: &str, error: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE moments SET sync_error = ?1 WHERE uuid = ?2",
            params![error, uuid],
        )?;
        Ok(())
    }

    /// Attach server praise to a moment. Praise is server-owned and does not
    /// bump the local LWW clock.
    pub fn attach_praise(
        &self,
        uuid: &str,
        praise: &str,
        cards: Option<&[PraiseCard]>,
    ) -> Result<Moment> {
        let cards_json = cards.map(serde_json::to_string).transpose()?;
        self.conn.execute(
            "UPDATE moments SET praise = ?1, praise_cards = ?2 WHERE uuid = ?3",
            params![praise, cards_json, uuid],
        )?;
        self.get_moment_by_uuid(uuid)?
            .context("Moment not found")
    }

    /// Locally created moments that have never reached the server.
    pub fn pending_creates(&self) -> Result<Vec<Moment>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM moments WHERE synced = 0 AND server_id IS NULL ORDER BY created_at, id",
        )?;
        let moments = stmt
            .query_map([], Self::moment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(moments)
    }

    /// Moments the server knows about with unpushed local edits.
    pub fn pending_updates(&self) -> Result<Vec<Moment>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM moments WHERE synced = 0 AND server_id IS NOT NULL ORDER BY created_at, id",
        )?;
        let moments = stmt
            .query_map([], Self::moment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(moments)
    }

    // --- Remote merge ---

    /// LWW clock comparison. Local stamps carry the host's UTC offset while
    /// the server speaks Z, so the strings must be compared as instants, not
    /// bytes. Unparseable stamps fall back to byte order.
    fn remote_is_newer(remote: &str, local: &str) -> bool {
        match (
            DateTime::parse_from_rfc3339(remote),
            DateTime::parse_from_rfc3339(local),
        ) {
            (Ok(remote), Ok(local)) => remote > local,
            _ => remote > local,
        }
    }

    /// Merge a pulled page of remote moments, keyed by client uuid with
    /// last-write-wins on `updated_at`. Tombstoned uuids are never
    /// resurrected. Praise is server-owned: it is filled in even when the
    /// rest of the remote copy loses the LWW race.
    pub fn merge_remote_changes(&self, changes: &[MomentChange]) -> Result<MergeStats> {
        let mut stats = MergeStats::default();
        for change in changes {
            if validate_moment_change(change).is_err() || self.is_tombstoned(&change.uuid)? {
                stats.skipped += 1;
                continue;
            }
            let cards_json = change
                .praise_cards
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            if let Some(existing) = self.get_moment_by_uuid(&change.uuid)? {
                if Self::remote_is_newer(&change.updated_at, &existing.updated_at) {
                    let tags_json = serde_json::to_string(&change.tags)?;
                    self.conn.execute(
                        "UPDATE moments SET content = ?1, server_id = ?2, praise = ?3,
                         praise_cards = ?4, tags = ?5, favorite = ?6, synced = 1,
                         sync_error = NULL, updated_at = ?7
                         WHERE uuid = ?8",
                        params![
                            change.content,
                            change.server_id,
                            change.praise,
                            cards_json,
                            tags_json,
                            change.favorite,
                            change.updated_at,
                            change.uuid,
                        ],
                    )?;
                    stats.updated += 1;
                } else {
                    if existing.praise.is_none() {
                        if let Some(praise) = &change.praise {
                            self.attach_praise(
                                &change.uuid,
                                praise,
                                change.praise_cards.as_deref(),
                            )?;
                        }
                    }
                    // Local copy still has a server id to learn even when its
                    // edits win.
                    if existing.server_id.is_none() {
                        self.conn.execute(
                            "UPDATE moments SET server_id = ?1 WHERE uuid = ?2",
                            params![change.server_id, change.uuid],
                        )?;
                    }
                    stats.skipped += 1;
                }
            } else {
                let tags_json = serde_json::to_string(&change.tags)?;
                let offline = offline_praise_for(&change.uuid);
                self.conn.execute(
                    "INSERT INTO moments (uuid, content, created_at, timezone, server_id,
                     praise, praise_cards, tags, favorite, synced, offline_praise, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?11)",
                    params![
                        change.uuid,
                        change.content,
                        change.created_at,
                        change.timezone,
                        change.server_id,
                        change.praise,
                        cards_json,
                        tags_json,
                        change.favorite,
                        offline,
                        change.updated_at,
                    ],
                )?;
                stats.inserted += 1;
            }
        }
        Ok(stats)
    }

    // --- Tombstones ---

    pub fn record_tombstone(&self, uuid: &str, server_id: Option<&str>) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sync_tombstones (uuid, server_id, deleted_at) VALUES (?1, ?2, ?3)",
            params![uuid, server_id, now],
        )?;
        Ok(())
    }

    pub fn get_tombstones(&self) -> Result<Vec<SyncTombstone>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, server_id, deleted_at FROM sync_tombstones")?;
        let tombstones = stmt
            .query_map([], |row| {
                Ok(SyncTombstone {
                    uuid: row.get(0)?,
                    server_id: row.get(1)?,
                    deleted_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tombstones)
    }

    /// Drop a tombstone once the delete has been acknowledged remotely.
    pub fn remove_tombstone(&self, uuid: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM sync_tombstones WHERE uuid = ?1",
            params![uuid],
        )?;
        Ok(removed > 0)
    }

    pub fn is_tombstoned(&self, uuid: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sync_tombstones WHERE uuid = ?1",
            params![uuid],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // --- Day summary cache ---

    pub fn upsert_day_summary(&self, summary: &DaySummary) -> Result<()> {
        let tags_json = serde_json::to_string(&summary.tags)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO day_summaries
             (date, tags, moment_count, morning, afternoon, evening, night, summary, in_progress, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                summary.date,
                tags_json,
                summary.moment_count,
                summary.morning,
                summary.afternoon,
                summary.evening,
                summary.night,
                summary.summary,
                summary.in_progress,
                summary.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_day_summary(&self, date: &str) -> Result<Option<DaySummary>> {
        Ok(self
            .conn
            .query_row(
                "SELECT date, tags, moment_count, morning, afternoon, evening, night,
                        summary, in_progress, updated_at
                 FROM day_summaries WHERE date = ?1",
                params![date],
                Self::day_summary_from_row,
            )
            .optional()?)
    }

    pub fn list_day_summaries(&self, limit: i64) -> Result<Vec<DaySummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, tags, moment_count, morning, afternoon, evening, night,
                    summary, in_progress, updated_at
             FROM day_summaries ORDER BY date DESC LIMIT ?1",
        )?;
        let summaries = stmt
            .query_map(params![limit], Self::day_summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    // --- Stats ---

    pub fn count_moments(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM moments", [], |row| row.get(0))?)
    }

    pub fn count_favorites(&self) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM moments WHERE favorite = 1",
            [],
            |row| row.get(0),
        )?)
    }

    /// Consecutive days with at least one moment, counting back from today
    /// (a streak survives until a full day is missed, so a gap of today
    /// alone still counts yesterday's run).
    pub fn get_logging_streak(&self, today: NaiveDate) -> Result<i64> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT substr(created_at, 1, 10) AS day FROM moments ORDER BY day DESC",
        )?;
        let days: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut streak = 0;
        let mut expected = today;
        for day in days {
            let Ok(date) = NaiveDate::parse_from_str(&day, "%Y-%m-%d") else {
                continue;
            };
            if streak == 0 && date == expected - chrono::Duration::days(1) {
                expected = date;
            }
            if date == expected {
                streak += 1;
                expected = expected - chrono::Duration::days(1);
            } else if date < expected {
                break;
            }
        }
        Ok(streak)
    }

    // --- Settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM user_settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM user_settings WHERE key = ?1",
            params![key],
        )?;
        Ok(deleted > 0)
    }

    /// The per-device anonymous user id sent with every API request.
    /// Generated on first use and stable afterwards.
    pub fn get_or_create_anon_user_id(&self) -> Result<String> {
        if let Some(id) = self.get_setting("anon_user_id")? {
            return Ok(id);
        }
        let id = Uuid::new_v4().to_string();
        self.set_setting("anon_user_id", &id)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_moment(content: &str) -> NewMoment {
        NewMoment {
            content: content.to_string(),
            tags: vec!["test".to_string()],
            timezone: "UTC".to_string(),
        }
    }

    fn remote_change(uuid: &str, updated_at: &str) -> MomentChange {
        MomentChange {
            uuid: uuid.to_string(),
            server_id: format!("srv-{uuid}"),
            content: "Remote content".to_string(),
            created_at: "2026-08-27T08:00:00Z".to_string(),
            timezone: "UTC".to_string(),
            praise: Some("Well done!".to_string()),
            praise_cards: None,
            tags: vec!["remote".to_string()],
            favorite: false,
            updated_at: updated_at.to_string(),
        }
    }

    #[test]
    fn test_insert_and_get_moment() {
        let db = db();
        let moment = db.insert_moment(&new_moment("Cleaned the kitchen")).unwrap();
        assert!(!moment.uuid.is_empty());
        assert_eq!(moment.content, "Cleaned the kitchen");
        assert_eq!(moment.tags, vec!["test"]);
        assert!(!moment.synced);
        assert!(moment.server_id.is_none());
        assert!(moment.offline_praise.is_some());
        assert_eq!(moment.created_at, moment.updated_at);

        let fetched = db.get_moment(moment.id).unwrap();
        assert_eq!(fetched.uuid, moment.uuid);
    }

    #[test]
    fn test_get_moment_not_found() {
        let db = db();
        assert!(db.get_moment(999).is_err());
        assert!(db.get_moment_by_uuid("nope").unwrap().is_none());
    }

    #[test]
    fn test_list_moments_order_and_filter() {
        let db = db();
        let first = db.insert_moment(&new_moment("first")).unwrap();
        let second = db.insert_moment(&new_moment("second")).unwrap();
        db.set_favorite(first.id, true).unwrap();

        let all = db.list_moments(None, false).unwrap();
        assert_eq!(all.len(), 2);
        // Newest first; same-timestamp rows fall back to id order.
        assert_eq!(all[0].id, second.id);

        let favorites = db.list_moments(None, true).unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, first.id);

        let limited = db.list_moments(Some(1), false).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_set_favorite_marks_dirty() {
        let db = db();
        let moment = db.insert_moment(&new_moment("x")).unwrap();
        db.mark_synced(&moment.uuid, "srv-1").unwrap();
        assert!(db.get_moment(moment.id).unwrap().synced);

        let updated = db.set_favorite(moment.id, true).unwrap();
        assert!(updated.favorite);
        assert!(!updated.synced);
    }

    #[test]
    fn test_mark_synced_sets_server_id_and_clears_error() {
        let db = db();
        let moment = db.insert_moment(&new_moment("x")).unwrap();
        db.set_sync_error(&moment.uuid, "timeout").unwrap();
        db.mark_synced(&moment.uuid, "srv-9").unwrap();

        let synced = db.get_moment(moment.id).unwrap();
        assert_eq!(synced.server_id.as_deref(), Some("srv-9"));
        assert!(synced.synced);
        assert!(synced.sync_error.is_none());
    }

    #[test]
    fn test_attach_praise_with_cards() {
        let db = db();
        let moment = db.insert_moment(&new_moment("x")).unwrap();
        let cards = vec![PraiseCard {
            body: "You kept at it".to_string(),
            highlights: vec!["kept at it".to_string()],
        }];
        let updated = db
            .attach_praise(&moment.uuid, "Great persistence!", Some(&cards))
            .unwrap();
        assert_eq!(updated.praise.as_deref(), Some("Great persistence!"));
        assert_eq!(updated.praise_cards.unwrap(), cards);
    }

    #[test]
    fn test_pending_queries_split_creates_and_updates() {
        let db = db();
        let create = db.insert_moment(&new_moment("local only")).unwrap();
        let pushed = db.insert_moment(&new_moment("on server")).unwrap();
        db.mark_synced(&pushed.uuid, "srv-1").unwrap();
        db.set_favorite(pushed.id, true).unwrap();

        let creates = db.pending_creates().unwrap();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].uuid, create.uuid);

        let updates = db.pending_updates().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].uuid, pushed.uuid);
    }

    #[test]
    fn test_merge_inserts_new_remote_moment() {
        let db = db();
        let stats = db
            .merge_remote_changes(&[remote_change("r1", "2026-08-27T09:00:00Z")])
            .unwrap();
        assert_eq!(stats.inserted, 1);

        let merged = db.get_moment_by_uuid("r1").unwrap().unwrap();
        assert_eq!(merged.server_id.as_deref(), Some("srv-r1"));
        assert_eq!(merged.praise.as_deref(), Some("Well done!"));
        assert!(merged.synced);
    }

    #[test]
    fn test_merge_newer_remote_wins() {
        let db = db();
        let local = db.insert_moment(&new_moment("local text")).unwrap();
        // Remote copy with a clock far in the future wins LWW.
        let mut change = remote_change(&local.uuid, "2099-01-01T00:00:00Z");
        change.favorite = true;
        let stats = db.merge_remote_changes(&[change]).unwrap();
        assert_eq!(stats.updated, 1);

        let merged = db.get_moment(local.id).unwrap();
        assert_eq!(merged.content, "Remote content");
        assert!(merged.favorite);
        assert!(merged.synced);
        assert_eq!(merged.updated_at, "2099-01-01T00:00:00Z");
    }

    #[test]
    fn test_merge_lww_compares_instants_not_strings() {
        let db = db();
        // 10:00+02:00 is 08:00Z; the 09:30Z write is chronologically newer
        // even though it sorts earlier as a byte string.
        let mut first = remote_change("r1", "2026-08-27T10:00:00+02:00");
        first.content = "Older write".to_string();
        db.merge_remote_changes(&[first]).unwrap();

        let mut second = remote_change("r1", "2026-08-27T09:30:00Z");
        second.content = "Newer write".to_string();
        let stats = db.merge_remote_changes(&[second]).unwrap();
        assert_eq!(stats.updated, 1);

        let merged = db.get_moment_by_uuid("r1").unwrap().unwrap();
        assert_eq!(merged.content, "Newer write");

        // And the reverse: 07:00Z predates 08:00Z, so it must lose even
        // though "2026-08-27T09:00:00+09:00" sorts after "...T07:00:00Z".
        let mut third = remote_change("r1", "2026-08-27T09:00:00+09:00");
        third.content = "Stale write".to_string();
        let stats = db.merge_remote_changes(&[third]).unwrap();
        assert_eq!(stats.skipped, 1);
        let kept = db.get_moment_by_uuid("r1").unwrap().unwrap();
        assert_eq!(kept.content, "Newer write");
    }

    #[test]
    fn test_merge_offset_remote_against_local_row() {
        let db = db();
        // Local rows are stamped with the host offset; a remote copy in a
        // different offset must still win or lose on the instant.
        let local = db.insert_moment(&new_moment("local text")).unwrap();

        let mut stale = remote_change(&local.uuid, "2000-01-01T00:00:00-05:00");
        stale.content = "From the past".to_string();
        let stats = db.merge_remote_changes(&[stale]).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(db.get_moment(local.id).unwrap().content, "local text");

        let mut future = remote_change(&local.uuid, "2099-01-01T00:00:00+09:00");
        future.content = "From the future".to_string();
        let stats = db.merge_remote_changes(&[future]).unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(db.get_moment(local.id).unwrap().content, "From the future");
    }

    #[test]
    fn test_merge_older_remote_keeps_local_but_fills_praise() {
        let db = db();
        let local = db.insert_moment(&new_moment("local text")).unwrap();
        let change = remote_change(&local.uuid, "2000-01-01T00:00:00Z");
        let stats = db.merge_remote_changes(&[change]).unwrap();
        assert_eq!(stats.skipped, 1);

        let merged = db.get_moment(local.id).unwrap();
        // Local content and clock survive, but server id and praise land.
        assert_eq!(merged.content, "local text");
        assert_eq!(merged.server_id.as_deref(), Some(&format!("srv-{}", local.uuid)[..]));
        assert_eq!(merged.praise.as_deref(), Some("Well done!"));
    }

    #[test]
    fn test_merge_never_resurrects_tombstoned_uuid() {
        let db = db();
        let local = db.insert_moment(&new_moment("doomed")).unwrap();
        db.record_tombstone(&local.uuid, None).unwrap();
        db.delete_moment(local.id).unwrap();

        let stats = db
            .merge_remote_changes(&[remote_change(&local.uuid, "2099-01-01T00:00:00Z")])
            .unwrap();
        assert_eq!(stats.skipped, 1);
        assert!(db.get_moment_by_uuid(&local.uuid).unwrap().is_none());
    }

    #[test]
    fn test_merge_skips_invalid_changes() {
        let db = db();
        let mut change = remote_change("bad", "2026-08-27T09:00:00Z");
        change.created_at = "not-a-date".to_string();
        let stats = db.merge_remote_changes(&[change]).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(db.count_moments().unwrap(), 0);
    }

    #[test]
    fn test_tombstone_lifecycle() {
        let db = db();
        let moment = db.insert_moment(&new_moment("bye")).unwrap();
        let (uuid, server_id) = db.moment_identity(moment.id).unwrap().unwrap();
        assert!(server_id.is_none());
        db.record_tombstone(&uuid, server_id.as_deref()).unwrap();
        db.delete_moment(moment.id).unwrap();

        assert!(db.is_tombstoned(&uuid).unwrap());
        let tombstones = db.get_tombstones().unwrap();
        assert_eq!(tombstones.len(), 1);
        assert_eq!(tombstones[0].uuid, uuid);

        assert!(db.remove_tombstone(&uuid).unwrap());
        assert!(!db.is_tombstoned(&uuid).unwrap());
        assert!(!db.remove_tombstone(&uuid).unwrap());
    }

    #[test]
    fn test_day_summary_cache_upsert_replaces() {
        let db = db();
        let mut summary = DaySummary {
            date: "2026-08-27".to_string(),
            moment_count: 2,
            tags: vec!["health".to_string()],
            morning: 1,
            afternoon: 1,
            evening: 0,
            night: 0,
            summary: None,
            in_progress: true,
            updated_at: "2026-08-27T12:00:00Z".to_string(),
        };
        db.upsert_day_summary(&summary).unwrap();

        summary.moment_count = 3;
        summary.in_progress = false;
        summary.summary = Some("A good day.".to_string());
        db.upsert_day_summary(&summary).unwrap();

        let cached = db.get_day_summary("2026-08-27").unwrap().unwrap();
        assert_eq!(cached.moment_count, 3);
        assert!(!cached.in_progress);
        assert_eq!(cached.summary.as_deref(), Some("A good day."));
        assert_eq!(cached.tags, vec!["health"]);

        assert!(db.get_day_summary("2026-01-01").unwrap().is_none());
        assert_eq!(db.list_day_summaries(10).unwrap().len(), 1);
    }

    #[test]
    fn test_counts() {
        let db = db();
        let a = db.insert_moment(&new_moment("a")).unwrap();
        db.insert_moment(&new_moment("b")).unwrap();
        db.set_favorite(a.id, true).unwrap();
        assert_eq!(db.count_moments().unwrap(), 2);
        assert_eq!(db.count_favorites().unwrap(), 1);
    }

    #[test]
    fn test_logging_streak_today() {
        let db = db();
        db.insert_moment(&new_moment("today")).unwrap();
        let today = Local::now().date_naive();
        assert_eq!(db.get_logging_streak(today).unwrap(), 1);
    }

    #[test]
    fn test_logging_streak_empty() {
        let db = db();
        let today = Local::now().date_naive();
        assert_eq!(db.get_logging_streak(today).unwrap(), 0);
    }

    #[test]
    fn test_settings_roundtrip() {
        let db = db();
        assert!(db.get_setting("cursor").unwrap().is_none());
        db.set_setting("cursor", "abc").unwrap();
        assert_eq!(db.get_setting("cursor").unwrap().as_deref(), Some("abc"));
        db.set_setting("cursor", "def").unwrap();
        assert_eq!(db.get_setting("cursor").unwrap().as_deref(), Some("def"));
        assert!(db.delete_setting("cursor").unwrap());
        assert!(!db.delete_setting("cursor").unwrap());
    }

    #[test]
    fn test_open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("great.db");
        let uuid = {
            let db = Database::open(&path).unwrap();
            db.insert_moment(&new_moment("durable")).unwrap().uuid
        };
        let db = Database::open(&path).unwrap();
        let moment = db.get_moment_by_uuid(&uuid).unwrap().unwrap();
        assert_eq!(moment.content, "durable");
    }

    #[test]
    fn test_anon_user_id_is_stable() {
        let db = db();
        let first = db.get_or_create_anon_user_id().unwrap();
        let second = db.get_or_create_anon_user_id().unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
