use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use crate::api::{CreateMomentRequest, RemoteMoment, TimelineResponse, UserStats, remote_to_change};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::{
    DaySummary, MergeStats, Moment, NewMoment, SyncReport, local_day_summary, validate_content,
    validate_tag, validate_timezone,
};

const SETTING_TIMELINE_CURSOR: &str = "timeline_cursor";
const SETTING_POSTING_RESTRICTED: &str = "posting_restricted";

/// Remote praise API as the service sees it. The HTTP client in the CLI
/// implements this; tests swap in a mock.
pub trait PraiseApi {
    fn create_moment(&self, request: &CreateMomentRequest) -> Result<RemoteMoment, ApiError>;
    fn get_moment(&self, server_id: &str) -> Result<RemoteMoment, ApiError>;
    fn timeline(&self, cursor: Option<&str>, limit: i64) -> Result<TimelineResponse, ApiError>;
    fn set_favorite(&self, server_id: &str, favorite: bool) -> Result<RemoteMoment, ApiError>;
    fn delete_moment(&self, server_id: &str) -> Result<(), ApiError>;
    fn day_summaries(&self, limit: i64) -> Result<Vec<DaySummary>, ApiError>;
    fn user_stats(&self) -> Result<UserStats, ApiError>;
    fn send_feedback(&self, message: &str) -> Result<(), ApiError>;
}

/// What happened to one moment on a push attempt.
#[derive(Debug)]
pub enum PushOutcome {
    /// Created on the server; the moment now carries its server id.
    Synced(Moment),
    /// The server refused with the daily posting limit. The moment stays
    /// local and posting is flagged restricted.
    Restricted(Moment),
    /// Transient failure; the moment stays queued for the next sync pass.
    Deferred(Moment, ApiError),
}

pub struct MomentService {
    db: Database,
}

impl MomentService {
    pub fn new(db_path: &Path) -> Result<Self> {
        Ok(Self {
            db: Database::open(db_path)?,
        })
    }

    pub fn new_in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
        })
    }

    /// Log a moment locally. Always succeeds offline; pushing to the server
    /// is a separate step.
    pub fn log_moment(&self, content: &str, tags: &[String], timezone: &str) -> Result<Moment> {
        let content = validate_content(content)?;
        let mut clean_tags = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = validate_tag(tag)?;
            if !clean_tags.contains(&tag) {
                clean_tags.push(tag);
            }
        }
        let timezone = validate_timezone(timezone)?;
        self.db.insert_moment(&NewMoment {
            content,
            tags: clean_tags,
            timezone,
        })
    }

    pub fn get_moment(&self, id: i64) -> Result<Moment> {
        self.db.get_moment(id)
    }

    pub fn list_moments(&self, limit: Option<i64>, favorites_only: bool) -> Result<Vec<Moment>> {
        self.db.list_moments(limit, favorites_only)
    }

    /// Push one locally created moment to the server.
    pub fn push_moment(&self, api: &dyn PraiseApi, moment: &Moment) -> Result<PushOutcome> {
        let request = CreateMomentRequest {
            client_uuid: moment.uuid.clone(),
            content: moment.content.clone(),
            created_at: moment.created_at.clone(),
            timezone: moment.timezone.clone(),
            tags: moment.tags.clone(),
        };
        match api.create_moment(&request) {
            Ok(remote) => {
                self.db.mark_synced(&moment.uuid, &remote.id)?;
                if let Some(praise) = remote.praise.filter(|p| !p.is_empty()) {
                    self.db.attach_praise(
                        &moment.uuid,
                        &praise,
                        remote.praise_cards.as_deref(),
                    )?;
                }
                Ok(PushOutcome::Synced(self.db.get_moment(moment.id)?))
            }
            Err(ApiError::LimitReached) => {
                self.set_posting_restricted(true)?;
                self.db
                    .set_sync_error(&moment.uuid, &ApiError::LimitReached.to_string())?;
                Ok(PushOutcome::Restricted(self.db.get_moment(moment.id)?))
            }
            Err(e) if e.is_retryable() => {
                self.db.set_sync_error(&moment.uuid, &e.to_string())?;
                Ok(PushOutcome::Deferred(self.db.get_moment(moment.id)?, e))
            }
            Err(e) => {
                self.db.set_sync_error(&moment.uuid, &e.to_string())?;
                Err(e.into())
            }
        }
    }

    /// One poll step while waiting for praise enrichment. Returns the
    /// updated moment once praise has landed, `None` while the server is
    /// still thinking (or has forgotten the moment).
    pub fn fetch_praise(&self, api: &dyn PraiseApi, moment: &Moment) -> Result<Option<Moment>> {
        let Some(server_id) = &moment.server_id else {
            return Ok(None);
        };
        match api.get_moment(server_id) {
            Ok(remote) => {
                if let Some(praise) = remote.praise.filter(|p| !p.is_empty()) {
                    let updated = self.db.attach_praise(
                        &moment.uuid,
                        &praise,
                        remote.praise_cards.as_deref(),
                    )?;
                    Ok(Some(updated))
                } else {
                    Ok(None)
                }
            }
            Err(ApiError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Work through everything pending: tombstoned deletes first, then
    /// queued creates, then dirty favorite edits. A limit-reached answer
    /// stops further creates for this pass.
    pub fn sync_pending(&self, api: &dyn PraiseApi) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        for tombstone in self.db.get_tombstones()? {
            let Some(server_id) = &tombstone.server_id else {
                // Never reached the server; nothing to delete remotely.
                self.db.remove_tombstone(&tombstone.uuid)?;
                continue;
            };
            match api.delete_moment(server_id) {
                // Already gone remotely counts as done.
                Ok(()) | Err(ApiError::NotFound) => {
                    self.db.remove_tombstone(&tombstone.uuid)?;
                    report.deleted += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    report.errors.push(format!("delete {server_id}: {e}"));
                }
            }
        }

        for moment in self.db.pending_creates()? {
            if report.restricted {
                break;
            }
            match self.push_moment(api, &moment) {
                Ok(PushOutcome::Synced(_)) => report.pushed += 1,
                Ok(PushOutcome::Restricted(_)) => {
                    report.restricted = true;
                    report.failed += 1;
                }
                Ok(PushOutcome::Deferred(_, e)) => {
                    report.failed += 1;
                    report.errors.push(format!("push {}: {e}", moment.uuid));
                }
                Err(e) => {
                    report.failed += 1;
                    report.errors.push(format!("push {}: {e:#}", moment.uuid));
                }
            }
        }

        for moment in self.db.pending_updates()? {
            let Some(server_id) = &moment.server_id else {
                continue;
            };
            match api.set_favorite(server_id, moment.favorite) {
                Ok(_) => {
                    self.db.mark_update_synced(&moment.uuid)?;
                    report.updated += 1;
                }
                Err(e) => {
                    self.db.set_sync_error(&moment.uuid, &e.to_string())?;
                    report.failed += 1;
                    report.errors.push(format!("update {server_id}: {e}"));
                }
            }
        }

        Ok(report)
    }

    /// Pull the next timeline page and merge it. Returns the merge stats and
    /// whether the server flagged the posting limit on this page.
    pub fn refresh_timeline(
        &self,
        api: &dyn PraiseApi,
        limit: i64,
    ) -> Result<(MergeStats, bool)> {
        let cursor = self.db.get_setting(SETTING_TIMELINE_CURSOR)?;
        let page = api.timeline(cursor.as_deref(), limit)?;

        let changes: Vec<_> = page
            .moments
            .into_iter()
            .filter_map(remote_to_change)
            .collect();
        let stats = self.db.merge_remote_changes(&changes)?;

        match page.next_cursor {
            Some(next) => self.db.set_setting(SETTING_TIMELINE_CURSOR, &next)?,
            None => {
                self.db.delete_setting(SETTING_TIMELINE_CURSOR)?;
            }
        }
        if page.limit_reached {
            self.set_posting_restricted(true)?;
        }
        Ok((stats, page.limit_reached))
    }

    /// Forget pagination progress so the next refresh starts from the top.
    pub fn reset_timeline_cursor(&self) -> Result<()> {
        self.db.delete_setting(SETTING_TIMELINE_CURSOR)?;
        Ok(())
    }

    pub fn has_timeline_cursor(&self) -> Result<bool> {
        Ok(self.db.get_setting(SETTING_TIMELINE_CURSOR)?.is_some())
    }

    /// Pull fresh server-computed day summaries into the local cache.
    pub fn refresh_summaries(&self, api: &dyn PraiseApi, limit: i64) -> Result<usize> {
        let summaries = api.day_summaries(limit)?;
        let count = summaries.len();
        for summary in &summaries {
            self.db.upsert_day_summary(summary)?;
        }
        Ok(count)
    }

    /// Summary for one day: the cached server-computed one when present,
    /// otherwise computed from local moments (and marked in progress).
    pub fn summary_for(&self, date: NaiveDate) -> Result<DaySummary> {
        let key = date.format("%Y-%m-%d").to_string();
        if let Some(cached) = self.db.get_day_summary(&key)? {
            return Ok(cached);
        }
        let moments = self.db.list_moments(None, false)?;
        Ok(local_day_summary(date, &moments))
    }

    pub fn list_cached_summaries(&self, limit: i64) -> Result<Vec<DaySummary>> {
        self.db.list_day_summaries(limit)
    }

    /// User stats, preferring the server's numbers and falling back to
    /// locally derivable ones when it cannot be reached.
    pub fn stats(&self, api: Option<&dyn PraiseApi>) -> Result<UserStats> {
        if let Some(api) = api {
            if let Ok(stats) = api.user_stats() {
                return Ok(stats);
            }
        }
        self.local_stats()
    }

    pub fn local_stats(&self) -> Result<UserStats> {
        let moments = self.db.list_moments(None, false)?;
        let member_since = moments
            .last()
            .map(|m| m.created_at.chars().take(10).collect());
        Ok(UserStats {
            total_moments: self.db.count_moments()?,
            favorite_count: self.db.count_favorites()?,
            current_streak: self.db.get_logging_streak(Local::now().date_naive())?,
            member_since,
        })
    }

    /// Toggle the favorite flag locally, then best-effort push when an API
    /// is at hand. A failed push leaves the edit queued for the next sync.
    pub fn favorite_moment(
        &self,
        api: Option<&dyn PraiseApi>,
        id: i64,
        favorite: bool,
    ) -> Result<Moment> {
        let moment = self.db.set_favorite(id, favorite)?;
        if let (Some(api), Some(server_id)) = (api, &moment.server_id) {
            match api.set_favorite(server_id, favorite) {
                Ok(_) => self.db.mark_update_synced(&moment.uuid)?,
                Err(e) => self.db.set_sync_error(&moment.uuid, &e.to_string())?,
            }
        }
        self.db.get_moment(id)
    }

    /// Delete a moment. The tombstone is recorded before the local row goes
    /// away, so the uuid can never be resurrected by a later pull; the
    /// remote delete is attempted immediately and otherwise left to sync.
    pub fn delete_moment(&self, api: Option<&dyn PraiseApi>, id: i64) -> Result<()> {
        let (uuid, server_id) = self
            .db
            .moment_identity(id)?
            .context("Moment not found")?;
        self.db.record_tombstone(&uuid, server_id.as_deref())?;
        self.db.delete_moment(id)?;

        match (api, &server_id) {
            (Some(api), Some(server_id)) => match api.delete_moment(server_id) {
                Ok(()) | Err(ApiError::NotFound) => {
                    self.db.remove_tombstone(&uuid)?;
                }
                Err(_) => {} // stays tombstoned for the next sync pass
            },
            (_, None) => {
                self.db.remove_tombstone(&uuid)?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn pending_tombstones(&self) -> Result<i64> {
        Ok(self.db.get_tombstones()?.len() as i64)
    }

    pub fn pending_creates(&self) -> Result<Vec<Moment>> {
        self.db.pending_creates()
    }

    pub fn posting_restricted(&self) -> Result<bool> {
        Ok(self
            .db
            .get_setting(SETTING_POSTING_RESTRICTED)?
            .as_deref()
            == Some("true"))
    }

    pub fn set_posting_restricted(&self, restricted: bool) -> Result<()> {
        if restricted {
            self.db.set_setting(SETTING_POSTING_RESTRICTED, "true")
        } else {
            self.db.delete_setting(SETTING_POSTING_RESTRICTED)?;
            Ok(())
        }
    }

    pub fn anon_user_id(&self) -> Result<String> {
        self.db.get_or_create_anon_user_id()
    }
}
