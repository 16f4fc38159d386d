use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

/// A single logged moment. The client-generated `uuid` is the one stable
/// identity for the record and is what local and remote copies reconcile on;
/// `server_id` is filled in once the create-on-server call succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moment {
    pub id: i64,
    pub uuid: String,
    pub content: String,
    pub created_at: String,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub praise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub praise_cards: Option<Vec<PraiseCard>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub favorite: bool,
    // Local-only sync metadata
    pub synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_praise: Option<String>,
    #[serde(default)]
    pub updated_at: String,
}

impl Moment {
    /// Praise to show: server praise if we have it, canned fallback otherwise.
    #[must_use]
    pub fn display_praise(&self) -> Option<&str> {
        self.praise.as_deref().or(self.offline_praise.as_deref())
    }

    /// Calendar date of the moment in the client's local clock.
    #[must_use]
    pub fn local_date(&self) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.date_naive())
    }
}

/// A structured praise segment with optional highlighted phrases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PraiseCard {
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewMoment {
    pub content: String,
    pub tags: Vec<String>,
    pub timezone: String,
}

/// Remote state of a moment after wire conversion, keyed by the client UUID.
/// Consumed by the merge path in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentChange {
    pub uuid: String,
    pub server_id: String,
    pub content: String,
    pub created_at: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub praise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub praise_cards: Option<Vec<PraiseCard>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub updated_at: String,
}

/// Server-computed daily aggregate, consumed read-only and cached locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: String,
    pub moment_count: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub morning: i64,
    pub afternoon: i64,
    pub evening: i64,
    pub night: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub in_progress: bool,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTombstone {
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub server_id: Option<String>,
    pub deleted_at: String,
}

/// Result of merging a pulled page into the local store.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MergeStats {
    pub inserted: i64,
    pub updated: i64,
    pub skipped: i64,
}

/// Outcome of a sync pass over pending local changes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub pushed: i64,
    pub updated: i64,
    pub deleted: i64,
    pub failed: i64,
    pub restricted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

/// Moments grouped under one local calendar date, newest date first.
#[derive(Debug, Clone, Serialize)]
pub struct DayGroup {
    pub date: String,
    pub moments: Vec<Moment>,
}

pub const MAX_CONTENT_LEN: usize = 280;
pub const MAX_TAG_LEN: usize = 40;

pub fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        bail!("Moment content must not be empty");
    }
    if trimmed.chars().count() > MAX_CONTENT_LEN {
        bail!("Moment content must be at most {MAX_CONTENT_LEN} characters");
    }
    Ok(trimmed.to_string())
}

pub fn validate_tag(tag: &str) -> Result<String> {
    let lower = tag.trim().to_lowercase();
    if lower.is_empty() {
        bail!("Tag must not be empty");
    }
    if lower.chars().count() > MAX_TAG_LEN {
        bail!("Tag must be at most {MAX_TAG_LEN} characters");
    }
    Ok(lower)
}

pub fn validate_timezone(tz: &str) -> Result<String> {
    let trimmed = tz.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        bail!("Invalid timezone '{tz}'");
    }
    Ok(trimmed.to_string())
}

/// Validate a moment change arriving from the sync boundary: reconcile
/// identity, non-empty content, RFC 3339 timestamps.
pub fn validate_moment_change(change: &MomentChange) -> Result<()> {
    if change.uuid.trim().is_empty() {
        bail!("Moment change is missing a client uuid");
    }
    if change.server_id.trim().is_empty() {
        bail!("Moment change is missing a server id");
    }
    validate_content(&change.content)?;
    DateTime::parse_from_rfc3339(&change.created_at).map_err(|_| {
        anyhow::anyhow!(
            "Invalid created_at '{}'. Must be RFC 3339 format",
            change.created_at
        )
    })?;
    if !change.updated_at.is_empty() {
        DateTime::parse_from_rfc3339(&change.updated_at).map_err(|_| {
            anyhow::anyhow!(
                "Invalid updated_at '{}'. Must be RFC 3339 format",
                change.updated_at
            )
        })?;
    }
    Ok(())
}

/// Time-of-day bucket for an hour of the local clock.
#[must_use]
pub fn bucket_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=21 => "evening",
        _ => "night",
    }
}

/// Group moments by their local calendar date, preserving input order.
/// Moments whose timestamp fails to parse are grouped by their raw date
/// prefix.
#[must_use]
pub fn group_by_date(moments: Vec<Moment>) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();
    for moment in moments {
        let date = moment.local_date().map_or_else(
            || moment.created_at.chars().take(10).collect(),
            |d| d.format("%Y-%m-%d").to_string(),
        );
        match groups.last_mut() {
            Some(group) if group.date == date => group.moments.push(moment),
            _ => groups.push(DayGroup {
                date,
                moments: vec![moment],
            }),
        }
    }
    groups
}

/// Build a client-side day summary from local moments, for offline display
/// when no server-computed summary has been cached. Always in progress:
/// finalized summaries only come from the server.
#[must_use]
pub fn local_day_summary(date: NaiveDate, moments: &[Moment]) -> DaySummary {
    let mut summary = DaySummary {
        date: date.format("%Y-%m-%d").to_string(),
        moment_count: 0,
        tags: Vec::new(),
        morning: 0,
        afternoon: 0,
        evening: 0,
        night: 0,
        summary: None,
        in_progress: true,
        updated_at: String::new(),
    };
    for moment in moments {
        if moment.local_date() != Some(date) {
            continue;
        }
        summary.moment_count += 1;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&moment.created_at) {
            match bucket_for_hour(dt.hour()) {
                "morning" => summary.morning += 1,
                "afternoon" => summary.afternoon += 1,
                "evening" => summary.evening += 1,
                _ => summary.night += 1,
            }
        }
        for tag in &moment.tags {
            if !summary.tags.contains(tag) {
                summary.tags.push(tag.clone());
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_moment(uuid: &str, created_at: &str) -> Moment {
        Moment {
            id: 0,
            uuid: uuid.to_string(),
            content: "Did a thing".to_string(),
            created_at: created_at.to_string(),
            timezone: "UTC".to_string(),
            server_id: None,
            praise: None,
            praise_cards: None,
            tags: Vec::new(),
            favorite: false,
            synced: false,
            sync_error: None,
            offline_praise: None,
            updated_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_validate_content_trims() {
        assert_eq!(validate_content("  made my bed  ").unwrap(), "made my bed");
    }

    #[test]
    fn test_validate_content_empty() {
        assert!(validate_content("").is_err());
        assert!(validate_content("   ").is_err());
    }

    #[test]
    fn test_validate_content_too_long() {
        let long = "x".repeat(MAX_CONTENT_LEN + 1);
        assert!(validate_content(&long).is_err());
        let ok = "x".repeat(MAX_CONTENT_LEN);
        assert!(validate_content(&ok).is_ok());
    }

    #[test]
    fn test_validate_tag_normalizes() {
        assert_eq!(validate_tag(" Work ").unwrap(), "work");
        assert!(validate_tag("").is_err());
        assert!(validate_tag(&"t".repeat(MAX_TAG_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_timezone() {
        assert_eq!(
            validate_timezone("America/New_York").unwrap(),
            "America/New_York"
        );
        assert!(validate_timezone("").is_err());
        assert!(validate_timezone("not a zone").is_err());
    }

    #[test]
    fn test_validate_moment_change() {
        let mut change = MomentChange {
            uuid: "c-1".to_string(),
            server_id: "s-1".to_string(),
            content: "Went for a run".to_string(),
            created_at: "2026-08-27T09:30:00Z".to_string(),
            timezone: "UTC".to_string(),
            praise: None,
            praise_cards: None,
            tags: Vec::new(),
            favorite: false,
            updated_at: "2026-08-27T09:30:05Z".to_string(),
        };
        assert!(validate_moment_change(&change).is_ok());

        change.created_at = "not-a-date".to_string();
        assert!(validate_moment_change(&change).is_err());
    }

    #[test]
    fn test_validate_moment_change_missing_ids() {
        let change = MomentChange {
            uuid: String::new(),
            server_id: "s-1".to_string(),
            content: "x".to_string(),
            created_at: "2026-08-27T09:30:00Z".to_string(),
            timezone: String::new(),
            praise: None,
            praise_cards: None,
            tags: Vec::new(),
            favorite: false,
            updated_at: String::new(),
        };
        assert!(validate_moment_change(&change).is_err());
    }

    #[test]
    fn test_bucket_for_hour() {
        assert_eq!(bucket_for_hour(7), "morning");
        assert_eq!(bucket_for_hour(13), "afternoon");
        assert_eq!(bucket_for_hour(19), "evening");
        assert_eq!(bucket_for_hour(23), "night");
        assert_eq!(bucket_for_hour(2), "night");
    }

    #[test]
    fn test_group_by_date() {
        let moments = vec![
            sample_moment("a", "2026-08-27T18:00:00Z"),
            sample_moment("b", "2026-08-27T09:00:00Z"),
            sample_moment("c", "2026-08-26T12:00:00Z"),
        ];
        let groups = group_by_date(moments);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, "2026-08-27");
        assert_eq!(groups[0].moments.len(), 2);
        assert_eq!(groups[1].date, "2026-08-26");
    }

    #[test]
    fn test_local_day_summary_buckets_and_tags() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 27).unwrap();
        let mut morning = sample_moment("a", "2026-08-27T08:00:00Z");
        morning.tags = vec!["health".to_string()];
        let mut evening = sample_moment("b", "2026-08-27T19:30:00Z");
        evening.tags = vec!["health".to_string(), "work".to_string()];
        let other_day = sample_moment("c", "2026-08-26T19:30:00Z");

        let summary = local_day_summary(date, &[morning, evening, other_day]);
        assert_eq!(summary.moment_count, 2);
        assert_eq!(summary.morning, 1);
        assert_eq!(summary.evening, 1);
        assert_eq!(summary.night, 0);
        assert_eq!(summary.tags, vec!["health", "work"]);
        assert!(summary.in_progress);
    }

    #[test]
    fn test_display_praise_prefers_server() {
        let mut m = sample_moment("a", "2026-08-27T08:00:00Z");
        m.offline_praise = Some("Nice job.".to_string());
        assert_eq!(m.display_praise(), Some("Nice job."));
        m.praise = Some("That took real discipline!".to_string());
        assert_eq!(m.display_praise(), Some("That took real discipline!"));
    }
}
