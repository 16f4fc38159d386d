use serde::{Deserialize, Serialize};

use crate::models::{DaySummary, MomentChange, PraiseCard};

/// Wire types for the praise API. The HTTP client lives in the CLI crate;
/// keeping the DTOs and conversions here means they are testable without a
/// network.

#[derive(Debug, Clone, Serialize)]
pub struct CreateMomentRequest {
    pub client_uuid: String,
    pub content: String,
    pub created_at: String,
    pub timezone: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteMoment {
    pub id: String,
    #[serde(default)]
    pub client_uuid: Option<String>,
    pub content: String,
    pub created_at: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub praise: Option<String>,
    #[serde(default)]
    pub praise_cards: Option<Vec<PraiseCard>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineResponse {
    pub moments: Vec<RemoteMoment>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub limit_reached: bool,
}

// The days endpoint paginates too, but the client only ever wants the most
// recent window, so the cursor is left on the floor.
#[derive(Debug, Clone, Deserialize)]
pub struct DaySummariesResponse {
    pub summaries: Vec<DaySummary>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserStats {
    pub total_moments: i64,
    #[serde(default)]
    pub favorite_count: i64,
    #[serde(default)]
    pub current_streak: i64,
    #[serde(default)]
    pub member_since: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest {
    pub message: String,
}

/// Error envelope some endpoints return alongside a 4xx status.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Error code signalling the daily posting limit, regardless of HTTP status.
pub const LIMIT_REACHED_CODE: &str = "daily_limit_reached";

/// Convert a remote moment to the merge shape. Returns `None` when the
/// record carries no client uuid: without the client identity there is
/// nothing to reconcile against.
#[must_use]
pub fn remote_to_change(remote: RemoteMoment) -> Option<MomentChange> {
    let uuid = remote.client_uuid.filter(|u| !u.is_empty())?;
    let updated_at = remote
        .updated_at
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| remote.created_at.clone());
    Some(MomentChange {
        uuid,
        server_id: remote.id,
        content: remote.content,
        created_at: remote.created_at,
        timezone: remote.timezone.unwrap_or_default(),
        praise: remote.praise.filter(|p| !p.is_empty()),
        praise_cards: remote.praise_cards.filter(|c| !c.is_empty()),
        tags: remote.tags,
        favorite: remote.favorite,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_remote() -> RemoteMoment {
        RemoteMoment {
            id: "srv-42".to_string(),
            client_uuid: Some("c0ffee".to_string()),
            content: "Finally fixed that flaky test".to_string(),
            created_at: "2026-08-27T10:00:00Z".to_string(),
            timezone: Some("Europe/Berlin".to_string()),
            praise: Some("Persistence pays off!".to_string()),
            praise_cards: Some(vec![PraiseCard {
                body: "You stuck with a hard problem".to_string(),
                highlights: vec!["stuck with".to_string()],
            }]),
            tags: vec!["work".to_string()],
            favorite: true,
            updated_at: Some("2026-08-27T10:00:09Z".to_string()),
        }
    }

    #[test]
    fn test_remote_to_change_complete() {
        let change = remote_to_change(full_remote()).unwrap();
        assert_eq!(change.uuid, "c0ffee");
        assert_eq!(change.server_id, "srv-42");
        assert_eq!(change.praise.as_deref(), Some("Persistence pays off!"));
        assert_eq!(change.praise_cards.as_ref().unwrap().len(), 1);
        assert_eq!(change.updated_at, "2026-08-27T10:00:09Z");
        assert!(change.favorite);
    }

    #[test]
    fn test_remote_to_change_missing_client_uuid() {
        let mut r = full_remote();
        r.client_uuid = None;
        assert!(remote_to_change(r).is_none());

        let mut r2 = full_remote();
        r2.client_uuid = Some(String::new());
        assert!(remote_to_change(r2).is_none());
    }

    #[test]
    fn test_remote_to_change_defaults_updated_at() {
        let mut r = full_remote();
        r.updated_at = None;
        let change = remote_to_change(r).unwrap();
        assert_eq!(change.updated_at, "2026-08-27T10:00:00Z");
    }

    #[test]
    fn test_remote_to_change_drops_empty_praise() {
        let mut r = full_remote();
        r.praise = Some(String::new());
        r.praise_cards = Some(Vec::new());
        let change = remote_to_change(r).unwrap();
        assert!(change.praise.is_none());
        assert!(change.praise_cards.is_none());
    }

    #[test]
    fn test_timeline_response_defaults() {
        let json = r#"{"moments": []}"#;
        let page: TimelineResponse = serde_json::from_str(json).unwrap();
        assert!(page.moments.is_empty());
        assert!(page.next_cursor.is_none());
        assert!(!page.limit_reached);
    }

    #[test]
    fn test_error_body_parses_code() {
        let json = r#"{"error": "limit", "code": "daily_limit_reached"}"#;
        let body: ApiErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.code.as_deref(), Some(LIMIT_REACHED_CODE));
    }
}
