use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use msgraph_lite::api::{connect, create_session, GraphApi, GraphRequest, GraphTransport, SessionOptions};
use serde_json::{json, Value};

/// Canned responses keyed by path, with every request recorded
#[derive(Default)]
struct StubTransport {
    objects: HashMap<String, Value>,
    collections: HashMap<String, Vec<Value>>,
    failing: Vec<String>,
    requests: Mutex<Vec<GraphRequest>>,
}

impl StubTransport {
    fn signed_in() -> Self {
        Self::default().object("/me", json!({ "id": "u1", "displayName": "Ada Lovelace" }))
    }

    fn object(mut self, path: &str, value: Value) -> Self {
        self.objects.insert(path.to_string(), value);
        self
    }

    fn collection(mut self, path: &str, items: Vec<Value>) -> Self {
        self.collections.insert(path.to_string(), items);
        self
    }

    fn failing(mut self, path: &str) -> Self {
        self.failing.push(path.to_string());
        self
    }

    fn record(&self, request: &GraphRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.path) {
            return Err(anyhow!("503 Service Unavailable - try later"));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphTransport for StubTransport {
    async fn get_object(&self, request: &GraphRequest) -> Result<Value> {
        self.record(request)?;
        Ok(self.objects.get(&request.path).cloned().unwrap_or(Value::Null))
    }

    async fn get_collection(&self, request: &GraphRequest) -> Result<Vec<Value>> {
        self.record(request)?;
        self.collections
            .get(&request.path)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found - {}", request.path))
    }
}

async fn session(stub: StubTransport) -> GraphApi<StubTransport> {
    connect(stub).await.expect("verification should succeed")
}

fn requests(api: &GraphApi<StubTransport>) -> Vec<GraphRequest> {
    api.transport().requests.lock().unwrap().clone()
}

fn message(id: &str, is_read: Option<bool>) -> Value {
    let mut value = json!({ "id": id, "body": { "contentType": "text", "content": id } });
    if let Some(is_read) = is_read {
        value["isRead"] = json!(is_read);
    }
    value
}

fn event(id: &str, start: &str, end: &str) -> Value {
    json!({
        "id": id,
        "subject": id,
        "start": { "dateTime": start, "timeZone": "UTC" },
        "end": { "dateTime": end, "timeZone": "UTC" },
    })
}

#[tokio::test]
async fn test_connect_fetches_profile_once() {
    let api = session(StubTransport::signed_in()).await;
    let sent = requests(&api);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].path, "/me");
}

#[tokio::test]
async fn test_connect_rejects_failed_verification() {
    let err = connect(StubTransport::default().failing("/me"))
        .await
        .err()
        .unwrap();
    assert!(err.is_authorization());
    let text = err.to_string();
    assert!(text.contains("authentication verification failed"));
    assert!(text.contains("503 Service Unavailable"));
}

#[tokio::test]
async fn test_connect_rejects_missing_or_blank_name() {
    let err = connect(StubTransport::default()).await.err().unwrap();
    assert!(err.is_authorization());

    let blank = StubTransport::default().object("/me", json!({ "id": "u1", "displayName": "  " }));
    assert!(connect(blank).await.err().unwrap().is_authorization());

    let nameless = StubTransport::default().object("/me", json!({ "id": "u1" }));
    assert!(connect(nameless).await.err().unwrap().is_authorization());
}

#[tokio::test]
async fn test_invalid_scopes_fail_for_either_flow() {
    for interactive in [false, true] {
        for scopes in [vec![], vec!["mail".to_string(), "contacts".to_string()]] {
            let options = SessionOptions {
                client_id: Some("client".to_string()),
                tenant_id: Some("tenant".to_string()),
                interactive,
                scopes,
                ..SessionOptions::default()
            };
            let err = create_session(&options).await.err().unwrap();
            assert!(err.is_authorization());
            assert!(err.to_string().contains("invalid scopes"));
        }
    }
}

#[tokio::test]
async fn test_user_info_returns_all_fields() {
    let stub = StubTransport::default().object(
        "/me",
        json!({
            "id": "u1",
            "displayName": "Ada Lovelace",
            "jobTitle": null,
            "businessPhones": ["+44 20 0000 0000"],
        }),
    );
    let api = session(stub).await;

    let profile = api.get_user_info().await.unwrap();
    assert_eq!(profile["displayName"], "Ada Lovelace");
    assert_eq!(profile["jobTitle"], Value::Null);
    assert_eq!(profile["businessPhones"][0], "+44 20 0000 0000");
}

#[tokio::test]
async fn test_channel_messages_fan_out() {
    let stub = StubTransport::signed_in()
        .collection("/me/joinedTeams", vec![json!({ "id": "t1" }), json!({ "id": "t2" })])
        .collection("/teams/t1/channels", vec![json!({ "id": "c1" }), json!({ "id": "c2" })])
        .collection("/teams/t2/channels", vec![json!({ "id": "c3" })])
        .collection("/teams/t1/channels/c1/messages", vec![message("m1", None)])
        .collection(
            "/teams/t1/channels/c2/messages",
            vec![message("m2", None), message("m3", None)],
        )
        .collection("/teams/t2/channels/c3/messages", vec![]);
    let api = session(stub).await;

    let by_team = api.get_teams_channel_messages().await.unwrap();
    assert_eq!(by_team.len(), 2);
    let ids: Vec<&str> = by_team["t1"].iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
    assert!(by_team["t2"].is_empty());

    assert!(requests(&api).iter().all(|r| r.filter.is_none()));
}

#[tokio::test]
async fn test_two_teams_with_two_channels_each() {
    let stub = StubTransport::signed_in()
        .collection("/me/joinedTeams", vec![json!({ "id": "t1" }), json!({ "id": "t2" })])
        .collection("/teams/t1/channels", vec![json!({ "id": "a" }), json!({ "id": "b" })])
        .collection("/teams/t2/channels", vec![json!({ "id": "a" }), json!({ "id": "b" })])
        .collection("/teams/t1/channels/a/messages", vec![message("t1a1", None)])
        .collection("/teams/t1/channels/b/messages", vec![message("t1b1", None)])
        .collection(
            "/teams/t2/channels/a/messages",
            vec![message("t2a1", None), message("t2a2", None)],
        )
        .collection(
            "/teams/t2/channels/b/messages",
            vec![message("t2b1", None), message("t2b2", None)],
        );
    let api = session(stub).await;

    let by_team = api.get_teams_channel_messages().await.unwrap();
    assert_eq!(by_team.keys().collect::<Vec<_>>(), vec!["t1", "t2"]);
    let ids = |team: &str| -> Vec<String> { by_team[team].iter().map(|m| m.id.clone()).collect() };
    assert_eq!(ids("t1"), vec!["t1a1", "t1b1"]);
    assert_eq!(ids("t2"), vec!["t2a1", "t2a2", "t2b1", "t2b2"]);

    // joinedTeams, 2 channel listings, 4 message listings, plus the profile check
    assert_eq!(requests(&api).len(), 8);
}

#[tokio::test]
async fn test_unread_channel_messages_filter_only_messages() {
    let stub = StubTransport::signed_in()
        .collection("/me/joinedTeams", vec![json!({ "id": "t1" })])
        .collection("/teams/t1/channels", vec![json!({ "id": "c1" })])
        .collection("/teams/t1/channels/c1/messages", vec![message("m1", None)]);
    let api = session(stub).await;

    api.get_unread_teams_channel_messages().await.unwrap();

    for request in requests(&api) {
        if request.path.ends_with("/messages") {
            assert_eq!(request.filter.as_deref(), Some("isRead eq false"));
        } else {
            assert_eq!(request.filter, None);
        }
    }
}

#[tokio::test]
async fn test_channel_fan_out_failure_discards_partial_results() {
    let stub = StubTransport::signed_in()
        .collection("/me/joinedTeams", vec![json!({ "id": "t1" }), json!({ "id": "t2" })])
        .collection("/teams/t1/channels", vec![json!({ "id": "c1" })])
        .collection("/teams/t1/channels/c1/messages", vec![message("m1", None)])
        .failing("/teams/t2/channels");
    let api = session(stub).await;

    let err = api.get_teams_channel_messages().await.unwrap_err();
    assert!(err.is_request());
    let text = err.to_string();
    assert!(text.starts_with("Failed to get Teams messages"));
    assert!(text.contains("503"));
}

#[tokio::test]
async fn test_chat_id_is_encoded_as_one_segment() {
    let stub = StubTransport::signed_in().collection(
        "/me/chats/19%3Aabc%40thread.v2/messages",
        vec![message("m1", Some(true))],
    );
    let api = session(stub).await;

    let messages = api.get_teams_chat_messages("19:abc@thread.v2").await.unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn test_unread_chat_messages_are_filtered_locally() {
    let stub = StubTransport::signed_in()
        .collection("/me/chats", vec![json!({ "id": "a" }), json!({ "id": "b" })])
        .collection(
            "/me/chats/a/messages",
            vec![
                message("read", Some(true)),
                message("unread-1", Some(false)),
                message("unknown", None),
                message("unread-2", Some(false)),
            ],
        )
        .collection("/me/chats/b/messages", vec![message("read", Some(true))]);
    let api = session(stub).await;

    let by_chat = api.get_all_unread_teams_chat_messages().await.unwrap();
    let ids: Vec<&str> = by_chat["a"].iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["unread-1", "unread-2"]);
    assert!(by_chat["b"].is_empty());

    assert!(requests(&api).iter().all(|r| r.filter.is_none()));
}

#[tokio::test]
async fn test_chat_failure_is_request_error() {
    let api = session(StubTransport::signed_in().failing("/me/chats")).await;
    let err = api.get_all_teams_chats().await.unwrap_err();
    assert!(err.is_request());
    assert!(err.to_string().starts_with("Failed to get chats"));
}

#[tokio::test]
async fn test_emails_use_all_messages() {
    let stub = StubTransport::signed_in().collection(
        "/me/messages",
        vec![json!({ "id": "e1", "subject": "Hi", "isRead": true })],
    );
    let api = session(stub).await;

    let emails = api.get_outlook_emails().await.unwrap();
    assert_eq!(emails[0].subject.as_deref(), Some("Hi"));
    assert_eq!(requests(&api).last().unwrap().filter, None);
}

#[tokio::test]
async fn test_unread_emails_come_from_inbox() {
    let stub = StubTransport::signed_in().collection(
        "/me/mailFolders/inbox/messages",
        vec![json!({ "id": "e1", "isRead": false })],
    );
    let api = session(stub).await;

    let emails = api.get_unread_outlook_emails().await.unwrap();
    assert_eq!(emails.len(), 1);

    let last = requests(&api).pop().unwrap();
    assert_eq!(last.path, "/me/mailFolders/inbox/messages");
    assert_eq!(last.filter.as_deref(), Some("isRead eq false"));
}

#[tokio::test]
async fn test_email_failure_is_request_error() {
    let api = session(StubTransport::signed_in()).await;
    let err = api.get_outlook_emails().await.unwrap_err();
    assert!(err.is_request());
    assert!(err.to_string().contains("Failed to get emails"));
}

#[tokio::test]
async fn test_todays_events_request_a_day_window() {
    let stub = StubTransport::signed_in().collection("/me/calendar/calendarView", vec![]);
    let api = session(stub).await;

    let before = Utc::now();
    let events = api.get_todays_calendar_events().await.unwrap();
    assert!(events.is_empty());

    let last = requests(&api).pop().unwrap();
    let (start, end) = last.range.unwrap();
    assert!(start >= before - Duration::seconds(1));
    assert_eq!(end - start, Duration::hours(24));
}

#[tokio::test]
async fn test_todays_events_drop_what_the_service_over_returns() {
    let at = |offset: Duration| (Utc::now() + offset).to_rfc3339();
    let stub = StubTransport::signed_in().collection(
        "/me/calendar/calendarView",
        vec![
            event("soon", &at(Duration::hours(1)), &at(Duration::hours(2))),
            event("last-week", &at(Duration::days(-3)), &at(Duration::days(-3) + Duration::hours(1))),
            event("next-week", &at(Duration::days(3)), &at(Duration::days(3) + Duration::hours(1))),
        ],
    );
    let api = session(stub).await;

    let events = api.get_todays_calendar_events().await.unwrap();
    let ids: Vec<&str> = events.iter().filter_map(|e| e.id.as_deref()).collect();
    assert_eq!(ids, vec!["soon"]);
}

#[tokio::test]
async fn test_events_between_drops_events_outside_window() {
    let stub = StubTransport::signed_in().collection(
        "/me/calendar/calendarView",
        vec![
            event("inside", "2024-05-01T10:00:00.0000000", "2024-05-01T11:00:00.0000000"),
            event("spans-start", "2024-05-01T07:00:00.0000000", "2024-05-01T09:30:00.0000000"),
            event("before", "2024-04-30T10:00:00.0000000", "2024-04-30T11:00:00.0000000"),
            event("ends-at-start", "2024-05-01T08:00:00.0000000", "2024-05-01T09:00:00.0000000"),
            event("after", "2024-05-02T10:00:00.0000000", "2024-05-02T11:00:00.0000000"),
        ],
    );
    let api = session(stub).await;

    let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
    let events = api.get_calendar_events_between(start, end).await.unwrap();

    let ids: Vec<&str> = events.iter().filter_map(|e| e.id.as_deref()).collect();
    assert_eq!(ids, vec!["inside", "spans-start"]);

    let last = requests(&api).pop().unwrap();
    assert_eq!(last.range, Some((start, end)));
    assert_eq!(
        last.url("https://graph.microsoft.com/v1.0"),
        "https://graph.microsoft.com/v1.0/me/calendar/calendarView?startDateTime=2024-05-01T09%3A00%3A00Z&endDateTime=2024-05-02T09%3A00%3A00Z"
    );
}

#[tokio::test]
async fn test_all_events_have_no_window() {
    let stub = StubTransport::signed_in().collection(
        "/me/events",
        vec![event("old", "2001-01-01T00:00:00Z", "2001-01-01T01:00:00Z")],
    );
    let api = session(stub).await;

    let events = api.get_all_calendar_events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(requests(&api).pop().unwrap().range, None);
}

#[tokio::test]
async fn test_calendar_failure_is_request_error() {
    let api = session(StubTransport::signed_in().failing("/me/calendar/calendarView")).await;
    let err = api.get_todays_calendar_events().await.unwrap_err();
    assert!(err.is_request());
    assert!(err.to_string().starts_with("Failed to get todays calendar events"));
}
