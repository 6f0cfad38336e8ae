mod common;

use common::{track_json, FakeHttpClient, Reply};
use http_types::Method;
use serde_json::json;
use tracklist_sync::{
    playlist_tracks, saved_tracks, AsyncPaginatedIterator, AuthState, BatchLimits, CatalogClient,
    RetryConfig, SyncError,
};

fn saved_item(id: &str, added_at: &str) -> serde_json::Value {
    json!({ "added_at": added_at, "track": track_json(id) })
}

fn small_pages() -> BatchLimits {
    BatchLimits {
        page_size: 2,
        ..BatchLimits::default()
    }
}

#[test_log::test(tokio::test)]
async fn test_saved_tracks_walk_offsets_until_empty_page() {
    let client = FakeHttpClient::new();
    client.route(
        Method::Get,
        "/v1/me/tracks",
        &[("offset", "0"), ("limit", "2")],
        Reply::json(json!({ "items": [
            saved_item("a", "2024-03-01T10:00:00Z"),
            saved_item("b", "2024-02-01T10:00:00Z"),
        ]})),
    );
    client.route(
        Method::Get,
        "/v1/me/tracks",
        &[("offset", "2")],
        Reply::json(json!({ "items": [saved_item("c", "2024-01-01T10:00:00Z")] })),
    );
    client.route(
        Method::Get,
        "/v1/me/tracks",
        &[("offset", "3")],
        Reply::json(json!({ "items": [] })),
    );

    let catalog = common::catalog_client(&client).with_limits(small_pages());
    catalog.authorize().await.unwrap();
    assert_eq!(catalog.auth_state().await, AuthState::Authenticated);

    let entries = saved_tracks(&catalog, None).collect_all().await.unwrap();
    let ids: Vec<_> = entries.iter().map(|e| e.track.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(entries[2].track.artist_names(), "Artist");

    let pages = client.requests_to(Method::Get, "/v1/me/tracks");
    let offsets: Vec<_> = pages.iter().filter_map(|r| r.query("offset")).collect();
    assert_eq!(offsets, vec!["0", "2", "3"]);
    assert!(pages
        .iter()
        .all(|r| r.authorization.as_deref() == Some("Bearer access-1")));
    assert_eq!(client.requests_to(Method::Post, "/api/token").len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_protected_call_requires_authorization() {
    let client = FakeHttpClient::new();
    let catalog = common::catalog_client(&client);

    match catalog.current_user().await {
        Err(SyncError::NotAuthorized(state)) => assert_eq!(state, AuthState::Unauthenticated),
        other => panic!("expected NotAuthorized, got {other:?}"),
    }
    assert!(client.requests_to(Method::Get, "/v1/me").is_empty());
}

#[test_log::test(tokio::test)]
async fn test_playlist_tracks_skip_local_and_missing_items() {
    let client = FakeHttpClient::new();
    client.route(
        Method::Get,
        "/v1/playlists/p1/tracks",
        &[("offset", "0")],
        Reply::json(json!({ "items": [
            { "added_at": "2024-01-01T00:00:00Z", "is_local": false, "track": track_json("a") },
            { "added_at": "2024-01-02T00:00:00Z", "is_local": true,
              "track": { "id": null, "uri": "spotify:local:x", "name": "x" } },
            { "added_at": "2024-01-03T00:00:00Z", "track": null },
            { "added_at": "2024-01-04T00:00:00Z", "is_local": false, "track": track_json("b") },
        ]})),
    );
    client.route(
        Method::Get,
        "/v1/playlists/p1/tracks",
        &[("offset", "4")],
        Reply::json(json!({ "items": [] })),
    );

    let catalog = common::catalog_client(&client);
    catalog.authorize().await.unwrap();

    let entries = playlist_tracks(&catalog, "p1", None).collect_all().await.unwrap();
    let ids: Vec<_> = entries.iter().map(|e| e.track.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test_log::test(tokio::test)]
async fn test_playlist_offsets_count_skipped_items() {
    let local = |n: &str| {
        json!({ "added_at": "2024-01-01T00:00:00Z", "is_local": true,
                "track": { "id": null, "uri": format!("spotify:local:{n}"), "name": n } })
    };
    let item = |id: &str| json!({ "added_at": "2024-01-01T00:00:00Z", "track": track_json(id) });

    let client = FakeHttpClient::new();
    let pages = [
        ("0", json!([local("x"), local("y")])),
        ("2", json!([item("a"), local("z")])),
        ("4", json!([item("b"), item("c")])),
        ("6", json!([])),
    ];
    for (offset, items) in pages {
        client.route(
            Method::Get,
            "/v1/playlists/p1/tracks",
            &[("offset", offset)],
            Reply::json(json!({ "items": items })),
        );
    }

    let catalog = common::catalog_client(&client).with_limits(small_pages());
    catalog.authorize().await.unwrap();

    let entries = playlist_tracks(&catalog, "p1", None).collect_all().await.unwrap();
    let ids: Vec<_> = entries.iter().map(|e| e.track.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let offsets: Vec<_> = client
        .requests_to(Method::Get, "/v1/playlists/p1/tracks")
        .iter()
        .filter_map(|r| r.query("offset"))
        .collect();
    assert_eq!(offsets, vec!["0", "2", "4", "6"]);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_rate_limited_read_is_retried() {
    let client = FakeHttpClient::new();
    client.route_once(
        Method::Get,
        "/v1/me",
        &[],
        Reply::status(429).with_header("retry-after", "2"),
    );
    client.route(
        Method::Get,
        "/v1/me",
        &[],
        Reply::json(json!({ "id": "me", "display_name": "Me" })),
    );

    let catalog = common::catalog_client(&client).with_retry(RetryConfig::with_retries(2));
    let mut events = catalog.transport().subscribe();
    catalog.authorize().await.unwrap();

    let user = catalog.current_user().await.unwrap();
    assert_eq!(user.name(), "Me");
    assert_eq!(client.requests_to(Method::Get, "/v1/me").len(), 2);

    let mut rate_limited = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, tracklist_sync::ClientEvent::RateLimited { .. }) {
            rate_limited = true;
        }
    }
    assert!(rate_limited);
}

#[test_log::test(tokio::test)]
async fn test_rate_limited_read_surfaces_without_opt_in() {
    let client = FakeHttpClient::new();
    client.route(
        Method::Get,
        "/v1/me",
        &[],
        Reply::status(429).with_header("retry-after", "2"),
    );

    let catalog = common::catalog_client(&client);
    catalog.authorize().await.unwrap();

    match catalog.current_user().await {
        Err(SyncError::RateLimit { retry_after }) => assert_eq!(retry_after, 2),
        other => panic!("expected RateLimit, got {other:?}"),
    }
    assert_eq!(client.requests_to(Method::Get, "/v1/me").len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_mutations_are_sent_once_with_json_bodies() {
    let client = FakeHttpClient::new();
    client.route(Method::Put, "/v1/me/tracks", &[], Reply::ok(""));
    client.route(Method::Delete, "/v1/playlists/p1/tracks", &[], Reply::ok("{}"));
    client.route(Method::Post, "/v1/playlists/p1/tracks", &[], Reply::status(429));

    let catalog = common::catalog_client(&client);
    catalog.authorize().await.unwrap();

    catalog
        .save_tracks(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    catalog
        .remove_playlist_tracks("p1", &["spotify:track:a".to_string()])
        .await
        .unwrap();
    let added = catalog
        .add_playlist_tracks("p1", &["spotify:track:c".to_string()])
        .await;
    assert!(matches!(added, Err(SyncError::RateLimit { .. })));

    let saves = client.requests_to(Method::Put, "/v1/me/tracks");
    assert_eq!(saves.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&saves[0].body).unwrap();
    assert_eq!(body, json!({ "ids": ["a", "b"] }));

    let removes = client.requests_to(Method::Delete, "/v1/playlists/p1/tracks");
    let body: serde_json::Value = serde_json::from_str(&removes[0].body).unwrap();
    assert_eq!(body, json!({ "tracks": [{ "uri": "spotify:track:a" }] }));

    assert_eq!(client.requests_to(Method::Post, "/v1/playlists/p1/tracks").len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_oversized_batch_is_rejected_before_sending() {
    let client = FakeHttpClient::new();
    let catalog = common::catalog_client(&client);
    catalog.authorize().await.unwrap();

    let ids: Vec<String> = (0..51).map(|i| format!("t{i}")).collect();
    assert!(matches!(
        catalog.save_tracks(&ids).await,
        Err(SyncError::Config(_))
    ));
    assert!(client.requests_to(Method::Put, "/v1/me/tracks").is_empty());
}
