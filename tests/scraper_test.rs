mod common;

use common::{FakeHttpClient, Reply};
use http_types::Method;
use serde_json::json;
use tracklist_sync::{AsyncPaginatedIterator, ListingStrategy, SyncError};

const CURATOR_PAGE: &str = r#"
<html><body>
  <div id="left"><a href="https://1001.tl/c77">Short link</a></div>
  <div id="middle">
    <div class="bItm action" data-id="l3">
      <div class="bTitle"><a href="/tracklist/l3.html">Newest</a></div>
    </div>
    <div class="bItm action" data-id="l2">
      <div class="bTitle"><a href="/tracklist/l2.html">Middle</a></div>
    </div>
  </div>
</body></html>
"#;

const OLDER_ROWS: &str = r#"<div class="bItm" data-id="l1"><div class="bTitle"><a href="/tracklist/l1.html">Oldest</a></div></div>"#;

fn media_row(item: &str) -> String {
    format!(
        r#"<div class="mediaRow"><i class="fa fa-spotify mAction" onclick="new MediaViewer(this, 'tlp_{item}', {{idObject: '5', idItem: '{item}'}} );"></i></div>"#
    )
}

fn listing_page(items: &[&str]) -> String {
    let rows: String = items.iter().map(|item| media_row(item)).collect();
    format!("<html><body>{rows}<div class=\"mediaRow\"><span>ID - ID</span></div></body></html>")
}

fn site_with_curator() -> FakeHttpClient {
    let client = FakeHttpClient::new();
    client.route(
        Method::Get,
        "/",
        &[],
        Reply::ok("<html></html>").with_header("set-cookie", "guid=abc; Path=/"),
    );
    client.route(Method::Get, "/dj/curator/", &[], Reply::ok(CURATOR_PAGE));
    client
}

fn medialink(client: &FakeHttpClient, item: &str, player_id: Option<&str>) {
    let data = match player_id {
        Some(id) => json!([{ "playerId": id, "source": "sp" }]),
        None => json!([]),
    };
    client.route(
        Method::Get,
        "/ajax/get_medialink.php",
        &[("idItem", item)],
        Reply::json(json!({ "success": true, "data": data })),
    );
}

#[test_log::test(tokio::test)]
async fn test_track_ids_are_yielded_oldest_first() {
    let client = site_with_curator();
    client.route(
        Method::Post,
        "/ajax/get_data.php",
        &[("type", "overview"), ("dj", "c77"), ("pos", "2"), ("id", "l2"), ("count", "100")],
        Reply::json(json!({ "success": true, "data": OLDER_ROWS })),
    );
    client.route(
        Method::Post,
        "/ajax/get_data.php",
        &[("pos", "3"), ("id", "l1")],
        Reply::json(json!({ "end": true })),
    );
    client.route(Method::Get, "/tracklist/l1.html", &[], Reply::ok(listing_page(&["11", "12"])));
    client.route(Method::Get, "/tracklist/l2.html", &[], Reply::ok(listing_page(&["21"])));
    client.route(Method::Get, "/tracklist/l3.html", &[], Reply::ok(listing_page(&["31", "32"])));
    for item in ["11", "12", "21", "31"] {
        medialink(&client, item, Some(&format!("sp{item}")));
    }
    medialink(&client, "32", None);

    let scraper = common::scraper(&client);
    let ids = scraper.track_ids("curator").collect_all().await.unwrap();

    assert_eq!(ids, vec!["sp12", "sp11", "sp21", "sp31"]);

    let requests = client.requests();
    assert_eq!(requests[0].path(), "/");
    assert_eq!(client.requests_to(Method::Get, "/").len(), 1);
    assert_eq!(client.requests_to(Method::Post, "/ajax/get_data.php").len(), 2);
    assert_eq!(client.requests_to(Method::Get, "/ajax/get_medialink.php").len(), 5);
}

#[test_log::test(tokio::test)]
async fn test_listing_crawl_stops_on_page_without_rows() {
    let client = site_with_curator();
    client.route(
        Method::Post,
        "/ajax/get_data.php",
        &[],
        Reply::json(json!({ "success": true, "data": "" })),
    );

    let scraper = common::scraper(&client);
    let mut listings = scraper.listings("curator");
    let all = listings.collect_all().await.unwrap();

    let paths: Vec<_> = all.iter().map(|l| l.path.as_str()).collect();
    assert_eq!(paths, vec!["/tracklist/l3.html", "/tracklist/l2.html"]);
    assert_eq!(listings.current_page(), 2);
    assert_eq!(client.requests_to(Method::Post, "/ajax/get_data.php").len(), 1);

    // A finished crawl stays finished
    assert_eq!(listings.next().await.unwrap(), None);
    assert_eq!(client.requests_to(Method::Post, "/ajax/get_data.php").len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_listing_crawl_stops_when_rows_repeat() {
    let client = site_with_curator();
    // The site keeps serving the same older row however far the crawl advances
    client.route(
        Method::Post,
        "/ajax/get_data.php",
        &[],
        Reply::json(json!({ "success": true, "data": OLDER_ROWS })),
    );

    let scraper = common::scraper(&client);
    let mut listings = scraper.listings("curator");
    let all = listings.take(8).await.unwrap();

    let paths: Vec<_> = all.iter().map(|l| l.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["/tracklist/l3.html", "/tracklist/l2.html", "/tracklist/l1.html"]
    );
    assert_eq!(client.requests_to(Method::Post, "/ajax/get_data.php").len(), 2);
    assert_eq!(listings.next().await.unwrap(), None);
}

#[test_log::test(tokio::test)]
async fn test_indexed_strategy_walks_numbered_pages() {
    let client = FakeHttpClient::new();
    client.route(Method::Get, "/", &[], Reply::ok("<html></html>"));
    client.route(
        Method::Get,
        "/dj/curator/index.html",
        &[],
        Reply::ok(
            r#"<ul class="pagination"><li>&laquo;</li><li>1</li><li>2</li><li>&raquo;</li></ul>
               <div class="tlLink"><a href="/tracklist/b.html">B</a></div>
               <div class="tlLink"><a href="/tracklist/a.html">A</a></div>"#,
        ),
    );
    client.route(
        Method::Get,
        "/dj/curator/index2.html",
        &[],
        Reply::ok(r#"<div class="tlLink"><a href="/tracklist/old.html">Old</a></div>"#),
    );

    let scraper = common::scraper(&client).with_strategy(ListingStrategy::Indexed);
    let mut listings = scraper.listings("curator");
    let all = listings.collect_all().await.unwrap();

    let paths: Vec<_> = all.iter().map(|l| l.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["/tracklist/b.html", "/tracklist/a.html", "/tracklist/old.html"]
    );
    assert_eq!(listings.total_pages(), Some(2));
    assert!(client.requests_to(Method::Get, "/dj/curator/index3.html").is_empty());
}

#[test_log::test(tokio::test)]
async fn test_listing_page_failure_propagates() {
    let client = site_with_curator();
    client.route(
        Method::Post,
        "/ajax/get_data.php",
        &[],
        Reply::json(json!({ "end": true })),
    );
    client.route(Method::Get, "/tracklist/l2.html", &[], Reply::status(503));

    let scraper = common::scraper(&client);
    let mut ids = scraper.track_ids("curator");

    match ids.next().await {
        Err(SyncError::Status { status, url }) => {
            assert_eq!(status, 503);
            assert!(url.ends_with("/tracklist/l2.html"));
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}
