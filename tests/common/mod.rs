#![allow(dead_code)]
use async_trait::async_trait;
use http_client::{HttpClient, Request, Response};
use http_types::{Method, StatusCode};
use std::sync::{Arc, Mutex};
use tracklist_sync::{
    AuthorizationPrompt, CatalogClientImpl, MemoryCredentialStore, OAuthConfig,
    RateLimitedTransport, TokenManager, TracklistScraper, TransportConfig,
};

pub const SITE: &str = "https://tracklists.test";
pub const API: &str = "https://api.test/v1";
pub const ACCOUNTS: &str = "https://accounts.test";

/// A request as seen by [`FakeHttpClient`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub url: String,
    pub body: String,
    pub authorization: Option<String>,
}

impl Recorded {
    pub fn path(&self) -> String {
        http_types::Url::parse(&self.url)
            .map(|url| url.path().to_string())
            .unwrap_or_default()
    }

    pub fn query(&self, key: &str) -> Option<String> {
        let url = http_types::Url::parse(&self.url).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::ok(value.to_string())
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug)]
struct Route {
    method: Method,
    path: String,
    /// Pairs that must appear in the query string or the form body
    params: Vec<(String, String)>,
    reply: Reply,
    remaining: Option<usize>,
}

impl Route {
    fn matches(&self, method: Method, path: &str, url: &http_types::Url, body: &str) -> bool {
        if self.method != method || self.path != path || self.remaining == Some(0) {
            return false;
        }
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.extend(
            http_types::Url::parse(&format!("http://form/?{body}"))
                .map(|form| {
                    form.query_pairs()
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
        );
        self.params.iter().all(|param| pairs.contains(param))
    }
}

/// Scripted HTTP client. Routes are tried in registration order; unmatched
/// requests get a 404.
#[derive(Debug, Clone, Default)]
pub struct FakeHttpClient {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every matching request with `reply`.
    pub fn route(&self, method: Method, path: &str, params: &[(&str, &str)], reply: Reply) {
        self.add(method, path, params, reply, None);
    }

    /// Answer the next matching request only.
    pub fn route_once(&self, method: Method, path: &str, params: &[(&str, &str)], reply: Reply) {
        self.add(method, path, params, reply, Some(1));
    }

    fn add(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        reply: Reply,
        remaining: Option<usize>,
    ) {
        self.routes.lock().unwrap().push(Route {
            method,
            path: path.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            reply,
            remaining,
        });
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path() == path)
            .collect()
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn send(&self, mut req: Request) -> Result<Response, http_types::Error> {
        let body = req.body_string().await.unwrap_or_default();
        let url = req.url().clone();
        let authorization = req.header("Authorization").map(|h| h.last().as_str().to_string());

        self.requests.lock().unwrap().push(Recorded {
            method: req.method(),
            url: url.to_string(),
            body: body.clone(),
            authorization,
        });

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            routes
                .iter_mut()
                .find(|route| route.matches(req.method(), url.path(), &url, &body))
                .map(|route| {
                    if let Some(remaining) = route.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    route.reply.clone()
                })
                .unwrap_or_else(|| Reply::status(404))
        };

        let mut response = Response::new(StatusCode::try_from(reply.status).unwrap());
        for (name, value) in &reply.headers {
            response.append_header(name.as_str(), value.as_str());
        }
        response.set_body(reply.body);
        Ok(response)
    }
}

/// Prompt that answers with a fixed redirect URL.
pub struct FixedPrompt(pub String);

impl AuthorizationPrompt for FixedPrompt {
    fn request_authorization(&self, _authorize_url: &str) -> tracklist_sync::Result<String> {
        Ok(self.0.clone())
    }
}

/// Unpaced scraper over the fake client.
pub fn scraper(client: &FakeHttpClient) -> TracklistScraper {
    let config = TransportConfig {
        session_url: Some(format!("{SITE}/")),
        browser_identity: true,
        ..TransportConfig::api()
    };
    let transport = RateLimitedTransport::new(Box::new(client.clone()), config);
    TracklistScraper::new(transport, SITE)
}

/// Catalog client whose token endpoint accepts the stored refresh token.
pub fn catalog_client(client: &FakeHttpClient) -> CatalogClientImpl {
    client.route(
        Method::Post,
        "/api/token",
        &[("grant_type", "refresh_token")],
        Reply::json(serde_json::json!({
            "access_token": "access-1",
            "token_type": "Bearer",
            "expires_in": 3600,
        })),
    );

    let transport = RateLimitedTransport::new(Box::new(client.clone()), TransportConfig::api());
    let tokens = TokenManager::new(
        OAuthConfig::new("id", "secret", "http://localhost/callback").with_accounts_base(ACCOUNTS),
        transport.clone(),
        Arc::new(MemoryCredentialStore::with_token("refresh-1")),
        Arc::new(FixedPrompt("http://localhost/callback?code=abc".to_string())),
    );
    CatalogClientImpl::new(transport, tokens, API)
}

pub fn track_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "uri": format!("spotify:track:{id}"),
        "name": format!("Track {id}"),
        "artists": [{"id": "ar", "uri": "spotify:artist:ar", "name": "Artist"}],
        "album": {"id": "al", "uri": "spotify:album:al", "name": "Album"},
    })
}
