use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use trustavo_shared::constants::{
    CONTENT_MAX_CHARS, IDENTITY_HEADER, IDENTITY_TTL_HOURS, NICKNAME_MAX_CHARS,
    NICKNAME_MIN_CHARS,
};
use trustavo_shared::{IdentityId, SignalId};
use trustavo_store::{
    format_remaining, Comment, Identity, LikeOutcome, SearchScope, SignalView, StoreError,
    TagCount, TerminationReport, Trustavo,
};

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Trustavo>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/identities", post(create_identity))
        .route("/identities/:id", get(get_identity).delete(terminate_identity))
        .route("/signals", post(post_signal))
        .route("/signals/:id", get(view_signal).delete(delete_signal))
        .route("/signals/:id/like", post(toggle_like))
        .route("/signals/:id/comments", get(list_comments).post(add_comment))
        .route("/signals/:id/share", get(share_signal))
        .route("/feed", get(global_feed))
        .route("/feed/own", get(own_feed))
        .route("/feed/trending", get(trending_feed))
        .route("/search", get(search))
        .route("/tags/trending", get(trending_tags))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    identity_ttl_hours: i64,
    nickname_min_chars: usize,
    nickname_max_chars: usize,
    content_max_chars: usize,
    trending_limit: usize,
}

#[derive(Deserialize)]
struct CreateIdentityRequest {
    nickname: String,
    #[serde(default)]
    languages: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    #[serde(flatten)]
    identity: Identity,
    remaining: String,
    remaining_secs: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostSignalRequest {
    content: String,
    image_url: Option<String>,
}

#[derive(Deserialize)]
struct CommentRequest {
    content: String,
}

#[derive(Serialize)]
struct ShareResponse {
    url: String,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    scope: SearchScope,
}

// ---------------------------------------------------------------------------
// Requester identity
// ---------------------------------------------------------------------------

/// Identity named by the request header, if any. A malformed value is an
/// error rather than an anonymous request.
fn viewer(headers: &HeaderMap) -> Result<Option<IdentityId>, ServerError> {
    let Some(value) = headers.get(IDENTITY_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<IdentityId>().ok())
        .map(Some)
        .ok_or(ServerError::MissingIdentity)
}

fn requester(headers: &HeaderMap) -> Result<IdentityId, ServerError> {
    viewer(headers)?.ok_or(ServerError::MissingIdentity)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        identity_ttl_hours: IDENTITY_TTL_HOURS,
        nickname_min_chars: NICKNAME_MIN_CHARS,
        nickname_max_chars: NICKNAME_MAX_CHARS,
        content_max_chars: CONTENT_MAX_CHARS,
        trending_limit: state.config.trending_limit,
    })
}

async fn create_identity(
    State(state): State<AppState>,
    Json(req): Json<CreateIdentityRequest>,
) -> Result<(StatusCode, Json<IdentityResponse>), ServerError> {
    let identity = state.app.identities().create(&req.nickname, &req.languages)?;
    info!(id = %identity.id, "Identity created via API");
    let body = identity_response(&state, identity);
    Ok((StatusCode::CREATED, Json(body)))
}

/// Once expired, the record is only shown to its owner (with `410 Gone`)
/// so they can be told it vanished. Everyone else gets a plain 410.
async fn get_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<IdentityId>,
) -> Result<(StatusCode, Json<IdentityResponse>), ServerError> {
    let identity = state.app.identities().inspect(&id)?;
    if !identity.is_expired(state.app.identities().now()) {
        return Ok((StatusCode::OK, Json(identity_response(&state, identity))));
    }
    if viewer(&headers)? != Some(id) {
        return Err(StoreError::Expired.into());
    }
    Ok((StatusCode::GONE, Json(identity_response(&state, identity))))
}

async fn terminate_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<IdentityId>,
) -> Result<Json<TerminationReport>, ServerError> {
    if requester(&headers)? != id {
        return Err(ServerError::Forbidden("Operation not permitted".into()));
    }
    let report = state.app.terminate(&id)?;
    Ok(Json(report))
}

async fn post_signal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PostSignalRequest>,
) -> Result<(StatusCode, Json<SignalView>), ServerError> {
    let author = requester(&headers)?;
    let signal = state
        .app
        .signals()
        .post(&author, &req.content, req.image_url.as_deref())?;
    let view = state.app.signals().view(&signal.id, Some(&author))?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn view_signal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<SignalId>,
) -> Result<Json<SignalView>, ServerError> {
    let viewer = viewer(&headers)?;
    let view = state.app.view_signal(viewer.as_ref(), &id)?;
    Ok(Json(view))
}

async fn delete_signal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<SignalId>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let requester = requester(&headers)?;
    state.app.signals().delete(&id, &requester)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn toggle_like(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<SignalId>,
) -> Result<Json<LikeOutcome>, ServerError> {
    let requester = requester(&headers)?;
    let outcome = state.app.ledger().toggle_like(&requester, &id)?;
    Ok(Json(outcome))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<SignalId>,
) -> Result<Json<Vec<Comment>>, ServerError> {
    let comments = state.app.ledger().comments_for(&id)?;
    Ok(Json(comments))
}

async fn add_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<SignalId>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ServerError> {
    let requester = requester(&headers)?;
    let comment = state.app.ledger().add_comment(&requester, &id, &req.content)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn share_signal(
    State(state): State<AppState>,
    Path(id): Path<SignalId>,
) -> Result<Json<ShareResponse>, ServerError> {
    let url = state.app.share_url(&state.config.share_base_url, &id)?;
    Ok(Json(ShareResponse { url }))
}

async fn global_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SignalView>>, ServerError> {
    let viewer = viewer(&headers)?;
    Ok(Json(state.app.feed().global_timeline(viewer.as_ref())))
}

async fn own_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SignalView>>, ServerError> {
    let requester = requester(&headers)?;
    // Surface NotFound / Expired instead of an empty list.
    state.app.identities().get(&requester)?;
    Ok(Json(state.app.feed().own_timeline(&requester)))
}

async fn trending_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<SignalView>>, ServerError> {
    let viewer = viewer(&headers)?;
    let limit = query.limit.unwrap_or(state.config.trending_limit);
    Ok(Json(state.app.feed().trending(limit, viewer.as_ref())))
}

async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SignalView>>, ServerError> {
    let viewer = viewer(&headers)?;
    let results = state
        .app
        .feed()
        .search(&query.q, query.scope, viewer.as_ref());
    Ok(Json(results))
}

async fn trending_tags(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<TagCount>> {
    let limit = query.limit.unwrap_or(state.config.trending_limit);
    Json(state.app.feed().trending_tags(limit))
}

fn identity_response(state: &AppState, identity: Identity) -> IdentityResponse {
    let remaining = identity.remaining(state.app.identities().now());
    IdentityResponse {
        identity,
        remaining: format_remaining(remaining),
        remaining_secs: remaining.num_seconds(),
    }
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use trustavo_shared::ManualClock;

    struct TestServer {
        clock: ManualClock,
        router: Router,
    }

    fn server() -> TestServer {
        let clock = ManualClock::default();
        let state = AppState {
            app: Arc::new(Trustavo::new(Arc::new(clock.clone()))),
            config: Arc::new(ServerConfig::default()),
        };
        TestServer {
            clock,
            router: build_router(state),
        }
    }

    impl TestServer {
        async fn send(
            &self,
            method: &str,
            uri: &str,
            identity: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(id) = identity {
                builder = builder.header(IDENTITY_HEADER, id);
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header("content-type", "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };

            let resp = self
                .router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = resp.status();
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, value)
        }

        async fn create(&self, nickname: &str) -> String {
            let (status, body) = self
                .send("POST", "/identities", None, Some(json!({ "nickname": nickname })))
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body["id"].as_str().unwrap().to_string()
        }

        async fn post(&self, author: &str, content: &str) -> String {
            let (status, body) = self
                .send("POST", "/signals", Some(author), Some(json!({ "content": content })))
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body["id"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn test_health() {
        let srv = server();
        let (status, body) = srv.send("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_info() {
        let srv = server();
        let (status, body) = srv.send("GET", "/info", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Trustavo Node");
        assert_eq!(body["identityTtlHours"], 24);
        assert_eq!(body["contentMaxChars"], 500);
    }

    #[tokio::test]
    async fn test_create_identity() {
        let srv = server();
        let (status, body) = srv
            .send(
                "POST",
                "/identities",
                None,
                Some(json!({ "nickname": "  Nova  ", "languages": ["French"] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["nickname"], "Nova");
        assert_eq!(body["languages"], json!(["French"]));
        assert_eq!(body["remaining"], "24h 0m");
        assert_eq!(body["stats"]["postsCount"], 0);

        let (status, body) = srv
            .send("POST", "/identities", None, Some(json!({ "nickname": "N" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("nickname"));
    }

    #[tokio::test]
    async fn test_expired_identity_is_gone() {
        let srv = server();
        let id = srv.create("Nova").await;
        let uri = format!("/identities/{id}");

        let (status, _) = srv.send("GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);

        srv.clock.advance(chrono::Duration::hours(24));
        let (status, body) = srv.send("GET", &uri, Some(&id), None).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["nickname"], "Nova");
        assert_eq!(body["remainingSecs"], 0);

        let (status, _) = srv
            .send("POST", "/signals", Some(&id), Some(json!({ "content": "late" })))
            .await;
        assert_eq!(status, StatusCode::GONE);
    }

    #[tokio::test]
    async fn test_expired_identity_hidden_from_others() {
        let srv = server();
        let nova = srv.create("Nova").await;
        let other = srv.create("Other").await;
        let uri = format!("/identities/{nova}");

        srv.clock.advance(chrono::Duration::hours(25));
        for identity in [None, Some(other.as_str())] {
            let (status, body) = srv.send("GET", &uri, identity, None).await;
            assert_eq!(status, StatusCode::GONE);
            assert!(body["error"].is_string());
            assert!(body.get("nickname").is_none());
            assert!(body.get("stats").is_none());
        }
    }

    #[tokio::test]
    async fn test_post_requires_identity_header() {
        let srv = server();
        let (status, body) = srv
            .send("POST", "/signals", None, Some(json!({ "content": "hi" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        let (status, _) = srv
            .send("POST", "/signals", Some("not-a-uuid"), Some(json!({ "content": "hi" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_post_and_feed() {
        let srv = server();
        let alice = srv.create("Alice").await;
        let bob = srv.create("Bob").await;
        let sid = srv.post(&alice, "hello #Foo #foo").await;

        let (status, body) = srv.send("GET", "/feed", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        let feed = body.as_array().unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0]["id"], sid.as_str());
        assert_eq!(feed[0]["tags"], json!(["foo"]));
        assert_eq!(feed[0]["authorName"], "Alice");
        assert_eq!(feed[0]["isOwn"], false);

        let (_, body) = srv.send("GET", "/feed/own", Some(&alice), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        let (_, body) = srv.send("GET", "/feed/own", Some(&bob), None).await;
        assert!(body.as_array().unwrap().is_empty());

        let (status, _) = srv
            .send("POST", "/signals", Some(&alice), Some(json!({ "content": "x".repeat(501) })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_like_and_comment() {
        let srv = server();
        let alice = srv.create("Alice").await;
        let bob = srv.create("Bob").await;
        let sid = srv.post(&alice, "hello").await;

        let like = format!("/signals/{sid}/like");
        let (status, body) = srv.send("POST", &like, Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "liked");
        assert_eq!(body["likeCount"], 1);

        let comments = format!("/signals/{sid}/comments");
        let (status, body) = srv
            .send("POST", &comments, Some(&bob), Some(json!({ "content": "nice" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["authorName"], "Bob");

        let (_, body) = srv.send("GET", &comments, None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = srv
            .send("GET", &format!("/signals/{sid}"), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isLiked"], true);
        assert_eq!(body["commentCount"], 1);

        let (_, body) = srv.send("GET", &format!("/identities/{bob}"), None, None).await;
        assert_eq!(body["stats"]["viewsCount"], 1);
        assert_eq!(body["stats"]["messagesSent"], 1);
    }

    #[tokio::test]
    async fn test_delete_signal() {
        let srv = server();
        let alice = srv.create("Alice").await;
        let bob = srv.create("Bob").await;
        let sid = srv.post(&alice, "hello").await;
        let uri = format!("/signals/{sid}");

        let (status, body) = srv.send("DELETE", &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Operation not permitted");

        let (status, _) = srv.send("DELETE", &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = srv.send("GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::GONE);
        let (status, _) = srv.send("DELETE", &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_terminate_identity() {
        let srv = server();
        let alice = srv.create("Alice").await;
        let bob = srv.create("Bob").await;
        srv.post(&alice, "mine").await;
        let theirs = srv.post(&bob, "theirs").await;
        srv.send("POST", &format!("/signals/{theirs}/like"), Some(&alice), None)
            .await;

        let uri = format!("/identities/{alice}");
        let (status, _) = srv.send("DELETE", &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = srv.send("DELETE", &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["signalsRetracted"], 1);
        assert_eq!(body["likesRevoked"], 1);

        let (status, _) = srv.send("GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = srv.send("GET", "/feed", None, None).await;
        let feed = body.as_array().unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0]["likeCount"], 0);
    }

    #[tokio::test]
    async fn test_share_search_and_tags() {
        let srv = server();
        let alice = srv.create("Alice").await;
        let bob = srv.create("Bob").await;
        let sid = srv.post(&alice, "rust is fun #rust").await;
        srv.post(&bob, "rust at scale #rust #ops").await;

        let (status, body) = srv
            .send("GET", &format!("/signals/{sid}/share"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], format!("https://trustavo.com/signal/{sid}"));

        let (_, body) = srv.send("GET", "/search?q=RUST", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        let (_, body) = srv
            .send("GET", "/search?q=rust&scope=my", Some(&alice), None)
            .await;
        let mine = body.as_array().unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["id"], sid.as_str());

        let (_, body) = srv.send("GET", "/tags/trending?limit=1", None, None).await;
        assert_eq!(body, json!([{ "tag": "rust", "count": 2 }]));

        let (status, body) = srv.send("GET", "/feed/trending?limit=1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_likes() {
        let srv = Arc::new(server());
        let author = srv.create("Author").await;
        let sid = srv.post(&author, "popular").await;

        let mut likers = Vec::new();
        for i in 0..16 {
            likers.push(srv.create(&format!("Fan {i}")).await);
        }

        let handles: Vec<_> = likers
            .into_iter()
            .map(|liker| {
                let srv = srv.clone();
                let uri = format!("/signals/{sid}/like");
                tokio::spawn(async move {
                    srv.send("POST", &uri, Some(&liker), None).await.0
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), StatusCode::OK);
        }

        let (_, body) = srv.send("GET", &format!("/signals/{sid}"), None, None).await;
        assert_eq!(body["likeCount"], 16);
    }
}
