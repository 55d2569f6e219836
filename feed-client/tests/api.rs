use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use feed_client::{
    ClientConfig, Collection, CommentCache, FallbackDataset, FeedClient, FeedClientError,
    FeedOptions, LoadOutcome, PageSource, PostFeed, PostForm, PostPatch, QueryState, SortField,
    SortOrder,
};

const TOTAL_POSTS: u64 = 194;

#[derive(Clone, Default)]
struct MockState {
    last_call: Arc<Mutex<Option<(String, HashMap<String, String>)>>>,
    add_calls: Arc<AtomicUsize>,
    comment_calls: Arc<AtomicUsize>,
}

impl MockState {
    fn record(&self, endpoint: impl Into<String>, params: HashMap<String, String>) {
        *self.last_call.lock().expect("last_call mutex poisoned") = Some((endpoint.into(), params));
    }

    fn last_call(&self) -> (String, HashMap<String, String>) {
        self.last_call
            .lock()
            .expect("last_call mutex poisoned")
            .clone()
            .expect("mock must have been called")
    }
}

fn post_json(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "body": format!("body {id}"),
        "tags": ["history", "love"],
        "reactions": { "likes": id * 3, "dislikes": 1 },
        "views": id * 10,
        "userId": id % 7 + 1
    })
}

async fn list_posts(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let limit = params
        .get("limit")
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(30);
    let skip = params
        .get("skip")
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(0);
    state.record("list", params);

    let posts = (skip + 1..=(skip + limit).min(TOTAL_POSTS))
        .map(|id| post_json(id, &format!("Post {id}")))
        .collect::<Vec<_>>();
    Json(json!({ "posts": posts, "total": TOTAL_POSTS, "skip": skip, "limit": limit }))
}

async fn search_posts(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.record("search", params);
    Json(json!({
        "posts": [post_json(11, "Love is patient"), post_json(12, "Lovely weather")],
        "total": 12,
        "skip": 10,
        "limit": 10
    }))
}

async fn posts_by_tag(
    State(state): State<MockState>,
    Path(tag): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.record(format!("tag:{tag}"), params);
    Json(json!({
        "posts": [post_json(1, "Alpha"), post_json(2, "Beta"), post_json(3, "Gamma")]
    }))
}

async fn tags() -> Json<Value> {
    Json(json!([
        { "slug": "history", "name": "History", "url": "https://dummyjson.com/posts/tag/history" },
        { "slug": "love", "name": "Love", "url": "https://dummyjson.com/posts/tag/love" }
    ]))
}

async fn get_post(Path(id): Path<u64>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if id == 999 {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Post with id '999' not found" })),
        ));
    }
    Ok(Json(post_json(id, "Existing title")))
}

async fn update_post(Path(id): Path<u64>, Json(mut body): Json<Value>) -> Json<Value> {
    body["id"] = json!(id);
    Json(body)
}

async fn add_post(State(state): State<MockState>, Json(mut body): Json<Value>) -> Json<Value> {
    state.add_calls.fetch_add(1, Ordering::SeqCst);
    body["id"] = json!(252);
    Json(body)
}

async fn comments(State(state): State<MockState>, Path(id): Path<u64>) -> Json<Value> {
    state.comment_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "comments": [
            { "id": 1, "body": "Great read", "postId": id, "likes": 4,
              "user": { "id": 5, "username": "emmaj", "fullName": "Emma Wilson" } }
        ],
        "total": 1
    }))
}

async fn broken() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "upstream down" })),
    )
}

async fn malformed() -> Json<Value> {
    Json(json!({ "message": "unexpected shape" }))
}

async fn garbage() -> &'static str {
    "definitely not json"
}

async fn spawn_mock(state: MockState) -> String {
    let app = Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/search", get(search_posts))
        .route("/posts/tags", get(tags))
        .route("/posts/tag/{tag}", get(posts_by_tag))
        .route("/posts/add", post(add_post))
        .route("/posts/{id}", get(get_post).put(update_post))
        .route("/posts/{id}/comments", get(comments))
        .route("/broken", get(broken))
        .route("/malformed", get(malformed))
        .route("/garbage", get(garbage))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("mock listener must bind");
    let addr = listener.local_addr().expect("listener must have address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });
    format!("http://{addr}")
}

fn client(base_url: String) -> FeedClient {
    FeedClient::new(ClientConfig::new(base_url)).expect("client must build")
}

async fn applied(feed: &PostFeed<FeedClient>, collection: &Collection, query: &QueryState) -> feed_client::PostPage {
    match feed.load(collection, query).await {
        LoadOutcome::Applied(page) => page,
        LoadOutcome::Superseded => panic!("single load must be applied"),
    }
}

#[tokio::test]
async fn listing_sends_pagination_and_sort_params() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let feed = PostFeed::new(client(format!("{base}/posts")), FeedOptions::default());
    let query = QueryState {
        sort_by: Some(SortField::Title),
        order: SortOrder::Asc,
        ..QueryState::default()
    };

    let page = applied(&feed, &Collection::All, &query).await;

    let (endpoint, params) = state.last_call();
    assert_eq!(endpoint, "list");
    assert_eq!(params.get("limit").map(String::as_str), Some("10"));
    assert_eq!(params.get("skip").map(String::as_str), Some("0"));
    assert_eq!(params.get("sortBy").map(String::as_str), Some("title"));
    assert_eq!(params.get("order").map(String::as_str), Some("asc"));

    assert_eq!(page.items.len(), 10);
    assert_eq!(page.total, TOTAL_POSTS);
    assert_eq!(page.total_pages, 20);
    assert_eq!(page.source, PageSource::Remote);
    assert!(!feed.is_loading());
}

#[tokio::test]
async fn last_page_is_partial() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let feed = PostFeed::new(client(format!("{base}/posts")), FeedOptions::default());
    let query = QueryState {
        page: 20,
        ..QueryState::default()
    };

    let page = applied(&feed, &Collection::All, &query).await;

    let (_, params) = state.last_call();
    assert_eq!(params.get("skip").map(String::as_str), Some("190"));
    assert!(!params.contains_key("sortBy"));
    assert!(!params.contains_key("order"));
    assert_eq!(page.items.len(), 4);
    assert_eq!(page.items[0].id, 191);
}

#[tokio::test]
async fn page_past_the_end_shows_last_page() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let feed = PostFeed::new(client(format!("{base}/posts")), FeedOptions::default());
    let query = QueryState {
        page: 50,
        ..QueryState::default()
    };

    let page = applied(&feed, &Collection::All, &query).await;

    let (_, params) = state.last_call();
    assert_eq!(params.get("skip").map(String::as_str), Some("190"));
    assert_eq!(page.page, 20);
    assert_eq!(page.total_pages, 20);
    assert_eq!(page.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![191, 192, 193, 194]);
}

#[tokio::test]
async fn non_empty_query_uses_search_endpoint() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let feed = PostFeed::new(client(format!("{base}/posts")), FeedOptions::default());
    let query = QueryState {
        page: 2,
        query: "love".to_string(),
        ..QueryState::default()
    };

    let page = applied(&feed, &Collection::All, &query).await;

    let (endpoint, params) = state.last_call();
    assert_eq!(endpoint, "search");
    assert_eq!(params.get("q").map(String::as_str), Some("love"));
    assert_eq!(params.get("skip").map(String::as_str), Some("10"));
    assert_eq!(page.total, 12);
    assert_eq!(page.total_pages, 2);
}

#[tokio::test]
async fn tag_listing_without_total_counts_posts() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let options = FeedOptions {
        search_local: true,
        ..FeedOptions::default()
    };
    let feed = PostFeed::new(client(format!("{base}/posts")), options);

    let page = applied(&feed, &Collection::Tag("love".to_string()), &QueryState::default()).await;
    assert_eq!(state.last_call().0, "tag:love");
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 1);

    let narrowed = QueryState {
        query: "ALP".to_string(),
        ..QueryState::default()
    };
    let page = applied(&feed, &Collection::Tag("love".to_string()), &narrowed).await;
    assert_eq!(state.last_call().0, "tag:love");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].title, "Alpha");
}

#[tokio::test]
async fn server_error_serves_fallback_dataset() {
    let base = spawn_mock(MockState::default()).await;
    let feed = PostFeed::new(client(format!("{base}/broken")), FeedOptions::default());
    let fallback = FallbackDataset::bundled();

    let page = applied(&feed, &Collection::All, &QueryState::default()).await;

    assert_eq!(page.source, PageSource::Fallback);
    assert_eq!(page.items, fallback.posts());
    assert_eq!(page.total, fallback.len() as u64);
    assert!(!feed.is_loading());
}

#[tokio::test]
async fn connection_refused_serves_fallback_dataset() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener must bind");
    let addr = listener.local_addr().expect("listener must have address");
    drop(listener);

    let feed = PostFeed::new(client(format!("http://{addr}/posts")), FeedOptions::default());
    let page = applied(&feed, &Collection::All, &QueryState::default()).await;

    assert_eq!(page.source, PageSource::Fallback);
    assert_eq!(page.total, FallbackDataset::bundled().len() as u64);
    assert!(!feed.is_loading());
}

#[tokio::test]
async fn undecodable_body_serves_fallback_dataset() {
    let base = spawn_mock(MockState::default()).await;
    let feed = PostFeed::new(client(format!("{base}/garbage")), FeedOptions::default());

    let page = applied(&feed, &Collection::All, &QueryState::default()).await;
    assert_eq!(page.source, PageSource::Fallback);
}

#[tokio::test]
async fn response_without_posts_is_empty_page() {
    let base = spawn_mock(MockState::default()).await;
    let feed = PostFeed::new(client(format!("{base}/malformed")), FeedOptions::default());

    let page = applied(&feed, &Collection::All, &QueryState::default()).await;

    assert_eq!(page.source, PageSource::Remote);
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let base = spawn_mock(MockState::default()).await;
    let client = client(format!("{base}/posts"));

    let err = client.get_post(999).await.expect_err("post must be missing");
    assert!(matches!(err, FeedClientError::NotFound));

    let post = client.get_post(5).await.expect("post must exist");
    assert_eq!(post.id, 5);
    assert_eq!(post.reactions.likes, 15);
}

#[tokio::test]
async fn tag_catalog_uses_slug_name_shape() {
    let base = spawn_mock(MockState::default()).await;
    let tags = client(format!("{base}/posts"))
        .tags()
        .await
        .expect("tags must load");

    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].slug, "history");
    assert_eq!(tags[1].name, "Love");
}

#[tokio::test]
async fn invalid_form_is_not_submitted() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let form = PostForm {
        title: "Valid title".to_string(),
        user_id: "abc".to_string(),
        body: "Valid body".to_string(),
        tags: None,
    };

    let err = client(format!("{base}/posts"))
        .add_post(form)
        .await
        .expect_err("form must be rejected");

    match err {
        FeedClientError::Validation(errors) => {
            assert_eq!(errors.get("user_id"), Some("User ID must be a number."))
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(state.add_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn valid_form_is_submitted_and_echoed() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let form = PostForm {
        title: "Fresh post".to_string(),
        user_id: "5".to_string(),
        body: "Body of the fresh post".to_string(),
        tags: Some("love, history".to_string()),
    };

    let created = client(format!("{base}/posts"))
        .add_post(form)
        .await
        .expect("post must be created");

    assert_eq!(state.add_calls.load(Ordering::SeqCst), 1);
    assert_eq!(created.id, 252);
    assert_eq!(created.title, "Fresh post");
    assert_eq!(created.user_id, Some(5));
    assert_eq!(created.tags, vec!["love", "history"]);
}

#[tokio::test]
async fn edit_sends_full_post_and_returns_echo() {
    let base = spawn_mock(MockState::default()).await;
    let patch = PostPatch {
        title: Some("Edited title".to_string()),
        dislikes: Some(9),
        ..PostPatch::default()
    };

    let updated = client(format!("{base}/posts"))
        .edit_post(4, patch)
        .await
        .expect("edit must succeed");

    assert_eq!(updated.id, 4);
    assert_eq!(updated.title, "Edited title");
    assert_eq!(updated.body, "body 4");
    assert_eq!(updated.reactions.likes, 12);
    assert_eq!(updated.reactions.dislikes, 9);
}

#[tokio::test]
async fn comments_are_cached_per_post() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let client = client(format!("{base}/posts"));
    let mut cache = CommentCache::new();

    for _ in 0..2 {
        let comments = cache
            .get_or_fetch(3, |id| client.comments(id))
            .await
            .expect("comments must load");
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author, "Emma Wilson");
        assert_eq!(comments[0].likes, 4);
    }

    assert_eq!(state.comment_calls.load(Ordering::SeqCst), 1);
}
