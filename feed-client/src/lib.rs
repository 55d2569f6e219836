//! Клиентская библиотека для просмотра и редактирования постов через
//! публичный демо-API блога (по умолчанию `https://dummyjson.com/posts`).
//!
//! Состав:
//! - `FeedClient` — запросы к удалённому сервису (`reqwest`);
//! - `PostFeed` — постраничная выборка с поиском, сортировкой, резервным
//!   набором при сбое и защитой от устаревших ответов;
//! - `Location`/`Navigator`/`QueryState` — состояние запроса в адресе;
//! - `Debouncer`, `SearchHistory`, `CommentCache`, `PostForm` — поиск с
//!   задержкой, история запросов, кэш комментариев и валидация формы.
//!
//! Демо-API не сохраняет созданные и изменённые посты: `add_post` и
//! `update_post` возвращают эхо запроса, но последующий `get_post` его не
//! увидит.
#![warn(missing_docs)]

mod comments;
mod debounce;
mod error;
mod fallback;
mod history;
mod http_client;
mod models;
mod query;
mod retrieval;
mod validation;

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

pub use comments::CommentCache;
pub use debounce::{DEFAULT_SEARCH_DEBOUNCE, Debouncer};
pub use error::{FeedClientError, FeedClientResult, FieldErrors};
pub use fallback::FallbackDataset;
pub use history::{
    FileStore, HISTORY_KEY, KeyValueStore, MAX_HISTORY, MIN_QUERY_LEN, MemoryStore,
    SearchHistory, should_dispatch,
};
pub use models::{Collection, Comment, NewPost, PageSource, Post, PostPage, Reactions, Tag};
pub use query::{
    Location, Navigator, ORDER_PARAM, PAGE_PARAM, Pager, ParamUpdate, QUERY_PARAM,
    QueryState, SORT_BY_PARAM, SortField, SortOrder, total_pages,
};
pub use retrieval::{
    DEFAULT_PAGE_SIZE, FeedOptions, FeedState, FilterField, LoadOutcome, PageRequest, PostFeed,
    PostSource, RawPage, narrow_posts, sort_posts,
};
pub use validation::{PostForm, PostPatch, split_tags};

use http_client::HttpClient;

/// Базовый URL демо-API.
pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com/posts";

#[derive(Debug, Clone)]
/// Настройки подключения к удалённому сервису.
pub struct ClientConfig {
    /// URL коллекции постов, например `https://dummyjson.com/posts`.
    pub base_url: String,
    /// Таймаут установки соединения.
    pub connect_timeout: Duration,
    /// Таймаут всего запроса.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Настройки с указанным URL и таймаутами по умолчанию (5 с / 15 с).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone)]
/// Клиент удалённого сервиса постов.
pub struct FeedClient {
    http_client: HttpClient,
}

impl FeedClient {
    /// Создаёт клиент. Ошибка — некорректный базовый URL или сбой
    /// инициализации HTTP-клиента.
    pub fn new(config: ClientConfig) -> FeedClientResult<Self> {
        Ok(Self {
            http_client: HttpClient::new(&config)?,
        })
    }

    /// Страница постов без пост-обработки: сырые `posts`/`total` источника.
    ///
    /// Для просмотра с резервным набором и защитой от гонок используйте
    /// [`PostFeed`].
    pub async fn list_posts(&self, request: &PageRequest) -> FeedClientResult<RawPage> {
        self.http_client.list_posts(request).await
    }

    /// Каталог меток.
    pub async fn tags(&self) -> FeedClientResult<Vec<Tag>> {
        self.http_client.tags().await
    }

    /// Возвращает пост по идентификатору.
    pub async fn get_post(&self, id: i64) -> FeedClientResult<Post> {
        self.http_client.get_post(id).await
    }

    /// Комментарии к посту.
    pub async fn comments(&self, post_id: i64) -> FeedClientResult<Vec<Comment>> {
        self.http_client.comments(post_id).await
    }

    /// Проверяет форму и создаёт пост.
    ///
    /// Если форма не прошла проверку, запрос не отправляется и возвращается
    /// [`FeedClientError::Validation`].
    pub async fn add_post(&self, form: PostForm) -> FeedClientResult<Post> {
        let new_post = form.into_new_post()?;
        let created = self.http_client.add_post(&new_post).await?;
        info!(id = created.id, title = %created.title, "post created");
        Ok(created)
    }

    /// Отправляет пост целиком на замену.
    pub async fn update_post(&self, post: &Post) -> FeedClientResult<Post> {
        let updated = self.http_client.update_post(post).await?;
        info!(id = updated.id, "post updated");
        Ok(updated)
    }

    /// Загружает пост, применяет изменения к локальной копии и отправляет её.
    pub async fn edit_post(&self, id: i64, patch: PostPatch) -> FeedClientResult<Post> {
        let current = self.get_post(id).await?;
        let edited = patch.apply(current)?;
        self.update_post(&edited).await
    }
}

#[async_trait]
impl PostSource for FeedClient {
    async fn fetch_page(&self, request: &PageRequest) -> FeedClientResult<RawPage> {
        self.list_posts(request).await
    }
}
