use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::ClientConfig;
use crate::error::{FeedClientError, FeedClientResult};
use crate::models::{Collection, Comment, NewPost, Post, Tag};
use crate::retrieval::{PageRequest, RawPage};

#[derive(Debug, Deserialize)]
struct ErrorResponseDto {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListPostsResponseDto {
    #[serde(default)]
    posts: Option<Vec<Post>>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CommentsResponseDto {
    #[serde(default)]
    comments: Vec<CommentDto>,
}

#[derive(Debug, Deserialize)]
struct CommentDto {
    id: i64,
    body: String,
    #[serde(default)]
    likes: u64,
    user: CommentUserDto,
}

#[derive(Debug, Deserialize)]
struct CommentUserDto {
    #[serde(rename = "fullName")]
    full_name: String,
}

#[derive(Debug, Serialize)]
struct ListPostsQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    q: Option<&'a str>,
    limit: u32,
    skip: u64,
    #[serde(rename = "sortBy", skip_serializing_if = "Option::is_none")]
    sort_by: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<&'static str>,
}

impl From<ListPostsResponseDto> for RawPage {
    fn from(value: ListPostsResponseDto) -> Self {
        Self {
            posts: value.posts,
            total: value.total,
        }
    }
}

impl From<CommentDto> for Comment {
    fn from(value: CommentDto) -> Self {
        Self {
            id: value.id,
            body: value.body,
            likes: value.likes,
            author: value.user.full_name,
        }
    }
}

impl<'a> ListPostsQuery<'a> {
    fn from_request(request: &'a PageRequest, with_search: bool) -> Self {
        let q = (with_search && !request.query.is_empty()).then_some(request.query.as_str());
        // порядок без поля сортировки источнику не нужен
        let (sort_by, order) = match request.sort_by {
            Some(field) => (Some(field.as_param()), Some(request.order.as_param())),
            None => (None, None),
        };
        Self {
            q,
            limit: request.limit,
            skip: request.skip,
            sort_by,
            order,
        }
    }
}

#[derive(Debug, Clone)]
/// HTTP-клиент для REST API постов.
pub(crate) struct HttpClient {
    base_url: Url,
    client: Client,
}

impl HttpClient {
    /// Создаёт HTTP-клиент; базовый URL указывает на коллекцию постов,
    /// например `https://dummyjson.com/posts`.
    pub(crate) fn new(config: &ClientConfig) -> FeedClientResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            FeedClientError::InvalidRequest(format!("invalid base url '{}': {err}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FeedClientError::InvalidRequest(format!(
                "base url '{}' cannot have path segments",
                config.base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn decode_error(response: reqwest::Response) -> FeedClientError {
        let status = response.status();

        let message = match response.json::<ErrorResponseDto>().await {
            Ok(body) => body
                .message
                .unwrap_or_else(|| format!("http status {status}")),
            Err(_) => format!("http status {status}"),
        };
        FeedClientError::from_http_status(status, Some(message))
    }

    async fn get_json<TQuery, TRes>(
        &self,
        segments: &[&str],
        query: Option<&TQuery>,
    ) -> FeedClientResult<TRes>
    where
        TQuery: Serialize + ?Sized,
        TRes: DeserializeOwned,
    {
        let url = self.endpoint(segments);
        debug!(method = "GET", url = %url, "sending request");

        let mut request = self.client.get(url);
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        response
            .json::<TRes>()
            .await
            .map_err(FeedClientError::from_reqwest)
    }

    /// универсальный helper для отправки запросов с json-payload
    async fn send_json<TReq, TRes>(
        &self,
        method: Method,
        segments: &[&str],
        body: &TReq,
    ) -> FeedClientResult<TRes>
    where
        TReq: Serialize,
        TRes: DeserializeOwned,
    {
        let url = self.endpoint(segments);
        debug!(method = %method, url = %url, "sending request");

        let response = self
            .client
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        response
            .json::<TRes>()
            .await
            .map_err(FeedClientError::from_reqwest)
    }

    /// Страница постов: обычный список, поиск или список по метке.
    pub(crate) async fn list_posts(&self, request: &PageRequest) -> FeedClientResult<RawPage> {
        let dto: ListPostsResponseDto = match &request.collection {
            Collection::All if !request.query.is_empty() => {
                let query = ListPostsQuery::from_request(request, true);
                self.get_json(&["search"], Some(&query)).await?
            }
            Collection::All => {
                let query = ListPostsQuery::from_request(request, false);
                self.get_json(&[], Some(&query)).await?
            }
            Collection::Tag(tag) => {
                let query = ListPostsQuery::from_request(request, false);
                self.get_json(&["tag", tag.as_str()], Some(&query)).await?
            }
        };
        Ok(RawPage::from(dto))
    }

    /// Каталог меток.
    pub(crate) async fn tags(&self) -> FeedClientResult<Vec<Tag>> {
        self.get_json::<(), _>(&["tags"], None).await
    }

    /// Пост по идентификатору.
    pub(crate) async fn get_post(&self, id: i64) -> FeedClientResult<Post> {
        let id = id.to_string();
        self.get_json::<(), _>(&[id.as_str()], None).await
    }

    /// Комментарии к посту.
    pub(crate) async fn comments(&self, post_id: i64) -> FeedClientResult<Vec<Comment>> {
        let post_id = post_id.to_string();
        let dto: CommentsResponseDto = self
            .get_json::<(), _>(&[post_id.as_str(), "comments"], None)
            .await?;
        Ok(dto.comments.into_iter().map(Comment::from).collect())
    }

    /// Создаёт пост; сервис возвращает эхо созданного объекта.
    pub(crate) async fn add_post(&self, post: &NewPost) -> FeedClientResult<Post> {
        self.send_json(Method::POST, &["add"], post).await
    }

    /// Полностью заменяет пост; сервис возвращает эхо обновлённого объекта.
    pub(crate) async fn update_post(&self, post: &Post) -> FeedClientResult<Post> {
        let id = post.id.to_string();
        self.send_json(Method::PUT, &[id.as_str()], post).await
    }
}
