//! Постраничная выборка постов: удалённый запрос, подстановка резервного
//! набора при сбое и необязательная локальная фильтрация/сортировка.
//!
//! Каждый вызов [`PostFeed::load`] получает возрастающий номер; результат
//! попадает в состояние ленты, только если номер всё ещё последний, так что
//! поздний ответ на устаревший запрос не перетирает более свежий.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::FeedClientResult;
use crate::fallback::FallbackDataset;
use crate::models::{Collection, PageSource, Post, PostPage};
use crate::query::{Pager, QueryState, SortField, SortOrder};

/// Размер страницы по умолчанию.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Параметры запроса одной страницы к источнику.
pub struct PageRequest {
    /// Коллекция постов.
    pub collection: Collection,
    /// Размер страницы.
    pub limit: u32,
    /// Смещение первой записи.
    pub skip: u64,
    /// Поле сортировки на стороне источника.
    pub sort_by: Option<SortField>,
    /// Направление сортировки.
    pub order: SortOrder,
    /// Строка поиска; пустая — обычный список.
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Ответ источника как есть: любое из полей может отсутствовать.
pub struct RawPage {
    /// Посты, если в ответе была коллекция `posts`.
    pub posts: Option<Vec<Post>>,
    /// Общее количество, если источник его сообщил.
    pub total: Option<u64>,
}

#[async_trait]
/// Источник страниц постов. Реализуется `FeedClient` и тестовыми заглушками.
pub trait PostSource: Send + Sync {
    /// Запрашивает одну страницу. Ошибка означает сбой транспорта, статус
    /// не 2xx или нечитаемое тело ответа.
    async fn fetch_page(&self, request: &PageRequest) -> FeedClientResult<RawPage>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Поле, по которому выполняется локальный поиск.
pub enum FilterField {
    /// Заголовок.
    #[default]
    Title,
    /// Текст поста.
    Body,
}

#[derive(Debug, Clone)]
/// Настройки представления ленты.
pub struct FeedOptions {
    /// Размер страницы, постоянный для представления.
    pub limit: u32,
    /// Дополнительно фильтровать полученную страницу по строке поиска.
    ///
    /// Фильтр применяется только к уже загруженной странице, а не ко всей
    /// коллекции: на странице может остаться меньше `limit` записей, а
    /// `total` остаётся значением источника.
    pub search_local: bool,
    /// Поле для локального поиска.
    pub filter_field: FilterField,
    /// Сортировать полученную страницу локально по `sort_by`/`order`.
    pub sort_local: bool,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            search_local: false,
            filter_field: FilterField::Title,
            sort_local: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Наблюдаемое состояние ленты.
pub struct FeedState {
    /// Идёт загрузка последнего запроса.
    pub loading: bool,
    /// Последняя применённая страница.
    pub page: Option<PostPage>,
}

#[derive(Debug, Clone, PartialEq)]
/// Итог вызова [`PostFeed::load`].
pub enum LoadOutcome {
    /// Страница применена к состоянию ленты.
    Applied(PostPage),
    /// Пока запрос выполнялся, был выдан более новый; результат отброшен.
    Superseded,
}

/// Постраничная лента постов поверх [`PostSource`].
pub struct PostFeed<S> {
    source: S,
    options: FeedOptions,
    fallback: FallbackDataset,
    latest: AtomicU64,
    state: Mutex<FeedState>,
}

impl<S: PostSource> PostFeed<S> {
    /// Создаёт ленту со встроенным резервным набором.
    pub fn new(source: S, options: FeedOptions) -> Self {
        Self {
            source,
            options,
            fallback: FallbackDataset::bundled(),
            latest: AtomicU64::new(0),
            state: Mutex::new(FeedState::default()),
        }
    }

    /// Заменяет резервный набор.
    pub fn with_fallback(mut self, fallback: FallbackDataset) -> Self {
        self.fallback = fallback;
        self
    }

    /// Настройки ленты.
    pub fn options(&self) -> &FeedOptions {
        &self.options
    }

    /// Источник страниц.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Идёт ли загрузка последнего запроса.
    pub fn is_loading(&self) -> bool {
        self.lock_state().loading
    }

    /// Копия текущего состояния.
    pub fn snapshot(&self) -> FeedState {
        self.lock_state().clone()
    }

    /// Загружает страницу и применяет её, если за это время не было более
    /// нового вызова. Ошибки источника сюда не доходят: они превращаются в
    /// резервный набор или в страницу с [`PageSource::Failed`].
    pub async fn load(&self, collection: &Collection, query: &QueryState) -> LoadOutcome {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock_state().loading = true;

        let page = self.retrieve(collection, query).await;

        let mut state = self.lock_state();
        if self.latest.load(Ordering::SeqCst) != token {
            debug!(token, "discarding superseded page");
            return LoadOutcome::Superseded;
        }
        state.loading = false;
        state.page = Some(page.clone());
        LoadOutcome::Applied(page)
    }

    /// Выполняет выборку без изменения состояния ленты.
    ///
    /// Если запрошенная страница лежит за последней, выполняется один
    /// повторный запрос последней страницы, так что номер страницы в
    /// результате всегда соответствует её записям.
    pub async fn retrieve(&self, collection: &Collection, query: &QueryState) -> PostPage {
        let limit = self.options.limit.max(1);

        let mut fetched = self.fetch_remote(collection, query, limit).await;
        if let Ok((_, total)) = &fetched {
            let pager = Pager::new(query.page, *total, limit);
            if *total > 0 && pager.page < query.page {
                debug!(
                    requested = query.page,
                    last = pager.page,
                    "page out of range, fetching last page"
                );
                let last = QueryState {
                    page: pager.page,
                    ..query.clone()
                };
                fetched = self.fetch_remote(collection, &last, limit).await;
            }
        }

        let (items, total, source) = match fetched {
            Ok((items, total)) => (items, total, PageSource::Remote),
            Err(err) => match collection {
                Collection::All => {
                    warn!(error = %err, "post listing failed, serving fallback dataset");
                    let total = self.fallback.len() as u64;
                    // резервный набор целиком считается коллекцией
                    let pager = Pager::new(query.page, total, limit);
                    let clamped = QueryState {
                        page: pager.page,
                        ..QueryState::default()
                    };
                    let skip = clamped.skip(limit);
                    (
                        self.fallback.window(skip, limit),
                        total,
                        PageSource::Fallback,
                    )
                }
                Collection::Tag(tag) => {
                    warn!(error = %err, tag = %tag, "tag listing failed");
                    (Vec::new(), 0, PageSource::Failed(err.to_string()))
                }
            },
        };

        let pager = Pager::new(query.page, total, limit);
        PostPage {
            items,
            total,
            page: pager.page,
            limit,
            total_pages: pager.total_pages,
            source,
        }
    }

    /// Запрашивает страницу у источника и применяет локальные фильтр и
    /// сортировку.
    async fn fetch_remote(
        &self,
        collection: &Collection,
        query: &QueryState,
        limit: u32,
    ) -> FeedClientResult<(Vec<Post>, u64)> {
        let skip = query.skip(limit);
        let request = PageRequest {
            collection: collection.clone(),
            limit,
            skip,
            sort_by: query.sort_by,
            order: query.order,
            query: query.query.clone(),
        };

        let raw = self.source.fetch_page(&request).await?;
        let (mut items, total) = normalize_page(raw, skip, limit);
        if self.options.search_local && !query.query.is_empty() {
            items = narrow_posts(items, &query.query, self.options.filter_field);
        }
        if self.options.sort_local
            && let Some(field) = query.sort_by
        {
            sort_posts(&mut items, field, query.order);
        }
        Ok((items, total))
    }

    fn lock_state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Приводит ответ источника к паре (посты страницы, total).
///
/// Нет `posts` — пустая страница с `total = 0`. Нет `total` — берётся длина
/// `posts`. Если источник вернул больше `limit` записей, пагинацию он не
/// поддержал, и окно `[skip, skip + limit)` вырезается локально.
fn normalize_page(raw: RawPage, skip: u64, limit: u32) -> (Vec<Post>, u64) {
    let Some(posts) = raw.posts else {
        warn!("response has no posts collection, treating as empty");
        return (Vec::new(), 0);
    };
    let total = raw.total.unwrap_or(posts.len() as u64);
    if posts.len() <= limit as usize {
        return (posts, total);
    }

    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    let window = posts.into_iter().skip(skip).take(limit as usize).collect();
    (window, total)
}

/// Оставляет посты, у которых поле содержит `query` без учёта регистра.
pub fn narrow_posts(posts: Vec<Post>, query: &str, field: FilterField) -> Vec<Post> {
    let needle = query.to_lowercase();
    posts
        .into_iter()
        .filter(|post| {
            let haystack = match field {
                FilterField::Title => &post.title,
                FilterField::Body => &post.body,
            };
            haystack.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Устойчивая сортировка по полю и направлению.
pub fn sort_posts(posts: &mut [Post], field: SortField, order: SortOrder) {
    posts.sort_by(|a, b| {
        let ordering = compare_by(a, b, field);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn compare_by(a: &Post, b: &Post, field: SortField) -> CmpOrdering {
    match field {
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::UserId => a.user_id.unwrap_or(0).cmp(&b.user_id.unwrap_or(0)),
        SortField::Reactions => a.reactions.likes.cmp(&b.reactions.likes),
    }
}
