use std::collections::{HashMap, HashSet};
use std::future::Future;

use crate::error::FeedClientResult;
use crate::models::Comment;

#[derive(Debug, Default)]
/// Комментарии, загруженные за сессию, и признак их раскрытия по постам.
///
/// Загруженные комментарии не вытесняются: кэш растёт вместе с числом
/// открытых постов.
pub struct CommentCache {
    loaded: HashMap<i64, Vec<Comment>>,
    expanded: HashSet<i64>,
}

impl CommentCache {
    /// Пустой кэш.
    pub fn new() -> Self {
        Self::default()
    }

    /// Комментарии поста из кэша, если они уже загружались.
    pub fn cached(&self, post_id: i64) -> Option<&[Comment]> {
        self.loaded.get(&post_id).map(Vec::as_slice)
    }

    /// Возвращает комментарии поста, загружая их через `fetch` только при
    /// первом обращении. Ошибка загрузки не кэшируется.
    pub async fn get_or_fetch<F, Fut>(&mut self, post_id: i64, fetch: F) -> FeedClientResult<&[Comment]>
    where
        F: FnOnce(i64) -> Fut,
        Fut: Future<Output = FeedClientResult<Vec<Comment>>>,
    {
        if !self.loaded.contains_key(&post_id) {
            let comments = fetch(post_id).await?;
            self.loaded.insert(post_id, comments);
        }
        Ok(self.cached(post_id).unwrap_or_default())
    }

    /// Переключает раскрытие комментариев поста и возвращает новое состояние.
    pub fn toggle(&mut self, post_id: i64) -> bool {
        if self.expanded.remove(&post_id) {
            return false;
        }
        self.expanded.insert(post_id);
        true
    }

    /// Раскрыты ли комментарии поста.
    pub fn is_expanded(&self, post_id: i64) -> bool {
        self.expanded.contains(&post_id)
    }
}
