use tracing::warn;

use crate::models::Post;

const BUNDLED_POSTS: &str = include_str!("../data/posts.json");

#[derive(Debug, Clone, Default)]
/// Встроенный набор постов, который подставляется вместо основного списка,
/// когда удалённый сервис недоступен.
pub struct FallbackDataset {
    posts: Vec<Post>,
}

impl FallbackDataset {
    /// Набор из произвольных постов.
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    /// Набор, собранный в бинарник из `data/posts.json`.
    ///
    /// Повреждённый файл даёт пустой набор.
    pub fn bundled() -> Self {
        match serde_json::from_str::<Vec<Post>>(BUNDLED_POSTS) {
            Ok(posts) => Self { posts },
            Err(err) => {
                warn!(error = %err, "bundled fallback posts are malformed, using empty dataset");
                Self::default()
            }
        }
    }

    /// Все посты набора.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Количество постов.
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// `true`, если набор пуст.
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Окно `[skip, skip + limit)` набора.
    pub(crate) fn window(&self, skip: u64, limit: u32) -> Vec<Post> {
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        self.posts
            .iter()
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect()
    }
}
