use serde::{Deserialize, Deserializer, Serialize};

/// `null` в ответе удалённого сервиса трактуется так же, как отсутствие поля.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Реакции читателей на пост.
pub struct Reactions {
    /// Количество лайков.
    #[serde(default)]
    pub likes: u64,
    /// Количество дизлайков.
    #[serde(default)]
    pub dislikes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Публичная модель поста.
///
/// Отсутствующие `tags`, `reactions` и `views` читаются как пустые/нулевые.
pub struct Post {
    /// Идентификатор поста, назначается удалённым сервисом.
    pub id: i64,
    /// Заголовок поста.
    pub title: String,
    /// Текст поста, может быть пустым.
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    /// Метки поста в исходном порядке.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// Реакции читателей.
    #[serde(default, deserialize_with = "null_as_default")]
    pub reactions: Reactions,
    /// Количество просмотров.
    #[serde(default, deserialize_with = "null_as_default")]
    pub views: u64,
    /// Номинальный автор; целостность ссылки локально не проверяется.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Метка из каталога меток.
pub struct Tag {
    /// URL-безопасный идентификатор, используется в `tag/{slug}`.
    pub slug: String,
    /// Отображаемое имя.
    pub name: String,
    /// Ссылка на список постов с этой меткой.
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Комментарий к посту.
pub struct Comment {
    /// Идентификатор комментария.
    pub id: i64,
    /// Текст комментария.
    pub body: String,
    /// Количество лайков.
    pub likes: u64,
    /// Полное имя автора.
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Провалидированные данные для создания поста.
pub struct NewPost {
    /// Заголовок.
    pub title: String,
    /// Идентификатор автора.
    pub user_id: i64,
    /// Текст поста.
    pub body: String,
    /// Метки.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Коллекция, из которой выбирается страница постов.
pub enum Collection {
    /// Все посты.
    All,
    /// Посты с указанной меткой.
    Tag(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Откуда получены элементы страницы.
pub enum PageSource {
    /// Ответ удалённого сервиса.
    Remote,
    /// Удалённый сервис недоступен, использован встроенный набор постов.
    Fallback,
    /// Удалённый сервис недоступен, резервного набора для коллекции нет.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
/// Текущая страница постов вместе с параметрами пагинации.
pub struct PostPage {
    /// Посты страницы (не больше `limit`).
    pub items: Vec<Post>,
    /// Общее количество постов в коллекции по данным источника.
    pub total: u64,
    /// Номер страницы после ограничения диапазоном `[1, total_pages]`.
    pub page: u32,
    /// Размер страницы.
    pub limit: u32,
    /// Количество страниц, не меньше 1.
    pub total_pages: u32,
    /// Источник данных.
    pub source: PageSource,
}
