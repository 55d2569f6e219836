//! Состояние запроса (страница, сортировка, поиск) и его синхронизация
//! с адресом вида `?page=2&sortBy=title&order=asc&q=love`.
//!
//! Адрес — единственный источник истины: `QueryState` каждый раз заново
//! выводится из текущего `Location`, а любые изменения проходят через
//! `Location::update_params` и записываются в `Navigator` как переход.

use std::fmt;
use std::str::FromStr;

use crate::error::{FeedClientError, FeedClientResult};

/// Ключ номера страницы в адресе.
pub const PAGE_PARAM: &str = "page";
/// Ключ поля сортировки в адресе.
pub const SORT_BY_PARAM: &str = "sortBy";
/// Ключ направления сортировки в адресе.
pub const ORDER_PARAM: &str = "order";
/// Ключ строки поиска в адресе.
pub const QUERY_PARAM: &str = "q";

/// Частичное обновление параметров: `None` удаляет параметр.
pub type ParamUpdate = (&'static str, Option<String>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Поле сортировки, поддерживаемое удалённым сервисом.
pub enum SortField {
    /// По заголовку.
    Title,
    /// По идентификатору автора.
    UserId,
    /// По реакциям (лайкам).
    Reactions,
}

impl SortField {
    /// Значение параметра `sortBy`.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::UserId => "userId",
            Self::Reactions => "reactions",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "title" => Ok(Self::Title),
            "userId" => Ok(Self::UserId),
            "reactions" => Ok(Self::Reactions),
            other => Err(format!(
                "unknown sort field '{other}', expected title, userId or reactions"
            )),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
/// Направление сортировки.
pub enum SortOrder {
    /// По возрастанию.
    #[default]
    Asc,
    /// По убыванию.
    Desc,
}

impl SortOrder {
    /// Значение параметра `order`.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{other}', expected asc or desc")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Набор параметров адреса в порядке их появления.
pub struct Location {
    params: Vec<(String, String)>,
}

impl Location {
    /// Разбирает строку запроса; ведущий `?` допускается.
    pub fn parse(raw: &str) -> FeedClientResult<Self> {
        let raw = raw.trim().trim_start_matches('?');
        let params = serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
            .map_err(|err| FeedClientError::InvalidRequest(format!("invalid location: {err}")))?;
        Ok(Self { params })
    }

    /// Значение параметра, если он задан.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Сливает частичное обновление с текущими параметрами.
    ///
    /// Непустое значение заменяет параметр (или добавляет его в конец),
    /// `None` или пустая строка удаляют параметр. Параметры, которых нет
    /// в обновлении, остаются как были.
    pub fn update_params<I, K, V>(&self, updates: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = self.params.clone();
        for (key, value) in updates {
            let key = key.into();
            match value.map(Into::into).filter(|value| !value.is_empty()) {
                Some(value) => match params.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = value,
                    None => params.push((key, value)),
                },
                None => params.retain(|(k, _)| *k != key),
            }
        }
        Self { params }
    }

    /// Строка запроса без ведущего `?`.
    pub fn to_query_string(&self) -> String {
        // пары строк сериализуются всегда
        serde_urlencoded::to_string(&self.params).unwrap_or_default()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.to_query_string())
    }
}

#[derive(Debug, Clone)]
/// История переходов: `push` записывает новый адрес, `back`/`forward`
/// возвращают ранее посещённые.
pub struct Navigator {
    entries: Vec<Location>,
    index: usize,
}

impl Navigator {
    /// Создаёт историю с начальным адресом.
    pub fn new(initial: Location) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
        }
    }

    /// Текущий адрес.
    pub fn current(&self) -> &Location {
        &self.entries[self.index]
    }

    /// Записывает переход; адреса «вперёд» отбрасываются.
    pub fn push(&mut self, location: Location) {
        self.entries.truncate(self.index + 1);
        self.entries.push(location);
        self.index += 1;
    }

    /// Сливает обновление с текущим адресом и записывает результат как переход.
    pub fn update_params<I, K, V>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let next = self.current().update_params(updates);
        self.push(next);
    }

    /// Шаг назад. Возвращает `false`, если идти некуда.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Шаг вперёд. Возвращает `false`, если идти некуда.
    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Параметры текущего представления, выведенные из адреса.
pub struct QueryState {
    /// Номер страницы, начиная с 1.
    pub page: u32,
    /// Поле сортировки; `None` — порядок источника.
    pub sort_by: Option<SortField>,
    /// Направление сортировки.
    pub order: SortOrder,
    /// Строка поиска; пустая — без фильтра.
    pub query: String,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            page: 1,
            sort_by: None,
            order: SortOrder::Asc,
            query: String::new(),
        }
    }
}

impl QueryState {
    /// Выводит состояние из адреса, подставляя значения по умолчанию для
    /// отсутствующих или некорректных параметров.
    pub fn from_location(location: &Location) -> Self {
        let page = location
            .get(PAGE_PARAM)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .max(1);
        let sort_by = location
            .get(SORT_BY_PARAM)
            .and_then(|raw| raw.parse::<SortField>().ok());
        let order = location
            .get(ORDER_PARAM)
            .and_then(|raw| raw.parse::<SortOrder>().ok())
            .unwrap_or_default();
        let query = location.get(QUERY_PARAM).unwrap_or_default().to_string();

        Self {
            page,
            sort_by,
            order,
            query,
        }
    }

    /// Смещение первой записи страницы.
    pub fn skip(&self, limit: u32) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(limit)
    }

    /// Обновление для перехода на страницу `page`.
    pub fn page_params(page: u32) -> Vec<ParamUpdate> {
        vec![(PAGE_PARAM, Some(page.max(1).to_string()))]
    }

    /// Обновление для нового поиска; пагинация начинается заново.
    pub fn search_params(query: &str) -> Vec<ParamUpdate> {
        vec![
            (PAGE_PARAM, Some("1".to_string())),
            (QUERY_PARAM, Some(query.to_string())),
        ]
    }

    /// Обновление для новой сортировки; пагинация начинается заново.
    pub fn sort_params(sort_by: Option<SortField>, order: SortOrder) -> Vec<ParamUpdate> {
        vec![
            (PAGE_PARAM, Some("1".to_string())),
            (SORT_BY_PARAM, sort_by.map(|field| field.as_param().to_string())),
            (ORDER_PARAM, Some(order.as_param().to_string())),
        ]
    }
}

/// Количество страниц: `max(1, ceil(total / limit))`.
///
/// При `total == 0` страница одна, а не ноль.
pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 1;
    }
    let pages = total.div_ceil(u64::from(limit)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Состояние кнопок «назад»/«вперёд».
pub struct Pager {
    /// Текущая страница в диапазоне `[1, total_pages]`.
    pub page: u32,
    /// Количество страниц.
    pub total_pages: u32,
}

impl Pager {
    /// Строит пейджер, ограничивая страницу диапазоном `[1, total_pages]`.
    pub fn new(page: u32, total: u64, limit: u32) -> Self {
        let total_pages = total_pages(total, limit);
        Self {
            page: page.clamp(1, total_pages),
            total_pages,
        }
    }

    /// Доступна ли предыдущая страница.
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Доступна ли следующая страница.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
