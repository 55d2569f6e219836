//! История недавних поисковых запросов поверх сменного key-value хранилища.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::error::{FeedClientError, FeedClientResult};

/// Ключ, под которым хранится история.
pub const HISTORY_KEY: &str = "search_history";
/// Минимальная длина запроса, который попадает в историю и уходит в поиск.
pub const MIN_QUERY_LEN: usize = 3;
/// Сколько последних запросов хранится.
pub const MAX_HISTORY: usize = 5;

/// Нужно ли отправлять введённое значение в поиск: пустая строка сбрасывает
/// поиск, короткие префиксы игнорируются.
pub fn should_dispatch(value: &str) -> bool {
    value.is_empty() || value.chars().count() >= MIN_QUERY_LEN
}

/// Строковое key-value хранилище. Реализации взаимозаменяемы для
/// [`SearchHistory`].
pub trait KeyValueStore: Send + Sync {
    /// Значение по ключу.
    fn get(&self, key: &str) -> FeedClientResult<Option<String>>;
    /// Записывает значение целиком.
    fn set(&self, key: &str, value: &str) -> FeedClientResult<()>;
    /// Удаляет ключ.
    fn remove(&self, key: &str) -> FeedClientResult<()>;
}

#[derive(Debug, Default)]
/// Хранилище в памяти процесса.
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> FeedClientResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> FeedClientResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> FeedClientResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Хранилище в JSON-файле: объект `{ключ: значение}`, перезаписывается
/// целиком при каждом изменении.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Хранилище в файле `path`; файл создаётся при первой записи.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Путь к файлу.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Содержимое файла; отсутствующий файл читается как пустой.
    fn read_raw(&self) -> FeedClientResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(raw),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(storage_error(&self.path, err)),
        }
    }

    fn parse_map(raw: &str) -> Result<HashMap<String, String>, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(raw)
    }

    fn read_map(&self) -> FeedClientResult<HashMap<String, String>> {
        let raw = self.read_raw()?;
        Self::parse_map(&raw).map_err(|err| storage_error(&self.path, err))
    }

    /// Карта для перезаписи: ошибки чтения файла передаются наверх,
    /// нечитаемый JSON заменяется пустой картой.
    fn read_map_for_update(&self) -> FeedClientResult<HashMap<String, String>> {
        let raw = self.read_raw()?;
        Ok(Self::parse_map(&raw).unwrap_or_else(|err| {
            warn!(path = %self.path.display(), error = %err, "store file is corrupt, overwriting");
            HashMap::new()
        }))
    }

    fn write_map(&self, map: &HashMap<String, String>) -> FeedClientResult<()> {
        let raw = serde_json::to_string_pretty(map).map_err(|err| storage_error(&self.path, err))?;
        fs::write(&self.path, raw).map_err(|err| storage_error(&self.path, err))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> FeedClientResult<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> FeedClientResult<()> {
        let mut map = self.read_map_for_update()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> FeedClientResult<()> {
        let mut map = self.read_map_for_update()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> FeedClientError {
    FeedClientError::Storage(format!("{}: {err}", path.display()))
}

#[derive(Debug)]
/// Последние поисковые запросы, новые в начале.
pub struct SearchHistory<S> {
    store: S,
    entries: Vec<String>,
}

impl<S: KeyValueStore> SearchHistory<S> {
    /// Читает историю из хранилища. Отсутствующая или повреждённая запись
    /// даёт пустую историю.
    pub fn load(store: S) -> Self {
        let mut entries = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<String>>(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "search history is malformed, starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read search history, starting empty");
                Vec::new()
            }
        };
        entries.truncate(MAX_HISTORY);
        Self { store, entries }
    }

    /// Запоминает запрос и сразу сохраняет историю целиком.
    ///
    /// Запросы короче [`MIN_QUERY_LEN`] не записываются (`Ok(false)`).
    /// Повторный запрос переносится в начало, самый старый вытесняется
    /// после [`MAX_HISTORY`] записей.
    pub fn record(&mut self, query: &str) -> FeedClientResult<bool> {
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(false);
        }

        let mut updated = Vec::with_capacity(MAX_HISTORY);
        updated.push(query.to_string());
        updated.extend(self.entries.iter().filter(|item| *item != query).cloned());
        updated.truncate(MAX_HISTORY);

        let raw = serde_json::to_string(&updated)
            .map_err(|err| FeedClientError::Storage(err.to_string()))?;
        self.store.set(HISTORY_KEY, &raw)?;
        self.entries = updated;
        Ok(true)
    }

    /// Записи истории, новые в начале.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Очищает историю вместе с записью в хранилище.
    pub fn clear(&mut self) -> FeedClientResult<()> {
        self.store.remove(HISTORY_KEY)?;
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_queries_are_not_recorded() {
        let mut history = SearchHistory::load(MemoryStore::new());

        assert!(!history.record("ab").expect("record must not fail"));
        assert!(history.entries().is_empty());
    }

    #[test]
    fn recorded_query_becomes_most_recent() {
        let mut history = SearchHistory::load(MemoryStore::new());
        history.record("abc").expect("record");
        history.record("love").expect("record");

        assert_eq!(history.entries(), ["love", "abc"]);
    }

    #[test]
    fn repeated_query_moves_to_front_without_duplicates() {
        let mut history = SearchHistory::load(MemoryStore::new());
        for query in ["one", "two", "three", "two"] {
            history.record(query).expect("record");
        }

        assert_eq!(history.entries(), ["two", "three", "one"]);
    }

    #[test]
    fn sixth_distinct_query_evicts_oldest() {
        let mut history = SearchHistory::load(MemoryStore::new());
        for query in ["q01", "q02", "q03", "q04", "q05", "q06"] {
            history.record(query).expect("record");
        }

        assert_eq!(history.entries().len(), MAX_HISTORY);
        assert_eq!(history.entries()[0], "q06");
        assert!(!history.entries().iter().any(|item| item == "q01"));
    }

    #[test]
    fn history_is_flushed_and_reloaded() {
        let store = MemoryStore::new();
        store
            .set(HISTORY_KEY, r#"["old"]"#)
            .expect("memory set never fails");

        let mut history = SearchHistory::load(store);
        assert_eq!(history.entries(), ["old"]);
        history.record("fresh").expect("record");

        let raw = history
            .store
            .get(HISTORY_KEY)
            .expect("memory get never fails")
            .expect("history must be stored");
        assert_eq!(raw, r#"["fresh","old"]"#);
    }

    #[test]
    fn malformed_history_loads_empty() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, "{not-json").expect("memory set never fails");

        let history = SearchHistory::load(store);
        assert!(history.entries().is_empty());
    }

    #[test]
    fn clear_removes_stored_key() {
        let mut history = SearchHistory::load(MemoryStore::new());
        history.record("love").expect("record");
        history.clear().expect("clear");

        assert!(history.entries().is_empty());
        assert!(history.store.get(HISTORY_KEY).expect("get").is_none());
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("history.json");

        let mut history = SearchHistory::load(FileStore::new(&path));
        history.record("magic").expect("record");
        history.record("crime").expect("record");

        let reloaded = SearchHistory::load(FileStore::new(&path));
        assert_eq!(reloaded.entries(), ["crime", "magic"]);
    }

    #[test]
    fn file_store_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path().join("absent.json"));

        assert!(store.get(HISTORY_KEY).expect("missing file is not an error").is_none());
        store.remove(HISTORY_KEY).expect("removing from missing file is a no-op");
        assert!(!store.path().exists());
    }

    #[test]
    fn file_store_overwrites_corrupt_file() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        fs::write(file.path(), "garbage").expect("write garbage");
        let store = FileStore::new(file.path());

        assert!(matches!(store.get(HISTORY_KEY), Err(FeedClientError::Storage(_))));
        store.set(HISTORY_KEY, "[]").expect("set must overwrite");
        assert_eq!(store.get(HISTORY_KEY).expect("get").as_deref(), Some("[]"));
    }

    #[test]
    fn file_store_read_failure_is_not_treated_as_corrupt() {
        // каталог вместо файла: чтение падает не с NotFound
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path());

        assert!(matches!(store.remove(HISTORY_KEY), Err(FeedClientError::Storage(_))));
        assert!(matches!(store.set(HISTORY_KEY, "[]"), Err(FeedClientError::Storage(_))));
        assert!(dir.path().is_dir());
    }

    #[test]
    fn file_store_keeps_other_keys_on_update() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path().join("store.json"));
        store.set("theme", "dark").expect("set theme");

        store.set(HISTORY_KEY, "[\"love\"]").expect("set history");
        store.remove(HISTORY_KEY).expect("remove history");

        assert_eq!(store.get("theme").expect("get").as_deref(), Some("dark"));
        assert_eq!(store.get(HISTORY_KEY).expect("get"), None);
    }

    #[test]
    fn dispatch_rule_skips_short_prefixes() {
        assert!(should_dispatch(""));
        assert!(!should_dispatch("lo"));
        assert!(should_dispatch("lov"));
    }
}
