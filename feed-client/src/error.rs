use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Ошибки валидации формы по полям: имя поля -> сообщение для пользователя.
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Добавляет ошибку поля. Для каждого поля хранится только первое сообщение.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Возвращает сообщение об ошибке для поля.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// `true`, если ошибок нет.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Итератор по парам (поле, сообщение) в алфавитном порядке полей.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `feed-client`.
pub enum FeedClientError {
    /// Ошибка HTTP-транспорта (`reqwest`): сеть, таймаут, декодирование тела.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Запрошенный ресурс не найден.
    #[error("not found")]
    NotFound,

    /// Удалённый сервис ответил ошибкой.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Данные формы не прошли валидацию, запрос не отправлялся.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Ошибка локального хранилища (история поиска).
    #[error("storage error: {0}")]
    Storage(String),
}

/// Результат операций `feed-client`.
pub type FeedClientResult<T> = Result<T, FeedClientError>;

impl FeedClientError {
    pub(crate) fn from_http_status(status: reqwest::StatusCode, message: Option<String>) -> Self {
        match status {
            reqwest::StatusCode::NOT_FOUND => Self::NotFound,
            _ => {
                let message = message.unwrap_or_else(|| format!("http status {status}"));
                Self::InvalidRequest(message)
            }
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_http_status(status, None);
        }
        Self::Http(err)
    }
}
