use std::borrow::Cow;

use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{FeedClientError, FeedClientResult, FieldErrors};
use crate::models::{NewPost, Post};

#[derive(Debug, Clone, Default, Validate)]
/// Сырые данные формы создания поста, как их ввёл пользователь.
pub struct PostForm {
    /// Заголовок, не короче 3 символов.
    #[validate(length(min = 3, message = "Title must be at least 3 characters."))]
    pub title: String,
    /// Идентификатор автора строкой; допускаются только цифры.
    #[validate(custom(function = "validate_numeric_id"))]
    pub user_id: String,
    /// Текст поста, не короче 5 символов.
    #[validate(length(min = 5, message = "Body must be at least 5 characters."))]
    pub body: String,
    /// Метки через запятую.
    pub tags: Option<String>,
}

fn validate_numeric_id(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(());
    }
    let mut err = ValidationError::new("numeric");
    err.message = Some(Cow::Borrowed("User ID must be a number."));
    Err(err)
}

impl PostForm {
    /// Проверяет форму и собирает данные для запроса.
    ///
    /// При ошибке возвращает [`FeedClientError::Validation`] с сообщением
    /// для каждого неверного поля.
    pub fn into_new_post(self) -> FeedClientResult<NewPost> {
        self.validate()
            .map_err(|errors| FeedClientError::Validation(field_errors(&errors)))?;

        // цифры уже проверены, остаётся только переполнение
        let user_id = self.user_id.parse::<i64>().map_err(|_| {
            let mut errors = FieldErrors::default();
            errors.insert("user_id", "User ID must be a number.");
            FeedClientError::Validation(errors)
        })?;

        Ok(NewPost {
            title: self.title,
            user_id,
            body: self.body,
            tags: split_tags(self.tags.as_deref().unwrap_or_default()),
        })
    }
}

#[derive(Debug, Clone, Default)]
/// Изменения поста при редактировании; `None` — оставить как есть.
pub struct PostPatch {
    /// Новый заголовок.
    pub title: Option<String>,
    /// Новый текст.
    pub body: Option<String>,
    /// Новые метки через запятую.
    pub tags: Option<String>,
    /// Новое количество лайков.
    pub likes: Option<u64>,
    /// Новое количество дизлайков.
    pub dislikes: Option<u64>,
}

impl PostPatch {
    /// Применяет изменения к локальной копии поста.
    pub fn apply(self, mut post: Post) -> FeedClientResult<Post> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                let mut errors = FieldErrors::default();
                errors.insert("title", "Title must not be empty.");
                return Err(FeedClientError::Validation(errors));
            }
            post.title = title;
        }
        if let Some(body) = self.body {
            post.body = body;
        }
        if let Some(tags) = self.tags {
            post.tags = split_tags(&tags);
        }
        if let Some(likes) = self.likes {
            post.reactions.likes = likes;
        }
        if let Some(dislikes) = self.dislikes {
            post.reactions.dislikes = dislikes;
        }
        Ok(post)
    }
}

/// Разбивает строку меток по запятым, обрезая пробелы и пропуская пустые.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut result = FieldErrors::default();
    for (field, field_errors) in errors.field_errors() {
        if let Some(first) = field_errors.first() {
            let message = first
                .message
                .as_ref()
                .map(|message| message.to_string())
                .unwrap_or_else(|| first.code.to_string());
            result.insert(field.to_string(), message);
        }
    }
    result
}
