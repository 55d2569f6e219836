use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feed_client::{
    Collection, FeedClient, FeedClientError, FeedOptions, FileStore, Location, ORDER_PARAM,
    PAGE_PARAM, PostFeed, PostForm, PostPatch, QUERY_PARAM, QueryState, SORT_BY_PARAM,
    SearchHistory, SortField, SortOrder,
};
use tracing::warn;

mod browse;
mod logging;
mod render;
mod settings;

use browse::BrowseSession;
use logging::init_logging;
use settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "feed-cli", version, about = "CLI для просмотра постов демо-API блога")]
struct Cli {
    /// Адрес коллекции постов (по умолчанию FEED_BASE_URL или https://dummyjson.com/posts).
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Страница списка постов.
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Поле сортировки: title, userId или reactions.
        #[arg(long)]
        sort: Option<SortField>,
        #[arg(long, default_value = "asc")]
        order: SortOrder,
        /// Строка поиска.
        #[arg(long)]
        query: Option<String>,
        /// Дополнительно фильтровать полученную страницу по заголовку.
        #[arg(long)]
        local_search: bool,
        /// Дополнительно сортировать полученную страницу локально.
        #[arg(long)]
        local_sort: bool,
    },
    /// Посты с указанной меткой.
    Tag {
        tag: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Фильтр по заголовку в пределах страницы.
        #[arg(long)]
        query: Option<String>,
    },
    /// Каталог меток.
    Tags,
    /// Получение поста по id.
    Get {
        #[arg(long)]
        id: i64,
        /// Показать комментарии.
        #[arg(long)]
        comments: bool,
    },
    /// Создание поста. Демо-API возвращает эхо, но не сохраняет пост.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        body: String,
        /// Метки через запятую.
        #[arg(long)]
        tags: Option<String>,
    },
    /// Редактирование поста.
    ///
    /// Не указанные поля остаются как в текущей версии поста.
    Edit {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        likes: Option<u64>,
        #[arg(long)]
        dislikes: Option<u64>,
    },
    /// Недавние поисковые запросы.
    History {
        #[arg(long)]
        clear: bool,
    },
    /// Интерактивный просмотр списка.
    Browse {
        /// Начальный адрес, например "?page=2&q=love".
        #[arg(long)]
        location: Option<String>,
        /// Просматривать посты с меткой вместо всего списка.
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        local_search: bool,
        #[arg(long)]
        local_sort: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    if let Some(server) = cli.server {
        settings.base_url = normalize_server(server);
    }
    init_logging(&settings.log_level)?;

    let client = FeedClient::new(settings.client_config()).map_err(map_client_error)?;

    match cli.command {
        Command::List {
            page,
            sort,
            order,
            query,
            local_search,
            local_sort,
        } => {
            let location = list_location(page, sort, order, query.as_deref());
            let state = QueryState::from_location(&location);
            if !state.query.is_empty() {
                record_search(&settings, &state.query);
            }

            let options = FeedOptions {
                limit: settings.page_size,
                search_local: local_search,
                sort_local: local_sort,
                ..FeedOptions::default()
            };
            let page = PostFeed::new(client, options)
                .retrieve(&Collection::All, &state)
                .await;
            render::print_page(&page);
            render::print_pager(&page, &location);
        }
        Command::Tag { tag, page, query } => {
            let location = list_location(page, None, SortOrder::Asc, query.as_deref());
            let state = QueryState::from_location(&location);

            // у тега нет серверного поиска, строка фильтрует страницу локально
            let options = FeedOptions {
                limit: settings.page_size,
                search_local: true,
                ..FeedOptions::default()
            };
            let page = PostFeed::new(client, options)
                .retrieve(&Collection::Tag(tag), &state)
                .await;
            render::print_page(&page);
            render::print_pager(&page, &location);
        }
        Command::Tags => {
            let tags = client.tags().await.map_err(map_client_error)?;
            render::print_tags(&tags);
        }
        Command::Get { id, comments } => {
            let post = client.get_post(id).await.map_err(map_client_error)?;
            render::print_post("Пост", &post);
            if comments {
                let comments = client.comments(id).await.map_err(map_client_error)?;
                render::print_comments(&comments);
            }
        }
        Command::Add {
            title,
            user_id,
            body,
            tags,
        } => {
            let form = PostForm {
                title,
                user_id,
                body,
                tags,
            };
            let post = client.add_post(form).await.map_err(map_client_error)?;
            render::print_post("Пост создан (демо-API не сохраняет данные)", &post);
        }
        Command::Edit {
            id,
            title,
            body,
            tags,
            likes,
            dislikes,
        } => {
            let patch = PostPatch {
                title,
                body,
                tags,
                likes,
                dislikes,
            };
            let post = client
                .edit_post(id, patch)
                .await
                .map_err(map_client_error)?;
            render::print_post("Пост обновлён (демо-API не сохраняет данные)", &post);
        }
        Command::History { clear } => {
            let mut history = SearchHistory::load(FileStore::new(&settings.history_file));
            if clear {
                history.clear().map_err(map_client_error)?;
                println!("История поиска очищена");
            } else {
                render::print_history(history.entries());
            }
        }
        Command::Browse {
            location,
            tag,
            local_search,
            local_sort,
        } => {
            let initial = match location {
                Some(raw) => Location::parse(&raw).map_err(map_client_error)?,
                None => Location::default(),
            };
            let collection = match tag {
                Some(tag) => Collection::Tag(tag),
                None => Collection::All,
            };
            let options = FeedOptions {
                limit: settings.page_size,
                search_local: local_search || matches!(collection, Collection::Tag(_)),
                sort_local: local_sort,
                ..FeedOptions::default()
            };
            let history = SearchHistory::load(FileStore::new(&settings.history_file));

            BrowseSession::new(client, options, collection, initial, history)
                .run(&settings)
                .await
                .context("интерактивный просмотр завершился с ошибкой")?;
        }
    }

    Ok(())
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("https://{server}")
}

fn list_location(
    page: u32,
    sort: Option<SortField>,
    order: SortOrder,
    query: Option<&str>,
) -> Location {
    Location::default().update_params([
        (PAGE_PARAM, Some(page.to_string())),
        (SORT_BY_PARAM, sort.map(|field| field.as_param().to_string())),
        (ORDER_PARAM, Some(order.as_param().to_string())),
        (QUERY_PARAM, query.map(str::to_string)),
    ])
}

fn record_search(settings: &Settings, query: &str) {
    let mut history = SearchHistory::load(FileStore::new(&settings.history_file));
    if let Err(err) = history.record(query) {
        warn!(error = %err, "failed to persist search history");
    }
}

fn map_client_error(err: FeedClientError) -> anyhow::Error {
    let message = match err {
        FeedClientError::NotFound => "пост не найден".to_string(),
        FeedClientError::Validation(errors) => {
            let fields = errors
                .iter()
                .map(|(field, message)| format!("  {field}: {message}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("форма заполнена с ошибками, запрос не отправлен:\n{fields}")
        }
        FeedClientError::InvalidRequest(message) => format!("некорректный запрос: {message}"),
        FeedClientError::Http(err) => format!("ошибка HTTP: {err}"),
        FeedClientError::Storage(message) => format!("ошибка локального хранилища: {message}"),
    };
    anyhow::anyhow!(message)
}
