use std::sync::Arc;

use anyhow::{Context, Result};
use feed_client::{
    Collection, CommentCache, Debouncer, FeedClient, FeedOptions, FileStore, LoadOutcome,
    Location, Navigator, Pager, PostFeed, QueryState, SearchHistory, SortField, SortOrder,
    should_dispatch,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::render;
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
enum BrowseCommand {
    Search(String),
    Next,
    Previous,
    Sort(Option<SortField>, SortOrder),
    Back,
    Forward,
    Open(i64),
    Comments(i64),
    History,
    ClearHistory,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> BrowseCommand {
    if let Some(query) = line.strip_prefix('/') {
        return BrowseCommand::Search(query.to_string());
    }

    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return BrowseCommand::Help;
    };
    let args = words.collect::<Vec<_>>();

    match (head, args.as_slice()) {
        ("n" | "next", []) => BrowseCommand::Next,
        ("p" | "prev", []) => BrowseCommand::Previous,
        ("sort", ["none"]) => BrowseCommand::Sort(None, SortOrder::Asc),
        ("sort", [field]) => match field.parse::<SortField>() {
            Ok(field) => BrowseCommand::Sort(Some(field), SortOrder::Asc),
            Err(_) => BrowseCommand::Unknown(line.to_string()),
        },
        ("sort", [field, order]) => match (field.parse::<SortField>(), order.parse::<SortOrder>()) {
            (Ok(field), Ok(order)) => BrowseCommand::Sort(Some(field), order),
            _ => BrowseCommand::Unknown(line.to_string()),
        },
        ("back", []) => BrowseCommand::Back,
        ("forward", []) => BrowseCommand::Forward,
        ("open", [id]) => match id.parse::<i64>() {
            Ok(id) => BrowseCommand::Open(id),
            Err(_) => BrowseCommand::Unknown(line.to_string()),
        },
        ("c" | "comments", [id]) => match id.parse::<i64>() {
            Ok(id) => BrowseCommand::Comments(id),
            Err(_) => BrowseCommand::Unknown(line.to_string()),
        },
        ("history", []) => BrowseCommand::History,
        ("history", ["clear"]) => BrowseCommand::ClearHistory,
        ("help" | "?", []) => BrowseCommand::Help,
        ("q" | "quit" | "exit", []) => BrowseCommand::Quit,
        _ => BrowseCommand::Unknown(line.to_string()),
    }
}

fn print_help() {
    println!("Команды:");
    println!("  /текст              поиск (пустой `/` сбрасывает поиск)");
    println!("  n | p               следующая / предыдущая страница");
    println!("  sort <поле> [asc|desc] | sort none");
    println!("  back | forward      навигация по истории переходов");
    println!("  open <id>           пост целиком");
    println!("  c <id>              показать / скрыть комментарии");
    println!("  history [clear]     недавние запросы");
    println!("  q                   выход");
}

pub struct BrowseSession {
    feed: Arc<PostFeed<FeedClient>>,
    collection: Collection,
    navigator: Navigator,
    history: SearchHistory<FileStore>,
    comments: CommentCache,
    pages_tx: mpsc::UnboundedSender<LoadOutcome>,
    pages_rx: mpsc::UnboundedReceiver<LoadOutcome>,
}

impl BrowseSession {
    pub fn new(
        client: FeedClient,
        options: FeedOptions,
        collection: Collection,
        initial: Location,
        history: SearchHistory<FileStore>,
    ) -> Self {
        let (pages_tx, pages_rx) = mpsc::unbounded_channel();
        Self {
            feed: Arc::new(PostFeed::new(client, options)),
            collection,
            navigator: Navigator::new(initial),
            history,
            comments: CommentCache::new(),
            pages_tx,
            pages_rx,
        }
    }

    pub async fn run(mut self, settings: &Settings) -> Result<()> {
        let (debouncer, mut searches) = Debouncer::spawn(settings.search_debounce());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        print_help();
        self.spawn_load();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("не удалось прочитать stdin")? else {
                        break;
                    };
                    match parse_command(line.trim()) {
                        BrowseCommand::Quit => break,
                        BrowseCommand::Search(query) => {
                            if should_dispatch(&query) {
                                debouncer.push(query);
                            } else {
                                println!("Запрос короче 3 символов, поиск не выполняется");
                            }
                        }
                        command => self.handle(command).await,
                    }
                }
                Some(query) = searches.recv() => {
                    if let Err(err) = self.history.record(&query) {
                        warn!(error = %err, "failed to persist search history");
                    }
                    self.navigator.update_params(QueryState::search_params(&query));
                    self.spawn_load();
                }
                Some(outcome) = self.pages_rx.recv() => {
                    match outcome {
                        LoadOutcome::Applied(page) => {
                            render::print_page(&page);
                            render::print_pager(&page, self.navigator.current());
                        }
                        LoadOutcome::Superseded => debug!("stale page dropped"),
                    }
                }
            }
        }

        Ok(())
    }

    async fn handle(&mut self, command: BrowseCommand) {
        match command {
            BrowseCommand::Next | BrowseCommand::Previous => {
                let pager = self.current_pager();
                let target = match command {
                    BrowseCommand::Next if pager.has_next() => pager.page + 1,
                    BrowseCommand::Previous if pager.has_previous() => pager.page - 1,
                    _ => {
                        println!("Дальше страниц нет");
                        return;
                    }
                };
                self.navigator.update_params(QueryState::page_params(target));
                self.spawn_load();
            }
            BrowseCommand::Sort(field, order) => {
                self.navigator
                    .update_params(QueryState::sort_params(field, order));
                self.spawn_load();
            }
            BrowseCommand::Back => {
                if self.navigator.back() {
                    self.spawn_load();
                } else {
                    println!("Это первый адрес в истории");
                }
            }
            BrowseCommand::Forward => {
                if self.navigator.forward() {
                    self.spawn_load();
                } else {
                    println!("Это последний адрес в истории");
                }
            }
            BrowseCommand::Open(id) => match self.feed.source().get_post(id).await {
                Ok(post) => render::print_post("Пост", &post),
                Err(err) => println!("Ошибка: {}", crate::map_client_error(err)),
            },
            BrowseCommand::Comments(id) => {
                if !self.comments.toggle(id) {
                    println!("Комментарии к посту {id} скрыты");
                    return;
                }
                let client = self.feed.source();
                match self
                    .comments
                    .get_or_fetch(id, |id| client.comments(id))
                    .await
                {
                    Ok(comments) => render::print_comments(comments),
                    Err(err) => println!("Ошибка: {}", crate::map_client_error(err)),
                }
            }
            BrowseCommand::History => render::print_history(self.history.entries()),
            BrowseCommand::ClearHistory => match self.history.clear() {
                Ok(()) => println!("История поиска очищена"),
                Err(err) => println!("Ошибка: {}", crate::map_client_error(err)),
            },
            BrowseCommand::Help => print_help(),
            BrowseCommand::Unknown(line) => println!("Неизвестная команда: {line}"),
            BrowseCommand::Search(_) | BrowseCommand::Quit => {}
        }
    }

    /// Пейджер по адресу и последней применённой странице.
    fn current_pager(&self) -> Pager {
        let state = QueryState::from_location(self.navigator.current());
        let limit = self.feed.options().limit;
        let total = self
            .feed
            .snapshot()
            .page
            .map(|page| page.total)
            .unwrap_or(0);
        Pager::new(state.page, total, limit)
    }

    fn spawn_load(&self) {
        let feed = Arc::clone(&self.feed);
        let collection = self.collection.clone();
        let query = QueryState::from_location(self.navigator.current());
        let pages_tx = self.pages_tx.clone();
        println!("Загрузка {}", self.navigator.current());

        tokio::spawn(async move {
            let outcome = feed.load(&collection, &query).await;
            // сессия завершена, если приёмник закрыт
            let _ = pages_tx.send(outcome);
        });
    }
}
