use feed_client::{Comment, Location, PageSource, Pager, Post, PostPage, QueryState, Tag};

pub fn print_page(page: &PostPage) {
    match &page.source {
        PageSource::Remote => {}
        PageSource::Fallback => {
            println!("(сервис недоступен, показаны локальные данные)");
        }
        PageSource::Failed(message) => {
            println!("Ошибка загрузки: {message}");
            return;
        }
    }

    if page.items.is_empty() {
        println!("Постов не найдено");
        return;
    }

    println!(
        "Постов: {} (страница {} из {}, total={})",
        page.items.len(),
        page.page,
        page.total_pages,
        page.total
    );
    for post in &page.items {
        println!("{}", post_line(post));
    }
}

pub fn print_pager(page: &PostPage, location: &Location) {
    let pager = Pager::new(page.page, page.total, page.limit);
    println!("Страница {} из {}", pager.page, pager.total_pages);
    if pager.has_previous() {
        let previous = location.update_params(QueryState::page_params(pager.page - 1));
        println!("  назад:  {previous}");
    }
    if pager.has_next() {
        let next = location.update_params(QueryState::page_params(pager.page + 1));
        println!("  вперёд: {next}");
    }
}

pub fn print_post(title: &str, post: &Post) {
    println!("{title}");
    println!("id: {}", post.id);
    println!("title: {}", post.title);
    println!("body: {}", post.body);
    println!("tags: {}", tags_label(&post.tags));
    println!(
        "reactions: {} likes, {} dislikes",
        post.reactions.likes, post.reactions.dislikes
    );
    println!("views: {}", post.views);
    println!("user_id: {}", post.user_id.unwrap_or(0));
}

pub fn print_comments(comments: &[Comment]) {
    if comments.is_empty() {
        println!("Комментариев нет");
        return;
    }
    println!("Комментарии ({}):", comments.len());
    for comment in comments {
        println!("  - {} ({} likes): {}", comment.author, comment.likes, comment.body);
    }
}

pub fn print_tags(tags: &[Tag]) {
    println!("Меток: {}", tags.len());
    for tag in tags {
        println!("- {} ({})", tag.slug, tag.name);
    }
}

pub fn print_history(entries: &[String]) {
    if entries.is_empty() {
        println!("История поиска пуста");
        return;
    }
    println!("Недавние запросы:");
    for entry in entries {
        println!("- {entry}");
    }
}

fn post_line(post: &Post) -> String {
    format!(
        "- [{}] {} (tags: {}; {} likes, {} dislikes; {} views; user_id={})",
        post.id,
        post.title,
        tags_label(&post.tags),
        post.reactions.likes,
        post.reactions.dislikes,
        post.views,
        post.user_id.unwrap_or(0)
    )
}

fn tags_label(tags: &[String]) -> String {
    if tags.is_empty() {
        return "нет меток".to_string();
    }
    tags.join(", ")
}
