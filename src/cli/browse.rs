//! CLI handlers for reading articles, starring, and taxonomy lists.

use crate::client::HttpTransport;
use crate::services::Services;
use crate::types::{thread, ArticleQuery};

use super::{ListArticlesArgs, ShowArticleArgs, StarArgs};

/// Handle `quill articles list`.
pub async fn handle_list_articles(
    services: &Services<HttpTransport>,
    args: &ListArticlesArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let query = ArticleQuery {
        page: Some(args.page),
        sort: args.sort,
        search: args.search.clone(),
        ..ArticleQuery::default()
    };
    let page = services.articles.list(&query).await?;
    for article in &page.data {
        println!(
            "{}  {}  ★{}  by {}",
            article.id, article.title, article.stars_count, article.author.name
        );
    }
    let info = page.pagination;
    println!(
        "\nPage {}/{} ({} articles)",
        info.current_page, info.total_pages, info.total_items
    );
    Ok(())
}

/// Handle `quill articles show <id>`.
pub async fn handle_show_article(
    services: &Services<HttpTransport>,
    args: &ShowArticleArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let article = services.articles.get(&args.id).await?;
    println!("{}\n", article.title);
    println!(
        "by {} in {} · {} min read · ★{}",
        article.author.name, article.category.name, article.read_time_in_minutes, article.stars_count
    );
    if !article.tags.is_empty() {
        let tags: Vec<&str> = article.tags.iter().map(|t| t.name.as_str()).collect();
        println!("tags: {}", tags.join(", "));
    }
    println!("\n{}\n", article.content);
    println!("💬 {} comments", thread::total_count(&article.comments));
    for (depth, comment) in thread::flatten(&article.comments) {
        println!("{}{}: {}", "  ".repeat(depth + 1), comment.author.name, comment.text);
    }
    Ok(())
}

/// Handle `quill star <id>`.
pub async fn handle_star(
    services: &Services<HttpTransport>,
    args: &StarArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    // The toggle needs the current user cached; a fresh process has none.
    if services.auth.current_user().await?.is_none() {
        eprintln!("❌ You must be logged in to star articles. Run `quill auth login`.");
        std::process::exit(1);
    }
    let result = services.stars.toggle(&args.id).await?;
    if result.starred {
        println!("⭐ Starred ({} stars)", result.new_count);
    } else {
        println!("☆ Unstarred ({} stars)", result.new_count);
    }
    Ok(())
}

/// Handle `quill tags list`.
pub async fn handle_list_tags(services: &Services<HttpTransport>) -> Result<(), Box<dyn std::error::Error>> {
    for tag in services.tags.list().await? {
        println!("{}  {}", tag.id, tag.name);
    }
    Ok(())
}

/// Handle `quill categories list`.
pub async fn handle_list_categories(
    services: &Services<HttpTransport>,
) -> Result<(), Box<dyn std::error::Error>> {
    for category in services.categories.list().await? {
        match category.description {
            Some(description) => println!("{}  {}: {}", category.id, category.name, description),
            None => println!("{}  {}", category.id, category.name),
        }
    }
    Ok(())
}
