use clap::Subcommand;
use kfc_core::{
    Article, ArticleDisplay, Role, SettingsPatch, ThemeMode, TrendingPeriod,
};
use kfc_store::{FavoriteViewMode, SidebarType};
use std::path::PathBuf;

use crate::app::App;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List one page of articles
    Articles {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show one article
    Article { id: String },
    /// Search articles
    Search { query: String },
    /// Show recent searches
    History {
        #[arg(long)]
        clear: bool,
    },
    /// Show trending articles
    Trending {
        /// day, week or month
        #[arg(long)]
        period: Option<TrendingPeriod>,
    },
    Shelf {
        #[command(subcommand)]
        command: ShelfCommands,
    },
    Favorites {
        #[command(subcommand)]
        command: FavoriteCommands,
    },
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    Sidebar {
        #[command(subcommand)]
        command: SidebarCommands,
    },
    /// Ask a question about the articles on the shelf
    Ask { question: String },
    /// Resolve an image reference the way cards display it
    Image {
        path: String,
        #[arg(long, default_value_t = 300)]
        width: u32,
        #[arg(long, default_value_t = 200)]
        height: u32,
    },
    Login { username: String, password: String },
    Register {
        username: String,
        email: String,
        password: String,
    },
    Logout,
    /// Edit the mock fixtures
    Mock {
        #[command(subcommand)]
        command: MockCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShelfCommands {
    List,
    Add { id: String },
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
pub enum FavoriteCommands {
    List,
    Add { id: String },
    Remove { id: String },
    Status { id: String },
    /// Print the favourites graph as JSON
    Graph,
    /// Switch between graph and timeline
    View { mode: FavoriteViewMode },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    Show,
    Set {
        #[arg(long)]
        theme: Option<ThemeMode>,
        #[arg(long)]
        display: Option<ArticleDisplay>,
        #[arg(long)]
        per_page: Option<u32>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        email: Option<bool>,
    },
    Reset,
    /// Add (or with --remove, drop) a preferred topic
    Include {
        topic: String,
        #[arg(long)]
        remove: bool,
    },
    /// Add (or with --remove, drop) an excluded topic
    Exclude {
        topic: String,
        #[arg(long)]
        remove: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum SidebarCommands {
    Show,
    Toggle,
    Open { sidebar: SidebarType },
}

#[derive(Subcommand, Debug)]
pub enum MockCommands {
    /// Print the active fixture overrides
    Show,
    /// Replace the mock articles with a JSON array read from a file
    EditArticles { file: PathBuf },
    /// Replace the preset RAG answers with a JSON object read from a file
    EditAnswers { file: PathBuf },
    /// Set the public image prefix; an empty value restores the default
    ImagePath { prefix: String },
    Reset,
}

fn report(error: Option<String>) -> bool {
    match error {
        Some(e) => {
            eprintln!("❌ {}", e);
            false
        }
        None => true,
    }
}

fn print_article_line(app: &App, article: &Article) {
    println!(
        "📄 [{}] {}\n    🖼  {}",
        article.id,
        article.title,
        app.images().process_default(Some(&article.image_url))
    );
}

pub async fn handle_command(command: Commands, app: &App) -> anyhow::Result<()> {
    let stores = &app.stores;
    match command {
        Commands::Articles { page } => {
            stores.articles.load_articles(page).await;
            let state = stores.articles.snapshot();
            if report(state.articles_error) {
                for article in &state.articles {
                    print_article_line(app, article);
                }
                println!(
                    "Page {}/{} ({} articles)",
                    state.current_page, state.total_pages, state.total_count
                );
            }
        }
        Commands::Article { id } => {
            stores.articles.open_article(&id).await;
            let state = stores.articles.snapshot();
            if let (true, Some(article)) = (report(state.articles_error), state.selected_article) {
                print_article_line(app, &article);
                if let Some(authors) = &article.authors {
                    let names: Vec<&str> = authors.iter().map(|a| a.name.as_str()).collect();
                    println!("    ✍️  {}", names.join(", "));
                }
                if let Some(tags) = &article.tags {
                    println!("    🏷  {}", tags.join(", "));
                }
                println!("\n{}", article.summary.as_deref().unwrap_or(&article.content));
            }
        }
        Commands::Search { query } => {
            stores.articles.search(&query).await;
            let state = stores.articles.snapshot();
            if report(state.search_error) {
                for result in &state.search_results {
                    println!(
                        "🔎 [{}] {} ({:.2})",
                        result.id,
                        result.title,
                        result.relevance_score.unwrap_or_default()
                    );
                }
                println!("{} results for {:?}", state.search_results.len(), state.search_query);
            }
        }
        Commands::History { clear } => {
            if clear {
                stores.articles.clear_search_history()?;
            }
            for entry in stores.articles.search_history() {
                println!("🕘 {}", entry);
            }
        }
        Commands::Trending { period } => {
            match period {
                Some(period) => stores.trending.set_period(period).await,
                None => stores.trending.load_trending().await,
            }
            let state = stores.trending.snapshot();
            if report(state.trending_error) {
                println!("🔥 Trending this {}", state.trending_period);
                for (rank, article) in state.trending_articles.iter().enumerate() {
                    println!("{:>3}. [{}] {}", rank + 1, article.id, article.title);
                }
            }
        }
        Commands::Shelf { command } => handle_shelf(command, app).await,
        Commands::Favorites { command } => handle_favorites(command, app).await?,
        Commands::Settings { command } => handle_settings(command, app).await?,
        Commands::Sidebar { command } => {
            match command {
                SidebarCommands::Show => {}
                SidebarCommands::Toggle => stores.sidebar.toggle_expand(),
                SidebarCommands::Open { sidebar } => {
                    stores.sidebar.set_active_sidebar(sidebar);
                    stores.sidebar.set_expanded(true);
                }
            }
            let state = stores.sidebar.snapshot();
            println!(
                "📑 {} sidebar, {}",
                state.active_sidebar,
                if state.is_expanded { "expanded" } else { "collapsed" }
            );
        }
        Commands::Ask { question } => handle_ask(&question, app).await,
        Commands::Image { path, width, height } => {
            println!("{}", app.images().process(Some(&path), width, height));
        }
        Commands::Login { username, password } => {
            if stores.auth.login(&username, &password).await {
                println!("🔓 Signed in as {}", username);
            } else {
                report(stores.auth.snapshot().error);
            }
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            if stores.auth.register(&username, &email, &password).await {
                println!("🆕 Registered {}", username);
            } else {
                report(stores.auth.snapshot().error);
            }
        }
        Commands::Logout => {
            stores.auth.logout().await;
            println!("🔒 Signed out");
        }
        Commands::Mock { command } => handle_mock(command, app)?,
    }
    Ok(())
}

async fn handle_shelf(command: ShelfCommands, app: &App) {
    let articles = &app.stores.articles;
    match command {
        ShelfCommands::List => articles.load_shelf().await,
        ShelfCommands::Add { id } => {
            articles.open_article(&id).await;
            match articles.snapshot().selected_article {
                Some(article) if article.id == id => articles.add_to_shelf(&article).await,
                _ => {
                    report(articles.snapshot().articles_error);
                    return;
                }
            }
        }
        ShelfCommands::Remove { id } => articles.remove_from_shelf(&id).await,
    }

    let state = articles.snapshot();
    if report(state.shelf_error) {
        for saved in &state.saved_articles {
            println!("📚 [{}] {}", saved.id, saved.title);
        }
        println!("{} articles on the shelf", state.saved_articles.len());
    }
}

async fn handle_favorites(command: FavoriteCommands, app: &App) -> anyhow::Result<()> {
    let favorites = &app.stores.favorites;
    match command {
        FavoriteCommands::List => favorites.load_favorites().await,
        FavoriteCommands::Add { id } => favorites.add_to_favorites(&id).await,
        FavoriteCommands::Remove { id } => favorites.remove_from_favorites(&id).await,
        FavoriteCommands::Status { id } => {
            let status = favorites.check_favorite_status(&id).await;
            println!("{} {}", if status { "⭐" } else { "☆" }, id);
            return Ok(());
        }
        FavoriteCommands::Graph => {
            println!("{}", serde_json::to_string_pretty(&favorites.graph_data())?);
            return Ok(());
        }
        FavoriteCommands::View { mode } => favorites.set_view_mode(mode),
    }

    let state = favorites.snapshot();
    if report(state.favorite_error) {
        for article in &state.favorite_articles {
            println!("⭐ [{}] {}", article.id, article.title);
        }
        println!(
            "{} favourites, {} view, graph of {} nodes",
            state.favorite_articles.len(),
            state.view_mode,
            state.graph_data.nodes.len()
        );
    }
    Ok(())
}

async fn handle_settings(command: SettingsCommands, app: &App) -> anyhow::Result<()> {
    let settings = &app.stores.settings;
    match command {
        SettingsCommands::Show => settings.load_settings().await,
        SettingsCommands::Set {
            theme,
            display,
            per_page,
            language,
            notifications,
            email,
        } => {
            settings
                .update_settings(SettingsPatch {
                    theme,
                    article_display: display,
                    notifications_enabled: notifications,
                    email_notifications: email,
                    language,
                    articles_per_page: per_page,
                    content_preferences: None,
                })
                .await
        }
        SettingsCommands::Reset => settings.reset_settings().await,
        SettingsCommands::Include { topic, remove } => {
            if remove {
                settings.remove_included_topic(&topic).await
            } else {
                settings.include_topic(&topic).await
            }
        }
        SettingsCommands::Exclude { topic, remove } => {
            if remove {
                settings.remove_excluded_topic(&topic).await
            } else {
                settings.exclude_topic(&topic).await
            }
        }
    }

    let state = settings.snapshot();
    if report(state.settings_error) {
        println!("{}", serde_json::to_string_pretty(&state.settings)?);
        if state.settings.email_notifications && !settings.email_notifications_effective() {
            println!("ℹ️  Email notifications are inactive while notifications are off");
        }
    }
    Ok(())
}

/// Full records of everything on the shelf.
async fn shelf_articles(app: &App) -> Vec<Article> {
    let mut shelf = app.stores.articles.snapshot().saved_articles;
    if shelf.is_empty() {
        app.stores.articles.load_shelf().await;
        shelf = app.stores.articles.snapshot().saved_articles;
    }

    let mut articles = Vec::with_capacity(shelf.len());
    for saved in shelf {
        match app.backend.get_article(&saved.id).await {
            Ok(article) => articles.push(article),
            Err(e) => eprintln!("⚠️ Skipping {}: {}", saved.id, e),
        }
    }
    articles
}

async fn handle_ask(question: &str, app: &App) {
    let articles = shelf_articles(app).await;

    if !app.config.use_mock_service && !articles.is_empty() && app.rag.snapshot().dataset_id.is_none() {
        if let Err(e) = app.rag.ensure_dataset(&articles).await {
            eprintln!("⚠️ Could not prepare a dataset: {}", e);
        }
    }

    app.rag.submit_query(question, &articles).await;
    let state = app.rag.snapshot();
    if state.error.is_error {
        eprintln!("❌ {}", state.error.message);
    }
    if let Some(answer) = state.messages.iter().rev().find(|m| m.role == Role::Assistant) {
        println!("🤖 {}", answer.content);
        for source in answer.sources.iter().flatten() {
            println!("   📎 {} ({:.1})", source.title, source.relevance);
        }
    }
}

fn handle_mock(command: MockCommands, app: &App) -> anyhow::Result<()> {
    let editor = app.editor();
    match command {
        MockCommands::Show => {
            println!("{}", editor.articles_json()?);
            println!("{}", editor.rag_responses_json()?);
            println!("🖼  {}", app.images().public_prefix().unwrap_or("(none)"));
            return Ok(());
        }
        MockCommands::EditArticles { file } => {
            let count = editor.save_articles(&std::fs::read_to_string(file)?)?;
            println!("💾 Saved {} mock articles", count);
        }
        MockCommands::EditAnswers { file } => {
            let count = editor.save_rag_responses(&std::fs::read_to_string(file)?)?;
            println!("💾 Saved {} preset answers", count);
        }
        MockCommands::ImagePath { prefix } => {
            editor.save_image_path(&prefix)?;
            println!("💾 Image prefix: {}", app.images().public_prefix().unwrap_or("(none)"));
        }
        MockCommands::Reset => {
            editor.reset()?;
            println!("♻️  Mock data reset");
        }
    }
    app.loader.load()?;
    Ok(())
}
