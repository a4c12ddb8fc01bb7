use bookmark_sync::{BookmarkEngine, CatalogItem, Config, ItemType, ToggleOutcome};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bookmark-sync")]
#[command(about = "Lists and toggles bookmarks of the signed-in user", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every bookmark, movies first
    List,
    /// Bookmark an item, or remove its bookmark if it already has one
    Toggle {
        #[arg(long)]
        id: String,
        #[arg(long = "type")]
        item_type: ItemType,
        #[arg(long)]
        title: String,
        #[arg(long)]
        poster: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    // One engine per session; it is dropped with everything it holds when we return
    let engine = BookmarkEngine::from_config(&config)?;
    engine.load().await?;

    let _surface = engine.subscribe(|view| {
        tracing::debug!(version = view.version(), bookmarks = view.len(), "View updated");
    });

    match cli.command {
        Command::List => {
            let view = engine.view();
            for (heading, item_type) in [("Movies", ItemType::Movie), ("TV Series", ItemType::Tv)] {
                let records = view.of_type(item_type);
                if records.is_empty() {
                    continue;
                }
                println!("{}:", heading);
                for record in records {
                    println!("  {}  {}", record.key.item_id(), record.title);
                }
            }
            if view.is_empty() {
                println!("No bookmarks found.");
            }
        }
        Command::Toggle {
            id,
            item_type,
            title,
            poster,
        } => {
            let mut item = CatalogItem::new(id, item_type, title);
            item.poster_path = poster;

            let outcome = engine.toggle(&item).await?;
            if let ToggleOutcome::Reverted { failure, .. } = &outcome {
                tracing::warn!(
                    retryable = failure.is_retryable(),
                    reason = failure.message(),
                    "Bookmark change was rolled back"
                );
            }
            println!("{}", outcome.notice());
        }
    }

    engine.end_session();
    Ok(())
}
