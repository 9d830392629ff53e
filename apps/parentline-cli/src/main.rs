use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use parentline_links::{DeepLinkResolver, LinkConfig, NavStep};
use parentline_store::{MessageStore, StoreConfig, Student};
use parentline_sync::{
    ClientConfig, Effect, Engine, HttpPostsClient, MessageGroup, SessionHooks, SyncConfig,
    SyncError, SyncEvent,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Parentline message sync driver", long_about = None)]
struct Args {
    /// SQLite database file
    #[arg(long, default_value = "parentline.db")]
    db: PathBuf,

    /// Backend base URL
    #[arg(long, env = "PARENTLINE_API_URL", default_value = "https://api.parentline.app")]
    api_url: String,

    /// Bearer token for the backend
    #[arg(long, env = "PARENTLINE_TOKEN")]
    token: Option<String>,

    /// Treat the device as offline
    #[arg(long)]
    offline: bool,

    /// Rows per page
    #[arg(long, default_value = "20")]
    page_size: u64,

    /// HTTP timeout in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,

    /// Custom URL scheme of the app
    #[arg(long, default_value = "parentline")]
    scheme: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a student on this device
    AddStudent {
        id: i64,
        number: String,
        name: String,
        #[arg(long)]
        class: Option<String>,
    },
    /// List students known on this device
    Students,
    /// Sync a student's messages
    Sync {
        student_id: i64,
        /// Pages to pull
        #[arg(long, default_value = "1")]
        pages: usize,
    },
    /// Show the cached, grouped list
    Groups { student_id: i64 },
    /// Open a message, marking it and its broadcast siblings read
    Open { message_id: i64 },
    /// Resolve a link and print the navigation plan
    Link {
        uri: String,
        /// Treat the link as the one that launched the app
        #[arg(long)]
        cold: bool,
    },
}

/// The CLI cannot obtain new tokens
struct StaticToken;

#[async_trait]
impl SessionHooks for StaticToken {
    async fn refresh_credentials(&self) -> parentline_sync::Result<()> {
        Err(SyncError::Unauthorized)
    }

    async fn signed_out(&self) {
        warn!("Backend revoked access; run again with a new token");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let args = Args::parse();
    let links = LinkConfig {
        app_scheme: args.scheme.clone(),
        ..Default::default()
    };

    let store = Arc::new(
        MessageStore::with_config(StoreConfig {
            db_path: args.db.clone(),
            page_size: args.page_size,
        })
        .await
        .with_context(|| format!("Failed to open {}", args.db.display()))?,
    );

    match &args.command {
        Command::AddStudent {
            id,
            number,
            name,
            class,
        } => {
            store
                .students()
                .save(&[Student {
                    id: *id,
                    student_number: number.clone(),
                    full_name: name.clone(),
                    class_name: class.clone(),
                }])
                .await?;
            info!("Saved student {}", id);
            return Ok(());
        }
        Command::Students => {
            for student in store.students().list().await? {
                println!("{}", serde_json::to_string(&student)?);
            }
            return Ok(());
        }
        _ => {}
    }

    let client = HttpPostsClient::new(
        args.api_url.as_str(),
        ClientConfig {
            timeout_ms: args.timeout_ms,
            ..Default::default()
        },
    )?;
    client.set_access_token(args.token.clone()).await;

    let sync_config = SyncConfig {
        page_size: usize::try_from(args.page_size).context("page size out of range")?,
        ..Default::default()
    };
    let mut engine = Engine::new(
        Arc::new(client),
        store.clone(),
        Arc::new(StaticToken),
        sync_config,
        links.clone(),
        !args.offline,
    )?;
    engine.start().await?;

    match args.command {
        Command::Sync { student_id, pages } => {
            let effects = engine.dispatch(SyncEvent::ListOpened { student_id }).await?;
            report(&engine, effects).await?;
            for _ in 1..pages {
                let effects = engine.dispatch(SyncEvent::LoadMore { student_id }).await?;
                if effects.is_empty() {
                    break;
                }
                report(&engine, effects).await?;
            }
            print_groups(&engine.message_groups(student_id).await?);
        }
        Command::Groups { student_id } => {
            print_groups(&engine.message_groups(student_id).await?);
            println!("unread: {}", engine.unread_count(student_id).await?);
        }
        Command::Open { message_id } => {
            let effects = engine.dispatch(SyncEvent::MessageOpened { message_id }).await?;
            report(&engine, effects).await?;
            // Let the list invalidation settle before exiting
            tokio::time::sleep(Duration::from_millis(350)).await;
        }
        Command::Link { uri, cold } => {
            let resolver = DeepLinkResolver::new(links);
            println!("canonical: {}", resolver.resolve(&uri));
            let effects = engine
                .dispatch(SyncEvent::DeepLinkReceived {
                    uri,
                    cold_start: cold,
                    at: Instant::now(),
                })
                .await?;
            report(&engine, effects).await?;
        }
        Command::AddStudent { .. } | Command::Students => {}
    }

    Ok(())
}

async fn report(engine: &Engine, effects: Vec<Effect>) -> anyhow::Result<()> {
    for effect in effects {
        match effect {
            Effect::RefreshList { student_id } => {
                println!(
                    "student {}: {} unread",
                    student_id,
                    engine.unread_count(student_id).await?
                );
            }
            Effect::ShowFetchError { student_id, kind } => {
                eprintln!("sync failed for student {} ({:?}), showing cached list", student_id, kind);
            }
            Effect::ShowNotFound(missing) => eprintln!("not found: {:?}", missing),
            Effect::Navigate(plan) => {
                for step in plan.steps() {
                    match step {
                        NavStep::Replace(path) => println!("replace {}", path),
                        NavStep::Push(path) => println!("push {}", path),
                        NavStep::Wait(delay) => println!("wait {}ms", delay.as_millis()),
                    }
                }
            }
            Effect::SignOut => eprintln!("signed out"),
            other => warn!("Unhandled effect {:?}", other),
        }
    }
    Ok(())
}

fn print_groups(groups: &[MessageGroup]) {
    for group in groups {
        let Some(head) = group.representative() else {
            continue;
        };
        let marker = if group.is_unread() { "*" } else { " " };
        println!(
            "{} [{}] {} ({} rows) {}",
            marker,
            head.sent_time.format("%Y-%m-%d %H:%M"),
            head.title,
            group.messages.len(),
            group.ids().iter().map(i64::to_string).collect::<Vec<_>>().join(",")
        );
    }
}
