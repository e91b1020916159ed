//! Command-line surface and dispatch.
//!
//! Every command except `agg` is a short read-or-write against the database
//! followed by plain stdout output. `agg` hands off to the [`Scheduler`] and
//! runs until a signal arrives.
use crate::config::Config;
use crate::feed;
use crate::scrape::Scheduler;
use crate::storage::{Database, User};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::time::Duration;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "trawl", about = "Polls RSS feeds and collects their posts", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a user and log in as them
    Register { name: String },
    /// Switch the current user to an existing one
    Login { name: String },
    /// List registered users
    Users,
    /// Delete every user, feed, follow, and post
    Reset,
    /// Register a feed and follow it
    Addfeed { name: String, url: String },
    /// List every registered feed and its owner
    Feeds,
    /// Follow an already-registered feed by url
    Follow { url: String },
    /// Stop following a feed by url
    Unfollow { url: String },
    /// List the feeds the current user follows
    Following,
    /// Show the newest posts from followed feeds
    Browse {
        /// Maximum number of posts to show
        #[arg(default_value_t = 2, value_parser = clap::value_parser!(i64).range(0..))]
        limit: i64,
    },
    /// Poll feeds forever, one feed per tick
    Agg {
        /// Time between cycles, e.g. 30s, 5m, 1h, or bare seconds
        #[arg(value_parser = parse_interval)]
        interval: Duration,
    },
    /// Print the database path and exit
    Dbpath,
}

/// Execute one command against an open database.
///
/// `config_dir` is where config.toml lives; `register` and `login` write it
/// back through [`Config::save`].
pub async fn run(
    command: Command,
    db: Database,
    mut config: Config,
    config_dir: &Path,
) -> Result<()> {
    let config_path = config_dir.join("config.toml");

    match command {
        Command::Register { name } => {
            let user = match db.create_user(&name).await {
                Ok(user) => user,
                Err(e) if e.is_unique_violation() => {
                    anyhow::bail!("A user named {} already exists; try `trawl login {}`", name, name)
                }
                Err(e) => return Err(e.into()),
            };
            config.current_user = Some(user.name.clone());
            config.save(&config_path)?;
            println!("User {} created and logged in", user.name);
            Ok(())
        }

        Command::Login { name } => {
            let user = db
                .get_user_by_name(&name)
                .await?
                .with_context(|| format!("User {} does not exist; run `trawl register {}` first", name, name))?;
            config.current_user = Some(user.name.clone());
            config.save(&config_path)?;
            println!("Logged in as {}", user.name);
            Ok(())
        }

        Command::Users => {
            let users = db.list_users().await?;
            if users.is_empty() {
                println!("No users registered.");
                return Ok(());
            }
            for user in users {
                if config.current_user.as_deref() == Some(user.name.as_str()) {
                    println!("* {} (current)", user.name);
                } else {
                    println!("* {}", user.name);
                }
            }
            Ok(())
        }

        Command::Reset => {
            db.reset().await?;
            println!("Database reset.");
            Ok(())
        }

        Command::Addfeed { name, url } => {
            let user = require_user(&db, &config).await?;
            validate_feed_url(&url)?;
            let feed = match db.create_feed(&name, &url, &user.id).await {
                Ok(feed) => feed,
                Err(e) if e.is_unique_violation() => {
                    anyhow::bail!("A feed with url {} is already registered", url)
                }
                Err(e) => return Err(e.into()),
            };
            db.create_follow(&user.id, &feed.id).await?;
            println!("Added feed {} ({})", feed.name, feed.url);
            println!("{} is now following {}", user.name, feed.name);
            Ok(())
        }

        Command::Feeds => {
            let feeds = db.list_feeds().await?;
            if feeds.is_empty() {
                println!("No feeds registered.");
                return Ok(());
            }
            for feed in feeds {
                println!("* {} ({}) added by {}", feed.name, feed.url, feed.owner);
            }
            Ok(())
        }

        Command::Follow { url } => {
            let user = require_user(&db, &config).await?;
            let feed = db
                .get_feed_by_url(&url)
                .await?
                .with_context(|| format!("No feed registered with url {}; add it with `trawl addfeed`", url))?;
            match db.create_follow(&user.id, &feed.id).await {
                Ok(_) => println!("{} is now following {}", user.name, feed.name),
                Err(e) if e.is_unique_violation() => {
                    println!("{} is already following {}", user.name, feed.name)
                }
                Err(e) => return Err(e.into()),
            }
            Ok(())
        }

        Command::Unfollow { url } => {
            let user = require_user(&db, &config).await?;
            let feed = db
                .get_feed_by_url(&url)
                .await?
                .with_context(|| format!("No feed registered with url {}", url))?;
            if db.delete_follow(&user.id, &feed.id).await? {
                println!("{} unfollowed {}", user.name, feed.name);
            } else {
                println!("{} was not following {}", user.name, feed.name);
            }
            Ok(())
        }

        Command::Following => {
            let user = require_user(&db, &config).await?;
            let followed = db.follows_for_user(&user.id).await?;
            if followed.is_empty() {
                println!("{} is not following any feeds.", user.name);
                return Ok(());
            }
            println!("{} is following:", user.name);
            for feed in followed {
                println!("* {}", feed.name);
            }
            Ok(())
        }

        Command::Browse { limit } => {
            let user = require_user(&db, &config).await?;
            let posts = db.posts_for_user(&user.id, limit).await?;
            if posts.is_empty() {
                println!("No posts yet. Follow some feeds and run `trawl agg` to collect them.");
                return Ok(());
            }
            for post in posts {
                match post.published_at {
                    Some(ts) => println!("{} ({})", post.title, format_timestamp(ts)),
                    None => println!("{}", post.title),
                }
                println!("  {}", post.url);
                if let Some(description) = &post.description {
                    println!("  {}", description);
                }
                println!();
            }
            Ok(())
        }

        Command::Agg { interval } => {
            println!("Collecting feeds every {:?}", interval);
            let client = feed::build_client().context("Failed to build HTTP client")?;
            let shutdown = shutdown_channel()?;
            let scheduler = Scheduler::new(db, client, interval);
            scheduler.run(shutdown).await?;
            println!("Scheduler stopped.");
            Ok(())
        }

        Command::Dbpath => {
            // Normally answered by main before the database opens
            println!("{}", config.resolved_db_path(config_dir).display());
            Ok(())
        }
    }
}

/// Resolve the logged-in user or explain how to get one.
async fn require_user(db: &Database, config: &Config) -> Result<User> {
    let name = config
        .current_user
        .as_deref()
        .context("No user logged in; run `trawl login <name>` first")?;
    db.get_user_by_name(name)
        .await?
        .with_context(|| format!("Logged-in user {} no longer exists; run `trawl register {}`", name, name))
}

/// Reject urls the fetcher could never pull before they reach the database.
fn validate_feed_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).with_context(|| format!("Invalid feed url '{}'", raw))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!(
            "Unsupported url scheme '{}': only http and https feeds can be fetched",
            other
        ),
    }
}

/// Parse durations like "500ms", "30s", "5m", "1h". A bare number means
/// seconds. Zero is rejected because the scheduler needs a real period.
fn parse_interval(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (number, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("Invalid interval '{}': expected forms like 30s, 5m, 1h", raw))?;

    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        "h" => Duration::from_secs(value.saturating_mul(3600)),
        other => {
            return Err(format!(
                "Invalid interval unit '{}': expected ms, s, m, or h",
                other
            ))
        }
    };

    if duration.is_zero() {
        return Err("Interval must be greater than zero".to_string());
    }
    Ok(duration)
}

/// A receiver that flips to true on SIGINT or SIGTERM. The scheduler polls
/// it between cycles, so shutdown never interrupts in-flight writes.
///
/// On non-Unix platforms the signal futures never complete and the loop runs
/// until the process is killed.
fn shutdown_channel() -> Result<watch::Receiver<bool>> {
    let (tx, rx) = watch::channel(false);

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::spawn(async move {
        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
            }
            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
            }
        }
        let _ = tx.send(true);
    });

    Ok(rx)
}

fn format_timestamp(ts: i64) -> String {
    match chrono::DateTime::from_timestamp(ts, 0) {
        Some(date) => date.format("%Y-%m-%d %H:%M").to_string(),
        None => ts.to_string(),
    }
}
