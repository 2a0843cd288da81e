use anyhow::Context;
use boardgame_vote::config::{Command, OutputFormat};
use boardgame_vote::core::leaderboard::{voter_breakdown, Snapshot};
use boardgame_vote::utils::error::ErrorSeverity;
use boardgame_vote::utils::logger::{self, LogFormat};
use boardgame_vote::utils::validation::Validate;
use boardgame_vote::{
    Category, CliConfig, FileSessionStorage, GameId, Identity, LeaderboardPoller,
    NominationList, NominationRegistry, RankingEditor, RestBackend, SessionStore, VoteConfig,
    VoteError,
};
use clap::Parser;
use std::collections::BTreeMap;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let log_format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(log_format, cli.verbose);
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = run(cli).await {
        let exit_code = match e.downcast_ref::<VoteError>() {
            Some(err) => {
                tracing::error!(
                    "❌ {} (Category: {:?}, Severity: {:?})",
                    err,
                    err.category(),
                    err.severity()
                );
                eprintln!("❌ {}", err.user_friendly_message());
                eprintln!("💡 {}", err.recovery_suggestion());
                match err.severity() {
                    ErrorSeverity::Low => 0,
                    ErrorSeverity::Medium => 2,
                    ErrorSeverity::High => 1,
                    ErrorSeverity::Critical => 3,
                }
            }
            None => {
                eprintln!("❌ {:#}", e);
                1
            }
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: CliConfig) -> anyhow::Result<()> {
    let mut config = VoteConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config file '{}'", cli.config))?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let backend = RestBackend::new(&config.backend.endpoint, config.timeout())?;
    let session = SessionStore::load(FileSessionStorage::new(&config.session.path)).await?;
    let registry = NominationRegistry::with_page_size(backend.clone(), config.search.page_size);

    match cli.command {
        Command::Login { email, user_id } => {
            let identity = Identity {
                user_id: user_id.unwrap_or_else(|| email.clone()),
                email,
            };
            session.set(identity.clone()).await?;
            println!("✅ Logged in as {}", identity.email);
        }
        Command::Logout => {
            session.clear().await?;
            println!("👋 Logged out");
        }
        Command::Whoami => match session.get() {
            Some(identity) => println!("{} (user id: {})", identity.email, identity.user_id),
            None => println!("Not logged in"),
        },
        Command::Search { name, page } => {
            let games = registry.search(&name, page).await?;
            if games.is_empty() {
                println!("No games match '{}'", name);
            }
            for game in games {
                match game.year {
                    Some(year) => println!("{:>8}  {} ({})", game.id, game.name, year),
                    None => println!("{:>8}  {}", game.id, game.name),
                }
            }
        }
        Command::Nominate { category, game_id } => {
            let user = session.require()?;
            let category: Category = category.parse()?;
            let game = registry.lookup(game_id).await?;
            let nomination = registry.nominate(&user, category, game).await?;
            println!(
                "✅ Nominated {} for {}",
                nomination.game_name, nomination.category
            );
        }
        Command::Remove { category } => {
            let user = session.require()?;
            let category: Category = category.parse()?;
            if registry.remove(&user, category).await? {
                println!("🗑️  Removed your {} nomination", category);
            } else {
                println!("You had no {} nomination", category);
            }
        }
        Command::Nominations { category, mine } => {
            let category = category.as_deref().map(str::parse::<Category>).transpose()?;
            if mine {
                let user = session.require()?;
                let nominations = registry.mine(&user).await?;
                for c in Category::ALL.into_iter().filter(|c| category.map_or(true, |f| f == *c)) {
                    match nominations.get(&c) {
                        Some(n) => println!("{:<13} {} ({})", c.title(), n.game_name, n.game_id),
                        None => println!("{:<13} -", c.title()),
                    }
                }
            } else {
                let list = registry.list_all(category).await?;
                for n in &list {
                    println!(
                        "{:<13} {:<40} {:>8}  by {}",
                        n.category.title(),
                        n.game_name,
                        n.game_id,
                        n.nominator()
                    );
                }
            }
        }
        Command::Rank {
            category,
            moves,
            save,
        } => {
            let user = session.require()?;
            let category: Category = category.parse()?;
            let moves = CliConfig::moves(&moves)?;
            let pool = registry.list_all(Some(category)).await?;

            let mut editor = RankingEditor::new(backend.clone());
            editor.initialize(&user, category, &pool).await?;
            for (from, to) in moves {
                editor.reorder(category, from, to)?;
            }

            print_ranking(category, editor.entries(category), &pool);

            if save {
                editor.save(&user).await?;
                println!("✅ Ranking saved");
            } else if editor.is_dirty() {
                println!("⚠️  Changes not saved, rerun with --save to keep them");
            }
        }
        Command::Leaderboard {
            format,
            top,
            voter,
            highlight,
            watch,
        } => {
            let view = View {
                format,
                top,
                voter: voter.as_deref(),
                highlight: highlight.as_deref(),
            };
            let poller = LeaderboardPoller::new(backend.clone());
            if watch {
                watch_leaderboard(&poller, &config, &view).await?;
            } else {
                poller.refresh().await?;
                if let Some(snapshot) = poller.latest() {
                    render(&snapshot, &view)?;
                }
            }
        }
    }

    Ok(())
}

/// How the leaderboard is printed.
struct View<'a> {
    format: OutputFormat,
    top: Option<usize>,
    voter: Option<&'a str>,
    highlight: Option<&'a str>,
}

async fn watch_leaderboard(
    poller: &LeaderboardPoller<RestBackend>,
    config: &VoteConfig,
    view: &View<'_>,
) -> anyhow::Result<()> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut updates = poller.subscribe();

    let background = poller.clone();
    let interval = config.poll_interval();
    let polling = tokio::spawn(async move { background.run(interval, stop_rx).await });

    tracing::info!(
        "Refreshing every {}s, press Ctrl-C to stop",
        interval.as_secs()
    );

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    render(&snapshot, view)?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    let _ = stop_tx.send(true);
    polling.await?;
    Ok(())
}

fn render(snapshot: &Snapshot, view: &View<'_>) -> anyhow::Result<()> {
    let board = match view.top {
        Some(n) => snapshot.leaderboard.top(n),
        None => (*snapshot.leaderboard).clone(),
    };

    match view.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&board)?),
        OutputFormat::Csv => board.write_csv(std::io::stdout().lock())?,
        OutputFormat::Table => {
            let awarded: BTreeMap<Category, Vec<(GameId, u32)>> = match view.voter {
                Some(v) => voter_breakdown(&snapshot.rankings, v).unwrap_or_else(|| {
                    tracing::warn!("{} has not voted", v);
                    BTreeMap::new()
                }),
                None => BTreeMap::new(),
            };

            let presented = view
                .highlight
                .map(|email| board.nominated_by(email))
                .unwrap_or_default();

            println!(
                "🏆 Leaderboard #{} at {}",
                snapshot.sequence,
                board.generated_at.format("%H:%M:%S")
            );
            if let Some(email) = view.highlight {
                let username = email.split('@').next().unwrap_or(email);
                println!("🎤 Presenting: {}", username);
            }
            for category in Category::ALL {
                println!("\n{}", category.title());
                let entries = board.category(category);
                if entries.is_empty() {
                    println!("  No votes yet");
                }
                for entry in entries {
                    let given = awarded
                        .get(&category)
                        .and_then(|points| points.iter().find(|(id, _)| *id == entry.game_id))
                        .map(|(_, pts)| format!("  ⭐ +{}", pts))
                        .unwrap_or_default();
                    let marker = if presented
                        .get(&category)
                        .is_some_and(|games| games.contains(&entry.game_id))
                    {
                        "👉"
                    } else {
                        "  "
                    };
                    println!(
                        "{}{:>3}. {:<40} {:>4} pts  ({} voters){}",
                        marker,
                        entry.rank,
                        entry.name.as_deref().unwrap_or("Unknown game"),
                        entry.total_points,
                        entry.voters,
                        given
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_ranking(category: Category, entries: &[GameId], pool: &NominationList) {
    println!("{} ranking:", category.title());
    if entries.is_empty() {
        println!("  No nominations from other players yet.");
    }
    for (i, game_id) in entries.iter().enumerate() {
        let name = pool
            .find_game(*game_id)
            .map(|n| n.game_name.as_str())
            .unwrap_or("Unknown game");
        println!(
            "  {:>2}. {:<40} {:>3} pts",
            i + 1,
            name,
            boardgame_vote::core::scoring::points(i + 1)
        );
    }
}
