use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ipo_cache::cache::IpoCache;
use ipo_cache::config::Config;
use ipo_cache::ipo::{find_by_id, Ipo, IpoCategory, IpoFilter, IpoStatus};
use ipo_cache::preferences::{Theme, UserPreferences};
use ipo_cache::session::CacheSession;
use ipo_cache::store::{KeyValueStore, NoopBackend, SqliteBackend};

#[derive(Parser, Debug)]
#[command(name = "ipo-cache")]
#[command(about = "Inspect and maintain the local IPO cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/ipo-cache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Path to the store database, overriding the config file
  #[arg(short, long)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show how many cache entries exist and how large the store is
  Stats,
  /// Remove expired cache entries
  Sweep,
  /// Remove every cache entry, keeping favorites, watchlist and preferences
  Clear,
  /// Cache a JSON array of IPO listings
  Import {
    file: PathBuf,
    /// Time to live in seconds (defaults to the configured TTL)
    #[arg(long)]
    ttl_secs: Option<i64>,
  },
  /// List cached IPOs
  List {
    #[arg(long)]
    status: Option<IpoStatus>,
    #[arg(long)]
    category: Option<IpoCategory>,
    /// Match against name, symbol, sector and description
    #[arg(short, long)]
    query: Option<String>,
  },
  /// Show one cached IPO
  Show { id: String },
  /// Manage favorites
  Favorites {
    #[command(subcommand)]
    action: Option<MembershipAction>,
  },
  /// Manage the watchlist
  Watchlist {
    #[command(subcommand)]
    action: Option<MembershipAction>,
  },
  /// Show or change user preferences
  Prefs {
    #[command(subcommand)]
    action: Option<PrefsAction>,
  },
}

#[derive(Subcommand, Debug)]
enum MembershipAction {
  List,
  Add { id: String },
  Remove { id: String },
  Toggle { id: String },
  Clear,
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
  Show,
  Theme { theme: Theme },
  Notifications {
    #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
    enabled: bool,
  },
}

#[derive(Clone, Copy)]
enum ListKind {
  Favorites,
  Watchlist,
}

fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging()?;

  let config = Config::load(args.config.as_deref())?;
  let settings = config.cache.settings()?;

  let store = if config.storage.enabled {
    let backend = match args.store.as_ref().or(config.storage.path.as_ref()) {
      Some(path) => SqliteBackend::open(path)?,
      None => SqliteBackend::open_default()?,
    };
    KeyValueStore::new(backend)
  } else {
    info!("Storage disabled, nothing will be persisted");
    KeyValueStore::new(NoopBackend)
  };

  let cache: IpoCache<Ipo> = IpoCache::with_settings(store, settings)?;
  let mut session = CacheSession::new(cache);

  let result = run(&mut session, args.command);

  session.into_cache().into_store().close();
  result
}

/// Log to a daily file under the data directory; stdout stays for command output.
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("ipo-cache")
    .join("logs");

  let appender = tracing_appender::rolling::daily(log_dir, "ipo-cache.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_env("IPO_CACHE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

fn run(session: &mut CacheSession<Ipo>, command: Command) -> Result<()> {
  match command {
    Command::Stats => {
      let stats = session.stats();
      println!("cache prefix:  {}", session.cache().settings().prefix);
      println!("cache entries: {}", stats.total_keys);
      println!("store size:    {} bytes", stats.cache_size);
      println!("favorites:     {}", session.favorites().len());
      println!("watchlist:     {}", session.watchlist().len());
    }
    Command::Sweep => {
      let removed = session.cache().clean_expired_cache();
      session.refresh();
      println!("Removed {} expired entries", removed);
    }
    Command::Clear => {
      let removed = session.cache().clear_cache();
      session.refresh();
      println!("Removed {} cache entries", removed);
    }
    Command::Import { file, ttl_secs } => import(session, &file, ttl_secs)?,
    Command::List {
      status,
      category,
      query,
    } => {
      let filter = IpoFilter {
        status,
        category,
        query,
      };
      let Some(ipos) = session.cached_ipos() else {
        println!("No cached listings");
        return Ok(());
      };
      for ipo in filter.apply(ipos) {
        print_row(session, ipo);
      }
    }
    Command::Show { id } => {
      let ipo = session
        .cached_ipo(&id)
        .or_else(|| session.cached_ipos().and_then(|ipos| find_by_id(ipos, &id).cloned()))
        .ok_or_else(|| eyre!("IPO {} is not cached", id))?;
      println!("{}", serde_json::to_string_pretty(&ipo)?);
    }
    Command::Favorites { action } => membership(session, ListKind::Favorites, action),
    Command::Watchlist { action } => membership(session, ListKind::Watchlist, action),
    Command::Prefs { action } => {
      let cache = session.cache();
      let mut prefs = cache.get_user_preferences(UserPreferences::default());
      match action.unwrap_or(PrefsAction::Show) {
        PrefsAction::Show => {}
        PrefsAction::Theme { theme } => {
          prefs.theme = theme;
          cache.set_user_preferences(&prefs);
        }
        PrefsAction::Notifications { enabled } => {
          prefs.notifications = enabled;
          cache.set_user_preferences(&prefs);
        }
      }
      println!("theme:         {}", prefs.theme);
      println!("notifications: {}", prefs.notifications);
    }
  }

  Ok(())
}

fn import(session: &mut CacheSession<Ipo>, file: &Path, ttl_secs: Option<i64>) -> Result<()> {
  let contents = std::fs::read_to_string(file)
    .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;
  let ipos: Vec<Ipo> = serde_json::from_str(&contents)
    .map_err(|e| eyre!("Failed to parse listings in {}: {}", file.display(), e))?;

  match ttl_secs {
    Some(secs) => {
      let ttl = chrono::Duration::try_seconds(secs)
        .filter(|ttl| *ttl > chrono::Duration::zero())
        .ok_or_else(|| eyre!("TTL must be a positive number of seconds"))?;
      session.cache().cache_ipos(&ipos, Some(ttl));
      session.refresh();
    }
    None => session.cache_ipos(&ipos),
  }

  info!("Imported {} listings from {}", ipos.len(), file.display());
  println!("Cached {} listings", ipos.len());
  Ok(())
}

fn membership(session: &mut CacheSession<Ipo>, kind: ListKind, action: Option<MembershipAction>) {
  match action.unwrap_or(MembershipAction::List) {
    MembershipAction::List => {}
    MembershipAction::Add { id } => match kind {
      ListKind::Favorites => session.add_to_favorites(&id),
      ListKind::Watchlist => session.add_to_watchlist(&id),
    },
    MembershipAction::Remove { id } => match kind {
      ListKind::Favorites => session.remove_from_favorites(&id),
      ListKind::Watchlist => session.remove_from_watchlist(&id),
    },
    MembershipAction::Toggle { id } => {
      let member = match kind {
        ListKind::Favorites => session.toggle_favorite(&id),
        ListKind::Watchlist => session.toggle_watchlist(&id),
      };
      println!("{} {}", id, if member { "added" } else { "removed" });
    }
    MembershipAction::Clear => match kind {
      ListKind::Favorites => session.clear_favorites(),
      ListKind::Watchlist => session.clear_watchlist(),
    },
  }

  let ids = match kind {
    ListKind::Favorites => session.favorites(),
    ListKind::Watchlist => session.watchlist(),
  };
  for id in ids {
    match session.cached_ipos().and_then(|ipos| find_by_id(ipos, id)) {
      Some(ipo) => println!("{:<6} {}", id, ipo.company_name),
      None => println!("{}", id),
    }
  }
}

fn print_row(session: &CacheSession<Ipo>, ipo: &Ipo) {
  let marks = format!(
    "{}{}",
    if session.is_favorite(&ipo.id) { "*" } else { " " },
    if session.is_in_watchlist(&ipo.id) { "w" } else { " " },
  );
  println!(
    "{} {:<6} {:<12} {:<9} {:<32} {}",
    marks, ipo.id, ipo.symbol, ipo.status, ipo.company_name, ipo.price_range
  );
}
