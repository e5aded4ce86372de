mod cache;
mod config;
mod session;
mod wp;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cache::{CacheWorker, HttpFetcher, SqliteStore};
use config::Config;
use session::FileTokenStore;
use wp::{ApiResult, HttpTransport, WordPressClient};

#[derive(Parser, Debug)]
#[command(name = "kelime")]
#[command(about = "Command line client for the Kelime vocabulary service")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/kelime/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Log in and store the session token
  Login {
    username: String,
    /// Password; read from KELIME_PASSWORD when omitted
    #[arg(short, long)]
    password: Option<String>,
  },
  /// Drop the stored session token
  Logout,
  /// Check whether the stored session token is still valid
  Status,
  /// Fetch the current study deck
  Deck,
  /// Record progress for a word
  Progress {
    word_id: String,
    /// Mark the word as known
    #[arg(long)]
    known: bool,
  },
  /// Show the logged-in user's profile
  Profile,
  /// Pre-cache the application shell and prune stale cache buckets
  Warm,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  let store = FileTokenStore::open()?;
  let client = WordPressClient::new(config.api.url.clone(), HttpTransport::new(), store);

  match args.command {
    Command::Login { username, password } => {
      let password = match password {
        Some(p) => p,
        None => Config::get_password()?,
      };
      let session = finish(client.login(&username, &password).await)?;
      if let Some(user) = session.user {
        println!("Logged in as {}", user.name);
      }
      Ok(())
    }
    Command::Logout => {
      client.logout();
      println!("Logged out");
      Ok(())
    }
    Command::Status => {
      if !client.is_logged_in() {
        println!("Not logged in");
        return Ok(());
      }
      finish(client.refresh_token().await)?;
      Ok(())
    }
    Command::Deck => {
      let words = finish(client.get_deck().await)?;
      for word in words {
        println!("{}\t{}\t{}", word.id, word.word, word.meaning);
      }
      Ok(())
    }
    Command::Progress { word_id, known } => {
      finish(client.update_progress(&word_id, known).await)?;
      Ok(())
    }
    Command::Profile => {
      let user = finish(client.get_user_profile().await)?;
      println!("{} (id {})", user.name, user.id);
      Ok(())
    }
    Command::Warm => warm(&config).await,
  }
}

/// Print the outcome message and surface failures as errors.
fn finish<T>(result: ApiResult<T>) -> Result<T> {
  match result {
    ApiResult::Success { data, message } => {
      println!("{}", message);
      Ok(data)
    }
    ApiResult::Failure { message } => Err(eyre!(message)),
  }
}

/// Install the application shell into the current cache bucket, then drop
/// every stale bucket.
async fn warm(config: &Config) -> Result<()> {
  let store = Arc::new(SqliteStore::open()?);
  let worker = CacheWorker::new(
    store,
    HttpFetcher::new(),
    config.cache.version.clone(),
    config.api_host()?,
  )
  .with_shell(config.cache_origin()?, config.cache.shell.clone());

  worker.install().await?;
  worker.activate()?;

  println!(
    "Cached {} shell assets into bucket {}",
    config.cache.shell.len(),
    config.cache.version
  );
  Ok(())
}
