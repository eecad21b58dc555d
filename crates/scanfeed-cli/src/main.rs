mod logging;
mod render;
mod tail;
mod ui;

use std::error::Error;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use scanfeed_core::cache::keys;
use scanfeed_core::paginate::PAGE_SIZE_OPTIONS;
use scanfeed_core::persistence::load_cached_snapshot;
use scanfeed_core::timestamp::resolve_timezone_or_utc;
use scanfeed_core::CacheStore;
use scanfeed_core::ChannelUpdate;
use scanfeed_core::Config;
use scanfeed_core::MessageId;
use scanfeed_core::TimeWindow;
use scanfeed_core::ViewPreferences;
use scanfeed_sync::DataSync;
use scanfeed_sync::FeedBackend;
use scanfeed_sync::HttpBackend;
use tokio::runtime::Runtime;
use tracing::info;
use tracing::warn;

use crate::tail::TailOptions;

const APP_DIR: &str = "scanfeed";

#[derive(Debug, Parser)]
#[command(name = "scanfeed", version, about = "Live radio transcription feed in the terminal")]
struct Cli {
    /// Edge server base URL, e.g. http://10.0.0.5:5000
    #[arg(long, env = "SCANFEED_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Config file (default: <config dir>/scanfeed/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory, overriding the config file
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Full-screen live dashboard (the default)
    Watch,
    /// Print one page of the feed and exit
    Tail(TailArgs),
    /// Delete a recording on the server
    Delete { id: MessageId },
    /// Check that the endpoint answers
    Ping,
    /// Change a channel's settings on the server
    Channel(ChannelArgs),
}

#[derive(Debug, Args)]
struct TailArgs {
    /// 1 is the newest page
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, value_parser = parse_page_size)]
    per_page: Option<usize>,
    /// Case-insensitive text search
    #[arg(long)]
    search: Option<String>,
    /// Only messages containing any of these keywords
    #[arg(long = "keyword")]
    keywords: Vec<String>,
    /// Only these channel ids
    #[arg(long = "channel")]
    channels: Vec<String>,
    /// `all`, a minute count (30, 60, ...) or a label such as "Last 2 hours"
    #[arg(long)]
    window: Option<TimeWindow>,
    #[arg(long)]
    json: bool,
    /// Use the cached feed without contacting the server
    #[arg(long, conflicts_with = "refresh")]
    offline: bool,
    /// Fetch even when the cached feed is still fresh
    #[arg(long)]
    refresh: bool,
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Args)]
struct ChannelArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    driver: Option<String>,
    #[arg(long)]
    person: Option<String>,
    #[arg(long)]
    car: Option<String>,
    #[arg(long)]
    tag: Option<String>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    background_color: Option<String>,
    #[arg(long)]
    team_color: Option<String>,
    #[arg(long)]
    sensitivity: Option<f64>,
    #[arg(long)]
    silence: Option<f64>,
    #[arg(long)]
    min_rec: Option<f64>,
    #[arg(long)]
    max_rec: Option<f64>,
    #[arg(long)]
    audio_gain: Option<f64>,
}

impl ChannelArgs {
    fn update(&self) -> ChannelUpdate {
        ChannelUpdate {
            name: self.name.clone(),
            driver: self.driver.clone(),
            person: self.person.clone(),
            car: self.car.clone(),
            tag: self.tag.clone(),
            color: self.color.clone(),
            background_color: self.background_color.clone(),
            team_color: self.team_color.clone(),
            sensitivity: self.sensitivity,
            silence: self.silence,
            min_rec: self.min_rec,
            max_rec: self.max_rec,
            audio_gain: self.audio_gain,
        }
    }
}

fn parse_page_size(raw: &str) -> Result<usize, String> {
    let size: usize = raw.parse().map_err(|_| format!("not a number: {raw}"))?;
    if PAGE_SIZE_OPTIONS.contains(&size) {
        Ok(size)
    } else {
        Err(format!("page size must be one of {PAGE_SIZE_OPTIONS:?}"))
    }
}

/// Flags, environment and config file merged into what the commands need.
#[derive(Debug)]
struct Settings {
    config: Config,
    endpoint: Option<String>,
    cache_dir: PathBuf,
    log_dir: PathBuf,
}

impl Settings {
    fn resolve(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let config_path = cli
            .config
            .clone()
            .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml")));
        let config = match &config_path {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        let endpoint = cli
            .endpoint
            .clone()
            .or_else(|| config.server.endpoint.clone())
            .filter(|endpoint| !endpoint.trim().is_empty());
        let cache_dir = cli
            .cache_dir
            .clone()
            .or_else(|| config.cache.dir.clone())
            .or_else(|| dirs::cache_dir().map(|dir| dir.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from(".scanfeed"));
        let log_dir = dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR).join("logs"))
            .unwrap_or_else(|| cache_dir.join("logs"));
        Ok(Self {
            config,
            endpoint,
            cache_dir,
            log_dir,
        })
    }

    fn require_endpoint(&self) -> Result<&str, Box<dyn Error>> {
        self.endpoint.as_deref().ok_or_else(|| {
            "no endpoint configured (pass --endpoint, set SCANFEED_ENDPOINT or add [server] endpoint to the config)"
                .into()
        })
    }

    fn open_cache(&self) -> CacheStore {
        let cache = CacheStore::on_disk(&self.cache_dir);
        if !cache.init() {
            warn!(dir = %self.cache_dir.display(), "cache directory unavailable, continuing without it");
        }
        cache
    }

    fn backend(&self) -> Result<HttpBackend, Box<dyn Error>> {
        let endpoint = self.require_endpoint()?;
        Ok(HttpBackend::new(endpoint, self.config.request_timeout())?)
    }

    fn data_sync(&self, cache: CacheStore) -> Result<DataSync<HttpBackend>, Box<dyn Error>> {
        let fallback = resolve_timezone_or_utc(Some(&self.config.display.default_timezone));
        Ok(DataSync::new(self.backend()?, cache)
            .with_cache_ttl(self.config.cache_ttl())
            .with_fallback_timezone(fallback))
    }

    /// Stored preferences, or the configured page size on first run.
    fn initial_preferences(&self, cache: &CacheStore) -> ViewPreferences {
        match cache.get::<ViewPreferences>(keys::VIEW_PREFERENCES) {
            Some(prefs) => prefs.sanitized(),
            None => ViewPreferences {
                records_per_page: self.config.display.records_per_page,
                ..ViewPreferences::default()
            }
            .sanitized(),
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let settings = Settings::resolve(&cli)?;

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => {
            logging::init_file(&settings.log_dir)?;
            watch(&settings)
        }
        Command::Tail(args) => {
            logging::init_stderr()?;
            tail(&settings, args)
        }
        Command::Delete { id } => {
            logging::init_stderr()?;
            delete(&settings, id)
        }
        Command::Ping => {
            logging::init_stderr()?;
            ping(&settings)
        }
        Command::Channel(args) => {
            logging::init_stderr()?;
            update_channel(&settings, &args)
        }
    }
}

fn runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

fn watch(settings: &Settings) -> Result<(), Box<dyn Error>> {
    let cache = settings.open_cache();
    let sync = settings.data_sync(cache.clone())?;
    if load_cached_snapshot(&cache).is_none() {
        let endpoint = settings.require_endpoint()?;
        runtime()?
            .block_on(sync.ping())
            .map_err(|err| format!("{endpoint} did not answer: {err}"))?;
        info!(endpoint, "endpoint reachable");
    }
    let prefs = settings.initial_preferences(&cache);
    ui::run(sync, cache, prefs, settings.config.poll_interval())
}

fn tail(settings: &Settings, args: TailArgs) -> Result<(), Box<dyn Error>> {
    let cache = settings.open_cache();
    let snapshot = if args.offline {
        Arc::new(
            load_cached_snapshot(&cache)
                .ok_or("no cached feed yet; run once without --offline")?,
        )
    } else {
        let sync = settings.data_sync(cache.clone())?;
        let runtime = runtime()?;
        let result = if args.refresh {
            sync.restore_from_cache();
            runtime.block_on(sync.refresh()).map(drop)
        } else {
            runtime.block_on(sync.start()).map(drop)
        };
        match result {
            Ok(()) => {}
            Err(err) if !sync.snapshot().is_empty() => {
                warn!(error = %err, "refresh failed, printing cached feed");
            }
            Err(err) => return Err(err.into()),
        }
        sync.snapshot()
    };

    let options = TailOptions {
        page: args.page,
        per_page: args.per_page,
        search: args.search,
        keywords: args.keywords,
        channels: args.channels,
        window: args.window,
    };
    let prefs = options.apply(settings.initial_preferences(&cache), &snapshot);
    let color = !args.no_color && std::io::stdout().is_terminal();
    tail::print(&snapshot, &prefs, Utc::now(), args.json, color)
}

fn delete(settings: &Settings, id: MessageId) -> Result<(), Box<dyn Error>> {
    let cache = settings.open_cache();
    let sync = settings.data_sync(cache.clone())?;
    sync.restore_from_cache();
    runtime()?.block_on(sync.delete_message(id))?;
    cache.flush();
    println!("deleted message {id}");
    Ok(())
}

fn ping(settings: &Settings) -> Result<(), Box<dyn Error>> {
    let backend = settings.backend()?;
    runtime()?.block_on(backend.ping())?;
    println!("{} is reachable", backend.base_url());
    Ok(())
}

fn update_channel(settings: &Settings, args: &ChannelArgs) -> Result<(), Box<dyn Error>> {
    let update = args.update();
    if update.is_empty() {
        return Err("nothing to update; pass at least one setting flag".into());
    }
    let cache = settings.open_cache();
    let sync = settings.data_sync(cache.clone())?;
    let runtime = runtime()?;
    if sync.restore_from_cache().is_none() {
        runtime.block_on(sync.refresh())?;
    }
    let snapshot = runtime.block_on(sync.update_channel(&args.id, &update))?;
    cache.flush();
    if let Some(channel) = snapshot.channels.get(&args.id) {
        println!(
            "updated channel {}: {}",
            args.id,
            channel.label(&scanfeed_core::DisplayFields::default())
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn endpoint_flag_beats_config_file() {
        let dir = tempdir().expect("tempdir");
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "[server]\nendpoint = \"http://from-config:5000\"\n[cache]\ndir = \"/tmp/scanfeed-test\"\n",
        )
        .expect("write config");
        let config_arg = config_path.to_string_lossy().to_string();

        let cli = Cli::try_parse_from(["scanfeed", "--config", &config_arg, "ping"]).expect("parse");
        let settings = Settings::resolve(&cli).expect("settings");
        assert_eq!(settings.endpoint.as_deref(), Some("http://from-config:5000"));
        assert_eq!(settings.cache_dir, PathBuf::from("/tmp/scanfeed-test"));

        let cli = Cli::try_parse_from([
            "scanfeed",
            "--config",
            &config_arg,
            "--endpoint",
            "http://from-flag:5000",
            "ping",
        ])
        .expect("parse");
        let settings = Settings::resolve(&cli).expect("settings");
        assert_eq!(settings.endpoint.as_deref(), Some("http://from-flag:5000"));
    }

    #[test]
    fn tail_rejects_unknown_page_sizes_and_windows() {
        assert!(Cli::try_parse_from(["scanfeed", "tail", "--per-page", "50"]).is_ok());
        assert!(Cli::try_parse_from(["scanfeed", "tail", "--per-page", "15"]).is_err());
        assert!(Cli::try_parse_from(["scanfeed", "tail", "--window", "120"]).is_ok());
        assert!(Cli::try_parse_from(["scanfeed", "tail", "--window", "90"]).is_err());
    }

    #[test]
    fn channel_flags_build_a_partial_update() {
        let cli = Cli::try_parse_from(["scanfeed", "channel", "3", "--tag", "7", "--audio-gain", "1.5"])
            .expect("parse");
        let Some(Command::Channel(args)) = cli.command else {
            panic!("expected channel command");
        };
        assert_eq!(
            args.update(),
            ChannelUpdate {
                tag: Some("7".to_string()),
                audio_gain: Some(1.5),
                ..ChannelUpdate::default()
            }
        );
    }

    #[test]
    fn first_run_uses_configured_page_size() {
        let dir = tempdir().expect("tempdir");
        let mut settings = Settings {
            config: Config::default(),
            endpoint: None,
            cache_dir: dir.path().to_path_buf(),
            log_dir: dir.path().join("logs"),
        };
        settings.config.display.records_per_page = 50;
        let cache = settings.open_cache();
        assert_eq!(settings.initial_preferences(&cache).records_per_page, 50);

        let stored = ViewPreferences {
            records_per_page: 10,
            ..ViewPreferences::default()
        };
        stored.save(&cache);
        assert_eq!(settings.initial_preferences(&cache).records_per_page, 10);
        assert!(settings.require_endpoint().is_err());
    }
}
