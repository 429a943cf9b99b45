//! iptv_guide - command line front end
//! Loads an M3U playlist and/or an XMLTV guide and queries them

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::error::Error;
use std::io::Write;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::{debug, info};
use serde::Serialize;

use iptv_guide::epg::{self, EpgParser, Programme, SearchField};
use iptv_guide::{AppConfig, ContentCategory, FetchConfig, M3uParser, PlaylistEntry};

#[derive(Parser)]
#[command(name = "iptv_guide")]
#[command(about = "Inspect IPTV playlists and XMLTV programme guides")]
#[command(version)]
struct Cli {
    /// Playlist URL or path (defaults to the configured source)
    #[arg(short, long)]
    playlist: Option<String>,

    /// XMLTV URL or path (defaults to config, then the playlist's x-tvg-url)
    #[arg(short, long)]
    epg: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show playlist and guide statistics
    Stats,
    /// List group titles of a bucket (live, movie, series)
    Categories { bucket: ContentCategory },
    /// List entries of a bucket, optionally limited to one group title
    Items {
        bucket: ContentCategory,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Search playlist entries by title
    Search {
        query: String,
        #[arg(short, long)]
        bucket: Option<ContentCategory>,
    },
    /// Show what is airing now and next on a channel
    Now { channel: String },
    /// Show a channel's schedule from now on
    Schedule {
        channel: String,
        /// Hours ahead to include
        #[arg(long, default_value = "24")]
        hours: i64,
    },
    /// Search guide titles, descriptions and categories
    GuideSearch { query: String },
    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

fn init_logger(config: &AppConfig) {
    // RUST_LOG wins over the configured level
    Builder::from_env(Env::default().default_filter_or(config.log_level.as_str()))
        .format_timestamp(None)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn load_playlist(cli: &Cli, config: &AppConfig, fetch: &FetchConfig) -> Result<M3uParser, Box<dyn Error>> {
    let location = cli
        .playlist
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| Some(config.playlist_source.clone()).filter(|s| !s.is_empty()))
        .ok_or("no playlist given (use --playlist or set playlist_source in the config)")?;

    info!("Loading playlist from {}", location);
    let content = iptv_guide::source::load_text(&location, fetch)?;
    let mut parser = M3uParser::with_classifier(config.classifier());
    parser.parse(&content)?;
    Ok(parser)
}

fn guide_location(cli: &Cli, config: &AppConfig, fetch: &FetchConfig) -> Result<String, Box<dyn Error>> {
    if let Some(location) = cli.epg.clone().filter(|s| !s.is_empty()) {
        return Ok(location);
    }
    if !config.epg_source.is_empty() {
        return Ok(config.epg_source.clone());
    }
    // Fall back to the guide advertised in the playlist header
    let playlist = load_playlist(cli, config, fetch)?;
    playlist
        .index()
        .epg_url()
        .map(str::to_string)
        .ok_or_else(|| "no guide given (use --epg, set epg_source, or use a playlist with x-tvg-url)".into())
}

fn load_guide(cli: &Cli, config: &AppConfig, fetch: &FetchConfig) -> Result<EpgParser, Box<dyn Error>> {
    let location = guide_location(cli, config, fetch)?;
    info!("Loading guide from {}", location);
    let content = iptv_guide::source::load_text(&location, fetch)?;
    let mut parser = EpgParser::new();
    parser.parse(&content)?;
    Ok(parser)
}

fn print_entries(entries: &[PlaylistEntry], json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        return print_json(entries);
    }
    for entry in entries {
        println!(
            "[{}] {} | {} | {}",
            entry.category,
            entry.title,
            entry.group_title.as_deref().unwrap_or("-"),
            entry.url
        );
    }
    println!("{} item(s)", entries.len());
    Ok(())
}

fn programme_line(p: &Programme) -> String {
    let mut line = format!("{}  {}", epg::format_slot(p.start, p.stop), p.title().unwrap_or("(untitled)"));
    if let Some(ep) = p.episode_label() {
        line.push_str(&format!(" [{}]", ep));
    }
    if !p.categories.is_empty() {
        line.push_str(&format!(" ({})", p.categories.join(", ")));
    }
    line
}

fn print_programmes(programmes: &[Programme], json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        return print_json(programmes);
    }
    for p in programmes {
        println!("{}  {}", p.channel, programme_line(p));
    }
    Ok(())
}

fn run(cli: &Cli, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let fetch = config.fetch_config();

    match &cli.command {
        Command::Stats => {
            let have_playlist = cli.playlist.is_some() || !config.playlist_source.is_empty();
            let have_guide = cli.epg.is_some() || !config.epg_source.is_empty();
            if !have_playlist && !have_guide {
                return Err("nothing to inspect (use --playlist and/or --epg)".into());
            }

            let playlist = if have_playlist {
                Some(load_playlist(cli, config, &fetch)?.index().stats())
            } else {
                None
            };
            let guide = if have_guide {
                Some(load_guide(cli, config, &fetch)?.index().stats())
            } else {
                None
            };

            if cli.json {
                #[derive(Serialize)]
                struct Report {
                    playlist: Option<iptv_guide::PlaylistStats>,
                    guide: Option<iptv_guide::EpgStats>,
                }
                return print_json(&Report { playlist, guide });
            }
            if let Some(s) = playlist {
                println!("Playlist: {} live, {} movies, {} series ({} total)", s.live_count, s.movie_count, s.series_count, s.total);
            }
            if let Some(s) = guide {
                println!(
                    "Guide: {} channels ({} with programmes), {} programmes, {} categories",
                    s.channel_count, s.channels_with_programmes, s.programme_count, s.category_count
                );
            }
        }
        Command::Categories { bucket } => {
            let categories = load_playlist(cli, config, &fetch)?.index().categories(*bucket);
            if cli.json {
                return print_json(&categories);
            }
            for name in &categories {
                println!("{}", name);
            }
        }
        Command::Items { bucket, category } => {
            let parser = load_playlist(cli, config, &fetch)?;
            let entries = parser.index().items_by_category(*bucket, category.as_deref());
            print_entries(&entries, cli.json)?;
        }
        Command::Search { query, bucket } => {
            let parser = load_playlist(cli, config, &fetch)?;
            let entries = parser.index().search(query, *bucket);
            print_entries(&entries, cli.json)?;
        }
        Command::Now { channel } => {
            let guide = load_guide(cli, config, &fetch)?;
            let index = guide.index();
            let current = index.current_programme(channel, None);
            let next = index.next_programme(channel, None);

            if cli.json {
                #[derive(Serialize)]
                struct NowNext {
                    current: Option<Programme>,
                    next: Option<Programme>,
                }
                return print_json(&NowNext { current, next });
            }
            let name = index.channel(channel).map(|c| c.name().to_string()).unwrap_or_else(|| channel.clone());
            println!("{}", name);
            match current {
                Some(p) => println!("  Now:  {}", programme_line(&p)),
                None => println!("  Now:  (nothing scheduled)"),
            }
            if let Some(p) = next {
                println!("  Next: {}", programme_line(&p));
            }
        }
        Command::Schedule { channel, hours } => {
            let guide = load_guide(cli, config, &fetch)?;
            let now = Utc::now();
            let programmes = guide
                .index()
                .programmes_for_channel(channel, Some(now), Some(now + Duration::hours(*hours)));
            debug!("{} programme(s) on {} in the next {}h", programmes.len(), channel, hours);
            if cli.json {
                return print_json(&programmes);
            }
            for p in &programmes {
                println!("{}", programme_line(p));
            }
        }
        Command::GuideSearch { query } => {
            let guide = load_guide(cli, config, &fetch)?;
            let results = guide.index().search(query, Some(&SearchField::DEFAULT[..]));
            print_programmes(&results, cli.json)?;
        }
        Command::Config { save } => {
            if *save {
                let path = config.save()?;
                println!("Saved {}", path.display());
            } else {
                println!("# {}", AppConfig::config_path().display());
            }
            print_json(config)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let config = AppConfig::load();
    init_logger(&config);

    if let Err(e) = run(&cli, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
