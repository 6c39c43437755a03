mod cli;

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use filmix::config::{self, Config};
use filmix::types::{Film, FilmUpdate, RefreshReport};
use filmix::Filmix;
use tracing_subscriber::EnvFilter;

const TABLE_WIDTH: usize = 110;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.command.debug());
    let config_path = match &cli.config {
        Some(p) => p.clone(),
        None => config::config_path()?,
    };

    match cli.command {
        Commands::Init { db_path, force } => {
            let mut cfg = Config::load(Some(&config_path))?;
            if let Some(p) = db_path {
                cfg.db_path = Some(p);
            }
            let db_path = match &cfg.db_path {
                Some(p) => p.clone(),
                None => filmix::db::default_db_path()?,
            };
            cfg.db_path = Some(db_path.clone());
            cfg.save(&config_path).context("creating config file failed")?;
            Filmix::init_database(&db_path, force).await.context("creating film list failed")?;
            println!("The film list is {}", db_path.display());
        }
        Commands::Add { url, name_selector, quality_selector } => {
            let app = open_filmix(&config_path)?;
            let film = app.add(&url, &name_selector, &quality_selector).await.context("adding film failed")?;
            println!("New url: \"{}\"\nName Selector: {}\nQuality Selector: {}", film.url, film.name_selector, film.quality_selector);
        }
        Commands::List { fetch, verbose, debug } => {
            let app = open_filmix(&config_path)?;
            if fetch {
                let report = refresh(&app, debug).await?;
                print_report(&report);
            }
            let films = app.films().await?;
            if films.is_empty() {
                println!("There are no films in the list yet");
                return Ok(());
            }
            print_table(&films, verbose)?;
        }
        Commands::Fetch { debug } => {
            let app = open_filmix(&config_path)?;
            let report = refresh(&app, debug).await?;
            print_report(&report);
        }
        Commands::Change { ids, url, name, name_selector, quality_selector } => {
            let app = open_filmix(&config_path)?;
            let update = FilmUpdate { url, name, name_selector, quality_selector, ..Default::default() };
            for id in ids {
                let film = app.change(id, &update).await.with_context(|| format!("changing film #{id} failed"))?;
                println!("{id}. {}", film_fields(&film)?);
            }
        }
        Commands::Remove { id, force } => {
            let app = open_filmix(&config_path)?;
            if !force {
                let films = app.films().await?;
                let Some(film) = id.checked_sub(1).and_then(|i| films.get(i)) else { bail!("invalid film id {id}") };
                if !confirm(&format!("Delete film #{id}: {}?", film.display_name()))? {
                    println!("Operation canceled");
                    return Ok(());
                }
            }
            let film = app.remove(id).await.with_context(|| format!("removing film #{id} failed"))?;
            println!("film #{id}: '{}' was removed", film.display_name());
        }
        Commands::Clear { force } => {
            let app = open_filmix(&config_path)?;
            if !force && !confirm("Delete all films?")? {
                println!("Operation canceled");
                return Ok(());
            }
            app.remove_all().await.context("removing films failed")?;
            println!("All films were removed");
        }
        Commands::Open { id } => {
            let app = open_filmix(&config_path)?;
            let films = app.films().await?;
            let Some(film) = id.checked_sub(1).and_then(|i| films.get(i)) else { bail!("invalid film id {id}") };
            webbrowser::open(&film.url).with_context(|| format!("opening {}", film.url))?;
        }
    }
    Ok(())
}

fn init_logging(debug: bool) {
    let default = if debug { "filmix=debug" } else { "filmix=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn open_filmix(config_path: &Path) -> Result<Filmix> {
    let env_db = std::env::var_os(config::DB_PATH_ENV).is_some();
    if !config_path.exists() && !env_db {
        bail!("Config file not found. Please, run \"filmix init\"");
    }
    let cfg = Config::load(Some(config_path))?;
    let db_path = match &cfg.db_path {
        Some(p) => p.clone(),
        None => filmix::db::default_db_path()?,
    };
    if !db_path.exists() {
        bail!("Film list {} not found. Please, run \"filmix init\"", db_path.display());
    }
    Filmix::connect(&cfg)
}

async fn refresh(app: &Filmix, debug: bool) -> Result<RefreshReport> {
    let report = app
        .refresh_all_with_progress(debug, |p| eprintln!("[{}/{}] {}", p.current, p.total, p.current_item))
        .await?;
    Ok(report)
}

fn print_report(report: &RefreshReport) {
    println!(
        "Checked {} films ({} already up to date): {} fetched, {} updated, {} failed",
        report.scheduled, report.up_to_date, report.fetched, report.updated, report.failed
    );
}

fn print_table(films: &[Film], verbose: bool) -> Result<()> {
    let header = format!("Film List {}", env!("CARGO_PKG_VERSION"));
    println!("\n{header:^width$}", width = TABLE_WIDTH);
    let spacer = "-".repeat(TABLE_WIDTH);
    println!("{spacer}");
    let id_width = films.len().to_string().len();
    for (i, film) in films.iter().enumerate() {
        let id = i + 1;
        if verbose {
            println!("{}", film_fields(film)?);
            continue;
        }
        let mut line = format!(" {id:>id_width$}. {:<50}", film.display_name());
        if let Some(q) = &film.quality {
            line.push_str(&format!("{q:<18}"));
        }
        if let Some(imdb) = &film.imdb_rating {
            line.push_str(&format!("IMDB:{imdb:<18}"));
        }
        if let Some(r) = &film.community_rating {
            line.push_str(&format!("Filmix:{r}"));
        }
        println!("{}", line.trim_end());
    }
    println!("{spacer}\n");
    Ok(())
}

/// Every stored field as `key:value`, sorted by key.
fn film_fields(film: &Film) -> Result<String> {
    let value = serde_json::to_value(film)?;
    let fields = value
        .as_object()
        .map(|o| {
            o.iter()
                .map(|(k, v)| format!("{k}:{}", v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    Ok(fields.join("| "))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N]: ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
