use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{
    AttendanceLedger, Backends, Identity, IdentityCache, MarkOutcome, PortraitStore, Profile,
    RecordStore, SystemClock,
};
use rollcall_store::{DirPortraitStore, SqliteRecordStore};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance records CLI")]
struct Cli {
    /// Attendance database
    #[arg(long, global = true, default_value_os_t = rollcall_store::default_db_path())]
    db: PathBuf,

    /// Portrait directory
    #[arg(long, global = true, default_value_os_t = rollcall_store::default_portrait_dir())]
    portraits: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load or replace records from a TOML seed file
    Seed {
        /// Seed file with a [students.<id>] table per record
        file: PathBuf,
    },
    /// List all records
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one record
    Show {
        /// Identity to show
        id: String,
    },
    /// Mark attendance now, unless already marked today
    Mark {
        /// Identity to mark
        id: String,
    },
    /// Validate a descriptor gallery file
    Gallery {
        /// JSON gallery file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seed { file } => {
            let store = open_store(&cli.db)?;
            let records = rollcall_store::load_seed(&file)
                .with_context(|| format!("failed to load seed file {}", file.display()))?;
            let written = rollcall_store::apply_seed(&store, &records)?;
            println!("Seeded {written} record(s) into {}", cli.db.display());
        }
        Commands::List { json } => {
            let store = open_store(&cli.db)?;
            let records = store.list()?;
            if json {
                let map: serde_json::Map<String, serde_json::Value> = records
                    .iter()
                    .map(|(id, p)| Ok((id.to_string(), serde_json::to_value(p)?)))
                    .collect::<Result<_, serde_json::Error>>()?;
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else if records.is_empty() {
                println!("No records");
            } else {
                println!("{:<8} {:<24} {:>6}  LAST ATTENDANCE", "ID", "NAME", "TOTAL");
                for (id, profile) in &records {
                    println!(
                        "{:<8} {:<24} {:>6}  {}",
                        id,
                        profile.name.as_deref().unwrap_or("-"),
                        profile.total(),
                        profile.last_attendance_time.as_deref().unwrap_or("never"),
                    );
                }
            }
        }
        Commands::Show { id } => {
            let store = open_store(&cli.db)?;
            let id = Identity::from(id);
            let Some(profile) = store.fetch(&id)? else {
                anyhow::bail!("no record for {id}");
            };
            print_profile(&id, &profile);
            let portraits = DirPortraitStore::new(&cli.portraits);
            let portrait = match portraits.fetch(&id) {
                Ok(Some(_)) => portraits.path_for(&id)?.display().to_string(),
                Ok(None) => "none".to_string(),
                Err(err) => format!("unavailable ({err})"),
            };
            println!("{:<16} {portrait}", "portrait");
        }
        Commands::Mark { id } => {
            let store = open_store(&cli.db)?;
            let portraits = DirPortraitStore::new(&cli.portraits);
            let clock = SystemClock;
            let backends = Backends::new(&store, &portraits, &clock);
            let mut cache = IdentityCache::new();
            let mut ledger = AttendanceLedger::new();
            let id = Identity::from(id);

            match ledger.mark_if_needed(&id, &mut cache, &backends)? {
                MarkOutcome::Marked { before, after, at } => {
                    println!("Marked {id}: {before} -> {after} at {at}");
                }
                MarkOutcome::AlreadyMarkedToday | MarkOutcome::SessionHit => {
                    println!("{id} is already marked today");
                }
            }
        }
        Commands::Gallery { file } => {
            let gallery = rollcall_store::load_gallery(&file)?;
            let mut ids: Vec<&Identity> = gallery.iter().map(|f| &f.id).collect();
            ids.sort();
            ids.dedup();
            let dims = gallery.first().map_or(0, |f| f.embedding.values.len());
            println!(
                "{} descriptor(s), {} identit(ies), {dims} dimensions",
                gallery.len(),
                ids.len()
            );
            for id in ids {
                let count = gallery.iter().filter(|f| &f.id == id).count();
                println!("  {id}: {count}");
            }
        }
    }

    Ok(())
}

fn open_store(path: &std::path::Path) -> Result<SqliteRecordStore> {
    tracing::debug!(path = %path.display(), "opening attendance database");
    SqliteRecordStore::open(path, Duration::from_secs(2))
        .with_context(|| format!("failed to open database {}", path.display()))
}

fn print_profile(id: &Identity, profile: &Profile) {
    let opt = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    println!("{:<16} {id}", "id");
    println!("{:<16} {}", "name", opt(profile.name.clone()));
    println!("{:<16} {}", "major", opt(profile.major.clone()));
    println!("{:<16} {}", "standing", opt(profile.standing.clone()));
    println!("{:<16} {}", "year", opt(profile.year.map(|y| y.to_string())));
    println!(
        "{:<16} {}",
        "starting_year",
        opt(profile.starting_year.map(|y| y.to_string()))
    );
    println!("{:<16} {}", "total_attendance", profile.total());
    println!(
        "{:<16} {}",
        "last_attendance",
        opt(profile.last_attendance_time.clone())
    );
}
