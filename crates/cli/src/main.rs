//! labinv - shared lab inventory spreadsheets from the command line.
//!
//! Every command works on one of the lab's inventory workbooks: it downloads
//! the registered file, applies the change and uploads it again, refusing
//! the upload if someone else saved in the meantime.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use labinv_core::occupancy::constraints;
use labinv_core::picker::PickerView;
use labinv_core::{Intent, InventoryKind, InventorySchema, Submission};
use labinv_engine::{AppConfig, ArchiveOutcome, EngineError, InventorySession, Services, UploadOutcome};
use labinv_storage::{IdRegistry, Recovery, ScratchFiles, SqliteBlobStore};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "labinv")]
#[command(about = "Shared lab inventory spreadsheets")]
#[command(version)]
struct Args {
    /// Config file (default: $LABINV_CONFIG, then ./labinv.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered remote file ids
    Ids,
    /// Point a registry key at a different remote id
    SetId { key: String, id: String },
    /// Upload a local workbook as the inventory's remote file
    Import { inventory: InventoryKind, file: PathBuf },
    /// Print every record of an inventory
    Show { inventory: InventoryKind },
    /// Occupied locations of one container
    Occupancy {
        inventory: InventoryKind,
        /// Container key as FIELD=VALUE, repeatable
        #[arg(short = 'k', long = "key", value_parser = parse_entry)]
        keys: Vec<(String, String)>,
    },
    /// Draw the slot picker for one container
    Picker {
        inventory: InventoryKind,
        #[arg(short, long = "entry", value_parser = parse_entry)]
        entries: Vec<(String, String)>,
        /// Show removable slots instead of free ones
        #[arg(long)]
        remove: bool,
    },
    /// Dropdown options for each column, narrowed by the given entries
    Suggest {
        inventory: InventoryKind,
        #[arg(short, long = "entry", value_parser = parse_entry)]
        entries: Vec<(String, String)>,
    },
    /// Add one or more units
    Add {
        inventory: InventoryKind,
        #[arg(short, long = "entry", value_parser = parse_entry)]
        entries: Vec<(String, String)>,
    },
    /// Remove one or more units after confirmation
    Remove {
        inventory: InventoryKind,
        #[arg(short, long = "entry", value_parser = parse_entry)]
        entries: Vec<(String, String)>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Create this half-year's archive if it does not exist yet
    Archive {
        /// Date to archive for (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn parse_entry(raw: &str) -> Result<(String, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{raw}'"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((field.to_string(), value.to_string()))
}

fn submission(entries: &[(String, String)]) -> Submission {
    let mut submission = Submission::new();
    for (field, value) in entries {
        submission.set(field, value);
    }
    submission
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::resolve(args.config.as_deref()).context("Failed to load config")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter.as_str().into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let store = SqliteBlobStore::open(&config.store_path.to_string_lossy())
        .with_context(|| format!("Failed to open store {}", config.store_path.display()))?;
    let registry = IdRegistry::load(&config.registry_path)
        .with_context(|| format!("Failed to load registry {}", config.registry_path.display()))?;
    let scratch = ScratchFiles::new(&config.scratch_dir)
        .context("Failed to prepare scratch directory")?
        .with_retry(config.cleanup_attempts, config.cleanup_backoff());
    let mut services = Services::new(store, registry, scratch);

    let result = run(&mut services, args.command);

    let open = services.scratch.open_files();
    if !open.is_empty() {
        warn!(files = ?open, "scratch files still open; close them to let cleanup finish");
    }
    let leftover = services.scratch.cleanup();
    if leftover.is_empty() {
        info!("scratch files cleaned up");
    }

    result.map_err(with_recovery_hint)
}

/// Tell the user how to get past a bad or missing remote id.
fn with_recovery_hint(err: anyhow::Error) -> anyhow::Error {
    let needs_id = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<EngineError>())
        .any(|e| matches!(e, EngineError::Remote(remote) if remote.recovery() == Recovery::ReplaceIdentifier));
    if needs_id {
        err.context("Register the right file with `labinv set-id <KEY> <ID>` and try again")
    } else {
        err
    }
}

fn run(services: &mut Services<SqliteBlobStore>, command: Command) -> Result<()> {
    match command {
        Command::Ids => {
            for (key, id) in services.registry.all() {
                println!("{key}\t{}", if id.is_empty() { "-" } else { id });
            }
        }
        Command::SetId { key, id } => {
            services.replace_identifier(&key, &id.as_str().into())?;
            println!("{key} -> {}", id.trim());
        }
        Command::Import { inventory, file } => {
            let mut session = InventorySession::import(services, inventory.schema(), &file)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            let outcome = session.publish()?;
            println!("{} records uploaded", session.records().len());
            report_upload(&outcome);
        }
        Command::Show { inventory } => {
            let session = InventorySession::open(services, inventory.schema())?;
            let records = session.records();
            let columns: Vec<&String> = records
                .columns()
                .iter()
                .filter(|c| !session.schema().hidden_fields.contains(*c))
                .collect();
            println!("{}", columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join("\t"));
            for record in records.records() {
                let row: Vec<String> = columns.iter().map(|c| record.key(c)).collect();
                println!("{}", row.join("\t"));
            }
        }
        Command::Occupancy { inventory, keys } => {
            let session = InventorySession::open(services, inventory.schema())?;
            let pairs: Vec<(&str, &str)> = keys.iter().map(|(f, v)| (f.as_str(), v.as_str())).collect();
            let occupied = session.occupied(&constraints(&pairs));
            if occupied.is_empty() {
                println!("(empty)");
            } else {
                println!("{}", occupied.into_iter().collect::<Vec<_>>().join(", "));
            }
        }
        Command::Picker {
            inventory,
            entries,
            remove,
        } => {
            let session = InventorySession::open(services, inventory.schema())?;
            let intent = if remove { Intent::Remove } else { Intent::Add };
            let view = session.picker(&submission(&entries), intent)?;
            print_picker(&view);
        }
        Command::Suggest { inventory, entries } => {
            let session = InventorySession::open(services, inventory.schema())?;
            for (field, options) in session.suggestions(&submission(&entries)) {
                let shown: Vec<&str> = options.iter().map(String::as_str).filter(|o| !o.is_empty()).collect();
                println!("{}: {}", field_label(session.schema(), &field), shown.join(" | "));
            }
        }
        Command::Add { inventory, entries } => {
            let mut session = InventorySession::open(services, inventory.schema())?;
            let outcome = session.submit_add(&submission(&entries))?;
            println!("Added at {}", outcome.locations.join(", "));
            report_upload(&outcome.upload);
        }
        Command::Remove {
            inventory,
            entries,
            yes,
        } => {
            let mut session = InventorySession::open(services, inventory.schema())?;
            let plan = session.submit_remove(&submission(&entries))?;
            println!("{}", plan.preview());
            if !yes && !confirm("Remove these items?")? {
                session.cancel_remove();
                println!("Cancelled.");
                return Ok(());
            }
            let outcome = session.confirm_remove()?;
            println!("Removed {} record(s) at {}", outcome.removed, outcome.locations.join(", "));
            report_upload(&outcome.upload);
        }
        Command::Archive { date } => {
            let today = date.unwrap_or_else(|| Local::now().date_naive());
            match services.auto_archive(today)? {
                ArchiveOutcome::AlreadyArchived { name } => println!("Already archived: {name}"),
                ArchiveOutcome::Created {
                    name, copied, skipped, ..
                } => {
                    println!("Created {name} with {} file(s)", copied.len());
                    if !skipped.is_empty() {
                        println!("Skipped: {}", skipped.join(", "));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Field name with its entry format, e.g. `Date Frozen (MM/DD/YYYY)`.
fn field_label(schema: &InventorySchema, field: &str) -> String {
    match schema.format_hint(field) {
        Some(hint) => format!("{field} ({hint})"),
        None => field.to_string(),
    }
}

fn report_upload(outcome: &UploadOutcome) {
    match outcome {
        UploadOutcome::Updated { .. } => println!("Remote file updated."),
        UploadOutcome::Created { id, .. } => println!("Remote file created: {id}"),
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer)? == 0 {
        bail!("no answer on stdin; pass --yes to remove without asking");
    }
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// `X` occupied, `*` selected, `.` free. Slots the intent cannot use are
/// shown in parentheses.
fn print_picker(view: &PickerView) {
    println!("{}", view.title);
    let cell = |code: &str| {
        let Some(slot) = view.slot(code) else {
            return String::new();
        };
        let mark = if slot.selected {
            "*"
        } else if slot.occupied {
            "X"
        } else {
            "."
        };
        if slot.selectable(view.intent) {
            format!(" {code}{mark} ")
        } else {
            format!("({code}{mark})")
        }
    };

    match view.grid {
        Some((_, cols)) => {
            for row in view.slots.chunks(cols.max(1) as usize) {
                let line: Vec<String> = row.iter().map(|s| format!("{:>7}", cell(&s.code))).collect();
                println!("{}", line.join(""));
            }
        }
        None => {
            let line: Vec<String> = view.slots.iter().map(|s| cell(&s.code)).collect();
            println!("{}", line.join(" "));
        }
    }
    if !view.selection().is_empty() {
        println!("Selected: {}", view.selection());
    }
}
