use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use tag_catalog::catalog::{Catalog, FileEdit, FileInput};
use tag_catalog::utils::config::{self, FileOpenMode, IniSettings, CONFIG_FILE_NAME};
use tag_catalog::utils::open_plan;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "files.db")]
    db_path: PathBuf,

    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read or change the open-file preference
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    #[command(flatten)]
    Catalog(CatalogCommand),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Register an existing file or folder
    Register {
        path: PathBuf,
        #[arg(short, long, default_value = "")]
        name: String,
        #[arg(short, long)]
        memo: Option<String>,
        /// Comma-separated tags
        #[arg(short, long, default_value = "")]
        tags: String,
    },
    /// List files, optionally filtered by name and tag substrings
    Search {
        #[arg(short, long, default_value = "")]
        name: String,
        #[arg(short, long, default_value = "")]
        tag: String,
        #[arg(long)]
        json: bool,
    },
    /// Change name and path of a registered file; memo and tags are kept unless given
    Update {
        id: i64,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        path: String,
        /// New memo; pass "" to clear it
        #[arg(short, long)]
        memo: Option<String>,
        /// New comma-separated tags; pass "" to remove all
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// Replace only the tags of a registered file
    Retag {
        id: i64,
        /// Comma-separated tags
        #[arg(short, long, default_value = "")]
        tags: String,
    },
    /// Remove a file from the catalog
    Delete { id: i64 },
    /// Remove a tag from the registry and from every file
    DeleteTag { name: String },
    /// List tags with the number of files using them
    Tags {
        #[arg(long)]
        json: bool,
    },
    /// List catalog tables with record counts
    Tables,
    /// Show the column layout of a table
    Columns { table: String },
    /// Dump the records of a table
    Records { table: String },
    /// Show what opening a file would bring up
    Open { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Get,
    /// NONE (folder only), ONLY (file only) or BOTH
    Set { mode: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    let mut settings = IniSettings::new(&args.config);
    match args.command {
        Command::Config { action } => run_config(&mut settings, &action),
        Command::Catalog(command) => {
            let mut catalog = Catalog::open(&args.db_path)
                .with_context(|| format!("Failed to open catalog {:?}", args.db_path))?;
            info!("Catalog schema version {}", catalog.store().version()?);
            run_catalog(&mut catalog, &settings, command)
        }
    }
}

fn run_catalog(
    catalog: &mut Catalog,
    settings: &IniSettings,
    command: CatalogCommand,
) -> Result<()> {
    match command {
        CatalogCommand::Register { path, name, memo, tags } => {
            let input = FileInput {
                name,
                path: path.to_string_lossy().into_owned(),
                memo,
                tags,
            };
            let id = catalog.register(&input)?;
            println!("Registered file {}", id);
        }
        CatalogCommand::Search { name, tag, json } => {
            let entries = catalog.search(&name, &tag)?;
            if json {
                print_json(&entries)?;
            } else {
                for e in &entries {
                    let kind = if e.is_dir() { "dir" } else { "file" };
                    println!(
                        "{}\t{}\t{}\t{}\t[{}]\t{}\t{}",
                        e.id,
                        kind,
                        e.filename,
                        e.filepath,
                        e.tag_list().join(", "),
                        e.memo.as_deref().unwrap_or(""),
                        e.created_at
                    );
                }
            }
        }
        CatalogCommand::Retag { id, tags } => {
            catalog.retag(id, &tags)?;
            println!("Updated tags of file {}", id);
        }
        CatalogCommand::Update { id, name, path, memo, tags } => {
            catalog.edit(id, &FileEdit { name, path, memo, tags })?;
            println!("Updated file {}", id);
        }
        CatalogCommand::Delete { id } => {
            catalog.delete(id)?;
            println!("Deleted file {}", id);
        }
        CatalogCommand::DeleteTag { name } => {
            if catalog.delete_tag(&name)? {
                println!("Deleted tag '{}'", name);
            } else {
                println!("No tag named '{}'", name);
            }
        }
        CatalogCommand::Tags { json } => {
            let tags = catalog.tags()?;
            if json {
                print_json(&tags)?;
            } else {
                for t in &tags {
                    println!("{}\t{}({})", t.id, t.name, t.count);
                }
            }
        }
        CatalogCommand::Tables => {
            for t in catalog.tables()? {
                println!("{}\t{}", t.name, t.record_count);
            }
        }
        CatalogCommand::Columns { table } => {
            for c in catalog.columns(&table)? {
                let nullable = if c.nullable { "NULL" } else { "NOT NULL" };
                let pk = if c.primary_key { "PK" } else { "" };
                println!("{}\t{}\t{}\t{}", c.name, c.decl_type, nullable, pk);
            }
        }
        CatalogCommand::Records { table } => {
            let records = catalog.records(&table)?;
            println!("{}", records.columns.join("\t"));
            for row in &records.rows {
                println!("{}", row.join("\t"));
            }
        }
        CatalogCommand::Open { id } => {
            let record = catalog
                .get(id)?
                .with_context(|| format!("File {} is not registered", id))?;
            let mode = config::file_open_mode(settings)?;
            for target in open_plan::open_targets(Path::new(&record.filepath), mode) {
                println!("{}", target.display());
            }
        }
    }

    Ok(())
}

fn run_config(settings: &mut IniSettings, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get => {
            println!("{}", config::file_open_mode(&*settings)?);
        }
        ConfigAction::Set { mode } => {
            let mode: FileOpenMode = mode.parse()?;
            config::set_file_open_mode(settings, mode)?;
            info!("Saved {} to {:?}", mode, settings.path());
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to encode JSON")?);
    Ok(())
}
