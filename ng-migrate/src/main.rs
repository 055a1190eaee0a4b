use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ng_migrate::catalog::{builtin, load::load_catalog, Migration};
use ng_migrate::diff::print_changes;
use ng_migrate::migrate::{run_migrations, MigrationReport};
use ng_migrate::program::ProjectOptions;
use ng_migrate::state::{clean_old_state, format_history, generate_run_id, get_state_dir, record_run, revert_run};
use ng_migrate::tree::OverlayTree;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ng-migrate")]
#[command(about = "Rewrite an Angular/TypeScript project for a new component library release")]
#[command(long_about = "Catalog-driven migration engine for Angular/TypeScript projects.

Renames imported symbols (and every reference bound to them), moves symbols
between entry points, rewrites component templates (element, attribute and
property renames, attribute removal, class tokens), rewrites property accesses
by the static type of their receiver, and applies guarded text patterns.

Changes are staged in memory and only written with --apply, after every
catalog of every migration succeeded.")]
#[command(after_help = "Examples:
  ng-migrate list
  ng-migrate run --root . --migration element-v49
  ng-migrate run --root . --migration element-v49 --format diff
  ng-migrate run --root . --catalog my-renames.yaml --tsconfig tsconfig.app.json --apply
  ng-migrate history
  ng-migrate revert 3f2a9c1")]
#[command(version)]
struct Cli {
    /// Use project-local state directory (.ng-migrate) instead of the user data directory
    #[arg(long, global = true)]
    local_state: bool,

    /// Log every per-file decision
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or more migrations over a project
    Run {
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Built-in migration to run (repeatable, runs in order)
        #[arg(short, long)]
        migration: Vec<String>,

        /// Catalog file (YAML or JSON) to run (repeatable, runs in order)
        #[arg(short, long)]
        catalog: Vec<PathBuf>,

        /// tsconfig to compile (repeatable); defaults to the ones named in angular.json
        #[arg(long)]
        tsconfig: Vec<String>,

        /// Only rewrite files under this directory (relative to the root)
        #[arg(long)]
        path: Option<String>,

        /// Extension of the source files to rewrite
        #[arg(long, default_value = ".ts")]
        extension: String,

        /// Output format: "default", "diff", or "summary"
        #[arg(long, default_value = "default")]
        format: String,

        /// Write the changes to disk (default is a dry run)
        #[arg(long)]
        apply: bool,
    },

    /// List built-in migrations
    List,

    /// Print a built-in migration's catalogs as YAML documents
    Show {
        #[arg(short, long)]
        migration: String,
    },

    /// Show recent applied runs
    History {
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Restore the files changed by a run
    Revert {
        run_id: String,

        /// Revert even if files changed since the run
        #[arg(long)]
        force: bool,
    },

    /// Remove run state older than the given number of days
    Clean {
        #[arg(long, default_value = "30")]
        keep_days: u32,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ng_migrate=debug" } else { "ng_migrate=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn collect_migrations(names: &[String], catalogs: &[PathBuf]) -> Result<Vec<Migration>> {
    let mut migrations = Vec::new();
    for name in names {
        migrations.push(builtin::find(name)?);
    }
    if !catalogs.is_empty() {
        let mut loaded = Vec::new();
        for path in catalogs {
            let catalog = load_catalog(path)
                .with_context(|| format!("Failed to load catalog {}", path.display()))?;
            loaded.push(catalog);
        }
        migrations.push(Migration {
            name: "custom".to_string(),
            description: "catalogs given on the command line".to_string(),
            catalogs: loaded,
        });
    }
    if migrations.is_empty() {
        bail!("Nothing to run: pass --migration NAME or --catalog FILE (see `ng-migrate list`)");
    }
    Ok(migrations)
}

fn print_report(report: &MigrationReport) {
    println!("Migration {}:", report.migration);
    for catalog in &report.catalogs {
        println!("  {:<16} {} edit(s) in {} file(s)", catalog.name, catalog.edits, catalog.files.len());
    }
    println!("  Files scanned: {}", report.files_scanned);
    println!("  Files modified: {}", report.files_modified.len());
    for skipped in &report.skipped_templates {
        println!("  Skipped template {}: {}", skipped.path, skipped.reason);
    }
    for skipped in &report.skipped_sources {
        println!("  Skipped source {}: {}", skipped.path, skipped.reason);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { root, migration, catalog, tsconfig, path, extension, format, apply } => {
            if !matches!(format.as_str(), "default" | "diff" | "summary") {
                bail!("Unknown format '{}': expected default, diff or summary", format);
            }
            let migrations = collect_migrations(&migration, &catalog)?;
            let root = root
                .canonicalize()
                .with_context(|| format!("Project root {} does not exist", root.display()))?;
            let options = ProjectOptions { tsconfigs: tsconfig, path_filter: path, extension };

            let mut tree = OverlayTree::load(&root)
                .with_context(|| format!("Failed to index project at {}", root.display()))?;
            let reports = match run_migrations(&mut tree, &migrations, &options) {
                Ok(reports) => reports,
                Err(err) => {
                    tree.discard();
                    return Err(err).with_context(|| format!("Migration failed in {}", root.display()));
                }
            };

            let changes = tree.changes();
            match format.as_str() {
                "diff" => {
                    let stats = print_changes(&changes);
                    stats.print_summary();
                }
                "summary" => {
                    let edits: usize = reports.iter().map(MigrationReport::total_edits).sum();
                    println!("{} edit(s), {} file(s) changed", edits, changes.len());
                }
                _ => reports.iter().for_each(print_report),
            }

            if changes.is_empty() {
                println!("\nNo changes");
            } else if apply {
                let state_dir = get_state_dir(cli.local_state)?;
                let run_id = generate_run_id();
                let names = migrations.iter().map(|m| m.name.clone()).collect();
                record_run(&run_id, &root, "run", names, &changes, &state_dir)
                    .context("Failed to record run state")?;
                let written = tree.persist().context("Failed to write changes")?;
                info!(run_id = %run_id, files = written.len(), "applied migration");
                println!("\nApplied to {} file(s) (run {}, revert with `ng-migrate revert {}`)", written.len(), run_id, run_id);
            } else {
                println!("\nDry run: {} file(s) would change. Use --apply to write them.", changes.len());
            }
        }

        Commands::List => {
            for migration in builtin::all() {
                println!("{:<14} {}", migration.name, migration.description);
                for catalog in &migration.catalogs {
                    println!("    {:<16} {} instruction(s)", catalog.name, catalog.instructions.len());
                }
            }
        }

        Commands::Show { migration } => {
            let migration = builtin::find(&migration)?;
            for (index, catalog) in migration.catalogs.iter().enumerate() {
                if index > 0 {
                    println!("---");
                }
                print!("{}", serde_yaml::to_string(catalog).context("Failed to serialize catalog")?);
            }
        }

        Commands::History { limit } => {
            let state_dir = get_state_dir(cli.local_state)?;
            let lines = format_history(limit, &state_dir)?;
            if lines.is_empty() {
                println!("No runs found");
            } else {
                println!("Recent runs (showing up to {}):\n", limit);
                lines.iter().for_each(|line| println!("{}", line));
            }
        }

        Commands::Revert { run_id, force } => {
            let state_dir = get_state_dir(cli.local_state)?;
            let restored = revert_run(&run_id, force, &state_dir)?;
            for path in &restored {
                println!("  Restored: {}", path.display());
            }
            println!("Run {} reverted ({} file(s))", run_id, restored.len());
        }

        Commands::Clean { keep_days } => {
            let state_dir = get_state_dir(cli.local_state)?;
            let cleaned = clean_old_state(keep_days, &state_dir)?;
            println!("Cleaned {} old run(s)", cleaned);
        }
    }

    Ok(())
}
