//! Applies and reverts the Global Names index migrations.
//!
//! ```text
//! gnindex --database-url postgres://localhost/gnindex status
//! gnindex up --target 20170921222425
//! gnindex down --target 0 --dry-run
//! gnindex sql 20171204101828 --down
//! ```

use std::future::Future;

use clap::{Parser, Subcommand};
use gnindex::{
    migrator::{CancelHandle, Report, Status},
    Config, MigrationId, MigrationUnit, Registry, Runner, DEFAULT_TABLE_PREFIX,
};
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(name = "gnindex")]
#[command(about = "Schema migrations for the Global Names index database")]
struct Args {
    /// PostgreSQL connection url
    #[arg(long, env = "GNINDEX_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Prefix of the migration record table
    #[arg(long, env = "GNINDEX_TABLE_PREFIX", default_value = DEFAULT_TABLE_PREFIX, global = true)]
    table_prefix: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations
    Up {
        /// Last migration to apply, all pending ones when omitted
        #[arg(long)]
        target: Option<MigrationId>,

        /// Print the plan without applying it
        #[arg(long)]
        dry_run: bool,
    },
    /// Revert applied migrations newer than the target
    Down {
        #[arg(long)]
        target: MigrationId,

        #[arg(long)]
        dry_run: bool,
    },
    /// List applied, pending and unknown migrations
    Status,
    /// Print the statements of one migration
    Sql {
        id: MigrationId,

        #[arg(long)]
        down: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
                tracing_subscriber::EnvFilter::try_new("gnindex=info,gnindex_migrator=info")
            })?,
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let registry = gnindex::catalog()?;

    if let Command::Sql { id, down } = &args.command {
        return print_sql(&registry, *id, *down);
    }

    let config = Config::new(args.database_url.unwrap_or_default()).table_prefix(args.table_prefix);
    let store = gnindex::connect(&config).await?;
    store.setup().await?;

    let mut runner = Runner::new(registry, store);

    match args.command {
        Command::Up {
            target,
            dry_run: true,
        } => print_plan("apply", runner.plan_up(target).await?),
        Command::Up { target, .. } => {
            cancel_on(tokio::signal::ctrl_c(), runner.cancel_handle());
            print_report(&runner.migrate_up(target).await?)
        }
        Command::Down {
            target,
            dry_run: true,
        } => print_plan("revert", runner.plan_down(target).await?),
        Command::Down { target, .. } => {
            cancel_on(tokio::signal::ctrl_c(), runner.cancel_handle());
            print_report(&runner.migrate_down(target).await?)
        }
        Command::Status => print_status(&runner, &runner.status().await?),
        Command::Sql { .. } => {}
    }

    Ok(())
}

/// Cancels the run once `signal` fires. The unit in flight still completes.
fn cancel_on<F>(signal: F, handle: CancelHandle) -> JoinHandle<()>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if signal.await.is_ok() {
            tracing::info!("Received Ctrl+C, stopping after the current migration");
            handle.cancel();
        }
    })
}

fn print_sql(registry: &Registry, id: MigrationId, down: bool) -> anyhow::Result<()> {
    let unit = registry.get(id)?;

    let operation = match (down, &unit.down) {
        (false, _) => &unit.up,
        (true, Some(down)) => down,
        (true, None) => anyhow::bail!("migration {id} has no down operation"),
    };

    for statement in operation.to_sql()? {
        println!("{statement};");
    }

    Ok(())
}

fn print_plan(verb: &str, units: Vec<&MigrationUnit>) {
    if units.is_empty() {
        println!("nothing to {verb}");
    }

    for unit in units {
        println!("would {verb} {} {}", unit.id, unit.description);
    }
}

fn print_report(report: &Report) {
    for id in &report.completed {
        println!("{} {id}", report.direction);
    }

    if report.cancelled {
        println!("cancelled");
    }
}

fn print_status(runner: &Runner, status: &Status) {
    for record in &status.applied {
        let description = runner
            .registry()
            .get(record.migration_id)
            .map(|unit| unit.description.as_str())
            .unwrap_or_default();

        println!(
            "applied  {} {}  {description}",
            record.migration_id,
            record.applied_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    for id in &status.pending {
        let description = runner
            .registry()
            .get(*id)
            .map(|unit| unit.description.as_str())
            .unwrap_or_default();

        println!("pending  {id}  {description}");
    }

    for id in &status.unknown {
        println!("unknown  {id}");
    }
}
