//! tickwork CLI: operator interface to the competition controller.

use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use tickwork::config::Config;
use tickwork::config::secrets::{ExposeSecret, expose_optional};
use tickwork::db::Db;
use tickwork::engine::{ControlConfig, ControlPlane, TickScheduler};
use tickwork::model::Access;
use tickwork::store::{ControlStore, TaskStore, VpnStatusStore};
use tickwork::telemetry::{TelemetryConfig, init_telemetry};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "tickwork", about = "Competition tick controller")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the tick controller
    Controller {
        /// Keep minting ticks past the nominal end of the competition
        #[arg(long, env = "TICKWORK_NONSTOP", value_parser = BoolishValueParser::new())]
        nonstop: bool,
        /// Observe only; any tick advance fails with a permission error
        #[arg(long)]
        read_only: bool,
    },
    /// Show the competition control record
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count open tasks of a service at the current tick
    Open {
        /// Service slug
        slug: String,
    },
    /// List active teams
    Teams,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Controller { nonstop, read_only } => {
            cmd_controller(config, nonstop, read_only).await
        }
        Command::Teams => {
            let db = connect(&config).await?;
            cmd_teams(&db).await
        }
        Command::Status { json } => {
            let db = connect(&config).await?;
            cmd_status(&db, json).await
        }
        Command::Open { slug } => {
            let db = connect(&config).await?;
            cmd_open(&db, &slug).await
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<Db> {
    let db = Db::connect_with_state(
        config.database_url.expose_secret(),
        expose_optional(&config.state_database_url),
    )
    .await?;
    Ok(db)
}

async fn cmd_controller(config: Config, nonstop: bool, read_only: bool) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "tickwork-controller".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let db = connect(&config).await?;
    if !read_only {
        db.migrate().await?;
    }

    let access = if read_only {
        Access::ReadOnly
    } else {
        Access::ReadWrite
    };
    let scheduler = TickScheduler::new(Arc::new(db)).with_access(access);
    let control = ControlPlane::new(
        scheduler,
        ControlConfig {
            nonstop,
            ..ControlConfig::default()
        },
    );

    let ctrl = control.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        ctrl.shutdown();
    });

    control.run().await?;
    Ok(())
}

async fn cmd_status(db: &Db, json: bool) -> anyhow::Result<()> {
    let Some(control) = db.control(Access::ReadOnly).await? else {
        println!("Competition is not configured.");
        return Ok(());
    };

    let now = chrono::Utc::now();
    if json {
        let value = serde_json::json!({
            "start": control.start,
            "end": control.end(),
            "tick_duration_secs": control.tick_duration.num_seconds(),
            "valid_ticks": control.valid_ticks,
            "current_tick": control.current_tick,
            "target_tick": control.target_tick(now),
            "running": control.is_running(now),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Start:        {}", control.start);
    println!("End:          {}", control.end());
    println!("Tick length:  {}s", control.tick_duration.num_seconds());
    println!("Valid ticks:  {}", control.valid_ticks);
    println!("Current tick: {}", control.current_tick);
    match control.target_tick(now) {
        Some(target) => println!("Clock tick:   {target}"),
        None => println!("Clock tick:   - (not started)"),
    }
    println!(
        "Running:      {}",
        if control.is_running(now) { "yes" } else { "no" }
    );
    if control.current_tick >= 0 {
        println!(
            "Tick window:  {} .. {}",
            control.tick_start(control.current_tick),
            control.tick_end(control.current_tick)
        );
    }
    Ok(())
}

async fn cmd_open(db: &Db, slug: &str) -> anyhow::Result<()> {
    let service = db.service_by_slug(slug, Access::ReadOnly).await?;
    let open = db.count_open(service.id, Access::ReadOnly).await?;
    println!("{} ({}): {open} open task(s)", service.name, service.slug);
    Ok(())
}

async fn cmd_teams(db: &Db) -> anyhow::Result<()> {
    let teams = db.active_teams(Access::ReadOnly).await?;
    if teams.is_empty() {
        println!("No active teams.");
        return Ok(());
    }
    println!("{:<6} NET", "ID");
    for team in teams {
        println!("{:<6} {}", team.id, team.net_number);
    }
    Ok(())
}
