// SpaceTraders fleet coordination worker - Main Entry Point
// Every process started from here is one worker sharing the coordination store

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing::{error, info};

use spacetraders_coord::models::Orders;
use spacetraders_coord::storage::DirectiveStore;
use spacetraders_coord::{
    load_agent_token, verbosity, CoordConfig, Gateway, LeaseManager, Result, Store, SystemClock, Worker,
};

#[derive(Parser)]
#[command(name = "spacetraders_coord")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Coordinate a SpaceTraders fleet across independent worker processes")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Lease holder id of this worker (defaults to one derived from the pid)
    #[arg(long, global = true)]
    holder: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run coordination cycles until the directive is withdrawn
    Run {
        /// Switch the directive on before starting
        #[arg(long)]
        activate: bool,
    },
    /// Turn a shared directive on or off for every worker
    Directive { name: String, state: Switch },
    /// Discover the jump-gate graph breadth-first from a system
    Explore {
        system: String,
        #[arg(long, default_value_t = 2)]
        depth: u32,
    },
    /// Reclaim stale leases once and exit
    Reap,
    /// Give a ship standing orders, or `default` to let its role decide
    Orders { ship: String, orders: OrdersArg },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrdersArg {
    Mine,
    Haul,
    Idle,
    Default,
}

impl OrdersArg {
    fn stored(self) -> Option<Orders> {
        match self {
            OrdersArg::Mine => Some(Orders::Mine),
            OrdersArg::Haul => Some(Orders::Haul),
            OrdersArg::Idle => Some(Orders::Idle),
            OrdersArg::Default => None,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    verbosity::init_tracing(cli.verbose.saturating_add(1));

    if let Err(e) = execute(cli).await {
        error!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config = CoordConfig::load_or_create(&cli.config)?;
    config.validate()?;
    let store = Store::connect(&config.storage.database_url).await?;
    let holder = cli.holder.unwrap_or_else(|| format!("worker-{}", std::process::id()));

    match cli.command {
        Commands::Directive { name, state } => {
            DirectiveStore::new(store).set(&name, matches!(state, Switch::On)).await
        }
        Commands::Orders { ship, orders } => {
            lease_manager(&config, store, holder).set_orders(&ship, orders.stored()).await
        }
        Commands::Reap => {
            let leases = lease_manager(&config, store, holder);
            let reaped = leases
                .reap_stale(config.leases.stale_threshold_minutes, &config.leases.reap_roles)
                .await?;
            info!("🧹 Reaped {} lease(s)", reaped);
            Ok(())
        }
        Commands::Explore { system, depth } => {
            let worker = build_worker(config, store, &holder)?;
            let visited = worker.router().explore(&system, depth).await?;
            let edges = worker.router().graph().edge_count().await?;
            info!("🗺️ {} system(s) visited, {} edge(s) known", visited.len(), edges);
            Ok(())
        }
        Commands::Run { activate } => {
            config.print_summary();
            let directive = config.timing.directive.clone();
            let worker = build_worker(config, store, &holder)?;
            if activate {
                worker.directives().set(&directive, true).await?;
            }
            info!("🚀 Worker {} starting", holder);
            worker.run().await
        }
    }
}

fn lease_manager(config: &CoordConfig, store: Store, holder: String) -> LeaseManager {
    LeaseManager::new(
        store,
        holder,
        Arc::new(SystemClock),
        chrono::Duration::minutes(config.leases.stale_threshold_minutes),
    )
}

fn build_worker(config: CoordConfig, store: Store, holder: &str) -> Result<Worker> {
    let token = load_agent_token()?;
    let clock = Arc::new(SystemClock);
    let gateway = Gateway::from_config(&config.api, &token, clock.clone())?;
    Ok(Worker::new(config, gateway, store, holder, clock))
}
