//! Floodlight command-line client
//!
//! Every subcommand maps to one controller operation and prints the result
//! as pretty JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fl_circuit::{CircuitPusher, CircuitRequest};
use fl_core::{
    ControllerConfig, DeviceFilter, FlowMatch, FlowScope, StatType, StaticFlowEntry,
    ETHER_TYPE_IPV4,
};
use fl_rest::FloodlightClient;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "floodlight")]
#[command(about = "Query and program a Floodlight controller over its REST API")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Controller address (URL, host:port or host)
    #[arg(short, long, global = true)]
    controller: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Controller config file (JSON or YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connected switches
    Switches,

    /// Switch statistics (all switches unless --switch is given)
    Stats {
        /// port, queue, flow, aggregate, desc, table or features
        #[arg(default_value = "port")]
        stat: StatType,

        #[arg(long)]
        switch: Option<String>,
    },

    /// Controller summary
    Summary,

    /// Packet counters
    Counters {
        /// Counter title
        #[arg(default_value = "all")]
        title: String,

        /// Read a per-switch counter
        #[arg(long)]
        switch: Option<String>,
    },

    /// Controller memory usage
    Memory,

    /// Controller uptime
    Uptime,

    /// Controller health
    Health,

    /// Inter-switch links
    Links,

    /// Switch clusters
    Clusters,

    /// Links leaving the OpenFlow domain
    ExternalLinks,

    /// Tracked hosts
    Devices {
        #[arg(long)]
        mac: Option<String>,
        #[arg(long)]
        ipv4: Option<String>,
        #[arg(long)]
        vlan: Option<u16>,
        #[arg(long)]
        dpid: Option<String>,
        #[arg(long)]
        port: Option<u32>,
    },

    /// Route between two switch ports
    Route {
        src_dpid: String,
        src_port: u32,
        dst_dpid: String,
        dst_port: u32,
    },

    /// Static flow entries
    Flow {
        #[command(subcommand)]
        action: FlowCommand,
    },

    /// Bidirectional IPv4 circuits
    Circuit {
        #[command(subcommand)]
        action: CircuitCommand,
    },

    /// Virtual networks (default tenant)
    Vnet {
        #[command(subcommand)]
        action: VnetCommand,
    },
}

#[derive(Subcommand, Debug)]
enum FlowCommand {
    /// List entries on one switch or "all"
    List {
        #[arg(default_value = "all")]
        scope: String,
    },

    /// Install or replace an entry
    Add {
        name: String,
        #[arg(long)]
        switch: String,
        /// Action list, e.g. output=2
        #[arg(long)]
        actions: String,
        #[arg(long)]
        ingress_port: Option<u32>,
        #[arg(long)]
        src_mac: Option<String>,
        #[arg(long)]
        dst_mac: Option<String>,
        #[arg(long)]
        vlan_id: Option<u16>,
        /// Defaults to IPv4 when an IP match is given
        #[arg(long)]
        ether_type: Option<String>,
        #[arg(long)]
        protocol: Option<u8>,
        #[arg(long)]
        src_ip: Option<String>,
        #[arg(long)]
        dst_ip: Option<String>,
        #[arg(long)]
        src_port: Option<u16>,
        #[arg(long)]
        dst_port: Option<u16>,
        #[arg(long)]
        priority: Option<u16>,
        /// Install the entry disabled
        #[arg(long)]
        inactive: bool,
    },

    /// Delete an entry by name
    Delete { name: String },

    /// Delete all entries on one switch or "all"
    Clear {
        #[arg(default_value = "all")]
        scope: String,
    },
}

#[derive(Subcommand, Debug)]
enum CircuitCommand {
    /// Install a circuit between two hosts
    Push {
        name: String,
        src_ip: String,
        dst_ip: String,

        /// Remove already installed flows if a later install fails
        #[arg(long)]
        rollback: bool,
    },

    /// Installed flows of a circuit
    List { name: String },

    /// Delete every flow of a circuit
    Remove { name: String },
}

#[derive(Subcommand, Debug)]
enum VnetCommand {
    Create {
        network: String,
        #[arg(long)]
        gateway: Option<String>,
    },
    Update {
        network: String,
        #[arg(long)]
        gateway: Option<String>,
    },
    Delete {
        network: String,
    },
    /// Attach a host MAC to a logical port
    Attach {
        network: String,
        port: u32,
        mac: String,
    },
    /// Detach the host on a logical port
    Detach {
        network: String,
        port: u32,
    },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from /etc/floodlight/environment (if exists)
    fl_core::config::load_environment();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("floodlight=info".parse()?)
        .add_directive("fl_circuit=info".parse()?)
        .add_directive("fl_rest=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = resolve_config(&args)?;
    debug!("Using controller at {}", config.base_url);
    let client = Arc::new(
        FloodlightClient::new(&config).context("Failed to create controller client")?,
    );

    run(args.command, client).await
}

/// Config file or environment, then command-line overrides
fn resolve_config(args: &Args) -> Result<ControllerConfig> {
    let mut config = match &args.config {
        Some(path) => ControllerConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ControllerConfig::from_env().context("Invalid controller environment")?,
    };

    if let Some(controller) = &args.controller {
        config.base_url = ControllerConfig::for_controller(controller)?.base_url;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    Ok(config)
}

async fn run(command: Commands, client: Arc<FloodlightClient>) -> Result<()> {
    match command {
        Commands::Switches => print_json(&client.switches().await?),
        Commands::Stats { stat, switch } => {
            let stats = match switch {
                Some(dpid) => client.switch_stats(&dpid, stat).await?,
                None => client.aggregate_switch_stats(stat).await?,
            };
            print_json(&stats)
        }
        Commands::Summary => print_json(&client.controller_summary().await?),
        Commands::Counters { title, switch } => {
            let counters = match switch {
                Some(dpid) => client.switch_counters(&dpid, &title).await?,
                None => client.global_counters(&title).await?,
            };
            print_json(&counters)
        }
        Commands::Memory => print_json(&client.memory_usage().await?),
        Commands::Uptime => print_json(&client.uptime().await?),
        Commands::Health => print_json(&client.health().await?),
        Commands::Links => print_json(&client.links().await?),
        Commands::Clusters => print_json(&client.switch_clusters().await?),
        Commands::ExternalLinks => print_json(&client.external_links().await?),
        Commands::Devices {
            mac,
            ipv4,
            vlan,
            dpid,
            port,
        } => {
            let filter = DeviceFilter {
                mac,
                ipv4,
                vlan,
                dpid,
                port,
            };
            print_json(&client.devices(&filter).await?)
        }
        Commands::Route {
            src_dpid,
            src_port,
            dst_dpid,
            dst_port,
        } => {
            let hops = client
                .route(&src_dpid, src_port, &dst_dpid, dst_port)
                .await?;
            print_json(&hops)
        }
        Commands::Flow { action } => run_flow(action, &client).await,
        Commands::Circuit { action } => run_circuit(action, client).await,
        Commands::Vnet { action } => run_vnet(action, &client).await,
    }
}

async fn run_flow(action: FlowCommand, client: &FloodlightClient) -> Result<()> {
    match action {
        FlowCommand::List { scope } => {
            print_json(&client.list_flows(&FlowScope::parse(&scope)).await?)
        }
        FlowCommand::Add {
            name,
            switch,
            actions,
            ingress_port,
            src_mac,
            dst_mac,
            vlan_id,
            ether_type,
            protocol,
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            priority,
            inactive,
        } => {
            let flow_match = with_default_ether_type(FlowMatch {
                ingress_port,
                src_mac,
                dst_mac,
                vlan_id,
                ether_type,
                protocol,
                src_ip,
                dst_ip,
                src_port,
                dst_port,
            });
            let mut entry = StaticFlowEntry::new(name, switch, flow_match, actions);
            if let Some(priority) = priority {
                entry = entry.with_priority(priority);
            }
            if inactive {
                entry = entry.with_active(false);
            }
            let status = client
                .add_flow(&entry)
                .await
                .with_context(|| format!("Failed to push flow {}", entry.name))?;
            print_json(&status)
        }
        FlowCommand::Delete { name } => print_json(&client.delete_flow(&name).await?),
        FlowCommand::Clear { scope } => {
            let scope = FlowScope::parse(&scope);
            client.clear_flows(&scope).await?;
            print_json(&serde_json::json!({ "cleared": scope.to_string() }))
        }
    }
}

async fn run_circuit(action: CircuitCommand, client: Arc<FloodlightClient>) -> Result<()> {
    let pusher = CircuitPusher::from_client(client);
    match action {
        CircuitCommand::Push {
            name,
            src_ip,
            dst_ip,
            rollback,
        } => {
            let request = CircuitRequest::new(name, src_ip, dst_ip);
            let result = pusher
                .with_rollback(rollback)
                .push_circuit(&request)
                .await
                .map_err(|e| {
                    let hint = e.suggestion();
                    anyhow::Error::new(e).context(format!(
                        "Failed to push circuit {} ({})",
                        request.name_prefix, hint
                    ))
                })?;
            print_json(&result)
        }
        CircuitCommand::List { name } => print_json(&pusher.circuit_flows(&name).await?),
        CircuitCommand::Remove { name } => {
            let removed = pusher
                .remove_circuit(&name)
                .await
                .with_context(|| format!("Failed to remove circuit {}", name))?;
            print_json(&removed)
        }
    }
}

async fn run_vnet(action: VnetCommand, client: &FloodlightClient) -> Result<()> {
    match action {
        VnetCommand::Create { network, gateway } => print_json(
            &client
                .create_virtual_network(&network, gateway.as_deref())
                .await?,
        ),
        VnetCommand::Update { network, gateway } => print_json(
            &client
                .update_virtual_network(&network, gateway.as_deref())
                .await?,
        ),
        VnetCommand::Delete { network } => {
            print_json(&client.delete_virtual_network(&network).await?)
        }
        VnetCommand::Attach { network, port, mac } => {
            print_json(&client.attach_host(&network, port, &mac).await?)
        }
        VnetCommand::Detach { network, port } => {
            print_json(&client.detach_host(&network, port).await?)
        }
        VnetCommand::List => print_json(&client.virtual_networks().await?),
    }
}

/// IP matches are only accepted by the controller together with an
/// EtherType, so fill in IPv4 when none was given.
fn with_default_ether_type(mut flow_match: FlowMatch) -> FlowMatch {
    let has_ip = flow_match.src_ip.is_some() || flow_match.dst_ip.is_some();
    if has_ip && flow_match.ether_type.is_none() {
        flow_match.ether_type = Some(ETHER_TYPE_IPV4.to_string());
    }
    flow_match
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
