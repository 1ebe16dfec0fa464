//! vpn-editor - inspect VPN editor plugins
//!
//! # Usage
//!
//! ```bash
//! # List installed plugin descriptions
//! vpn-editor list
//!
//! # Load a plugin and show what it advertises
//! vpn-editor show openvpn
//!
//! # Ask a plugin about a service type
//! vpn-editor --json service-info openvpn org.freedesktop.NetworkManager.openvpn
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use libvpneditor::plugin::{EditorPlugin, PluginInfo, PluginInfoStore};
use libvpneditor::{EditorConfig, PluginLoader};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// VPN editor plugin tool
#[derive(Parser, Debug)]
#[command(name = "vpn-editor")]
#[command(author = "netctl contributors")]
#[command(version)]
#[command(about = "Inspect and query VPN editor plugins", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory editor libraries are loaded from
    #[arg(long)]
    plugin_dir: Option<PathBuf>,

    /// Directory holding plugin descriptions
    #[arg(long)]
    info_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List plugin descriptions
    List,
    /// Load a plugin and show its identity and capabilities
    Show {
        /// Plugin name, service type or library path
        plugin: String,
    },
    /// Query get-service-info
    ServiceInfo {
        plugin: String,
        service_type: String,
    },
    /// Query get-service-add-details and each add-detail
    AddDetails {
        plugin: String,
        service_type: String,
    },
}

#[derive(Serialize)]
struct PluginSummary<'a> {
    name: &'a str,
    service: &'a str,
    plugin: Option<&'a str>,
    aliases: &'a [String],
    description_file: Option<String>,
}

#[derive(Serialize)]
struct PluginDetails<'a> {
    name: &'a str,
    description: &'a str,
    service: &'a str,
    capabilities: Vec<&'static str>,
    filename: Option<String>,
    residency: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.verbose { "debug" } else { "warn" };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vpn_editor={},libvpneditor={}", log_level, log_level)));

    // stdout carries command output, logs go to stderr
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<EditorConfig> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EditorConfig::default(),
    };
    let mut config = config.with_env_overrides();

    if let Some(dir) = &cli.plugin_dir {
        config.paths.plugin_dir = dir.clone();
    }
    if let Some(dir) = &cli.info_dir {
        config.paths.plugin_info_dir = dir.clone();
    }
    debug!("Using configuration {:?}", config);
    Ok(config)
}

async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let store = PluginInfoStore::scan(&config.paths.plugin_info_dir)
        .await
        .with_context(|| format!("Failed to read {}", config.paths.plugin_info_dir.display()))?;

    match &cli.command {
        Commands::List => handle_list(&store, cli.json),
        Commands::Show { plugin } => {
            let (plugin, _info) = open_plugin(&config, &store, plugin)?;
            handle_show(&plugin, cli.json)
        }
        Commands::ServiceInfo { plugin, service_type } => {
            let (plugin, _info) = open_plugin(&config, &store, plugin)?;
            let info = plugin
                .service_info(service_type)
                .with_context(|| format!("get-service-info failed for {}", service_type))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Service: {}", service_type);
                println!("  Short name: {}", info.short_name);
                println!("  Pretty name: {}", info.pretty_name);
                println!("  Description: {}", info.description);
                println!("  Flags: {:?}", info.flags);
            }
            Ok(())
        }
        Commands::AddDetails { plugin, service_type } => {
            let (plugin, _info) = open_plugin(&config, &store, plugin)?;
            let names = plugin
                .service_add_details(service_type)
                .with_context(|| format!("get-service-add-details failed for {}", service_type))?;
            let mut details = Vec::with_capacity(names.len());
            for name in &names {
                let detail = plugin
                    .service_add_detail(service_type, name)
                    .with_context(|| format!("get-service-add-detail failed for {}", name))?;
                details.push((name, detail));
            }
            if cli.json {
                let map: serde_json::Map<String, serde_json::Value> = details
                    .iter()
                    .map(|(name, detail)| Ok(((*name).clone(), serde_json::to_value(detail)?)))
                    .collect::<Result<_, serde_json::Error>>()?;
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else if details.is_empty() {
                println!("No add-details for {}", service_type);
            } else {
                for (name, detail) in &details {
                    println!("{}: {}", name, detail.pretty_name);
                    println!("  Description: {}", detail.description);
                    println!("  Key: {}", detail.add_detail_key);
                }
            }
            Ok(())
        }
    }
}

fn handle_list(store: &PluginInfoStore, json: bool) -> Result<()> {
    let summaries: Vec<PluginSummary<'_>> = store
        .list()
        .iter()
        .map(|info| PluginSummary {
            name: info.name(),
            service: info.service(),
            plugin: info.plugin(),
            aliases: info.aliases(),
            description_file: info.filename().map(|p| p.display().to_string()),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No VPN plugins found");
        return Ok(());
    }
    println!("{:<16} {:<48} {}", "NAME", "SERVICE", "PLUGIN");
    for summary in &summaries {
        println!(
            "{:<16} {:<48} {}",
            summary.name,
            summary.service,
            summary.plugin.unwrap_or("-")
        );
    }
    Ok(())
}

fn handle_show(plugin: &EditorPlugin, json: bool) -> Result<()> {
    let details = PluginDetails {
        name: plugin.name(),
        description: plugin.description(),
        service: plugin.service(),
        capabilities: plugin
            .capabilities()
            .iter_names()
            .map(|(name, _)| name)
            .collect(),
        filename: plugin.filename().map(|p| p.display().to_string()),
        residency: format!("{:?}", plugin.residency()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
    } else {
        println!("VPN Plugin: {}", details.name);
        println!("  Description: {}", details.description);
        println!("  Service: {}", details.service);
        println!("  Capabilities: {}", details.capabilities.join(", "));
        if let Some(filename) = &details.filename {
            println!("  Library: {}", filename);
        }
        println!("  Residency: {}", details.residency);
    }
    Ok(())
}

/// Resolve `plugin` through the descriptions (by name, then service type),
/// falling back to loading it as a library name or path. The returned record
/// must outlive the instance for its link to stay readable.
fn open_plugin(
    config: &EditorConfig,
    store: &PluginInfoStore,
    plugin: &str,
) -> Result<(Arc<EditorPlugin>, Option<Arc<PluginInfo>>)> {
    let loader = PluginLoader::from_config(config);
    let required_owner = config.required_owner();

    if let Some(info) = store.find_by_name(plugin).or_else(|| store.find_by_service(plugin)) {
        let editor = info
            .load_editor_plugin_with_owner(&loader, required_owner)
            .with_context(|| format!("Failed to load editor plugin for {}", info.name()))?;
        return Ok((editor, Some(info.clone())));
    }

    if plugin.contains('/') || plugin.ends_with(".so") {
        let editor = loader
            .load_from_file(plugin, None, required_owner, None)
            .with_context(|| format!("Failed to load editor plugin {}", plugin))?;
        return Ok((Arc::new(editor), None));
    }

    Err(anyhow!("VPN plugin '{}' not found", plugin))
}
