//! Manage the assistant's allowlist.

use clap::Parser;
use java_hud::allowlist::{self, EntryKind};
use java_hud::config::AssistantConfig;
use std::path::PathBuf;
use tracing::info;

/// Add, remove, or list allowlisted applications and websites.
#[derive(Parser)]
#[command(name = "java-add", version, about, arg_required_else_help = true)]
struct Cli {
    /// Allow an application by name.
    #[arg(long, value_name = "NAME")]
    app: Vec<String>,

    /// Allow a website (hostname or URL).
    #[arg(long, value_name = "URL")]
    site: Vec<String>,

    /// Remove an application.
    #[arg(long, value_name = "NAME")]
    remove_app: Vec<String>,

    /// Remove a website.
    #[arg(long, value_name = "URL")]
    remove_site: Vec<String>,

    /// Print the current allowlist.
    #[arg(short, long)]
    list: bool,

    /// Allowlist JSON document (defaults to the configured path).
    #[arg(long)]
    allowlist: Option<PathBuf>,

    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = java_hud::logging::init(None);

    let path = match &cli.allowlist {
        Some(path) => path.clone(),
        None => AssistantConfig::load_or_default(cli.config.as_deref())?
            .allowlist
            .path,
    };

    let mut list = allowlist::load_for_edit(&path)?;
    let mut changed = false;

    let edits = [
        (EntryKind::Application, &cli.app, true),
        (EntryKind::Website, &cli.site, true),
        (EntryKind::Application, &cli.remove_app, false),
        (EntryKind::Website, &cli.remove_site, false),
    ];
    for (kind, values, add) in edits {
        for value in values {
            let label = label(kind);
            if add {
                if list.add(kind, value) {
                    println!("Added {label} '{}'", value.trim());
                    changed = true;
                } else {
                    println!("{label} '{}' is already allowed", value.trim());
                }
            } else if list.remove(kind, value) {
                println!("Removed {label} '{}'", value.trim());
                changed = true;
            } else {
                println!("{label} '{}' was not in the allowlist", value.trim());
            }
        }
    }

    if changed {
        allowlist::save(&path, &list)?;
        info!("allowlist written to {}", path.display());
    }

    if cli.list {
        println!("Allowlist: {}", path.display());
        print_section("Applications", &list.applications);
        print_section("Websites", &list.websites);
    }

    Ok(())
}

fn label(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Application => "application",
        EntryKind::Website => "website",
    }
}

fn print_section(title: &str, entries: &[String]) {
    println!("{title}:");
    if entries.is_empty() {
        println!("  (none, everything allowed)");
    }
    for entry in entries {
        println!("  - {entry}");
    }
}
