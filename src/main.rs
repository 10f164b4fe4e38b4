#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use attrcfg::config::{AppConfig, parse_level};
use attrcfg::constants::env;
use attrcfg::storage::{CatalogClient, EntityStore, FileStore, ItemFilter};
use attrcfg::types::{AttributeId, CatalogItem, GroupId, ItemId, ItemStatus, Tenant};
use attrcfg::{EditingSession, SaveError, SaveOutcome, load_session};

#[derive(Parser)]
#[command(name = "attrcfg", about = "Attribute-group configuration for catalog items", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Tenant to operate under (overrides config and ATTRCFG_TENANT)
    #[arg(long, global = true)]
    tenant: Option<String>,

    /// Record store file (overrides config and ATTRCFG_DATA)
    #[arg(long, global = true)]
    data: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage attribute groups
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },
    /// Manage attributes
    Attribute {
        #[command(subcommand)]
        action: AttributeAction,
    },
    /// Browse catalog items and edit their configuration
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },
}

#[derive(Subcommand)]
enum GroupAction {
    /// List all groups
    List,
    /// Create a group
    Add { name: String },
    /// Rename a group
    Rename { id: String, name: String },
    /// Delete a group (detaches it from its attributes)
    Remove { id: String },
    /// Search groups by name
    Search { query: String },
}

#[derive(Subcommand)]
enum AttributeAction {
    /// List all attributes with their groups
    List,
    /// Create an attribute
    Add {
        name: String,
        /// Group id the attribute belongs to (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,
    },
    /// Rename an attribute and replace its groups
    Update {
        id: String,
        name: String,
        #[arg(long = "group")]
        groups: Vec<String>,
    },
    /// Delete an attribute
    Remove { id: String },
}

#[derive(Subcommand)]
enum ItemAction {
    /// List catalog items
    List {
        /// Case-insensitive title search
        #[arg(long)]
        query: Option<String>,
        /// Status filter (repeatable)
        #[arg(long, value_enum)]
        status: Vec<ItemStatus>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Register a catalog item in the local store
    Add {
        handle: String,
        title: String,
        #[arg(long, value_enum, default_value = "active")]
        status: ItemStatus,
    },
    /// Show an item's groups, values and document
    Show { handle: String },
    /// Edit an item's configuration and save it
    Edit {
        handle: String,
        /// Group name to select (repeatable)
        #[arg(long)]
        select: Vec<String>,
        /// Group name to deselect (repeatable)
        #[arg(long)]
        deselect: Vec<String>,
        /// ATTRIBUTE=VALUE (repeatable)
        #[arg(long)]
        set: Vec<String>,
        /// Replace the document with raw JSON text
        #[arg(long)]
        raw: Option<String>,
        /// Print the result without saving
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_logging(config: &AppConfig) -> Result<()> {
    // LOG_LEVEL wins over the config file
    let log_level: TraceLevel = match std::env::var(env::LOG_LEVEL) {
        Ok(level) => parse_level(&level),
        Err(_) => config.level(),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    config.apply_env_overrides();
    if let Some(tenant) = cli.tenant.clone() {
        config.tenant = tenant;
    }
    if let Some(data) = cli.data.clone() {
        config.data_path = Some(data);
    }

    init_logging(&config)?;

    let tenant = config.tenant();
    let store = FileStore::open(config.data_path())
        .with_context(|| format!("Failed to open record store {:?}", config.data_path()))?;
    info!(tenant = %tenant, store = %store.path().display(), "attrcfg starting");

    match cli.command {
        Commands::Group { action } => run_group(&store, &tenant, action).await,
        Commands::Attribute { action } => run_attribute(&store, &tenant, action).await,
        Commands::Item { action } => run_item(&store, &tenant, action).await,
    }
}

async fn run_group(store: &FileStore, tenant: &Tenant, action: GroupAction) -> Result<()> {
    match action {
        GroupAction::List => {
            for group in store.list_groups(tenant).await? {
                println!("{}\t{}", group.id, group.name);
            }
        }
        GroupAction::Add { name } => {
            let group = store.create_group(tenant, &name).await?;
            println!("{}\t{}", group.id, group.name);
        }
        GroupAction::Rename { id, name } => {
            let group = store.rename_group(tenant, &GroupId::new(id), &name).await?;
            println!("{}\t{}", group.id, group.name);
        }
        GroupAction::Remove { id } => {
            store.delete_group(tenant, &GroupId::new(id)).await?;
            println!("deleted");
        }
        GroupAction::Search { query } => {
            let lookups = attrcfg::Lookups::new(store.list_groups(tenant).await?, Vec::new());
            let hits = lookups.search_groups(&query);
            if hits.is_empty() {
                println!("No groups found");
            }
            for group in hits {
                println!("{}\t{}", group.id, group.name);
            }
        }
    }
    Ok(())
}

async fn run_attribute(store: &FileStore, tenant: &Tenant, action: AttributeAction) -> Result<()> {
    let to_ids = |groups: Vec<String>| groups.into_iter().map(GroupId::new).collect::<Vec<_>>();

    match action {
        AttributeAction::List => {
            for attr in store.list_attributes(tenant).await? {
                let groups: Vec<&str> = attr.groups.iter().map(|g| g.name.as_str()).collect();
                println!("{}\t{}\t[{}]", attr.id, attr.name, groups.join(", "));
            }
        }
        AttributeAction::Add { name, groups } => {
            let attr = store.create_attribute(tenant, &name, &to_ids(groups)).await?;
            println!("{}\t{}", attr.id, attr.name);
        }
        AttributeAction::Update { id, name, groups } => {
            let attr = store
                .update_attribute(tenant, &AttributeId::new(id), &name, &to_ids(groups))
                .await?;
            println!("{}\t{}", attr.id, attr.name);
        }
        AttributeAction::Remove { id } => {
            store.delete_attribute(tenant, &AttributeId::new(id)).await?;
            println!("deleted");
        }
    }
    Ok(())
}

async fn run_item(store: &FileStore, tenant: &Tenant, action: ItemAction) -> Result<()> {
    match action {
        ItemAction::List { query, status, page } => {
            let filter = ItemFilter {
                query,
                statuses: status,
                page,
            };
            let listing = store.list_items(tenant, &filter).await?;
            for item in &listing.items {
                println!("{}\t{}\t{}", item.handle, item.status.label(), item.title);
            }
            println!(
                "page {} ({} item(s) total{})",
                listing.page,
                listing.total,
                if listing.has_next { ", more available" } else { "" }
            );
        }
        ItemAction::Add { handle, title, status } => {
            let item = CatalogItem {
                id: ItemId::new(format!("gid://item/{}", uuid::Uuid::new_v4())),
                handle,
                title,
                status,
            };
            store.add_item(tenant, item.clone())?;
            println!("{}\t{}", item.id, item.handle);
        }
        ItemAction::Show { handle } => {
            let session = load_session(store, store, tenant, &handle).await?;
            print_session(&session);
        }
        ItemAction::Edit {
            handle,
            select,
            deselect,
            set,
            raw,
            dry_run,
        } => {
            let mut session = load_session(store, store, tenant, &handle).await?;

            for name in &select {
                ensure_selected(&mut session, name, true)?;
            }
            for assignment in &set {
                let (attr, value) = assignment
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Expected ATTRIBUTE=VALUE, got '{assignment}'"))?;
                if !session.set_value_by_name(attr.trim(), value) {
                    bail!("Unknown attribute: {}", attr.trim());
                }
            }
            if let Some(raw) = raw {
                if let Err(e) = session.apply_raw_text(&raw) {
                    // Same as the raw editor: keep going with the previous state
                    eprintln!("notice: raw document ignored: {e}");
                }
            }
            for name in &deselect {
                ensure_selected(&mut session, name, false)?;
            }

            print_session(&session);

            if dry_run {
                return Ok(());
            }

            match session.save(store).await {
                Ok(SaveOutcome::Written) => println!("saved"),
                Ok(SaveOutcome::Unchanged) => println!("unchanged"),
                Err(SaveError::ValidationFailed(errors)) => {
                    for (group, message) in &errors {
                        eprintln!("{group}: {message}");
                    }
                    bail!("Not saved: {} group(s) incomplete", errors.len());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

fn ensure_selected(session: &mut EditingSession, name: &str, selected: bool) -> Result<()> {
    let id = session
        .lookups()
        .group_id(name)
        .cloned()
        .ok_or_else(|| anyhow!("Unknown group: {name}"))?;
    if session.store().is_selected(&id) != selected {
        session.toggle_group(&id);
    } else {
        warn!(group = %name, selected, "Group already in requested state");
    }
    Ok(())
}

fn print_session(session: &EditingSession) {
    let item = session.item();
    println!("{} ({})", item.title, item.status.label());

    let errors = session.validate();
    let groups = session.grouped_attributes();
    if groups.is_empty() {
        println!("No groups selected");
    }
    for group in groups {
        println!("\n[{}]", group.name);
        for field in &group.fields {
            println!("  {}: {}", field.attribute.name, field.value);
        }
        if let Some(message) = errors.get(group.name) {
            println!("  ! {message}");
        }
    }

    println!("\n{}", session.raw_text());
    if session.has_changes() {
        println!("(unsaved changes)");
    }
}
