use std::{env, fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use stocksheet::{
    config::{self, AppConfig},
    events::{Event, EventSender},
    models::{InventoryItem, NewItem},
    queries::{self, ItemFilter},
    services::{import, InventorySyncService, SheetStoreClient},
};
use tokio::sync::mpsc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Template rendering is local; it must work before any store is
    // configured.
    if let Commands::Template(args) = &cli.command {
        return handle_template(args);
    }

    if let Some(url) = cli.store_url.as_deref() {
        env::set_var("APP__STORE_URL", url);
    }
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::List(args) => handle_list(&context, args, cli.json).await?,
        Commands::Summary => handle_summary(&context, cli.json).await?,
        Commands::Add(args) => handle_add(&context, args, cli.json).await?,
        Commands::Import(args) => handle_import(&context, args, cli.json).await?,
        // Handled above.
        Commands::Template(_) => {}
        Commands::Edit(args) => handle_edit(&context, args, cli.json).await?,
        Commands::Move(args) => handle_move(&context, args, cli.json).await?,
        Commands::Toggle(args) => handle_toggle(&context, args, cli.json).await?,
        Commands::Delete(args) => handle_delete(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "stocksheet", about = "Warehouse inventory tracker backed by a remote spreadsheet", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "Store endpoint, overriding the configured store_url"
    )]
    store_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List inventory items, optionally filtered")]
    List(ListArgs),
    #[command(about = "Show per-warehouse pallet and item totals")]
    Summary,
    #[command(about = "Create a single inventory item")]
    Add(AddArgs),
    #[command(about = "Bulk-import items from a delimited file")]
    Import(ImportArgs),
    #[command(about = "Write the bulk-entry template")]
    Template(TemplateArgs),
    #[command(about = "Replace an item's fields")]
    Edit(EditArgs),
    #[command(about = "Move an item to a new warehouse and rack location")]
    Move(MoveArgs),
    #[command(about = "Flip an item's flag")]
    Toggle(ToggleArgs),
    #[command(about = "Delete items by id")]
    Delete(DeleteArgs),
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, help = "Exact warehouse name (case-sensitive)")]
    warehouse: Option<String>,
    #[arg(long, help = "Line prefix taken from the rack location")]
    line: Option<String>,
    #[arg(
        long,
        help = "Case-insensitive text search over name, category, warehouse, and rack"
    )]
    search: Option<String>,
    #[arg(long, action = ArgAction::SetTrue, help = "Show only flagged items")]
    flagged: bool,
}

#[derive(Args)]
struct AddArgs {
    #[arg(long, help = "Item name")]
    name: String,
    #[arg(long, help = "Item category")]
    category: String,
    #[arg(long, help = "Warehouse the item is stored in")]
    warehouse: String,
    #[arg(long = "rack", help = "Rack location, e.g. A-01")]
    rack_location: String,
    #[arg(long, default_value_t = 0, help = "Total quantity on hand")]
    quantity: u32,
    #[arg(
        long = "pallets",
        default_value_t = 1,
        value_parser = parse_pallet_count,
        help = "Number of pallets (at least 1)"
    )]
    pallet_count: u32,
}

#[derive(Args)]
struct ImportArgs {
    #[arg(help = "Path to a delimited bulk-entry file")]
    file: PathBuf,
    #[arg(
        long,
        default_value = ",",
        value_parser = parse_delimiter,
        help = "Field delimiter (single character, or \"tab\")"
    )]
    delimiter: char,
}

#[derive(Args)]
struct TemplateArgs {
    #[arg(long, help = "Write to this file instead of stdout")]
    output: Option<PathBuf>,
    #[arg(
        long,
        default_value = ",",
        value_parser = parse_delimiter,
        help = "Field delimiter (single character, or \"tab\")"
    )]
    delimiter: char,
}

#[derive(Args)]
struct EditArgs {
    #[arg(help = "Item id")]
    id: String,
    #[arg(long, help = "Item name")]
    name: String,
    #[arg(long, help = "Item category")]
    category: String,
    #[arg(long, help = "Warehouse the item is stored in")]
    warehouse: String,
    #[arg(long = "rack", help = "Rack location, e.g. A-01")]
    rack_location: String,
    #[arg(long, default_value_t = 0, help = "Total quantity on hand")]
    quantity: u32,
    #[arg(
        long = "pallets",
        default_value_t = 1,
        value_parser = parse_pallet_count,
        help = "Number of pallets (at least 1)"
    )]
    pallet_count: u32,
}

#[derive(Args)]
struct MoveArgs {
    #[arg(help = "Item id")]
    id: String,
    #[arg(long, help = "Destination warehouse")]
    warehouse: String,
    #[arg(long = "rack", help = "Destination rack location")]
    rack_location: String,
}

#[derive(Args)]
struct ToggleArgs {
    #[arg(help = "Item id")]
    id: String,
}

#[derive(Args)]
struct DeleteArgs {
    #[arg(required = true, help = "Item ids")]
    ids: Vec<String>,
}

struct CliContext {
    _config: AppConfig,
    inventory: InventorySyncService,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let store = SheetStoreClient::with_timeout(
            &config.store_url,
            config.write_ack(),
            config.request_timeout(),
        )
        .context("failed to build store client")?;

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(config.event_channel_capacity);
        let event_sender = EventSender::new(event_tx);

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "stocksheet", event = ?event, "received async event");
            }
        });

        let inventory = InventorySyncService::new(Arc::new(store), Some(event_sender));

        Ok(Self {
            _config: config,
            inventory,
        })
    }
}

async fn handle_list(context: &CliContext, args: ListArgs, json: bool) -> Result<()> {
    context
        .inventory
        .load_all()
        .await
        .context("failed to fetch inventory")?;

    let filter = ItemFilter {
        warehouse: normalize_optional_string(args.warehouse),
        line: normalize_optional_string(args.line),
        search: normalize_optional_string(args.search),
        flagged_only: args.flagged,
    };
    let items = queries::filter_items(&context.inventory.items(), &filter);

    if json {
        print_json(&items)?;
    } else if items.is_empty() {
        println!("No items found.");
    } else {
        for item in &items {
            render_item(item);
        }
        println!("{} item(s)", items.len());
    }

    Ok(())
}

async fn handle_summary(context: &CliContext, json: bool) -> Result<()> {
    context
        .inventory
        .load_all()
        .await
        .context("failed to fetch inventory")?;

    let items = context.inventory.items();
    let summary = queries::warehouse_summary(&items);

    if json {
        print_json(&summary)?;
    } else if summary.is_empty() {
        println!("No items found.");
    } else {
        for row in &summary {
            println!(
                "- {} • {} pallet(s) • {} item(s)",
                row.warehouse, row.pallet_count, row.item_count
            );
        }
        let pallets: u64 = summary.iter().map(|row| row.pallet_count).sum();
        println!("Total: {} pallet(s) across {} item(s)", pallets, items.len());
    }

    Ok(())
}

async fn handle_add(context: &CliContext, args: AddArgs, json: bool) -> Result<()> {
    let item = NewItem {
        name: args.name,
        category: args.category,
        warehouse: args.warehouse,
        rack_location: args.rack_location,
        quantity: args.quantity,
        pallet_count: args.pallet_count,
    };
    context
        .inventory
        .create_item(item)
        .await
        .context("failed to create item")?;

    let count = context.inventory.items().len();
    if json {
        print_json(&json!({ "created": 1, "total_items": count }))?;
    } else {
        println!("Item created; store now holds {} item(s)", count);
    }

    Ok(())
}

async fn handle_import(context: &CliContext, args: ImportArgs, json: bool) -> Result<()> {
    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let rows = import::parse_rows(&content, args.delimiter);
    let imported = context
        .inventory
        .create_bulk(rows)
        .await
        .context("failed to import items")?;

    if json {
        print_json(&json!({ "imported": imported }))?;
    } else {
        println!("Imported {} item(s)", imported);
    }

    Ok(())
}

fn handle_template(args: &TemplateArgs) -> Result<()> {
    let template = import::render_template(args.delimiter);
    match &args.output {
        Some(path) => {
            fs::write(path, &template)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Template written to {}", path.display());
        }
        None => print!("{}", template),
    }

    Ok(())
}

async fn handle_edit(context: &CliContext, args: EditArgs, json: bool) -> Result<()> {
    context
        .inventory
        .load_all()
        .await
        .context("failed to fetch inventory")?;

    let payload = NewItem {
        name: args.name,
        category: args.category,
        warehouse: args.warehouse,
        rack_location: args.rack_location,
        quantity: args.quantity,
        pallet_count: args.pallet_count,
    };
    context
        .inventory
        .update_item(&args.id, payload)
        .await
        .with_context(|| format!("failed to update item {}", args.id))?;

    report_item(context, &args.id, json)
}

async fn handle_move(context: &CliContext, args: MoveArgs, json: bool) -> Result<()> {
    context
        .inventory
        .load_all()
        .await
        .context("failed to fetch inventory")?;

    context
        .inventory
        .move_item(&args.id, &args.warehouse, &args.rack_location)
        .await
        .with_context(|| format!("failed to move item {}", args.id))?;

    report_item(context, &args.id, json)
}

async fn handle_toggle(context: &CliContext, args: ToggleArgs, json: bool) -> Result<()> {
    context
        .inventory
        .load_all()
        .await
        .context("failed to fetch inventory")?;

    let value = context
        .inventory
        .toggle_flag(&args.id)
        .await
        .with_context(|| format!("failed to toggle item {}", args.id))?;

    if json {
        print_json(&json!({ "id": args.id, "flagged": value }))?;
    } else {
        println!(
            "Item {} flag {}",
            args.id,
            if value { "set" } else { "cleared" }
        );
    }

    Ok(())
}

async fn handle_delete(context: &CliContext, args: DeleteArgs, json: bool) -> Result<()> {
    context
        .inventory
        .load_all()
        .await
        .context("failed to fetch inventory")?;

    let deleted = context
        .inventory
        .delete_items(&args.ids)
        .await
        .context("failed to delete items")?;

    if json {
        print_json(&json!({ "deleted": deleted }))?;
    } else {
        println!("Deleted {} item(s)", deleted);
    }

    Ok(())
}

fn report_item(context: &CliContext, id: &str, json: bool) -> Result<()> {
    let item = context.inventory.item(id);
    if json {
        print_json(&item)?;
    } else if let Some(item) = item {
        render_item(&item);
    }

    Ok(())
}

fn render_item(item: &InventoryItem) {
    let flag = if item.flagged { " • flagged" } else { "" };
    println!(
        "- {} [{}] • {} • {}/{} • qty {} • {} pallet(s) • {}/pallet{}",
        item.name,
        item.id,
        item.category,
        item.warehouse,
        item.rack_location,
        item.quantity,
        item.pallet_count,
        item.quantity_per_pallet(),
        flag
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_pallet_count(value: &str) -> Result<u32, String> {
    let count: u32 = value
        .parse()
        .map_err(|_| format!("invalid pallet count: {}", value))?;
    if count < 1 {
        return Err("pallet count must be at least 1".to_string());
    }
    Ok(count)
}

fn parse_delimiter(value: &str) -> Result<char, String> {
    if value == "tab" || value == "\\t" {
        return Ok('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(delimiter), None) => Ok(delimiter),
        _ => Err(format!(
            "delimiter must be a single character, got {:?}",
            value
        )),
    }
}
