use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use uicapture_lib::{
    default_data_dir,
    engine::{CaptureFilter, GroupingMode, StyleKind},
    export::{ExportFormat, ExportOptions},
    init_logging,
    viewer::ViewerController,
    AppState,
};

#[derive(Parser, Debug)]
#[command(
    name = "uicapture",
    version,
    about = "Browse captured UI elements as components and styles"
)]
struct Cli {
    /// Directory holding the capture database and settings
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List a project's components with overrides and annotations applied
    Components(ComponentsArgs),
    /// List a project's styles, or where one style is used
    Styles(StylesArgs),
    /// Export a session's captures as JSON or CSV
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Case-insensitive search over name, URL, tag and role
    #[arg(long)]
    search: Option<String>,
    /// Only this derived category (Action, Form, Navigation, ...)
    #[arg(long)]
    category: Option<String>,
    /// Only this tag name
    #[arg(long)]
    tag: Option<String>,
    /// Only captures with (true) or without (false) a screenshot
    #[arg(long)]
    has_screenshot: Option<bool>,
}

impl From<FilterArgs> for CaptureFilter {
    fn from(args: FilterArgs) -> Self {
        CaptureFilter {
            search: args.search,
            category: args.category,
            tag: args.tag,
            has_screenshot: args.has_screenshot,
        }
    }
}

#[derive(Args, Debug)]
struct ComponentsArgs {
    #[arg(long)]
    project: String,
    /// nameOnly, namePlusType or nameTypePrimitives (default from settings)
    #[arg(long)]
    mode: Option<GroupingMode>,
    /// Show captures and variants of one component instead of the list
    #[arg(long)]
    component: Option<String>,
    /// With --component, show only this variant (1-based)
    #[arg(long, requires = "component")]
    variant: Option<usize>,
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Args, Debug)]
struct StylesArgs {
    #[arg(long)]
    project: String,
    /// Style kind for a usage lookup: background, border, color, padding, shadow
    #[arg(long, requires = "value")]
    kind: Option<StyleKind>,
    /// Raw style value for a usage lookup
    #[arg(long, requires = "kind")]
    value: Option<String>,
    #[arg(long)]
    mode: Option<GroupingMode>,
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(long)]
    session: String,
    /// json or csv
    #[arg(long, default_value = "json")]
    format: ExportFormat,
    /// Add groupingMode, groupKey, variantKey and signatureVersion
    #[arg(long, action = ArgAction::SetTrue)]
    include_derived: bool,
    #[arg(long)]
    mode: Option<GroupingMode>,
    #[arg(long)]
    batch_size: Option<usize>,
    /// Write to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let app = AppState::open(&data_dir)?;

    match cli.command {
        Commands::Components(args) => command_components(&app, args).await,
        Commands::Styles(args) => command_styles(&app, args).await,
        Commands::Export(args) => command_export(&app, args).await,
    }
}

async fn open_viewer(
    app: &AppState,
    project: &str,
    mode: Option<GroupingMode>,
    filter: FilterArgs,
) -> Result<ViewerController> {
    let mode = mode.unwrap_or_else(|| app.settings.grouping_mode());
    let viewer = ViewerController::new(app.db.clone(), mode);
    viewer.set_filter(filter.into()).await;
    viewer.load_project(project).await?;
    Ok(viewer)
}

async fn command_components(app: &AppState, args: ComponentsArgs) -> Result<()> {
    let viewer = open_viewer(app, &args.project, args.mode, args.filter).await?;

    if let Some(component) = args.component {
        viewer.select_group(Some(component.clone())).await;
        viewer.select_variant(args.variant).await;
        let captures = match args.variant {
            Some(_) => viewer.selected_variant_captures().await,
            None => viewer.selected_captures().await,
        };
        let variants = viewer.selected_variants().await;
        viewer.close().await;

        if args.json {
            let payload = serde_json::json!({
                "component": component,
                "captures": captures,
                "variants": variants,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
            return Ok(());
        }

        println!("{component}: {} captures", captures.len());
        for capture in &captures {
            println!("  {}  {}  {}", capture.id, capture.display_name(), capture.url);
        }
        for variant in &variants {
            println!("  variant {} ({}): {}", variant.index, variant.count, variant.key);
        }
        return Ok(());
    }

    let snapshot = viewer.snapshot().await?;
    viewer.close().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot.components)?);
        return Ok(());
    }
    for component in &snapshot.components {
        println!(
            "{:>5}  {:<10}  {:<10}  {:<10}  {}  ({})  [{}]",
            component.captures_count,
            component.category,
            component.component_type,
            component.status,
            component.name,
            component.source,
            component.id
        );
    }
    Ok(())
}

async fn command_styles(app: &AppState, args: StylesArgs) -> Result<()> {
    let viewer = open_viewer(app, &args.project, args.mode, args.filter).await?;

    if let (Some(kind), Some(value)) = (args.kind, args.value) {
        let usage = viewer.style_usage(kind, &value).await;
        viewer.close().await;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&usage)?);
            return Ok(());
        }

        println!("{kind} {value}");
        for location in &usage.locations {
            println!("  {:>4}  {}  {}", location.uses, location.source_label, location.url);
        }
        for component in &usage.related_components {
            println!("  component {} ({})", component.name, component.captures_count);
        }
        return Ok(());
    }

    let snapshot = viewer.snapshot().await?;
    viewer.close().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot.styles)?);
        return Ok(());
    }
    for style in &snapshot.styles {
        println!(
            "{:>5}  {:<10}  {:<24}  {:<20}  {}",
            style.uses, style.kind, style.value, style.token, style.source
        );
    }
    Ok(())
}

async fn command_export(app: &AppState, args: ExportArgs) -> Result<()> {
    let mut settings = app.settings.export();
    settings.include_derived |= args.include_derived;
    if let Some(batch_size) = args.batch_size {
        settings.batch_size = batch_size;
    }
    let mode = args.mode.unwrap_or_else(|| app.settings.grouping_mode());
    let options = ExportOptions::from_settings(args.format, &settings, mode);

    let output = app
        .exports
        .export_session(&args.session, &options, |progress| {
            log::debug!("export progress {}/{}", progress.processed, progress.total);
        })
        .await?;

    match args.out {
        Some(path) => std::fs::write(&path, output)
            .with_context(|| format!("Failed to write export to {}", path.display())),
        None => {
            println!("{output}");
            Ok(())
        }
    }
}
