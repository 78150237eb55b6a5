use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use roomcraft_contracts::catalog::{PaletteCatalog, StyleCatalog};
use roomcraft_contracts::chat::{parse_intent, Intent, CHAT_HELP_COMMANDS};
use roomcraft_contracts::design::{DesignMode, EncodedImage, SavedItems, Session, StyleChoice};
use roomcraft_contracts::events::EventLog;
use roomcraft_engine::{
    default_backend_registry, shopping_url, GenerationOutcome, Pipeline, StudioConfig, Studio,
    StudioError,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const SAVED_ITEMS_FILE: &str = "saved_items.json";
const SURPRISE_PREFIX: &str = "surprise";

#[derive(Debug, Parser)]
#[command(name = "roomcraft", version, about = "Reimagine room photos and shop the result")]
struct Cli {
    /// Log engine internals (retries, normalization) to stderr.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive design session.
    Chat(ChatArgs),
    /// One generation from the command line.
    Run(RunArgs),
    /// List preset styles.
    Styles,
    /// List predefined palettes.
    Palettes,
}

/// Backend selection and overrides for the environment config.
#[derive(Debug, Clone, clap::Args)]
struct EngineArgs {
    #[arg(long, default_value = "gemini")]
    backend: String,
    #[arg(long)]
    max_dim: Option<u32>,
    #[arg(long)]
    quality: Option<f32>,
    #[arg(long)]
    retries: Option<u32>,
}

impl EngineArgs {
    fn config(&self) -> StudioConfig {
        let mut config = StudioConfig::from_env();
        if let Some(max_dim) = self.max_dim {
            config = config.with_max_image_dim(max_dim);
        }
        if let Some(quality) = self.quality {
            config = config.with_jpeg_quality(quality);
        }
        if let Some(retries) = self.retries {
            config = config.with_max_retries(retries);
        }
        config
    }
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    engine: EngineArgs,
    /// Style id or label; `surprise[ text]` for a freeform style.
    #[arg(long, default_value = "modern")]
    style: String,
    #[arg(long, default_value = "makeover", value_parser = parse_mode)]
    mode: DesignMode,
    #[arg(long)]
    items: Option<String>,
    #[arg(long)]
    instruction: Option<String>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("roomcraft error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Run(args) => run_once(args),
        Command::Styles => {
            print_styles(&StyleCatalog::default());
            Ok(0)
        }
        Command::Palettes => {
            print_palettes(&PaletteCatalog::default());
            Ok(0)
        }
    }
}

fn init_tracing(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("roomcraft_engine=debug,info")
            } else {
                EnvFilter::try_new("roomcraft_engine=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .compact(),
        )
        .try_init();
}

fn parse_mode(raw: &str) -> std::result::Result<DesignMode, String> {
    DesignMode::parse(raw).ok_or_else(|| format!("unknown mode `{raw}` (makeover|partial)"))
}

fn build_studio(engine: &EngineArgs, out: &Path, events: Option<PathBuf>) -> Result<Studio> {
    let config = engine.config();
    let backend_name = engine.backend.as_str();
    let registry = default_backend_registry(&config);
    let Some(backend) = registry.get(backend_name) else {
        bail!(
            "unknown backend `{backend_name}` (available: {})",
            registry.names().join(", ")
        );
    };
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;

    let session = Session::new();
    let events_path = events.unwrap_or_else(|| out.join("events.jsonl"));
    let events = EventLog::open(events_path, session.session_id())?;
    let mut studio =
        Studio::new(session, Pipeline::from_config(backend, &config)).with_events(events);
    studio.restore_saved(SavedItems::load(&out.join(SAVED_ITEMS_FILE))?);
    tracing::debug!(
        backend = backend_name,
        saved = studio.session().saved().len(),
        out = %out.display(),
        "studio ready"
    );
    Ok(studio)
}

fn run_once(args: RunArgs) -> Result<i32> {
    let mut studio = build_studio(&args.engine, &args.out, args.events.clone())?;
    let image = EncodedImage::from_path(&args.image)?;
    studio.upload(image).map_err(|err| anyhow::anyhow!(err.user_message()))?;

    let Some(style) = parse_style_choice(&args.style, studio.styles()) else {
        bail!("unknown style `{}`; see `roomcraft styles`", args.style);
    };
    studio.set_style(style);
    studio.set_mode(args.mode);
    if let Some(items) = args.items.as_deref() {
        studio.set_items_to_add(items);
    }
    if let Some(instruction) = args.instruction.as_deref() {
        studio.set_refinement_instruction(instruction);
    }

    let result = studio.generate(false, None);
    let code = match report_generation(&studio, &args.out, result) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err:#}");
            1
        }
    };
    print_derived(&studio);
    studio.finish(&args.out.join("summary.json"))?;
    Ok(code)
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let out = args.out.clone();
    let mut studio = build_studio(&args.engine, &out, args.events.clone())?;
    let palettes = PaletteCatalog::default();

    let stdin = io::stdin();
    let mut line = String::new();

    println!("Roomcraft chat started. Type /help for commands.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);
        if intent.action == "noop" {
            continue;
        }
        if let Err(err) = handle_intent(&mut studio, &palettes, &out, &intent) {
            println!("{err:#}");
        }
    }

    studio.session().saved().save(&out.join(SAVED_ITEMS_FILE))?;
    let summary = studio.finish(&out.join("summary.json"))?;
    println!(
        "Session finished: {} version(s), {} saved item(s).",
        summary.total_versions, summary.saved_items
    );
    Ok(())
}

fn handle_intent(
    studio: &mut Studio,
    palettes: &PaletteCatalog,
    out: &Path,
    intent: &Intent,
) -> Result<()> {
    match intent.action.as_str() {
        "help" => {
            println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
            println!("Any other text refines the current design.");
        }
        "upload" => {
            let Some(path) = intent.arg_str("path") else {
                bail!("/upload requires a path");
            };
            let image = EncodedImage::from_path(Path::new(path))?;
            let (width, height) = studio
                .upload(image)
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            println!("Loaded {path} ({width}x{height}).");
        }
        "set_mode" => {
            let raw = intent.arg_str("mode").unwrap_or_default();
            let mode = parse_mode(raw).map_err(anyhow::Error::msg)?;
            studio.set_mode(mode);
            println!("Mode set to {}", mode.as_str());
        }
        "set_style" => {
            let raw = intent.arg_str("style").unwrap_or_default();
            let Some(style) = parse_style_choice(raw, studio.styles()) else {
                bail!("Unknown style `{raw}`. Try /styles.");
            };
            studio.set_style(style);
            println!("Style set to {}", studio.style_label(None));
        }
        "styles" => print_styles(studio.styles()),
        "palettes" => print_palettes(palettes),
        "set_items" => {
            studio.set_items_to_add(intent.arg_str("items").unwrap_or_default());
            println!("Items to add: {}", studio.session().items_to_add);
        }
        "generate" => {
            let result = studio.generate(false, None);
            report_generation(studio, out, result)?;
            print_derived(studio);
        }
        "refine" => {
            let Some(instruction) = intent.arg_str("instruction") else {
                bail!("/refine requires an instruction");
            };
            studio.set_refinement_instruction(instruction);
            let result = studio.generate(true, None);
            report_generation(studio, out, result)?;
            print_derived(studio);
        }
        "apply_palette" => {
            let name = intent.arg_str("palette").unwrap_or_default();
            let Some(palette) = palettes.find(name) else {
                bail!("Unknown palette `{name}`. Try /palettes.");
            };
            println!("Applying {}...", palette.name);
            let result = studio.apply_palette(palette);
            report_generation(studio, out, result)?;
            print_derived(studio);
        }
        "revert" | "redo" => {
            let reverting = intent.action == "revert";
            let history = studio.session().history();
            let available = if reverting {
                history.can_revert()
            } else {
                history.can_redo()
            };
            if !available {
                println!("Nothing to {}.", intent.action);
                return Ok(());
            }
            if reverting {
                studio.revert();
            } else {
                studio.redo();
            }
            write_current(studio, out)?;
            print_history(studio);
        }
        "history" => print_history(studio),
        "list" => print_derived(studio),
        "toggle_save" => {
            let raw = intent.arg_str("index").unwrap_or_default();
            let items = &studio.session().derived().items;
            let Some(idx) = resolve_index(raw, items.len()) else {
                bail!("/save expects an item number from /list");
            };
            let item = items[idx].clone();
            if studio.toggle_saved(&item.id) == Some(true) {
                println!("Saved {}.", item.item_name);
            } else {
                println!("Removed {} from saved items.", item.item_name);
            }
            persist_saved(studio, out)?;
        }
        "saved" => print_saved(studio),
        "update_link" => {
            let args = intent.arg_list("args");
            let Some(raw) = args.first() else {
                bail!("/link expects: <saved item number> [url]");
            };
            let saved: Vec<String> = studio
                .session()
                .saved()
                .items()
                .map(|item| item.id.clone())
                .collect();
            let Some(idx) = resolve_index(raw, saved.len()) else {
                bail!("/link expects a saved item number from /saved");
            };
            let link = args.get(1).map(String::as_str).unwrap_or_default();
            studio.update_link(&saved[idx], link);
            persist_saved(studio, out)?;
            println!(
                "{}",
                if link.trim().is_empty() {
                    "Link cleared."
                } else {
                    "Link updated."
                }
            );
        }
        "add_item" => {
            let args = intent.arg_list("args");
            let name = args.first().map(String::as_str).unwrap_or_default();
            let item = studio
                .add_custom_item(name, args.get(1).cloned())
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            persist_saved(studio, out)?;
            println!("Added {} to saved items.", item.item_name);
        }
        "status" => println!("{}", studio.session().status()),
        "dismiss" => {
            if studio.dismiss_error() {
                println!("Error dismissed.");
            }
        }
        "export" => {
            let Some(path) = intent.arg_str("path") else {
                bail!("/export requires a path");
            };
            let Some(image) = studio.session().current_image() else {
                bail!("No generated design to export yet.");
            };
            std::fs::write(path, &image.bytes)
                .with_context(|| format!("failed to write {path}"))?;
            println!("Exported current design to {path}");
        }
        "unknown" => {
            let command = intent.arg_str("command").unwrap_or_default();
            println!("Unknown command: /{command}");
        }
        _ => {}
    }
    Ok(())
}

/// `surprise[ text]` selects a freeform style; anything else must name a preset.
fn parse_style_choice(raw: &str, styles: &StyleCatalog) -> Option<StyleChoice> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if lowered == SURPRISE_PREFIX || lowered.starts_with(&format!("{SURPRISE_PREFIX} ")) {
        let text = trimmed[SURPRISE_PREFIX.len()..].trim();
        return Some(StyleChoice::Freeform(text.to_string()));
    }
    styles
        .find(trimmed)
        .map(|style| StyleChoice::Preset(style.id.clone()))
}

/// Parses a 1-based item number.
fn resolve_index(raw: &str, len: usize) -> Option<usize> {
    let number: usize = raw.trim().parse().ok()?;
    (1..=len).contains(&number).then(|| number - 1)
}

fn report_generation(
    studio: &Studio,
    out: &Path,
    result: std::result::Result<GenerationOutcome, StudioError>,
) -> Result<()> {
    match result {
        Ok(GenerationOutcome::Complete(report)) => {
            let path = write_current(studio, out)?;
            println!(
                "{} ready: {} item(s), {} swatch(es) -> {}",
                report.version_id,
                report.items,
                report.swatches,
                path.display()
            );
            if report.extraction_degraded {
                println!("Shopping matches are unavailable for this version.");
            }
            Ok(())
        }
        Ok(GenerationOutcome::Stale) => {
            println!("A newer request replaced this one.");
            Ok(())
        }
        Err(err) => bail!(err.user_message()),
    }
}

fn write_current(studio: &Studio, out: &Path) -> Result<PathBuf> {
    let Some(version) = studio.session().history().current() else {
        bail!("no generated design yet");
    };
    version.image.write_to(out, &version.version_id)?;
    version.image.write_to(out, "current")
}

fn persist_saved(studio: &Studio, out: &Path) -> Result<()> {
    studio.session().saved().save(&out.join(SAVED_ITEMS_FILE))
}

fn print_styles(styles: &StyleCatalog) {
    for style in styles.list() {
        println!("{:<12} {:<22} {}", style.id, style.label, style.description);
    }
    println!("{SURPRISE_PREFIX:<12} {:<22} Describe your own style", "Surprise Me");
}

fn print_palettes(palettes: &PaletteCatalog) {
    for palette in palettes.list() {
        let swatches: Vec<String> = palette
            .swatches
            .iter()
            .map(|swatch| format!("{} {}", swatch.name, swatch.hex))
            .collect();
        println!("{:<16} {}", palette.name, swatches.join(", "));
    }
}

fn print_history(studio: &Studio) {
    let history = studio.session().history();
    if history.is_empty() {
        println!("No versions yet.");
        return;
    }
    let cursor = history.cursor();
    for (idx, version) in history.entries().iter().enumerate() {
        let marker = if idx as i64 == cursor { "*" } else { " " };
        let parent = version.parent_version_id.as_deref().unwrap_or("upload");
        println!("{marker} {} (from {parent})", version.version_id);
    }
}

fn print_derived(studio: &Studio) {
    let session = studio.session();
    let derived = session.derived();
    if !derived.items.is_empty() {
        println!("Shop the look:");
        for (idx, item) in derived.items.iter().enumerate() {
            let saved = if session.saved().contains(&item.id) {
                " [saved]"
            } else {
                ""
            };
            println!(
                "  {}. {} ({}){saved}\n     {}",
                idx + 1,
                item.item_name,
                item.color,
                shopping_url(item)
            );
        }
    }
    let palette: Vec<String> = match session.proposed_palette.as_ref() {
        Some(proposed) => proposed
            .swatches
            .iter()
            .map(|swatch| format!("{} {}", swatch.name, swatch.hex))
            .collect(),
        None => derived
            .palette
            .iter()
            .map(|swatch| format!("{} {}", swatch.name, swatch.hex))
            .collect(),
    };
    if !palette.is_empty() {
        println!("Palette: {}", palette.join(", "));
    }
}

fn print_saved(studio: &Studio) {
    let saved = studio.session().saved();
    if saved.is_empty() {
        println!("No saved items.");
        return;
    }
    for (idx, item) in saved.items().enumerate() {
        println!(
            "  {}. {} ({})\n     {}",
            idx + 1,
            item.item_name,
            item.color,
            shopping_url(item)
        );
    }
}
