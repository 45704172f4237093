// Casefile CLI binary

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use casefile_media::db::{self, get_db_path, init_library_folders, open_db, schema};
use casefile_media::ingest::{self, ImportOptions};
use casefile_media::settings::{load_pipeline_settings, set_pipeline_setting};
use casefile_media::{
    EditSession, EditSpec, MediaAsset, MediaError, MetadataUpdate, SqliteAssetStore,
};

#[derive(Parser)]
#[command(name = "casefile")]
#[command(about = "Casefile Media - photo edits as versioned, immutable assets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new library
    Init {
        /// Library root path
        path: PathBuf,
    },

    /// Import original photos or videos into the library
    Import {
        /// Source path (file or directory)
        path: PathBuf,
        /// Library root (defaults to current directory)
        #[arg(short, long)]
        library: Option<PathBuf>,
        /// Logical directory label
        #[arg(short, long, default_value = "")]
        directory: String,
        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        alt_text: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// List assets, newest first
    List {
        /// Library root (defaults to current directory)
        #[arg(short, long)]
        library: Option<PathBuf>,
        /// Maximum assets to show
        #[arg(long, default_value = "100")]
        limit: i64,
    },

    /// Show asset details
    Show {
        /// Asset ID
        id: i64,
        /// Library root (defaults to current directory)
        #[arg(short, long)]
        library: Option<PathBuf>,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
        /// Re-hash the stored bytes and check dimensions
        #[arg(long)]
        verify: bool,
    },

    /// Show an asset's ancestry back to its original
    Lineage {
        /// Asset ID
        id: i64,
        /// Library root (defaults to current directory)
        #[arg(short, long)]
        library: Option<PathBuf>,
        /// List direct derived children instead
        #[arg(long)]
        children: bool,
    },

    /// Render a preview of an edit to a PNG without touching the library
    Preview {
        /// Source asset ID
        id: i64,
        /// EditSpec as JSON, e.g. '{"rotation":90,"filter":"sepia"}'
        #[arg(long, conflicts_with = "spec_file")]
        spec: Option<String>,
        /// Read the EditSpec JSON from a file
        #[arg(long)]
        spec_file: Option<PathBuf>,
        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
        /// Library root (defaults to current directory)
        #[arg(short, long)]
        library: Option<PathBuf>,
    },

    /// Apply an edit and store the result as a new derived asset
    Commit {
        /// Source asset ID
        id: i64,
        /// EditSpec as JSON
        #[arg(long, conflicts_with = "spec_file")]
        spec: Option<String>,
        /// Read the EditSpec JSON from a file
        #[arg(long)]
        spec_file: Option<PathBuf>,
        /// Library root (defaults to current directory)
        #[arg(short, long)]
        library: Option<PathBuf>,
    },

    /// Update free-form metadata (tags, alt text, description, directory)
    Tag {
        /// Asset ID
        id: i64,
        /// Tag to add (repeatable)
        #[arg(long)]
        add: Vec<String>,
        /// Tag to remove (repeatable)
        #[arg(long)]
        remove: Vec<String>,
        #[arg(long)]
        alt_text: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        directory: Option<String>,
        /// Library root (defaults to current directory)
        #[arg(short, long)]
        library: Option<PathBuf>,
    },

    /// Remove staging leftovers and unreferenced derived files
    Sweep {
        /// Library root (defaults to current directory)
        #[arg(short, long)]
        library: Option<PathBuf>,
        /// Report what would be removed without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show or change pipeline settings
    Config {
        /// Library root (defaults to current directory)
        #[arg(short, long)]
        library: Option<PathBuf>,
        /// Setting to change (jpegQuality, previewMaxEdge, orphanGraceSeconds)
        #[arg(long, requires = "value")]
        set: Option<String>,
        /// New value, as JSON
        #[arg(long)]
        value: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Import { path, library, directory, tags, alt_text, description } => {
            let options = ImportOptions { directory, tags, alt_text, description };
            cmd_import(path, library, options)
        }
        Commands::List { library, limit } => cmd_list(library, limit),
        Commands::Show { id, library, json, verify } => cmd_show(id, library, json, verify),
        Commands::Lineage { id, library, children } => cmd_lineage(id, library, children),
        Commands::Preview { id, spec, spec_file, out, library } => {
            cmd_preview(id, read_spec(spec, spec_file)?, out, library)
        }
        Commands::Commit { id, spec, spec_file, library } => {
            cmd_commit(id, read_spec(spec, spec_file)?, library)
        }
        Commands::Tag { id, add, remove, alt_text, description, directory, library } => {
            cmd_tag(id, add, remove, alt_text, description, directory, library)
        }
        Commands::Sweep { library, dry_run } => cmd_sweep(library, dry_run),
        Commands::Config { library, set, value } => cmd_config(library, set, value),
    }
}

fn cmd_init(path: PathBuf) -> Result<()> {
    std::fs::create_dir_all(&path)?;
    let library_root = path.canonicalize().unwrap_or(path.clone());

    let db_path = get_db_path(&library_root);
    if db_path.exists() {
        anyhow::bail!("Library already exists at {}", library_root.display());
    }

    init_library_folders(&library_root)?;
    open_db(&db_path)?;

    println!("Initialized library at {}", library_root.display());
    println!("Structure created:");
    println!("  .casefile/casefile.db  - Database");
    println!("  .casefile/derived/     - Edited versions");
    println!("  .casefile/staging/     - In-flight writes");
    println!("  originals/             - Imported files");

    Ok(())
}

fn cmd_import(source_path: PathBuf, library: Option<PathBuf>, options: ImportOptions) -> Result<()> {
    let library_root = resolve_library_root(library)?;
    let conn = db::open_library_db_connection(&library_root)?;

    let source = source_path
        .canonicalize()
        .map_err(|_| anyhow::anyhow!("Source path does not exist: {}", source_path.display()))?;

    println!("Importing from {}", source.display());
    let result = ingest::import_path(&conn, &library_root, &source, &options)?;

    println!();
    println!("Import complete:");
    println!("  Total files:  {}", result.total_files);
    println!("  Imported:     {}", result.imported.len());
    println!("  Duplicates:   {}", result.skipped);
    println!("  Failed:       {}", result.failed);

    Ok(())
}

fn cmd_list(library: Option<PathBuf>, limit: i64) -> Result<()> {
    let library_root = resolve_library_root(library)?;
    let conn = db::open_library_db_connection(&library_root)?;

    let assets = schema::list_assets(&conn, limit, 0)?;
    let total = schema::count_assets(&conn)?;

    println!("{} assets total", total);
    println!();

    if assets.is_empty() {
        println!("No assets found. Use 'casefile import <path>' to add photos.");
        return Ok(());
    }

    println!("{:>5}  {:>6}  {:>11}  {:>6}  {:>12}  {}", "ID", "Type", "Size", "From", "Version", "Path");
    println!("{}", "-".repeat(78));

    for asset in &assets {
        let from = asset
            .edited_from
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5}  {:>6}  {:>11}  {:>6}  {:>12}  {}",
            asset.id,
            asset.media_type,
            format!("{}x{}", asset.width, asset.height),
            from,
            asset.version,
            asset.path
        );
    }

    if total > limit {
        println!();
        println!("Showing {} of {} assets. Use --limit to see more.", limit, total);
    }

    Ok(())
}

fn cmd_show(id: i64, library: Option<PathBuf>, json: bool, verify: bool) -> Result<()> {
    let library_root = resolve_library_root(library)?;
    let asset = casefile_media::get_asset(&library_root, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&asset)?);
    } else {
        print_asset(&asset);
    }

    if verify {
        let check = casefile_media::verify_asset_bytes(&library_root, id)?;
        println!();
        println!("Verify:      hash {}, dimensions {}", check_label(check.hash_matches), check_label(check.dimensions_match));
        if !check.is_ok() {
            anyhow::bail!("Asset {} does not match its record", id);
        }
    }

    Ok(())
}

fn cmd_lineage(id: i64, library: Option<PathBuf>, children: bool) -> Result<()> {
    let library_root = resolve_library_root(library)?;

    if children {
        let derived = casefile_media::derived_from(&library_root, id)?;
        if derived.is_empty() {
            println!("Asset {} has no derived versions.", id);
        }
        for asset in &derived {
            println!("{:>5}  {}  {}", asset.id, asset.uploaded_at, asset.path);
        }
        return Ok(());
    }

    let chain = casefile_media::lineage(&library_root, id)?;
    for (depth, asset) in chain.iter().enumerate() {
        let edits = asset
            .edits
            .as_ref()
            .map(|e| e.to_json())
            .transpose()?
            .unwrap_or_else(|| "original".to_string());
        println!("{}#{} {}  {}", "  ".repeat(depth), asset.id, asset.path, edits);
    }

    Ok(())
}

fn cmd_preview(id: i64, spec: EditSpec, out: PathBuf, library: Option<PathBuf>) -> Result<()> {
    let library_root = resolve_library_root(library)?;
    let store = SqliteAssetStore::open(&library_root)?;
    let settings = load_pipeline_settings(store.connection())?;

    let mut session = EditSession::open(&store, &library_root, id, &settings)?;
    let frame = session.apply(spec)?;
    frame
        .bake()
        .save(&out)
        .with_context(|| format!("Failed to write preview to {}", out.display()))?;

    println!(
        "Preview {}x{} (full size {}x{}) written to {}",
        frame.view.viewport_size().0.round(),
        frame.view.viewport_size().1.round(),
        session.full_dimensions().0,
        session.full_dimensions().1,
        out.display()
    );
    Ok(())
}

fn cmd_commit(id: i64, spec: EditSpec, library: Option<PathBuf>) -> Result<()> {
    let library_root = resolve_library_root(library)?;

    match casefile_media::commit_transform(&library_root, id, &spec) {
        Ok(asset) => {
            println!("Created asset #{} from #{}", asset.id, id);
            print_asset(&asset);
            Ok(())
        }
        Err(MediaError::NoOpEdit) => {
            anyhow::bail!("Edit changes nothing; use 'casefile tag' to update metadata instead")
        }
        Err(e) => Err(e.into()),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_tag(
    id: i64,
    add: Vec<String>,
    remove: Vec<String>,
    alt_text: Option<String>,
    description: Option<String>,
    directory: Option<String>,
    library: Option<PathBuf>,
) -> Result<()> {
    let library_root = resolve_library_root(library)?;

    let tags = if add.is_empty() && remove.is_empty() {
        None
    } else {
        let mut tags = casefile_media::get_asset(&library_root, id)?.tags;
        tags.retain(|t| !remove.contains(t));
        for tag in add {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Some(tags)
    };

    let update = MetadataUpdate { tags, alt_text, description, directory };
    if update.is_empty() {
        anyhow::bail!("Nothing to update");
    }

    let asset = casefile_media::update_asset_metadata(&library_root, id, &update)?;
    println!("Updated asset #{}", asset.id);
    println!("Tags:        {}", asset.tags.join(", "));
    Ok(())
}

fn cmd_sweep(library: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let library_root = resolve_library_root(library)?;
    let report = casefile_media::sweep_orphans(&library_root, dry_run)?;

    for path in &report.removed {
        println!("{} {}", if dry_run { "would remove" } else { "removed" }, path);
    }
    println!();
    println!("Staging files:  {}", report.staging_removed);
    println!("Orphans:        {}", report.orphans_removed);
    println!("Reclaimed:      {}", format_size(report.bytes_reclaimed as i64));
    Ok(())
}

fn cmd_config(library: Option<PathBuf>, set: Option<String>, value: Option<String>) -> Result<()> {
    let library_root = resolve_library_root(library)?;
    let conn = db::open_library_db_connection(&library_root)?;

    let settings = match (set, value) {
        (Some(key), Some(value)) => set_pipeline_setting(&conn, &key, &value)?,
        _ => load_pipeline_settings(&conn)?,
    };
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

// --- Helper Functions ---

fn read_spec(spec: Option<String>, spec_file: Option<PathBuf>) -> Result<EditSpec> {
    let json = match (spec, spec_file) {
        (Some(json), _) => json,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("Provide an edit with --spec or --spec-file"),
    };
    EditSpec::from_json(&json).context("Invalid EditSpec JSON")
}

fn resolve_library_root(library: Option<PathBuf>) -> Result<PathBuf> {
    let path = library.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let path = path.canonicalize().unwrap_or(path);

    if !get_db_path(&path).exists() {
        anyhow::bail!(
            "No library found at {}. Use 'casefile init <path>' to create one.",
            path.display()
        );
    }

    Ok(path)
}

fn print_asset(asset: &MediaAsset) {
    println!("Asset #{}", asset.id);
    println!();
    println!("Path:        {}", asset.path);
    println!("Type:        {} ({})", asset.media_type, asset.mime_type);
    println!("Resolution:  {}x{}", asset.width, asset.height);
    println!("Size:        {}", format_size(asset.size_bytes));
    println!("Version:     {}", asset.version);
    if let Some(parent) = asset.edited_from {
        println!("Edited from: #{}", parent);
    }
    if !asset.directory.is_empty() {
        println!("Directory:   {}", asset.directory);
    }
    if !asset.tags.is_empty() {
        println!("Tags:        {}", asset.tags.join(", "));
    }
    if let Some(ref alt) = asset.alt_text {
        println!("Alt text:    {}", alt);
    }
    if let Some(ref hash) = asset.content_hash {
        println!("Hash:        {}...", &hash[..hash.len().min(40)]);
    }
    println!("Uploaded:    {}", asset.uploaded_at);
}

fn check_label(result: Option<bool>) -> &'static str {
    match result {
        Some(true) => "ok",
        Some(false) => "MISMATCH",
        None => "n/a",
    }
}

fn format_size(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
