use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use reedit::{EditSession, EditorConfig, domain, persist};

#[derive(Parser, Debug)]
#[command(name = "reedit", version, about = "Inspect and re-edit annotated PNG files")]
struct Cli {
    /// Config file to use instead of the per-user one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the scene JSON embedded in a PNG.
    Extract {
        input: PathBuf,
        /// Text chunk keyword (defaults to the configured payload key).
        #[arg(long)]
        key: Option<String>,
    },
    /// Store a scene JSON file in a PNG without touching its pixels.
    Embed {
        input: PathBuf,
        /// Scene JSON to embed.
        #[arg(long)]
        scene: PathBuf,
        /// Output PNG path.
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        key: Option<String>,
    },
    /// Flatten a scene onto an image and write a re-editable PNG.
    Render {
        input: PathBuf,
        /// Scene JSON to use instead of the one embedded in the input.
        #[arg(long)]
        scene: Option<PathBuf>,
        /// Output PNG path.
        #[arg(long)]
        out: PathBuf,
    },
    /// List the chunks of a PNG and summarize its embedded scene.
    Inspect { input: PathBuf },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EditorConfig::load_from(path),
        None => EditorConfig::load(),
    };
    match cli.cmd {
        Command::Extract { input, key } => cmd_extract(&config, &input, key),
        Command::Embed {
            input,
            scene,
            out,
            key,
        } => cmd_embed(&config, &input, &scene, &out, key),
        Command::Render { input, scene, out } => cmd_render(config, &input, scene.as_deref(), &out),
        Command::Inspect { input } => cmd_inspect(&config, &input),
    }
}

fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("read '{}'", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}

fn read_scene(path: &Path) -> anyhow::Result<String> {
    let json = fs::read_to_string(path).with_context(|| format!("read scene '{}'", path.display()))?;
    // Refuse to store something that would not load back
    domain::deserialize_scene(&json).with_context(|| format!("parse scene '{}'", path.display()))?;
    Ok(json)
}

fn cmd_extract(config: &EditorConfig, input: &Path, key: Option<String>) -> anyhow::Result<()> {
    let bytes = read(input)?;
    let key = key.unwrap_or_else(|| config.payload_key.clone());
    match persist::extract_payload(&bytes, &key) {
        Some(json) => {
            println!("{json}");
            Ok(())
        }
        None => bail!("'{}' carries no {key} payload", input.display()),
    }
}

fn cmd_embed(
    config: &EditorConfig,
    input: &Path,
    scene: &Path,
    out: &Path,
    key: Option<String>,
) -> anyhow::Result<()> {
    let bytes = read(input)?;
    if !persist::is_container_format(&bytes) {
        bail!("'{}' is not a PNG file", input.display());
    }
    let json = read_scene(scene)?;
    let key = key.unwrap_or_else(|| config.payload_key.clone());
    let embedded = persist::embed_payload(&bytes, &key, &json).context("embed scene")?;
    write(out, &embedded)
}

fn cmd_render(config: EditorConfig, input: &Path, scene: Option<&Path>, out: &Path) -> anyhow::Result<()> {
    let bytes = read(input)?;
    let mut session =
        EditSession::open(config, &bytes).with_context(|| format!("open '{}'", input.display()))?;
    if let Some(scene) = scene {
        let json = read_scene(scene)?;
        let count = session.load_scene(&json).context("load scene")?;
        log::info!("Loaded {count} shapes from '{}'", scene.display());
    }
    let png = session.export_png().context("export image")?;
    write(out, &png)
}

fn cmd_inspect(config: &EditorConfig, input: &Path) -> anyhow::Result<()> {
    let bytes = read(input)?;
    let chunks = persist::png_text::parse_chunks(&bytes)
        .with_context(|| format!("parse '{}'", input.display()))?;
    for chunk in &chunks {
        match chunk.keyword() {
            Some(keyword) => println!("{} {:>8}  {keyword}", chunk.kind_str(), chunk.data.len()),
            None => println!("{} {:>8}", chunk.kind_str(), chunk.data.len()),
        }
    }
    let Some(json) = persist::extract_payload(&bytes, &config.payload_key) else {
        println!("no embedded scene");
        return Ok(());
    };
    let shapes = domain::deserialize_scene(&json).context("parse embedded scene")?;
    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for shape in &shapes {
        *kinds.entry(shape.kind().as_str()).or_default() += 1;
    }
    println!("scene: {} shapes", shapes.len());
    for (kind, count) in kinds {
        println!("  {kind}: {count}");
    }
    Ok(())
}
