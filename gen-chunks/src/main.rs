//! gen-chunks - Split book text into narration-ready chunks

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::GenChunksConfig;
use std::io::Read;
use std::path::{Path, PathBuf};
use text_segmenter::{ChapterAnalyzer, OutputFormat, Preset, TextChunk};

#[derive(Parser, Debug)]
#[command(name = "gen-chunks")]
#[command(about = "Split book text into narration-ready chunks", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the plain-text input (default: stdin)
    input: Option<PathBuf>,

    /// Preset: default, narrative, dialogue, technical
    #[arg(short, long)]
    preset: Option<String>,

    /// Expected chapter title (repeatable, in reading order)
    #[arg(short, long = "title")]
    titles: Vec<String>,

    /// File with one chapter title per line
    #[arg(long)]
    titles_file: Option<PathBuf>,

    /// Segment the whole document at once instead of per chapter
    #[arg(long)]
    whole_document: bool,

    /// Output format: json, markup, plain
    #[arg(short, long)]
    format: Option<String>,

    /// Print a per-chapter analysis to stderr
    #[arg(short, long)]
    analyze: bool,

    /// Minimum chunk size in characters
    #[arg(long)]
    min: Option<usize>,

    /// Maximum chunk size in characters
    #[arg(long)]
    max: Option<usize>,

    /// Words per minute for duration estimates
    #[arg(long)]
    wpm: Option<f64>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default preset
    SetPreset {
        /// Preset name
        name: String,
    },
    /// Set default output format
    SetFormat {
        /// json, markup or plain
        format: String,
    },
    /// Set default words per minute
    SetWpm {
        /// Value (> 0)
        value: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action);
    }

    let config = GenChunksConfig::load().context("Failed to load configuration")?;

    let preset_name = args.preset.as_deref().unwrap_or(&config.default_preset);
    let preset = Preset::from_name(preset_name)?;
    let format = match &args.format {
        Some(name) => OutputFormat::from_name(name)?,
        None => config.output_format,
    };

    let text = read_input(args.input.as_deref())?;
    let mut titles = args.titles.clone();
    if let Some(path) = &args.titles_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read titles file: {}", path.display()))?;
        titles.extend(parse_titles(&content));
    }

    let mut segmenter = preset.build()?;
    let mut seg_config = segmenter.config().clone();
    if let Some(min) = args.min.or(config.min_chunk_size) {
        seg_config.min_chunk_size = min;
    }
    if let Some(max) = args.max.or(config.max_chunk_size) {
        seg_config.max_chunk_size = max;
    }
    seg_config.process_chapters_separately = !args.whole_document;
    seg_config.debug = args.debug;
    segmenter.configure(seg_config);
    segmenter.set_chapter_titles(titles)?;

    log::info!(
        "Segmenting {} chars with preset '{}' ({} output)",
        text.chars().count(),
        preset,
        format
    );

    let result = segmenter.process(&text).await;
    if let Some(err) = result.error {
        anyhow::bail!("Segmentation failed: {}", err);
    }

    if args.analyze {
        let wpm = args.wpm.unwrap_or(config.words_per_minute);
        let report = ChapterAnalyzer::new(wpm).analyze(&result.chunks);
        eprintln!("{}", report.summary());
    }

    let chunks = format.apply(result.chunks, &preset.markup_config());
    println!("{}", render(&chunks, format)?);

    Ok(())
}

/// Read the whole input file, or stdin when no path is given.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input: {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// One title per line; blank lines are ignored.
fn parse_titles(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// JSON array for `json`, otherwise chunk contents separated by blank lines.
fn render(chunks: &[TextChunk], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(chunks)?),
        OutputFormat::Markup | OutputFormat::Plain => Ok(chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")),
    }
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = GenChunksConfig::load()?;
            println!("Configuration file: {:?}", GenChunksConfig::config_path()?);
            println!();
            println!("default_preset = \"{}\"", config.default_preset);
            println!("output_format = \"{}\"", config.output_format);
            println!("words_per_minute = {}", config.words_per_minute);
            match config.min_chunk_size {
                Some(min) => println!("min_chunk_size = {}", min),
                None => println!("min_chunk_size = (preset)"),
            }
            match config.max_chunk_size {
                Some(max) => println!("max_chunk_size = {}", max),
                None => println!("max_chunk_size = (preset)"),
            }
        }
        ConfigAction::SetPreset { name } => {
            let preset = Preset::from_name(name)?;
            let mut config = GenChunksConfig::load()?;
            config.default_preset = preset.name().to_string();
            config.save()?;
            println!("Default preset set to: {}", preset);
        }
        ConfigAction::SetFormat { format } => {
            let format = OutputFormat::from_name(format)?;
            let mut config = GenChunksConfig::load()?;
            config.output_format = format;
            config.save()?;
            println!("Default output format set to: {}", format);
        }
        ConfigAction::SetWpm { value } => {
            if *value <= 0.0 {
                anyhow::bail!("Words per minute must be positive");
            }
            let mut config = GenChunksConfig::load()?;
            config.words_per_minute = *value;
            config.save()?;
            println!("Default words per minute set to: {}", value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_segmenter::Position;

    #[test]
    fn test_parse_titles() {
        let titles = parse_titles("שער ראשון\n\n  פרק שני  \n");
        assert_eq!(titles, vec!["שער ראשון", "פרק שני"]);
    }

    #[test]
    fn test_render_plain() {
        let chunks = vec![
            TextChunk::new("One.", Position::new(0, 4)),
            TextChunk::new("Two.", Position::new(5, 9)),
        ];
        assert_eq!(render(&chunks, OutputFormat::Plain).unwrap(), "One.\n\nTwo.");
    }

    #[test]
    fn test_render_json() {
        let chunks = vec![TextChunk::new("One.", Position::new(0, 4))];
        let json = render(&chunks, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["content"], "One.");
        assert_eq!(parsed[0]["position"]["start"], 0);
    }

    #[test]
    fn test_read_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.txt");
        std::fs::write(&path, "טקסט").unwrap();
        assert_eq!(read_input(Some(&path)).unwrap(), "טקסט");
        assert!(read_input(Some(&dir.path().join("missing.txt"))).is_err());
    }
}
