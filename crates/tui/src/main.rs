mod app;
mod renderer;
mod storage;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use env_logger::{Builder, Env, Target};
use subline_core::model::JsonDocumentParser;
use subline_core::{Editor, TimelineConfig};

use crate::storage::DirStorage;

const USAGE: &str =
    "Usage: subline <dir> --lang <code> [--version <n>] [--video <id>] [--config <timeline.json>]";

#[derive(Debug, PartialEq)]
struct Args {
    dir: PathBuf,
    language: String,
    version: Option<u32>,
    video: String,
    config: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut dir = None;
    let mut language = None;
    let mut version = None;
    let mut video = None;
    let mut config = None;

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--lang" => language = Some(value("--lang")?),
            "--version" => {
                let raw = value("--version")?;
                version = Some(raw.parse().with_context(|| format!("bad version: {raw}"))?);
            }
            "--video" => video = Some(value("--video")?),
            "--config" => config = Some(PathBuf::from(value("--config")?)),
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            _ if dir.is_none() => dir = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument {arg}"),
        }
    }

    let dir = dir.context("missing subtitle directory")?;
    let video = video.unwrap_or_else(|| {
        dir.file_name()
            .map_or_else(|| "local".to_string(), |n| n.to_string_lossy().into_owned())
    });
    Ok(Args {
        dir,
        language: language.context("missing --lang")?,
        version,
        video,
        config,
    })
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let path = std::env::temp_dir().join("subline.log");
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<TimelineConfig> {
    let Some(path) = path else {
        // One handle per terminal column.
        return Ok(TimelineConfig {
            handle_width: renderer::CELL_WIDTH,
            ..TimelineConfig::default()
        });
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    TimelineConfig::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))
}

fn main() -> Result<()> {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e:#}\n{USAGE}");
            std::process::exit(1);
        }
    };
    init_logging()?;

    let config = load_config(args.config.as_ref())?;
    let storage = DirStorage::open(&args.dir, &args.language)
        .with_context(|| format!("cannot open {}", args.dir.display()))?;
    let version = match args.version {
        Some(v) => v,
        None => storage
            .latest_version(&args.language)?
            .with_context(|| format!("no {} subtitles in {}", args.language, storage.dir().display()))?,
    };
    log::info!("editing {} v{version} of {}", args.language, args.video);

    let mut editor = Editor::new(Rc::new(storage), Rc::new(JsonDocumentParser), config);
    editor.load_working(&args.video, &args.language, version);
    editor.load_reference_languages();
    editor.pump();

    let end_ms = editor
        .working()
        .items()
        .iter()
        .map(|i| i.end_time)
        .fold(0.0, f64::max);
    editor.clock_mut().set_duration(end_ms / 1000.0 + 2.0);

    app::App::new(editor).run()
}
