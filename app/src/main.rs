use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use pixmines::{
    Difficulty, GameLoop, GameSession, GameView, Move, Settings, TICK, Ticker, skin, spawn_script,
    write_ppm,
};
use pixmines_stage::{Raster, SpriteSheet};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    /// Force a seed instead of one taken from the clock
    #[arg(short, long)]
    seed: Option<u64>,

    /// beginner, intermediate, expert or WxH/BOMBS
    #[arg(short, long)]
    difficulty: Option<Difficulty>,

    /// Integer zoom for every sprite
    #[arg(long)]
    scale: Option<u32>,

    /// Skin image, PNG unless --skin-size is given
    #[arg(long)]
    skin: PathBuf,

    /// Read the skin as raw RGBA8 pixels of this size, WxH
    #[arg(long, value_parser = parse_size)]
    skin_size: Option<(u32, u32)>,

    /// Sprite layout JSON, defaults to the bundled one
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Scene description JSON, defaults to the bundled one
    #[arg(long)]
    scenes: Option<PathBuf>,

    /// TOML settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Move to play, e.g. reveal:4,4 flag:0,1 chord:2,2 hold:3,3; may be repeated
    #[arg(short = 'm', long = "move")]
    moves: Vec<Move>,

    /// Milliseconds between moves while the clock is running
    #[arg(long, default_value_t = 250)]
    pace: u64,

    /// Write the final screen here as a PPM image
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn parse_size(text: &str) -> Result<(u32, u32), String> {
    let err = || format!("expected WxH, got '{}'", text);
    let (width, height) = text.split_once('x').ok_or_else(err)?;
    Ok((
        width.trim().parse().map_err(|_| err())?,
        height.trim().parse().map_err(|_| err())?,
    ))
}

fn read_text(path: Option<&Path>, bundled: &str) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display())),
        None => Ok(bundled.to_owned()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbose.tracing_level_filter())
        .init();

    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(difficulty) = args.difficulty {
        settings.difficulty = difficulty;
    }
    if let Some(scale) = args.scale {
        settings.scale = scale.max(1);
    }
    log::debug!("Settings: {:?}", settings);

    let config = settings
        .difficulty
        .config()
        .with_context(|| format!("Unusable difficulty {}", settings.difficulty))?;
    let seed = args
        .seed
        .unwrap_or_else(|| Utc::now().timestamp_micros() as u64);
    log::info!("Seed: {}", seed);

    let bytes = fs::read(&args.skin)
        .with_context(|| format!("Could not read skin {}", args.skin.display()))?;
    let image = match args.skin_size {
        Some((width, height)) => Raster::from_rgba(width, height, &bytes),
        None => Raster::decode_png(&bytes),
    }
    .context("Bad skin image")?;
    let layout = read_text(args.layout.as_deref(), skin::LAYOUT)?;
    let sheet = SpriteSheet::load(image, &layout).context("Bad sprite layout")?;
    let scenes = read_text(args.scenes.as_deref(), skin::SCENES)?;

    let movie = skin::build_movie(&sheet, &scenes, config.size, settings.scale)
        .context("Could not build the game scene")?;
    let view = GameView::new(movie, GameSession::new(config, seed), settings.hold_ticks)
        .context("Game scene is missing clips")?;

    let mut game = GameLoop::new(view);
    // one spare tick so the long press lands before the release
    let long_press = TICK * (settings.hold_ticks.max(1) + 1);
    let gestures = args
        .moves
        .iter()
        .map(|step| {
            step.to_gesture(game.view(), long_press)
                .with_context(|| format!("Move {} is outside the board", step))
        })
        .collect::<Result<Vec<_>>>()?;

    let ticker = Ticker::spawn(game.sender(), TICK);
    let script = spawn_script(game.sender(), gestures, Duration::from_millis(args.pace));
    game.run(Utc::now);
    if script.join().is_err() {
        log::warn!("Move script panicked");
    }
    drop(ticker);

    let view = game.into_view();
    {
        let session = view.session();
        let board = session.board();
        println!(
            "{:?} after {}s, {} bombs left (seed {})",
            board.state(),
            session.elapsed_secs(Utc::now()),
            board.flags_left(),
            session.seed()
        );
    }

    if let Some(path) = &args.out {
        let file =
            File::create(path).with_context(|| format!("Could not create {}", path.display()))?;
        write_ppm(&view.render(), BufWriter::new(file))
            .with_context(|| format!("Could not write {}", path.display()))?;
        log::info!("Wrote {}", path.display());
    }

    Ok(())
}
