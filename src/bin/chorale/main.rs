//! chorale - terminal chorale player
//!
//! Run with: cargo run -- --chorale reply.json

mod app;
mod ui;

use std::{path::PathBuf, thread, time::Duration};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use log::info;

use app::App;
use chorale_player::{
    audio::{scheduler::chord_duration, CpalBackend},
    service::{GenerationService, ReplayGenerationService, UnavailableService},
    PlayerConfig, Session,
};

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    chorale: Option<PathBuf>,
    seed_csv: Option<PathBuf>,
    export: Option<PathBuf>,
    tempo: Option<f64>,
    length: Option<usize>,
    sampling_seed: Option<u64>,
    seed_random: Option<u64>,
    rest_prob: Option<f64>,
    headless: bool,
    verbose: usize,
}

const USAGE: &str = "usage: chorale [--config FILE] [--chorale REPLY.json] [--seed-csv FILE] \
                     [--export FILE] [--tempo BPM] [--length N] [--sampling-seed N] \
                     [--seed-random N] [--rest-prob P] [--headless] [-v|-vv]";

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = parse_args()?;

    let mut config = match &args.config {
        Some(path) => PlayerConfig::load(path)
            .wrap_err_with(|| format!("failed to load {}", path.display()))?,
        None => PlayerConfig::default(),
    };
    if let Some(tempo) = args.tempo {
        config.tempo_bpm = tempo;
    }
    if let Some(length) = args.length {
        config.length = length;
    }

    let mut session = Session::new(config, Box::new(CpalBackend::open));
    session.set_sampling_seed(args.sampling_seed);
    session.set_seed_random(args.seed_random);
    if let Some(probability) = args.rest_prob {
        session.set_rest_probability(probability);
    }

    if let Some(path) = &args.seed_csv {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        // A bad table is reported on the CSV status line
        let _ = session.load_seed_csv(&text);
    }

    let mut service: Box<dyn GenerationService> = match &args.chorale {
        Some(path) => Box::new(
            ReplayGenerationService::from_path(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?,
        ),
        None => Box::new(UnavailableService),
    };
    session.check_status(service.as_mut());
    let export_path = args
        .export
        .clone()
        .unwrap_or_else(|| PathBuf::from("generated_chorale.json"));

    if args.headless {
        let level = match args.verbose {
            0 => log::Level::Info,
            1 => log::Level::Debug,
            _ => log::Level::Trace,
        };
        simple_logger::init_with_level(level)?;
        return run_headless(session, service);
    }

    let mut app = App::new(session, service, export_path);
    let mut terminal = ratatui::init();
    let res = app.run(&mut terminal);
    ratatui::restore();
    res
}

/// Generate once, print the summary and play the chorale to the end
fn run_headless(
    mut session: Session<CpalBackend>,
    mut service: Box<dyn GenerationService>,
) -> EyreResult<()> {
    info!("{}", session.status());
    if !session.csv_status().is_empty() {
        info!("{}", session.csv_status());
    }
    if !session.generate(service.as_mut()) {
        return Err(eyre!("{}", session.status()));
    }

    let stats = session.stats();
    info!(
        "chords: {}  range: {}  rests: {}",
        stats.chord_count_label(),
        stats.pitch_range_label(),
        stats.rest_count_label()
    );

    let tempo = session.config().tempo_bpm;
    if session.play(tempo) == 0 {
        return Err(eyre!("nothing to play: {}", session.status()));
    }

    let chords = session.chorale().map_or(0, |c| c.len());
    let playback = session.config().playback;
    let total = playback.lead_in + chords as f64 * chord_duration(tempo) + playback.tail;
    info!("playing {} chords ({:.1}s)", chords, total);

    while session.is_playing() {
        session.tick();
        thread::sleep(Duration::from_millis(50));
    }
    session.stop();
    Ok(())
}

/// Parse command-line flags by hand; the surface is small enough
fn parse_args() -> EyreResult<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| eyre!("{flag} requires a value\n{USAGE}"))
        };
        match arg.as_str() {
            "--config" => args.config = Some(value("--config")?.into()),
            "--chorale" => args.chorale = Some(value("--chorale")?.into()),
            "--seed-csv" => args.seed_csv = Some(value("--seed-csv")?.into()),
            "--export" => args.export = Some(value("--export")?.into()),
            "--tempo" => {
                let tempo = value("--tempo")?;
                args.tempo = Some(tempo.parse().wrap_err_with(|| format!("bad tempo {tempo:?}"))?);
            }
            "--length" => {
                let length = value("--length")?;
                args.length = Some(length.parse().wrap_err_with(|| format!("bad length {length:?}"))?);
            }
            "--sampling-seed" => {
                let seed = value("--sampling-seed")?;
                args.sampling_seed =
                    Some(seed.parse().wrap_err_with(|| format!("bad sampling seed {seed:?}"))?);
            }
            "--seed-random" => {
                let seed = value("--seed-random")?;
                args.seed_random =
                    Some(seed.parse().wrap_err_with(|| format!("bad seed {seed:?}"))?);
            }
            "--rest-prob" => {
                let p = value("--rest-prob")?;
                let p: f64 = p.parse().wrap_err_with(|| format!("bad rest probability {p:?}"))?;
                if !(0.0..=1.0).contains(&p) {
                    return Err(eyre!("rest probability must be between 0 and 1, got {p}"));
                }
                args.rest_prob = Some(p);
            }
            "--headless" => args.headless = true,
            "-v" => args.verbose += 1,
            "-vv" => args.verbose += 2,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(eyre!("unknown argument {other:?}\n{USAGE}")),
        }
    }

    Ok(args)
}
