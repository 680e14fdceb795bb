use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use elysia_chess::{Game, MoveError, SearchConfig, SearchEngine, SearchMode, Side, WeightTables};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlayAs {
    /// Capital letters, ranks 8 and 7. The engine opens.
    Upper,
    /// Lowercase letters, ranks 1 and 2. You open.
    Lower,
}

impl From<PlayAs> for Side {
    fn from(side: PlayAs) -> Self {
        match side {
            PlayAs::Upper => Side::Upper,
            PlayAs::Lower => Side::Lower,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Search depth in plies
    #[arg(long, default_value_t = elysia_chess::search::DEFAULT_DEPTH)]
    depth: u32,

    /// Directory holding pvalues.txt and the pos_value_*.txt tables
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Search on the calling thread only
    #[arg(long)]
    sequential: bool,

    /// Side you play
    #[arg(long, value_enum, default_value_t = PlayAs::Lower)]
    side: PlayAs,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

const HELP: &str = "\
commands:
  e2e4     move a piece (append r, n, b or q to choose a promotion)
  advice   ask the engine for a move
  undo     take back your last move and the reply
  remake   start a new game
  help     show this text
  quit     leave";

fn main() {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    );
    builder
        .format(|buf, record| {
            writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args())
        })
        .write_style(env_logger::WriteStyle::Never)
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(args) {
        log::error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let weights = match &args.weights {
        Some(dir) => WeightTables::load_dir(dir)
            .with_context(|| format!("loading weights from {}", dir.display()))?,
        None => WeightTables::standard(),
    };

    let config = SearchConfig {
        depth: args.depth,
        mode: if args.sequential {
            SearchMode::Sequential
        } else {
            SearchMode::Parallel
        },
        ..SearchConfig::default()
    };
    log::info!(
        "depth {}, {:?} search on {} workers",
        config.depth,
        config.mode,
        config.workers
    );
    let engine = SearchEngine::new(Arc::new(weights), config)?;
    let mut game = Game::new(engine, args.side.into());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("{}", HELP);
    open(&mut game);
    print!("{}", game.board());

    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let command = line.trim();

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "remake" => {
                game.reset();
                open(&mut game);
            }
            "undo" => {
                if !game.undo_turn() {
                    println!("nothing to undo");
                }
            }
            "advice" | "prompt" => match game.advice() {
                Some(mv) => println!("try {}", mv),
                None => println!("no move available"),
            },
            text => match game.play(text) {
                Ok(report) => {
                    println!("you: {}", report.user_move);
                    if let Some(reply) = report.reply {
                        println!("engine: {}", reply);
                    }
                    if let Some(winner) = report.winner {
                        println!("{} wins, type remake to play again", winner);
                    } else if report.reply.is_none() {
                        println!("{}", MoveError::NoReply);
                    }
                }
                Err(e @ MoveError::GameOver(_)) => println!("{}, type remake to play again", e),
                Err(e) => println!("{}", e),
            },
        }

        print!("{}", game.board());
        stdout.flush()?;
    }
    Ok(())
}

/// The engine moves first when the user plays upper.
fn open(game: &mut Game) {
    if let Some(mv) = game.engine_move() {
        println!("engine: {}", mv);
    }
}
