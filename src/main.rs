//! Main CLI interface to the Gammon engine.
//! Reads one command per line from stdin and inspects positions, matches and the cache.

use std::error::Error;
use std::io::{self, Write};
use std::str::FromStr;

use clap::Parser;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use gammon_engine::bearoff::{self, bearoff_index_to_position, bearoff_positions};
use gammon_engine::coretypes::Variation;
use gammon_engine::engine::{cache_megabytes, CACHE_SIZE_MAX};
use gammon_engine::{Board, Engine, EngineBuilder, MatchState, OldKey, PackedKey, PositionId};

const HELP: &str = "\
commands:
  id <position id>          show the board of a Position ID
  key <position id>         show the packed and old keys of a Position ID
  xg <xgid>                 show the board of an XGID
  closest <xgid>            show the closest legal board to an XGID
  match <match id>          show the fields of a Match ID
  new [variation]           show a starting board
  random                    show a random legal board
  bearoff <points> <chequers> <index>
                            show the bearoff position of an index
  cache                     show cache size and counters
  cache flush               flush the cache
  cache size <0..=7>        set the cache size setting, 0 disables
  help                      show this message
  quit                      exit";

/// Inspect backgammon Position IDs, Match IDs, XGIDs and bearoff indices.
#[derive(Parser)]
#[command(name = "gammon", version)]
struct Args {
    /// Evaluation cache capacity in entries, 0 disables the cache
    #[arg(long, conflicts_with = "cache_size")]
    cache_entries: Option<usize>,

    /// Evaluation cache size setting, 2^(n+16) entries, 0 disables the cache
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=CACHE_SIZE_MAX as i64))]
    cache_size: Option<u32>,

    /// Variation used by `new` without an argument and by `random`
    #[arg(long, default_value_t = Variation::Standard)]
    variation: Variation,

    /// Seed for `random`, drawn from entropy if absent
    #[arg(long)]
    seed: Option<u64>,
}

enum CacheCommand {
    Show,
    Flush,
    Size(u32),
}

enum Command {
    Id(String),
    Key(String),
    Xg(String),
    Closest(String),
    Match(String),
    New(Option<Variation>),
    Random,
    Bearoff(usize, u32, u64),
    Cache(CacheCommand),
    Help,
    Quit,
    Empty,
}

fn parse_number<T: FromStr>(word: Option<&str>, what: &str) -> Result<T, String> {
    let word = word.ok_or_else(|| format!("missing {what}"))?;
    word.parse().map_err(|_| format!("{what} {word:?} is not a number"))
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(Command::Empty);
        };
        let mut argument = || {
            words
                .next()
                .map(str::to_string)
                .ok_or_else(|| format!("{name} needs an argument"))
        };

        let command = match name {
            "id" => Command::Id(argument()?),
            "key" => Command::Key(argument()?),
            "xg" => Command::Xg(argument()?),
            "closest" => Command::Closest(argument()?),
            "match" => Command::Match(argument()?),
            "new" => match words.next() {
                Some(variation) => Command::New(Some(variation.parse().map_err(|e| format!("{e}"))?)),
                None => Command::New(None),
            },
            "random" => Command::Random,
            "bearoff" => Command::Bearoff(
                parse_number(words.next(), "points")?,
                parse_number(words.next(), "chequers")?,
                parse_number(words.next(), "index")?,
            ),
            "cache" => match words.next() {
                None => Command::Cache(CacheCommand::Show),
                Some("flush") => Command::Cache(CacheCommand::Flush),
                Some("size") => Command::Cache(CacheCommand::Size(parse_number(words.next(), "size")?)),
                Some(other) => return Err(format!("unknown cache command {other:?}")),
            },
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(format!("unknown command {name:?}, try help")),
        };

        Ok(command)
    }
}

fn show_board(board: &Board) {
    print!("{board}");
    if let Some(xg) = board.to_xg() {
        println!(" XGID: {xg}");
    }
}

fn show_cache(engine: &Engine) {
    match engine.cache() {
        Some(cache) => {
            println!("cache entries: {}", cache.size());
            println!("cache bytes  : {}", cache.bytes());
            match engine.cache_size_setting() {
                Some(setting) => println!("size setting : {setting} ({} MB)", cache_megabytes(setting)),
                None => println!("size setting : custom"),
            }
            let stats = cache.stats();
            println!(
                "lookups {} hits {} added {}",
                stats.lookups, stats.hits, stats.added
            );
        }
        None => println!("cache disabled"),
    }
}

/// Run one command. Returns Ok(false) when the loop should stop.
fn run(
    command: Command,
    engine: &mut Engine,
    rng: &mut StdRng,
) -> Result<bool, Box<dyn Error>> {
    match command {
        Command::Id(id) => show_board(&Board::parse_position_id(&id)?),

        Command::Key(id) => {
            let board = Board::parse_position_id(&id)?;
            let packed = PackedKey::from(&board);
            let words: Vec<String> = packed.words().iter().map(|w| format!("{w:08x}")).collect();
            println!("packed key: {}", words.join(" "));
            let old = OldKey::from(&board);
            let bytes: Vec<String> = old.bytes().iter().map(|b| format!("{b:02x}")).collect();
            println!("old key   : {}", bytes.join(" "));
        }

        Command::Xg(xg) => {
            let board = Board::parse_xg(&xg)?;
            if !board.is_legal() {
                println!("board is not legal, see `closest`");
            }
            show_board(&board);
        }

        Command::Closest(xg) => show_board(&Board::parse_xg(&xg)?.closest_legal()),

        Command::Match(id) => {
            let state = MatchState::parse_match_id(&id)?;
            println!("{state:#?}");
        }

        Command::New(variation) => {
            let variation = variation.unwrap_or(engine.variation());
            show_board(&Board::start_position(variation));
        }

        Command::Random => show_board(&Board::random(rng, engine.variation())),

        Command::Bearoff(points, chequers, index) => {
            if !(1..=bearoff::MAX_POINTS).contains(&points)
                || points + chequers as usize > bearoff::MAX_N
            {
                return Err(format!("{chequers} chequers on {points} points cannot be indexed").into());
            }
            let positions = bearoff_positions(points, chequers);
            if index >= positions {
                return Err(format!("index must be below {positions}").into());
            }
            let position = bearoff_index_to_position(index, points, chequers);
            println!("{:?}", position.as_slice());
        }

        Command::Cache(CacheCommand::Show) => show_cache(engine),

        Command::Cache(CacheCommand::Flush) => {
            engine.try_flush_cache()?;
            println!("cache flushed");
        }

        Command::Cache(CacheCommand::Size(setting)) => {
            let entries = engine.try_set_cache_size_setting(setting)?;
            println!("cache entries: {entries}");
        }

        Command::Help => println!("{HELP}"),

        Command::Quit => return Ok(false),

        Command::Empty => (),
    }

    Ok(true)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    println!("Gammon {} by Paulo L\n", env!("CARGO_PKG_VERSION"));

    let mut builder = EngineBuilder::new().variation(args.variation);
    if let Some(entries) = args.cache_entries {
        builder = builder.cache_entries(entries);
    }
    if let Some(setting) = args.cache_size {
        builder = builder.cache_size_setting(setting);
    }
    let mut engine = builder.build()?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    bearoff::init();
    debug!("bearoff table ready");

    loop {
        // Wait to receive a line of input.
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let command = match Command::from_str(&input) {
            Ok(command) => command,
            Err(message) => {
                println!("error: {message}");
                continue;
            }
        };

        match run(command, &mut engine, &mut rng) {
            Ok(true) => (),
            Ok(false) => break,
            Err(err) => println!("error: {err}"),
        }
    }

    info!("bye");
    Ok(())
}
