mod app;
mod render;
mod theme;

use app::App;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gramgrid_core::{create_adapter, data_dir, Environment, ProgressStore, WeeklyPuzzles};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Daily 3x3 word-sum puzzle in the terminal
#[derive(Debug, Parser)]
#[command(name = "gramgrid", version, about)]
struct Args {
    /// Weekly puzzle file (JSON); the built-in week is used when omitted
    #[arg(long, value_name = "FILE")]
    puzzles: Option<PathBuf>,

    /// Date to open (YYYY-MM-DD), defaults to today or the newest puzzle
    #[arg(long)]
    date: Option<String>,

    /// Where progress is stored
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log file, defaults to gramgrid.log in the data directory
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Keep progress in memory only
    #[arg(long)]
    in_memory: bool,
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let dir = args.data_dir.clone().unwrap_or_else(data_dir);
    // In-memory runs only log when asked to
    match (&args.log_file, args.in_memory) {
        (Some(path), _) => init_logging(path.clone()),
        (None, false) => init_logging(dir.join("gramgrid.log")),
        (None, true) => {}
    }

    let feed = match load_feed(&args) {
        Ok(feed) => feed,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    let start = feed.position(args.date.as_deref().unwrap_or(today.as_str())).unwrap_or(0);

    let env = if args.in_memory {
        Environment::Test
    } else {
        Environment::detect()
    };
    let adapter = create_adapter(env, Some(dir));
    log::info!("Using {} storage", adapter.backend_name());

    let runtime = tokio::runtime::Runtime::new()?;
    let store = Arc::new(runtime.block_on(ProgressStore::load(adapter)));
    let mut app = App::new(feed, start, store, runtime.handle().clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let result = run_app(&mut stdout, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen)?;

    // Let in-flight completion writes land before the runtime goes away
    for task in app.take_pending() {
        if let Err(e) = runtime.block_on(task) {
            log::warn!("Completion write did not finish: {}", e);
        }
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

fn load_feed(args: &Args) -> Result<WeeklyPuzzles, Box<dyn std::error::Error>> {
    match &args.puzzles {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            Ok(WeeklyPuzzles::from_json(&json)?)
        }
        None => Ok(WeeklyPuzzles::fallback(chrono::Local::now().date_naive())),
    }
}

/// Log to a file: stderr would draw over the alternate screen
fn init_logging(path: PathBuf) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = match fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(_) => return,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn run_app(stdout: &mut io::Stdout, app: &mut App) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        let tick_rate = app.tick_rate();

        render::render(stdout, app)?;
        stdout.flush()?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout.min(Duration::from_millis(33)))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    break;
                }

                match app.handle_key(key) {
                    app::AppAction::Continue => {}
                    app::AppAction::Quit => break,
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}
