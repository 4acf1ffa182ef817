use crate::app::{App, Feedback, Focus};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Print, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use gramgrid_core::grid::{CELLS, SIZE};
use gramgrid_core::{Corner, PuzzleSession, WordCheck};
use std::io;

// Each cell is 5 chars wide plus a border column: +-----+-----+-----+
const CELL_W: u16 = 6;
const GRID_W: u16 = CELL_W * SIZE as u16 + 1;
const GRID_H: u16 = 2 * SIZE as u16 + 1;
const PANEL_W: u16 = 30;

pub fn render(stdout: &mut io::Stdout, app: &App) -> io::Result<()> {
    let (term_width, term_height) = terminal::size()?;

    execute!(stdout, Hide, SetBackgroundColor(app.theme.bg), Clear(ClearType::All))?;

    let total_width = GRID_W + 10 + PANEL_W;
    let start_x = if term_width > total_width {
        (term_width - total_width) / 2
    } else {
        1
    };
    let start_y = if term_height > GRID_H + 16 { 2 } else { 1 };

    render_header(stdout, app, start_x, start_y)?;

    match &app.session {
        Some(session) => {
            let grid_y = start_y + 2;
            render_grid(stdout, app, session, start_x, grid_y)?;
            render_word_panel(stdout, app, session, start_x + GRID_W + 10, grid_y)?;
            render_final_word(stdout, app, start_x, grid_y + GRID_H + 3)?;
        }
        None => {
            let reason = app.load_error.as_deref().unwrap_or("No puzzle");
            execute!(
                stdout,
                MoveTo(start_x, start_y + 3),
                SetForegroundColor(app.theme.mismatched),
                Print(format!("Puzzle unavailable: {}", reason))
            )?;
        }
    }

    render_controls(stdout, app, start_x, start_y + GRID_H + 10)?;

    if let Some(ref msg) = app.message {
        render_message(stdout, app, msg, term_width)?;
    }

    execute!(stdout, Show)?;
    Ok(())
}

fn render_header(stdout: &mut io::Stdout, app: &App, x: u16, y: u16) -> io::Result<()> {
    let theme = &app.theme;
    let date = app.date().unwrap_or("----------");
    let level = app
        .feed
        .get(app.day)
        .map(|p| p.level.as_str())
        .unwrap_or_default();
    let done = if app.is_completed(date) { "  [solved]" } else { "" };

    execute!(
        stdout,
        MoveTo(x, y),
        SetForegroundColor(theme.key),
        Print("=== GRAMGRID ==="),
        SetForegroundColor(theme.info),
        Print(format!("  {} {}", date, level)),
        SetForegroundColor(theme.matched),
        Print(done),
        SetForegroundColor(theme.info),
        Print(format!("   Time: {}", app.elapsed_string()))
    )?;
    Ok(())
}

fn render_grid(
    stdout: &mut io::Stdout,
    app: &App,
    session: &PuzzleSession,
    x: u16,
    y: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let snapshot = session.snapshot();
    let targets_r = session.puzzle().row_targets();
    let targets_c = session.puzzle().col_targets();

    for line in 0..GRID_H {
        execute!(stdout, MoveTo(x, y + line), SetForegroundColor(theme.border))?;
        if line % 2 == 0 {
            execute!(stdout, Print("+-----+-----+-----+"))?;
            continue;
        }

        let row = (line / 2) as usize;
        execute!(stdout, Print("|"))?;
        for col in 0..SIZE {
            let index = row * SIZE + col;
            let selected = app.focus == Focus::Grid && app.cursor == index;
            let bg = if selected { theme.selected_bg } else { theme.bg };
            let (text, fg) = match session.grid().get(index) {
                Some(letter) => (letter, theme.filled),
                None => ('.', theme.placeholder),
            };
            execute!(
                stdout,
                SetBackgroundColor(bg),
                SetForegroundColor(fg),
                Print(format!("  {}  ", text)),
                SetBackgroundColor(theme.bg),
                SetForegroundColor(theme.border),
                Print("|")
            )?;
        }

        // Row total to the right
        execute!(
            stdout,
            SetForegroundColor(theme.sum_color(snapshot.row_statuses[row])),
            Print(format!(" {:>2}/{:<2}", snapshot.row_sums[row], targets_r[row]))
        )?;
    }

    // Column totals underneath
    for col in 0..SIZE {
        execute!(
            stdout,
            MoveTo(x + 1 + col as u16 * CELL_W, y + GRID_H),
            SetForegroundColor(theme.sum_color(snapshot.col_statuses[col])),
            Print(format!("{:^5}", format!("{}/{}", snapshot.col_sums[col], targets_c[col])))
        )?;
    }

    // Corner markers sit on the inner border crossings
    for corner in Corner::ALL {
        let (cx, cy) = match corner {
            Corner::TopLeft => (CELL_W, 2),
            Corner::TopRight => (2 * CELL_W, 2),
            Corner::BottomLeft => (CELL_W, 4),
            Corner::BottomRight => (2 * CELL_W, 4),
        };
        let valid = snapshot.corner_valid(corner);
        execute!(
            stdout,
            MoveTo(x + cx, y + cy),
            SetForegroundColor(theme.corner_color(valid)),
            Print(if valid { "*" } else { "o" })
        )?;
    }

    let filled = session.grid().filled_count();
    execute!(
        stdout,
        MoveTo(x, y + GRID_H + 1),
        SetForegroundColor(theme.info),
        Print(format!("{}/{} letters", filled, CELLS))
    )?;
    Ok(())
}

fn render_word_panel(
    stdout: &mut io::Stdout,
    app: &App,
    session: &PuzzleSession,
    x: u16,
    y: u16,
) -> io::Result<()> {
    let theme = &app.theme;

    execute!(
        stdout,
        MoveTo(x, y),
        SetForegroundColor(theme.info),
        Print("Corner words:")
    )?;

    for (i, clue) in session.puzzle().words().iter().enumerate() {
        let row = y + 1 + i as u16 * 2;
        let letters: String = clue.word.chars().map(|c| format!(" {} ", c)).collect();
        let values: String = clue.values.iter().map(|v| format!("{:^3}", v)).collect();
        execute!(
            stdout,
            MoveTo(x, row),
            SetBackgroundColor(theme.chip_bg),
            SetForegroundColor(theme.fg),
            Print(letters),
            SetBackgroundColor(theme.bg),
            MoveTo(x, row + 1),
            SetForegroundColor(theme.info),
            Print(values)
        )?;
    }

    let snapshot = session.snapshot();
    let corners_y = y + 10;
    execute!(stdout, MoveTo(x, corners_y))?;
    for corner in Corner::ALL {
        let valid = snapshot.corner_valid(corner);
        execute!(
            stdout,
            SetForegroundColor(theme.corner_color(valid)),
            Print(format!("{} {}  ", corner.label(), if valid { "ok" } else { "--" }))
        )?;
    }
    Ok(())
}

fn render_final_word(stdout: &mut io::Stdout, app: &App, x: u16, y: u16) -> io::Result<()> {
    let theme = &app.theme;
    let focused = app.focus == Focus::FinalWord;
    let field = format!("{:_<9}", app.final_word);

    execute!(
        stdout,
        MoveTo(x, y),
        SetForegroundColor(theme.info),
        Print("Solution word: "),
        SetBackgroundColor(if focused { theme.selected_bg } else { theme.chip_bg }),
        SetForegroundColor(theme.fg),
        Print(format!(" {} ", field)),
        SetBackgroundColor(theme.bg)
    )?;

    let (text, color) = match &app.feedback {
        Some(Feedback::Word(WordCheck::Correct)) => ("Success".to_string(), theme.matched),
        Some(Feedback::Word(WordCheck::Incorrect)) => {
            ("Sorry, incorrect".to_string(), theme.mismatched)
        }
        Some(Feedback::Word(WordCheck::Indeterminate)) => {
            ("Enter all nine letters".to_string(), theme.pending)
        }
        Some(Feedback::Denied(denied)) => (denied.to_string(), theme.mismatched),
        None => (String::new(), theme.fg),
    };
    execute!(
        stdout,
        MoveTo(x, y + 1),
        SetForegroundColor(color),
        Print(text)
    )?;
    Ok(())
}

fn render_controls(stdout: &mut io::Stdout, app: &App, x: u16, y: u16) -> io::Result<()> {
    let theme = &app.theme;

    let controls = [
        ("A-Z", "Letter"),
        ("Arrows", "Move"),
        ("Bksp/Del", "Clear"),
        ("Enter", "Next/Check"),
        ("Tab", "Word field"),
        ("^V", "Reveal"),
        ("^R", "Reset"),
        ("^P/^N", "Prev/Next day"),
        ("^T", "Theme"),
        ("Esc", "Quit"),
    ];

    // Two rows of five
    for (i, (key, desc)) in controls.iter().enumerate() {
        let col = i / 2;
        let row = i % 2;
        let cx = x + (col as u16) * 18;
        let cy = y + row as u16;

        execute!(
            stdout,
            MoveTo(cx, cy),
            SetForegroundColor(theme.key),
            Print(format!("{:>8}", key)),
            SetForegroundColor(theme.info),
            Print(format!(" {}", desc))
        )?;
    }

    Ok(())
}

fn render_message(stdout: &mut io::Stdout, app: &App, msg: &str, term_width: u16) -> io::Result<()> {
    let theme = &app.theme;
    let padded = format!("  {}  ", msg);
    let x = term_width.saturating_sub(padded.len() as u16) / 2;

    execute!(
        stdout,
        MoveTo(x, 0),
        SetForegroundColor(theme.fg),
        SetBackgroundColor(theme.selected_bg),
        Print(&padded),
        SetBackgroundColor(theme.bg)
    )?;

    Ok(())
}
