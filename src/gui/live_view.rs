use std::{io::stdout, time::Duration};

use crate::gui::error::GuiError;

use crossterm::{
    event::{self, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// How long one frame waits for a key before redrawing, about 60 Hz.
const FRAME_TIME: Duration = Duration::from_millis(16);

/// Redraws the text produced by `frame` until the user presses a key.
///
/// `frame` is called exactly once per drawn frame, which makes this loop the
/// render tick that polls a tracker.
pub fn watch_until_keypress<F>(title: &str, mut frame: F) -> Result<(), GuiError>
where
    F: FnMut() -> Vec<Line<'static>>,
{
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let res = draw_until_keypress(title, &mut frame);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    res
}

fn draw_until_keypress<F>(title: &str, frame: &mut F) -> Result<(), GuiError>
where
    F: FnMut() -> Vec<Line<'static>>,
{
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    loop {
        let title = Title::from(title.magenta().bold());
        let instructions = Title::from(Line::from(vec![
            " Press any key to stop ".into(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL);
        let text = Paragraph::new(frame()).block(block);

        terminal.draw(|f| {
            let area = f.size();
            f.render_widget(text, area);
        })?;

        if event::poll(FRAME_TIME)? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(());
                }
            }
        }
    }
}
