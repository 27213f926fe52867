use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::{
    error::Error,
    io,
    time::{Duration, Instant},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Chart, Dataset, GraphType},
    Frame, Terminal,
};

use arttrack::position::Position;

struct App<S, R> {
    sent_generator: S,
    received_generator: R,
    range: f64,
    sent: Vec<(f64, f64)>,
    received: Vec<(f64, f64)>,
}

// Seen from above: the floor is the consumer's XZ plane.
fn top_down(positions: Vec<Position>) -> Vec<(f64, f64)> {
    positions
        .iter()
        .map(|&Position { x, z, .. }| (x as f64, z as f64))
        .collect()
}

impl<S, R> App<S, R>
where
    S: FnMut() -> Vec<Position>,
    R: FnMut() -> Vec<Position>,
{
    fn new(sent_generator: S, received_generator: R, range: f64) -> Self {
        App {
            sent_generator,
            received_generator,
            range,
            sent: vec![],
            received: vec![],
        }
    }

    // One tick reads the tracker once.
    fn on_tick(&mut self) {
        self.sent = top_down((self.sent_generator)());
        self.received = top_down((self.received_generator)());
    }
}

pub fn engage_gui<S, R>(range: f64, sent_generator: S, received_generator: R) -> Result<(), Box<dyn Error>>
where
    S: FnMut() -> Vec<Position>,
    R: FnMut() -> Vec<Position>,
{
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let tick_rate = Duration::from_millis(16);
    let app = App::new(sent_generator, received_generator, range);
    let res = run_app(&mut terminal, app, tick_rate);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B, S, R>(terminal: &mut Terminal<B>, mut app: App<S, R>, tick_rate: Duration) -> io::Result<()>
where
    B: Backend,
    S: FnMut() -> Vec<Position>,
    R: FnMut() -> Vec<Position>,
{
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let KeyCode::Char('q') = key.code {
                    return Ok(());
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn axis(title: &str, range: f64) -> Axis<'_> {
    Axis::default()
        .title(Span::styled(title, Style::default().fg(Color::Red)))
        .style(Style::default().fg(Color::White))
        .bounds([-range, range])
        .labels(
            [-range, -range / 2.0, 0.0, range / 2.0, range]
                .iter()
                .map(|v| Span::from(format!("{:.1}", v)))
                .collect(),
        )
}

fn ui<S, R>(f: &mut Frame, app: &App<S, R>) {
    let chart = Chart::new(vec![
        Dataset::default()
            .name("Sent")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&app.sent),
        Dataset::default()
            .name("Tracked")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Red))
            .data(&app.received),
    ])
    .block(Block::default().title("Top down, q to quit"))
    .x_axis(axis("X (m)", app.range))
    .y_axis(axis("Z (m)", app.range));

    f.render_widget(chart, f.size());
}
