//! Folio CLI - terminal portfolio with a command console and music player

mod cli;
mod palette;
mod portfolio;
mod settings;
mod view;

use std::cell::{ Cell, RefCell };
use std::fs::{ self, OpenOptions };
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::{ Duration, Instant };

use anyhow::{ Context, Result };
use clap::Parser;
use crossterm::{
    event::{ self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind },
    terminal::{ disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen },
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{ Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Tabs, Wrap },
};
use time::{ macros::format_description, OffsetDateTime, UtcOffset };
use tracing::Level;

use cli::Args;
use palette::Palette;
use settings::Settings;
use view::ViewMode;

use folio_core::{
    format_time, AudioEngine, Console, Host, KeyValueStore, Page, Playlist, StatusSnapshot, Theme,
    ThemeStore, Transport,
};


/// Volume change per key press.
const VOLUME_STEP: f32 = 0.1;

/// Rows the autocomplete popup shows at once.
const POPUP_ROWS: usize = 6;


/// Application state.
struct App {
    console: Console,
    transport: Transport<AudioEngine>,
    theme: ThemeStore,
    /// Latest transport snapshot, kept current by a subscription.
    status: Rc<RefCell<StatusSnapshot>>,
    /// Follows the theme store through a listener.
    palette: Rc<Cell<Palette>>,
    view_mode: ViewMode,
    settings: Settings,
    local_offset: UtcOffset,
    /// Progress gauge location for click-to-seek.
    progress_area: Option<Rect>,
    should_quit: bool,
}


impl App {
    fn new( args: &Args, settings: Settings, local_offset: UtcOffset ) -> Self {
        let playlist = match &args.playlist {
            Some( path ) => Playlist::load( path ).unwrap_or_else( |e| {
                tracing::warn!( "Failed to load playlist {:?}, using the built-in one: {}", path, e );
                Playlist::builtin()
            }),
            None => Playlist::builtin(),
        };
        tracing::info!( "Playlist has {} tracks", playlist.len() );

        let mut transport = Transport::new( playlist, AudioEngine::new() );
        let status = Rc::new( RefCell::new( transport.snapshot() ) );
        let sink = Rc::clone( &status );
        transport.subscribe( move |snapshot| *sink.borrow_mut() = snapshot.clone() );
        transport.set_open( args.open_player || settings.open_player );

        let mut theme = match KeyValueStore::default_path() {
            Some( path ) => ThemeStore::open( KeyValueStore::open( path ) ),
            None => ThemeStore::in_memory(),
        };
        let palette = Rc::new( Cell::new( Palette::for_theme( theme.theme() ) ) );
        let listener = Rc::clone( &palette );
        theme.subscribe( move |dark| {
            listener.set( Palette::for_theme( if dark { Theme::Dark } else { Theme::Light } ) );
        });

        let view_mode = ViewMode::from( args.view.unwrap_or( settings.start_view ) );

        Self {
            console: Console::with_builtins(),
            transport,
            theme,
            status,
            palette,
            view_mode,
            settings,
            local_offset,
            progress_area: None,
            should_quit: false,
        }
    }


    /// Advances timers: media events, delayed resume and pending navigation.
    fn tick( &mut self ) {
        let now = Instant::now();
        self.transport.tick( now );

        let mut pages = Vec::new();
        self.console.tick( now, &mut |page| pages.push( page ) );
        if let Some( page ) = pages.last() {
            self.view_mode = ViewMode::for_page( *page );
        }
    }


    fn handle_key( &mut self, code: KeyCode, modifiers: KeyModifiers ) {
        if modifiers.contains( KeyModifiers::CONTROL ) && code == KeyCode::Char( 'c' ) {
            self.should_quit = true;
            return;
        }

        if self.handle_player_key( code ) {
            return;
        }

        match self.view_mode {
            ViewMode::Terminal => self.handle_terminal_key( code ),
            ViewMode::Portfolio( _ ) => self.handle_portfolio_key( code ),
        }
    }


    /// Player panel keys. Returns true if the key was consumed.
    fn handle_player_key( &mut self, code: KeyCode ) -> bool {
        if code == KeyCode::F( 2 ) {
            self.transport.toggle_open();
            return true;
        }
        if !self.transport.is_open() {
            return false;
        }

        match code {
            KeyCode::F( 5 ) => self.transport.toggle_play_pause(),
            KeyCode::F( 6 ) => self.transport.previous(),
            KeyCode::F( 7 ) => self.transport.next(),
            KeyCode::F( 8 ) => self.transport.toggle_shuffle(),
            KeyCode::F( 9 ) => self.transport.cycle_repeat_mode(),
            KeyCode::F( 10 ) => self.transport.set_volume( self.transport.volume() - VOLUME_STEP ),
            KeyCode::F( 11 ) => self.transport.set_volume( self.transport.volume() + VOLUME_STEP ),
            _ => return false,
        }
        true
    }


    fn handle_terminal_key( &mut self, code: KeyCode ) {
        match code {
            KeyCode::Enter => {
                let status = self.status.borrow();
                self.console.confirm( Host::new( &mut self.theme, Some( &*status ) ) );
            }
            KeyCode::Char( c ) => self.console.insert_char( c ),
            KeyCode::Backspace => self.console.backspace(),
            KeyCode::Delete => self.console.delete(),
            KeyCode::Left => self.console.move_left(),
            KeyCode::Right => self.console.move_right(),
            KeyCode::Home => self.console.move_home(),
            KeyCode::End => self.console.move_end(),
            KeyCode::Up => self.console.retreat_selection(),
            KeyCode::Down => self.console.advance_selection(),
            KeyCode::Tab => self.console.complete(),
            KeyCode::Esc => self.console.dismiss(),
            _ => {}
        }
    }


    fn handle_portfolio_key( &mut self, code: KeyCode ) {
        match code {
            KeyCode::Tab => self.view_mode = self.view_mode.next_tab(),
            KeyCode::BackTab => self.view_mode = self.view_mode.prev_tab(),
            KeyCode::Char( 't' ) => self.view_mode = ViewMode::Terminal,
            KeyCode::Char( 'd' ) => {
                self.theme.toggle();
            }
            KeyCode::Char( 'q' ) => self.should_quit = true,
            _ => {}
        }
    }


    /// Handles mouse events.
    fn handle_mouse( &mut self, column: u16, row: u16, kind: MouseEventKind ) {
        let MouseEventKind::Down( MouseButton::Left ) = kind else {
            return;
        };
        let Some( area ) = self.progress_area else {
            return;
        };

        if column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height {
            let fraction = ( column - area.x ) as f64 / area.width.max( 1 ) as f64;
            self.transport.seek( fraction );
        }
    }


    /// True when the console asked for the maximized layout.
    fn is_maximized( &self ) -> bool {
        self.view_mode == ViewMode::Terminal && self.console.is_maximized()
    }


    /// Remembers the player panel state for the next start.
    fn save_settings( &mut self ) {
        let open = self.transport.is_open();
        if self.settings.open_player != open {
            self.settings.open_player = open;
            self.settings.save();
        }
    }
}


/// Session uptime as `Ns`, `Mm Ss` or `Hh Mm`.
fn format_uptime( elapsed: Duration ) -> String {
    let secs = elapsed.as_secs();
    let ( hours, minutes, seconds ) = ( secs / 3600, ( secs % 3600 ) / 60, secs % 60 );

    if hours > 0 {
        format!( "{}h {}m", hours, minutes )
    } else if minutes > 0 {
        format!( "{}m {}s", minutes, seconds )
    } else {
        format!( "{}s", seconds )
    }
}


/// Installs the file logger. The terminal belongs to the UI.
fn init_logging( args: &Args ) -> Result<PathBuf> {
    let path = args.log_file.clone().unwrap_or_else( || {
        dirs::data_local_dir()
            .map( |d| d.join( "folio" ).join( "folio.log" ) )
            .unwrap_or_else( || PathBuf::from( "folio.log" ) )
    });

    if let Some( parent ) = path.parent() {
        fs::create_dir_all( parent )
            .with_context( || format!( "Failed to create log directory {:?}", parent ) )?;
    }
    let file = OpenOptions::new()
        .create( true )
        .append( true )
        .open( &path )
        .with_context( || format!( "Failed to open log file {:?}", path ) )?;

    tracing_subscriber::fmt()
        .with_writer( Mutex::new( file ) )
        .with_ansi( false )
        .with_max_level( if args.verbose { Level::DEBUG } else { Level::INFO } )
        .init();

    Ok( path )
}


fn main() -> Result<()> {
    let args = Args::parse();
    // Must be read before any other thread exists.
    let local_offset = UtcOffset::current_local_offset().unwrap_or( UtcOffset::UTC );

    let log_path = init_logging( &args )?;
    tracing::info!( "Folio starting, logging to {:?}", log_path );

    let settings = Settings::load();
    let mut app = App::new( &args, settings, local_offset );

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute( EnterAlternateScreen )?;
    io::stdout().execute( crossterm::event::EnableMouseCapture )?;

    let mut terminal = Terminal::new( CrosstermBackend::new( io::stdout() ) )?;
    let result = run( &mut terminal, &mut app );

    // Cleanup
    io::stdout().execute( crossterm::event::DisableMouseCapture )?;
    disable_raw_mode()?;
    io::stdout().execute( LeaveAlternateScreen )?;

    app.save_settings();
    tracing::info!( "Folio exiting" );
    result
}


fn run( terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App ) -> Result<()> {
    loop {
        app.tick();

        terminal.draw( |frame| draw_ui( frame, app ) )?;

        if event::poll( Duration::from_millis( 100 ) )? {
            match event::read()? {
                Event::Key( key ) if key.kind == KeyEventKind::Press => {
                    app.handle_key( key.code, key.modifiers );
                }
                Event::Mouse( mouse ) => {
                    app.handle_mouse( mouse.column, mouse.row, mouse.kind );
                }
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}


/// Draws the main UI.
fn draw_ui( frame: &mut Frame, app: &mut App ) {
    let palette = app.palette.get();
    let area = frame.area();
    frame.render_widget( Block::default().style( palette.base() ), area );

    let maximized = app.is_maximized();
    let show_player = app.transport.is_open() && !maximized;

    let mut constraints = Vec::new();
    if !maximized {
        constraints.push( Constraint::Length( 2 ) );
    }
    constraints.push( Constraint::Min( 0 ) );
    if show_player {
        constraints.push( Constraint::Length( 6 ) );
    }
    constraints.push( Constraint::Length( 1 ) );

    let chunks = Layout::default()
        .direction( Direction::Vertical )
        .constraints( constraints )
        .split( area );

    let mut next = 0;
    if !maximized {
        draw_header( frame, app, chunks[ next ] );
        next += 1;
    }

    match app.view_mode {
        ViewMode::Terminal => draw_terminal( frame, app, chunks[ next ] ),
        ViewMode::Portfolio( page ) => draw_portfolio( frame, &palette, page, chunks[ next ] ),
    }
    next += 1;

    app.progress_area = None;
    if show_player {
        draw_player( frame, app, chunks[ next ] );
        next += 1;
    }

    draw_status_bar( frame, app, chunks[ next ] );
}


fn draw_header( frame: &mut Frame, app: &App, area: Rect ) {
    let palette = app.palette.get();
    let block = Block::default().borders( Borders::BOTTOM ).border_style( Style::default().fg( palette.muted ) );

    match app.view_mode {
        ViewMode::Terminal => {
            let header = Paragraph::new( format!( "  FOLIO - {}", app.view_mode.name() ) )
                .style( Style::default().fg( palette.accent ).bold() )
                .block( block );
            frame.render_widget( header, area );
        }
        ViewMode::Portfolio( page ) => {
            let titles: Vec<String> = Page::TABS
                .iter()
                .map( |p| ViewMode::Portfolio( *p ).name().to_string() )
                .collect();
            let selected = Page::TABS.iter().position( |p| *p == page ).unwrap_or( 0 );
            let tabs = Tabs::new( titles )
                .select( selected )
                .style( Style::default().fg( palette.muted ) )
                .highlight_style( Style::default().fg( palette.accent ).bold() )
                .block( block );
            frame.render_widget( tabs, area );
        }
    }
}


fn draw_terminal( frame: &mut Frame, app: &App, area: Rect ) {
    let palette = app.palette.get();
    let chunks = Layout::default()
        .direction( Direction::Vertical )
        .constraints([
            Constraint::Min( 0 ),     // Scrollback
            Constraint::Length( 1 ),  // Prompt
        ])
        .split( area );

    // Pin the view to the newest lines
    let scrollback = app.console.scrollback();
    let offset = scrollback.len().saturating_sub( chunks[ 0 ].height as usize );
    let lines: Vec<Line> = scrollback.iter().map( |l| Line::from( l.as_str() ) ).collect();
    let output = Paragraph::new( lines )
        .style( palette.base() )
        .scroll(( offset.min( u16::MAX as usize ) as u16, 0 ));
    frame.render_widget( output, chunks[ 0 ] );

    let input = app.console.input();
    let prompt = Line::from( vec![
        Span::styled( "$ ", Style::default().fg( palette.prompt ).bold() ),
        Span::raw( input.content() ),
    ]);
    frame.render_widget( Paragraph::new( prompt ), chunks[ 1 ] );
    frame.set_cursor_position(( chunks[ 1 ].x + 2 + input.cursor_column() as u16, chunks[ 1 ].y ));

    draw_autocomplete( frame, app, chunks[ 1 ] );
}


/// Candidate popup floating above the prompt.
fn draw_autocomplete( frame: &mut Frame, app: &App, prompt: Rect ) {
    let autocomplete = app.console.autocomplete();
    if !autocomplete.is_visible() {
        return;
    }

    let palette = app.palette.get();
    let candidates = autocomplete.candidates();
    let selected = autocomplete.selected_index();
    let start = selected.saturating_sub( POPUP_ROWS - 1 );

    let items: Vec<ListItem> = candidates
        .iter()
        .enumerate()
        .skip( start )
        .take( POPUP_ROWS )
        .map( |( i, name )| {
            let style = if i == selected {
                Style::default().fg( palette.background ).bg( palette.selection )
            } else {
                Style::default().fg( palette.text )
            };
            ListItem::new( format!( " {} ", name ) ).style( style )
        })
        .collect();

    let height = ( items.len() as u16 + 2 ).min( prompt.y );
    let popup = Rect {
        x: prompt.x + 2,
        y: prompt.y.saturating_sub( height ),
        width: 24.min( prompt.width.saturating_sub( 2 ) ),
        height,
    };

    let list = List::new( items ).block(
        Block::default()
            .borders( Borders::ALL )
            .border_style( Style::default().fg( palette.muted ) )
            .style( palette.base() ),
    );
    frame.render_widget( Clear, popup );
    frame.render_widget( list, popup );
}


fn draw_portfolio( frame: &mut Frame, palette: &Palette, page: Page, area: Rect ) {
    let body = Paragraph::new( portfolio::page_lines( page, palette ) )
        .style( palette.base() )
        .wrap( Wrap { trim: false } )
        .block( Block::default().borders( Borders::NONE ) );
    frame.render_widget( body, area.inner( Margin::new( 2, 1 ) ) );
}


fn draw_player( frame: &mut Frame, app: &mut App, area: Rect ) {
    let palette = app.palette.get();
    let status = app.status.borrow().clone();

    let block = Block::default()
        .title( " Now Playing " )
        .borders( Borders::ALL )
        .border_style( Style::default().fg( palette.muted ) );
    let inner = block.inner( area );
    frame.render_widget( block, area );

    let rows = Layout::default()
        .direction( Direction::Vertical )
        .constraints([
            Constraint::Length( 1 ),  // Title
            Constraint::Length( 1 ),  // Artist
            Constraint::Length( 1 ),  // Progress
            Constraint::Length( 1 ),  // Modes
        ])
        .split( inner );

    let track = &status.current_track;
    let state = if status.is_playing { "▶" } else { "⏸" };
    frame.render_widget(
        Paragraph::new( format!( " {} {}", state, track.name ) ).style( Style::default().fg( palette.text ).bold() ),
        rows[ 0 ],
    );
    frame.render_widget(
        Paragraph::new( format!( "   {} · {}", track.artist, track.genre ) ).style( Style::default().fg( palette.muted ) ),
        rows[ 1 ],
    );

    let duration = match status.duration {
        Some( _ ) => format_time( status.duration ),
        None => track.display_duration.clone(),
    };
    let gauge = Gauge::default()
        .gauge_style( Style::default().fg( palette.accent ).bg( palette.background ) )
        .ratio( status.progress() )
        .label( format!( "{} / {}", format_time( Some( status.current_time ) ), duration ) );
    let bar = rows[ 2 ].inner( Margin::new( 1, 0 ) );
    frame.render_widget( gauge, bar );
    app.progress_area = Some( bar );

    let modes = format!(
        "   Vol {:>3}%   Shuffle {}   Repeat {}   [F5]Play [F6/F7]Skip [F8]Shuffle [F9]Repeat [F10/F11]Vol",
        ( status.volume * 100.0 ).round() as i32,
        if status.is_shuffled { "on" } else { "off" },
        status.repeat_mode.label(),
    );
    frame.render_widget( Paragraph::new( modes ).style( Style::default().fg( palette.muted ) ), rows[ 3 ] );
}


fn draw_status_bar( frame: &mut Frame, app: &App, area: Rect ) {
    let palette = app.palette.get();

    let text = match app.view_mode {
        ViewMode::Terminal => {
            let clock = OffsetDateTime::now_utc()
                .to_offset( app.local_offset )
                .format( format_description!( "[hour]:[minute]:[second]" ) )
                .unwrap_or_default();
            format!(
                " {}  Uptime: {}  [Tab]Complete [Esc]Dismiss [F2]Player [Ctrl-C]Quit ",
                clock,
                format_uptime( app.console.started().elapsed() )
            )
        }
        ViewMode::Portfolio( _ ) => {
            format!( " [Tab]Pages [t]Terminal [d]{} mode [F2]Player [q]Quit ", match app.theme.theme() {
                Theme::Dark => "Light",
                Theme::Light => "Dark",
            })
        }
    };

    let status = Paragraph::new( text ).style( Style::default().fg( palette.muted ).bg( palette.background ) );
    frame.render_widget( status, area );
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_format_uptime() {
        assert_eq!( format_uptime( Duration::from_secs( 42 ) ), "42s" );
        assert_eq!( format_uptime( Duration::from_secs( 125 ) ), "2m 5s" );
        assert_eq!( format_uptime( Duration::from_secs( 3 * 3600 + 61 ) ), "3h 1m" );
    }
}
