//! Command console
//!
//! Owns the scrollback, the prompt buffer and its autocomplete list, and
//! dispatches submitted lines against a [`CommandTable`]. Nothing here
//! returns an error: unknown commands are reported in the scrollback.

use std::time::{ Duration, Instant };

use crate::autocomplete::Autocomplete;
use crate::command::{ CommandTable, ConsoleContext, Lookup, Page, normalize };
use crate::input::InputBuffer;
use crate::theme::ThemeStore;
use crate::transport::StatusSnapshot;


/// Reserved command that resets the scrollback.
pub const CLEAR_COMMAND: &str = "clear";

/// Time between a navigation command's output and the navigation itself.
pub const NAVIGATION_DELAY: Duration = Duration::from_millis( 500 );

/// Second line printed for unknown commands.
pub const NOT_FOUND_HINT: &str = "💡 Tip: Type \"help\" for available commands or use Tab for suggestions.";

pub const WELCOME_BANNER: [&str; 6] = [
    "╭─────────────────────────────────────────────────────────╮",
    "│  Welcome to my interactive portfolio terminal! 🚀       │",
    "│  Type \"help\" to see available commands                  │",
    "│  Use Tab for autocompletion                             │",
    "╰─────────────────────────────────────────────────────────╯",
    "",
];


/// External collaborators handed to the console for one submit.
pub struct Host<'a> {
    pub theme: &'a mut ThemeStore,
    pub status: Option<&'a StatusSnapshot>,
}


impl<'a> Host<'a> {
    pub fn new( theme: &'a mut ThemeStore, status: Option<&'a StatusSnapshot> ) -> Self {
        Self { theme, status }
    }
}


#[derive( Debug, Clone, Copy )]
struct PendingNavigation {
    page: Page,
    due: Instant,
}


/// Terminal-style command console.
#[derive( Debug )]
pub struct Console {
    table: CommandTable,
    scrollback: Vec<String>,
    maximized: bool,
    started: Instant,
    pending: Vec<PendingNavigation>,
    input: InputBuffer,
    autocomplete: Autocomplete,
}


impl Console {
    /// Creates a console over `table`, showing the welcome banner.
    pub fn new( table: CommandTable ) -> Self {
        Self {
            table,
            scrollback: WELCOME_BANNER.iter().map( |s| s.to_string() ).collect(),
            maximized: false,
            started: Instant::now(),
            pending: Vec::new(),
            input: InputBuffer::new(),
            autocomplete: Autocomplete::new(),
        }
    }


    /// Creates a console with the built-in command set.
    pub fn with_builtins() -> Self {
        Self::new( CommandTable::with_builtins() )
    }


    /// Runs one line of input.
    ///
    /// Lookup uses the trimmed, lowercased line; the echo keeps it verbatim.
    /// Blank input does nothing unless an autocomplete candidate is
    /// highlighted, in which case that candidate runs instead.
    pub fn submit( &mut self, raw: &str, host: Host<'_> ) {
        let command = normalize( raw );

        if command.is_empty() {
            if let Some( candidate ) = self.autocomplete.selected().map( str::to_string ) {
                self.autocomplete.dismiss();
                self.submit( &candidate, host );
            }
            return;
        }

        tracing::debug!( "Console command: {:?}", command );

        if command == CLEAR_COMMAND {
            self.scrollback = vec![ String::new() ];
            return;
        }

        let echo = format!( "$ {}", raw );

        match self.table.lookup( &command ) {
            Lookup::Found( entry ) => {
                let mut ctx = ConsoleContext::new(
                    &self.table,
                    host.theme,
                    host.status,
                    self.started,
                    self.maximized,
                );
                let output = entry.run( &mut ctx );
                let ( navigation, maximized ) = ctx.into_effects();

                self.maximized = maximized;
                if let Some( page ) = navigation {
                    self.pending.push( PendingNavigation {
                        page,
                        due: Instant::now() + NAVIGATION_DELAY,
                    });
                }

                self.scrollback.push( echo );
                self.scrollback.extend( output.split( '\n' ).map( str::to_string ) );
                self.scrollback.push( String::new() );
            }
            Lookup::NotFound => {
                self.scrollback.push( echo );
                self.scrollback.push( format!( "Command not found: {}", command ) );
                self.scrollback.push( NOT_FOUND_HINT.to_string() );
                self.scrollback.push( String::new() );
            }
        }
    }


    /// Delivers navigations that are due at `now`, oldest first.
    ///
    /// Returns how many were delivered.
    pub fn tick( &mut self, now: Instant, navigator: &mut impl FnMut( Page ) ) -> usize {
        let ( due, waiting ): ( Vec<_>, Vec<_> ) = self.pending.drain( .. ).partition( |p| p.due <= now );
        self.pending = waiting;

        for nav in &due {
            tracing::info!( "Navigating to {}", nav.page.id() );
            navigator( nav.page );
        }
        due.len()
    }


    /// Registers an extra command, replacing any with the same name.
    pub fn register(
        &mut self,
        name: &str,
        group: crate::command::CommandGroup,
        description: &str,
        handler: impl Fn( &mut ConsoleContext<'_> ) -> String + 'static,
    ) {
        self.table.register( name, group, description, handler );
        self.refresh_candidates();
    }


    pub fn insert_char( &mut self, c: char ) {
        self.input.insert( c );
        self.refresh_candidates();
    }


    pub fn backspace( &mut self ) {
        self.input.backspace();
        self.refresh_candidates();
    }


    pub fn delete( &mut self ) {
        self.input.delete();
        self.refresh_candidates();
    }


    pub fn move_left( &mut self ) {
        self.input.move_left();
    }


    pub fn move_right( &mut self ) {
        self.input.move_right();
    }


    pub fn move_home( &mut self ) {
        self.input.move_home();
    }


    pub fn move_end( &mut self ) {
        self.input.move_end();
    }


    pub fn advance_selection( &mut self ) {
        self.autocomplete.advance();
    }


    pub fn retreat_selection( &mut self ) {
        self.autocomplete.retreat();
    }


    /// Fills the prompt with the highlighted candidate without running it.
    pub fn complete( &mut self ) {
        if let Some( candidate ) = self.autocomplete.selected().map( str::to_string ) {
            self.input.set( &candidate );
            self.refresh_candidates();
            self.autocomplete.dismiss();
        }
    }


    pub fn dismiss( &mut self ) {
        self.autocomplete.dismiss();
    }


    /// Runs the highlighted candidate if the list is showing, otherwise the
    /// prompt text. The prompt is cleared either way.
    pub fn confirm( &mut self, host: Host<'_> ) {
        let line = match self.autocomplete.selected() {
            Some( candidate ) => {
                let candidate = candidate.to_string();
                self.input.clear();
                candidate
            }
            None => self.input.take(),
        };
        self.refresh_candidates();
        self.submit( &line, host );
    }


    pub fn scrollback( &self ) -> &[String] {
        &self.scrollback
    }


    pub fn is_maximized( &self ) -> bool {
        self.maximized
    }


    /// Sets the maximize flag from outside (e.g. a window control).
    pub fn set_maximized( &mut self, maximized: bool ) {
        self.maximized = maximized;
    }


    pub fn input( &self ) -> &InputBuffer {
        &self.input
    }


    pub fn autocomplete( &self ) -> &Autocomplete {
        &self.autocomplete
    }


    pub fn table( &self ) -> &CommandTable {
        &self.table
    }


    /// Session start, used for uptime displays.
    pub fn started( &self ) -> Instant {
        self.started
    }


    pub fn has_pending_navigation( &self ) -> bool {
        !self.pending.is_empty()
    }


    fn refresh_candidates( &mut self ) {
        let mut names: Vec<&str> = self.table.names().collect();
        if let Err( pos ) = names.binary_search( &CLEAR_COMMAND ) {
            names.insert( pos, CLEAR_COMMAND );
        }
        self.autocomplete.update( self.input.content(), names );
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn type_str( console: &mut Console, s: &str ) {
        s.chars().for_each( |c| console.insert_char( c ) );
    }


    #[test]
    fn test_starts_with_banner() {
        let console = Console::with_builtins();
        assert_eq!( console.scrollback().len(), WELCOME_BANNER.len() );
    }


    #[test]
    fn test_known_command_appends_echo_output_blank() {
        let mut console = Console::with_builtins();
        let mut theme = ThemeStore::in_memory();
        let before = console.scrollback().len();

        console.submit( "whoami", Host::new( &mut theme, None ) );

        let added = &console.scrollback()[ before.. ];
        assert_eq!( added.first().map( String::as_str ), Some( "$ whoami" ) );
        assert_eq!( added.last().map( String::as_str ), Some( "" ) );
        assert_eq!( added.len(), 5 + 2 );
    }


    #[test]
    fn test_blank_input_is_noop() {
        let mut console = Console::with_builtins();
        let mut theme = ThemeStore::in_memory();
        console.submit( "   ", Host::new( &mut theme, None ) );
        assert_eq!( console.scrollback().len(), WELCOME_BANNER.len() );
    }


    #[test]
    fn test_not_found_names_normalized_token() {
        let mut console = Console::with_builtins();
        let mut theme = ThemeStore::in_memory();
        console.submit( " FooBar ", Host::new( &mut theme, None ) );

        let tail: Vec<&str> = console.scrollback().iter().rev().take( 4 ).rev().map( String::as_str ).collect();
        assert_eq!( tail, vec![ "$  FooBar ", "Command not found: foobar", NOT_FOUND_HINT, "" ] );
    }


    #[test]
    fn test_theme_and_size_side_effects() {
        let mut console = Console::with_builtins();
        let mut theme = ThemeStore::in_memory();

        console.submit( "theme", Host::new( &mut theme, None ) );
        assert!( theme.get() );

        console.submit( "changesize", Host::new( &mut theme, None ) );
        assert!( console.is_maximized() );
        console.submit( "minimize", Host::new( &mut theme, None ) );
        assert!( !console.is_maximized() );
    }


    #[test]
    fn test_navigation_waits_for_delay() {
        let mut console = Console::with_builtins();
        let mut theme = ThemeStore::in_memory();
        let mut visited = Vec::new();

        console.submit( "about", Host::new( &mut theme, None ) );
        assert_eq!( console.tick( Instant::now(), &mut |p| visited.push( p ) ), 0 );
        assert!( console.has_pending_navigation() );

        let fired = console.tick( Instant::now() + NAVIGATION_DELAY, &mut |p| visited.push( p ) );
        assert_eq!( fired, 1 );
        assert_eq!( visited, vec![ Page::About ] );
        assert!( !console.has_pending_navigation() );
    }


    #[test]
    fn test_confirm_runs_highlighted_candidate() {
        let mut console = Console::with_builtins();
        let mut theme = ThemeStore::in_memory();

        type_str( &mut console, "who" );
        assert_eq!( console.autocomplete().selected(), Some( "whoami" ) );

        console.confirm( Host::new( &mut theme, None ) );
        assert!( console.input().is_empty() );
        assert!( console.scrollback().iter().any( |l| l == "$ whoami" ) );
        assert!( !console.autocomplete().is_visible() );
    }


    #[test]
    fn test_complete_fills_without_running() {
        let mut console = Console::with_builtins();
        type_str( &mut console, "ex" );
        console.complete();

        assert_eq!( console.input().content(), "experience" );
        assert!( !console.autocomplete().is_visible() );
        assert_eq!( console.scrollback().len(), WELCOME_BANNER.len() );
    }


    #[test]
    fn test_clear_is_offered_by_autocomplete() {
        let mut console = Console::with_builtins();
        type_str( &mut console, "cl" );
        assert_eq!( console.autocomplete().candidates(), &[ "clear".to_string(), "close".to_string() ] );
    }


    #[test]
    fn test_dismiss_then_confirm_uses_typed_text() {
        let mut console = Console::with_builtins();
        let mut theme = ThemeStore::in_memory();

        type_str( &mut console, "co" );
        console.dismiss();
        console.confirm( Host::new( &mut theme, None ) );

        assert!( console.scrollback().iter().any( |l| l == "Command not found: co" ) );
    }


    #[test]
    fn test_registered_command_is_completed() {
        let mut console = Console::with_builtins();
        console.register( "zen", crate::command::CommandGroup::Fun, "Calm down", |_| "breathe".to_string() );
        type_str( &mut console, "z" );
        assert_eq!( console.autocomplete().selected(), Some( "zen" ) );
    }
}
