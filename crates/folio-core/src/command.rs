//! Console command registry.
//!
//! Commands are `(name, group, description, handler)` records. Handlers get a
//! [`ConsoleContext`] that carries everything they may touch; they never
//! capture UI state themselves. Lookup normalizes the input (trim, lowercase)
//! and returns an explicit [`Lookup`].

use std::collections::BTreeMap;
use std::time::{ Duration, Instant };

use crate::theme::{ Theme, ThemeStore };
use crate::transport::StatusSnapshot;


/// Destinations reachable through navigation commands.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum Page {
    Home,
    About,
    Skills,
    Projects,
    Contact,
    /// Switches the application to portfolio mode.
    Portfolio,
}


impl Page {
    /// Pages shown as tabs in portfolio mode.
    pub const TABS: [Page; 5] = [ Page::Home, Page::About, Page::Skills, Page::Projects, Page::Contact ];


    pub fn id( &self ) -> &'static str {
        match self {
            Page::Home => "home",
            Page::About => "about",
            Page::Skills => "skills",
            Page::Projects => "projects",
            Page::Contact => "contact",
            Page::Portfolio => "portfolio",
        }
    }


    pub fn from_id( id: &str ) -> Option<Self> {
        match id {
            "home" => Some( Page::Home ),
            "about" => Some( Page::About ),
            "skills" => Some( Page::Skills ),
            "projects" => Some( Page::Projects ),
            "contact" => Some( Page::Contact ),
            "portfolio" => Some( Page::Portfolio ),
            _ => None,
        }
    }
}


/// Section a command is listed under in `help`.
#[derive( Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord )]
pub enum CommandGroup {
    Navigation,
    System,
    Information,
    Fun,
    /// Runnable but not listed.
    Hidden,
}


impl CommandGroup {
    pub fn title( &self ) -> &'static str {
        match self {
            CommandGroup::Navigation => "Navigation Commands",
            CommandGroup::System => "System Commands",
            CommandGroup::Information => "Information Commands",
            CommandGroup::Fun => "Fun Commands",
            CommandGroup::Hidden => "Hidden Commands",
        }
    }
}


/// Collaborators a command may use while it runs.
pub struct ConsoleContext<'a> {
    table: &'a CommandTable,
    theme: &'a mut ThemeStore,
    status: Option<&'a StatusSnapshot>,
    started: Instant,
    maximized: bool,
    navigation: Option<Page>,
}


impl<'a> ConsoleContext<'a> {
    /// Context for one handler run. `maximized` is the console's current size state.
    pub fn new(
        table: &'a CommandTable,
        theme: &'a mut ThemeStore,
        status: Option<&'a StatusSnapshot>,
        started: Instant,
        maximized: bool,
    ) -> Self {
        Self {
            table,
            theme,
            status,
            started,
            maximized,
            navigation: None,
        }
    }


    /// Requests navigation to `page`. The console delivers it after a delay.
    pub fn navigate( &mut self, page: Page ) {
        self.navigation = Some( page );
    }


    /// Flips dark mode and returns the resulting theme.
    pub fn toggle_theme( &mut self ) -> Theme {
        self.theme.toggle();
        self.theme.theme()
    }


    pub fn theme( &self ) -> Theme {
        self.theme.theme()
    }


    /// Flips the maximize flag and returns the new value.
    pub fn toggle_size( &mut self ) -> bool {
        self.maximized = !self.maximized;
        self.maximized
    }


    pub fn set_maximized( &mut self, maximized: bool ) {
        self.maximized = maximized;
    }


    pub fn is_maximized( &self ) -> bool {
        self.maximized
    }


    /// Latest transport status, if a player is attached.
    pub fn status( &self ) -> Option<&StatusSnapshot> {
        self.status
    }


    /// Time since the console was created.
    pub fn uptime( &self ) -> Duration {
        self.started.elapsed()
    }


    /// The table the running command was found in.
    pub fn table( &self ) -> &CommandTable {
        self.table
    }


    pub( crate ) fn into_effects( self ) -> ( Option<Page>, bool ) {
        ( self.navigation, self.maximized )
    }
}


/// Command implementation.
pub type Handler = Box<dyn Fn( &mut ConsoleContext<'_> ) -> String>;


/// A registered command.
pub struct CommandEntry {
    pub name: String,
    pub group: CommandGroup,
    pub description: String,
    pub handler: Handler,
}


impl CommandEntry {
    /// Runs the handler and returns its output text.
    pub fn run( &self, ctx: &mut ConsoleContext<'_> ) -> String {
        ( self.handler )( ctx )
    }
}


impl std::fmt::Debug for CommandEntry {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "CommandEntry" )
            .field( "name", &self.name )
            .field( "group", &self.group )
            .field( "description", &self.description )
            .finish_non_exhaustive()
    }
}


/// Result of resolving user input against the table.
#[derive( Debug )]
pub enum Lookup<'a> {
    Found( &'a CommandEntry ),
    NotFound,
}


/// Trims and lowercases a command name.
pub fn normalize( input: &str ) -> String {
    input.trim().to_lowercase()
}


/// Name-keyed command registry.
#[derive( Debug, Default )]
pub struct CommandTable {
    commands: BTreeMap<String, CommandEntry>,
}


impl CommandTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }


    /// Creates a table holding the built-in command set.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        crate::builtin::register_all( &mut table );
        table
    }


    /// Registers a command. A later registration of the same name replaces
    /// the earlier one.
    pub fn register(
        &mut self,
        name: &str,
        group: CommandGroup,
        description: &str,
        handler: impl Fn( &mut ConsoleContext<'_> ) -> String + 'static,
    ) {
        let name = normalize( name );
        let entry = CommandEntry {
            name: name.clone(),
            group,
            description: description.to_string(),
            handler: Box::new( handler ),
        };

        if self.commands.insert( name.clone(), entry ).is_some() {
            tracing::debug!( "Command '{}' re-registered", name );
        }
    }


    /// Resolves `input` after trimming and lowercasing it.
    pub fn lookup( &self, input: &str ) -> Lookup<'_> {
        match self.commands.get( &normalize( input ) ) {
            Some( entry ) => Lookup::Found( entry ),
            None => Lookup::NotFound,
        }
    }


    /// Command names in sorted order.
    pub fn names( &self ) -> impl Iterator<Item = &str> {
        self.commands.keys().map( String::as_str )
    }


    /// Registered commands in sorted name order.
    pub fn iter( &self ) -> impl Iterator<Item = &CommandEntry> {
        self.commands.values()
    }


    pub fn len( &self ) -> usize {
        self.commands.len()
    }


    pub fn is_empty( &self ) -> bool {
        self.commands.is_empty()
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn run( table: &CommandTable, name: &str ) -> Option<String> {
        let mut theme = ThemeStore::in_memory();
        match table.lookup( name ) {
            Lookup::Found( entry ) => {
                let mut ctx = ConsoleContext::new( table, &mut theme, None, Instant::now(), false );
                Some( entry.run( &mut ctx ) )
            }
            Lookup::NotFound => None,
        }
    }


    #[test]
    fn test_lookup_normalizes() {
        let mut table = CommandTable::new();
        table.register( "ping", CommandGroup::Fun, "Reply", |_| "pong".to_string() );

        assert_eq!( run( &table, "  PING " ).as_deref(), Some( "pong" ) );
        assert!( matches!( table.lookup( "pin" ), Lookup::NotFound ) );
    }


    #[test]
    fn test_last_registration_wins() {
        let mut table = CommandTable::new();
        table.register( "ping", CommandGroup::Fun, "Reply", |_| "pong".to_string() );
        table.register( "Ping", CommandGroup::Fun, "Reply louder", |_| "PONG".to_string() );

        assert_eq!( table.len(), 1 );
        assert_eq!( run( &table, "ping" ).as_deref(), Some( "PONG" ) );
    }


    #[test]
    fn test_context_records_effects() {
        let table = CommandTable::new();
        let mut theme = ThemeStore::in_memory();
        let mut ctx = ConsoleContext::new( &table, &mut theme, None, Instant::now(), false );

        ctx.navigate( Page::About );
        assert_eq!( ctx.toggle_theme(), Theme::Dark );
        assert!( ctx.toggle_size() );

        assert_eq!( ctx.into_effects(), ( Some( Page::About ), true ) );
        assert!( theme.get() );
    }


    #[test]
    fn test_page_ids_round_trip() {
        for page in Page::TABS.iter().chain( [ Page::Portfolio ].iter() ) {
            assert_eq!( Page::from_id( page.id() ), Some( *page ) );
        }
        assert_eq!( Page::from_id( "blog" ), None );
    }
}
