//! Console sessions driven the way the terminal view drives them.

use std::time::{ Duration, Instant };

use folio_core::console::{ NAVIGATION_DELAY, NOT_FOUND_HINT, WELCOME_BANNER };
use folio_core::{ CommandTable, Console, ConsoleContext, Host, Lookup, Page, Playlist, ThemeStore, Transport };
use folio_core::transport::{ MediaError, MediaEvent, MediaResource };


struct Silent;


impl MediaResource for Silent {
    fn load( &mut self, _: &std::path::Path ) -> Result<(), MediaError> { Ok(()) }
    fn play( &mut self ) -> Result<(), MediaError> { Ok(()) }
    fn pause( &mut self ) {}
    fn seek( &mut self, _: f64 ) -> Result<(), MediaError> { Ok(()) }
    fn set_volume( &mut self, _: f32 ) {}
    fn poll_events( &mut self ) -> Vec<MediaEvent> { Vec::new() }
}


fn run( console: &mut Console, theme: &mut ThemeStore, line: &str ) -> Vec<String> {
    let before = console.scrollback().len();
    console.submit( line, Host::new( theme, None ) );
    console.scrollback()[ before.. ].to_vec()
}


/// Runs a handler outside any console, against fresh state.
fn handler_output( table: &CommandTable, name: &str ) -> String {
    let mut theme = ThemeStore::in_memory();
    let Lookup::Found( entry ) = table.lookup( name ) else {
        panic!( "{} is not registered", name );
    };
    let mut ctx = ConsoleContext::new( table, &mut theme, None, Instant::now(), false );
    entry.run( &mut ctx )
}


#[test]
fn every_registered_command_echoes_and_pads() {
    let table = CommandTable::with_builtins();
    let names: Vec<String> = table.names().map( str::to_string ).collect();
    assert!( !names.is_empty() );

    for name in names {
        let mut console = Console::with_builtins();
        let mut theme = ThemeStore::in_memory();
        let added = run( &mut console, &mut theme, &name );
        let output = handler_output( &table, &name );
        let n = output.split( '\n' ).count();

        assert_eq!( added.len(), 1 + n + 1, "{}", name );
        assert_eq!( added[ 0 ], format!( "$ {}", name ), "{}", name );
        assert_eq!( added[ n + 1 ], "", "{}", name );

        // date carries the clock and joke is random
        if name != "date" && name != "joke" {
            let expected: Vec<&str> = output.split( '\n' ).collect();
            assert_eq!( added[ 1..=n ], expected[ .. ], "{}", name );
        }
    }
}


#[test]
fn lookup_ignores_case_and_padding() {
    let mut console = Console::with_builtins();
    let mut theme = ThemeStore::in_memory();

    let upper = run( &mut console, &mut theme, "  HELP " );
    let lower = run( &mut console, &mut theme, "help" );
    assert_eq!( upper[ 0 ], "$   HELP " );
    assert_eq!( upper[ 1.. ], lower[ 1.. ] );
}


#[test]
fn unknown_command_gets_hint() {
    let mut console = Console::with_builtins();
    let mut theme = ThemeStore::in_memory();

    let added = run( &mut console, &mut theme, "rm -rf /" );
    assert_eq!( added, vec![
        "$ rm -rf /".to_string(),
        "Command not found: rm -rf /".to_string(),
        NOT_FOUND_HINT.to_string(),
        String::new(),
    ]);
}


#[test]
fn clear_is_idempotent() {
    let mut console = Console::with_builtins();
    let mut theme = ThemeStore::in_memory();
    assert_eq!( console.scrollback().len(), WELCOME_BANNER.len() );

    run( &mut console, &mut theme, "joke" );
    console.submit( "clear", Host::new( &mut theme, None ) );
    let once = console.scrollback().to_vec();
    console.submit( "CLEAR", Host::new( &mut theme, None ) );

    assert_eq!( once, vec![ String::new() ] );
    assert_eq!( console.scrollback(), once.as_slice() );
}


#[test]
fn theme_command_flips_shared_store() {
    let mut console = Console::with_builtins();
    let mut theme = ThemeStore::in_memory();

    let added = run( &mut console, &mut theme, "theme" );
    assert!( theme.get() );
    assert_eq!( added[ 1 ], "🎨 Switched to dark mode" );

    run( &mut console, &mut theme, "theme" );
    assert!( !theme.get() );
}


#[test]
fn navigation_lands_after_delay() {
    let mut console = Console::with_builtins();
    let mut theme = ThemeStore::in_memory();
    let start = Instant::now();

    run( &mut console, &mut theme, "projects" );
    run( &mut console, &mut theme, "portfolio" );

    let mut pages = Vec::new();
    assert_eq!( console.tick( start, &mut |p| pages.push( p ) ), 0 );

    let later = start + NAVIGATION_DELAY + Duration::from_millis( 50 );
    assert_eq!( console.tick( later, &mut |p| pages.push( p ) ), 2 );
    assert_eq!( pages, vec![ Page::Projects, Page::Portfolio ] );
    assert!( !console.has_pending_navigation() );
}


#[test]
fn music_reports_live_snapshot() {
    let mut console = Console::with_builtins();
    let mut theme = ThemeStore::in_memory();
    let mut transport = Transport::new( Playlist::builtin(), Silent );
    transport.next();
    let snapshot = transport.snapshot();

    let before = console.scrollback().len();
    console.submit( "music", Host::new( &mut theme, Some( &snapshot ) ) );
    let text = console.scrollback()[ before.. ].join( "\n" );
    assert!( text.contains( "Midnight Compile" ), "{}", text );

    let without = run( &mut console, &mut theme, "music" );
    assert!( without.iter().any( |l| l.contains( "not available" ) ) );
}


#[test]
fn typing_and_confirming_a_candidate() {
    let mut console = Console::with_builtins();
    let mut theme = ThemeStore::in_memory();

    for c in "sk".chars() {
        console.insert_char( c );
    }
    assert_eq!( console.autocomplete().candidates(), [ "skills".to_string() ] );

    console.confirm( Host::new( &mut theme, None ) );
    assert!( console.input().is_empty() );
    assert!( console.scrollback().iter().any( |l| l == "$ skills" ) );
}
