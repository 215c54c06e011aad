//! Built-in console commands.

use rand::Rng;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::command::{ CommandGroup, CommandTable, ConsoleContext, Page };
use crate::console::CLEAR_COMMAND;
use crate::transport::format_time;


/// Inner width of the boxes drawn around multi-line output.
const BOX_WIDTH: usize = 57;


const JOKES: [&str; 5] = [
    "Why do programmers prefer dark mode? Because light attracts bugs! 🐛",
    "How many programmers does it take to change a light bulb? None, that's a hardware problem! 💡",
    "Why don't programmers like nature? It has too many bugs! 🌿",
    "A SQL query goes into a bar, walks up to two tables and asks: 'Can I join you?' 🍺",
    "Why did the programmer quit his job? He didn't get arrays! 📊",
];


const WHOAMI: &str = "User: visitor@portfolio.dev
Role: Potential collaborator, employer, or fellow developer
Status: Exploring an awesome portfolio 😎
Access Level: Guest (but welcome!)
Location: Currently browsing from the terminal";


const MATRIX: &str = "Wake up, Neo... 🕶️
The Matrix has you...
Follow the white rabbit 🐰
┌─────────────────────────────────────┐
│ 01001000 01100101 01101100 01101100 │
│ 01101111 00100000 01010111 01101111 │
│ 01110010 01101100 01100100 00100001 │
└─────────────────────────────────────┘
Knock, knock, Neo.";


const COFFEE: &str = "☕ Brewing fresh coffee...
████████████████ 100%
Coffee ready! Perfect for coding sessions.";


const KONAMI: &str = "🎮 KONAMI CODE ACTIVATED!
↑ ↑ ↓ ↓ ← → ← → B A
You've unlocked: Extra motivation for coding! 💪";


const SUDO: &str = "sudo: command not found
Nice try! This isn't your server 😏
(But I appreciate the Linux knowledge!)";


const SKILLS: [&str; 5] = [
    "Languages: Rust, TypeScript, Python, Java",
    "Frontend: React, Vue.js, HTML5, CSS3",
    "Backend: Node.js, Axum, Express.js",
    "Database: PostgreSQL, MongoDB, SQLite",
    "Tools: Git, Docker, AWS, CI/CD",
];


const EXPERIENCE: [&str; 11] = [
    "Senior Developer - Tech Corp (2022-Present)",
    "   • Led development of client applications",
    "   • Mentored junior developers",
    "",
    "Full Stack Developer - StartupXYZ (2020-2022)",
    "   • Built scalable web applications",
    "   • Implemented CI/CD pipelines",
    "",
    "Junior Developer - DevAgency (2018-2020)",
    "   • Developed responsive websites",
    "   • Learned modern web technologies",
];


/// Draws `lines` inside a rounded box, padding each line to the box width.
pub fn boxed<'a>( lines: impl IntoIterator<Item = &'a str> ) -> String {
    let mut out = vec![ format!( "╭{}╮", "─".repeat( BOX_WIDTH ) ) ];
    for line in lines {
        let pad = BOX_WIDTH.saturating_sub( line.chars().count() + 2 );
        out.push( format!( "│  {}{}│", line, " ".repeat( pad ) ) );
    }
    out.push( format!( "╰{}╯", "─".repeat( BOX_WIDTH ) ) );
    out.join( "\n" )
}


/// Registers every built-in command on `table`.
pub fn register_all( table: &mut CommandTable ) {
    register_navigation( table );

    table.register( "help", CommandGroup::System, "Show this help", help );
    table.register( "theme", CommandGroup::System, "Toggle light/dark mode", |ctx| {
        let theme = ctx.toggle_theme();
        format!( "🎨 Switched to {} mode", theme.name() )
    });
    table.register( "changesize", CommandGroup::System, "Toggle fullscreen", toggle_size );
    table.register( "maximize", CommandGroup::System, "Toggle fullscreen", toggle_size );
    table.register( "minimize", CommandGroup::System, "Restore terminal size", |ctx| {
        ctx.set_maximized( false );
        "🗗 Terminal restored".to_string()
    });

    table.register( "whoami", CommandGroup::Information, "Display user info", |_| WHOAMI.to_string() );
    table.register( "showskills", CommandGroup::Information, "Show technical skills", |_| {
        format!( "Technical Skills:\n{}", boxed( SKILLS ) )
    });
    table.register( "experience", CommandGroup::Information, "Show work experience", |_| {
        format!( "Work Experience:\n{}", boxed( EXPERIENCE ) )
    });
    table.register( "date", CommandGroup::Information, "Show current date", date );
    table.register( "music", CommandGroup::Information, "Show the music player status", music );

    table.register( "matrix", CommandGroup::Fun, "Enter the matrix... 🕶️", |_| MATRIX.to_string() );
    table.register( "joke", CommandGroup::Fun, "Tell a programming joke", |_| {
        let index = rand::thread_rng().gen_range( 0..JOKES.len() );
        JOKES[ index ].to_string()
    });

    table.register( "coffee", CommandGroup::Hidden, "Brew coffee", |_| COFFEE.to_string() );
    table.register( "konami", CommandGroup::Hidden, "Cheat code", |_| KONAMI.to_string() );
    table.register( "sudo", CommandGroup::Hidden, "Escalate privileges", |_| SUDO.to_string() );
}


fn register_navigation( table: &mut CommandTable ) {
    let pages = [
        ( "home", Page::Home, "Go to home page" ),
        ( "about", Page::About, "View about section" ),
        ( "skills", Page::Skills, "View skills section" ),
        ( "projects", Page::Projects, "View my projects" ),
        ( "contact", Page::Contact, "View contact information" ),
    ];

    for ( name, page, description ) in pages {
        table.register( name, CommandGroup::Navigation, description, move |ctx| {
            ctx.navigate( page );
            format!( "🚀 Navigating to {}...", page.id() )
        });
    }

    for ( name, description ) in [ ( "portfolio", "Switch to portfolio view" ), ( "close", "Close terminal" ) ] {
        table.register( name, CommandGroup::Navigation, description, |ctx| {
            ctx.navigate( Page::Portfolio );
            "🚀 Switching to portfolio view...".to_string()
        });
    }
}


fn help( ctx: &mut ConsoleContext<'_> ) -> String {
    let mut lines = Vec::new();
    let groups = [ CommandGroup::Navigation, CommandGroup::System, CommandGroup::Information, CommandGroup::Fun ];

    for ( i, group ) in groups.iter().enumerate() {
        if i > 0 {
            lines.push( String::new() );
        }
        lines.push( format!( "{}:", group.title() ) );
        for entry in ctx.table().iter().filter( |s| s.group == *group ) {
            lines.push( format!( "• {:<11} - {}", entry.name, entry.description ) );
        }
        if *group == CommandGroup::System {
            // handled by the console, not the table
            lines.push( format!( "• {:<11} - {}", CLEAR_COMMAND, "Clear terminal history" ) );
        }
    }

    format!( "Available commands:\n{}", boxed( lines.iter().map( String::as_str ) ) )
}


fn toggle_size( ctx: &mut ConsoleContext<'_> ) -> String {
    if ctx.toggle_size() {
        "🖥️ Terminal maximized".to_string()
    } else {
        "🗗 Terminal restored".to_string()
    }
}


fn date( ctx: &mut ConsoleContext<'_> ) -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else( |_| OffsetDateTime::now_utc() );
    let stamp = now
        .format( format_description!( "[year]-[month]-[day] [hour]:[minute]:[second]" ) )
        .unwrap_or_else( |_| now.to_string() );

    let offset = now.offset();
    let ( hours, minutes, _ ) = offset.as_hms();
    let sign = if offset.is_negative() { '-' } else { '+' };

    let uptime = ctx.uptime().as_secs();

    format!(
        "Current date: {}\nTimezone: UTC{}{:02}:{:02}\nUptime: {}h {}m",
        stamp,
        sign,
        hours.unsigned_abs(),
        minutes.unsigned_abs(),
        uptime / 3600,
        ( uptime % 3600 ) / 60,
    )
}


fn music( ctx: &mut ConsoleContext<'_> ) -> String {
    let Some( status ) = ctx.status() else {
        return "🎵 Music player is not available".to_string();
    };

    let track = &status.current_track;
    let state = if status.is_playing { "♪ Now Playing" } else { "⏸ Paused" };

    format!(
        "🎵 \"{}\" by {}\nGenre: {}\nStatus: {}\nTime: {} / {}\nVolume: {}%\nShuffle: {} | Repeat: {}",
        track.name,
        track.artist,
        track.genre,
        state,
        format_time( Some( status.current_time ) ),
        format_time( status.duration ),
        ( status.volume * 100.0 ).round() as i32,
        if status.is_shuffled { "on" } else { "off" },
        status.repeat_mode.label(),
    )
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::command::Lookup;
    use crate::playlist::{ Playlist, RepeatMode };
    use crate::theme::ThemeStore;
    use crate::transport::StatusSnapshot;


    fn run_with( name: &str, status: Option<&StatusSnapshot> ) -> String {
        let table = CommandTable::with_builtins();
        let mut theme = ThemeStore::in_memory();
        let Lookup::Found( entry ) = table.lookup( name ) else {
            panic!( "missing builtin {}", name );
        };
        let mut ctx = ConsoleContext::new( &table, &mut theme, status, Instant::now(), false );
        entry.run( &mut ctx )
    }


    #[test]
    fn test_boxed_pads_lines() {
        let out = boxed( [ "abc" ] );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!( lines.len(), 3 );
        assert_eq!( lines[ 1 ].chars().count(), BOX_WIDTH + 2 );
    }


    #[test]
    fn test_help_lists_visible_commands_only() {
        let out = run_with( "help", None );
        assert!( out.contains( "• projects" ) );
        assert!( out.contains( "• theme" ) );
        assert!( out.contains( "• clear" ) );
        assert!( !out.contains( "konami" ) );
    }


    #[test]
    fn test_date_has_three_lines() {
        let out = run_with( "date", None );
        assert_eq!( out.lines().count(), 3 );
        assert!( out.starts_with( "Current date: " ) );
    }


    #[test]
    fn test_joke_is_known() {
        let out = run_with( "joke", None );
        assert!( JOKES.contains( &out.as_str() ) );
    }


    #[test]
    fn test_music_without_player() {
        assert_eq!( run_with( "music", None ), "🎵 Music player is not available" );
    }


    #[test]
    fn test_music_formats_snapshot() {
        let status = StatusSnapshot {
            is_playing: true,
            current_track: Playlist::builtin().tracks()[ 1 ].clone(),
            current_track_index: 1,
            current_time: 75.0,
            duration: Some( 245.0 ),
            volume: 0.3,
            is_shuffled: false,
            repeat_mode: RepeatMode::Track,
        };

        let out = run_with( "music", Some( &status ) );
        assert!( out.contains( "\"Midnight Compile\" by Null Pointer" ) );
        assert!( out.contains( "Time: 1:15 / 4:05" ) );
        assert!( out.contains( "Volume: 30%" ) );
        assert!( out.contains( "Repeat: track" ) );
        assert!( out.contains( "♪ Now Playing" ) );
    }
}
