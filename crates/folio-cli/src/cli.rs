//! Command-line argument parsing for Folio.

use std::path::PathBuf;

use clap::Parser;

use crate::view::StartView;


/// Folio - a terminal portfolio with a command console and music player.
#[derive( Parser, Debug )]
#[command( name = "folio" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// View to open on startup (overrides settings).
    #[arg( long, value_enum )]
    pub view: Option<StartView>,

    /// JSON playlist to use instead of the bundled one.
    #[arg( short, long )]
    pub playlist: Option<PathBuf>,

    /// Write logs here instead of the data directory.
    #[arg( long )]
    pub log_file: Option<PathBuf>,

    /// Log at debug level.
    #[arg( short, long )]
    pub verbose: bool,

    /// Show the player panel on startup.
    #[arg( long )]
    pub open_player: bool,
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parses_flags() {
        let args = Args::parse_from([ "folio", "--view", "portfolio", "--open-player", "-p", "mix.json" ]);
        assert_eq!( args.view, Some( StartView::Portfolio ) );
        assert!( args.open_player );
        assert_eq!( args.playlist, Some( PathBuf::from( "mix.json" ) ) );
        assert!( !args.verbose );
    }


    #[test]
    fn test_defaults() {
        let args = Args::parse_from([ "folio" ]);
        assert!( args.view.is_none() );
        assert!( args.log_file.is_none() );
    }
}
