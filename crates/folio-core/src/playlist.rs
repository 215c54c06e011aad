//! Static playlist for the background music player
//!
//! The playlist is loaded once and never mutated. It is guaranteed to be
//! non-empty, so a track index taken modulo its length is always valid.

use std::fs;
use std::path::{ Path, PathBuf };

use serde::{ Deserialize, Serialize };
use thiserror::Error;


/// Errors that can occur while loading a playlist.
#[derive( Debug, Error )]
pub enum PlaylistError {
    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Invalid playlist format: {0}" )]
    InvalidFormat( #[from] serde_json::Error ),

    #[error( "Playlist contains no tracks" )]
    Empty,
}


/// Repeat mode for the transport.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize )]
#[serde( rename_all = "lowercase" )]
pub enum RepeatMode {
    /// Wrap around to the first track after the last one.
    #[default]
    Playlist,
    /// Restart the current track.
    Track,
    /// No repeat. Advancing still wraps, matching playlist order.
    #[serde( rename = "none" )]
    Off,
}


impl RepeatMode {
    /// Returns the next mode in the cycle playlist → track → none.
    pub fn cycle( self ) -> Self {
        match self {
            RepeatMode::Playlist => RepeatMode::Track,
            RepeatMode::Track => RepeatMode::Off,
            RepeatMode::Off => RepeatMode::Playlist,
        }
    }


    /// Short label used in status text.
    pub fn label( &self ) -> &'static str {
        match self {
            RepeatMode::Playlist => "playlist",
            RepeatMode::Track => "track",
            RepeatMode::Off => "none",
        }
    }
}


/// A single playlist entry.
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
pub struct Track {
    pub id: u32,
    pub name: String,
    pub artist: String,
    pub genre: String,
    /// Audio file backing this track.
    pub source: PathBuf,
    #[serde( default )]
    pub cover_art: Option<PathBuf>,
    /// Length shown in listings before the real duration is known.
    pub display_duration: String,
}


// id, name, artist, genre, file, cover, duration
const BUILTIN: [( u32, &str, &str, &str, &str, &str, &str ); 5] = [
    ( 1, "Coding in the Deep", "The Debug Brothers", "Lo-fi", "coding-in-the-deep.mp3", "deep.jpg", "3:12" ),
    ( 2, "Midnight Compile", "Null Pointer", "Synthwave", "midnight-compile.mp3", "compile.jpg", "4:05" ),
    ( 3, "Stack Overflow Blues", "Async Await", "Chillhop", "stack-overflow-blues.mp3", "blues.jpg", "2:48" ),
    ( 4, "Merge Conflict", "Rebase Ensemble", "Ambient", "merge-conflict.mp3", "merge.jpg", "3:37" ),
    ( 5, "Green Tests", "CI Pipeline", "Lo-fi", "green-tests.mp3", "green.jpg", "3:20" ),
];


/// Ordered, fixed, non-empty list of tracks.
#[derive( Debug, Clone, PartialEq )]
pub struct Playlist {
    tracks: Vec<Track>,
}


impl Playlist {
    /// Creates a playlist from the given tracks.
    ///
    /// Fails with [`PlaylistError::Empty`] when no tracks are given.
    pub fn new( tracks: Vec<Track> ) -> Result<Self, PlaylistError> {
        if tracks.is_empty() {
            return Err( PlaylistError::Empty );
        }
        Ok( Self { tracks } )
    }


    /// The bundled playlist, with sources resolved against [`Playlist::media_dir`].
    pub fn builtin() -> Self {
        let base = Self::media_dir().unwrap_or_default();
        let tracks = BUILTIN
            .iter()
            .map( |&( id, name, artist, genre, file, cover, duration )| Track {
                id,
                name: name.to_string(),
                artist: artist.to_string(),
                genre: genre.to_string(),
                source: base.join( file ),
                cover_art: Some( base.join( "covers" ).join( cover ) ),
                display_duration: duration.to_string(),
            })
            .collect();

        Self { tracks }
    }


    /// Loads a playlist from a JSON file containing an array of tracks.
    ///
    /// Relative `source` and `cover_art` paths are resolved against the
    /// directory holding the file.
    pub fn load( path: &Path ) -> Result<Self, PlaylistError> {
        let contents = fs::read_to_string( path )?;
        let mut tracks: Vec<Track> = serde_json::from_str( &contents )?;

        if let Some( dir ) = path.parent() {
            for track in &mut tracks {
                if track.source.is_relative() {
                    track.source = dir.join( &track.source );
                }
                if let Some( cover ) = track.cover_art.as_mut() {
                    if cover.is_relative() {
                        *cover = dir.join( &*cover );
                    }
                }
            }
        }

        tracing::info!( "Loaded {} tracks from {:?}", tracks.len(), path );
        Self::new( tracks )
    }


    /// Directory holding the bundled audio files.
    /// Uses Music/Folio where the platform has an audio directory,
    /// otherwise the local data directory.
    pub fn media_dir() -> Option<PathBuf> {
        dirs::audio_dir()
            .map( |d| d.join( "Folio" ) )
            .or_else( || dirs::data_local_dir().map( |d| d.join( "folio" ).join( "music" ) ) )
    }


    /// Gets the track at `index`.
    pub fn get( &self, index: usize ) -> Option<&Track> {
        self.tracks.get( index )
    }


    /// Gets all tracks in order.
    pub fn tracks( &self ) -> &[Track] {
        &self.tracks
    }


    /// Gets the number of tracks (always at least one).
    pub fn len( &self ) -> usize {
        self.tracks.len()
    }


    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty( &self ) -> bool {
        self.tracks.is_empty()
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::io::Write;


    #[test]
    fn test_builtin_has_five_tracks() {
        let playlist = Playlist::builtin();
        assert_eq!( playlist.len(), 5 );
        assert_eq!( playlist.get( 0 ).unwrap().name, "Coding in the Deep" );
    }


    #[test]
    fn test_new_rejects_empty() {
        assert!( matches!( Playlist::new( Vec::new() ), Err( PlaylistError::Empty ) ) );
    }


    #[test]
    fn test_repeat_cycle() {
        assert_eq!( RepeatMode::Playlist.cycle(), RepeatMode::Track );
        assert_eq!( RepeatMode::Track.cycle(), RepeatMode::Off );
        assert_eq!( RepeatMode::Off.cycle(), RepeatMode::Playlist );
    }


    #[test]
    fn test_load_resolves_relative_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "mix.json" );
        let mut file = fs::File::create( &path ).unwrap();
        write!(
            file,
            r#"[{{"id":7,"name":"Intro","artist":"Me","genre":"Jazz","source":"intro.mp3","display_duration":"1:00"}}]"#
        ).unwrap();

        let playlist = Playlist::load( &path ).unwrap();
        assert_eq!( playlist.len(), 1 );
        assert_eq!( playlist.get( 0 ).unwrap().source, dir.path().join( "intro.mp3" ) );
        assert_eq!( playlist.get( 0 ).unwrap().cover_art, None );
    }


    #[test]
    fn test_load_empty_array_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "empty.json" );
        fs::write( &path, "[]" ).unwrap();

        assert!( matches!( Playlist::load( &path ), Err( PlaylistError::Empty ) ) );
    }


    #[test]
    fn test_load_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "bad.json" );
        fs::write( &path, "not json" ).unwrap();

        assert!( matches!( Playlist::load( &path ), Err( PlaylistError::InvalidFormat( _ ) ) ) );
    }
}
