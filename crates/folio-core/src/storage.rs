//! Durable key/value storage
//!
//! A small JSON object persisted to a single file. Unknown keys written by
//! other versions are preserved on save.

use std::fs;
use std::path::{ Path, PathBuf };

use serde_json::{ Map, Value };
use thiserror::Error;


/// Errors that can occur while writing storage.
#[derive( Debug, Error )]
pub enum StorageError {
    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Serialization failed: {0}" )]
    Serialize( #[from] serde_json::Error ),
}


/// JSON-file backed key/value store.
#[derive( Debug, Default )]
pub struct KeyValueStore {
    path: Option<PathBuf>,
    entries: Map<String, Value>,
}


impl KeyValueStore {
    /// Returns the default storage file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "folio" ).join( "storage.json" ) )
    }


    /// Opens the store at `path`.
    ///
    /// A missing file yields an empty store. An unreadable or malformed file
    /// is logged and also treated as empty.
    pub fn open( path: impl Into<PathBuf> ) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string( &path ) {
            Ok( contents ) => match serde_json::from_str::<Map<String, Value>>( &contents ) {
                Ok( map ) => map,
                Err( e ) => {
                    tracing::warn!( "Ignoring malformed storage {:?}: {}", path, e );
                    Map::new()
                }
            },
            Err( e ) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err( e ) => {
                tracing::warn!( "Failed to read storage {:?}: {}", path, e );
                Map::new()
            }
        };

        Self { path: Some( path ), entries }
    }


    /// Creates a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }


    /// Location of the backing file, if any.
    pub fn path( &self ) -> Option<&Path> {
        self.path.as_deref()
    }


    /// Reads a boolean entry. Entries of any other type read as absent.
    pub fn get_bool( &self, key: &str ) -> Option<bool> {
        self.entries.get( key ).and_then( Value::as_bool )
    }


    /// Stores a boolean entry and flushes the file.
    pub fn set_bool( &mut self, key: &str, value: bool ) -> Result<(), StorageError> {
        self.entries.insert( key.to_string(), Value::Bool( value ) );
        self.save()
    }


    /// Writes all entries to the backing file, creating parent directories.
    pub fn save( &self ) -> Result<(), StorageError> {
        let Some( path ) = self.path.as_ref() else {
            return Ok(());
        };

        if let Some( parent ) = path.parent() {
            fs::create_dir_all( parent )?;
        }
        let json = serde_json::to_string_pretty( &self.entries )?;
        fs::write( path, json )?;
        Ok(())
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyValueStore::open( dir.path().join( "nope.json" ) );
        assert_eq!( store.get_bool( "darkMode" ), None );
    }


    #[test]
    fn test_round_trip_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "nested" ).join( "storage.json" );
        fs::create_dir_all( path.parent().unwrap() ).unwrap();
        fs::write( &path, r#"{"other": 3}"# ).unwrap();

        let mut store = KeyValueStore::open( &path );
        store.set_bool( "darkMode", true ).unwrap();

        let reopened = KeyValueStore::open( &path );
        assert_eq!( reopened.get_bool( "darkMode" ), Some( true ) );
        assert!( fs::read_to_string( &path ).unwrap().contains( "other" ) );
    }


    #[test]
    fn test_wrong_type_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "storage.json" );
        fs::write( &path, r#"{"darkMode": "yes"}"# ).unwrap();

        assert_eq!( KeyValueStore::open( &path ).get_bool( "darkMode" ), None );
    }


    #[test]
    fn test_in_memory_save_is_noop() {
        let mut store = KeyValueStore::in_memory();
        store.set_bool( "darkMode", true ).unwrap();
        assert_eq!( store.get_bool( "darkMode" ), Some( true ) );
        assert!( store.path().is_none() );
    }
}
