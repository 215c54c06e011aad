//! Dark/light theme preference
//!
//! [`ThemeStore`] is created once at startup and handed by reference to
//! whatever needs it. Every change is written through to storage.

use crate::storage::KeyValueStore;


/// Storage key holding the dark-mode flag.
pub const DARK_MODE_KEY: &str = "darkMode";


/// Active color theme.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Theme {
    Light,
    Dark,
}


impl Theme {
    pub fn name( &self ) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}


type Listener = Box<dyn FnMut( bool )>;


/// Persisted dark-mode flag with change notification.
pub struct ThemeStore {
    storage: KeyValueStore,
    dark: bool,
    listeners: Vec<Listener>,
}


impl ThemeStore {
    /// Loads the preference from `storage`, defaulting to light.
    pub fn open( storage: KeyValueStore ) -> Self {
        let dark = storage.get_bool( DARK_MODE_KEY ).unwrap_or( false );
        tracing::debug!( "Theme loaded: dark={}", dark );
        Self {
            storage,
            dark,
            listeners: Vec::new(),
        }
    }


    /// Store with no backing file, starting in light mode.
    pub fn in_memory() -> Self {
        Self::open( KeyValueStore::in_memory() )
    }


    /// Returns true when dark mode is on.
    pub fn get( &self ) -> bool {
        self.dark
    }


    pub fn theme( &self ) -> Theme {
        if self.dark { Theme::Dark } else { Theme::Light }
    }


    /// Sets the flag, persists it, and notifies listeners if it changed.
    pub fn set( &mut self, dark: bool ) {
        let changed = dark != self.dark;
        self.dark = dark;

        if let Err( e ) = self.storage.set_bool( DARK_MODE_KEY, dark ) {
            tracing::warn!( "Could not save theme preference: {}", e );
        }

        if changed {
            tracing::info!( "Theme changed to {}", self.theme().name() );
            for listener in &mut self.listeners {
                listener( dark );
            }
        }
    }


    /// Flips the flag and returns the new value.
    pub fn toggle( &mut self ) -> bool {
        self.set( !self.dark );
        self.dark
    }


    /// Registers a listener called with the new value on every change.
    pub fn subscribe( &mut self, listener: impl FnMut( bool ) + 'static ) {
        self.listeners.push( Box::new( listener ) );
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;


    #[test]
    fn test_defaults_to_light() {
        let store = ThemeStore::in_memory();
        assert!( !store.get() );
        assert_eq!( store.theme(), Theme::Light );
    }


    #[test]
    fn test_toggle_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "storage.json" );

        let mut store = ThemeStore::open( KeyValueStore::open( &path ) );
        assert!( store.toggle() );

        let reopened = ThemeStore::open( KeyValueStore::open( &path ) );
        assert!( reopened.get() );
    }


    #[test]
    fn test_malformed_storage_falls_back_to_light() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "storage.json" );
        fs::write( &path, "{ darkMode: tru" ).unwrap();

        let store = ThemeStore::open( KeyValueStore::open( &path ) );
        assert!( !store.get() );
    }


    #[test]
    fn test_listeners_see_changes_only() {
        let seen = Rc::new( RefCell::new( Vec::new() ) );
        let sink = Rc::clone( &seen );

        let mut store = ThemeStore::in_memory();
        store.subscribe( move |dark| sink.borrow_mut().push( dark ) );

        store.set( false );
        store.toggle();
        store.toggle();

        assert_eq!( *seen.borrow(), vec![ true, false ] );
    }
}
