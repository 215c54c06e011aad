//! Folio Core - console and music player for the folio terminal portfolio
//!
//! This crate provides everything behind the UI: the command console with
//! its scrollback and autocomplete, the audio transport state machine and
//! the engine that plays it, the playlist, and persisted theme preference.

pub mod autocomplete;
pub mod builtin;
pub mod command;
pub mod console;
pub mod decoder;
pub mod engine;
pub mod input;
pub mod output;
pub mod playlist;
pub mod storage;
pub mod theme;
pub mod transport;

pub use command::{ CommandGroup, CommandTable, ConsoleContext, Lookup, Page };
pub use console::{ Console, Host };
pub use engine::AudioEngine;
pub use input::InputBuffer;
pub use playlist::{ Playlist, PlaylistError, RepeatMode, Track };
pub use storage::KeyValueStore;
pub use theme::{ Theme, ThemeStore };
pub use transport::{ format_time, MediaError, MediaEvent, MediaResource, StatusSnapshot, Transport };
