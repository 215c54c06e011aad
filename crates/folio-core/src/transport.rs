//! Audio transport state machine
//!
//! The transport owns exactly one [`MediaResource`] and walks it through a
//! fixed [`Playlist`]. It is driven by UI actions (play/pause, next, seek...)
//! and by events polled from the media resource on every [`Transport::tick`].
//! Observers receive a [`StatusSnapshot`] whenever an observable field changes.

use std::path::Path;
use std::time::{ Duration, Instant };

use rand::rngs::StdRng;
use rand::{ Rng, SeedableRng };
use thiserror::Error;

use crate::playlist::{ Playlist, RepeatMode, Track };


/// Volume the transport falls back to on most transitions.
pub const BASELINE_VOLUME: f32 = 0.3;

/// Past this many seconds, `previous` restarts the current track.
pub const RESTART_THRESHOLD: f64 = 3.0;

/// Time given to a freshly loaded track before playback resumes.
pub const RESUME_DELAY: Duration = Duration::from_millis( 100 );


/// Errors reported by a media resource.
#[derive( Debug, Error )]
pub enum MediaError {
    #[error( "Load failed: {0}" )]
    Load( String ),

    #[error( "Play request rejected: {0}" )]
    Rejected( String ),

    #[error( "Seek failed: {0}" )]
    Seek( String ),
}


/// Asynchronous notifications from a media resource.
#[derive( Debug, Clone, PartialEq )]
pub enum MediaEvent {
    /// Duration of the loaded source became known.
    MetadataLoaded { duration: f64 },
    /// Playback position moved.
    TimeUpdate { position: f64 },
    /// The source played to completion.
    Ended,
    /// Playback failed after it started.
    Error { message: String },
}


/// A single playable media source.
///
/// Implementations never block: loading and playing are requests whose
/// progress is reported back through [`MediaResource::poll_events`].
pub trait MediaResource {
    /// Replaces the current source, stopping any playback.
    fn load( &mut self, source: &Path ) -> Result<(), MediaError>;

    /// Requests playback from the current position.
    fn play( &mut self ) -> Result<(), MediaError>;

    fn pause( &mut self );

    /// Jumps to `position` seconds.
    fn seek( &mut self, position: f64 ) -> Result<(), MediaError>;

    /// Sets output volume in `[0, 1]`.
    fn set_volume( &mut self, volume: f32 );

    /// Drains events raised since the last poll.
    fn poll_events( &mut self ) -> Vec<MediaEvent>;
}


/// Playback state of the transport.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum TransportState {
    #[default]
    Paused,
    Playing,
}


/// Read-only projection of the transport published to observers.
#[derive( Debug, Clone, PartialEq )]
pub struct StatusSnapshot {
    /// False while the player panel is closed, whatever the engine is doing.
    pub is_playing: bool,
    pub current_track: Track,
    pub current_track_index: usize,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub volume: f32,
    pub is_shuffled: bool,
    pub repeat_mode: RepeatMode,
}


impl StatusSnapshot {
    /// Fraction of the track played, 0 when the duration is unknown.
    pub fn progress( &self ) -> f64 {
        match self.duration {
            Some( d ) if d > 0.0 => ( self.current_time / d ).clamp( 0.0, 1.0 ),
            _ => 0.0,
        }
    }
}


/// Formats seconds as `M:SS`. Unknown or invalid values render as `0:00`.
pub fn format_time( seconds: Option<f64> ) -> String {
    match seconds {
        Some( s ) if s.is_finite() && s >= 0.0 => {
            let total = s.floor() as u64;
            format!( "{}:{:02}", total / 60, total % 60 )
        }
        _ => "0:00".to_string(),
    }
}


type Subscriber = Box<dyn FnMut( &StatusSnapshot )>;


/// Playlist transport over a single media resource.
pub struct Transport<M: MediaResource> {
    playlist: Playlist,
    media: M,
    index: usize,
    state: TransportState,
    volume: f32,
    current_time: f64,
    duration: Option<f64>,
    shuffled: bool,
    repeat: RepeatMode,
    /// Whether the player panel is showing.
    open: bool,
    resume_at: Option<Instant>,
    rng: StdRng,
    subscribers: Vec<Subscriber>,
    last_published: Option<StatusSnapshot>,
}


impl<M: MediaResource> Transport<M> {
    /// Creates a paused transport positioned on the first track.
    pub fn new( playlist: Playlist, media: M ) -> Self {
        Self::with_rng( playlist, media, StdRng::from_entropy() )
    }


    /// Creates a transport drawing shuffle picks from `rng`.
    pub fn with_rng( playlist: Playlist, media: M, rng: StdRng ) -> Self {
        let mut transport = Self {
            playlist,
            media,
            index: 0,
            state: TransportState::Paused,
            volume: BASELINE_VOLUME,
            current_time: 0.0,
            duration: None,
            shuffled: false,
            repeat: RepeatMode::default(),
            open: false,
            resume_at: None,
            rng,
            subscribers: Vec::new(),
            last_published: None,
        };
        transport.media.set_volume( BASELINE_VOLUME );
        transport.load_current();
        transport
    }


    /// Plays when paused, pauses when playing.
    ///
    /// Starting playback first forces the baseline volume. A rejected play
    /// request is logged and leaves the transport paused.
    pub fn toggle_play_pause( &mut self ) {
        match self.state {
            TransportState::Playing => {
                self.media.pause();
                self.state = TransportState::Paused;
                tracing::info!( "Paused" );
            }
            TransportState::Paused => {
                self.apply_volume( BASELINE_VOLUME );
                self.state = TransportState::Playing;
                self.request_play();
                if self.state == TransportState::Playing {
                    tracing::info!( "Playing: {}", self.current_track().name );
                }
            }
        }
        self.publish();
    }


    /// Advances according to the repeat and shuffle modes.
    pub fn next( &mut self ) {
        if self.repeat == RepeatMode::Track {
            self.restart();
        } else {
            let index = if self.shuffled {
                self.random_index()
            } else {
                ( self.index + 1 ) % self.playlist.len()
            };
            self.change_track( index );
        }
        self.publish();
    }


    /// Restarts the track when past [`RESTART_THRESHOLD`], otherwise steps back.
    pub fn previous( &mut self ) {
        if self.current_time > RESTART_THRESHOLD {
            self.restart();
        } else {
            let len = self.playlist.len();
            let index = if self.shuffled {
                self.random_index()
            } else {
                ( self.index + len - 1 ) % len
            };
            self.change_track( index );
        }
        self.publish();
    }


    /// Jumps to `fraction` of the track. Ignored until the duration is known.
    pub fn seek( &mut self, fraction: f64 ) {
        let Some( duration ) = self.duration.filter( |d| *d > 0.0 ) else {
            return;
        };
        if fraction.is_nan() {
            return;
        }

        let position = fraction.clamp( 0.0, 1.0 ) * duration;
        self.current_time = position;
        if let Err( e ) = self.media.seek( position ) {
            tracing::warn!( "Seek to {:.1}s failed: {}", position, e );
        }
        self.publish();
    }


    /// Sets the volume, clamped to `[0, 1]`. NaN is ignored.
    pub fn set_volume( &mut self, level: f32 ) {
        if level.is_nan() {
            return;
        }
        self.apply_volume( level.clamp( 0.0, 1.0 ) );
        self.publish();
    }


    pub fn toggle_shuffle( &mut self ) {
        self.shuffled = !self.shuffled;
        self.apply_volume( BASELINE_VOLUME );
        tracing::info!( "Shuffle {}", if self.shuffled { "on" } else { "off" } );
        self.publish();
    }


    /// Cycles playlist → track → none.
    pub fn cycle_repeat_mode( &mut self ) {
        self.repeat = self.repeat.cycle();
        self.apply_volume( BASELINE_VOLUME );
        tracing::info!( "Repeat mode: {}", self.repeat.label() );
        self.publish();
    }


    /// Shows or hides the player panel. Does not touch the engine.
    pub fn set_open( &mut self, open: bool ) {
        self.open = open;
        self.publish();
    }


    pub fn toggle_open( &mut self ) {
        self.set_open( !self.open );
    }


    /// Applies one media event.
    pub fn handle_event( &mut self, event: MediaEvent ) {
        match event {
            MediaEvent::MetadataLoaded { duration } => {
                self.duration = Some( duration ).filter( |d| d.is_finite() && *d >= 0.0 );
                if let Some( d ) = self.duration {
                    self.current_time = self.current_time.min( d );
                }
            }
            MediaEvent::TimeUpdate { position } => {
                let position = if position.is_finite() { position.max( 0.0 ) } else { 0.0 };
                self.current_time = match self.duration {
                    Some( d ) => position.min( d ),
                    None => position,
                };
            }
            MediaEvent::Ended => {
                tracing::debug!( "Track ended: {}", self.current_track().name );
                self.next();
            }
            MediaEvent::Error { message } => {
                tracing::error!( "Playback error: {}", message );
                self.state = TransportState::Paused;
                self.resume_at = None;
            }
        }
        self.publish();
    }


    /// Drains media events and fires a due delayed resume.
    pub fn tick( &mut self, now: Instant ) {
        for event in self.media.poll_events() {
            self.handle_event( event );
        }

        if let Some( at ) = self.resume_at {
            if now >= at {
                self.resume_at = None;
                // Paused during the delay window: stay paused.
                if self.state == TransportState::Playing {
                    self.request_play();
                }
            }
        }
        self.publish();
    }


    /// Registers an observer. It immediately receives the current snapshot.
    pub fn subscribe( &mut self, mut subscriber: impl FnMut( &StatusSnapshot ) + 'static ) {
        subscriber( &self.snapshot() );
        self.subscribers.push( Box::new( subscriber ) );
    }


    pub fn snapshot( &self ) -> StatusSnapshot {
        StatusSnapshot {
            is_playing: self.open && self.state == TransportState::Playing,
            current_track: self.current_track().clone(),
            current_track_index: self.index,
            current_time: self.current_time,
            duration: self.duration,
            volume: self.volume,
            is_shuffled: self.shuffled,
            repeat_mode: self.repeat,
        }
    }


    pub fn state( &self ) -> TransportState {
        self.state
    }


    /// True when the engine accepted the last play request, panel or not.
    pub fn is_playing( &self ) -> bool {
        self.state == TransportState::Playing
    }


    pub fn current_index( &self ) -> usize {
        self.index
    }


    pub fn current_track( &self ) -> &Track {
        // index is always kept in bounds
        &self.playlist.tracks()[ self.index ]
    }


    pub fn current_time( &self ) -> f64 {
        self.current_time
    }


    pub fn duration( &self ) -> Option<f64> {
        self.duration
    }


    pub fn volume( &self ) -> f32 {
        self.volume
    }


    pub fn is_shuffled( &self ) -> bool {
        self.shuffled
    }


    pub fn repeat_mode( &self ) -> RepeatMode {
        self.repeat
    }


    pub fn is_open( &self ) -> bool {
        self.open
    }


    pub fn playlist( &self ) -> &Playlist {
        &self.playlist
    }


    pub fn media( &self ) -> &M {
        &self.media
    }


    pub fn media_mut( &mut self ) -> &mut M {
        &mut self.media
    }


    fn random_index( &mut self ) -> usize {
        self.rng.gen_range( 0..self.playlist.len() )
    }


    fn apply_volume( &mut self, volume: f32 ) {
        self.volume = volume;
        self.media.set_volume( volume );
    }


    fn request_play( &mut self ) {
        if let Err( e ) = self.media.play() {
            tracing::error!( "Play request for {:?} failed: {}", self.current_track().source, e );
            self.state = TransportState::Paused;
        }
    }


    fn load_current( &mut self ) {
        let source = self.current_track().source.clone();
        if let Err( e ) = self.media.load( &source ) {
            tracing::warn!( "Could not load {:?}: {}", source, e );
        }
    }


    /// Common reset applied after any track transition.
    fn reset_position( &mut self ) {
        self.current_time = 0.0;
        self.apply_volume( BASELINE_VOLUME );
        if self.state == TransportState::Playing {
            self.resume_at = Some( Instant::now() + RESUME_DELAY );
        }
    }


    fn restart( &mut self ) {
        if let Err( e ) = self.media.seek( 0.0 ) {
            tracing::warn!( "Restart failed: {}", e );
        }
        self.reset_position();
    }


    fn change_track( &mut self, index: usize ) {
        self.index = index;
        self.duration = None;
        self.load_current();
        self.reset_position();
        tracing::info!( "Track {}: {}", index, self.current_track().name );
    }


    fn publish( &mut self ) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        if self.last_published.as_ref() == Some( &snapshot ) {
            return;
        }
        for subscriber in &mut self.subscribers {
            subscriber( &snapshot );
        }
        self.last_published = Some( snapshot );
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;


    /// Records calls and lets tests inject events and failures.
    #[derive( Default )]
    struct FakeMedia {
        loaded: Vec<PathBuf>,
        playing: bool,
        reject_play: bool,
        volume: f32,
        seeks: Vec<f64>,
        pending: Vec<MediaEvent>,
    }


    impl MediaResource for FakeMedia {
        fn load( &mut self, source: &Path ) -> Result<(), MediaError> {
            self.loaded.push( source.to_path_buf() );
            self.playing = false;
            Ok(())
        }

        fn play( &mut self ) -> Result<(), MediaError> {
            if self.reject_play {
                return Err( MediaError::Rejected( "no device".into() ) );
            }
            self.playing = true;
            Ok(())
        }

        fn pause( &mut self ) {
            self.playing = false;
        }

        fn seek( &mut self, position: f64 ) -> Result<(), MediaError> {
            self.seeks.push( position );
            Ok(())
        }

        fn set_volume( &mut self, volume: f32 ) {
            self.volume = volume;
        }

        fn poll_events( &mut self ) -> Vec<MediaEvent> {
            std::mem::take( &mut self.pending )
        }
    }


    fn transport() -> Transport<FakeMedia> {
        Transport::with_rng( Playlist::builtin(), FakeMedia::default(), StdRng::seed_from_u64( 7 ) )
    }


    #[test]
    fn test_initial_state() {
        let t = transport();
        assert_eq!( t.state(), TransportState::Paused );
        assert_eq!( t.current_index(), 0 );
        assert_eq!( t.volume(), BASELINE_VOLUME );
        assert_eq!( t.media().loaded.len(), 1 );
    }


    #[test]
    fn test_toggle_play_pause_forces_baseline() {
        let mut t = transport();
        t.set_volume( 0.9 );
        t.toggle_play_pause();
        assert!( t.is_playing() );
        assert!( t.media().playing );
        assert_eq!( t.volume(), BASELINE_VOLUME );

        t.set_volume( 0.8 );
        t.toggle_play_pause();
        assert!( !t.is_playing() );
        assert!( !t.media().playing );
        assert_eq!( t.volume(), 0.8 );
    }


    #[test]
    fn test_rejected_play_stays_paused() {
        let mut t = transport();
        t.media_mut().reject_play = true;
        t.toggle_play_pause();
        assert_eq!( t.state(), TransportState::Paused );
    }


    #[test]
    fn test_delayed_resume_after_track_change() {
        let mut t = transport();
        t.toggle_play_pause();
        t.next();
        // loading the new track stopped the engine
        assert!( !t.media().playing );
        assert!( t.is_playing() );

        t.tick( Instant::now() + RESUME_DELAY );
        assert!( t.media().playing );
    }


    #[test]
    fn test_pause_inside_resume_window_wins() {
        let mut t = transport();
        t.toggle_play_pause();
        t.next();
        t.toggle_play_pause();

        t.tick( Instant::now() + RESUME_DELAY );
        assert!( !t.media().playing );
        assert_eq!( t.state(), TransportState::Paused );
    }


    #[test]
    fn test_seek_requires_duration() {
        let mut t = transport();
        t.seek( 0.5 );
        assert!( t.media().seeks.is_empty() );

        t.handle_event( MediaEvent::MetadataLoaded { duration: 200.0 } );
        t.seek( 0.25 );
        assert_eq!( t.current_time(), 50.0 );
        assert_eq!( t.media().seeks, vec![ 50.0 ] );

        t.seek( 4.0 );
        assert_eq!( t.current_time(), 200.0 );
    }


    #[test]
    fn test_time_update_clamped_to_duration() {
        let mut t = transport();
        t.handle_event( MediaEvent::MetadataLoaded { duration: 10.0 } );
        t.handle_event( MediaEvent::TimeUpdate { position: 12.0 } );
        assert_eq!( t.current_time(), 10.0 );
    }


    #[test]
    fn test_invalid_duration_is_unknown() {
        let mut t = transport();
        t.handle_event( MediaEvent::MetadataLoaded { duration: f64::NAN } );
        assert_eq!( t.duration(), None );
        assert_eq!( format_time( t.duration() ), "0:00" );
    }


    #[test]
    fn test_ended_advances() {
        let mut t = transport();
        t.media_mut().pending.push( MediaEvent::Ended );
        t.tick( Instant::now() );
        assert_eq!( t.current_index(), 1 );
    }


    #[test]
    fn test_ended_with_repeat_track_restarts() {
        let mut t = transport();
        t.cycle_repeat_mode();
        t.handle_event( MediaEvent::TimeUpdate { position: 90.0 } );
        t.handle_event( MediaEvent::Ended );
        assert_eq!( t.current_index(), 0 );
        assert_eq!( t.current_time(), 0.0 );
        assert_eq!( t.media().seeks, vec![ 0.0 ] );
    }


    #[test]
    fn test_engine_error_pauses() {
        let mut t = transport();
        t.toggle_play_pause();
        t.handle_event( MediaEvent::Error { message: "device lost".into() } );
        assert!( !t.is_playing() );
    }


    #[test]
    fn test_shuffle_and_repeat_reset_volume() {
        let mut t = transport();
        t.set_volume( 0.7 );
        t.toggle_shuffle();
        assert_eq!( t.volume(), BASELINE_VOLUME );

        t.set_volume( 0.7 );
        t.cycle_repeat_mode();
        assert_eq!( t.volume(), BASELINE_VOLUME );
        assert_eq!( t.repeat_mode(), RepeatMode::Track );
    }


    #[test]
    fn test_shuffle_stays_in_bounds() {
        let mut t = transport();
        t.toggle_shuffle();
        for _ in 0..50 {
            t.next();
            assert!( t.current_index() < t.playlist().len() );
        }
    }


    #[test]
    fn test_snapshot_hides_playing_while_closed() {
        let mut t = transport();
        t.toggle_play_pause();
        assert!( !t.snapshot().is_playing );
        t.set_open( true );
        assert!( t.snapshot().is_playing );
        t.set_open( false );
        // engine keeps playing
        assert!( t.media().playing );
    }


    #[test]
    fn test_subscribers_receive_changes() {
        let seen = Rc::new( RefCell::new( Vec::new() ) );
        let sink = Rc::clone( &seen );

        let mut t = transport();
        t.subscribe( move |snap: &StatusSnapshot| sink.borrow_mut().push( snap.current_track_index ) );
        t.next();
        t.tick( Instant::now() );
        t.next();

        assert_eq!( *seen.borrow(), vec![ 0, 1, 2 ] );
    }


    #[test]
    fn test_format_time() {
        assert_eq!( format_time( Some( 0.0 ) ), "0:00" );
        assert_eq!( format_time( Some( 65.9 ) ), "1:05" );
        assert_eq!( format_time( Some( 600.0 ) ), "10:00" );
        assert_eq!( format_time( Some( -1.0 ) ), "0:00" );
        assert_eq!( format_time( None ), "0:00" );
    }
}
