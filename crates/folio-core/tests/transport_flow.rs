//! End-to-end transport behaviour against a scripted media resource.

use std::cell::RefCell;
use std::path::{ Path, PathBuf };
use std::rc::Rc;
use std::time::{ Duration, Instant };

use folio_core::transport::{ TransportState, BASELINE_VOLUME, RESUME_DELAY };
use folio_core::{ MediaError, MediaEvent, MediaResource, Playlist, RepeatMode, StatusSnapshot, Transport };
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;


#[derive( Default )]
struct ScriptedMedia {
    loads: Vec<PathBuf>,
    plays: usize,
    seeks: Vec<f64>,
    volume: f32,
    queued: Vec<MediaEvent>,
}


impl MediaResource for ScriptedMedia {
    fn load( &mut self, source: &Path ) -> Result<(), MediaError> {
        self.loads.push( source.to_path_buf() );
        Ok(())
    }

    fn play( &mut self ) -> Result<(), MediaError> {
        self.plays += 1;
        Ok(())
    }

    fn pause( &mut self ) {}

    fn seek( &mut self, position: f64 ) -> Result<(), MediaError> {
        self.seeks.push( position );
        Ok(())
    }

    fn set_volume( &mut self, volume: f32 ) {
        self.volume = volume;
    }

    fn poll_events( &mut self ) -> Vec<MediaEvent> {
        std::mem::take( &mut self.queued )
    }
}


fn transport( seed: u64 ) -> Transport<ScriptedMedia> {
    Transport::with_rng( Playlist::builtin(), ScriptedMedia::default(), StdRng::seed_from_u64( seed ) )
}


/// Feeds a duration and a position the way a real engine would.
fn advance_to( t: &mut Transport<ScriptedMedia>, position: f64 ) {
    t.handle_event( MediaEvent::MetadataLoaded { duration: 240.0 } );
    t.handle_event( MediaEvent::TimeUpdate { position } );
}


#[test]
fn next_walks_the_playlist_and_wraps() {
    let mut t = transport( 1 );
    let mut seen = Vec::new();
    for _ in 0..5 {
        t.next();
        seen.push( t.current_index() );
    }
    assert_eq!( seen, vec![ 1, 2, 3, 4, 0 ] );
    // initial load plus one per change
    assert_eq!( t.media().loads.len(), 6 );
}


#[test]
fn repeat_track_pins_the_index() {
    let mut t = transport( 1 );
    t.next();
    t.next();
    t.cycle_repeat_mode();
    assert_eq!( t.repeat_mode(), RepeatMode::Track );

    advance_to( &mut t, 100.0 );
    t.next();
    t.handle_event( MediaEvent::Ended );

    assert_eq!( t.current_index(), 2 );
    assert_eq!( t.current_time(), 0.0 );
    assert_eq!( t.media().seeks, vec![ 0.0, 0.0 ] );
}


#[test]
fn previous_restarts_only_past_threshold() {
    let mut t = transport( 1 );
    t.next();
    t.next();

    advance_to( &mut t, 3.5 );
    t.previous();
    assert_eq!( t.current_index(), 2 );
    assert_eq!( t.current_time(), 0.0 );

    advance_to( &mut t, 2.9 );
    t.previous();
    assert_eq!( t.current_index(), 1 );
}


#[test]
fn volume_is_clamped() {
    let mut t = transport( 1 );
    t.set_volume( -1.0 );
    assert_eq!( t.volume(), 0.0 );
    t.set_volume( 5.0 );
    assert_eq!( t.volume(), 1.0 );
    assert_eq!( t.media().volume, 1.0 );
}


#[test]
fn track_change_while_playing_resumes_after_delay() {
    let mut t = transport( 1 );
    t.toggle_play_pause();
    assert_eq!( t.state(), TransportState::Playing );
    let plays = t.media().plays;

    t.set_volume( 0.9 );
    t.next();
    assert_eq!( t.volume(), BASELINE_VOLUME );

    let start = Instant::now();
    t.tick( start );
    assert_eq!( t.media().plays, plays );

    t.tick( start + RESUME_DELAY + Duration::from_millis( 5 ) );
    assert_eq!( t.media().plays, plays + 1 );
}


#[test]
fn subscribers_follow_the_open_panel() {
    let mut t = transport( 1 );
    let latest: Rc<RefCell<Option<StatusSnapshot>>> = Rc::default();
    let sink = Rc::clone( &latest );
    t.subscribe( move |s| *sink.borrow_mut() = Some( s.clone() ) );

    t.toggle_play_pause();
    assert!( !latest.borrow().as_ref().unwrap().is_playing );

    t.set_open( true );
    assert!( latest.borrow().as_ref().unwrap().is_playing );

    t.next();
    assert_eq!( latest.borrow().as_ref().unwrap().current_track_index, 1 );
}


#[test]
fn ended_event_from_engine_advances() {
    let mut t = transport( 1 );
    t.media_mut().queued.push( MediaEvent::Ended );
    t.tick( Instant::now() );
    assert_eq!( t.current_index(), 1 );
}


proptest! {
    #[test]
    fn index_stays_in_bounds( seed in any::<u64>(), ops in prop::collection::vec( 0u8..6, 1..60 ) ) {
        let mut t = transport( seed );
        let len = t.playlist().len();
        for op in ops {
            match op {
                0 => t.next(),
                1 => t.previous(),
                2 => t.toggle_shuffle(),
                3 => t.cycle_repeat_mode(),
                4 => t.handle_event( MediaEvent::Ended ),
                _ => t.toggle_play_pause(),
            }
            prop_assert!( t.current_index() < len );
            prop_assert!( ( 0.0..=1.0 ).contains( &t.volume() ) );
        }
    }


    #[test]
    fn seek_lands_inside_the_track( fraction in -2.0f64..3.0 ) {
        let mut t = transport( 1 );
        t.handle_event( MediaEvent::MetadataLoaded { duration: 200.0 } );
        t.seek( fraction );
        prop_assert!( ( 0.0..=200.0 ).contains( &t.current_time() ) );
    }
}
