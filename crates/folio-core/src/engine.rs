//! Audio engine backing the transport
//!
//! [`AudioEngine`] implements [`MediaResource`] on top of the Symphonia
//! decoder and a cpal output stream. Each play session owns a decode worker
//! that feeds the output queue, resampling with rubato when the device rate
//! differs from the file.

use std::path::{ Path, PathBuf };
use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };
use std::sync::{ Arc, Mutex, PoisonError };
use std::thread::{ self, JoinHandle };
use std::time::Duration;

use rubato::{ FastFixedOut, PolynomialDegree, Resampler };

use crate::decoder::Decoder;
use crate::output::{ AudioOutput, SampleQueue };
use crate::transport::{ MediaError, MediaEvent, MediaResource };


/// Device-rate conversion for one session.
struct Resample {
    inner: FastFixedOut<f32>,
    /// Planar input waiting for a full chunk.
    pending: Vec<Vec<f32>>,
}


impl Resample {
    fn new( from: u32, to: u32, channels: usize ) -> Result<Self, MediaError> {
        tracing::info!( "Resampling: {} Hz → {} Hz", from, to );

        let inner = FastFixedOut::<f32>::new(
            to as f64 / from as f64,
            2.0,
            PolynomialDegree::Cubic,
            1024,
            channels,
        )
        .map_err( |e| MediaError::Rejected( format!( "Failed to create resampler: {}", e ) ) )?;

        Ok( Self { inner, pending: vec![ Vec::new(); channels ] } )
    }


    fn process( &mut self, interleaved: &[f32] ) -> Vec<f32> {
        let channels = self.pending.len();
        for frame in interleaved.chunks( channels ) {
            for ( ch, sample ) in frame.iter().enumerate() {
                self.pending[ ch ].push( *sample );
            }
        }

        let mut out = Vec::new();
        while self.pending[ 0 ].len() >= self.inner.input_frames_next() {
            let needed = self.inner.input_frames_next();
            let chunk: Vec<Vec<f32>> = self.pending
                .iter_mut()
                .map( |ch| ch.drain( ..needed ).collect() )
                .collect();

            match self.inner.process( &chunk, None ) {
                Ok( resampled ) => out.extend( interleave( &resampled ) ),
                Err( e ) => {
                    tracing::error!( "Resample error: {}", e );
                    break;
                }
            }
        }
        out
    }


    /// Drains whatever input is left at end of stream.
    fn flush( &mut self ) -> Vec<f32> {
        if self.pending[ 0 ].is_empty() {
            return Vec::new();
        }

        let result = self.inner.process_partial( Some( self.pending.as_slice() ), None );
        self.pending.iter_mut().for_each( Vec::clear );
        match result {
            Ok( resampled ) => interleave( &resampled ),
            Err( e ) => {
                tracing::error!( "Resample flush error: {}", e );
                Vec::new()
            }
        }
    }
}


fn interleave( planar: &[Vec<f32>] ) -> Vec<f32> {
    let frames = planar.first().map_or( 0, Vec::len );
    let mut out = Vec::with_capacity( frames * planar.len() );
    for i in 0..frames {
        for channel in planar {
            out.push( channel[ i ] );
        }
    }
    out
}


/// State shared with a session's decode worker.
struct Shared {
    queue: Arc<SampleQueue>,
    stop: AtomicBool,
    /// Source frames handed to the queue, counted from the file start.
    frames: AtomicU64,
    ended: AtomicBool,
    failure: Mutex<Option<String>>,
}


impl Shared {
    fn new( queue: Arc<SampleQueue>, frames: u64 ) -> Self {
        Self {
            queue,
            stop: AtomicBool::new( false ),
            frames: AtomicU64::new( frames ),
            ended: AtomicBool::new( false ),
            failure: Mutex::new( None ),
        }
    }
}


/// How a decode worker finished, if it has.
#[derive( Debug, PartialEq )]
enum WorkerState {
    Running,
    Ended,
    Failed( String ),
}


/// Handle to a decode worker thread. Dropping it stops and joins the thread.
struct Worker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}


impl Worker {
    fn spawn( shared: Arc<Shared>, body: impl FnOnce( &Shared ) + Send + 'static ) -> Self {
        let worker_shared = Arc::clone( &shared );
        let handle = thread::spawn( move || body( &worker_shared ) );
        Self { shared, handle: Some( handle ) }
    }


    /// Checks the worker. A thread that exits without reporting counts as failed.
    fn state( &self ) -> WorkerState {
        // sampled first so the flags below already hold whatever it set
        let finished = self.handle.as_ref().is_some_and( JoinHandle::is_finished );

        if let Some( message ) = self.shared.failure.lock().unwrap_or_else( PoisonError::into_inner ).take() {
            return WorkerState::Failed( message );
        }
        if self.shared.ended.load( Ordering::Relaxed ) {
            return WorkerState::Ended;
        }
        if finished {
            return WorkerState::Failed( "decode worker stopped".to_string() );
        }
        WorkerState::Running
    }
}


impl Drop for Worker {
    fn drop( &mut self ) {
        self.shared.stop.store( true, Ordering::Relaxed );
        self.shared.queue.clear();
        if let Some( handle ) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!( "Decode worker panicked" );
            }
        }
    }
}


/// One running output stream plus its decode worker.
struct Session {
    worker: Worker,
    sample_rate: u32,
    // Dropped after the worker is joined, which closes the stream.
    _output: AudioOutput,
}


impl Session {
    fn start( source: &Path, position: f64, volume: f32 ) -> Result<Self, MediaError> {
        let mut decoder = Decoder::open( source ).map_err( |e| MediaError::Load( e.to_string() ) )?;
        if position > 0.0 {
            decoder.seek( position ).map_err( |e| MediaError::Seek( e.to_string() ) )?;
        }

        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels();

        let ( output, queue ) = AudioOutput::new( sample_rate, channels as u16 )
            .map_err( |e| MediaError::Rejected( e.to_string() ) )?;
        queue.set_volume( volume );

        let resample = if output.sample_rate() != sample_rate {
            Some( Resample::new( sample_rate, output.sample_rate(), channels )? )
        } else {
            None
        };

        output.play().map_err( |e| MediaError::Rejected( e.to_string() ) )?;

        let shared = Arc::new( Shared::new( queue, ( position * sample_rate as f64 ) as u64 ) );
        let worker = Worker::spawn( shared, move |shared| decode_loop( decoder, resample, shared ) );

        Ok( Self { worker, sample_rate, _output: output } )
    }


    fn queue( &self ) -> &SampleQueue {
        &self.worker.shared.queue
    }


    fn position( &self ) -> f64 {
        self.worker.shared.frames.load( Ordering::Relaxed ) as f64 / self.sample_rate as f64
    }
}


fn decode_loop( mut decoder: Decoder, mut resample: Option<Resample>, shared: &Shared ) {
    let channels = decoder.channels().max( 1 );
    // Stay roughly 50ms ahead of the device.
    let target = decoder.sample_rate() as usize * channels / 20;

    loop {
        if shared.stop.load( Ordering::Relaxed ) {
            return;
        }

        if shared.queue.is_paused() || shared.queue.len() > target {
            thread::sleep( Duration::from_millis( 5 ) );
            continue;
        }

        match decoder.decode_next() {
            Ok( Some( samples ) ) => {
                shared.frames.fetch_add( ( samples.len() / channels ) as u64, Ordering::Relaxed );
                let samples = match resample.as_mut() {
                    Some( r ) => r.process( &samples ),
                    None => samples,
                };
                push_all( shared, &samples );
            }
            Ok( None ) => {
                if let Some( r ) = resample.as_mut() {
                    push_all( shared, &r.flush() );
                }
                while !shared.queue.is_empty() && !shared.stop.load( Ordering::Relaxed ) {
                    thread::sleep( Duration::from_millis( 10 ) );
                }
                tracing::debug!( "Decode worker reached end of stream" );
                shared.ended.store( true, Ordering::Relaxed );
                return;
            }
            Err( e ) => {
                tracing::error!( "Decode failed: {}", e );
                *shared.failure.lock().unwrap_or_else( PoisonError::into_inner ) = Some( e.to_string() );
                return;
            }
        }
    }
}


fn push_all( shared: &Shared, samples: &[f32] ) {
    let mut offset = 0;
    while offset < samples.len() && !shared.stop.load( Ordering::Relaxed ) {
        let pushed = shared.queue.push( &samples[ offset.. ] );
        offset += pushed;
        if pushed == 0 {
            thread::sleep( Duration::from_millis( 5 ) );
        }
    }
}


/// Real audio playback for a [`crate::Transport`].
///
/// The output device is only opened on the first `play`, so a machine
/// without audio hardware can still browse tracks.
pub struct AudioEngine {
    source: Option<PathBuf>,
    session: Option<Session>,
    /// Where the next session starts, in seconds.
    start_at: f64,
    volume: f32,
    events: Vec<MediaEvent>,
}


impl AudioEngine {
    pub fn new() -> Self {
        Self {
            source: None,
            session: None,
            start_at: 0.0,
            volume: 1.0,
            events: Vec::new(),
        }
    }


    /// Position of the running session, or the pending start point.
    pub fn position( &self ) -> f64 {
        self.session.as_ref().map_or( self.start_at, Session::position )
    }


    fn open_session( &mut self, position: f64 ) -> Result<Session, MediaError> {
        let source = self.source
            .as_deref()
            .ok_or_else( || MediaError::Rejected( "no track loaded".to_string() ) )?;
        Session::start( source, position, self.volume )
    }
}


impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}


impl MediaResource for AudioEngine {
    fn load( &mut self, source: &Path ) -> Result<(), MediaError> {
        self.session = None;
        self.start_at = 0.0;
        self.source = Some( source.to_path_buf() );

        let decoder = Decoder::open( source ).map_err( |e| MediaError::Load( e.to_string() ) )?;
        if let Some( duration ) = decoder.duration() {
            self.events.push( MediaEvent::MetadataLoaded { duration } );
        }
        tracing::debug!( "Loaded {:?}", source );
        Ok(())
    }


    fn play( &mut self ) -> Result<(), MediaError> {
        if let Some( session ) = &self.session {
            session.queue().set_paused( false );
            return Ok(());
        }

        self.session = Some( self.open_session( self.start_at )? );
        Ok(())
    }


    fn pause( &mut self ) {
        if let Some( session ) = &self.session {
            session.queue().set_paused( true );
        }
    }


    fn seek( &mut self, position: f64 ) -> Result<(), MediaError> {
        self.start_at = position.max( 0.0 );

        let Some( old ) = self.session.take() else {
            return Ok(());
        };
        let paused = old.queue().is_paused();
        drop( old );

        let session = self.open_session( self.start_at )?;
        session.queue().set_paused( paused );
        self.session = Some( session );
        Ok(())
    }


    fn set_volume( &mut self, volume: f32 ) {
        self.volume = volume;
        if let Some( session ) = &self.session {
            session.queue().set_volume( volume );
        }
    }


    fn poll_events( &mut self ) -> Vec<MediaEvent> {
        if let Some( session ) = &self.session {
            let position = session.position();
            match session.worker.state() {
                WorkerState::Running => {
                    self.events.push( MediaEvent::TimeUpdate { position } );
                }
                WorkerState::Ended => {
                    self.events.push( MediaEvent::TimeUpdate { position } );
                    self.events.push( MediaEvent::Ended );
                    self.session = None;
                    self.start_at = 0.0;
                }
                WorkerState::Failed( message ) => {
                    tracing::warn!( "Playback stopped: {}", message );
                    self.events.push( MediaEvent::Error { message } );
                    self.session = None;
                }
            }
        }
        std::mem::take( &mut self.events )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_interleave() {
        let planar = vec![ vec![ 1.0, 2.0 ], vec![ -1.0, -2.0 ] ];
        assert_eq!( interleave( &planar ), vec![ 1.0, -1.0, 2.0, -2.0 ] );
        assert!( interleave( &[] ).is_empty() );
    }


    #[test]
    fn test_resample_doubles_frame_count() {
        let mut r = Resample::new( 22050, 44100, 1 ).unwrap();
        let mut produced = r.process( &[ 0.0; 22050 ] ).len();
        produced += r.flush().len();
        // Output comes in whole chunks, so allow a couple of chunks of slack.
        assert!( ( produced as i64 - 44100 ).abs() <= 2048, "produced {}", produced );
    }


    #[test]
    fn test_load_missing_file_fails() {
        let mut engine = AudioEngine::new();
        let result = engine.load( Path::new( "/no/such/track.mp3" ) );
        assert!( matches!( result, Err( MediaError::Load( _ ) ) ) );
        assert!( engine.poll_events().is_empty() );
    }


    #[test]
    fn test_play_without_source_is_rejected() {
        let mut engine = AudioEngine::new();
        assert!( matches!( engine.play(), Err( MediaError::Rejected( _ ) ) ) );
    }


    #[test]
    fn test_seek_without_session_moves_start() {
        let mut engine = AudioEngine::new();
        engine.seek( 12.5 ).unwrap();
        assert_eq!( engine.position(), 12.5 );
        engine.seek( -3.0 ).unwrap();
        assert_eq!( engine.position(), 0.0 );
    }


    fn shared() -> Arc<Shared> {
        Arc::new( Shared::new( Arc::new( SampleQueue::new( 64, 1, 1 ) ), 0 ) )
    }


    fn wait_until_finished( worker: &Worker ) {
        while !worker.handle.as_ref().is_some_and( JoinHandle::is_finished ) {
            thread::sleep( Duration::from_millis( 1 ) );
        }
    }


    #[test]
    fn test_worker_that_stops_silently_is_failed() {
        let worker = Worker::spawn( shared(), |_| {} );
        wait_until_finished( &worker );
        assert_eq!( worker.state(), WorkerState::Failed( "decode worker stopped".to_string() ) );
    }


    #[test]
    fn test_panicked_worker_is_failed() {
        let worker = Worker::spawn( shared(), |_| panic!( "buffer too small" ) );
        wait_until_finished( &worker );
        assert!( matches!( worker.state(), WorkerState::Failed( _ ) ) );
    }


    #[test]
    fn test_worker_reports_end_and_failure() {
        let ended = Worker::spawn( shared(), |shared| shared.ended.store( true, Ordering::Relaxed ) );
        wait_until_finished( &ended );
        assert_eq!( ended.state(), WorkerState::Ended );

        let failed = Worker::spawn( shared(), |shared| {
            *shared.failure.lock().unwrap() = Some( "Decode error: bad packet".to_string() );
        });
        wait_until_finished( &failed );
        assert_eq!( failed.state(), WorkerState::Failed( "Decode error: bad packet".to_string() ) );
    }


    #[test]
    fn test_running_worker_stops_on_drop() {
        let worker = Worker::spawn( shared(), |shared| {
            while !shared.stop.load( Ordering::Relaxed ) {
                thread::sleep( Duration::from_millis( 1 ) );
            }
        });
        assert_eq!( worker.state(), WorkerState::Running );
        drop( worker );
    }
}
