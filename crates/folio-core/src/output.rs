//! Audio output via cpal
//!
//! Decoded samples go through a bounded [`SampleQueue`] shared with the cpal
//! callback thread. The queue converts channel layouts and applies volume
//! and pause on the way out.

use std::collections::VecDeque;
use std::sync::atomic::{ AtomicBool, AtomicU32, Ordering };
use std::sync::{ Arc, Mutex, MutexGuard, PoisonError };

use cpal::traits::{ DeviceTrait, HostTrait, StreamTrait };
use thiserror::Error;


/// Errors that can occur with audio output.
#[derive( Debug, Error )]
pub enum OutputError {
    #[error( "No output device available" )]
    NoDevice,

    #[error( "Failed to get stream config: {0}" )]
    StreamConfig( String ),

    #[error( "Failed to build output stream: {0}" )]
    BuildStream( String ),

    #[error( "Failed to control stream: {0}" )]
    PlayStream( String ),
}


/// Bounded sample FIFO between the decode worker and the device callback.
pub struct SampleQueue {
    buffer: Mutex<VecDeque<f32>>,
    capacity: usize,
    paused: AtomicBool,
    /// f32 bits
    volume: AtomicU32,
    source_channels: usize,
    output_channels: usize,
}


impl SampleQueue {
    /// Creates a queue holding at most `capacity` interleaved source samples.
    pub fn new( capacity: usize, source_channels: u16, output_channels: u16 ) -> Self {
        Self {
            buffer: Mutex::new( VecDeque::with_capacity( capacity ) ),
            capacity,
            paused: AtomicBool::new( false ),
            volume: AtomicU32::new( 1.0_f32.to_bits() ),
            source_channels: source_channels.max( 1 ) as usize,
            output_channels: output_channels.max( 1 ) as usize,
        }
    }


    /// Appends as many samples as fit. Returns how many were taken.
    pub fn push( &self, samples: &[f32] ) -> usize {
        let mut buf = self.lock();
        let room = self.capacity.saturating_sub( buf.len() );
        let count = samples.len().min( room );
        buf.extend( samples[ ..count ].iter().copied() );
        count
    }


    /// Fills `output` with device-layout frames, padding with silence.
    /// Returns the number of samples written before the padding.
    pub fn pop( &self, output: &mut [f32] ) -> usize {
        if self.is_paused() {
            output.fill( 0.0 );
            return 0;
        }

        let volume = self.volume();
        let src = self.source_channels;
        let out = self.output_channels;

        let mut buf = self.lock();
        let frames = ( output.len() / out ).min( buf.len() / src );
        let mut frame = Vec::with_capacity( src );

        for f in 0..frames {
            frame.clear();
            frame.extend( buf.drain( ..src ) );
            let dst = &mut output[ f * out..( f + 1 ) * out ];
            remix( &frame, dst );
            dst.iter_mut().for_each( |s| *s *= volume );
        }

        let written = frames * out;
        output[ written.. ].fill( 0.0 );
        written
    }


    pub fn len( &self ) -> usize {
        self.lock().len()
    }


    pub fn is_empty( &self ) -> bool {
        self.lock().is_empty()
    }


    pub fn clear( &self ) {
        self.lock().clear();
    }


    pub fn set_paused( &self, paused: bool ) {
        self.paused.store( paused, Ordering::Relaxed );
    }


    pub fn is_paused( &self ) -> bool {
        self.paused.load( Ordering::Relaxed )
    }


    pub fn set_volume( &self, volume: f32 ) {
        self.volume.store( volume.to_bits(), Ordering::Relaxed );
    }


    pub fn volume( &self ) -> f32 {
        f32::from_bits( self.volume.load( Ordering::Relaxed ) )
    }


    fn lock( &self ) -> MutexGuard<'_, VecDeque<f32>> {
        self.buffer.lock().unwrap_or_else( PoisonError::into_inner )
    }
}


/// Maps one source frame onto one device frame.
fn remix( frame: &[f32], dst: &mut [f32] ) {
    if frame.len() == dst.len() {
        dst.copy_from_slice( frame );
    } else if frame.len() == 2 && dst.len() == 1 {
        dst[ 0 ] = ( frame[ 0 ] + frame[ 1 ] ) * 0.5;
    } else {
        // Extra device channels repeat the last source channel.
        let last = frame.len() - 1;
        for ( ch, sample ) in dst.iter_mut().enumerate() {
            *sample = frame[ ch.min( last ) ];
        }
    }
}


/// Open cpal stream reading from a [`SampleQueue`].
///
/// Not Send: `cpal::Stream` must stay on the thread that built it.
pub struct AudioOutput {
    stream: cpal::Stream,
    sample_rate: u32,
}


impl AudioOutput {
    /// Opens the default device, preferring a config that matches the source.
    ///
    /// The device may end up at a different rate than the source; callers
    /// compare [`AudioOutput::sample_rate`] and resample when needed.
    pub fn new( source_rate: u32, source_channels: u16 ) -> Result<( Self, Arc<SampleQueue> ), OutputError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or( OutputError::NoDevice )?;

        tracing::info!( "Using output device: {:?}", device.name() );

        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err( |e| OutputError::StreamConfig( e.to_string() ) )?
            .collect();

        let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
            c.min_sample_rate().0 <= source_rate && c.max_sample_rate().0 >= source_rate
        };

        let config = match supported
            .iter()
            .find( |c| c.channels() == source_channels && supports_rate( c ) )
            .or_else( || supported.iter().find( |c| supports_rate( c ) ) )
        {
            Some( range ) => range.clone().with_sample_rate( cpal::SampleRate( source_rate ) ).config(),
            None => {
                let fallback = device
                    .default_output_config()
                    .map_err( |e| OutputError::StreamConfig( e.to_string() ) )?;
                tracing::warn!(
                    "Device cannot run at {} Hz, using {} Hz",
                    source_rate,
                    fallback.sample_rate().0
                );
                fallback.config()
            }
        };

        tracing::debug!( "Output config: {} Hz, {} channels", config.sample_rate.0, config.channels );

        // ~500ms of source audio
        let capacity = source_rate as usize * source_channels as usize / 2;
        let queue = Arc::new( SampleQueue::new( capacity, source_channels, config.channels ) );
        let reader = Arc::clone( &queue );

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    reader.pop( data );
                },
                |err| tracing::error!( "Audio output error: {}", err ),
                None,
            )
            .map_err( |e| OutputError::BuildStream( e.to_string() ) )?;

        Ok(( Self { stream, sample_rate: config.sample_rate.0 }, queue ))
    }


    pub fn play( &self ) -> Result<(), OutputError> {
        self.stream.play().map_err( |e| OutputError::PlayStream( e.to_string() ) )
    }


    pub fn pause( &self ) -> Result<(), OutputError> {
        self.stream.pause().map_err( |e| OutputError::PlayStream( e.to_string() ) )
    }


    /// Rate the device actually runs at.
    pub fn sample_rate( &self ) -> u32 {
        self.sample_rate
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_push_respects_capacity() {
        let queue = SampleQueue::new( 4, 1, 1 );
        assert_eq!( queue.push( &[ 0.1; 6 ] ), 4 );
        assert_eq!( queue.push( &[ 0.1 ] ), 0 );
        assert_eq!( queue.len(), 4 );
    }


    #[test]
    fn test_mono_to_stereo() {
        let queue = SampleQueue::new( 16, 1, 2 );
        queue.push( &[ 0.5, -0.5 ] );

        let mut out = [ 9.0; 6 ];
        assert_eq!( queue.pop( &mut out ), 4 );
        assert_eq!( out, [ 0.5, 0.5, -0.5, -0.5, 0.0, 0.0 ] );
    }


    #[test]
    fn test_stereo_to_mono() {
        let queue = SampleQueue::new( 16, 2, 1 );
        queue.push( &[ 1.0, 0.0, 0.5, 0.5 ] );

        let mut out = [ 0.0; 2 ];
        queue.pop( &mut out );
        assert_eq!( out, [ 0.5, 0.5 ] );
        assert!( queue.is_empty() );
    }


    #[test]
    fn test_volume_and_pause() {
        let queue = SampleQueue::new( 16, 1, 1 );
        queue.push( &[ 1.0, 1.0 ] );
        queue.set_volume( 0.25 );

        queue.set_paused( true );
        let mut out = [ 7.0; 2 ];
        assert_eq!( queue.pop( &mut out ), 0 );
        assert_eq!( out, [ 0.0, 0.0 ] );
        assert_eq!( queue.len(), 2 );

        queue.set_paused( false );
        queue.pop( &mut out );
        assert_eq!( out, [ 0.25, 0.25 ] );
    }
}
