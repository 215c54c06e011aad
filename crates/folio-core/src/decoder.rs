//! Audio decoding via Symphonia
//!
//! Turns a track file into interleaved f32 PCM, one packet at a time.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{ SampleBuffer, SignalSpec };
use symphonia::core::codecs::{ Decoder as SymphoniaDecoder, DecoderOptions, CODEC_TYPE_NULL };
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{ FormatOptions, FormatReader, SeekMode, SeekTo };
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;
use thiserror::Error;


/// Errors that can occur during decoding.
#[derive( Debug, Error )]
pub enum DecoderError {
    #[error( "Failed to open file: {0}" )]
    FileOpen( #[from] std::io::Error ),

    #[error( "Unsupported format" )]
    UnsupportedFormat,

    #[error( "No audio tracks found" )]
    NoAudioTrack,

    #[error( "Decoder creation failed: {0}" )]
    DecoderCreation( String ),

    #[error( "Decode error: {0}" )]
    Decode( String ),

    #[error( "Seek error: {0}" )]
    Seek( String ),
}


/// Packet decoder for the first audio track of a file.
pub struct Decoder {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn SymphoniaDecoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    sample_buf: Option<SampleBuffer<f32>>,
    duration: Option<f64>,
}


impl Decoder {
    /// Opens and probes an audio file.
    pub fn open( path: &Path ) -> Result<Self, DecoderError> {
        let file = File::open( path )?;
        let mss = MediaSourceStream::new( Box::new( file ), Default::default() );

        let mut hint = Hint::new();
        if let Some( ext ) = path.extension().and_then( |e| e.to_str() ) {
            hint.with_extension( ext );
        }

        let probed = symphonia::default::get_probe()
            .format( &hint, mss, &FormatOptions::default(), &MetadataOptions::default() )
            .map_err( |_| DecoderError::UnsupportedFormat )?;
        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find( |t| t.codec_params.codec != CODEC_TYPE_NULL )
            .ok_or( DecoderError::NoAudioTrack )?;

        let params = &track.codec_params;
        let track_id = track.id;
        let sample_rate = params.sample_rate.unwrap_or( 44100 );
        let channels = params.channels.map( |c| c.count() ).unwrap_or( 2 );
        let duration = params.n_frames.map( |frames| frames as f64 / sample_rate as f64 );

        let decoder = symphonia::default::get_codecs()
            .make( params, &DecoderOptions::default() )
            .map_err( |e| DecoderError::DecoderCreation( e.to_string() ) )?;

        tracing::debug!(
            "Opened {:?}: {} Hz, {} channels, duration {:?}s",
            path,
            sample_rate,
            channels,
            duration
        );

        Ok( Self {
            format_reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            sample_buf: None,
            duration,
        })
    }


    pub fn sample_rate( &self ) -> u32 {
        self.sample_rate
    }


    pub fn channels( &self ) -> usize {
        self.channels
    }


    /// Duration in seconds, if the container reports it.
    pub fn duration( &self ) -> Option<f64> {
        self.duration
    }


    /// Decodes the next packet into interleaved samples.
    ///
    /// Returns `None` at end of stream. Corrupt packets are skipped.
    pub fn decode_next( &mut self ) -> Result<Option<Vec<f32>>, DecoderError> {
        loop {
            let packet = match self.format_reader.next_packet() {
                Ok( packet ) => packet,
                Err( SymphoniaError::IoError( ref e ) ) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok( None );
                }
                Err( e ) => return Err( DecoderError::Decode( e.to_string() ) ),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode( &packet ) {
                Ok( decoded ) => decoded,
                Err( SymphoniaError::DecodeError( _ ) ) => continue,
                Err( e ) => return Err( DecoderError::Decode( e.to_string() ) ),
            };

            let spec = *decoded.spec();
            let frames = decoded.frames();

            let buf = sample_buffer_for( &mut self.sample_buf, frames, spec );
            buf.copy_interleaved_ref( decoded );

            return Ok( Some( buf.samples().to_vec() ) );
        }
    }


    /// Seeks to `position_secs`.
    pub fn seek( &mut self, position_secs: f64 ) -> Result<(), DecoderError> {
        let seek_to = SeekTo::Time {
            time: Time::from( position_secs ),
            track_id: Some( self.track_id ),
        };

        self.format_reader
            .seek( SeekMode::Accurate, seek_to )
            .map_err( |e| DecoderError::Seek( e.to_string() ) )?;
        self.decoder.reset();

        Ok(())
    }
}


/// Returns a buffer able to hold `frames` frames of `spec`, reallocating when
/// the cached one is too small. Capacity is counted in samples, not frames.
fn sample_buffer_for( cached: &mut Option<SampleBuffer<f32>>, frames: usize, spec: SignalSpec ) -> &mut SampleBuffer<f32> {
    let needed = frames * spec.channels.count();
    if cached.as_ref().is_some_and( |b| b.capacity() < needed ) {
        *cached = None;
    }
    cached.get_or_insert_with( || SampleBuffer::new( frames as u64, spec ) )
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::io::Write;

    use symphonia::core::audio::Channels;


    /// Writes a 16-bit PCM WAV of `frames` frames.
    fn write_wav( path: &Path, sample_rate: u32, channels: u16, frames: u32 ) {
        let block_align = channels as u32 * 2;
        let data_len = frames * block_align;
        let mut bytes = Vec::new();
        bytes.extend_from_slice( b"RIFF" );
        bytes.extend_from_slice( &( 36 + data_len ).to_le_bytes() );
        bytes.extend_from_slice( b"WAVEfmt " );
        bytes.extend_from_slice( &16u32.to_le_bytes() );
        bytes.extend_from_slice( &1u16.to_le_bytes() ); // PCM
        bytes.extend_from_slice( &channels.to_le_bytes() );
        bytes.extend_from_slice( &sample_rate.to_le_bytes() );
        bytes.extend_from_slice( &( sample_rate * block_align ).to_le_bytes() );
        bytes.extend_from_slice( &( block_align as u16 ).to_le_bytes() );
        bytes.extend_from_slice( &16u16.to_le_bytes() );
        bytes.extend_from_slice( b"data" );
        bytes.extend_from_slice( &data_len.to_le_bytes() );
        for i in 0..frames {
            let sample = ( ( i % 100 ) as i16 - 50 ) * 200;
            for _ in 0..channels {
                bytes.extend_from_slice( &sample.to_le_bytes() );
            }
        }

        let mut file = File::create( path ).unwrap();
        file.write_all( &bytes ).unwrap();
    }


    #[test]
    fn test_missing_file() {
        let result = Decoder::open( Path::new( "/definitely/not/here.mp3" ) );
        assert!( matches!( result, Err( DecoderError::FileOpen( _ ) ) ) );
    }


    #[test]
    fn test_garbage_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "noise.mp3" );
        std::fs::write( &path, [ 0u8; 64 ] ).unwrap();

        assert!( Decoder::open( &path ).is_err() );
    }


    #[test]
    fn test_decodes_wav_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "tone.wav" );
        write_wav( &path, 8000, 1, 8000 );

        let mut decoder = Decoder::open( &path ).unwrap();
        assert_eq!( decoder.sample_rate(), 8000 );
        assert_eq!( decoder.channels(), 1 );
        assert_eq!( decoder.duration(), Some( 1.0 ) );

        let mut total = 0;
        while let Some( samples ) = decoder.decode_next().unwrap() {
            total += samples.len();
        }
        assert_eq!( total, 8000 );
    }


    #[test]
    fn test_sample_buffer_grows_for_larger_stereo_packet() {
        let spec = SignalSpec::new( 44100, Channels::FRONT_LEFT | Channels::FRONT_RIGHT );
        let mut cached = None;

        assert_eq!( sample_buffer_for( &mut cached, 576, spec ).capacity(), 1152 );
        assert!( sample_buffer_for( &mut cached, 1024, spec ).capacity() >= 2048 );
        // smaller packets reuse the larger buffer
        assert!( sample_buffer_for( &mut cached, 576, spec ).capacity() >= 2048 );
    }


    #[test]
    fn test_decodes_stereo_wav_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "stereo.wav" );
        write_wav( &path, 8000, 2, 3000 );

        let mut decoder = Decoder::open( &path ).unwrap();
        assert_eq!( decoder.channels(), 2 );

        let mut total = 0;
        while let Some( samples ) = decoder.decode_next().unwrap() {
            assert_eq!( samples.len() % 2, 0 );
            total += samples.len();
        }
        assert_eq!( total, 6000 );
    }
}
