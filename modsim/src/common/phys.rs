use std::future::Future;
use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::decode::{BytesDisplay, PhysDecodeLevel};
use crate::serial::timing::RtuTiming;

/// Delivers complete frames from, and writes frames to, a byte stream
///
/// A read that fails with [`ErrorKind::TimedOut`] means the line was idle and
/// is not treated as an error by the serving loop.
pub trait Transport: Send {
    /// Read the next complete frame
    fn read_frame(&mut self) -> impl Future<Output = std::io::Result<Vec<u8>>> + Send;

    /// Write a complete frame
    fn write_frame(&mut self, frame: &[u8]) -> impl Future<Output = std::io::Result<()>> + Send;
}

/// Frames a stream using the length field of the MBAP header
pub struct StreamTransport<S> {
    stream: S,
    level: PhysDecodeLevel,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a stream, logging reads and writes at `level`
    pub fn new(stream: S, level: PhysDecodeLevel) -> Self {
        Self { stream, level }
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_frame(&mut self) -> std::io::Result<Vec<u8>> {
        let mut frame = vec![0u8; crate::tcp::frame::constants::HEADER_LENGTH];
        self.stream.read_exact(&mut frame).await?;

        let body_length = crate::tcp::frame::body_length(&frame)
            .map_err(|err| std::io::Error::new(ErrorKind::InvalidData, err))?;

        frame.resize(frame.len() + body_length, 0);
        self.stream
            .read_exact(&mut frame[crate::tcp::frame::constants::HEADER_LENGTH..])
            .await?;

        if self.level.enabled() {
            tracing::info!("PHYS RX - {}", BytesDisplay::new(&frame, self.level.data_enabled()));
        }

        Ok(frame)
    }

    async fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        if self.level.enabled() {
            tracing::info!("PHYS TX - {}", BytesDisplay::new(frame, self.level.data_enabled()));
        }
        self.stream.write_all(frame).await
    }
}

/// Frames a serial line by silence between characters
pub struct RtuTransport<S> {
    stream: S,
    timing: RtuTiming,
    level: PhysDecodeLevel,
}

impl<S> RtuTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a serial stream using `timing` to delimit frames
    pub fn new(stream: S, timing: RtuTiming, level: PhysDecodeLevel) -> Self {
        Self {
            stream,
            timing,
            level,
        }
    }

    /// Replace the inter-character and frame timeouts
    pub fn set_timing(&mut self, timing: RtuTiming) {
        tracing::info!("applied RTU timing - {}", timing);
        self.timing = timing;
    }
}

impl<S> Transport for RtuTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_frame(&mut self) -> std::io::Result<Vec<u8>> {
        const MAX_FRAME_LENGTH: usize = crate::serial::frame::constants::MAX_FRAME_LENGTH;

        let mut buffer = [0u8; MAX_FRAME_LENGTH];
        let mut frame = Vec::new();

        // wait for the first bytes of a frame
        let count = match tokio::time::timeout(
            self.timing.frame_timeout,
            self.stream.read(&mut buffer),
        )
        .await
        {
            Err(_) => return Err(ErrorKind::TimedOut.into()),
            Ok(result) => result?,
        };
        if count == 0 {
            return Err(ErrorKind::UnexpectedEof.into());
        }
        frame.extend_from_slice(&buffer[..count]);

        // the frame ends when the line goes silent
        loop {
            match tokio::time::timeout(
                self.timing.inter_character_timeout,
                self.stream.read(&mut buffer),
            )
            .await
            {
                Err(_) | Ok(Ok(0)) => break,
                Ok(Ok(count)) => {
                    // oversized frames are read to the end and rejected by the codec
                    let room = (MAX_FRAME_LENGTH + 1).saturating_sub(frame.len());
                    frame.extend_from_slice(&buffer[..count.min(room)]);
                }
                Ok(Err(err)) => return Err(err),
            }
        }

        if self.level.enabled() {
            tracing::info!("PHYS RX - {}", BytesDisplay::new(&frame, self.level.data_enabled()));
        }

        Ok(frame)
    }

    async fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        if self.level.enabled() {
            tracing::info!("PHYS TX - {}", BytesDisplay::new(frame, self.level.data_enabled()));
        }
        self.stream.write_all(frame).await?;
        self.stream.flush().await
    }
}
