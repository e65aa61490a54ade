use std::fmt::{Display, Formatter};
use std::io;

use log::debug;

use crate::craft::reflect::{DropReason, ReflectedFrame, Reflector};
use crate::error::Error;
use crate::forward::frame::Frame;
use crate::forward::transport::{PacketTransport, Received};

/// Counters of a reflection loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub frames_read: u64,
    pub reflected: u64,
    pub dropped: u64,
    pub interrupted: u64,
}

impl Display for LoopStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames read, {} reflected, {} dropped, {} interrupted waits",
            self.frames_read, self.reflected, self.dropped, self.interrupted
        )
    }
}

/// What happened to one frame (or one wait).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Interrupted,
    Dropped(DropReason),
    Reflected(ReflectedFrame),
}

/// Reads frames from the interface, reflects them, and writes them back to the same interface.
/// Exactly one frame is in flight at any time.
pub struct FrameLoop<T> {
    transport: T,
    reflector: Reflector,
    verbose: bool,
    frame: Frame,
    stats: LoopStats,
}

impl<T: PacketTransport> FrameLoop<T> {
    pub fn new(transport: T, reflector: Reflector, verbose: bool) -> Self {
        Self {
            transport,
            reflector,
            verbose,
            frame: Frame::new(),
            stats: LoopStats::default(),
        }
    }

    /// Keeps reflecting until the transport fails or reaches end of stream.
    pub async fn run(&mut self) -> Result<(), Error> {
        loop {
            self.step().await?;
        }
    }

    /// Waits for one frame and handles it.
    pub async fn step(&mut self) -> Result<Step, Error> {
        // wait until there is a frame coming from the kernel
        let received = match self.transport.recv_frame(&mut self.frame.frame).await {
            Ok(received) => received,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => Received::Interrupted,
            Err(err) => return Err(Error::Read(err)),
        };
        self.frame.size = match received {
            Received::Interrupted => {
                self.stats.interrupted += 1;
                return Ok(Step::Interrupted);
            }
            Received::Frame(0) => return Err(Error::EndOfStream),
            Received::Frame(size) => size,
        };
        self.stats.frames_read += 1;
        let frame_num = self.stats.frames_read;
        if self.verbose {
            debug!(
                "Frame {frame_num}: read {} bytes from the interface",
                self.frame.pkt_data().len()
            );
        }

        let reflected = match self.reflector.reflect(self.frame.pkt_data_mut()) {
            Ok(reflected) => reflected,
            Err(reason) => {
                self.stats.dropped += 1;
                if self.verbose {
                    debug!("Frame {frame_num}: dropped, {reason}");
                }
                return Ok(Step::Dropped(reason));
            }
        };

        // write the reflected frame back to the kernel
        let expected = reflected.len;
        let written = self
            .transport
            .send_frame(&self.frame.frame[..expected])
            .await
            .map_err(Error::Write)?;
        if written != expected {
            return Err(Error::ShortWrite { written, expected });
        }
        self.stats.reflected += 1;
        if self.verbose {
            debug!(
                "Frame {frame_num}: wrote {written} bytes to the interface, {} bytes of data for {} (ip csum: {:04x}, udp csum: {:04x})",
                reflected.data_len,
                reflected.destination,
                reflected.ip_checksum,
                reflected.udp_checksum
            );
        }

        Ok(Step::Reflected(reflected))
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }
}
