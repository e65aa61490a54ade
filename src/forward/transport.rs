use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use tokio::io::unix::AsyncFd;

/// Result of waiting for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// A frame of this many bytes was read; zero means end of stream.
    Frame(usize),
    /// The wait was interrupted or the readiness was spurious; nothing was consumed.
    Interrupted,
}

/// Duplex handle exchanging whole frames with a virtual interface.
pub trait PacketTransport {
    /// Waits until a frame is available and reads it into `buf`.
    async fn recv_frame(&mut self, buf: &mut [u8]) -> io::Result<Received>;

    /// Writes one whole frame, returning the number of bytes accepted.
    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<usize>;
}

/// A TUN/TAP device driven by the runtime's readiness notifications.
pub struct TunTransport<D: AsRawFd> {
    device: AsyncFd<D>,
}

impl<D: AsRawFd + Read + Write> TunTransport<D> {
    /// Switches the device to non-blocking mode and registers it with the reactor.
    /// Must be called from within the runtime.
    pub fn new(device: D) -> io::Result<Self> {
        set_nonblocking(device.as_raw_fd())?;
        Ok(Self {
            device: AsyncFd::new(device)?,
        })
    }
}

impl<D: AsRawFd + Read + Write> PacketTransport for TunTransport<D> {
    async fn recv_frame(&mut self, buf: &mut [u8]) -> io::Result<Received> {
        let mut guard = match self.device.readable_mut().await {
            Ok(guard) => guard,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                return Ok(Received::Interrupted)
            }
            Err(err) => return Err(err),
        };

        match guard.try_io(|device| device.get_mut().read(buf)) {
            Ok(Ok(size)) => Ok(Received::Frame(size)),
            Ok(Err(err)) if err.kind() == io::ErrorKind::Interrupted => Ok(Received::Interrupted),
            Ok(Err(err)) => Err(err),
            // readiness was cleared, wait again
            Err(_would_block) => Ok(Received::Interrupted),
        }
    }

    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.device.writable_mut().await?;
            if let Ok(result) = guard.try_io(|device| device.get_mut().write(frame)) {
                return result;
            }
        }
    }
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}
