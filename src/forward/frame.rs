/// Size of the frame buffer; a single read never returns more than this.
pub const MAX_FRAME_SIZE: usize = 2048;

/// Representation of a frame read from the interface.
/// Frames of this kind are raw IP (TUN) or Ethernet (TAP).
pub struct Frame {
    pub frame: [u8; MAX_FRAME_SIZE],
    pub size: usize,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            frame: [0; MAX_FRAME_SIZE],
            size: 0,
        }
    }

    pub fn pkt_data(&self) -> &[u8] {
        &self.frame[..self.size]
    }

    pub fn pkt_data_mut(&mut self) -> &mut [u8] {
        &mut self.frame[..self.size]
    }
}
