/// Computes the internet checksum (ones' complement of the ones' complement sum) of `bytes`.
///
/// Words are read in network order; an odd trailing byte is the high byte of a zero-padded word.
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut sum = Checksum::new();
    sum.add_bytes(bytes);
    sum.finish()
}

/// Incremental internet checksum.
///
/// Feeding several spans gives the same result as checksumming their concatenation,
/// which is how the UDP checksum covers pseudo-header and datagram without a scratch copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct Checksum {
    sum: u32,
    /// High byte of a word whose low byte hasn't been seen yet.
    pending: Option<u8>,
}

impl Checksum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        let mut bytes = bytes;
        if let Some(high) = self.pending.take() {
            match bytes.split_first() {
                Some((low, rest)) => {
                    self.add_word(u16::from_be_bytes([high, *low]));
                    bytes = rest;
                }
                None => {
                    self.pending = Some(high);
                    return self;
                }
            }
        }

        let mut words = bytes.chunks_exact(2);
        for word in &mut words {
            self.add_word(u16::from_be_bytes([word[0], word[1]]));
        }
        if let [last] = words.remainder() {
            self.pending = Some(*last);
        }
        self
    }

    fn add_word(&mut self, word: u16) {
        self.sum += u32::from(word);
        if self.sum > 0xffff {
            self.sum = (self.sum & 0xffff) + (self.sum >> 16);
        }
    }

    /// Pads a dangling odd byte and returns the complemented sum.
    pub fn finish(&self) -> u16 {
        let mut sum = *self;
        if let Some(high) = sum.pending.take() {
            sum.add_word(u16::from(high) << 8);
        }
        let mut folded = sum.sum;
        while folded > 0xffff {
            folded = (folded & 0xffff) + (folded >> 16);
        }
        !u16::try_from(folded).unwrap_or_default()
    }
}
