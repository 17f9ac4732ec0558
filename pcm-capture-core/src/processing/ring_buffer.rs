/// Frame-aligned circular byte buffer for interleaved PCM.
///
/// Stands in for a driver's internal ring: a producer (audio callback) writes
/// whole frames, a consumer drains them in transfer chunks. Not synchronized;
/// wrap in `parking_lot::Mutex` for cross-thread access.
///
/// Overflow behavior: drops the oldest whole frames and counts them.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<u8>,
    frame_bytes: usize,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
    overrun_bytes: u64,
}

impl RingBuffer {
    /// `capacity` is rounded down to whole frames (at least one frame).
    pub fn new(capacity: usize, frame_bytes: usize) -> Self {
        let frame_bytes = frame_bytes.max(1);
        let capacity = (capacity / frame_bytes).max(1) * frame_bytes;
        Self {
            buffer: vec![0; capacity],
            frame_bytes,
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
            overrun_bytes: 0,
        }
    }

    /// Write bytes into the ring buffer.
    ///
    /// Trailing bytes that do not form a whole frame are ignored. If the
    /// buffer overflows, the oldest frames are dropped; if `data` is larger
    /// than capacity, only the last `capacity` bytes are kept.
    pub fn write(&mut self, data: &[u8]) {
        let whole = data.len() - data.len() % self.frame_bytes;
        if whole == 0 {
            return;
        }
        let mut data = &data[..whole];

        if data.len() > self.capacity {
            let skipped = data.len() - self.capacity;
            self.overrun_bytes += skipped as u64;
            data = &data[skipped..];
        }

        let overflow = (self.available + data.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
            self.overrun_bytes += overflow as u64;
        }

        let first = data.len().min(self.capacity - self.write_index);
        self.buffer[self.write_index..self.write_index + first].copy_from_slice(&data[..first]);
        self.buffer[..data.len() - first].copy_from_slice(&data[first..]);
        self.write_index = (self.write_index + data.len()) % self.capacity;
        self.available += data.len();
    }

    /// Move up to `out.len()` bytes, rounded down to whole frames, into `out`.
    ///
    /// Returns the number of bytes copied.
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        let wanted = out.len() - out.len() % self.frame_bytes;
        let to_read = wanted.min(self.available);
        if to_read == 0 {
            return 0;
        }

        let first = to_read.min(self.capacity - self.read_index);
        out[..first].copy_from_slice(&self.buffer[self.read_index..self.read_index + first]);
        out[first..to_read].copy_from_slice(&self.buffer[..to_read - first]);
        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        to_read
    }

    /// Number of bytes currently available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Total bytes dropped because the consumer fell behind.
    pub fn overrun_bytes(&self) -> u64 {
        self.overrun_bytes
    }

    /// Reset the buffer to empty state. The overrun count is kept.
    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
