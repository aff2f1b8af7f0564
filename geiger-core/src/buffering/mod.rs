//! Lock-free SPSC ring buffer for live-captured samples.
//!
//! Uses `ringbuf::HeapRb<i16>` which provides a wait-free `push_slice`
//! safe to call from the real-time audio callback.

pub mod chunk;

use ringbuf::{traits::Split, HeapRb};

pub use ringbuf::traits::{Consumer, Observer, Producer};

use crate::Sample;

/// Type alias for the producer half, held by the audio callback thread.
pub type SampleProducer = ringbuf::HeapProd<Sample>;

/// Type alias for the consumer half, held by the pipeline thread.
pub type SampleConsumer = ringbuf::HeapCons<Sample>;

/// Buffer capacity: 2^20 = 1 048 576 samples ≈ 23.8 s at 44.1 kHz.
/// Detection is O(1) per sample, so the pipeline only falls this far behind
/// when it is starved of CPU.
pub const RING_CAPACITY: usize = 1 << 20;

/// Create a matched producer/consumer pair backed by a heap-allocated ring buffer.
pub fn create_sample_ring() -> (SampleProducer, SampleConsumer) {
    create_sample_ring_with_capacity(RING_CAPACITY)
}

/// Same as [`create_sample_ring`] with an explicit capacity (tests use small rings
/// to provoke overruns).
pub fn create_sample_ring_with_capacity(capacity: usize) -> (SampleProducer, SampleConsumer) {
    HeapRb::<Sample>::new(capacity.max(1)).split()
}
