//! Lock-free hand-off between the control and audio contexts
//!
//! Coefficients travel as whole-value messages through an SPSC ring; the
//! single consumer installs them between blocks, so the audio context can
//! never observe a partially written set. Activation travels as one atomic
//! byte. Stale-by-one-block is acceptable on both paths; torn reads are not.

use portable_atomic::{AtomicU8, Ordering};
use rtrb::{Consumer, Producer, RingBuffer};

use feq_dsp::biquad::BiquadCoeffs;
use feq_dsp::chain::NUM_BANDS;

/// Capacity of the coefficient update queue
pub const UPDATE_QUEUE_CAPACITY: usize = 64;

/// Whole-value update message for the audio side
#[derive(Debug, Clone, Copy)]
pub enum EngineUpdate {
    /// Replace one band's coefficients; delay registers are preserved
    Band { band: usize, coeffs: BiquadCoeffs },
    /// New stream configuration: rate plus all four bands, state zeroed
    Stream {
        sample_rate: f64,
        coeffs: [BiquadCoeffs; NUM_BANDS],
    },
}

/// Create a connected producer/consumer pair
pub fn update_queue(capacity: usize) -> (UpdateProducer, UpdateConsumer) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (UpdateProducer { producer }, UpdateConsumer { consumer })
}

/// Control-context side of the update queue
pub struct UpdateProducer {
    producer: Producer<EngineUpdate>,
}

impl UpdateProducer {
    /// Push an update (non-blocking); false when the ring is full
    pub fn push(&mut self, update: EngineUpdate) -> bool {
        self.producer.push(update).is_ok()
    }
}

/// Audio-context side of the update queue
pub struct UpdateConsumer {
    consumer: Consumer<EngineUpdate>,
}

impl UpdateConsumer {
    /// Pop an update (non-blocking)
    pub fn pop(&mut self) -> Option<EngineUpdate> {
        self.consumer.pop().ok()
    }
}

/// Audible-band bitmask shared across contexts (bit i = band i audible)
pub struct SharedMask {
    bits: AtomicU8,
}

impl SharedMask {
    pub fn new(mask: u8) -> Self {
        Self {
            bits: AtomicU8::new(mask),
        }
    }

    #[inline]
    pub fn publish(&self, mask: u8) {
        self.bits.store(mask, Ordering::Release);
    }

    #[inline]
    pub fn load(&self) -> u8 {
        self.bits.load(Ordering::Acquire)
    }
}
