//! Link diagnostics
//!
//! Runtime faults never stop the link; they are counted here and the state
//! machines return to idle/listening. Counters are written from interrupt
//! context and read from anywhere.

use portable_atomic::{AtomicU32, Ordering};

/// Per-frame runtime faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkFault {
    /// Stop bit sampled low
    Framing,
    /// Valid byte arrived while the RX queue was full; the new byte was dropped
    Overrun,
    /// Start bit was no longer low at its center (line glitch)
    FalseStart,
}

/// Snapshot of the link counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Frames fully clocked out
    pub frames_sent: u32,
    /// Valid frames delivered to the RX queue
    pub frames_received: u32,
    /// Frames discarded for a low stop bit
    pub framing_errors: u32,
    /// Valid frames dropped because the RX queue was full
    pub overruns: u32,
    /// Edges rejected by the start-bit check
    pub false_starts: u32,
}

impl LinkStats {
    /// Total frames lost to faults
    pub fn faults(&self) -> u32 {
        self.framing_errors
            .saturating_add(self.overruns)
            .saturating_add(self.false_starts)
    }
}

/// Live counters shared between interrupt and caller context
#[derive(Debug, Default)]
pub(crate) struct Counters {
    frames_sent: AtomicU32,
    frames_received: AtomicU32,
    framing_errors: AtomicU32,
    overruns: AtomicU32,
    false_starts: AtomicU32,
}

impl Counters {
    pub(crate) const fn new() -> Self {
        Self {
            frames_sent: AtomicU32::new(0),
            frames_received: AtomicU32::new(0),
            framing_errors: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
            false_starts: AtomicU32::new(0),
        }
    }

    pub(crate) fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fault(&self, fault: LinkFault) {
        let counter = match fault {
            LinkFault::Framing => &self.framing_errors,
            LinkFault::Overrun => &self.overruns,
            LinkFault::FalseStart => &self.false_starts,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LinkStats {
        LinkStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            false_starts: self.false_starts.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        self.frames_sent.store(0, Ordering::Relaxed);
        self.frames_received.store(0, Ordering::Relaxed);
        self.framing_errors.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
        self.false_starts.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_counting() {
        let counters = Counters::new();
        counters.fault(LinkFault::Framing);
        counters.fault(LinkFault::Framing);
        counters.fault(LinkFault::Overrun);
        counters.frame_received();

        let stats = counters.snapshot();
        assert_eq!(stats.framing_errors, 2);
        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.false_starts, 0);
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.faults(), 3);
    }

    #[test]
    fn test_reset() {
        let counters = Counters::new();
        counters.frame_sent();
        counters.fault(LinkFault::FalseStart);
        counters.reset();
        assert_eq!(counters.snapshot(), LinkStats::default());
    }
}
