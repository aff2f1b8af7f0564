//! Event sinks: where accepted pulses go.
//!
//! Sinks are called synchronously from the thread that runs the engine, zero
//! or more times per chunk, in non-decreasing time order. A sink attached to
//! the live pipeline runs on the pipeline thread, never on the audio
//! callback thread.

use crate::events::PeakEvent;

/// Receiver of accepted peak events.
pub trait EventSink {
    fn on_event(&mut self, event: PeakEvent);
}

impl EventSink for Vec<PeakEvent> {
    fn on_event(&mut self, event: PeakEvent) {
        self.push(event);
    }
}

/// Forwards events to another thread. A dropped receiver is ignored so the
/// pipeline never fails because the consumer went away first.
impl EventSink for crossbeam_channel::Sender<PeakEvent> {
    fn on_event(&mut self, event: PeakEvent) {
        let _ = self.send(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_event(&mut self, event: PeakEvent) {
        (**self).on_event(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn on_event(&mut self, event: PeakEvent) {
        (**self).on_event(event);
    }
}

/// Adapts a closure into an [`EventSink`].
pub struct FnSink<F>(pub F);

impl<F: FnMut(PeakEvent)> EventSink for FnSink<F> {
    fn on_event(&mut self, event: PeakEvent) {
        (self.0)(event);
    }
}

/// Discards every event; useful when only the summary matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&mut self, _event: PeakEvent) {}
}
