//! Non-blocking admission gate
//!
//! Capacity one: a caller either gets in immediately or is told to go away.
//! Nobody ever queues behind the holder.

use std::sync::atomic::{AtomicBool, Ordering};

/// Capacity-one gate with try-acquire semantics
#[derive(Debug, Default)]
pub struct AdmissionGate {
    busy: AtomicBool,
}

impl AdmissionGate {
    /// Create an open gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter if nobody holds the gate
    ///
    /// The gate reopens when the returned permit is dropped, including when
    /// the holding future is cancelled.
    pub fn try_enter(&self) -> Option<GatePermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GatePermit { gate: self })
    }

    /// Whether somebody currently holds the gate
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof of admission; releases the gate on drop
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_entry_is_refused_until_release() {
        let gate = AdmissionGate::new();

        let permit = gate.try_enter().expect("open gate admits");
        assert!(gate.is_busy());
        assert!(gate.try_enter().is_none());

        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_enter().is_some());
    }
}
