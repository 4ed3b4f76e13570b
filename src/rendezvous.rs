use core::sync::atomic::{AtomicU8, Ordering};

const RESOLVED: u8 = 0;
const PENDING: u8 = 1;

/// One-slot suspend/resume state shared between the foreground protocol caller and
/// interrupt context. The command/response engine arms the slot before driving the bus,
/// the ISR side resolves it through [`Sideband`](crate::Sideband), and the transport's
/// [`suspend`](crate::Transport::suspend) blocks until it resolves or a timeout elapses.
///
/// Exactly one suspend may be outstanding per slot. Resolving while nothing is pending
/// is a harmless no-op.
pub struct Rendezvous(AtomicU8);

impl Rendezvous {
    pub const fn new() -> Self {
        Self(AtomicU8::new(RESOLVED))
    }

    /// Marks the slot pending. Called by the engine before a wait, and by suspend
    /// implementations before returning so the next wait starts from a known state.
    pub fn arm(&self) {
        self.0.store(PENDING, Ordering::Release);
    }

    /// Resolves a pending suspend. Safe to call from interrupt context.
    pub fn resolve(&self) {
        self.0.store(RESOLVED, Ordering::Release);
    }

    /// Returns `true` while a suspend is still waiting to be resolved.
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire) == PENDING
    }
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}
