// src/signals.rs

//! SIGINT/SIGTERM handling. The handler only flips an atomic; the pipeline
//! polls it between frames.

use anyhow::{Context, Result};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_interrupt(_signum: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Routes SIGINT and SIGTERM to the interrupt flag.
pub fn install_interrupt_handler() -> Result<&'static AtomicBool> {
    let action = SigAction::new(
        SigHandler::Handler(on_interrupt),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only performs an atomic store, which is async-signal-safe.
        unsafe { sigaction(signal, &action) }
            .with_context(|| format!("Failed to install {signal} handler"))?;
    }
    Ok(&INTERRUPTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::raise;

    #[test]
    fn sigterm_raises_the_interrupt_flag() {
        let flag = install_interrupt_handler().unwrap();
        raise(Signal::SIGTERM).unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }
}
