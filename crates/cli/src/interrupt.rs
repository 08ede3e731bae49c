//! Ctrl-C handling.
//!
//! The first Ctrl-C only raises a flag which the delivery loop turns into a
//! cancellation request. A second one exits immediately. The worker runs in its
//! own process group, so it never sees the terminal's Ctrl-C directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use log::debug;
use primme_runner_core::error::Result;

/// Exit code after a repeated Ctrl-C, as a shell reports death by SIGINT.
pub const REPEATED_INTERRUPT_EXIT_CODE: i32 = 130;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static REQUESTED: AtomicBool = AtomicBool::new(false);

/// Records a Ctrl-C. Returns `true` if one was already recorded before.
fn record_interrupt() -> bool {
    if REQUESTED.swap(true, Ordering::SeqCst) {
        return true;
    }

    INTERRUPTED.store(true, Ordering::SeqCst);
    false
}

fn on_interrupt() {
    if record_interrupt() {
        eprintln!("Interrupted again, exiting without waiting for the worker to stop.");
        std::process::exit(REPEATED_INTERRUPT_EXIT_CODE);
    }
    debug!("Ctrl-C received");
}

/// Starts listening for Ctrl-C on a background thread.
///
/// # Errors
///
/// Returns an error if the signal listener or its thread cannot be set up.
#[cfg(unix)]
pub fn install() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    // Registered here so a Ctrl-C right after `install` returns is not missed.
    let mut interrupts = runtime.block_on(async { signal(SignalKind::interrupt()) })?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                while interrupts.recv().await.is_some() {
                    on_interrupt();
                }
            });
        })?;

    Ok(())
}

#[cfg(not(unix))]
pub fn install() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::warn!("Unable to listen for Ctrl-C: {e}");
                        return;
                    }
                    on_interrupt();
                }
            });
        })?;

    Ok(())
}

/// Returns whether Ctrl-C was pressed since the last call.
pub fn take() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}
