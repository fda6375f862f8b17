use std::sync::Arc;
use std::sync::atomic::AtomicBool;

#[cfg(unix)]
mod imp {
    use std::ffi::c_int;
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, OnceLock};

    use super::AtomicBool;

    // Conventional Linux values.
    const SIGINT: c_int = 2;
    const SIGTERM: c_int = 15;

    type Sighandler = extern "C" fn(c_int);

    unsafe extern "C" {
        fn signal(sig: c_int, handler: Sighandler) -> Sighandler;
    }

    static STOP: OnceLock<Arc<AtomicBool>> = OnceLock::new();

    extern "C" fn handler(_sig: c_int) {
        if let Some(stop) = STOP.get() {
            stop.store(true, Ordering::Relaxed);
        }
    }

    pub fn install(stop: &Arc<AtomicBool>) {
        if STOP.set(Arc::clone(stop)).is_err() {
            tracing::warn!("signal handlers already installed");
            return;
        }
        // SAFETY: `handler` only touches an initialized OnceLock and an atomic.
        unsafe {
            let _ = signal(SIGINT, handler);
            let _ = signal(SIGTERM, handler);
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use super::*;
    pub fn install(_stop: &Arc<AtomicBool>) {}
}

/// Sets `stop` on SIGINT/SIGTERM so the adapters can wind down.
pub fn install_unix_signal_handlers(stop: &Arc<AtomicBool>) {
    imp::install(stop);
}
