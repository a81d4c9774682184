//! Notifications from the dump engine to its host

/// Receives progress and status notifications from [`crate::RomDump`]
///
/// All methods are called synchronously from [`crate::RomDump::step`]. `lock`
/// is always delivered before the first firmware request of a dump and
/// `unlock` before the engine returns to [`crate::State::Ready`].
///
/// Every method has a default implementation forwarding to the `log` crate.
pub trait DumpEvents {
    /// User facing status message
    fn log(&mut self, message: &str) {
        log::info!("romdump: {}", message);
    }

    /// Diagnostic message
    fn debug(&mut self, message: &str) {
        log::debug!("romdump: {}", message);
    }

    /// A dump started; port and bank-switching settings must not change
    fn lock(&mut self) {}

    /// Settings may be changed again
    fn unlock(&mut self) {}

    /// A dump finished successfully with the given image
    fn finished(&mut self, _rom: &[u8]) {}

    /// A dump failed, timed out or was aborted
    fn aborted(&mut self) {}
}

/// Event handler that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEvents;

impl DumpEvents for LogEvents {}

impl<E: DumpEvents + ?Sized> DumpEvents for &mut E {
    fn log(&mut self, message: &str) {
        (**self).log(message)
    }

    fn debug(&mut self, message: &str) {
        (**self).debug(message)
    }

    fn lock(&mut self) {
        (**self).lock()
    }

    fn unlock(&mut self) {
        (**self).unlock()
    }

    fn finished(&mut self, rom: &[u8]) {
        (**self).finished(rom)
    }

    fn aborted(&mut self) {
        (**self).aborted()
    }
}
