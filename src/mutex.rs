//! Mutual exclusion between the readout loop and the ADC conversion-complete interrupt.

/// A lock around state that is written from an interrupt handler and read from the readout
/// loop, such as the slot inside a
/// [`CompletionSignal`](::sampler::continuous::CompletionSignal).
///
/// With `std`, `std::sync::Mutex` provides it. With `cortexm`, the provider is a `RefCell` inside
/// `cortex_m::interrupt::Mutex`, and interrupts stay masked while the closure runs. Either feature
/// also selects [`DefaultMutex<T>`].
pub trait IrqMutex<T> {
    /// Wrap `v`.
    fn new(v: T) -> Self;

    /// Run `f` on the guarded value with the lock held and hand back its result. Keep `f` short:
    /// on Cortex-M it runs with interrupts disabled.
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R;
}

#[cfg(feature = "std")]
pub type DefaultMutex<T> = std::sync::Mutex<T>;

#[cfg(all(feature = "cortexm", not(feature = "std")))]
pub type DefaultMutex<T> = cortex_m::interrupt::Mutex<core::cell::RefCell<T>>;

#[cfg(feature = "std")]
impl<T> IrqMutex<T> for std::sync::Mutex<T> {
    fn new(v: T) -> Self {
        std::sync::Mutex::new(v)
    }
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        // A panic while holding the lock cannot leave a completion slot half-written.
        let mut v = match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut v)
    }
}

#[cfg(feature = "cortexm")]
impl<T> IrqMutex<T> for cortex_m::interrupt::Mutex<core::cell::RefCell<T>> {
    fn new(v: T) -> Self {
        cortex_m::interrupt::Mutex::new(core::cell::RefCell::new(v))
    }
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        cortex_m::interrupt::free(|cs| f(&mut self.borrow(cs).borrow_mut()))
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn lock_returns_closure_value() {
        let m: DefaultMutex<u16> = IrqMutex::new(7);
        assert_eq!(IrqMutex::lock(&m, |v| *v), 7);
    }

    #[test]
    fn lock_mutates_in_place() {
        let m: DefaultMutex<Option<u16>> = IrqMutex::new(None);
        IrqMutex::lock(&m, |v| *v = Some(1_234));
        assert_eq!(IrqMutex::lock(&m, |v| v.take()), Some(1_234));
        assert_eq!(IrqMutex::lock(&m, |v| v.take()), None);
    }
}
