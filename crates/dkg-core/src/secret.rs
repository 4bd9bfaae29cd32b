use dkg_crypto::{Point, Scalar};
use std::sync::atomic::{compiler_fence, Ordering};

/// The node's long-term DKG private key, loaded once from configuration.
///
/// Deliberately does not implement `Debug`, `Display`, or `Serialize` — the
/// only way out is [`LocalSecret::scalar`], so a stray `{:?}` in a log
/// statement can't leak it. Zeroized on drop.
pub struct LocalSecret(Scalar);

impl LocalSecret {
    pub fn new(scalar: Scalar) -> Self {
        LocalSecret(scalar)
    }

    pub fn scalar(&self) -> Scalar {
        self.0
    }

    pub fn public_key(&self) -> Point {
        Point::generator().mul_scalar(self.0)
    }
}

impl Drop for LocalSecret {
    fn drop(&mut self) {
        self.0 = Scalar::from(0u64);
        compiler_fence(Ordering::SeqCst);
    }
}
