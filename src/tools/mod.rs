//! Stateless utilities served under `/api/*`.
//!
//! Everything here is a pure function over its request except
//! [`shortener`], which relays to an upstream service.

pub mod base64_codec;
pub mod palette;
pub mod password;
pub mod qr;
pub mod shortener;

/// Request-level failure of a local tool. Always the caller's fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidInput(String),
}

impl ToolError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Uniform index in `0..len` from the thread CSPRNG, without modulo bias.
pub(crate) fn random_index(len: usize) -> usize {
    debug_assert!(len > 0, "random_index needs a non-empty range");
    let len = len.max(1) as u64;
    let zone = u64::MAX - (u64::MAX % len);
    loop {
        let value: u64 = rand::random();
        if value < zone {
            return (value % len) as usize;
        }
    }
}

/// In-place Fisher-Yates shuffle.
pub(crate) fn shuffle<T>(items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = random_index(i + 1);
        items.swap(i, j);
    }
}
