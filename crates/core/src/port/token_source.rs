// Token Source Port (opaque work item payloads)

use rand::RngCore;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of random bytes behind each production token
pub const TOKEN_BYTES: usize = 5;

/// Token source interface (allows deterministic tokens in tests)
pub trait TokenSource: Send + Sync {
    /// Generate a new opaque token
    fn next_token(&self) -> String;
}

/// Random bytes rendered as lowercase hex (production)
pub struct RandomHexTokens {
    bytes: usize,
}

impl RandomHexTokens {
    pub fn new(bytes: usize) -> Self {
        Self { bytes }
    }
}

impl Default for RandomHexTokens {
    fn default() -> Self {
        Self::new(TOKEN_BYTES)
    }
}

impl TokenSource for RandomHexTokens {
    fn next_token(&self) -> String {
        let mut buf = vec![0u8; self.bytes];
        rand::thread_rng().fill_bytes(&mut buf);
        buf.iter().fold(String::with_capacity(self.bytes * 2), |mut out, b| {
            let _ = write!(out, "{:02x}", b);
            out
        })
    }
}

/// Sequential tokens `item-1`, `item-2`, ... (tests)
#[derive(Default)]
pub struct SequentialTokens {
    counter: AtomicU64,
}

impl TokenSource for SequentialTokens {
    fn next_token(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("item-{}", n)
    }
}
