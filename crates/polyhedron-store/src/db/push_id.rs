//! Time-ordered push keys.
//!
//! A push key is 20 characters: 8 encode the millisecond timestamp, 12 are
//! random. The alphabet is in ASCII order, so keys sort lexicographically in
//! creation order. Keys generated within the same millisecond reuse the
//! previous random suffix incremented by one, which keeps them ordered too.

use parking_lot::Mutex;
use rand::Rng;

/// Key alphabet, in ASCII order.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_LEN: usize = 8;
const RAND_LEN: usize = 12;

#[derive(Debug, Default)]
struct State {
    last_time: u64,
    last_rand: [u8; RAND_LEN],
}

/// Generates strictly increasing push keys.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<State>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a key for the current time.
    pub fn generate(&self) -> String {
        self.generate_at(polyhedron_types::now_millis())
    }

    /// Generate a key for `now` (Unix milliseconds).
    ///
    /// A clock that moves backwards is treated as the last seen time so keys
    /// never go out of order.
    pub fn generate_at(&self, now: u64) -> String {
        let mut state = self.state.lock();
        let now = now.max(state.last_time);
        let duplicate = now == state.last_time && state.last_time != 0;
        state.last_time = now;

        if duplicate {
            increment(&mut state.last_rand);
        } else {
            let mut rng = rand::thread_rng();
            for slot in state.last_rand.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
        }

        let mut key = [0u8; TIME_LEN + RAND_LEN];
        let mut t = now;
        for i in (0..TIME_LEN).rev() {
            key[i] = PUSH_CHARS[(t % 64) as usize];
            t /= 64;
        }
        for (i, &r) in state.last_rand.iter().enumerate() {
            key[TIME_LEN + i] = PUSH_CHARS[r as usize];
        }
        // Alphabet is ASCII, so this never fails.
        String::from_utf8_lossy(&key).into_owned()
    }
}

/// Add one to a base-64 digit string, carrying leftwards.
fn increment(digits: &mut [u8; RAND_LEN]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
