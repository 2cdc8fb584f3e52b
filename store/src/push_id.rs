//! Push ids: 20-character keys that are unique and sort lexicographically
//! in generation order. 8 characters encode the millisecond timestamp, 12
//! are random; within one millisecond the random tail is incremented so
//! order survives ties.

use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

pub struct PushIdGenerator {
    last_time_ms: i64,
    // Indices into PUSH_CHARS, most significant first.
    last_rand: [u8; 12],
}

impl Default for PushIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self {
            last_time_ms: -1,
            last_rand: [0; 12],
        }
    }

    pub fn generate(&mut self, now_ms: i64, rng: &mut impl Rng) -> String {
        if now_ms == self.last_time_ms {
            // Same millisecond: increment the previous tail.
            for slot in self.last_rand.iter_mut().rev() {
                if *slot < 63 {
                    *slot += 1;
                    break;
                }
                *slot = 0;
            }
        } else {
            self.last_time_ms = now_ms;
            for slot in self.last_rand.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
        }

        let mut id = [0u8; 20];
        let mut ts = now_ms;
        for i in (0..8).rev() {
            id[i] = PUSH_CHARS[(ts % 64) as usize];
            ts /= 64;
        }
        for (i, slot) in self.last_rand.iter().enumerate() {
            id[8 + i] = PUSH_CHARS[*slot as usize];
        }
        String::from_utf8(id.to_vec()).expect("push chars are ascii")
    }
}
