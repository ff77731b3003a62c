use std::collections::HashMap;
use std::hash::Hash;

/// Identifies one started animation; only the latest token of a key may complete it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnimationToken(u64);

/// The live animation token for every animated element.
#[derive(Debug)]
pub struct AnimationSlots<K> {
    next: u64,
    live: HashMap<K, AnimationToken>,
}

impl<K: Copy + Eq + Hash> Default for AnimationSlots<K> {
    fn default() -> Self {
        Self {
            next: 0,
            live: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> AnimationSlots<K> {
    /// Issues a fresh token for `key`, invalidating whatever was running there.
    pub fn start(&mut self, key: K) -> AnimationToken {
        self.next += 1;
        let token = AnimationToken(self.next);
        self.live.insert(key, token);
        token
    }

    pub fn is_current(&self, key: K, token: AnimationToken) -> bool {
        self.live.get(&key) == Some(&token)
    }

    /// Retires `token` if it is still the live one for `key`. Stale completions return `false`.
    pub fn complete(&mut self, key: K, token: AnimationToken) -> bool {
        if !self.is_current(key, token) {
            return false;
        }
        self.live.remove(&key);
        true
    }

    pub fn cancel(&mut self, key: K) {
        self.live.remove(&key);
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.live.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    pub started_at: f64,
    pub duration_secs: f32,
}

impl Tween {
    pub fn new(started_at: f64, duration_secs: f32) -> Self {
        Self {
            started_at,
            duration_secs,
        }
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now: f64) -> f32 {
        if self.duration_secs <= 0.0 {
            return 1.0;
        }
        (((now - self.started_at) / self.duration_secs as f64) as f32).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.progress(now) >= 1.0
    }
}

pub fn ease_cubic_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t * 0.5
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) * 0.5
    }
}
