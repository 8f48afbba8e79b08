use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

/// Human-like random pauses, scaled by a single multiplier.
/// A scale of 0 turns every pause into a no-op.
#[derive(Debug, Clone)]
pub struct Pacer {
    scale: f64,
}

impl Pacer {
    pub fn new(scale: f64) -> Self {
        Self {
            scale: scale.max(0.0),
        }
    }

    pub fn instant() -> Self {
        Self { scale: 0.0 }
    }

    /// Sleep a uniform random time between `min_secs` and `max_secs`
    pub async fn pause(&self, min_secs: f64, max_secs: f64) {
        if self.scale == 0.0 {
            return;
        }
        let secs = {
            let mut rng = rand::thread_rng();
            rng.gen_range(min_secs..=max_secs.max(min_secs))
        } * self.scale;
        sleep(Duration::from_secs_f64(secs)).await;
    }

    /// Returns true with probability `p`
    pub fn chance(&self, p: f64) -> bool {
        rand::thread_rng().gen_bool(p.clamp(0.0, 1.0))
    }

    pub fn pixels(&self, min: i64, max: i64) -> i64 {
        rand::thread_rng().gen_range(min..=max)
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn instant_pacer_never_sleeps() {
        let start = Instant::now();
        Pacer::instant().pause(30.0, 60.0).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn pixels_stay_in_range() {
        let pacer = Pacer::instant();
        for _ in 0..100 {
            let px = pacer.pixels(300, 800);
            assert!((300..=800).contains(&px));
        }
        assert!(!pacer.chance(0.0));
        assert!(pacer.chance(1.0));
    }
}
