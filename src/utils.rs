use std::time::Duration;

const STEPS_PER_POWER: u32 = 3;

/// Histogram bounds in seconds from `min` to `max`, with a few linear steps
/// inside every power of four. Both ends are always included.
pub fn latency_buckets(min: Duration, max: Duration) -> Vec<f64> {
    let min_ns = min.as_nanos().max(1) as u64;
    let max_ns = max.as_nanos() as u64;

    let mut bounds = vec![min_ns];
    let mut power = 1_u64;
    while power <= max_ns / 4 {
        let next = power * 4;
        let delta = (next - power) / u64::from(STEPS_PER_POWER);
        let mut current = power;
        while current < next {
            if current > min_ns && current < max_ns {
                bounds.push(current);
            }
            current += delta.max(1);
        }
        power = next;
    }
    bounds.push(max_ns);
    bounds.dedup();

    bounds.into_iter().map(|ns| ns as f64 / 1e9).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_include_both_ends() {
        let buckets = latency_buckets(Duration::from_micros(100), Duration::from_secs(10));
        assert_eq!(buckets.first(), Some(&0.0001));
        assert_eq!(buckets.last(), Some(&10.0));
    }

    #[test]
    fn should_be_strictly_increasing() {
        let buckets = latency_buckets(Duration::from_micros(100), Duration::from_secs(10));
        assert!(buckets.len() > 10);
        assert!(buckets.windows(2).all(|w| w[0] < w[1]));
    }
}
