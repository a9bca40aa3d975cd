//! Bounded history buffer for the CPU chart.

use std::collections::VecDeque;

/// Samples kept for the sparkline; wider than any realistic terminal.
pub const HISTORY_CAP: usize = 600;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if cap == 0 {
        return;
    }
    while dq.len() >= cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

/// The newest `n` samples, oldest first.
pub fn tail<T: Copy>(dq: &VecDeque<T>, n: usize) -> Vec<T> {
    let start = dq.len().saturating_sub(n);
    dq.iter().skip(start).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_at_capacity() {
        let mut dq = VecDeque::new();
        for v in 0..5 {
            push_capped(&mut dq, v, 3);
        }
        assert_eq!(dq, VecDeque::from(vec![2, 3, 4]));
    }

    #[test]
    fn zero_cap_keeps_nothing() {
        let mut dq = VecDeque::new();
        push_capped(&mut dq, 1, 0);
        assert!(dq.is_empty());
    }

    #[test]
    fn tail_is_newest_in_order() {
        let dq: VecDeque<u64> = (1..=6).collect();
        assert_eq!(tail(&dq, 2), vec![5, 6]);
        assert_eq!(tail(&dq, 10).len(), 6);
    }
}
