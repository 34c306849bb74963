//! Destination server selection for CREATE/REPLICATE, shared by §4.3 and
//! §4.5 per spec.md §4.6.
//!
//! `select_ordered` is a direct port of `matocsserv_getservers_ordered`:
//! servers within `maxusagediff` of the minimum usage fraction are
//! shuffled and placed first, those within `maxusagediff` of the maximum
//! are shuffled and placed last, and everything in between is sorted
//! ascending by usage. `select_weighted` is
//! `matocsserv_getservers_wrandom`: a weighted random pick (weight =
//! `total >> 30`) with a per-server `rndcarry` counter so a server that's
//! sampled but loses out this round is more likely to win next round,
//! smoothing the long-run distribution without ever resampling the same
//! host twice in one call.

use std::collections::HashMap;

use crate::geometry::NetworkAddress;

/// One candidate chunkserver's capacity report, as carried by
/// `CSTOMA_SPACE`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerLoad {
    pub address: NetworkAddress,
    pub used: u64,
    pub total: u64,
}

impl ServerLoad {
    pub fn usage_fraction(self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.used as f64 / self.total as f64
        }
    }

    /// Per spec.md §4.6: exclude servers with no capacity, more used than
    /// total (a reporting bug we should not trust), and — for write
    /// allocation — under 1 GiB free.
    pub fn passes_write_filter(self) -> bool {
        const MIN_FREE_BYTES: u64 = 1024 * 1024 * 1024;
        self.total > 0 && self.used <= self.total && self.total - self.used >= MIN_FREE_BYTES
    }
}

/// A source of uniform randomness the selection routines can be tested
/// against deterministically. Production code backs this with an actual
/// RNG; tests can supply a fixed sequence.
pub trait Rng {
    /// Uniform integer in `[0, bound)`. `bound == 0` must never be passed.
    fn next_below(&mut self, bound: usize) -> usize;
}

/// Fisher-Yates shuffle driven by `rng`.
fn shuffle<T>(items: &mut [T], rng: &mut impl Rng) {
    for i in (1..items.len()).rev() {
        let j = rng.next_below(i + 1);
        items.swap(i, j);
    }
}

/// Order `candidates` the way `matocsserv_getservers_ordered` does:
/// low-usage band shuffled first, middle sorted ascending, high-usage
/// band shuffled last. `max_usage_diff` is halved repeatedly (as the
/// original does) if the low and high bands would otherwise overlap the
/// whole set.
pub fn select_ordered(
    candidates: &[ServerLoad],
    max_usage_diff: f64,
    rng: &mut impl Rng,
) -> Vec<NetworkAddress> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let min_usage = candidates.iter().map(|s| s.usage_fraction()).fold(f64::INFINITY, f64::min);
    let max_usage = candidates.iter().map(|s| s.usage_fraction()).fold(f64::NEG_INFINITY, f64::max);

    let mut diff = max_usage_diff;
    if max_usage - min_usage > 0.0 {
        while min_usage + diff >= max_usage - diff && diff > f64::EPSILON {
            diff /= 2.0;
        }
    }

    let mut low: Vec<ServerLoad> = Vec::new();
    let mut mid: Vec<ServerLoad> = Vec::new();
    let mut high: Vec<ServerLoad> = Vec::new();
    for &s in candidates {
        let u = s.usage_fraction();
        if u <= min_usage + diff {
            low.push(s);
        } else if u >= max_usage - diff {
            high.push(s);
        } else {
            mid.push(s);
        }
    }

    shuffle(&mut low, rng);
    mid.sort_by(|a, b| a.usage_fraction().partial_cmp(&b.usage_fraction()).unwrap());
    shuffle(&mut high, rng);

    low.into_iter().chain(mid).chain(high).map(|s| s.address).collect()
}

/// Smoothing state carried between rounds of [`select_weighted`], one
/// entry per server (`rndcarry` in the original).
#[derive(Debug, Default)]
pub struct WeightedSelectionState {
    carry: HashMap<NetworkAddress, i32>,
}

impl WeightedSelectionState {
    pub fn new() -> WeightedSelectionState {
        WeightedSelectionState::default()
    }
}

/// Weight used for large-write destination selection: `total >> 30`
/// (gigabytes of capacity), floored at 1 so a server with nonzero total
/// space always has a chance.
fn weight(load: ServerLoad) -> u64 {
    (load.total >> 30).max(1)
}

/// Pick `count` distinct servers by capacity-weighted random sampling,
/// applying the `rndcarry` smoothing: a server sampled this round but not
/// chosen has its carry incremented; the next call consumes positive
/// carry before falling back to fresh weighted sampling, and decrements
/// carry for servers that *were* chosen, so repeated winners don't run
/// away with every round.
pub fn select_weighted(
    candidates: &[ServerLoad],
    count: usize,
    state: &mut WeightedSelectionState,
    rng: &mut impl Rng,
) -> Vec<NetworkAddress> {
    let mut pool: Vec<ServerLoad> = candidates.to_vec();
    let mut chosen = Vec::new();

    // Pre-select anything with positive carry from previous rounds.
    pool.sort_by_key(|s| std::cmp::Reverse(*state.carry.get(&s.address).unwrap_or(&0)));
    let mut remaining = Vec::new();
    for load in pool {
        if chosen.len() >= count {
            remaining.push(load);
            continue;
        }
        let carry = state.carry.entry(load.address).or_insert(0);
        if *carry > 0 {
            *carry -= 1;
            chosen.push(load);
        } else {
            remaining.push(load);
        }
    }

    while chosen.len() < count && !remaining.is_empty() {
        let total_weight: u64 = remaining.iter().map(|s| weight(*s)).sum();
        if total_weight == 0 {
            break;
        }
        let pick = rng.next_below(total_weight as usize) as u64;
        let mut running = 0u64;
        let mut idx = 0;
        for (i, load) in remaining.iter().enumerate() {
            running += weight(*load);
            if pick < running {
                idx = i;
                break;
            }
        }
        let selected = remaining.remove(idx);
        chosen.push(selected);
    }

    // Servers seen this round but not chosen earn carry toward next time.
    for load in &remaining {
        *state.carry.entry(load.address).or_insert(0) += 1;
    }
    for load in &chosen {
        state.carry.entry(load.address).or_insert(0);
    }

    chosen.into_iter().map(|s| s.address).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct StepRng(Vec<usize>, usize);
    impl Rng for StepRng {
        fn next_below(&mut self, bound: usize) -> usize {
            let v = self.0[self.1 % self.0.len()] % bound.max(1);
            self.1 += 1;
            v
        }
    }

    fn addr(n: u8) -> NetworkAddress {
        NetworkAddress::new(Ipv4Addr::new(10, 0, 0, n), 9422)
    }

    fn load(n: u8, used: u64, total: u64) -> ServerLoad {
        ServerLoad { address: addr(n), used, total }
    }

    #[test]
    fn ordered_selection_sorts_middle_band_ascending() {
        let candidates = vec![load(1, 10, 100), load(2, 50, 100), load(3, 30, 100)];
        let mut rng = StepRng(vec![0], 0);
        let order = select_ordered(&candidates, 0.0, &mut rng);
        // All three sit outside a zero-width low/high band, so all land
        // in the sorted middle.
        assert_eq!(order, vec![addr(1), addr(3), addr(2)]);
    }

    #[test]
    fn write_filter_excludes_near_full_servers() {
        let almost_full = load(1, 1024 * 1024 * 1024 * 10 - 1, 1024 * 1024 * 1024 * 10);
        assert!(!almost_full.passes_write_filter());
        let roomy = load(2, 0, 2 * 1024 * 1024 * 1024);
        assert!(roomy.passes_write_filter());
    }

    #[test]
    fn weighted_selection_respects_count() {
        let candidates = vec![load(1, 0, 1 << 31), load(2, 0, 1 << 31), load(3, 0, 1 << 31)];
        let mut state = WeightedSelectionState::new();
        let mut rng = StepRng(vec![0, 1, 2], 0);
        let picked = select_weighted(&candidates, 2, &mut state, &mut rng);
        assert_eq!(picked.len(), 2);
    }
}
