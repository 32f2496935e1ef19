//! Random LoRA selection
//!
//! Uniform pick over the cached entry list. Seeding from the generation
//! run's seed makes the pick reproducible across reruns.

use crate::models::LoraEntry;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

/// Pick one entry at random, or `None` from an empty list.
///
/// `Some(seed)` derives a deterministic RNG from the run's seed; `None`
/// uses the thread RNG.
pub fn pick(entries: &[LoraEntry], seed: Option<u64>) -> Option<&LoraEntry> {
    let picked = match seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            entries.choose(&mut rng)
        }
        None => entries.choose(&mut rand::thread_rng()),
    };

    if let Some(entry) = picked {
        debug!(name = %entry.name, seed = ?seed, "Selected LoRA");
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SidecarMetadata;
    use std::path::PathBuf;

    fn entries(n: usize) -> Vec<LoraEntry> {
        (0..n)
            .map(|i| {
                LoraEntry::new(
                    PathBuf::from(format!("/models/Lora/lora{}.safetensors", i)),
                    SidecarMetadata::default(),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_list_yields_none() {
        assert!(pick(&[], Some(42)).is_none());
        assert!(pick(&[], None).is_none());
    }

    #[test]
    fn test_single_entry_always_picked() {
        let list = entries(1);
        assert_eq!(pick(&list, None).unwrap().name, "lora0");
        assert_eq!(pick(&list, Some(7)).unwrap().name, "lora0");
    }

    #[test]
    fn test_seeded_pick_is_reproducible() {
        let list = entries(50);
        let first = pick(&list, Some(1234)).unwrap();
        for _ in 0..10 {
            assert_eq!(pick(&list, Some(1234)).unwrap(), first);
        }
    }

    #[test]
    fn test_different_seeds_cover_the_list() {
        let list = entries(10);
        let names: std::collections::HashSet<_> =
            (0..200u64).map(|s| pick(&list, Some(s)).unwrap().name.clone()).collect();
        // 200 seeds over 10 entries should hit more than one of them
        assert!(names.len() > 1);
    }

    #[test]
    fn test_unseeded_pick_stays_in_list() {
        let list = entries(5);
        for _ in 0..20 {
            let picked = pick(&list, None).unwrap();
            assert!(list.contains(picked));
        }
    }
}
