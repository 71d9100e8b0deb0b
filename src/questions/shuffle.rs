use rand::Rng;

/// Shuffle a slice in place with the Fisher–Yates algorithm.
///
/// Walks from the last index down to 1 and swaps each element with a
/// uniformly chosen element in `[0, i]`, so every permutation is equally
/// likely.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}
