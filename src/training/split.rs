// Label-stratified train/evaluation split with a fixed seed.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[derive(Debug, Clone, PartialEq)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub eval: Vec<T>,
}

/// Split `rows` so each label keeps its share in both partitions.
///
/// Per label with `n` rows, `round(n * eval_ratio)` go to evaluation, capped
/// at `n - 1` so every label is still present in training. The same input,
/// ratio and seed always produce the same partitions.
pub fn stratified_split<T>(
    rows: Vec<T>,
    label: impl Fn(&T) -> bool,
    eval_ratio: f64,
    seed: u64,
) -> Split<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    let ratio = eval_ratio.clamp(0.0, 1.0);

    let (mut positives, mut negatives): (Vec<T>, Vec<T>) = rows.into_iter().partition(|r| label(r));

    let mut train = Vec::new();
    let mut eval = Vec::new();

    for class in [&mut negatives, &mut positives] {
        if class.is_empty() {
            continue;
        }
        class.shuffle(&mut rng);
        let n = class.len();
        let n_eval = ((n as f64 * ratio).round() as usize).min(n - 1);
        let rest = class.split_off(n_eval);
        eval.append(class);
        train.extend(rest);
    }

    train.shuffle(&mut rng);
    eval.shuffle(&mut rng);

    Split { train, eval }
}
