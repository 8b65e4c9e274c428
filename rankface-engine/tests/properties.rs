use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rankface_engine::rank::{as_f64, kendall_pivot, kendall_tau_b, spearman, weighted_tau};
use rankface_engine::similarity::schroff;
use rankface_engine::{ComparisonMethod, MethodScorer, RankList, Sample, Scorer, SimilarityParams};

const CASES: usize = 200;

fn random_vector(rng: &mut StdRng, len: usize) -> Array1<f64> {
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn random_permutation(rng: &mut StdRng, len: usize) -> Vec<usize> {
    let mut p: Vec<usize> = (0..len).collect();
    p.shuffle(rng);
    p
}

#[test]
fn rank_lists_are_permutations() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..CASES {
        let len = rng.gen_range(1..64);
        let distances: Array1<f64> = (0..len).map(|_| rng.gen_range(0.0..2.0)).collect();
        let ranks = RankList::from_distances(&distances);
        assert!(RankList::try_from(ranks.as_slice().to_vec()).is_ok());

        // the closest cohort entry gets rank 0
        let closest = distances
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(ranks.as_slice()[closest], 0);
    }
}

#[test]
fn rank_lists_with_repeated_distances_are_permutations() {
    let mut rng = StdRng::seed_from_u64(12);
    for _ in 0..CASES {
        let len = rng.gen_range(1..32);
        let distances: Array1<f64> = (0..len).map(|_| rng.gen_range(0..4) as f64).collect();
        let ranks = RankList::from_distances(&distances);
        assert!(RankList::try_from(ranks.as_slice().to_vec()).is_ok());
    }
}

#[test]
fn baseline_is_symmetric_negated_cosine_distance() {
    let mut rng = StdRng::seed_from_u64(13);
    let scorer = MethodScorer::new(ComparisonMethod::Baseline, SimilarityParams::default());
    for _ in 0..CASES {
        let p = Sample::new("p", "a", random_vector(&mut rng, 16));
        let c = Sample::new("c", "b", random_vector(&mut rng, 16));
        let s = scorer.score(&p, &c).unwrap();
        assert_eq!(s, -rankface_engine::distance::cosine(&p.features, &c.features));
        assert_eq!(s, scorer.score(&c, &p).unwrap());
        assert!((-2.0..=0.0).contains(&s));
    }
}

#[test]
fn kendall_variants_agree_and_stay_in_range() {
    let mut rng = StdRng::seed_from_u64(14);
    for _ in 0..CASES {
        let len = rng.gen_range(2..40);
        let x = random_permutation(&mut rng, len);
        let y = random_permutation(&mut rng, len);

        let pivot = kendall_pivot(&x, &y);
        let tau_b = kendall_tau_b(&as_f64(&x), &as_f64(&y));
        assert!((-1.0..=1.0).contains(&pivot));
        assert!((pivot - tau_b).abs() < 1e-9, "{pivot} vs {tau_b}");

        assert!((kendall_pivot(&x, &x) - 1.0).abs() < 1e-12);
        assert!((kendall_tau_b(&as_f64(&x), &as_f64(&x)) - 1.0).abs() < 1e-12);
    }
}

#[test]
fn weighted_tau_and_spearman_stay_in_range() {
    let mut rng = StdRng::seed_from_u64(15);
    for _ in 0..CASES {
        let len = rng.gen_range(2..40);
        let x = as_f64(&random_permutation(&mut rng, len));
        let y = as_f64(&random_permutation(&mut rng, len));

        let w = weighted_tau(&x, &y);
        assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&w));
        assert!((weighted_tau(&x, &x) - 1.0).abs() < 1e-9);

        let rho = spearman(&x, &y);
        assert!((-1.0..=1.0).contains(&rho));
        assert!((spearman(&x, &x) - 1.0).abs() < 1e-12);
    }
}

#[test]
fn schroff_is_non_negative_within_cohort_size() {
    let mut rng = StdRng::seed_from_u64(16);
    for _ in 0..CASES {
        let len = rng.gen_range(1..50);
        let x = random_permutation(&mut rng, len);
        let y = random_permutation(&mut rng, len);
        assert!(schroff(&x, &y, len) >= 0.0);
        assert!(schroff(&x, &y, len) > 0.0);
    }
}
