use std::cmp::Ordering;

/// Additive guard for zero-norm vectors and degenerate denominators.
pub const EPSILON: f32 = 1e-9;

/// Cosine similarity with an epsilon-guarded denominator.
///
/// Zero vectors yield `0.0` instead of NaN. Inputs must share a dimension; callers validate this
/// at their boundary.
pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> f32 {
	debug_assert_eq!(lhs.len(), rhs.len());

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	dot / (lhs_norm.sqrt() * rhs_norm.sqrt() + EPSILON)
}

pub fn l2_normalize(vector: &[f32]) -> Vec<f32> {
	let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();

	vector.iter().map(|value| value / (norm + EPSILON)).collect()
}

/// Element-wise mean. Returns `None` for an empty input or mixed dimensions.
pub fn mean<'a, I>(vectors: I) -> Option<Vec<f32>>
where
	I: IntoIterator<Item = &'a [f32]>,
{
	let mut iter = vectors.into_iter();
	let first = iter.next()?;
	let mut sum = first.to_vec();
	let mut count = 1_usize;

	for vector in iter {
		if vector.len() != sum.len() {
			return None;
		}

		for (acc, value) in sum.iter_mut().zip(vector) {
			*acc += value;
		}

		count += 1;
	}

	for value in &mut sum {
		*value /= count as f32;
	}

	Some(sum)
}

/// Descending order for scores; NaN sorts last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
