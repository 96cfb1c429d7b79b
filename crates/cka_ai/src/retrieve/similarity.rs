use std::collections::BTreeMap;

/// Added to every cosine denominator so a zero-magnitude operand scores 0 instead of dividing by 0.
pub const SIMILARITY_EPSILON: f32 = 1e-10;

pub fn l2_norm(v: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for x in v {
        sum += x * x;
    }
    sum.sqrt()
}

pub fn cosine_similarity(a: &[f32], b: &[f32], a_norm: f32, b_norm: f32) -> f32 {
    let mut dot = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
    }
    finite_or_zero(dot / (a_norm * b_norm + SIMILARITY_EPSILON))
}

pub fn counts_norm(counts: &BTreeMap<String, u32>) -> f32 {
    let mut sum = 0.0f32;
    for c in counts.values() {
        let c = *c as f32;
        sum += c * c;
    }
    sum.sqrt()
}

/// Cosine over sparse term counts; only terms present in both maps contribute to the dot product.
pub fn sparse_cosine_similarity(
    a: &BTreeMap<String, u32>,
    b: &BTreeMap<String, u32>,
    a_norm: f32,
    b_norm: f32,
) -> f32 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut dot = 0.0f32;
    for (term, count) in small {
        if let Some(other) = large.get(term) {
            dot += (*count as f32) * (*other as f32);
        }
    }
    finite_or_zero(dot / (a_norm * b_norm + SIMILARITY_EPSILON))
}

fn finite_or_zero(x: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
