//! Pooling helpers for in-process encoder models.

/// Mean-pool token representations over non-padding positions and L2-normalize the result.
///
/// `hidden` holds one row per token, `attention_mask` marks real tokens with a non-zero
/// value. Rows beyond the mask length are ignored. Returns a zero vector when no token is
/// marked.
pub fn masked_mean_pool(hidden: &[Vec<f32>], attention_mask: &[u32]) -> Vec<f32> {
    let width = hidden.first().map_or(0, Vec::len);
    let mut pooled = vec![0.0_f32; width];
    let mut count = 0_usize;

    for (row, mask) in hidden.iter().zip(attention_mask) {
        if *mask == 0 {
            continue;
        }
        count += 1;
        for (acc, value) in pooled.iter_mut().zip(row) {
            *acc += value;
        }
    }

    if count == 0 {
        return pooled;
    }

    let denom = count as f32;
    for value in &mut pooled {
        *value /= denom;
    }
    l2_normalize(&mut pooled);
    pooled
}

/// Scale `vector` to unit length in place; zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
