/// Squared l2 distance. Extra coordinates of the longer slice are ignored.
pub fn euclidean_distance_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Raw dot product. Unlike the cosine-style `1 - ⟨a, b⟩` form, larger means closer.
pub fn inner_product_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_scalar() {
        let a = [0.1, 0.2, 0.3];
        let b = [1.0, 0.0, 1.0];
        let expected = 0.81 + 0.04 + 0.49;
        assert!((euclidean_distance_scalar(&a, &b) - expected).abs() < 1e-6);
        assert_eq!(euclidean_distance_scalar(&a, &a), 0.0);
    }

    #[test]
    fn test_inner_product_scalar() {
        let a = [0.5, -1.0, 2.0];
        let b = [1.0, 1.0, 0.0];
        assert!((inner_product_scalar(&a, &b) + 0.5).abs() < 1e-6);
        assert_eq!(inner_product_scalar(&[], &[]), 0.0);
    }

    #[test]
    fn test_mismatched_lengths_use_shared_prefix() {
        let a = [1.0, 2.0, 3.0];
        let b = [1.0, 0.0];
        assert_eq!(euclidean_distance_scalar(&a, &b), 4.0);
        assert_eq!(euclidean_distance_scalar(&b, &a), 4.0);
        assert_eq!(inner_product_scalar(&a, &b), 1.0);
        assert_eq!(inner_product_scalar(&b, &a), 1.0);
    }
}
