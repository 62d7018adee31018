// Safe arithmetic helpers.

/// Divides two counters, returning 0.0 if the denominator is zero.
pub fn divide(a: u64, b: u64) -> f64 {
    if b == 0 {
        return 0.0;
    }
    a as f64 / b as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide() {
        assert_eq!(divide(10, 4), 2.5);
        assert_eq!(divide(10, 0), 0.0);
        assert_eq!(divide(0, 5), 0.0);
    }
}
