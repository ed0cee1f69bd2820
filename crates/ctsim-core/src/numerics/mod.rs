//! Shared numeric primitives: dense real matrices, Vandermonde systems and
//! least-squares polynomial fitting.

pub mod polyfit;

pub use polyfit::{polyfit, polyval, vandermonde, PolyFitError, Polynomial};

use faer::Mat;

pub type DenseMatrix = Mat<f64>;

/// Smallest power of two greater than or equal to `minimum`.
pub fn next_power_of_two_at_least(minimum: usize) -> usize {
    let mut candidate = 1;
    while candidate < minimum {
        candidate *= 2;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::next_power_of_two_at_least;

    #[test]
    fn next_power_of_two_rounds_up() {
        assert_eq!(next_power_of_two_at_least(1), 1);
        assert_eq!(next_power_of_two_at_least(2), 2);
        assert_eq!(next_power_of_two_at_least(3), 4);
        assert_eq!(next_power_of_two_at_least(256), 256);
        assert_eq!(next_power_of_two_at_least(257), 512);
    }
}
