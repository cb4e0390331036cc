// Common trait for sampling from and testing membership of spaces.

use rand::Rng;

/// A trait implemented by every space type.
/// Element is the value type that lives in the space (e.g., i64 for Discrete,
/// or an `NdArray` for a Box).
pub trait Domain {
    type Element;

    /// Draw a sample from the space using the provided RNG.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element;

    /// Return true if the given element is a valid member of the space.
    fn contains(&self, elem: &Self::Element) -> bool;
}
