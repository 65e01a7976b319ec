//! Aggregate price level.
//!
//! A [`BookLevel`] is the sum over all live orders resting at one price on one
//! side: total remaining size and number of orders. The same value type is
//! used inside the per-side price maps and inside the top-of-book snapshots
//! copied out of them.
//!
//! # Invariant
//!
//! A level held in a side map is never empty: `size > 0 && count > 0`.
//! Every mutation reports whether the level emptied so the owner can delete
//! it on the spot.
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `absorb` | +size, +1 order |
//! | `release` | -size, -1 order |
//! | `consume` | -size only (partial fill) |

use serde::{Deserialize, Serialize};

/// Aggregated state of all live orders at one price on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct BookLevel {
    /// Fixed-point price
    pub price: i64,
    /// Sum of remaining sizes
    pub size: u64,
    /// Number of live orders
    pub count: u32,
}

impl BookLevel {
    /// Create an empty level at `price`.
    #[inline]
    pub fn new(price: i64) -> Self {
        Self {
            price,
            size: 0,
            count: 0,
        }
    }

    /// Add an order of `size` to this level.
    #[inline]
    pub fn absorb(&mut self, size: u32) {
        self.size = self.size.saturating_add(u64::from(size));
        self.count = self.count.saturating_add(1);
    }

    /// Remove an order whose remaining size is `size`.
    ///
    /// Returns `true` if the level is now empty.
    #[inline]
    pub fn release(&mut self, size: u32) -> bool {
        self.size = self.size.saturating_sub(u64::from(size));
        self.count = self.count.saturating_sub(1);
        self.is_empty()
    }

    /// Reduce the aggregate size without removing an order.
    ///
    /// Returns `true` if the level is now empty.
    #[inline]
    pub fn consume(&mut self, size: u32) -> bool {
        self.size = self.size.saturating_sub(u64::from(size));
        self.is_empty()
    }

    /// Drop one order whose remaining size has already been consumed.
    ///
    /// Returns `true` if the level is now empty.
    #[inline]
    pub fn retire(&mut self) -> bool {
        self.count = self.count.saturating_sub(1);
        self.is_empty()
    }

    /// A level with no size or no orders must not stay in a side map.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0 || self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_level_is_empty() {
        let level = BookLevel::new(10_000);
        assert!(level.is_empty());
        assert_eq!(level.price, 10_000);
        assert_eq!(level.size, 0);
        assert_eq!(level.count, 0);
    }

    #[test]
    fn test_absorb_multiple_orders() {
        let mut level = BookLevel::new(10_000);
        level.absorb(100);
        level.absorb(200);
        level.absorb(150);
        assert_eq!(level.size, 450);
        assert_eq!(level.count, 3);
        assert!(!level.is_empty());
    }

    #[test]
    fn test_release_to_empty() {
        let mut level = BookLevel::new(10_000);
        level.absorb(100);
        level.absorb(200);
        assert!(!level.release(100));
        assert_eq!(level.size, 200);
        assert_eq!(level.count, 1);
        assert!(level.release(200));
    }

    #[test]
    fn test_consume_keeps_count() {
        let mut level = BookLevel::new(10_000);
        level.absorb(10);
        assert!(!level.consume(4));
        assert_eq!(level.size, 6);
        assert_eq!(level.count, 1);
    }

    #[test]
    fn test_consume_then_retire() {
        let mut level = BookLevel::new(10_000);
        level.absorb(10);
        level.absorb(5);
        assert!(!level.consume(10));
        assert!(!level.retire());
        assert_eq!(level.size, 5);
        assert_eq!(level.count, 1);
    }

    #[test]
    fn test_size_reaching_zero_empties_level() {
        let mut level = BookLevel::new(10_000);
        level.absorb(3);
        level.absorb(0);
        assert!(level.consume(3));
        assert_eq!(level.count, 2);
    }

    #[test]
    fn test_overflow_protection() {
        let mut level = BookLevel::new(1);
        level.absorb(u32::MAX);
        level.absorb(u32::MAX);
        assert_eq!(level.size, 2 * u64::from(u32::MAX));
        assert!(!level.release(u32::MAX));
        assert!(level.release(u32::MAX));

        // Releasing from an already empty level saturates at zero
        assert!(level.release(1));
        assert_eq!(level.size, 0);
        assert_eq!(level.count, 0);
    }

    #[test]
    fn test_equality_covers_all_fields() {
        let mut a = BookLevel::new(10_000);
        a.absorb(5);
        let mut b = a;
        assert_eq!(a, b);
        b.absorb(0);
        assert_ne!(a, b);
    }
}
