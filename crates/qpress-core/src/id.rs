use serde::{Deserialize, Serialize};

/// Identifies a center within its zone. The index is the center's position
/// in route order, so ordering ids orders centers along the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CenterId(pub u32);

impl CenterId {
    /// Position of the center in route order.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies a route segment by its position in the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

impl SegmentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_id_orders_by_route_position() {
        assert!(CenterId(0) < CenterId(1));
        assert_eq!(CenterId(3).index(), 3);
    }

    #[test]
    fn segment_id_copy() {
        let a = SegmentId(5);
        let b = a;
        assert_eq!(a, b);
        assert_eq!(b.index(), 5);
    }
}
