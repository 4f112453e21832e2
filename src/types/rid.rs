//! Record identifier type.

use std::fmt;

use crate::types::PageId;

/// A record's address within a table heap: the page holding it and its slot
/// within that page's slotted directory.
///
/// `slot_num = -1` marks an invalid RID, mirroring `PageId::INVALID`. A RID
/// is stable for the lifetime of the record within its heap: slots are never
/// reused by another record in this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page_id: PageId,
    pub slot_num: i32,
}

impl Rid {
    pub const INVALID_SLOT: i32 = -1;

    pub const INVALID: Rid = Rid {
        page_id: PageId::INVALID,
        slot_num: Self::INVALID_SLOT,
    };

    pub const fn new(page_id: PageId, slot_num: i32) -> Self {
        Self { page_id, slot_num }
    }

    pub fn is_valid(&self) -> bool {
        self.page_id.is_valid() && self.slot_num >= 0
    }
}

impl Default for Rid {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id, self.slot_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rid_is_invalid() {
        assert!(!Rid::INVALID.is_valid());
        assert!(!Rid::default().is_valid());
    }

    #[test]
    fn valid_rid() {
        let rid = Rid::new(PageId::new(3), 2);
        assert!(rid.is_valid());
    }
}
