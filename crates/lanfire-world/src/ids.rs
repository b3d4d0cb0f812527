use lanfire_protocol::ObjectId;

/// Hands out [`ObjectId`]s for one match, starting at 1.
///
/// Owned by the session; a new match starts a new allocator. IDs are
/// never reused within a match.
#[derive(Debug)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
