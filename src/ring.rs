//! Fixed-size ring of bucket counters

/// Fixed-length circular array of counters
///
/// The ring keeps a logical `head` so that callers always address
/// slots relative to it: logical index `0` is whichever physical
/// slot currently sits at `head`. Rolling the ring forward clears the
/// slots that fall out of the window and moves the head, without
/// shifting any data around.
///
/// The length is fixed by the generic argument `N` and the storage
/// lives inline, so a ring never allocates and never grows.
///
/// ```text
/// slots: [1 2 3]  head = 0
/// advance(2)
/// slots: [0 0 3]  head = 2   (logical 0 -> physical 2)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRing<const N: usize> {
    slots: [u64; N],
    head: usize,
}

impl<const N: usize> BucketRing<N> {
    const NON_EMPTY: () = assert!(N > 0, "a bucket ring needs at least one slot");

    /// Create a ring with every slot set to zero
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Self {
            slots: [0; N],
            head: 0,
        }
    }

    /// Create a ring from known slot contents
    ///
    /// # Arguments
    /// * `slots` - physical slot contents
    /// * `head` - physical index of logical slot 0, taken modulo `N`
    pub const fn from_slots(slots: [u64; N], head: usize) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Self {
            slots,
            head: head % N,
        }
    }

    /// Total of all slots
    pub fn sum(&self) -> u64 {
        self.slots
            .iter()
            .fold(0u64, |acc, slot| acc.saturating_add(*slot))
    }

    /// Number of slots, always `N`
    pub const fn size(&self) -> usize {
        N
    }

    /// Physical index of logical slot 0
    pub const fn head(&self) -> usize {
        self.head
    }

    /// Read the slot at a logical index
    pub fn get(&self, logical: usize) -> u64 {
        self.slots[self.physical(logical)]
    }

    /// Apply `f` to every slot in the inclusive logical range `[start, end]`
    ///
    /// Logical indices are relative to the head and wrap around the
    /// ring, so callers never need to know the physical layout. An
    /// inverted range (`end < start`) visits nothing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ringlimit::BucketRing;
    ///
    /// // [1 2 3] with head at 1
    /// let mut ring = BucketRing::from_slots([1, 2, 3], 1);
    ///
    /// // Logical 1..=2 maps to physical [2, 0]
    /// let mut seen = Vec::new();
    /// ring.access(1, 2, |v| seen.push(*v));
    /// assert_eq!(seen, [3, 1]);
    /// ```
    pub fn access<F>(&mut self, start: usize, end: usize, mut f: F)
    where
        F: FnMut(&mut u64),
    {
        if end < start {
            return;
        }

        for logical in start..=end {
            let index = self.physical(logical);
            f(&mut self.slots[index]);
        }
    }

    /// Move the head forward by `steps` slots
    ///
    /// Slots passed over by the head have aged out of the window and
    /// are zeroed before the head moves. Moving by `N` or more clears
    /// the whole ring, and moving by zero changes nothing.
    pub fn advance(&mut self, steps: u64) {
        if steps == 0 {
            return;
        }

        let expired = steps.min(N as u64) as usize;
        self.access(0, expired - 1, |slot| *slot = 0);
        self.head = (self.head + (steps % N as u64) as usize) % N;
    }

    /// Zero every slot, leaving the head in place
    pub fn clear(&mut self) {
        self.slots.fill(0);
    }

    #[inline]
    fn physical(&self, logical: usize) -> usize {
        (self.head + logical % N) % N
    }
}

impl<const N: usize> Default for BucketRing<N> {
    fn default() -> Self {
        Self::new()
    }
}
