use std::ptr::NonNull;

const ADDR_BITS: u32 = 48;
const ADDR_MASK: usize = (1 << ADDR_BITS) - 1;

/// A pointer with a 16-bit count packed into its top bits.
///
/// On the 64-bit targets we support, user-space addresses fit in the low
/// 48 bits, so the top 16 bits of a pointer are free to carry data.
/// The word is kept as a pointer and only re-tagged with `map_addr`,
/// so the address never loses its provenance.
pub(crate) struct TaggedPtr<T> {
    // 16b count | 48b addr
    packed: *mut T,
}

const _: () = assert!(std::mem::size_of::<TaggedPtr<u8>>() == 8);

impl<T> Clone for TaggedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TaggedPtr<T> {}

impl<T> TaggedPtr<T> {
    pub(crate) const fn null() -> Self {
        Self {
            packed: std::ptr::null_mut(),
        }
    }

    #[inline]
    pub(crate) fn get_ref(&self) -> Option<NonNull<T>> {
        NonNull::new(self.packed.map_addr(|addr| addr & ADDR_MASK))
    }

    #[inline]
    pub(crate) fn set_ref(&mut self, ptr: *mut T) {
        assert!(
            ptr.addr() >> ADDR_BITS == 0,
            "pointer {ptr:p} does not fit in {ADDR_BITS} bits"
        );
        let count_bits = self.packed.addr() & !ADDR_MASK;
        self.packed = ptr.map_addr(|addr| addr | count_bits);
    }

    #[inline]
    pub(crate) fn get_count(&self) -> u16 {
        (self.packed.addr() >> ADDR_BITS) as u16
    }

    #[inline]
    pub(crate) fn set_count(&mut self, count: u16) {
        self.packed = self
            .packed
            .map_addr(|addr| (addr & ADDR_MASK) | ((count as usize) << ADDR_BITS));
    }
}
