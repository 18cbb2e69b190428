//! Sparse, unbounded VM memory.
//!
//! Memory is a copy-on-write overlay over the loaded program image. Reads
//! fall through the overlay to the image and then to zero; writes only ever
//! touch the overlay. Resetting to the image and diffing against it are
//! therefore proportional to the number of cells written, not to the size of
//! the address space.

use crate::values::{Address, Word};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Memory {
    image: Arc<[Word]>,
    overlay: HashMap<Address, Word>,
    zero: Word,
}

impl Memory {
    pub fn new(image: Arc<[Word]>) -> Self {
        Self {
            image,
            overlay: HashMap::new(),
            zero: Word::default(),
        }
    }

    /// Empty memory with no image; every cell reads as zero.
    pub fn empty() -> Self {
        Self::new(Arc::from(Vec::new()))
    }

    pub fn read(&self, addr: Address) -> &Word {
        if let Some(v) = self.overlay.get(&addr) {
            return v;
        }
        self.baseline(addr)
    }

    pub fn write(&mut self, addr: Address, value: Word) {
        self.overlay.insert(addr, value);
    }

    /// The value `addr` held when the image was loaded.
    pub fn baseline(&self, addr: Address) -> &Word {
        usize::try_from(addr)
            .ok()
            .and_then(|i| self.image.get(i))
            .unwrap_or(&self.zero)
    }

    /// Drop every write since the image was loaded.
    pub fn reset(&mut self) {
        self.overlay.clear();
    }

    /// Cells whose current value differs from the image, sorted by address.
    ///
    /// A cell that was written and later set back to its image value is not
    /// reported: only final values matter.
    pub fn diff_against_image(&self) -> Vec<(Address, Word)> {
        let mut diffs: Vec<(Address, Word)> = self
            .overlay
            .iter()
            .filter(|(addr, value)| self.baseline(**addr) != *value)
            .map(|(addr, value)| (*addr, value.clone()))
            .collect();
        diffs.sort_unstable_by_key(|(addr, _)| *addr);
        diffs
    }

    /// Number of cells written since the last reset.
    pub fn touched(&self) -> usize {
        self.overlay.len()
    }

    pub fn image_len(&self) -> usize {
        self.image.len()
    }
}
