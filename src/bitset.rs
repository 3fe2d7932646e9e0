use crate::block::{Block, BlockStats};
use crate::iterators::{Cursor, IterMode, Ones};
use crate::stats::record_alloc;
use crate::{bit_count_to_block_count, BlockBitAddr, Error, Index, Result, BITS_PER_BLOCK};
use core::fmt::Debug;
use std::rc::Rc;
use tracing::{debug, trace};

type Slot = Option<Rc<Block>>;

/// A set of indexes in `0..bit_count`, stored as a sequence of lazily allocated
/// blocks of [`BITS_PER_BLOCK`](crate::BITS_PER_BLOCK) bits each.
///
/// An absent block reads as all zeroes. Blocks are shared between a bitset and
/// its duplicates until one of them writes to the block, at which point the
/// writer takes a private copy.
///
/// Operations that walk many blocks (`union`, `invert`, ...) are not atomic: if
/// an allocation fails midway, the blocks already visited keep their new
/// contents and the remaining ones are untouched.
pub struct Bitset {
    // invariant: blocks.len() == bit_count_to_block_count(bit_count)
    // invariant: no block holds a 1-bit at or beyond bit_count
    blocks: Vec<Slot>,
    bit_count: usize,
}

fn alloc_slots(block_count: usize) -> Result<Vec<Slot>> {
    let bytes = block_count * core::mem::size_of::<Slot>();
    let mut blocks = Vec::new();
    blocks.try_reserve_exact(block_count).map_err(|_| Error::OutOfMemory { bytes })?;
    if bytes > 0 {
        record_alloc(bytes);
    }
    Ok(blocks)
}

/// Returns the block behind `rc`, first replacing it with a private copy if
/// any other bitset still refers to it.
fn make_exclusive(rc: &mut Rc<Block>) -> Result<&mut Block> {
    if Rc::strong_count(rc) > 1 {
        let copy = rc.try_clone()?;
        trace!(share_count = Rc::strong_count(rc), "copying shared block on write");
        *rc = copy.into_shared();
    }
    Ok(Rc::get_mut(rc).expect("block written while shared"))
}

/// Like `make_exclusive`, but allocates a zeroed block into an absent slot.
fn materialize(slot: &mut Slot) -> Result<&mut Block> {
    if slot.is_none() {
        trace!("materializing block");
        *slot = Some(Block::try_zeroed()?.into_shared());
    }
    match slot {
        Some(rc) => make_exclusive(rc),
        None => unreachable!(),
    }
}

impl Bitset {
    /// Creates a bitset of `bit_count` bits, all zero. No block is allocated.
    pub fn allocate(bit_count: usize) -> Result<Self> {
        let block_count = bit_count_to_block_count(bit_count);
        let mut blocks = alloc_slots(block_count)?;
        blocks.resize(block_count, None);
        debug!(bit_count, block_count, "allocated bitset");
        Ok(Self { blocks, bit_count })
    }
    /// Creates a bitset with the same contents, sharing every present block.
    /// Costs O(block_count) regardless of how many bits are set.
    pub fn duplicate(&self) -> Result<Self> {
        let mut blocks = alloc_slots(self.blocks.len())?;
        blocks.extend(self.blocks.iter().cloned());
        debug!(bit_count = self.bit_count, shared = self.present_block_count(), "duplicated bitset");
        Ok(Self { blocks, bit_count: self.bit_count })
    }

    pub fn bit_count(&self) -> usize {
        self.bit_count
    }
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
    /// Number of 1-bits, summed from the cached per-block counts.
    pub fn population_count(&self) -> usize {
        self.blocks.iter().flatten().map(|block| block.set_count()).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.population_count() == 0
    }
    /// `None` if the block at `idx_of_block` is absent (or out of range).
    pub fn block_stats(&self, idx_of_block: usize) -> Option<BlockStats> {
        self.blocks.get(idx_of_block)?.as_ref().map(|rc| BlockStats {
            set_count: rc.set_count(),
            share_count: Rc::strong_count(rc),
        })
    }
    fn present_block_count(&self) -> usize {
        self.blocks.iter().flatten().count()
    }

    pub(crate) fn block(&self, idx_of_block: usize) -> Option<&Block> {
        self.blocks[idx_of_block].as_deref()
    }
    /// Index of the first present block at or after `start`, or `block_count()`.
    pub(crate) fn next_present_block(&self, start: usize) -> usize {
        self.blocks
            .iter()
            .skip(start)
            .position(Option::is_some)
            .map_or(self.blocks.len(), |offset| start + offset)
    }
    /// Number of addressable bits in the block at `idx_of_block`.
    fn valid_bits_in(bit_count: usize, idx_of_block: usize) -> usize {
        (bit_count - idx_of_block * BITS_PER_BLOCK).min(BITS_PER_BLOCK)
    }
    fn check_bit(&self, bit: Index) -> Result<BlockBitAddr> {
        if bit < self.bit_count {
            Ok(BlockBitAddr::from_bit_idx(bit))
        } else {
            Err(Error::BitOutOfRange { bit, bit_count: self.bit_count })
        }
    }
    fn check_same_size(&self, other: &Bitset) -> Result<()> {
        if self.bit_count == other.bit_count {
            debug_assert_eq!(self.blocks.len(), other.blocks.len());
            Ok(())
        } else {
            Err(Error::SizeMismatch { left: self.bit_count, right: other.bit_count })
        }
    }

    /////////////////////////////////////////////

    pub fn test_bit(&self, bit: Index) -> Result<bool> {
        let bba = self.check_bit(bit)?;
        Ok(self.blocks[bba.idx_of_block].as_ref().is_some_and(|b| b.test_bit(bba.idx_in_block)))
    }
    /// Sets the bit to 1. Returns whether it was 0 before i.e. the set has changed.
    pub fn set(&mut self, bit: Index) -> Result<bool> {
        let bba = self.check_bit(bit)?;
        let slot = &mut self.blocks[bba.idx_of_block];
        if slot.as_ref().is_some_and(|b| b.test_bit(bba.idx_in_block)) {
            return Ok(false);
        }
        Ok(materialize(slot)?.set_bit(bba.idx_in_block))
    }
    /// Sets the bit to 0. Returns whether it was 1 before i.e. the set has changed.
    pub fn clear(&mut self, bit: Index) -> Result<bool> {
        let bba = self.check_bit(bit)?;
        match &mut self.blocks[bba.idx_of_block] {
            Some(rc) if rc.test_bit(bba.idx_in_block) => {
                Ok(make_exclusive(rc)?.clear_bit(bba.idx_in_block))
            }
            // absent or already clear
            _ => Ok(false),
        }
    }
    /// Flips the bit. Returns its new value.
    pub fn toggle(&mut self, bit: Index) -> Result<bool> {
        let bba = self.check_bit(bit)?;
        // an absent block must be materialized, toggling a 0 yields a 1
        Ok(materialize(&mut self.blocks[bba.idx_of_block])?.toggle_bit(bba.idx_in_block))
    }

    /////////////////////////////////////////////

    /// In-place `self | other`.
    pub fn union(&mut self, other: &Bitset) -> Result<()> {
        self.check_same_size(other)?;
        for (dest, src) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            let Some(src) = src else { continue };
            match dest {
                None => *dest = Some(Rc::clone(src)),
                Some(rc) if Rc::ptr_eq(rc, src) => {}
                Some(rc) => make_exclusive(rc)?.or(src),
            }
        }
        Ok(())
    }
    /// In-place `self & other`.
    pub fn intersect(&mut self, other: &Bitset) -> Result<()> {
        self.check_same_size(other)?;
        for (dest, src) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            match src {
                None => {
                    if dest.take().is_some() {
                        trace!("released block on intersect");
                    }
                }
                Some(src) => match dest {
                    None => {}
                    Some(rc) if Rc::ptr_eq(rc, src) => {}
                    Some(rc) => make_exclusive(rc)?.and(src),
                },
            }
        }
        Ok(())
    }
    /// In-place `self - other`.
    pub fn subtract(&mut self, other: &Bitset) -> Result<()> {
        self.check_same_size(other)?;
        for (dest, src) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            let Some(src) = src else { continue };
            let Some(rc) = dest.as_mut() else { continue };
            if Rc::ptr_eq(rc, src) {
                // a block minus itself
                *dest = None;
            } else {
                make_exclusive(rc)?.subtract(src);
            }
        }
        Ok(())
    }
    /// Flips every bit in `0..bit_count`.
    ///
    /// Absent blocks become full blocks and full blocks become absent, so both
    /// the empty and the full set stay cheap.
    pub fn invert(&mut self) -> Result<()> {
        let bit_count = self.bit_count;
        for (idx_of_block, slot) in self.blocks.iter_mut().enumerate() {
            let valid_bits = Self::valid_bits_in(bit_count, idx_of_block);
            match slot {
                None => *slot = Some(Block::try_full(valid_bits)?.into_shared()),
                Some(rc) => {
                    if rc.set_count() == valid_bits {
                        *slot = None;
                    } else {
                        make_exclusive(rc)?.invert(valid_bits);
                    }
                }
            }
        }
        Ok(())
    }

    /// Non-destructive [`invert`](Self::invert).
    pub fn inverse(&self) -> Result<Bitset> {
        let mut result = self.duplicate()?;
        result.invert()?;
        Ok(result)
    }
    /// Non-destructive [`union`](Self::union).
    pub fn union_of(&self, other: &Bitset) -> Result<Bitset> {
        self.check_same_size(other)?;
        let mut result = self.duplicate()?;
        result.union(other)?;
        Ok(result)
    }
    /// Non-destructive [`intersect`](Self::intersect).
    pub fn intersect_of(&self, other: &Bitset) -> Result<Bitset> {
        self.check_same_size(other)?;
        let mut result = self.duplicate()?;
        result.intersect(other)?;
        Ok(result)
    }
    /// Non-destructive [`subtract`](Self::subtract).
    pub fn difference_of(&self, other: &Bitset) -> Result<Bitset> {
        self.check_same_size(other)?;
        let mut result = self.duplicate()?;
        result.subtract(other)?;
        Ok(result)
    }

    /////////////////////////////////////////////

    pub fn cursor(&self, mode: IterMode) -> Cursor<'_> {
        Cursor::new(self, mode)
    }
    /// Iterates the indexes of the 1-bits in increasing order.
    pub fn ones(&self) -> Ones<'_> {
        Ones::new(self)
    }
}

impl Debug for Bitset {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_set().entries(self.ones()).finish()
    }
}
impl PartialEq for Bitset {
    fn eq(&self, other: &Self) -> bool {
        self.bit_count == other.bit_count
            && self.blocks.iter().zip(other.blocks.iter()).all(|pair| match pair {
                (None, None) => true,
                (Some(a), None) | (None, Some(a)) => a.set_count() == 0,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b) || a.words() == b.words(),
            })
    }
}
impl Eq for Bitset {}
