use crate::{Bitset, BlockBitAddr, Index, Word, WordBitAddr, BITS_PER_BLOCK, BLOCK_WORDS};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IterMode {
    /// Visit every position in `0..bit_count`.
    All,
    /// Visit only positions holding a 1-bit.
    On,
}

/// A position in a [`Bitset`], moved forward with [`advance`](Cursor::advance).
///
/// The cursor borrows its bitset, so the bitset cannot change while the cursor
/// is alive. Also usable as an `Iterator` of `(index, value)` pairs.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    bitset: &'a Bitset,
    mode: IterMode,
    // invariant: pos.idx_in_block < BITS_PER_BLOCK
    pos: BlockBitAddr,
}

/// Indexes of the 1-bits of a [`Bitset`], one word at a time.
#[derive(Debug, Clone)]
pub struct Ones<'a> {
    bitset: &'a Bitset,
    idx_of_block: usize,
    idx_of_next_word: usize,
    cached: Word,
}

impl<'a> Cursor<'a> {
    pub fn new(bitset: &'a Bitset, mode: IterMode) -> Self {
        let mut me = Self { bitset, mode, pos: BlockBitAddr { idx_of_block: 0, idx_in_block: 0 } };
        if mode == IterMode::On {
            me.seek_set_bit();
        }
        me
    }
    pub fn mode(&self) -> IterMode {
        self.mode
    }
    pub fn at_end(&self) -> bool {
        self.index() >= self.bitset.bit_count()
    }
    /// Absolute bit position of the cursor.
    pub fn index(&self) -> Index {
        self.pos.to_bit_idx()
    }
    /// Value of the bit under the cursor. Panics at the end.
    pub fn value(&self) -> bool {
        assert!(!self.at_end(), "cursor read past the end of its bitset");
        self.bitset.block(self.pos.idx_of_block).is_some_and(|b| b.test_bit(self.pos.idx_in_block))
    }
    /// Moves to the next position (`All`) or the next 1-bit (`On`).
    pub fn advance(&mut self) {
        if self.at_end() {
            return;
        }
        self.step();
        if self.mode == IterMode::On {
            self.seek_set_bit();
        }
    }

    fn step(&mut self) {
        self.pos.idx_in_block += 1;
        if self.pos.idx_in_block == BITS_PER_BLOCK {
            self.pos.idx_of_block += 1;
            self.pos.idx_in_block = 0;
        }
    }
    /// Moves to the first 1-bit at or after the current position, or to the end.
    fn seek_set_bit(&mut self) {
        let block_count = self.bitset.block_count();
        while self.pos.idx_of_block < block_count {
            match self.bitset.block(self.pos.idx_of_block) {
                None => {
                    self.pos.idx_of_block = self.bitset.next_present_block(self.pos.idx_of_block);
                    self.pos.idx_in_block = 0;
                }
                Some(block) => match block.find_next_set_bit(self.pos.idx_in_block) {
                    Some(idx_in_block) => {
                        self.pos.idx_in_block = idx_in_block;
                        return;
                    }
                    None => {
                        self.pos.idx_of_block += 1;
                        self.pos.idx_in_block = 0;
                    }
                },
            }
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = (Index, bool);
    fn next(&mut self) -> Option<(Index, bool)> {
        if self.at_end() {
            return None;
        }
        let item = (self.index(), self.value());
        self.advance();
        Some(item)
    }
}

impl<'a> Ones<'a> {
    pub fn new(bitset: &'a Bitset) -> Self {
        Self { bitset, idx_of_block: bitset.next_present_block(0), idx_of_next_word: 0, cached: 0 }
    }
}
impl Iterator for Ones<'_> {
    type Item = Index;
    fn next(&mut self) -> Option<Index> {
        while self.cached == 0 {
            if self.idx_of_block >= self.bitset.block_count() {
                return None;
            }
            match self.bitset.block(self.idx_of_block) {
                Some(block) if self.idx_of_next_word < BLOCK_WORDS => {
                    self.cached = block.words()[self.idx_of_next_word];
                    self.idx_of_next_word += 1;
                }
                _ => {
                    self.idx_of_block = self.bitset.next_present_block(self.idx_of_block + 1);
                    self.idx_of_next_word = 0;
                }
            }
        }
        // self.cached is NONZERO
        let idx_in_word = self.cached.trailing_zeros();
        self.cached &= self.cached - 1;
        let wba = WordBitAddr { idx_of_word: self.idx_of_next_word - 1, idx_in_word };
        let bba = BlockBitAddr { idx_of_block: self.idx_of_block, idx_in_block: wba.to_bit_idx() };
        Some(bba.to_bit_idx())
    }
}
