use crate::Word;

/// Width of a machine word in bits.
pub const WORD_SIZE: u32 = Word::BITS;

/// Inclusive range of bits inside a word, used to pack and unpack one component of an
/// instruction. Bit 0 is the low-order bit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BitField {
    from_bit: u32,
    to_bit: u32,
    width: u32,
    mask: Word,
}

impl BitField {
    /// Panics if the range is empty or does not fit inside a word.
    pub const fn new(from_bit: u32, to_bit: u32) -> Self {
        assert!(from_bit <= to_bit, "bit field range is reversed");
        assert!(to_bit < WORD_SIZE, "bit field extends past the end of a word");
        let width = to_bit - from_bit + 1;
        // Shifting by the full word width would overflow
        let low_bits = if width == WORD_SIZE {
            Word::MAX
        } else {
            (1 << width) - 1
        };
        BitField {
            from_bit,
            to_bit,
            width,
            mask: low_bits << from_bit,
        }
    }

    pub const fn from_bit(&self) -> u32 {
        self.from_bit
    }

    pub const fn to_bit(&self) -> u32 {
        self.to_bit
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn mask(&self) -> Word {
        self.mask
    }

    pub const fn inverse_mask(&self) -> Word {
        !self.mask
    }

    /// Replace the field inside `word` with the low-order `width` bits of `value`.
    pub const fn insert(&self, value: Word, word: Word) -> Word {
        let field = (value << self.from_bit) & self.mask;
        (word & self.inverse_mask()) | field
    }

    /// Same as [`BitField::insert`], taking a signed value in two's complement.
    pub const fn insert_signed(&self, value: i32, word: Word) -> Word {
        self.insert(value as Word, word)
    }

    /// Field contents shifted down into the low-order bits.
    pub const fn extract(&self, word: Word) -> Word {
        (word & self.mask) >> self.from_bit
    }

    /// Field contents interpreted as a two's complement integer of `width` bits.
    pub const fn extract_signed(&self, word: Word) -> i32 {
        sign_extend(self.extract(word), self.width)
    }

    /// Smallest signed value the field can hold.
    pub const fn min_signed(&self) -> i32 {
        (-(1i64 << (self.width - 1))) as i32
    }

    /// Largest signed value the field can hold.
    pub const fn max_signed(&self) -> i32 {
        ((1i64 << (self.width - 1)) - 1) as i32
    }

    /// Largest unsigned value the field can hold.
    pub const fn max_unsigned(&self) -> Word {
        self.mask >> self.from_bit
    }
}

/// Interpret the low `width` bits of `field` as a two's complement integer.
///
/// A field needs at least two bits to have a distinguishable sign bit.
pub const fn sign_extend(field: Word, width: u32) -> i32 {
    assert!(width >= 2, "sign extension needs a field of at least 2 bits");
    assert!(width <= WORD_SIZE);
    let field = field as i64;
    let sign_bit = 1i64 << (width - 1);
    if field & sign_bit != 0 {
        (field - (1i64 << width)) as i32
    } else {
        field as i32
    }
}
