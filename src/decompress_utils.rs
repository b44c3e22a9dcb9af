/*****************************************************************************
 *                              Length decoding                              *
 *****************************************************************************/

/*
 * The length of a back-reference is encoded as:
 *
 *	0b00 --> 2
 *	0b01 --> 3
 *	0b10 --> 4
 *	0b1100 --> 5
 *	0b1101 --> 6
 *	0b1110 --> 7
 *	0b1111 xxxx --> 8 (extended)
 *
 * Decoding looks at the top LENGTH_MAX_BIT_WIDTH bits of the queue and maps
 * them through a 16-entry table whose entries carry both the decoded length
 * value and the number of bits the symbol actually occupies.  Two-bit
 * symbols therefore appear four times each, so that any trailing bit pair
 * selects the same entry.
 *
 * A decoded length of MAX_INITIAL_LENGTH means extended-length nibbles
 * follow: each nibble adds its value to the total, and a nibble below
 * MAX_EXTENDED_LENGTH terminates the sequence.
 */

pub mod length_entry;

use crate::decompress_utils::length_entry::LengthEntry;
use crate::lzs_constants::{LENGTH_TABLE_SIZE, MAX_INITIAL_LENGTH};
use crate::unchecked::UncheckedArray;

pub static LENGTH_DECODE_TABLE: UncheckedArray<LengthEntry, LENGTH_TABLE_SIZE> =
    UncheckedArray::from_array([
        LengthEntry::new(2, 2),
        LengthEntry::new(2, 2),
        LengthEntry::new(2, 2),
        LengthEntry::new(2, 2),
        LengthEntry::new(3, 2),
        LengthEntry::new(3, 2),
        LengthEntry::new(3, 2),
        LengthEntry::new(3, 2),
        LengthEntry::new(4, 2),
        LengthEntry::new(4, 2),
        LengthEntry::new(4, 2),
        LengthEntry::new(4, 2),
        LengthEntry::new(5, 4),
        LengthEntry::new(6, 4),
        LengthEntry::new(7, 4),
        LengthEntry::new(MAX_INITIAL_LENGTH, 4),
    ]);
