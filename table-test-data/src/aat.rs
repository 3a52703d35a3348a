//! Lookups, class tables and state tables.

/// Format 2 lookup of {12: 4, 13: 4, 16: 4, 17: 5, 18: 5, 29: 4}, guard value 1.
#[rustfmt::skip]
pub static LOOKUP_FORMAT_2: &[u8] = &[
    0x00, 0x02,             // format 2
    0x00, 0x06,             // unitSize
    0x00, 0x04,             // nUnits
    0x00, 0x18,             // searchRange
    0x00, 0x02,             // entrySelector
    0x00, 0x00,             // rangeShift
    0x00, 0x0D, 0x00, 0x0C, 0x00, 0x04, // 12..=13 -> 4
    0x00, 0x10, 0x00, 0x10, 0x00, 0x04, // 16 -> 4
    0x00, 0x12, 0x00, 0x11, 0x00, 0x05, // 17..=18 -> 5
    0x00, 0x1D, 0x00, 0x1D, 0x00, 0x04, // 29 -> 4
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x01, // guard
];

/// Format 4 lookup mapping each glyph in 50..70 and 150..170 to 4 + glyph % 2.
#[rustfmt::skip]
pub static LOOKUP_FORMAT_4: &[u8] = &[
    0x00, 0x04,             // format 4
    0x00, 0x06,             // unitSize
    0x00, 0x02,             // nUnits
    0x00, 0x0C,             // searchRange
    0x00, 0x01,             // entrySelector
    0x00, 0x00,             // rangeShift
    0x00, 0x45, 0x00, 0x32, 0x00, 0x1E, // 50..=69, values at 30
    0x00, 0xA9, 0x00, 0x96, 0x00, 0x46, // 150..=169, values at 70
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // guard
    // 30: values for 50..=69
    0x00, 0x04, 0x00, 0x05, 0x00, 0x04, 0x00, 0x05, 0x00, 0x04,
    0x00, 0x05, 0x00, 0x04, 0x00, 0x05, 0x00, 0x04, 0x00, 0x05,
    0x00, 0x04, 0x00, 0x05, 0x00, 0x04, 0x00, 0x05, 0x00, 0x04,
    0x00, 0x05, 0x00, 0x04, 0x00, 0x05, 0x00, 0x04, 0x00, 0x05,
    // 70: values for 150..=169
    0x00, 0x04, 0x00, 0x05, 0x00, 0x04, 0x00, 0x05, 0x00, 0x04,
    0x00, 0x05, 0x00, 0x04, 0x00, 0x05, 0x00, 0x04, 0x00, 0x05,
    0x00, 0x04, 0x00, 0x05, 0x00, 0x04, 0x00, 0x05, 0x00, 0x04,
    0x00, 0x05, 0x00, 0x04, 0x00, 0x05, 0x00, 0x04, 0x00, 0x05,
];

/// Format 6 lookup of {12: 4, 90: 4}, guard value 1.
#[rustfmt::skip]
pub static LOOKUP_FORMAT_6: &[u8] = &[
    0x00, 0x06,             // format 6
    0x00, 0x04,             // unitSize
    0x00, 0x02,             // nUnits
    0x00, 0x08,             // searchRange
    0x00, 0x01,             // entrySelector
    0x00, 0x00,             // rangeShift
    0x00, 0x0C, 0x00, 0x04, // 12 -> 4
    0x00, 0x5A, 0x00, 0x04, // 90 -> 4
    0xFF, 0xFF, 0x00, 0x01, // guard
];

/// Classic class table of {90: 4, 94: 3, 96: 4, 97: 4, 98: 5}.
#[rustfmt::skip]
pub static CLASS_TABLE: &[u8] = &[
    0x00, 0x5A,             // firstGlyph 90
    0x00, 0x09,             // nGlyphs 9
    0x04, 0x01, 0x01, 0x01, 0x03, 0x01, 0x04, 0x04, 0x05,
    0x00,                   // pad
];

/// A classic state table with one added class (glyphs 10 and 11) and one
/// added state, without a name stash.
///
/// Seeing a glyph of the added class marks it and moves to the added state;
/// in the added state, more such glyphs keep the machine there.
#[rustfmt::skip]
pub static MORT_CLASSIC: &[u8] = &[
    0x00, 0x05,             // nClasses
    0x00, 0x08,             // classTable
    0x00, 0x0E,             // stateArray
    0x00, 0x1E,             // entryTable
    // 0x08: class table
    0x00, 0x0A, 0x00, 0x02, 0x04, 0x04,
    // 0x0E: state array
    0x00, 0x00, 0x00, 0x00, 0x01,   // Start of text
    0x00, 0x00, 0x00, 0x00, 0x01,   // Start of line
    0x00, 0x00, 0x00, 0x00, 0x02,   // User state 1
    0x00,                           // pad
    // 0x1E: entries (newState row offset, flags)
    0x00, 0x0E, 0x00, 0x00,
    0x00, 0x18, 0x80, 0x00,
    0x00, 0x18, 0x00, 0x00,
];

/// The state table of a 'kern' format 1 subtable.
///
/// The layout matches [`MORT_CLASSIC`], with a value table offset in the
/// header. In the added state, another glyph of the added class applies a
/// kerning value of -40 to the pushed glyph.
#[rustfmt::skip]
pub static KERN_FORMAT_1: &[u8] = &[
    0x00, 0x05,             // nClasses
    0x00, 0x0A,             // classTable
    0x00, 0x10,             // stateArray
    0x00, 0x20,             // entryTable
    0x00, 0x2C,             // valueTable
    // 0x0A: class table
    0x00, 0x0A, 0x00, 0x02, 0x04, 0x04,
    // 0x10: state array
    0x00, 0x00, 0x00, 0x00, 0x01,   // Start of text
    0x00, 0x00, 0x00, 0x00, 0x01,   // Start of line
    0x00, 0x00, 0x00, 0x00, 0x02,   // User state 1
    0x00,                           // pad
    // 0x20: entries (newState, push | noAdvance | value offset)
    0x00, 0x10, 0x00, 0x00,
    0x00, 0x1A, 0x80, 0x00,
    0x00, 0x1A, 0x80, 0x2C,
    // 0x2C: value list, -40 with the end-of-list bit
    0xFF, 0xD9,
];

/// An extended ('morx' rearrangement) state table with a name stash.
///
/// Classes: First (glyph 12), Last (glyph 19), Trigger (glyph 50).
/// States: Saw first, Saw trigger.
#[rustfmt::skip]
pub static MORX_REARRANGEMENT: &[u8] = &[
    0x00, 0x00, 0x00, 0x07, // nClasses
    0x00, 0x00, 0x00, 0x40, // classTable
    0x00, 0x00, 0x00, 0x5C, // stateArray
    0x00, 0x00, 0x00, 0x94, // entryTable
    // 0x10: name stash
    0xFE, 0xED,
    0x00, 0x03,
    0x05, b'F', b'i', b'r', b's', b't',
    0x04, b'L', b'a', b's', b't',
    0x07, b'T', b'r', b'i', b'g', b'g', b'e', b'r',
    0x00, 0x02,
    0x09, b'S', b'a', b'w', b' ', b'f', b'i', b'r', b's', b't',
    0x0B, b'S', b'a', b'w', b' ', b't', b'r', b'i', b'g', b'g', b'e', b'r',
    0x00,                   // pad
    // 0x40: class lookup, format 6
    0x00, 0x06, 0x00, 0x04, 0x00, 0x03, 0x00, 0x08, 0x00, 0x01, 0x00, 0x04,
    0x00, 0x0C, 0x00, 0x04,
    0x00, 0x13, 0x00, 0x05,
    0x00, 0x32, 0x00, 0x06,
    0xFF, 0xFF, 0xFF, 0xFF,
    // 0x5C: state array
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
    0x00, 0x02, 0x00, 0x02, 0x00, 0x02, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00, 0x02,
    0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x03, 0x00, 0x01, 0x00, 0x01,
    // 0x94: entries (newState, flags)
    0x00, 0x00, 0x00, 0x00,
    0x00, 0x03, 0x00, 0x00,
    0x00, 0x02, 0x00, 0x00,
    0x00, 0x02, 0x80, 0x00,
    0x00, 0x00, 0x20, 0x03,
];
