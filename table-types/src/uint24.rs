/// An unsigned integer stored in three bytes.
///
/// Values are held in a `u32`; anything above 0xFFFFFF is clamped on
/// construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Uint24(u32);

impl Uint24 {
    pub const MAX: Self = Uint24(0xFF_FFFF);

    pub const fn new(raw: u32) -> Uint24 {
        if raw > Self::MAX.0 {
            Self::MAX
        } else {
            Uint24(raw)
        }
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    pub const fn to_be_bytes(self) -> [u8; 3] {
        let [_, hi, mid, lo] = self.0.to_be_bytes();
        [hi, mid, lo]
    }

    pub const fn from_be_bytes(bytes: [u8; 3]) -> Self {
        let [hi, mid, lo] = bytes;
        Uint24(u32::from_be_bytes([0, hi, mid, lo]))
    }
}
