use super::*;

#[test]
fn tag_as_string() {
    let tag = Tag::new(b"morx");
    let json = serde_json::to_string(&tag).unwrap();
    assert_eq!(json, "\"morx\"");
    let back: Tag = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tag);
}

#[test]
fn scalars_roundtrip() {
    let value = (GlyphId16::new(7), Uint24::new(0x10203), Fixed::from_f64(0.5));
    let json = serde_json::to_string(&value).unwrap();
    let back: (GlyphId16, Uint24, Fixed) = serde_json::from_str(&json).unwrap();
    assert_eq!(back, value);
}
