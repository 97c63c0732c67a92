use super::*;

// =============================================================
// Side
// =============================================================

#[test]
fn side_serde_uses_screaming_case() {
    assert_eq!(serde_json::to_string(&Side::Top).unwrap(), "\"TOP\"");
    assert_eq!(serde_json::to_string(&Side::Right).unwrap(), "\"RIGHT\"");
    let back: Side = serde_json::from_str("\"BOTTOM\"").unwrap();
    assert_eq!(back, Side::Bottom);
}

#[test]
fn side_display_matches_wire_name() {
    assert_eq!(Side::Left.to_string(), "LEFT");
    assert_eq!(Side::Bottom.to_string(), Side::Bottom.as_str());
}

// =============================================================
// ShapeType
// =============================================================

#[test]
fn shape_deserializes_known_names() {
    let cases = [
        ("\"SQUARE\"", ShapeType::Square),
        ("\"ELLIPSE\"", ShapeType::Ellipse),
        ("\"DIAMOND\"", ShapeType::Diamond),
        ("\"ROUNDED_RECTANGLE\"", ShapeType::RoundedRectangle),
        ("\"ENGINEERING_DATABASE\"", ShapeType::EngineeringDatabase),
        ("\"PARALLELOGRAM_LEFT\"", ShapeType::ParallelogramLeft),
    ];
    for (input, expected) in cases {
        let shape: ShapeType = serde_json::from_str(input).unwrap();
        assert_eq!(shape, expected, "input {input}");
    }
}

#[test]
fn shape_deserialize_is_case_insensitive() {
    let shape: ShapeType = serde_json::from_str("\"diamond\"").unwrap();
    assert_eq!(shape, ShapeType::Diamond);
}

#[test]
fn shape_unknown_name_falls_back_to_rounded_rectangle() {
    let shape: ShapeType = serde_json::from_str("\"HEXAGON\"").unwrap();
    assert_eq!(shape, ShapeType::RoundedRectangle);
}

#[test]
fn shape_serializes_to_wire_name() {
    assert_eq!(serde_json::to_string(&ShapeType::TriangleDown).unwrap(), "\"TRIANGLE_DOWN\"");
    assert_eq!(ShapeType::default(), ShapeType::RoundedRectangle);
}

#[test]
fn shape_non_string_rejected() {
    assert!(serde_json::from_str::<ShapeType>("42").is_err());
}
