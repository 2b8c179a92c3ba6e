//! GPS position from embedded EXIF metadata.

use std::io::Cursor;

use ::exif::{Exif, In, Reader, Tag, Value};

/// Latitude and longitude in signed decimal degrees, if the image carries a
/// usable GPS position. Any unreadable or inconsistent metadata yields `None`.
pub fn gps_coordinates(bytes: &[u8]) -> Option<(f64, f64)> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;

    let lat = coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S')?;
    let lon = coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W')?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }

    Some((lat, lon))
}

/// Degrees/minutes/seconds rationals to decimal degrees, negated for the
/// southern or western hemisphere.
fn coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag, negative: u8) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let Value::Rational(parts) = &field.value else {
        return None;
    };
    if parts.len() < 3 {
        return None;
    }

    let mut degrees = 0.0;
    for (part, scale) in parts.iter().zip([1.0, 60.0, 3600.0]) {
        if part.denom == 0 {
            return None;
        }
        degrees += part.to_f64() / scale;
    }

    let hemisphere = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|field| match &field.value {
            Value::Ascii(values) => values.first().and_then(|v| v.first().copied()),
            _ => None,
        });

    if hemisphere.is_some_and(|h| h.eq_ignore_ascii_case(&negative)) {
        degrees = -degrees;
    }

    Some(degrees)
}
