use crate::record::Element;

/// True when the element can be used as a finite real number.
pub fn is_numeric(element: &Element) -> bool {
    as_finite_f64(element).is_some()
}

/// The element as a finite `f64`, or `None` for text, booleans, nulls, NaN and infinities.
pub fn as_finite_f64(element: &Element) -> Option<f64> {
    match element {
        Element::Integer(i) => Some(*i as f64),
        Element::Float(f) if f.is_finite() => Some(*f),
        Element::Float(_) | Element::Text(_) | Element::Bool(_) | Element::Null => None,
    }
}
