/// Describes the strength of a correlation coefficient by its magnitude.
///
/// | abs(r)      | Label      |
/// |-------------|------------|
/// | >= 0.70     | strong     |
/// | >= 0.40     | moderate   |
/// | >= 0.20     | weak       |
/// | < 0.20      | negligible |
pub fn strength(r: f64) -> String {
    match r.abs() {
        a if a >= 0.70 => "strong".into(),
        a if a >= 0.40 => "moderate".into(),
        a if a >= 0.20 => "weak".into(),
        _ => "negligible".into(),
    }
}
