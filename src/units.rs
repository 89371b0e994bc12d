//! Typed measurements and human-readable formatting for them.

/// Unit tag attached to a [`Measurement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Seconds,
    Bytes,
    Unitless,
}

impl Unit {
    /// Suffix used when flattening a measurement into `<key>_<unit>` pairs.
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::Seconds => "seconds",
            Unit::Bytes => "bytes",
            Unit::Unitless => "",
        }
    }
}

/// A numeric value tagged with a unit. Immutable once constructed; two
/// measurements are equal iff both value and unit are equal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub unit: Unit,
}

impl Measurement {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn seconds(value: f64) -> Self {
        Self::new(value, Unit::Seconds)
    }

    pub fn bytes(value: f64) -> Self {
        Self::new(value, Unit::Bytes)
    }
}

const SIZE_UNITS: [(u64, &str); 4] = [
    (1 << 40, "TB"),
    (1 << 30, "GB"),
    (1 << 20, "MB"),
    (1 << 10, "kB"),
];

/// Convert a byte count to human-readable form (e.g. kB, MB).
///
/// Exact-integer quotients print without decimals, everything else with
/// four significant digits. Values below 1024 print as plain byte counts.
pub fn humanize_size(size: u64) -> String {
    for (threshold, unit) in SIZE_UNITS {
        if size >= threshold {
            return format!("{}{}", hfloat(size as f64 / threshold as f64), unit);
        }
    }
    format!("{}B", size)
}

// Four significant digits, trailing zeros trimmed, integers rendered bare.
fn hfloat(value: f64) -> String {
    if value == value.trunc() {
        return format!("{}", value as u64);
    }
    let integer_digits = value.abs().log10().floor() as i32 + 1;
    let precision = (4 - integer_digits).max(0) as usize;
    let rendered = format!("{:.*}", precision, value);
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
