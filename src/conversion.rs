use crate::constants::Degree;

/// Number of decimal digits written for the seconds of right ascension
const RA_SECOND_DIGITS: u32 = 4;

/// Number of decimal digits written for the arcseconds of declination
const DEC_SECOND_DIGITS: u32 = 3;

/// Split a sexagesimal string on `:` or whitespace into exactly three fields.
fn sexagesimal_fields(s: &str) -> Option<[&str; 3]> {
    let parts: Vec<&str> = s
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        [a, b, c] => Some([*a, *b, *c]),
        _ => None,
    }
}

/// Parse a right ascension string to degrees
///
/// Arguments
/// ---------
/// * `ra`: a string representing the right ascension as `HH:MM:SS.SS` (or `HH MM SS.SS`)
///
/// Returns
/// -------
/// * `Option<Degree>`: the right ascension in degrees, `None` if the input format is invalid
///   or a field is out of range.
pub fn parse_ra_to_deg(ra: &str) -> Option<Degree> {
    let [h, m, s] = sexagesimal_fields(ra)?;

    let h: f64 = h.parse().ok()?;
    let m: f64 = m.parse().ok()?;
    let s: f64 = s.parse().ok()?;

    if !(0.0..24.0).contains(&h) || !(0.0..60.0).contains(&m) || !(0.0..60.0).contains(&s) {
        return None;
    }

    Some((h + m / 60.0 + s / 3600.0) * 15.0)
}

/// Parse a declination string to degrees
///
/// Arguments
/// ---------
/// * `dec`: a string representing the declination as `±DD:MM:SS.SS` (or `±DD MM SS.SS`)
///
/// Returns
/// -------
/// * `Option<Degree>`: the declination in degrees, `None` if the input format is invalid
///   or a field is out of range.
pub fn parse_dec_to_deg(dec: &str) -> Option<Degree> {
    let [d, m, s] = sexagesimal_fields(dec)?;

    let sign = if d.starts_with('-') { -1.0 } else { 1.0 };
    let d: f64 = d.trim_start_matches(&['-', '+'][..]).parse().ok()?;
    let m: f64 = m.parse().ok()?;
    let s: f64 = s.parse().ok()?;

    if d > 90.0 || !(0.0..60.0).contains(&m) || !(0.0..60.0).contains(&s) {
        return None;
    }

    Some(sign * (d + m / 60.0 + s / 3600.0))
}

/// Split a non-negative quantity expressed in units of `1/60²` into whole
/// units, minutes and rounded seconds, carrying rounding overflow upwards.
fn split_sexagesimal(value: f64, digits: u32) -> (u64, u64, f64) {
    let scale = 10u64.pow(digits);
    let total = (value * 3600.0 * scale as f64).round() as u64;

    let frac = total % scale;
    let whole_seconds = total / scale;

    let units = whole_seconds / 3600;
    let minutes = (whole_seconds / 60) % 60;
    let seconds = (whole_seconds % 60) as f64 + frac as f64 / scale as f64;
    (units, minutes, seconds)
}

/// Format a right ascension in degrees as `HH:MM:SS.SSSS`
pub fn format_ra_hms(ra: Degree) -> String {
    let hours = ra.rem_euclid(360.0) / 15.0;
    let (h, m, s) = split_sexagesimal(hours, RA_SECOND_DIGITS);
    let width = 3 + RA_SECOND_DIGITS as usize;
    format!(
        "{:02}:{:02}:{:0width$.prec$}",
        h % 24,
        m,
        s,
        width = width,
        prec = RA_SECOND_DIGITS as usize
    )
}

/// Format a declination in degrees as `±DD:MM:SS.SSS`
pub fn format_dec_dms(dec: Degree) -> String {
    let sign = if dec < 0.0 { '-' } else { '+' };
    let (d, m, s) = split_sexagesimal(dec.abs(), DEC_SECOND_DIGITS);
    let width = 3 + DEC_SECOND_DIGITS as usize;
    format!(
        "{sign}{:02}:{:02}:{:0width$.prec$}",
        d,
        m,
        s,
        width = width,
        prec = DEC_SECOND_DIGITS as usize
    )
}
