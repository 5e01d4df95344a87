//! Location identifiers, geometry and coordinate reference systems.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static HOOFD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^KW\d{5}0$").expect("static regex"));
static SUB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^KW\d{5}[1-9]$").expect("static regex"));
static WS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^OW\d{6}$").expect("static regex"));

// ============================================================================
// Location classes
// ============================================================================

/// Shape of an internal location id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocationKind {
    /// `KW` + six digits ending in `0`.
    Hoofd,
    /// `KW` + six digits not ending in `0`.
    Sub,
    /// `OW` + six digits.
    Waterstand,
    /// Anything else.
    Unknown,
}

impl LocationKind {
    /// Classify an id by its shape alone.
    pub fn classify(loc_id: &str) -> Self {
        if HOOFD_RE.is_match(loc_id) {
            Self::Hoofd
        } else if SUB_RE.is_match(loc_id) {
            Self::Sub
        } else if WS_RE.is_match(loc_id) {
            Self::Waterstand
        } else {
            Self::Unknown
        }
    }
}

/// Location class as determined by table membership (used in reports).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationClass {
    Hoofd,
    Sub,
    Waterstand,
    Msw,
    Unknown,
}

impl LocationClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hoofd => "hoofdloc",
            Self::Sub => "subloc",
            Self::Waterstand => "waterstandloc",
            Self::Msw => "mswloc",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LocationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CAW code embedded in an internal location id: characters `2..len-2`.
///
/// `KW123450` → `1234`. Ids shorter than five characters have no code.
pub fn caw_code(loc_id: &str) -> Option<&str> {
    if loc_id.len() < 5 || !loc_id.is_ascii() {
        return None;
    }
    Some(&loc_id[2..loc_id.len() - 2])
}

/// First seven characters of an id: the key shared by a h-loc and its sub-locs.
pub fn group_key(loc_id: &str) -> &str {
    loc_id.get(..7).unwrap_or(loc_id)
}

/// Parent h-loc id of a structure location: last digit replaced by `0`.
pub fn parent_id(loc_id: &str) -> String {
    format!("{}0", group_key(loc_id))
}

// ============================================================================
// Geometry
// ============================================================================

/// Coordinate reference systems recognised from the FEWS `geoDatum` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Rijksdriehoekstelsel, EPSG:28992.
    RdNew,
}

impl Crs {
    pub fn from_geo_datum(datum: &str) -> Option<Self> {
        match datum.trim() {
            "Rijks Driehoekstelsel" => Some(Self::RdNew),
            _ => None,
        }
    }

    pub fn epsg(self) -> u32 {
        match self {
            Self::RdNew => 28992,
        }
    }
}

/// A point location, optionally with a height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Parse from CSV cells; `None` when x or y is missing or not a number.
    pub fn parse(x: &str, y: &str, z: Option<&str>) -> Option<Self> {
        let x = x.trim().parse::<f64>().ok()?;
        let y = y.trim().parse::<f64>().ok()?;
        let z = z.and_then(|v| v.trim().parse::<f64>().ok());
        Some(Self { x, y, z })
    }

    /// Same horizontal position.
    pub fn same_xy(&self, other: &Point) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.z {
            Some(z) => write!(f, "POINT Z ({} {} {})", self.x, self.y, z),
            None => write!(f, "POINT ({} {})", self.x, self.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_shapes() {
        assert_eq!(LocationKind::classify("KW123450"), LocationKind::Hoofd);
        assert_eq!(LocationKind::classify("KW123451"), LocationKind::Sub);
        assert_eq!(LocationKind::classify("OW123456"), LocationKind::Waterstand);
        assert_eq!(LocationKind::classify("KW12345"), LocationKind::Unknown);
        assert_eq!(LocationKind::classify("XX123450"), LocationKind::Unknown);
    }

    #[test]
    fn test_caw_code_and_parent() {
        assert_eq!(caw_code("KW123451"), Some("1234"));
        assert_eq!(caw_code("KW1"), None);
        assert_eq!(parent_id("KW123453"), "KW123450");
        assert_eq!(group_key("KW123453"), "KW12345");
    }

    #[test]
    fn test_point_parse() {
        let p = Point::parse("140000.5", " 450000 ", None).unwrap();
        assert_eq!(p, Point::new(140000.5, 450000.0));
        assert!(Point::parse("", "1", None).is_none());
        assert_eq!(p.to_string(), "POINT (140000.5 450000)");
    }

    #[test]
    fn test_crs_lookup() {
        assert_eq!(
            Crs::from_geo_datum("Rijks Driehoekstelsel").map(Crs::epsg),
            Some(28992)
        );
        assert!(Crs::from_geo_datum("WGS 1984").is_none());
    }
}
