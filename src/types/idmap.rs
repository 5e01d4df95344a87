//! Id-map entries and hist-tag records.

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("static regex"));

/// One `<map>` element of a FEWS id-map file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdMapEntry {
    pub external_location: String,
    pub external_parameter: String,
    pub internal_location: String,
    pub internal_parameter: String,
}

impl IdMapEntry {
    pub fn new(ex_loc: &str, ex_par: &str, int_loc: &str, int_par: &str) -> Self {
        Self {
            external_location: ex_loc.to_string(),
            external_parameter: ex_par.to_string(),
            internal_location: int_loc.to_string(),
            internal_parameter: int_par.to_string(),
        }
    }

    /// Hist-tag serie this entry resolves: `<exLoc>_<exPar>`.
    pub fn serie(&self) -> String {
        format!("{}_{}", self.external_location, self.external_parameter)
    }
}

/// Generalised external parameter: every digit replaced by `.` (`FQ1` → `FQ.`).
pub fn generalise_parameter(ex_par: &str) -> String {
    DIGIT_RE.replace_all(ex_par, ".").into_owned()
}

/// One row of the hist-tag inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct HistTag {
    pub serie: String,
    pub external_location: String,
    pub external_parameter: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl HistTag {
    /// Split `serie` on the first `_` into external location and parameter.
    pub fn new(serie: &str, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let (ex_loc, ex_par) = serie.split_once('_').unwrap_or((serie, ""));
        Self {
            serie: serie.to_string(),
            external_location: ex_loc.to_string(),
            external_parameter: ex_par.to_string(),
            start,
            end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_generalise_parameter() {
        assert_eq!(generalise_parameter("FQ1"), "FQ.");
        assert_eq!(generalise_parameter("I1B"), "I.B");
        assert_eq!(generalise_parameter("HS12"), "HS..");
        assert_eq!(generalise_parameter("WR"), "WR");
    }

    #[test]
    fn test_histtag_splits_on_first_underscore() {
        let t = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let tag = HistTag::new("1000_HS1_x", t, t);
        assert_eq!(tag.external_location, "1000");
        assert_eq!(tag.external_parameter, "HS1_x");
        assert_eq!(IdMapEntry::new("1000", "HS1", "KW100010", "H.S.0").serie(), "1000_HS1");
    }
}
