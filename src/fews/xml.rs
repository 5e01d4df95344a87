//! Readers for the FEWS XML files the engine consumes.
//!
//! All three readers walk quick-xml events and keep a stack of element
//! names, so nesting decides what a text node means. The id-map reader also
//! records comments: section boundaries in id-map files are plain
//! `<!--...-->` markers.

use crate::types::IdMapEntry;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

type XmlResult<T> = Result<T, quick_xml::Error>;

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, name: &str) -> XmlResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            // `unescape_value` is unavailable when quick-xml's `encoding` feature
            // is on (calamine enables it); this is its UTF-8 equivalent.
            let raw = std::str::from_utf8(&attr.value)?;
            return Ok(Some(quick_xml::escape::unescape(raw)?.into_owned()));
        }
    }
    Ok(None)
}

/// `%LOC_ID%` → `LOC_ID`.
fn strip_placeholder(value: &str) -> String {
    value.trim().trim_matches('%').to_string()
}

fn ends_with(stack: &[String], tail: &[&str]) -> bool {
    stack.len() >= tail.len()
        && stack[stack.len() - tail.len()..]
            .iter()
            .zip(tail)
            .all(|(a, b)| a == b)
}

// ============================================================================
// LocationSets.xml
// ============================================================================

/// A location attribute taken from a CSV column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeColumn {
    pub id: String,
    pub column: String,
}

/// An `attributeFile` joined onto a location set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeFileMeta {
    pub csv_file: String,
    pub id_column: String,
    pub attributes: Vec<AttributeColumn>,
}

/// The `csvFile` definition of a location set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationSetMeta {
    pub id: String,
    pub csv_file: String,
    pub geo_datum: Option<String>,
    pub id_column: String,
    pub name_column: Option<String>,
    pub x_column: String,
    pub y_column: String,
    pub z_column: Option<String>,
    pub attributes: Vec<AttributeColumn>,
    pub attribute_files: Vec<AttributeFileMeta>,
}

impl LocationSetMeta {
    /// CSV file name with extension.
    pub fn csv_file_name(&self) -> String {
        if self.csv_file.to_ascii_lowercase().ends_with(".csv") {
            self.csv_file.clone()
        } else {
            format!("{}.csv", self.csv_file)
        }
    }
}

/// Parse `LocationSets.xml`. Sets without a `csvFile` are skipped.
pub fn parse_location_sets(xml: &str) -> XmlResult<Vec<LocationSetMeta>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut sets = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<LocationSetMeta> = None;
    let mut has_csv = false;
    let mut attr_file: Option<AttributeFileMeta> = None;
    let mut attr_id: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                match name.as_str() {
                    "locationSet" => {
                        current = Some(LocationSetMeta {
                            id: attribute(&e, "id")?.unwrap_or_default(),
                            id_column: "LOC_ID".to_string(),
                            x_column: "X".to_string(),
                            y_column: "Y".to_string(),
                            ..Default::default()
                        });
                        has_csv = false;
                    }
                    "csvFile" if ends_with(&stack, &["locationSet"]) => has_csv = true,
                    "attributeFile" => attr_file = Some(AttributeFileMeta::default()),
                    "attribute" => attr_id = attribute(&e, "id")?,
                    _ => {}
                }
                stack.push(name);
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                let Some(meta) = current.as_mut() else {
                    continue;
                };
                if let Some(af) = attr_file.as_mut() {
                    if ends_with(&stack, &["attributeFile", "csvFile"]) {
                        af.csv_file = text.trim().to_string();
                    } else if ends_with(&stack, &["attributeFile", "id"]) {
                        af.id_column = strip_placeholder(&text);
                    } else if stack.len() >= 2 && stack[stack.len() - 2] == "attribute" {
                        af.attributes.push(AttributeColumn {
                            id: attr_id.clone().unwrap_or_default(),
                            column: strip_placeholder(&text),
                        });
                    }
                    continue;
                }
                if !ends_with(&stack[..stack.len().saturating_sub(1)], &["locationSet", "csvFile"])
                    && !(stack.len() >= 2 && stack[stack.len() - 2] == "attribute")
                {
                    continue;
                }
                match stack.last().map(String::as_str) {
                    Some("file") => meta.csv_file = text.trim().to_string(),
                    Some("geoDatum") => meta.geo_datum = Some(text.trim().to_string()),
                    Some("id") => meta.id_column = strip_placeholder(&text),
                    Some("name") => meta.name_column = Some(strip_placeholder(&text)),
                    Some("x") => meta.x_column = strip_placeholder(&text),
                    Some("y") => meta.y_column = strip_placeholder(&text),
                    Some("z") => meta.z_column = Some(strip_placeholder(&text)),
                    Some(_) if stack.len() >= 2 && stack[stack.len() - 2] == "attribute" => {
                        meta.attributes.push(AttributeColumn {
                            id: attr_id.clone().unwrap_or_default(),
                            column: strip_placeholder(&text),
                        });
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.pop();
                match name.as_str() {
                    "attributeFile" => {
                        if let (Some(meta), Some(af)) = (current.as_mut(), attr_file.take()) {
                            meta.attribute_files.push(af);
                        }
                    }
                    "attribute" => attr_id = None,
                    "locationSet" => {
                        if let Some(meta) = current.take() {
                            if has_csv {
                                sets.push(meta);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sets)
}

// ============================================================================
// Parameters.xml
// ============================================================================

/// A parameter definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameter {
    pub id: String,
    pub group: String,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub unit: Option<String>,
    pub parameter_type: Option<String>,
}

/// A `parameterGroup` with its member parameter ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterGroup {
    pub id: String,
    pub parameter_type: Option<String>,
    pub unit: Option<String>,
    pub parameters: Vec<String>,
}

/// Parse `Parameters.xml` into groups and flattened parameters.
pub fn parse_parameters(
    xml: &str,
) -> XmlResult<(BTreeMap<String, ParameterGroup>, BTreeMap<String, Parameter>)> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut groups = BTreeMap::new();
    let mut params: BTreeMap<String, Parameter> = BTreeMap::new();
    let mut stack: Vec<String> = Vec::new();
    let mut group: Option<ParameterGroup> = None;
    let mut pending: Vec<Parameter> = Vec::new();
    let mut param: Option<Parameter> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                match name.as_str() {
                    "parameterGroup" => {
                        group = Some(ParameterGroup {
                            id: attribute(&e, "id")?.unwrap_or_default(),
                            ..Default::default()
                        });
                    }
                    "parameter" => {
                        param = Some(Parameter {
                            id: attribute(&e, "id")?.unwrap_or_default(),
                            ..Default::default()
                        });
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if local_name(&e) == "parameter" {
                    pending.push(Parameter {
                        id: attribute(&e, "id")?.unwrap_or_default(),
                        ..Default::default()
                    });
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?.trim().to_string();
                if let Some(p) = param.as_mut() {
                    match stack.last().map(String::as_str) {
                        Some("name") => p.name = Some(text),
                        Some("shortName") => p.short_name = Some(text),
                        _ => {}
                    }
                } else if let Some(g) = group.as_mut() {
                    match stack.last().map(String::as_str) {
                        Some("parameterType") => g.parameter_type = Some(text),
                        Some("unit") => g.unit = Some(text),
                        _ => {}
                    }
                }
            }
            Event::End(e) => {
                stack.pop();
                match e.local_name().as_ref() {
                    b"parameter" => {
                        if let Some(p) = param.take() {
                            pending.push(p);
                        }
                    }
                    b"parameterGroup" => {
                        if let Some(mut g) = group.take() {
                            for mut p in pending.drain(..) {
                                p.group = g.id.clone();
                                p.unit = g.unit.clone();
                                p.parameter_type = g.parameter_type.clone();
                                g.parameters.push(p.id.clone());
                                params.insert(p.id.clone(), p);
                            }
                            groups.insert(g.id.clone(), g);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok((groups, params))
}

// ============================================================================
// Id-map files
// ============================================================================

/// Contents of one id-map file: entries in document order plus the comment
/// markers seen between them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMapContents {
    pub entries: Vec<IdMapEntry>,
    /// `(number of entries before the comment, "<!--text-->")`
    pub markers: Vec<(usize, String)>,
}

/// Parse an id-map file. Only `map` elements carrying all four attributes
/// become entries.
pub fn parse_idmap(xml: &str) -> XmlResult<IdMapContents> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut contents = IdMapContents::default();
    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"map" => {
                let ex_loc = attribute(&e, "externalLocation")?;
                let ex_par = attribute(&e, "externalParameter")?;
                let int_loc = attribute(&e, "internalLocation")?;
                let int_par = attribute(&e, "internalParameter")?;
                if let (Some(ex_loc), Some(ex_par), Some(int_loc), Some(int_par)) =
                    (ex_loc, ex_par, int_loc, int_par)
                {
                    contents
                        .entries
                        .push(IdMapEntry::new(&ex_loc, &ex_par, &int_loc, &int_par));
                }
            }
            Event::Comment(c) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                contents
                    .markers
                    .push((contents.entries.len(), format!("<!--{text}-->")));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCATION_SETS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<locationSets xmlns="http://www.wldelft.nl/fews">
  <locationSet id="OPVLWATER_HOOFDLOC">
    <csvFile>
      <file>oppvlwater_hoofdloc</file>
      <geoDatum>Rijks Driehoekstelsel</geoDatum>
      <id>%LOC_ID%</id>
      <name>%LOC_NAME%</name>
      <x>%X%</x>
      <y>%Y%</y>
      <attribute id="SYSTEEM"><text>%SYSTEEM%</text></attribute>
      <attributeFile>
        <csvFile>oppvlwater_hoofdloc_validatie.csv</csvFile>
        <id>%LOC_ID%</id>
        <attribute id="HS1_HMAX"><number>%HS1_HMAX%</number></attribute>
      </attributeFile>
    </csvFile>
  </locationSet>
  <locationSet id="SHAPE_ONLY">
    <esriShapeFile><file>x</file></esriShapeFile>
  </locationSet>
</locationSets>"#;

    #[test]
    fn test_parse_location_sets() {
        let sets = parse_location_sets(LOCATION_SETS).unwrap();
        assert_eq!(sets.len(), 1);
        let s = &sets[0];
        assert_eq!(s.id, "OPVLWATER_HOOFDLOC");
        assert_eq!(s.csv_file_name(), "oppvlwater_hoofdloc.csv");
        assert_eq!(s.geo_datum.as_deref(), Some("Rijks Driehoekstelsel"));
        assert_eq!(s.x_column, "X");
        assert_eq!(s.name_column.as_deref(), Some("LOC_NAME"));
        assert_eq!(s.attributes[0].column, "SYSTEEM");
        assert_eq!(s.attribute_files.len(), 1);
        assert_eq!(s.attribute_files[0].csv_file, "oppvlwater_hoofdloc_validatie.csv");
        assert_eq!(s.attribute_files[0].attributes[0].id, "HS1_HMAX");
    }

    #[test]
    fn test_parse_parameters() {
        let xml = r#"<parameters><parameterGroups>
          <parameterGroup id="Waterhoogte">
            <parameterType>instantaneous</parameterType>
            <unit>m</unit>
            <parameter id="H.S.0"><shortName>H.S.0</shortName><name>Waterstand</name></parameter>
            <parameter id="Hk.0"/>
          </parameterGroup>
        </parameterGroups></parameters>"#;
        let (groups, params) = parse_parameters(xml).unwrap();
        assert_eq!(groups["Waterhoogte"].parameters, vec!["H.S.0", "Hk.0"]);
        assert_eq!(params["H.S.0"].unit.as_deref(), Some("m"));
        assert_eq!(params["H.S.0"].name.as_deref(), Some("Waterstand"));
        assert_eq!(params["Hk.0"].group, "Waterhoogte");
    }

    #[test]
    fn test_parse_idmap_records_markers() {
        let xml = r#"<idMap version="1.1">
  <!--KUNSTWERK SUBLOCS (new CAW id)-->
  <map externalLocation="1000" externalParameter="SW1" internalLocation="KW100011" internalParameter="Hk.0"/>
  <!--WATERSTANDSLOCATIES (new CAW id)-->
  <map externalLocation="1001" externalParameter="HB1" internalLocation="OW100101" internalParameter="H.G.0"/>
  <map externalLocation="broken"/>
</idMap>"#;
        let contents = parse_idmap(xml).unwrap();
        assert_eq!(contents.entries.len(), 2);
        assert_eq!(
            contents.markers,
            vec![
                (0, "<!--KUNSTWERK SUBLOCS (new CAW id)-->".to_string()),
                (1, "<!--WATERSTANDSLOCATIES (new CAW id)-->".to_string()),
            ]
        );
    }
}
