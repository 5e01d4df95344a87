//! Miniature FEWS configuration written into a temporary directory.
//!
//! `FewsTree::happy()` holds one weir (hoofd `KW100010`, sub-loc
//! `KW100011`) on which every check passes. Tests edit the public file
//! contents before calling `write()`.

#![allow(dead_code)]

use mpt_consistency::config::MptConfig;
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const KUNSTWERK_MARKER: &str = "<!--KUNSTWERK SUBLOCS (new CAW id)-->";
pub const WATERSTAND_MARKER: &str = "<!--WATERSTANDSLOCATIES (new CAW id)-->";
pub const MSW_MARKER: &str = "<!--MSW (new CAW id)-->";

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
      <attributeFile>
        <csvFile>oppvlwater_hoofdloc_validations</csvFile>
        <id>%LOC_ID%</id>
      </attributeFile>
    </csvFile>
  </locationSet>
  <locationSet id="OPVLWATER_SUBLOC">
    <csvFile>
      <file>oppvlwater_subloc</file>
      <geoDatum>Rijks Driehoekstelsel</geoDatum>
      <id>%LOC_ID%</id>
      <name>%LOC_NAME%</name>
      <x>%X%</x>
      <y>%Y%</y>
    </csvFile>
  </locationSet>
  <locationSet id="OPVLWATER_WATERSTANDEN_AUTO">
    <csvFile>
      <file>oppvlwater_waterstanden</file>
      <geoDatum>Rijks Driehoekstelsel</geoDatum>
      <id>%LOC_ID%</id>
      <name>%LOC_NAME%</name>
      <x>%X%</x>
      <y>%Y%</y>
    </csvFile>
  </locationSet>
  <locationSet id="MSW_STATIONS">
    <csvFile>
      <file>msw_stations</file>
      <id>%LOC_ID%</id>
      <x>%X%</x>
      <y>%Y%</y>
    </csvFile>
  </locationSet>
  <locationSet id="OPVLWATER_PEILSCHALEN">
    <csvFile>
      <file>oppvlwater_peilschalen</file>
      <id>%LOC_ID%</id>
      <x>%X%</x>
      <y>%Y%</y>
    </csvFile>
  </locationSet>
</locationSets>
"#;

/// One `<map/>` line.
pub fn map(ex_loc: &str, ex_par: &str, int_loc: &str, int_par: &str) -> String {
    format!(
        r#"  <map externalLocation="{ex_loc}" externalParameter="{ex_par}" internalLocation="{int_loc}" internalParameter="{int_par}"/>"#
    )
}

pub struct FewsTree {
    pub hoofd_csv: String,
    pub hoofd_validations_csv: String,
    pub sub_csv: String,
    pub waterstand_csv: String,
    pub msw_csv: String,
    pub peilschaal_csv: String,
    /// `<map/>` lines per section of `IdOPVLWATER`
    pub kunstwerken: Vec<String>,
    pub waterstanden: Vec<String>,
    pub msw: Vec<String>,
    pub parameters: Vec<String>,
    pub histtags_csv: String,
    pub ignored_histtag_csv: String,
    pub ignored_exloc_csv: String,
    pub ignored_ts800_csv: String,
    pub ignored_xy_csv: String,
    /// `(sheet, description)` rows of the input table of contents
    pub toc: Vec<(String, String)>,
}

impl FewsTree {
    pub fn happy() -> Self {
        Self {
            hoofd_csv: "LOC_ID,LOC_NAME,X,Y,ALLE_TYPES,START,EIND,SYSTEEM,RAYON,KOMPAS\n\
                        KW100010,STUW1_1000-K_STUW1,140000,450000,stuw,20200101,20201231,S1,R1,N\n"
                .to_string(),
            hoofd_validations_csv: "LOC_ID,HS1_HMAX,HS1_HMIN\nKW100010,2.0,1.0\n".to_string(),
            sub_csv: "LOC_ID,LOC_NAME,PAR_ID,TYPE,FUNCTIE,ALLE_TYPES,X,Y,START,EIND,SYSTEEM,RAYON,KOMPAS,HBOV,HBEN,HBOVPS,HBENPS,HK_HMAX,HK_HMIN\n\
                      KW100011,STUW1_1000-K_STUW1-stuw1_sturing,KW100010,stuw,sturing,stuw,140000,450000,20200101,20201231,S1,R1,N,,,,,1.5,0.5\n"
                .to_string(),
            waterstand_csv: "LOC_ID,LOC_NAME,X,Y,START,EIND,PEILSCHAAL,HIST_TAG,HARDMAX,WIN_SMAX,OV_SMAX,ZOM_SMAX,WIN_SMIN,OV_SMIN,ZOM_SMIN,HARDMIN\n"
                .to_string(),
            msw_csv: "LOC_ID,LOC_NAME,X,Y\n".to_string(),
            peilschaal_csv: "LOC_ID,LOC_NAME,X,Y\n".to_string(),
            kunstwerken: vec![
                map("1000", "HS1", "KW100010", "H.S.0"),
                map("1000", "SW1", "KW100011", "Hk.0"),
            ],
            waterstanden: Vec::new(),
            msw: Vec::new(),
            parameters: vec!["H.S.0".to_string(), "Hk.0".to_string()],
            histtags_csv: "serie,total_min_start_dt,total_max_end_dt\n\
                           1000_HS1,2020-01-01 00:00:00,2020-12-31 00:00:00\n"
                .to_string(),
            ignored_histtag_csv: "UNKNOWN_SERIE\n".to_string(),
            ignored_exloc_csv: "externalLocation,internalLocation\n".to_string(),
            ignored_ts800_csv: "externalLocation,internalLocation\n".to_string(),
            ignored_xy_csv: "internalLocation,x,y\n".to_string(),
            toc: vec![(
                "hloc error".to_string(),
                "sublocaties met afwijkende hoofdlocatie-gegevens".to_string(),
            )],
        }
    }

    fn main_idmap(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<idMap xmlns=\"http://www.wldelft.nl/fews\" version=\"1.1\">\n",
        );
        for (marker, maps) in [
            (KUNSTWERK_MARKER, &self.kunstwerken),
            (WATERSTAND_MARKER, &self.waterstanden),
            (MSW_MARKER, &self.msw),
        ] {
            xml.push_str(marker);
            xml.push('\n');
            for line in maps {
                xml.push_str(line);
                xml.push('\n');
            }
        }
        xml.push_str("</idMap>\n");
        xml
    }

    fn parameters_xml(&self) -> String {
        let mut xml = String::from(
            "<parameters xmlns=\"http://www.wldelft.nl/fews\">\n<parameterGroups>\n<parameterGroup id=\"Waterhoogte\">\n",
        );
        for id in &self.parameters {
            xml.push_str(&format!("  <parameter id=\"{id}\"><shortName>{id}</shortName></parameter>\n"));
        }
        xml.push_str("</parameterGroup>\n</parameterGroups>\n</parameters>\n");
        xml
    }

    fn write_input_workbook(&self, path: &Path) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("inhoudsopgave").unwrap();
        sheet.write_string(0, 0, "werkblad").unwrap();
        sheet.write_string(0, 1, "beschrijving").unwrap();
        for (i, (name, description)) in self.toc.iter().enumerate() {
            let row = u32::try_from(i + 1).unwrap();
            sheet.write_string(row, 0, name).unwrap();
            sheet.write_string(row, 1, description).unwrap();
        }
        workbook.save(path).unwrap();
    }

    /// Write the tree and return the directory with a config pointing at it.
    pub fn write(&self) -> (TempDir, MptConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let fews = root.join("config");

        write(&fews, "RegionConfigFiles/LocationSets.xml", LOCATION_SETS);
        write(&fews, "RegionConfigFiles/Parameters.xml", &self.parameters_xml());
        write(&fews, "MapLayerFiles/oppvlwater_hoofdloc.csv", &self.hoofd_csv);
        write(
            &fews,
            "MapLayerFiles/oppvlwater_hoofdloc_validations.csv",
            &self.hoofd_validations_csv,
        );
        write(&fews, "MapLayerFiles/oppvlwater_subloc.csv", &self.sub_csv);
        write(&fews, "MapLayerFiles/oppvlwater_waterstanden.csv", &self.waterstand_csv);
        write(&fews, "MapLayerFiles/msw_stations.csv", &self.msw_csv);
        write(&fews, "MapLayerFiles/oppvlwater_peilschalen.csv", &self.peilschaal_csv);

        let config = MptConfig::default();
        for file in &config.idmap.files {
            let xml = if *file == config.idmap.main_file {
                self.main_idmap()
            } else {
                "<idMap version=\"1.1\">\n</idMap>\n".to_string()
            };
            write(&fews, &format!("IdMapFiles/{file}.xml"), &xml);
        }

        write(root, "histtags.csv", &self.histtags_csv);
        write(root, "ignored_histtag.csv", &self.ignored_histtag_csv);
        write(root, "ignored_exloc.csv", &self.ignored_exloc_csv);
        write(root, "ignored_ts800.csv", &self.ignored_ts800_csv);
        write(root, "ignored_xy.csv", &self.ignored_xy_csv);
        self.write_input_workbook(&root.join("consistency_input.xlsx"));

        let config = config_for(root);
        (dir, config)
    }
}

/// Default config with every path inside `root`.
pub fn config_for(root: &Path) -> MptConfig {
    let mut config = MptConfig::default();
    let paths = &mut config.paths;
    paths.fews_config = root.join("config");
    paths.histtags_csv = root.join("histtags.csv");
    paths.consistency_input_xlsx = root.join("consistency_input.xlsx");
    paths.output_dir = root.join("output");
    paths.ignored_histtag = root.join("ignored_histtag.csv");
    paths.ignored_exloc = root.join("ignored_exloc.csv");
    paths.ignored_ts800 = root.join("ignored_ts800.csv");
    paths.ignored_xy = root.join("ignored_xy.csv");
    config
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

pub fn expected_summary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/expected_summary.json")
}
