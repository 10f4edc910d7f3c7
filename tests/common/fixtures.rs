//! On-disk fixtures: workspace layout, presets, archives

use aradir::Preferences;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Engine config the tests start from
pub const ENGINE_CFG: &str = "\
data=\"/game/Data Files\"
content=Morrowind.esm
content=Tribunal.esm
content=Bloodmoon.esm
fallback=Water_Map_Alpha,0.4
";

/// Preset exercising every step that touches openmw.cfg, settings or files
pub const FULL_PRESET: &str = r#"
name: base
lastModified: 1700000000
sourceUrl: https://example.com/lists/base
downloadSteps:
  - type: nexus
    modId: 100
    siteFileName: Main File
  - type: nexus
    modId: 100
    siteFileName: Patch
  - type: nexus
    modId: 200
    siteFileName: Shaders
unpackSteps:
  - modId: 100
    fileIndex: 0
    type: DATA
    data: ["Data Files"]
  - modId: 100
    fileIndex: 1
    type: DATA
    data: ["."]
  - modId: 100
    fileIndex: 1
    type: DATA
    data: ["."]
  - type: CONTENT
    data: ["Main.esp", "Patch.esp", "Main.esp"]
  - type: SETTINGS
    data: ["[Shaders]", "force shaders = true"]
  - modId: 200
    type: INSTALL_TO_OMW_FOLDER
    data: ["shaders", "shaders", "readme.txt", "docs/readme.txt"]
  - modId: 100
    type: DELETE_LIST
    data: ["Data Files/unwanted.txt"]
  - type: DELTA_PLUGIN
"#;

/// Archive contents served by `FakeDownloader::standard`: (site name, file name, entries)
pub fn standard_archives() -> Vec<(&'static str, &'static str, Vec<(&'static str, &'static str)>)> {
    vec![
        (
            "Main File",
            "Main-100-1.zip",
            vec![
                ("Data Files/Main.esp", "main plugin"),
                ("Data Files/unwanted.txt", "junk"),
            ],
        ),
        ("Patch", "Patch-100-2.zip", vec![("Patch.esp", "patch plugin")]),
        (
            "Shaders",
            "Shaders-200-1.zip",
            vec![("shaders/water.frag", "frag"), ("readme.txt", "read me")],
        ),
    ]
}

/// Write a ZIP archive with the given (name, content) entries
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// A temporary install environment with preferences pointing into it
pub struct Workspace {
    /// Keeps the directory alive
    pub dir: TempDir,
    /// Preferences rooted in `dir`
    pub prefs: Preferences,
}

impl Workspace {
    /// Lay out a workspace holding `preset_yaml` as preset "base"
    pub fn new(preset_yaml: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let prefs = Preferences {
            preset: "base".into(),
            downloads: root.join("downloads"),
            modinstall: root.join("mods"),
            gamedata: root.join("game"),
            settings: root.join("settings"),
            openmw: root.join("openmw"),
            workdir: root.join("work"),
            ..Default::default()
        };

        std::fs::create_dir_all(&prefs.downloads).unwrap();
        std::fs::create_dir_all(&prefs.settings).unwrap();
        std::fs::write(prefs.settings.join("openmw.cfg"), ENGINE_CFG).unwrap();

        let preset_dir = prefs.preset_dir("base");
        std::fs::create_dir_all(&preset_dir).unwrap();
        std::fs::write(preset_dir.join("base.yaml"), preset_yaml).unwrap();

        Self { dir, prefs }
    }

    /// The composed openmw.cfg in the preset directory
    pub fn preset_cfg(&self) -> PathBuf {
        self.prefs.preset_dir("base").join("openmw.cfg")
    }

    /// Lines of the composed openmw.cfg
    pub fn preset_cfg_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.preset_cfg())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    /// Where archives for preset "base" are extracted
    pub fn install_root(&self) -> PathBuf {
        self.prefs.mod_install_folder("base")
    }

    /// Manifest file for preset "base"
    pub fn manifest_path(&self) -> PathBuf {
        self.prefs.manifest_path("base")
    }
}
