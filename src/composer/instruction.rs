//! Typed unpack instructions
//!
//! Preset steps arrive as a type tag plus a list of strings. They are
//! converted here, all at once, before anything touches the disk: an unknown
//! tag or a malformed payload anywhere in the list aborts the run with the
//! config document untouched.

use crate::error::{Error, ResolutionError, Result};
use crate::types::{ManifestRecord, UnpackStep};
use crate::utils::join_within;
use std::path::Path;

/// One (source, destination) pair for [`Instruction::InstallToConfigFolder`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallPair {
    /// Path relative to the artifact folder
    pub source: String,
    /// Path relative to the preset's config directory
    pub destination: String,
}

/// What an unpack step does, with its payload already interpreted
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Register sub-paths of the artifact folder as data directories
    Data(Vec<String>),
    /// Insert verbatim config lines
    DataDirect(Vec<String>),
    /// Register plugin files in load order
    Content(Vec<String>),
    /// Merge lines into the preset's settings.cfg
    Settings(Vec<String>),
    /// Register sub-paths of the artifact folder as resource directories
    Resources(Vec<String>),
    /// Delete named files inside the artifact folder
    DeleteList(Vec<String>),
    /// Delete files named in the given list files
    DeleteListByFile(Vec<String>),
    /// Copy files from the artifact folder into the preset's config directory
    InstallToConfigFolder(Vec<InstallPair>),
    /// Run the external plugin merger
    DeltaPlugin,
}

impl Instruction {
    /// Type tag as it appears in presets
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Data(_) => "DATA",
            Instruction::DataDirect(_) => "DATA_DIRECT",
            Instruction::Content(_) => "CONTENT",
            Instruction::Settings(_) => "SETTINGS",
            Instruction::Resources(_) => "RESOURCES",
            Instruction::DeleteList(_) => "DELETE_LIST",
            Instruction::DeleteListByFile(_) => "DELETE_LIST_BY_FILE",
            Instruction::InstallToConfigFolder(_) => "INSTALL_TO_OMW_FOLDER",
            Instruction::DeltaPlugin => "DELTA_PLUGIN",
        }
    }

    /// Whether the instruction operates on an extracted artifact folder
    pub fn needs_record(&self) -> bool {
        matches!(
            self,
            Instruction::Data(_)
                | Instruction::Resources(_)
                | Instruction::DeleteList(_)
                | Instruction::DeleteListByFile(_)
                | Instruction::InstallToConfigFolder(_)
        )
    }

    /// Interpret a raw step
    ///
    /// Paths that name files on disk (delete lists, list files, install
    /// pairs) must stay inside their folder; one that does not is an
    /// `InvalidInstruction`.
    pub fn from_step(step_index: usize, step: &UnpackStep) -> Result<Self> {
        let data = step.data.clone();
        let instruction = match step.kind.trim() {
            "DATA" => Instruction::Data(data),
            "DATA_DIRECT" => Instruction::DataDirect(data),
            "CONTENT" => Instruction::Content(data),
            "SETTINGS" => Instruction::Settings(data),
            "RESOURCES" => Instruction::Resources(data),
            "DELETE_LIST" => {
                confined(step_index, "DELETE_LIST", &data)?;
                Instruction::DeleteList(data)
            }
            "DELETE_LIST_BY_FILE" => {
                confined(step_index, "DELETE_LIST_BY_FILE", &data)?;
                Instruction::DeleteListByFile(data)
            }
            "INSTALL_TO_OMW_FOLDER" => {
                confined(step_index, "INSTALL_TO_OMW_FOLDER", &data)?;
                if data.len() % 2 != 0 {
                    return Err(Error::InvalidInstruction {
                        step_index,
                        reason: format!(
                            "INSTALL_TO_OMW_FOLDER needs (source, destination) pairs, got {} entries",
                            data.len()
                        ),
                    });
                }
                Instruction::InstallToConfigFolder(
                    data.chunks_exact(2)
                        .map(|pair| InstallPair {
                            source: pair[0].clone(),
                            destination: pair[1].clone(),
                        })
                        .collect(),
                )
            }
            "DELTA_PLUGIN" => Instruction::DeltaPlugin,
            other => {
                return Err(Error::UnknownInstruction {
                    step_index,
                    kind: other.to_string(),
                });
            }
        };
        Ok(instruction)
    }
}

fn confined(step_index: usize, kind: &str, paths: &[String]) -> Result<()> {
    match paths
        .iter()
        .find(|p| join_within(Path::new(""), p).is_none())
    {
        Some(path) => Err(Error::InvalidInstruction {
            step_index,
            reason: format!("{} path {:?} leaves its folder", kind, path),
        }),
        None => Ok(()),
    }
}

/// A validated step, ready to run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedStep {
    /// Position in the preset's unpack list
    pub index: usize,
    /// Mod identity, `<= 0` when unused
    pub mod_id: i32,
    /// Position among the mod's manifest records
    pub file_index: usize,
    /// Interpreted payload
    pub instruction: Instruction,
}

/// Convert every step up front; the first bad step fails the whole plan
pub fn plan(steps: &[UnpackStep]) -> Result<Vec<PlannedStep>> {
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            Ok(PlannedStep {
                index,
                mod_id: step.mod_id,
                file_index: step.file_index,
                instruction: Instruction::from_step(index, step)?,
            })
        })
        .collect()
}

/// Find the manifest record a step operates on
///
/// Records are filtered by mod id and indexed positionally in arrival order.
/// Steps that do not touch an artifact folder resolve to `None`.
pub fn resolve_record<'a>(
    records: &'a [ManifestRecord],
    step: &PlannedStep,
) -> Result<Option<&'a ManifestRecord>> {
    if !step.instruction.needs_record() {
        return Ok(None);
    }
    if step.mod_id <= 0 {
        return Err(ResolutionError::RecordRequired {
            step_index: step.index,
            kind: step.instruction.kind(),
        }
        .into());
    }

    let matching: Vec<&ManifestRecord> =
        records.iter().filter(|r| r.mod_id == step.mod_id).collect();
    if matching.is_empty() {
        return Err(ResolutionError::NoRecordsForMod {
            mod_id: step.mod_id,
        }
        .into());
    }
    match matching.get(step.file_index) {
        Some(record) => Ok(Some(record)),
        None => Err(ResolutionError::IndexOutOfRange {
            mod_id: step.mod_id,
            file_index: step.file_index,
            available: matching.len(),
        }
        .into()),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn step(kind: &str, mod_id: i32, data: &[&str]) -> UnpackStep {
        UnpackStep {
            mod_id,
            file_index: 0,
            kind: kind.into(),
            data: data.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn record(file_name: &str, mod_id: i32) -> ManifestRecord {
        ManifestRecord {
            file_name: file_name.into(),
            mod_id,
            file_display_name: file_name.into(),
        }
    }

    #[test]
    fn every_known_tag_parses() {
        for tag in [
            "DATA",
            "DATA_DIRECT",
            "CONTENT",
            "SETTINGS",
            "RESOURCES",
            "DELETE_LIST",
            "DELETE_LIST_BY_FILE",
            "INSTALL_TO_OMW_FOLDER",
            "DELTA_PLUGIN",
        ] {
            let instruction = Instruction::from_step(0, &step(tag, 1, &[])).unwrap();
            assert_eq!(instruction.kind(), tag);
        }
    }

    #[test]
    fn install_pairs_are_grouped() {
        let instruction = Instruction::from_step(
            0,
            &step("INSTALL_TO_OMW_FOLDER", 1, &["a.txt", "a", "b.txt", "b"]),
        )
        .unwrap();
        let Instruction::InstallToConfigFolder(pairs) = instruction else {
            panic!("wrong variant");
        };
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].source, "b.txt");
        assert_eq!(pairs[1].destination, "b");
    }

    #[test]
    fn odd_install_payload_is_rejected() {
        let err = Instruction::from_step(4, &step("INSTALL_TO_OMW_FOLDER", 1, &["a", "b", "c"]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInstruction { step_index: 4, .. }));
    }

    #[test]
    fn file_paths_must_stay_in_their_folder() {
        for (kind, data) in [
            ("DELETE_LIST", &["textures/a.dds", "/tmp/victim"][..]),
            ("DELETE_LIST", &["../../x"][..]),
            ("DELETE_LIST_BY_FILE", &["..\\lists\\remove.txt"][..]),
            ("INSTALL_TO_OMW_FOLDER", &["shaders", "../../outside"][..]),
        ] {
            let err = Instruction::from_step(2, &step(kind, 1, data)).unwrap_err();
            assert!(
                matches!(err, Error::InvalidInstruction { step_index: 2, .. }),
                "{kind} {data:?} was accepted"
            );
        }

        // Data directives only name config paths and are left alone
        assert!(Instruction::from_step(0, &step("DATA", 1, &["../shared"])).is_ok());
    }

    #[test]
    fn plan_fails_on_first_unknown_tag() {
        let steps = vec![
            step("DATA", 1, &["."]),
            step("BOGUS", 0, &[]),
            step("CONTENT", 0, &["Mod.esp"]),
        ];
        match plan(&steps).unwrap_err() {
            Error::UnknownInstruction { step_index, kind } => {
                assert_eq!(step_index, 1);
                assert_eq!(kind, "BOGUS");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolve_by_position_within_mod() {
        let records = vec![record("a.zip", 5), record("b.zip", 6), record("c.zip", 5)];
        let mut planned = plan(&[step("DATA", 5, &["."])]).unwrap().remove(0);
        planned.file_index = 1;
        let found = resolve_record(&records, &planned).unwrap().unwrap();
        assert_eq!(found.file_name, "c.zip");

        planned.file_index = 2;
        let err = resolve_record(&records, &planned).unwrap_err();
        assert!(matches!(
            err,
            Error::Resolution(ResolutionError::IndexOutOfRange { available: 2, .. })
        ));
    }

    #[test]
    fn resolve_missing_mod_fails() {
        let planned = plan(&[step("DELETE_LIST", 9, &["x"])]).unwrap().remove(0);
        let err = resolve_record(&[], &planned).unwrap_err();
        assert!(matches!(
            err,
            Error::Resolution(ResolutionError::NoRecordsForMod { mod_id: 9 })
        ));
    }

    #[test]
    fn artifact_steps_need_a_mod_id() {
        let planned = plan(&[step("DATA", 0, &["."])]).unwrap().remove(0);
        let err = resolve_record(&[], &planned).unwrap_err();
        assert!(matches!(
            err,
            Error::Resolution(ResolutionError::RecordRequired { kind: "DATA", .. })
        ));
    }

    #[test]
    fn config_only_steps_resolve_to_none() {
        let planned = plan(&[step("CONTENT", 0, &["Mod.esp"])]).unwrap().remove(0);
        assert!(resolve_record(&[], &planned).unwrap().is_none());
    }
}
