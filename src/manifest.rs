//! Speaker registry and synthesis list parsing.
//!
//! Two CSV inputs drive a conversion run:
//!
//! - `speakers.csv` — one speaker identifier per row. Sorted and deduplicated
//!   into a [`SpeakerRegistry`]; a speaker's integer index is its position in
//!   the sorted list and conditions the vocoder's embedding lookup.
//! - the synthesis list — `(mel_path, speaker)` rows, processed in order.
//!   Mel paths are resolved relative to the parent of the data directory.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Sorted, deduplicated list of speaker identifiers.
///
/// Built once at startup; lookups return the sorted-order position used as
/// the vocoder's speaker index.
#[derive(Debug, Clone)]
pub struct SpeakerRegistry {
    speakers: Vec<String>,
}

impl SpeakerRegistry {
    /// Read a single-column CSV of speaker identifiers.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path.as_ref())
            .map_err(|e| Error::Manifest(format!("{}: {e}", path.as_ref().display())))?;

        let mut speakers = Vec::new();
        for record in reader.records() {
            let record = record?;
            let speaker = record
                .get(0)
                .ok_or_else(|| Error::Manifest("empty row in speaker manifest".into()))?;
            speakers.push(speaker.to_string());
        }

        Ok(Self::from_speakers(speakers))
    }

    /// Build a registry from raw identifiers: sort, then deduplicate.
    pub fn from_speakers(mut speakers: Vec<String>) -> Self {
        speakers.sort();
        speakers.dedup();
        Self { speakers }
    }

    /// Sorted-order index of a speaker; error if the speaker is unknown.
    pub fn index_of(&self, speaker: &str) -> Result<usize> {
        self.speakers
            .binary_search_by(|s| s.as_str().cmp(speaker))
            .map_err(|_| Error::Manifest(format!("speaker {speaker:?} not in registry")))
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}

/// One row of the synthesis list: a mel file and the target speaker.
#[derive(Debug, Clone)]
pub struct SynthesisEntry {
    /// Resolved mel path, without the `.mel.npy` suffix applied.
    pub mel_path: PathBuf,
    /// Target speaker identifier.
    pub speaker: String,
}

impl SynthesisEntry {
    /// The on-disk mel array path: extension replaced with `mel.npy`.
    pub fn mel_npy_path(&self) -> PathBuf {
        self.mel_path.with_extension("mel.npy")
    }

    /// Utterance identifier: the second `_`-delimited token of the file stem.
    pub fn utterance_id(&self) -> Result<&str> {
        let stem = self
            .mel_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                Error::Manifest(format!("mel path {:?} has no file stem", self.mel_path))
            })?;
        stem.split('_').nth(1).ok_or_else(|| {
            Error::Manifest(format!("mel stem {stem:?} has no underscore-delimited utterance id"))
        })
    }

    /// Output path: `<out_dir>/<speaker>_<utterance_id>.wav`.
    pub fn output_path(&self, out_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let utterance_id = self.utterance_id()?;
        Ok(out_dir
            .as_ref()
            .join(format!("{}_{}.wav", self.speaker, utterance_id)))
    }
}

/// Read the synthesis list CSV, resolving mel paths against the parent of
/// `data_dir`. Row order is preserved.
pub fn load_synthesis_list(
    path: impl AsRef<Path>,
    data_dir: impl AsRef<Path>,
) -> Result<Vec<SynthesisEntry>> {
    let base = data_dir.as_ref().parent().unwrap_or_else(|| Path::new(""));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())
        .map_err(|e| Error::Manifest(format!("{}: {e}", path.as_ref().display())))?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (mel, speaker) = match (record.get(0), record.get(1)) {
            (Some(mel), Some(speaker)) => (mel, speaker),
            _ => {
                return Err(Error::Manifest(format!(
                    "synthesis list line {} needs (mel_path, speaker)",
                    record.position().map(|p| p.line()).unwrap_or(0)
                )));
            }
        };
        entries.push(SynthesisEntry {
            mel_path: base.join(mel),
            speaker: speaker.to_string(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_sorted_and_deduplicated() {
        let registry = SpeakerRegistry::from_speakers(vec![
            "V002".into(),
            "S015".into(),
            "V001".into(),
            "S015".into(),
        ]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.index_of("S015").unwrap(), 0);
        assert_eq!(registry.index_of("V001").unwrap(), 1);
        assert_eq!(registry.index_of("V002").unwrap(), 2);
    }

    #[test]
    fn unknown_speaker_is_an_error() {
        let registry = SpeakerRegistry::from_speakers(vec!["S015".into()]);
        let err = registry.index_of("V999").unwrap_err();
        assert!(err.to_string().contains("V999"), "got: {err}");
    }

    #[test]
    fn registry_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speakers.csv");
        std::fs::write(&path, "V002\nS015\nV001\n").unwrap();
        let registry = SpeakerRegistry::from_csv(&path).unwrap();
        assert_eq!(registry.index_of("V002").unwrap(), 2);
    }

    #[test]
    fn synthesis_list_resolves_against_data_dir_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synthesis.csv");
        std::fs::write(&path, "english/test/utt_007,V002\n").unwrap();

        let entries = load_synthesis_list(&path, "datasets/2019").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].mel_path,
            PathBuf::from("datasets/english/test/utt_007")
        );
        assert_eq!(entries[0].speaker, "V002");
    }

    #[test]
    fn synthesis_list_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synthesis.csv");
        std::fs::write(&path, "a/utt_001,S1\na/utt_003,S2\na/utt_002,S1\n").unwrap();

        let entries = load_synthesis_list(&path, "data").unwrap();
        let ids: Vec<_> = entries
            .iter()
            .map(|e| e.utterance_id().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["001", "003", "002"]);
    }

    #[test]
    fn mel_npy_suffix_replaces_extension() {
        let entry = SynthesisEntry {
            mel_path: PathBuf::from("a/b/utt_007"),
            speaker: "S".into(),
        };
        assert_eq!(entry.mel_npy_path(), PathBuf::from("a/b/utt_007.mel.npy"));

        let entry = SynthesisEntry {
            mel_path: PathBuf::from("a/b/utt_007.wav"),
            speaker: "S".into(),
        };
        assert_eq!(entry.mel_npy_path(), PathBuf::from("a/b/utt_007.mel.npy"));
    }

    #[test]
    fn utterance_id_is_second_token() {
        let entry = SynthesisEntry {
            mel_path: PathBuf::from("a/b/utt_007"),
            speaker: "S".into(),
        };
        assert_eq!(entry.utterance_id().unwrap(), "007");

        let entry = SynthesisEntry {
            mel_path: PathBuf::from("a/b/p225_042_extra"),
            speaker: "S".into(),
        };
        assert_eq!(entry.utterance_id().unwrap(), "042");
    }

    #[test]
    fn utterance_id_without_underscore_is_an_error() {
        let entry = SynthesisEntry {
            mel_path: PathBuf::from("a/b/utterance"),
            speaker: "S".into(),
        };
        assert!(entry.utterance_id().is_err());
    }

    #[test]
    fn output_path_format() {
        let entry = SynthesisEntry {
            mel_path: PathBuf::from("a/b/utt_007"),
            speaker: "V002".into(),
        };
        assert_eq!(
            entry.output_path("out").unwrap(),
            PathBuf::from("out/V002_007.wav")
        );
    }
}
