// ============================================================
// Layer 6 — Run Result Store
// ============================================================
// Persists the outcome of one evaluation run into its directory:
//
//   result.json      ← RunResult (scalars + silhouette mappings)
//   embeddings.bin   ← first-view embedding matrix
//   filenames.json   ← one identifier per embedding row
//
// embeddings.bin layout (all little-endian):
//   bytes 0..4    magic "EMB1"
//   bytes 4..12   u64 rows
//   bytes 12..20  u64 cols
//   bytes 20..    rows * cols f32
//
// Every file is written to a temporary file in the same directory
// and renamed over the target, so a reader sees either the old
// artifact or the new one, never a partial file.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::domain::embedding::EmbeddingMatrix;
use crate::domain::run_result::RunResult;
use crate::domain::traits::RunResultSource;
use crate::error::{EvalError, EvalResult};

pub const RESULT_FILE: &str = "result.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.bin";
pub const FILENAMES_FILE: &str = "filenames.json";

const MAGIC: &[u8; 4] = b"EMB1";
const HEADER_LEN: usize = 20;

pub struct RunResultWriter {
    run_dir: PathBuf,
}

impl RunResultWriter {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self { run_dir: run_dir.into() }
    }

    /// Write all three artifacts. Identifiers must align with matrix rows.
    pub fn write(
        &self,
        result:     &RunResult,
        embeddings: &EmbeddingMatrix,
        ids:        &[String],
    ) -> EvalResult<()> {
        if ids.len() != embeddings.n_rows() {
            return Err(EvalError::ShapeMismatch {
                context:  "identifiers per embedding row",
                expected: embeddings.n_rows(),
                found:    ids.len(),
            });
        }
        fs::create_dir_all(&self.run_dir)?;
        self.write_embeddings(embeddings)?;
        self.write_filenames(ids)?;
        self.write_result(result)?;
        tracing::info!(
            "Saved run artifacts to '{}' ({} x {} embeddings)",
            self.run_dir.display(),
            embeddings.n_rows(),
            embeddings.dim()
        );
        Ok(())
    }

    pub fn write_result(&self, result: &RunResult) -> EvalResult<()> {
        let json = serde_json::to_vec_pretty(result)?;
        write_atomic(&self.run_dir, RESULT_FILE, &json)
    }

    pub fn write_filenames(&self, ids: &[String]) -> EvalResult<()> {
        let json = serde_json::to_vec_pretty(ids)?;
        write_atomic(&self.run_dir, FILENAMES_FILE, &json)
    }

    pub fn write_embeddings(&self, embeddings: &EmbeddingMatrix) -> EvalResult<()> {
        write_atomic(&self.run_dir, EMBEDDINGS_FILE, &encode_embeddings(embeddings))
    }
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> EvalResult<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(name)).map_err(|e| e.error)?;
    Ok(())
}

fn encode_embeddings(m: &EmbeddingMatrix) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + m.as_slice().len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(m.n_rows() as u64).to_le_bytes());
    out.extend_from_slice(&(m.dim() as u64).to_le_bytes());
    if cfg!(target_endian = "little") {
        out.extend_from_slice(bytemuck::cast_slice(m.as_slice()));
    } else {
        for v in m.as_slice() {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

fn decode_embeddings(bytes: &[u8]) -> EvalResult<EmbeddingMatrix> {
    let corrupt = |message: String| EvalError::InvalidParameter { name: "embeddings", message };
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(corrupt("missing EMB1 header".to_string()));
    }
    let read_u64 = |at: usize| {
        let mut b = [0u8; 8];
        b.copy_from_slice(&bytes[at..at + 8]);
        u64::from_le_bytes(b) as usize
    };
    let (rows, cols) = (read_u64(4), read_u64(12));
    let payload = &bytes[HEADER_LEN..];
    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt(format!("header size {rows} x {cols} overflows")))?;
    if payload.len() != expected {
        return Err(corrupt(format!(
            "payload of {} bytes does not hold {rows} x {cols} f32",
            payload.len()
        )));
    }
    let data = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    EmbeddingMatrix::from_flat(cols, data)
}

/// Reads artifacts written by [`RunResultWriter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStore;

impl RunStore {
    pub fn read_embeddings(&self, run_dir: &Path) -> EvalResult<EmbeddingMatrix> {
        decode_embeddings(&read_artifact(&run_dir.join(EMBEDDINGS_FILE))?)
    }

    pub fn read_filenames(&self, run_dir: &Path) -> EvalResult<Vec<String>> {
        Ok(serde_json::from_slice(&read_artifact(&run_dir.join(FILENAMES_FILE))?)?)
    }
}

impl RunResultSource for RunStore {
    fn load_result(&self, run_dir: &Path) -> EvalResult<RunResult> {
        let bytes = read_artifact(&run_dir.join(RESULT_FILE))?;
        let mut result: RunResult = serde_json::from_slice(&bytes)?;
        result.run_id = run_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(result)
    }
}

fn read_artifact(path: &Path) -> EvalResult<Vec<u8>> {
    if !path.is_file() {
        return Err(EvalError::MissingRunArtifact { path: path.to_path_buf() });
    }
    Ok(fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run_result::SilhouetteScores;
    use tempfile::tempdir;

    fn sample_result() -> RunResult {
        let mut af = SilhouetteScores::new();
        af.insert(3, Some(0.123_456_789_012_345));
        let mut db = SilhouetteScores::new();
        db.insert("1.0", None);
        db.insert("1.5", Some(-0.2));
        RunResult::new("", 0.1 + 0.2, 16, 0.07)
            .with_scores("AffinityPropagation", af)
            .with_scores("DBSCAN", db)
    }

    #[test]
    fn test_round_trip_is_exact() {
        let dir = tempdir().unwrap();
        let run_dir = dir.path().join("run_16");
        let matrix = EmbeddingMatrix::from_rows(&[vec![1.5, -2.25], vec![f32::MIN_POSITIVE, 3.0e7]]).unwrap();
        let ids = vec!["sub-b".to_string(), "sub-a".to_string()];

        RunResultWriter::new(&run_dir).write(&sample_result(), &matrix, &ids).unwrap();

        let store = RunStore;
        let back = store.load_result(&run_dir).unwrap();
        assert_eq!(back.run_id, "run_16");
        assert_eq!(back.val_loss, 0.1 + 0.2);
        assert_eq!(back.temperature, 0.07);
        assert_eq!(back.latent_space_size, 16);
        assert_eq!(back.silhouette, sample_result().silhouette);
        assert_eq!(store.read_filenames(&run_dir).unwrap(), ids);
        assert_eq!(store.read_embeddings(&run_dir).unwrap(), matrix);
    }

    #[test]
    fn test_overwrite_leaves_no_temporary_files() {
        let dir = tempdir().unwrap();
        let writer = RunResultWriter::new(dir.path());
        let matrix = EmbeddingMatrix::from_rows(&[vec![0.0]]).unwrap();
        let ids = vec!["x".to_string()];
        writer.write(&sample_result(), &matrix, &ids).unwrap();
        writer
            .write(&RunResult::new("", 9.0, 4, 0.5), &matrix, &ids)
            .unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![EMBEDDINGS_FILE, FILENAMES_FILE, RESULT_FILE]);
        assert_eq!(RunStore.load_result(dir.path()).unwrap().val_loss, 9.0);
    }

    #[test]
    fn test_missing_result_is_reported() {
        let dir = tempdir().unwrap();
        match RunStore.load_result(dir.path()) {
            Err(EvalError::MissingRunArtifact { path }) => assert!(path.ends_with(RESULT_FILE)),
            other => panic!("expected MissingRunArtifact, got {other:?}"),
        }
    }

    #[test]
    fn test_ids_must_align_with_rows() {
        let dir = tempdir().unwrap();
        let matrix = EmbeddingMatrix::from_rows(&[vec![0.0], vec![1.0]]).unwrap();
        let err = RunResultWriter::new(dir.path())
            .write(&sample_result(), &matrix, &["only".to_string()])
            .unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_corrupt_embeddings_are_rejected() {
        assert!(decode_embeddings(b"EMB0xxxxxxxxxxxxxxxx").is_err());
        let mut bytes = encode_embeddings(&EmbeddingMatrix::from_rows(&[vec![1.0, 2.0]]).unwrap());
        bytes.pop();
        assert!(decode_embeddings(&bytes).is_err());

        let mut huge = MAGIC.to_vec();
        huge.extend_from_slice(&(u64::MAX / 2).to_le_bytes());
        huge.extend_from_slice(&3u64.to_le_bytes());
        huge.extend_from_slice(&[0u8; 12]);
        assert!(matches!(
            decode_embeddings(&huge),
            Err(EvalError::InvalidParameter { name: "embeddings", .. })
        ));
    }
}
