use crate::data::Feature;
use crate::error::FeatureParseError;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Forward-only reader over an NDJSON element file.
///
/// Owns its file handle, which is released when the stream is dropped.
/// Yields `None` forever after the first error.
pub struct FeatureStream {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    position: usize,
    finished: bool,
}

impl FeatureStream {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::with_capacity(1 << 20, file).lines(),
            position: 0,
            finished: false,
        })
    }

    /// Records yielded so far, blank lines excluded.
    pub fn position(&self) -> usize {
        self.position
    }

    fn fail(&mut self, err: FeatureParseError) -> Option<Result<Feature, FeatureParseError>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl Iterator for FeatureStream {
    type Item = Result<Feature, FeatureParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(source)) => {
                    let position = self.position;
                    return self.fail(FeatureParseError::Io { position, source });
                }
                Some(Ok(line)) => line,
            };
            if line.trim().is_empty() {
                continue;
            }
            self.position += 1;
            let position = self.position;
            let value: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(source) => return self.fail(FeatureParseError::Json { position, source }),
            };
            return match Feature::from_value(value) {
                Ok(feature) => Some(Ok(feature)),
                Err(source) => self.fail(FeatureParseError::Element { position, source }),
            };
        }
    }
}

impl Drop for FeatureStream {
    fn drop(&mut self) {
        debug!(
            "Released feature stream {} after {} records",
            self.path.display(),
            self.position
        );
    }
}
