//! Edge-timing capture files.
//!
//! A `.tim` capture is the text dump of edge intervals a microcontroller
//! sniffer records from the DCC line: unsigned microsecond deltas
//! separated by whitespace or newlines. `#` starts a comment that runs to
//! the end of the line.
//!
//! ```text
//! # NMRA test track, sniffer pin 2, 2024-11-03
//! 58 58 58 58 100 100 ...
//! ```

use std::path::Path;

use thiserror::Error;

use crate::decoder::TimeDelta;

/// Failures while reading a capture file.
#[derive(Debug, Error)]
pub enum CaptureFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: not an unsigned microsecond value: {token:?}")]
    Parse {
        path: String,
        line: usize,
        token: String,
    },
    #[error("{path}: no timing values found")]
    Empty { path: String },
}

/// Load a `.tim` capture into a delta vector.
pub fn load_capture(path: &Path) -> Result<Vec<TimeDelta>, CaptureFileError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| CaptureFileError::Io {
        path: display.clone(),
        source,
    })?;

    let mut deltas = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let data = line.split('#').next().unwrap_or("");
        for token in data.split_whitespace() {
            let delta: TimeDelta =
                token.parse().map_err(|_| CaptureFileError::Parse {
                    path: display.clone(),
                    line: idx + 1,
                    token: token.to_string(),
                })?;
            deltas.push(delta);
        }
    }

    if deltas.is_empty() {
        return Err(CaptureFileError::Empty { path: display });
    }
    tracing::info!("loaded {} edge deltas from {}", deltas.len(), path.display());
    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "dccmon-replay-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parses_values_and_comments() {
        let path = temp_file(
            "ok.tim",
            "# header comment\n58 58 100 100\n58 58  # trailing comment\n",
        );
        let deltas = load_capture(&path).unwrap();
        assert_eq!(deltas, vec![58, 58, 100, 100, 58, 58]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_bad_token_reports_line() {
        let path = temp_file("bad.tim", "58 58\n100 -3 100\n");
        let err = load_capture(&path).unwrap_err();
        match err {
            CaptureFileError::Parse { line, token, .. } => {
                assert_eq!(line, 2);
                assert_eq!(token, "-3");
            }
            other => panic!("unexpected error: {other}"),
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let path = temp_file("empty.tim", "# nothing but comments\n");
        assert!(matches!(
            load_capture(&path),
            Err(CaptureFileError::Empty { .. })
        ));
        std::fs::remove_file(&path).ok();
    }
}
