//! Reading passages from files or stdin.

use std::io::Read;
use std::path::{Path, PathBuf};

use treesum_shared::{Result, SynthesisError};

/// How an input text is cut into passages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum SplitMode {
    /// Each input is one passage.
    File,
    /// Each non-blank line is a passage.
    Lines,
    /// Blank-line separated blocks are passages.
    Paragraphs,
}

/// Split `text` into trimmed, non-empty passages.
pub(crate) fn split(text: &str, mode: SplitMode) -> Vec<String> {
    let pieces: Vec<&str> = match mode {
        SplitMode::File => vec![text],
        SplitMode::Lines => text.lines().collect(),
        SplitMode::Paragraphs => {
            let mut blocks = Vec::new();
            let mut current: Vec<&str> = Vec::new();
            for line in text.lines() {
                if line.trim().is_empty() {
                    if !current.is_empty() {
                        blocks.push(current.join("\n"));
                        current.clear();
                    }
                } else {
                    current.push(line);
                }
            }
            if !current.is_empty() {
                blocks.push(current.join("\n"));
            }
            return blocks
                .into_iter()
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect();
        }
    };

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Read passages from `files` in order, or from stdin when `files` is empty.
pub(crate) fn read_passages(files: &[PathBuf], mode: SplitMode) -> Result<Vec<String>> {
    if files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| SynthesisError::io("<stdin>", e))?;
        return Ok(split(&text, mode));
    }

    let mut passages = Vec::new();
    for file in files {
        passages.extend(split(&read_file(file)?, mode));
    }
    Ok(passages)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| SynthesisError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "First paragraph\nstill first.\n\n\n  Second one.  \n\nThird\n";

    #[test]
    fn split_paragraphs() {
        let passages = split(TEXT, SplitMode::Paragraphs);
        assert_eq!(
            passages,
            vec!["First paragraph\nstill first.", "Second one.", "Third"]
        );
    }

    #[test]
    fn split_lines_drops_blanks() {
        let passages = split(TEXT, SplitMode::Lines);
        assert_eq!(
            passages,
            vec!["First paragraph", "still first.", "Second one.", "Third"]
        );
    }

    #[test]
    fn split_file_keeps_whole_text() {
        let passages = split(TEXT, SplitMode::File);
        assert_eq!(passages.len(), 1);
        assert!(passages[0].starts_with("First paragraph"));
        assert!(passages[0].ends_with("Third"));
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(split("  \n\n \n", SplitMode::Paragraphs).is_empty());
        assert!(split("", SplitMode::File).is_empty());
    }

    #[test]
    fn reads_files_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "one\n\ntwo").expect("write a");
        std::fs::write(&b, "three").expect("write b");

        let passages = read_passages(&[a, b], SplitMode::Paragraphs).expect("read");
        assert_eq!(passages, vec!["one", "two", "three"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_passages(&[PathBuf::from("/nonexistent/x.txt")], SplitMode::File)
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Io { .. }));
    }
}
