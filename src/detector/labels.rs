use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

/// COCO-80 class names in YOLOv8 output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Class id to name table. Index is the class id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn coco() -> Self {
        Self {
            names: COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// One name per line, line index is the class id. Blank lines are kept so
    /// ids stay aligned with the model's output rows.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut names = reader
            .lines()
            .map(|line| line.map(|name| name.trim().to_string()))
            .collect::<std::io::Result<Vec<_>>>()
            .context("failed to read class names")?;

        // a trailing newline should not create a phantom class
        while names.last().is_some_and(|n| n.is_empty()) {
            names.pop();
        }

        if names.is_empty() {
            anyhow::bail!("class name list is empty");
        }
        Ok(Self { names })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open labels file {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn coco_table_matches_yolo_ids() {
        let names = ClassNames::coco();
        assert_eq!(names.len(), 80);
        assert_eq!(names.get(0), Some("person"));
        assert_eq!(names.get(16), Some("dog"));
        assert_eq!(names.get(67), Some("cell phone"));
        assert_eq!(names.get(79), Some("toothbrush"));
        assert_eq!(names.get(80), None);
    }

    #[test]
    fn reader_trims_and_drops_trailing_blanks() {
        let names = ClassNames::from_reader(Cursor::new("cat \n\n dog\n\n")).unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names.get(0), Some("cat"));
        assert_eq!(names.get(1), Some(""));
        assert_eq!(names.get(2), Some("dog"));
    }

    #[test]
    fn empty_reader_is_rejected() {
        assert!(ClassNames::from_reader(Cursor::new("\n\n")).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "widget").unwrap();
        writeln!(file, "gadget").unwrap();

        let names = ClassNames::from_file(file.path()).unwrap();
        assert_eq!(names.get(1), Some("gadget"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ClassNames::from_file(Path::new("/nonexistent/labels.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/labels.txt"));
    }
}
