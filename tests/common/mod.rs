#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use unmark_cli::{ArtifactSink, Candidate, FileGate, Level, Notifier, SelectedFile};

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n% test document\n%%EOF\n";

#[derive(Default, Clone)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<(Level, String)> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: Level, message: &str) {
        self.events.lock().unwrap().push((level, message.to_string()));
    }
}

/// Remembers every save instead of touching the disk.
#[derive(Default)]
pub struct RecordingSink {
    saves: Mutex<Vec<(Vec<u8>, String)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saves(&self) -> Vec<(Vec<u8>, String)> {
        self.saves.lock().unwrap().clone()
    }
}

impl ArtifactSink for RecordingSink {
    fn save(&self, bytes: &[u8], suggested_name: &str) -> io::Result<PathBuf> {
        self.saves
            .lock()
            .unwrap()
            .push((bytes.to_vec(), suggested_name.to_string()));
        Ok(PathBuf::from("/saved").join(suggested_name))
    }
}

pub fn pdf_candidate(name: &str) -> Candidate {
    Candidate::new(name, "application/pdf", PDF_BYTES.to_vec())
}

/// A validated file, obtained the only way possible: through a gate.
pub fn selected_pdf(name: &str) -> SelectedFile {
    let mut gate = FileGate::new(RecordingNotifier::new());
    gate.select(pdf_candidate(name)).expect("pdf accepted")
}
