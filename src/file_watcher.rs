use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use failure::Error;
use log::warn;
use notify::{watcher, DebouncedEvent, RecommendedWatcher, RecursiveMode, Watcher};

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches one data directory and mirrors its files as `name -> content`.
/// Consumers poll for changed names and replace their in-memory documents
/// wholesale; there is no partial merge.
pub struct DirWatcher {
    // Held for its Drop; dropping the watcher ends the native watch.
    _watcher: RecommendedWatcher,
    receiver: Receiver<DebouncedEvent>,
    root: PathBuf,
    files: HashMap<String, String>,
}

impl DirWatcher {
    pub fn new<T: AsRef<Path>>(root: T) -> Result<DirWatcher, Error> {
        let (sender, receiver) = channel();
        let mut native = watcher(sender, DEBOUNCE)?;
        native.watch(root.as_ref(), RecursiveMode::NonRecursive)?;

        let mut files = HashMap::new();
        for entry in fs::read_dir(root.as_ref())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.insert(name, fs::read_to_string(entry.path())?);
        }

        Ok(DirWatcher {
            _watcher: native,
            receiver,
            root: root.as_ref().to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(|s| s.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.files.keys()
    }

    /// Drains pending filesystem events, re-reads affected files, and
    /// returns the names whose content actually changed. Empty reads and
    /// unchanged content are ignored (editors often touch files twice).
    pub fn poll(&mut self) -> Vec<String> {
        let mut changed = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                DebouncedEvent::Write(path) | DebouncedEvent::Create(path) => {
                    let name = match path.file_name() {
                        Some(name) => name.to_string_lossy().into_owned(),
                        None => continue,
                    };
                    match fs::read_to_string(&path) {
                        Ok(content) => {
                            if content.is_empty() {
                                continue;
                            }
                            if self.files.get(&name).map(|s| s.as_str()) == Some(content.as_str())
                            {
                                continue;
                            }
                            self.files.insert(name.clone(), content);
                            changed.push(name);
                        }
                        Err(e) => {
                            warn!("unable to re-read {}: {}", path.display(), e);
                        }
                    }
                }
                DebouncedEvent::Remove(path) => {
                    if let Some(name) = path.file_name() {
                        self.files.remove(&name.to_string_lossy().into_owned());
                    }
                }
                _ => (),
            }
        }
        changed
    }
}
