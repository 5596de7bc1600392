use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = "config.ini";
pub const SECTION_FILE_LIST: &str = "FILE_LIST";
pub const KEY_FILE_OPEN: &str = "file_open";

/// Named options grouped in sections. Implementations decide where they live.
pub trait SettingsProvider {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>>;
    fn set(&mut self, section: &str, key: &str, value: &str) -> Result<()>;
}

/// What opening a catalog entry brings up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileOpenMode {
    /// Containing folder only.
    #[default]
    None,
    /// The file itself only.
    Only,
    /// The file and its containing folder.
    Both,
}

impl FileOpenMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FileOpenMode::None => "NONE",
            FileOpenMode::Only => "ONLY",
            FileOpenMode::Both => "BOTH",
        }
    }
}

impl fmt::Display for FileOpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileOpenMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(FileOpenMode::None),
            "ONLY" => Ok(FileOpenMode::Only),
            "BOTH" => Ok(FileOpenMode::Both),
            other => Err(anyhow!("Unknown file open mode '{}'", other)),
        }
    }
}

/// Reads the open-file preference, falling back to `NONE` when it is unset
/// or unreadable as a mode.
pub fn file_open_mode(settings: &dyn SettingsProvider) -> Result<FileOpenMode> {
    let Some(raw) = settings.get(SECTION_FILE_LIST, KEY_FILE_OPEN)? else {
        return Ok(FileOpenMode::default());
    };
    match raw.parse() {
        Ok(mode) => Ok(mode),
        Err(e) => {
            warn!("Ignoring stored {}: {}", KEY_FILE_OPEN, e);
            Ok(FileOpenMode::default())
        }
    }
}

pub fn set_file_open_mode(settings: &mut dyn SettingsProvider, mode: FileOpenMode) -> Result<()> {
    settings.set(SECTION_FILE_LIST, KEY_FILE_OPEN, mode.as_str())
}

type Sections = Vec<(String, Vec<(String, String)>)>;

/// INI file backend. The file is read on every `get` and rewritten on every
/// `set`, keeping all other sections and keys.
pub struct IniSettings {
    path: PathBuf,
}

impl IniSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Sections> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open settings file {:?}", self.path))?;
        parse_ini(BufReader::new(file))
    }

    fn save(&self, sections: &Sections) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&self.path)
            .with_context(|| format!("Failed to create settings file {:?}", self.path))?;
        for (i, (section, entries)) in sections.iter().enumerate() {
            if i > 0 {
                writeln!(file)?;
            }
            writeln!(file, "[{}]", section)?;
            for (key, value) in entries {
                writeln!(file, "{} = {}", key, value)?;
            }
        }
        Ok(())
    }
}

impl SettingsProvider for IniSettings {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>> {
        let sections = self.load()?;
        let value = sections
            .iter()
            .find(|(name, _)| name == section)
            .and_then(|(_, entries)| entries.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v.clone());
        Ok(value)
    }

    fn set(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        let mut sections = self.load()?;
        let index = match sections.iter().position(|(name, _)| name == section) {
            Some(i) => i,
            None => {
                sections.push((section.to_string(), Vec::new()));
                sections.len() - 1
            }
        };
        let entries = &mut sections[index].1;
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
        self.save(&sections)?;
        debug!("Saved [{}] {} = {} to {:?}", section, key, value, self.path);
        Ok(())
    }
}

fn parse_ini(reader: impl BufRead) -> Result<Sections> {
    let mut sections: Sections = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            sections.push((name.trim().to_string(), Vec::new()));
            continue;
        }

        let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) else {
            return Err(anyhow!("Malformed settings line {}: '{}'", lineno + 1, line));
        };
        let Some((_, entries)) = sections.last_mut() else {
            return Err(anyhow!("Settings line {} appears before any section", lineno + 1));
        };
        entries.push((key.trim().to_string(), value.trim().to_string()));
    }

    Ok(sections)
}
