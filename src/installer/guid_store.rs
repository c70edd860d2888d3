//! Per-directory record of the GUID assigned to each installer component id.
//!
//! Windows Installer upgrades rely on a component keeping its GUID for as
//! long as the file it installs keeps its path, so the mapping lives next to
//! the files in a small XML sidecar that is checked into version control:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <!--This file is generated ...-->
//! <InstallerMetadata>
//!   <File Id="ProgramDir.app.exe" Guid="6B1AF4C5-..." />
//! </InstallerMetadata>
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Reader;
use uuid::Uuid;

use crate::diagnostics::Diagnostics;
use crate::error::{Result, TaskError};
use crate::xml;

pub const GUID_DATABASE_FILE_NAME: &str = ".guidsForInstaller.xml";

const ROOT_ELEMENT: &str = "InstallerMetadata";

const HEADER_COMMENT: &str = "This file is generated and then updated by a build task.  \
It preserves the automatically-generated guids assigned files that will be installed on user \
machines. So it should be held in source control.";

/// Outcome of looking up the GUID for a component id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidLookup {
    /// The id was already registered.
    Existing(String),
    /// A new GUID was minted and the sidecar rewritten.
    Created(String),
    /// Check-only mode and the id has no GUID yet.
    Missing,
}

impl GuidLookup {
    pub fn guid(&self) -> Option<&str> {
        match self {
            GuidLookup::Existing(guid) | GuidLookup::Created(guid) => Some(guid),
            GuidLookup::Missing => None,
        }
    }
}

#[derive(Debug)]
pub struct GuidStore {
    path: PathBuf,
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl GuidStore {
    /// Load the sidecar of `directory`, or start an empty store bound to it.
    pub fn load(directory: &Path) -> Result<Self> {
        let path = directory.join(GUID_DATABASE_FILE_NAME);
        let mut store = Self {
            path,
            entries: Vec::new(),
            index: HashMap::new(),
        };
        if !store.path.exists() {
            return Ok(store);
        }

        let contents = fs::read_to_string(&store.path)?;
        for (id, guid) in parse_entries(&contents).map_err(|message| TaskError::GuidDatabase {
            path: store.path.clone(),
            message,
        })? {
            store.insert(id, guid);
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.index.get(id).map(|&i| self.entries[i].1.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// GUID for `id`, upper-cased.
    ///
    /// A missing id is an error in check-only mode; otherwise a fresh v4 GUID
    /// is registered and the whole sidecar rewritten straight away.
    pub fn get_or_create(
        &mut self,
        id: &str,
        just_check_dont_create: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<GuidLookup> {
        if let Some(guid) = self.get(id) {
            return Ok(GuidLookup::Existing(guid.to_uppercase()));
        }

        if just_check_dont_create {
            diagnostics.error(format!("No GUID for {id} in {}", self.path.display()));
            return Ok(GuidLookup::Missing);
        }

        tracing::debug!("No GUID for {id} in {}", self.path.display());
        let guid = Uuid::new_v4().to_string().to_uppercase();
        self.insert(id.to_string(), guid.clone());
        self.write()?;
        Ok(GuidLookup::Created(guid))
    }

    pub fn write(&self) -> Result<()> {
        write_entries(&self.path, &self.entries)
    }

    fn insert(&mut self, id: String, guid: String) {
        match self.index.get(&id) {
            Some(&i) => self.entries[i].1 = guid,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, guid));
            }
        }
    }
}

/// Serialize `entries` as a sidecar file at `path`, replacing it.
pub fn write_entries(path: &Path, entries: &[(String, String)]) -> Result<()> {
    let mut writer = xml::indented_writer(2);
    xml::write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
    )?;
    xml::write(&mut writer, Event::Comment(BytesText::new(HEADER_COMMENT)))?;
    xml::write(&mut writer, Event::Start(BytesStart::new(ROOT_ELEMENT)))?;
    for (id, guid) in entries {
        let mut file = BytesStart::new("File");
        file.push_attribute(("Id", id.as_str()));
        file.push_attribute(("Guid", guid.as_str()));
        xml::write(&mut writer, Event::Empty(file))?;
    }
    xml::write(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;

    let mut contents = xml::finish(writer)?;
    contents.push('\n');
    fs::write(path, contents)?;
    Ok(())
}

fn check_root(start: &BytesStart) -> std::result::Result<(), String> {
    if start.local_name().as_ref() == ROOT_ELEMENT.as_bytes() {
        return Ok(());
    }
    Err(format!(
        "Unexpected root element <{}>, expected <{ROOT_ELEMENT}>",
        String::from_utf8_lossy(start.local_name().as_ref())
    ))
}

fn parse_entries(contents: &str) -> std::result::Result<Vec<(String, String)>, String> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(true);

    // Skip the declaration and leading comments up to the root element.
    let root_is_empty = loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                check_root(&e)?;
                break false;
            }
            Event::Empty(e) => {
                check_root(&e)?;
                break true;
            }
            Event::Eof => return Err("Unexpected EOF".into()),
            _ => {}
        }
    };

    let mut entries = Vec::new();
    if root_is_empty {
        return Ok(entries);
    }

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"File" => {
                let id = xml::attribute(&e, "Id")?;
                let guid = xml::attribute(&e, "Guid")?;
                match (id, guid) {
                    (Some(id), Some(guid)) => entries.push((id, guid)),
                    _ => return Err("Unexpected format: File entry needs Id and Guid".into()),
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"File" => {}
            Event::End(_) | Event::Eof => break,
            Event::Comment(_) => {}
            other => return Err(format!("Unexpected format: {other:?}")),
        }
    }

    Ok(entries)
}
