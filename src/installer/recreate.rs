//! Rebuild `.guidsForInstaller.xml` sidecars from a previously generated
//! fragment, for trees whose sidecars were lost but whose `.wxs` survived.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, TaskError};
use crate::installer::guid_store::{write_entries, GUID_DATABASE_FILE_NAME};
use crate::xml;

const CONTAINER_ELEMENTS: &[&str] = &[
    "Wix",
    "Fragment",
    "Directory",
    "DirectoryRef",
    "ComponentGroup",
    "ComponentRef",
];

struct OpenComponent {
    id: String,
    guid: String,
    depth: usize,
    source: Option<String>,
}

/// Write one sidecar per directory referenced from `wxs_file`.
///
/// Component sources are resolved against the directory holding the `.wxs`.
/// Returns the sidecar paths written, in path order.
pub fn recreate_guid_databases(wxs_file: &Path) -> Result<Vec<PathBuf>> {
    let contents = fs::read_to_string(wxs_file)?;
    let base_dir = wxs_file.parent().unwrap_or(Path::new(""));
    let wxs_error = |message: String| TaskError::Wxs {
        path: wxs_file.to_path_buf(),
        message,
    };

    let databases = collect_guids(&contents).map_err(wxs_error)?;

    let mut written = Vec::new();
    for (directory, entries) in databases {
        let directory = base_dir.join(directory);
        fs::create_dir_all(&directory)?;
        let sidecar = directory.join(GUID_DATABASE_FILE_NAME);
        tracing::info!("Writing {}", sidecar.display());
        write_entries(&sidecar, &entries)?;
        written.push(sidecar);
    }
    Ok(written)
}

fn collect_guids(
    contents: &str,
) -> std::result::Result<BTreeMap<PathBuf, Vec<(String, String)>>, String> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(true);

    let mut databases: BTreeMap<PathBuf, Vec<(String, String)>> = BTreeMap::new();
    let mut component: Option<OpenComponent> = None;
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match event {
            Event::Start(e) => {
                check_root(&e, &mut seen_root)?;
                open_element(&e, false, depth, &mut component)?;
                depth += 1;
            }
            Event::Empty(e) => {
                check_root(&e, &mut seen_root)?;
                open_element(&e, true, depth, &mut component)?;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if component.as_ref().is_some_and(|c| c.depth == depth) {
                    if let Some(done) = component.take() {
                        close_component(done, &mut databases)?;
                    }
                }
            }
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            other => return Err(format!("Unexpected format: {other:?}")),
        }
    }

    if !seen_root {
        return Err("Unexpected EOF".into());
    }
    Ok(databases)
}

fn check_root(element: &BytesStart<'_>, seen_root: &mut bool) -> std::result::Result<(), String> {
    if !*seen_root {
        let name = xml::element_name(element);
        if name != "Wix" {
            return Err(format!("Invalid root element {name}, expected <Wix>"));
        }
        *seen_root = true;
    }
    Ok(())
}

fn open_element(
    element: &BytesStart<'_>,
    is_empty: bool,
    depth: usize,
    component: &mut Option<OpenComponent>,
) -> std::result::Result<(), String> {
    let name = xml::element_name(element);

    if let Some(open) = component.as_mut() {
        // Only the first File matters; permissions and cleanup entries are skipped.
        if name == "File" && open.source.is_none() {
            open.source = Some(
                xml::attribute(element, "Source")?
                    .ok_or_else(|| format!("File in component {} has no Source", open.id))?,
            );
        }
        return Ok(());
    }

    if CONTAINER_ELEMENTS.contains(&name.as_str()) {
        return Ok(());
    }
    if name != "Component" {
        return Err(format!("Unknown element {name}"));
    }

    let id = xml::attribute(element, "Id")?.ok_or("Component without Id")?;
    if is_empty {
        return Err(format!("Expected <File> in component {id}"));
    }
    let guid = xml::attribute(element, "Guid")?
        .ok_or_else(|| format!("Component {id} has no Guid"))?;
    *component = Some(OpenComponent {
        id,
        guid,
        depth,
        source: None,
    });
    Ok(())
}

fn close_component(
    component: OpenComponent,
    databases: &mut BTreeMap<PathBuf, Vec<(String, String)>>,
) -> std::result::Result<(), String> {
    let source = component
        .source
        .ok_or_else(|| format!("Expected <File> in component {}", component.id))?;
    let directory = Path::new(&source.replace('\\', "/"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let entries = databases.entry(directory).or_default();
    match entries.iter_mut().find(|(id, _)| *id == component.id) {
        Some(entry) => entry.1 = component.guid,
        None => entries.push((component.id, component.guid)),
    }
    Ok(())
}
