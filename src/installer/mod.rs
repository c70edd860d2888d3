//! WiX fragment generation for a directory tree.
//!
//! Every file under the root becomes a `Component` + `File` pair whose GUID is
//! kept stable across runs by the [`GuidStore`] sidecar in its directory.

pub mod fragment;
pub mod guid_store;
pub mod ids;
pub mod paths;
pub mod recreate;

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex::{Regex, RegexBuilder};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::FragmentOptions;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, TaskError};

pub use fragment::{Component, ComponentContent, FileEntry, Fragment, FragmentNode};
pub use guid_store::{GuidLookup, GuidStore, GUID_DATABASE_FILE_NAME};
pub use recreate::recreate_guid_databases;

use ids::IdRegistry;

/// Version-control metadata directories never shipped in an installer.
const SKIPPED_DIRECTORIES: &[&str] = &[".svn", "CVS", ".git"];

/// What one run produced.
#[derive(Debug)]
pub struct FragmentReport {
    pub fragment: Fragment,
    /// A file is newer than the previous output, or a GUID had to be minted.
    pub files_changed: bool,
    /// Whether the output file was (re)written by this run.
    pub written: bool,
    pub diagnostics: Diagnostics,
}

impl FragmentReport {
    pub fn succeeded(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Turn logged errors (missing GUIDs in check-only mode) into an `Err`.
    pub fn ensure_success(self) -> Result<Self> {
        if self.succeeded() {
            Ok(self)
        } else {
            Err(TaskError::IntegrityCheck {
                count: self.diagnostics.errors().len(),
            })
        }
    }
}

/// Walk `options.root_directory` and write the fragment to
/// `options.output_file_path` when anything installable changed.
///
/// An existing output file is the reference point for "changed": when no file
/// is newer than it, all GUIDs are already registered and it lists exactly
/// the same components, it is left untouched. A run that logs errors removes
/// the stale output rather than leaving it.
pub fn make_wix_for_dir_tree(options: &FragmentOptions) -> Result<FragmentReport> {
    let output = std::path::absolute(&options.output_file_path)?;
    if !options.root_directory.is_dir() {
        remove_if_exists(&output)?;
        return Err(TaskError::DirectoryNotFound {
            path: options.root_directory.clone(),
        });
    }

    tracing::info!(
        "Creating Wix fragment for {}",
        options.root_directory.display()
    );

    let reference_time = fs::metadata(&output).and_then(|m| m.modified()).ok();
    let mut builder = FragmentBuilder::new(options, &output, reference_time)?;
    let fragment = match builder.build() {
        Ok(fragment) => fragment,
        Err(e) => {
            remove_if_exists(&output)?;
            return Err(e);
        }
    };
    if !builder.files_changed && lists_other_components(&output, &fragment) {
        builder.files_changed = true;
    }

    let mut written = false;
    if builder.diagnostics.has_errors() {
        remove_if_exists(&output)?;
    } else if builder.files_changed && !options.check_only {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output, fragment.to_xml()?)?;
        tracing::info!("Wrote {}", output.display());
        written = true;
    } else {
        tracing::info!("No installable changes; {} left as is", output.display());
    }

    Ok(FragmentReport {
        fragment,
        files_changed: builder.files_changed,
        written,
        diagnostics: builder.diagnostics,
    })
}

/// Whether the previous output, if any, references a different set of
/// components, e.g. because a file was deleted or newly ignored.
fn lists_other_components(output: &Path, fragment: &Fragment) -> bool {
    let Ok(contents) = fs::read_to_string(output) else {
        return false;
    };
    match fragment::component_refs_in(&contents) {
        Ok(previous) => previous != fragment.component_refs,
        Err(e) => {
            tracing::debug!("Can't read components of {}: {e}", output.display());
            true
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// State for a single tree walk. Built fresh for each run.
pub struct FragmentBuilder<'a> {
    options: &'a FragmentOptions,
    root: PathBuf,
    source_base: PathBuf,
    include: Regex,
    ignore: Regex,
    excluded: HashSet<String>,
    /// Canonical paths of directories already walked, so symlinked
    /// directories cannot loop or be listed twice.
    visited: HashSet<PathBuf>,
    components: Vec<String>,
    ids: IdRegistry,
    reference_time: Option<SystemTime>,
    files_changed: bool,
    diagnostics: Diagnostics,
}

impl<'a> FragmentBuilder<'a> {
    pub fn new(
        options: &'a FragmentOptions,
        output_file: &Path,
        reference_time: Option<SystemTime>,
    ) -> Result<Self> {
        let root = std::path::absolute(&options.root_directory)?;
        let source_base = match &options.installer_source_directory {
            Some(dir) => std::path::absolute(dir)?,
            None => output_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };

        let excluded = options
            .exclude
            .iter()
            .map(|path| {
                let full = if path.is_absolute() {
                    path.clone()
                } else {
                    root.join(path)
                };
                std::path::absolute(&full).map(|p| lowercase_key(&p))
            })
            .collect::<std::io::Result<HashSet<_>>>()?;

        Ok(Self {
            options,
            include: case_insensitive(&options.match_pattern)?,
            ignore: case_insensitive(&options.ignore_pattern)?,
            root,
            source_base,
            excluded,
            visited: HashSet::new(),
            components: Vec::new(),
            ids: IdRegistry::new(),
            reference_time,
            files_changed: false,
            diagnostics: Diagnostics::new(),
        })
    }

    pub fn build(&mut self) -> Result<Fragment> {
        let root = self.root.clone();
        self.visited.insert(fs::canonicalize(&root)?);
        let directory_ref_id = self.options.directory_reference_id.clone();
        let children = self.process_directory(&root, &directory_ref_id)?;

        Ok(Fragment {
            directory_ref_id,
            children,
            component_group_id: self.options.component_group_id.clone(),
            component_refs: std::mem::take(&mut self.components),
        })
    }

    fn process_directory(&mut self, dir: &Path, directory_id: &str) -> Result<Vec<FragmentNode>> {
        tracing::debug!("Processing dir {}", dir.display());

        let mut store = GuidStore::load(dir)?;
        let mut nodes = Vec::new();

        if self.options.give_all_permissions {
            nodes.push(FragmentNode::Component(
                self.directory_permission(&mut store, directory_id)?,
            ));
        }

        let mut files = Vec::new();
        let mut subdirectories = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => {
                    let path = e.path().map(Path::display);
                    self.diagnostics.warning(match path {
                        Some(path) => format!("Skipping {path}: broken link"),
                        None => format!("Skipping broken link in {}", dir.display()),
                    });
                    continue;
                }
                Err(e) if e.loop_ancestor().is_some() => {
                    let path = e.path().unwrap_or(dir);
                    self.diagnostics
                        .warning(format!("Skipping {}: link loop", path.display()));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if entry.file_type().is_dir() {
                subdirectories.push(entry.into_path());
            } else if entry.file_type().is_file() && self.keep_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        for (i, path) in files.iter().enumerate() {
            let component = self.process_file(path, &mut store, i == 0, directory_id)?;
            nodes.push(FragmentNode::Component(component));
        }

        for sub in subdirectories {
            let name = file_name(&sub);
            if self.is_excluded(&sub) || SKIPPED_DIRECTORIES.contains(&name.as_str()) {
                continue;
            }

            if !self.visited.insert(fs::canonicalize(&sub)?) {
                self.diagnostics.warning(format!(
                    "Skipping {}: directory already included",
                    sub.display()
                ));
                continue;
            }

            let id = ids::safe_directory_id(directory_id, Some(&name));
            let children = self.process_directory(&sub, &id)?;
            if children.is_empty() {
                self.diagnostics
                    .warning(format!("Skipping {}: nothing to install", sub.display()));
                continue;
            }
            nodes.push(FragmentNode::Directory { id, name, children });
        }

        Ok(nodes)
    }

    fn directory_permission(
        &mut self,
        store: &mut GuidStore,
        directory_id: &str,
    ) -> Result<Component> {
        let id = ids::safe_directory_id(directory_id, Some(""));
        let lookup = store.get_or_create(&id, self.options.check_only, &mut self.diagnostics)?;
        if matches!(lookup, GuidLookup::Created(_)) {
            self.files_changed = true;
        }
        self.components.push(id.clone());

        Ok(Component {
            guid: lookup.guid().map(str::to_string),
            content: ComponentContent::CreateFolder {
                directory: id.clone(),
            },
            id,
        })
    }

    fn keep_file(&self, path: &Path) -> bool {
        let full = path.to_string_lossy();
        let name = file_name(path);
        self.include.is_match(&full)
            && !self.ignore.is_match(&full)
            && !self.ignore.is_match(&name)
            && !self.is_excluded(path)
            && name != GUID_DATABASE_FILE_NAME
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.contains(&lowercase_key(path))
    }

    fn process_file(
        &mut self,
        path: &Path,
        store: &mut GuidStore,
        is_first: bool,
        directory_id: &str,
    ) -> Result<Component> {
        let name = file_name(path);
        let id = self.ids.disambiguate(ids::file_id(directory_id, &name));
        tracing::debug!("Adding file {} with id {id}", path.display());

        let lookup = store.get_or_create(&id, self.options.check_only, &mut self.diagnostics)?;
        match lookup {
            GuidLookup::Existing(_) => {}
            // A new or unregistered file.
            GuidLookup::Created(_) | GuidLookup::Missing => self.files_changed = true,
        }

        if self.is_newer_than_reference(path) {
            self.files_changed = true;
        }
        self.components.push(id.clone());

        Ok(Component {
            id: id.clone(),
            guid: lookup.guid().map(str::to_string),
            content: ComponentContent::File(FileEntry {
                id,
                name,
                source: paths::relative_path_to(&self.source_base, path),
                key_path: is_first,
                permission: self.options.give_all_permissions,
                remove_file_id: format!("_{}", Uuid::new_v4().simple()),
            }),
        })
    }

    fn is_newer_than_reference(&mut self, path: &Path) -> bool {
        let Some(reference) = self.reference_time else {
            return true;
        };
        match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified > reference,
            Err(e) => {
                self.diagnostics.warning(format!(
                    "Can't read modification time of {}: {e}",
                    path.display()
                ));
                true
            }
        }
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| TaskError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn lowercase_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}
