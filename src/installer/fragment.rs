//! The WiX fragment produced for a directory tree.
//!
//! Nodes are plain values built bottom-up by the tree walk and serialized in
//! one pass at the end.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Reader;

use crate::error::Result;
use crate::xml::{self, XmlWriter};

pub const WIX_NAMESPACE: &str = "http://schemas.microsoft.com/wix/2006/wi";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub directory_ref_id: String,
    pub children: Vec<FragmentNode>,
    pub component_group_id: String,
    pub component_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentNode {
    Directory {
        id: String,
        name: String,
        children: Vec<FragmentNode>,
    },
    Component(Component),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub id: String,
    /// Absent only when a check-only run found no registered GUID.
    pub guid: Option<String>,
    pub content: ComponentContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentContent {
    /// Grants everyone full control over the directory.
    CreateFolder { directory: String },
    File(FileEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub source: String,
    pub key_path: bool,
    pub permission: bool,
    /// Id of the `RemoveFile` cleanup instruction.
    pub remove_file_id: String,
}

impl Fragment {
    /// All components in document order, descending into directories.
    pub fn components(&self) -> Vec<&Component> {
        fn collect<'a>(nodes: &'a [FragmentNode], out: &mut Vec<&'a Component>) {
            for node in nodes {
                match node {
                    FragmentNode::Component(component) => out.push(component),
                    FragmentNode::Directory { children, .. } => collect(children, out),
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.children, &mut out);
        out
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = xml::indented_writer(4);

        xml::write(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
        )?;
        let mut wix = BytesStart::new("Wix");
        wix.push_attribute(("xmlns", WIX_NAMESPACE));
        xml::write(&mut writer, Event::Start(wix))?;
        xml::write(&mut writer, Event::Start(BytesStart::new("Fragment")))?;

        let mut directory_ref = BytesStart::new("DirectoryRef");
        directory_ref.push_attribute(("Id", self.directory_ref_id.as_str()));
        xml::write(&mut writer, Event::Start(directory_ref))?;
        write_nodes(&mut writer, &self.children)?;
        xml::write(&mut writer, Event::End(BytesEnd::new("DirectoryRef")))?;

        let mut group = BytesStart::new("ComponentGroup");
        group.push_attribute(("Id", self.component_group_id.as_str()));
        xml::write(&mut writer, Event::Start(group))?;
        for id in &self.component_refs {
            let mut component_ref = BytesStart::new("ComponentRef");
            component_ref.push_attribute(("Id", id.as_str()));
            xml::write(&mut writer, Event::Empty(component_ref))?;
        }
        xml::write(&mut writer, Event::End(BytesEnd::new("ComponentGroup")))?;

        xml::write(&mut writer, Event::End(BytesEnd::new("Fragment")))?;
        xml::write(&mut writer, Event::End(BytesEnd::new("Wix")))?;

        let mut out = xml::finish(writer)?;
        out.push('\n');
        Ok(out)
    }
}

/// The `ComponentRef` ids listed in a previously written fragment.
pub fn component_refs_in(contents: &str) -> std::result::Result<Vec<String>, String> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(true);

    let mut refs = Vec::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if xml::element_name(&e) == "ComponentRef" => {
                refs.push(xml::attribute(&e, "Id")?.ok_or("ComponentRef without Id")?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(refs)
}

fn write_nodes(writer: &mut XmlWriter, nodes: &[FragmentNode]) -> Result<()> {
    for node in nodes {
        match node {
            FragmentNode::Directory { id, name, children } => {
                let mut directory = BytesStart::new("Directory");
                directory.push_attribute(("Id", id.as_str()));
                directory.push_attribute(("Name", name.as_str()));
                xml::write(writer, Event::Start(directory))?;
                write_nodes(writer, children)?;
                xml::write(writer, Event::End(BytesEnd::new("Directory")))?;
            }
            FragmentNode::Component(component) => write_component(writer, component)?,
        }
    }
    Ok(())
}

fn write_component(writer: &mut XmlWriter, component: &Component) -> Result<()> {
    let mut start = BytesStart::new("Component");
    start.push_attribute(("Id", component.id.as_str()));
    if let Some(guid) = &component.guid {
        start.push_attribute(("Guid", guid.as_str()));
    }
    xml::write(writer, Event::Start(start))?;

    match &component.content {
        ComponentContent::CreateFolder { directory } => {
            let mut create_folder = BytesStart::new("CreateFolder");
            create_folder.push_attribute(("Directory", directory.as_str()));
            xml::write(writer, Event::Start(create_folder))?;
            write_permission(writer)?;
            xml::write(writer, Event::End(BytesEnd::new("CreateFolder")))?;
        }
        ComponentContent::File(file) => {
            let mut start = BytesStart::new("File");
            start.push_attribute(("Id", file.id.as_str()));
            start.push_attribute(("Name", file.name.as_str()));
            if file.key_path {
                start.push_attribute(("KeyPath", "yes"));
            }
            start.push_attribute(("Source", file.source.as_str()));
            if file.permission {
                xml::write(writer, Event::Start(start))?;
                write_permission(writer)?;
                xml::write(writer, Event::End(BytesEnd::new("File")))?;
            } else {
                xml::write(writer, Event::Empty(start))?;
            }

            // Catches files left over from earlier installs, on install and uninstall.
            let mut remove = BytesStart::new("RemoveFile");
            remove.push_attribute(("Id", file.remove_file_id.as_str()));
            remove.push_attribute(("On", "both"));
            remove.push_attribute(("Name", "*.*"));
            xml::write(writer, Event::Empty(remove))?;
        }
    }

    xml::write(writer, Event::End(BytesEnd::new("Component")))
}

fn write_permission(writer: &mut XmlWriter) -> Result<()> {
    let mut permission = BytesStart::new("Permission");
    permission.push_attribute(("GenericAll", "yes"));
    permission.push_attribute(("User", "Everyone"));
    xml::write(writer, Event::Empty(permission))
}
