//! HTML release notes rendered from the markdown changelog.

use std::fs;
use std::path::Path;

use pulldown_cmark::{html, Options, Parser};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Reader;

use crate::changelog::{read_lines, strip_keep_a_changelog_head};
use crate::error::{Result, TaskError};
use crate::xml;

const RELEASE_NOTES_CLASS: &str = "releasenotes";

/// Render `changelog` into `html_file`.
///
/// An existing HTML file only has the contents of its
/// `class='releasenotes'` element replaced, and is left alone when it has no
/// such element. A missing one is created as a bare page holding the notes.
pub fn create_release_notes_html(changelog: &Path, html_file: &Path) -> Result<()> {
    let lines = read_lines(changelog)?;
    let body = strip_keep_a_changelog_head(&lines).unwrap_or(&lines);
    let notes = markdown_to_html(&(body.join("\n") + "\n"));

    if !html_file.exists() {
        fs::write(
            html_file,
            format!(
                "<html><head></head><body><div class='{RELEASE_NOTES_CLASS}'>\n{notes}</div></body></html>"
            ),
        )?;
        tracing::info!("Created {}", html_file.display());
        return Ok(());
    }

    let page = fs::read_to_string(html_file)?;
    match replace_release_notes(&page, &notes)
        .map_err(|e| TaskError::Xml(format!("{}: {e}", html_file.display())))?
    {
        Some(updated) => {
            fs::write(html_file, updated)?;
            tracing::info!("Updated release notes in {}", html_file.display());
        }
        None => tracing::debug!(
            "No {RELEASE_NOTES_CLASS} element in {}, leaving it unchanged",
            html_file.display()
        ),
    }
    Ok(())
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(markdown, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// The page with the children of its first release notes element replaced
/// by `notes`, or `None` when there is no such element.
fn replace_release_notes(
    page: &str,
    notes: &str,
) -> std::result::Result<Option<String>, String> {
    let mut reader = Reader::from_str(page);
    let mut writer = xml::plain_writer();
    let mut found = false;
    // Depth inside the release notes element while its old children are dropped.
    let mut skipping = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        if skipping > 0 {
            match event {
                Event::Start(_) => skipping += 1,
                Event::End(end) => {
                    skipping -= 1;
                    if skipping == 0 {
                        write(&mut writer, Event::End(end))?;
                    }
                }
                Event::Eof => return Err("Unexpected EOF".into()),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(start) if !found && is_release_notes(&start)? => {
                found = true;
                skipping = 1;
                write(&mut writer, Event::Start(start))?;
                write(&mut writer, Event::Text(BytesText::from_escaped(notes)))?;
            }
            Event::Empty(start) if !found && is_release_notes(&start)? => {
                found = true;
                let end = BytesEnd::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                write(&mut writer, Event::Start(start))?;
                write(&mut writer, Event::Text(BytesText::from_escaped(notes)))?;
                write(&mut writer, Event::End(end))?;
            }
            Event::Eof => break,
            other => write(&mut writer, other)?,
        }
    }

    if !found {
        return Ok(None);
    }
    xml::finish(writer).map(Some).map_err(|e| e.to_string())
}

fn is_release_notes(element: &BytesStart<'_>) -> std::result::Result<bool, String> {
    Ok(xml::attribute(element, "class")?.as_deref() == Some(RELEASE_NOTES_CLASS))
}

fn write(writer: &mut xml::XmlWriter, event: Event<'_>) -> std::result::Result<(), String> {
    xml::write(writer, event).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CHANGELOG: &str =
        "## 2.3.9\n* with some random content\n* does some things\n## 2.3.7\n* more\n## 2.2.2\n* things\n";

    fn setup(page: Option<&str>) -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let tmp = TempDir::new().unwrap();
        let changelog = tmp.path().join("CHANGELOG.md");
        let html_file = tmp.path().join("ReleaseNotes.htm");
        fs::write(&changelog, CHANGELOG).unwrap();
        if let Some(page) = page {
            fs::write(&html_file, page).unwrap();
        }
        (tmp, changelog, html_file)
    }

    #[test]
    fn test_missing_changelog() {
        let tmp = TempDir::new().unwrap();
        let err = create_release_notes_html(
            &tmp.path().join("CHANGELOG.md"),
            &tmp.path().join("notes.htm"),
        )
        .unwrap_err();
        assert!(err.to_string().ends_with(") does not exist."));
    }

    #[test]
    fn test_creates_simple_page() {
        let (_tmp, changelog, html_file) = setup(None);
        create_release_notes_html(&changelog, &html_file).unwrap();
        let page = fs::read_to_string(&html_file).unwrap();
        assert!(page.starts_with("<html><head></head><body><div class='releasenotes'>\n<h2>2.3.9</h2>"));
        assert!(page.contains("<li>does some things</li>"));
        assert!(page.ends_with("</div></body></html>"));
    }

    #[test]
    fn test_page_without_release_notes_element_is_untouched() {
        let page = "<html>\n<body>\n<div class='notmarkdown'/>\n</body>\n</html>\n";
        let (_tmp, changelog, html_file) = setup(Some(page));
        create_release_notes_html(&changelog, &html_file).unwrap();
        assert_eq!(fs::read_to_string(&html_file).unwrap(), page);
    }

    #[test]
    fn test_only_release_notes_element_changes() {
        let page = "<html>\n<body>\n<div class='notmarkdown'/>\n<div class='releasenotes'/>\n</body>\n</html>\n";
        let (_tmp, changelog, html_file) = setup(Some(page));
        create_release_notes_html(&changelog, &html_file).unwrap();
        let updated = fs::read_to_string(&html_file).unwrap();
        assert!(updated.contains("<div class='notmarkdown'/>"));
        assert_eq!(updated.matches("releasenotes").count(), 1);
        assert!(updated.contains("<div class='releasenotes'><h2>2.3.9</h2>"));
        assert!(updated.contains("<li>does some things</li>"));
        assert!(updated.ends_with("</ul>\n</div>\n</body>\n</html>\n"));
    }

    #[test]
    fn test_existing_release_notes_are_replaced() {
        let page = "<html>\n<body>\n<div class='releasenotes'>\n<span class='note'/>\n<p>old <b>notes</b></p>\n</div>\n<p>footer</p>\n</body>\n</html>\n";
        let (_tmp, changelog, html_file) = setup(Some(page));
        create_release_notes_html(&changelog, &html_file).unwrap();
        let updated = fs::read_to_string(&html_file).unwrap();
        assert!(!updated.contains("class='note'"));
        assert!(!updated.contains("old"));
        assert!(updated.contains("<li>things</li>"));
        assert!(updated.contains("</div>\n<p>footer</p>"));
    }

    #[test]
    fn test_keep_a_changelog_head_is_dropped() {
        let tmp = TempDir::new().unwrap();
        let changelog = tmp.path().join("CHANGELOG.md");
        let html_file = tmp.path().join("notes.htm");
        fs::write(
            &changelog,
            "# Change Log\n\nAll notable changes.\n\n## [Unreleased]\n\n## [1.0.0] - 2020-12-05\n\n### Added\n- Feature\n",
        )
        .unwrap();
        create_release_notes_html(&changelog, &html_file).unwrap();
        let page = fs::read_to_string(&html_file).unwrap();
        assert!(!page.contains("Change Log"));
        assert!(!page.contains("Unreleased"));
        assert!(page.contains("<h2>[1.0.0] - 2020-12-05</h2>"));
    }

    #[test]
    fn test_keep_a_changelog_head_with_crlf_is_dropped() {
        let tmp = TempDir::new().unwrap();
        let changelog = tmp.path().join("CHANGELOG.md");
        let html_file = tmp.path().join("notes.htm");
        fs::write(
            &changelog,
            "# Change Log\r\n\r\n## [Unreleased]\r\n\r\n## [1.0.0] - 2020-12-05\r\n- Feature\r\n",
        )
        .unwrap();
        create_release_notes_html(&changelog, &html_file).unwrap();
        let page = fs::read_to_string(&html_file).unwrap();
        assert!(!page.contains("Unreleased"));
        assert!(page.contains("<h2>[1.0.0] - 2020-12-05</h2>"));
        assert!(page.contains("<li>Feature</li>"));
    }

    #[test]
    fn test_malformed_page_is_error() {
        let (_tmp, changelog, html_file) = setup(Some("<html><body></div></html>"));
        assert!(matches!(
            create_release_notes_html(&changelog, &html_file).unwrap_err(),
            TaskError::Xml(_)
        ));
    }

    #[test]
    fn test_markdown_to_html() {
        let html = markdown_to_html("# Hello\n\nThis is **bold** and ~~gone~~.");
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<del>gone</del>"));
    }
}
