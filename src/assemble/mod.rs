//! Linearize a populated outline into one markdown document

mod heading;

use heading::opens_with_heading;

use crate::config::{AssemblyConfig, MissingContentPolicy};
use crate::error::AssemblyError;
use crate::outline::{Outline, SectionIndex};
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
}

/// Render `outline` in pre-order, child-list order
///
/// A section with content gets a heading at its level (unless the content
/// already opens with that heading) followed by the content. A leaf without
/// content is skipped or rejected per `missing_content`. A parent without
/// content emits only its heading, and only when `parent_headings` is set
/// and something beneath it was emitted.
pub fn assemble(outline: &Outline, config: &AssemblyConfig) -> Result<String, AssemblyError> {
    let mut document = String::new();

    if config.front_matter {
        let yaml = serde_yaml::to_string(&FrontMatter {
            title: outline.title(),
        })
        .map_err(|e| AssemblyError::FrontMatter(e.to_string()))?;
        document.push_str("---\n");
        document.push_str(&yaml);
        if !yaml.ends_with('\n') {
            document.push('\n');
        }
        document.push_str("---\n\n");
    }

    for root in outline.roots() {
        emit(outline, root, config, &mut document)?;
    }
    Ok(document)
}

/// Append `index` and its subtree; returns whether anything was written
fn emit(
    outline: &Outline,
    index: &SectionIndex,
    config: &AssemblyConfig,
    out: &mut String,
) -> Result<bool, AssemblyError> {
    let section = match outline.get(index.as_str()) {
        Some(section) => section,
        None => return Ok(false),
    };
    let children = outline.children(index.as_str());
    let level = section.level();

    match section.written_content() {
        Some(content) => {
            if opens_with_heading(content, level, &section.title) {
                debug!("Section {} already carries its heading", index);
            } else {
                push_heading(out, level, &section.title);
            }
            out.push_str(content.trim_end_matches(['\n', '\r']));
            out.push('\n');
            for child in children {
                emit(outline, child, config, out)?;
            }
            Ok(true)
        }
        None if children.is_empty() => match config.missing_content {
            MissingContentPolicy::Skip => {
                debug!("Skipping section {} with no content", index);
                Ok(false)
            }
            MissingContentPolicy::Fail => Err(AssemblyError::MissingContent(index.to_string())),
        },
        None => {
            let mut body = String::new();
            let mut wrote = false;
            for child in children {
                wrote |= emit(outline, child, config, &mut body)?;
            }
            if wrote && config.parent_headings {
                push_heading(out, level, &section.title);
            }
            out.push_str(&body);
            Ok(wrote)
        }
    }
}

fn push_heading(out: &mut String, level: u8, title: &str) {
    for _ in 0..level {
        out.push('#');
    }
    out.push(' ');
    out.push_str(title.trim());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::{test_node as node, SectionNode};

    fn with_content(mut n: SectionNode, content: &str) -> SectionNode {
        n.content = Some(content.to_string());
        n
    }

    fn config() -> AssemblyConfig {
        AssemblyConfig::default()
    }

    #[test]
    fn test_intro_and_background() {
        let outline = Outline::new(
            "Report",
            vec![with_content(
                node(
                    "1",
                    "Intro",
                    vec![with_content(node("1.1", "Background", vec![]), "World.")],
                ),
                "Hello.",
            )],
        )
        .unwrap();

        assert_eq!(
            assemble(&outline, &config()).unwrap(),
            "# Intro\nHello.\n## Background\nWorld.\n"
        );
    }

    #[test]
    fn test_existing_heading_emitted_once() {
        let outline = Outline::new(
            "Report",
            vec![with_content(node("1", "Intro", vec![]), "# Intro\nHello.")],
        )
        .unwrap();

        let document = assemble(&outline, &config()).unwrap();
        assert_eq!(document.matches("# Intro").count(), 1);
        assert_eq!(document, "# Intro\nHello.\n");
    }

    #[test]
    fn test_deeper_heading_in_content_does_not_suppress() {
        let outline = Outline::new(
            "Report",
            vec![with_content(node("1", "Intro", vec![]), "## Intro\nHello.")],
        )
        .unwrap();

        let document = assemble(&outline, &config()).unwrap();
        assert!(document.starts_with("# Intro\n## Intro\n"));
    }

    fn partially_written() -> Outline {
        Outline::new(
            "Report",
            vec![
                node(
                    "1",
                    "Intro",
                    vec![
                        with_content(node("1.1", "Background", vec![]), "Background text."),
                        node("1.2", "Scope", vec![]),
                    ],
                ),
                node(
                    "2",
                    "Method",
                    vec![with_content(node("2.1", "Data", vec![]), "Data text.")],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_skip_missing_leaf_keeps_tree_order() {
        let document = assemble(&partially_written(), &config()).unwrap();
        assert_eq!(
            document,
            "# Intro\n## Background\nBackground text.\n# Method\n## Data\nData text.\n"
        );
        assert!(!document.contains("Scope"));
    }

    #[test]
    fn test_fail_on_missing_leaf_names_index() {
        let config = AssemblyConfig {
            missing_content: MissingContentPolicy::Fail,
            ..config()
        };
        assert_eq!(
            assemble(&partially_written(), &config),
            Err(AssemblyError::MissingContent("1.2".into()))
        );
    }

    #[test]
    fn test_parent_headings_disabled() {
        let config = AssemblyConfig {
            parent_headings: false,
            ..config()
        };
        let document = assemble(&partially_written(), &config).unwrap();
        assert_eq!(
            document,
            "## Background\nBackground text.\n## Data\nData text.\n"
        );
    }

    #[test]
    fn test_empty_branch_emits_nothing() {
        let outline = Outline::new(
            "Report",
            vec![
                node("1", "Empty", vec![node("1.1", "Nothing", vec![])]),
                with_content(node("2", "Full", vec![]), "Text."),
            ],
        )
        .unwrap();
        assert_eq!(assemble(&outline, &config()).unwrap(), "# Full\nText.\n");
    }

    #[test]
    fn test_levels_cap_at_six() {
        let deep = with_content(node("1.1.1.1.1.1.1", "Seven", vec![]), "Deep.");
        let mut chain = deep;
        for index in ["1.1.1.1.1.1", "1.1.1.1.1", "1.1.1.1", "1.1.1", "1.1", "1"] {
            chain = node(index, "Level", vec![chain]);
        }
        let outline = Outline::new("Deep", vec![chain]).unwrap();
        let config = AssemblyConfig {
            parent_headings: false,
            ..config()
        };
        assert_eq!(assemble(&outline, &config).unwrap(), "###### Seven\nDeep.\n");
    }

    #[test]
    fn test_front_matter() {
        let outline = Outline::new(
            "My Report",
            vec![with_content(node("1", "Intro", vec![]), "Hi.")],
        )
        .unwrap();
        let config = AssemblyConfig {
            front_matter: true,
            ..config()
        };
        let document = assemble(&outline, &config).unwrap();
        assert!(document.starts_with("---\ntitle: My Report\n---\n\n# Intro\n"));
    }
}
