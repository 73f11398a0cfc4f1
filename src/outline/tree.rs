use crate::error::ValidationError;
use serde::Serialize;
use std::collections::HashMap;

use super::index::SectionIndex;
use super::serializer::{OutlineDocument, SectionNode};

/// One node of the outline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub index: SectionIndex,
    pub title: String,
    pub description: String,
    pub content: Option<String>,
}

impl Section {
    pub fn level(&self) -> u8 {
        self.index.level()
    }

    /// Content that is present and not just whitespace
    pub fn written_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    section: Section,
    children: Vec<SectionIndex>,
}

/// Validated section tree
///
/// Sections live in a flat map keyed by index; each entry lists its children
/// by key in render order. Construction validates the whole tree, so an
/// `Outline` value always has unique, well-formed indices where every child
/// extends its parent's index by one segment.
#[derive(Debug, Clone)]
pub struct Outline {
    title: String,
    roots: Vec<SectionIndex>,
    entries: HashMap<SectionIndex, Entry>,
}

impl Outline {
    pub fn new(title: impl Into<String>, sections: Vec<SectionNode>) -> Result<Self, ValidationError> {
        if sections.is_empty() {
            return Err(ValidationError::Empty);
        }

        let mut entries = HashMap::new();
        let mut roots = Vec::with_capacity(sections.len());
        for node in sections {
            roots.push(insert_node(&mut entries, node, None)?);
        }

        Ok(Self {
            title: title.into(),
            roots,
            entries,
        })
    }

    pub fn from_document(document: OutlineDocument) -> Result<Self, ValidationError> {
        Self::new(document.title, document.sections)
    }

    pub fn to_document(&self) -> OutlineDocument {
        OutlineDocument {
            title: self.title.clone(),
            sections: self.roots.iter().map(|i| self.to_node(i)).collect(),
        }
    }

    fn to_node(&self, index: &SectionIndex) -> SectionNode {
        let entry = &self.entries[index];
        SectionNode {
            index: index.to_string(),
            title: entry.section.title.clone(),
            description: entry.section.description.clone(),
            content: entry.section.content.clone(),
            children: entry.children.iter().map(|c| self.to_node(c)).collect(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn roots(&self) -> &[SectionIndex] {
        &self.roots
    }

    pub fn get(&self, index: &str) -> Option<&Section> {
        self.entries.get(index).map(|e| &e.section)
    }

    pub fn children(&self, index: &str) -> &[SectionIndex] {
        self.entries
            .get(index)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_leaf(&self, index: &str) -> bool {
        self.children(index).is_empty()
    }

    /// Depth-first pre-order in child-list order
    pub fn preorder(&self) -> Vec<&Section> {
        let mut out = Vec::with_capacity(self.entries.len());
        let mut stack: Vec<&SectionIndex> = self.roots.iter().rev().collect();
        while let Some(index) = stack.pop() {
            let entry = &self.entries[index];
            out.push(&entry.section);
            stack.extend(entry.children.iter().rev());
        }
        out
    }

    pub fn leaves(&self) -> Vec<&Section> {
        self.preorder()
            .into_iter()
            .filter(|s| self.is_leaf(s.index.as_str()))
            .collect()
    }

    /// Sections from the root down to, but excluding, `index`
    pub fn ancestors(&self, index: &str) -> Vec<&Section> {
        let mut chain = Vec::new();
        let mut current = self
            .entries
            .get_key_value(index)
            .and_then(|(k, _)| k.parent());
        while let Some(parent) = current {
            if let Some(entry) = self.entries.get(&parent) {
                chain.push(&entry.section);
            }
            current = parent.parent();
        }
        chain.reverse();
        chain
    }

    /// Record written content; returns false for an unknown index
    pub fn set_content(&mut self, index: &str, content: String) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.section.content = Some(content);
                true
            }
            None => false,
        }
    }
}

fn insert_node(
    entries: &mut HashMap<SectionIndex, Entry>,
    node: SectionNode,
    parent: Option<&SectionIndex>,
) -> Result<SectionIndex, ValidationError> {
    let index = SectionIndex::parse(&node.index)?;

    match parent {
        Some(parent) if !index.is_child_of(parent) => {
            return Err(ValidationError::OrphanedChild {
                child: index.to_string(),
                parent: parent.to_string(),
            });
        }
        None if index.depth() != 1 => {
            return Err(ValidationError::NestedRoot(index.to_string()));
        }
        _ => {}
    }

    if entries.contains_key(&index) {
        return Err(ValidationError::DuplicateIndex(index.to_string()));
    }

    entries.insert(
        index.clone(),
        Entry {
            section: Section {
                index: index.clone(),
                title: node.title,
                description: node.description,
                content: node.content,
            },
            children: Vec::new(),
        },
    );

    let mut children = Vec::with_capacity(node.children.len());
    for child in node.children {
        children.push(insert_node(entries, child, Some(&index))?);
    }
    if let Some(entry) = entries.get_mut(&index) {
        entry.children = children;
    }

    Ok(index)
}
