//! Per-document annotation block stored beside the inverted index.
//!
//! The inverted index only records term positions. Everything else an
//! annotated document carries (element occurrences with their end positions
//! and depths, attribute anchors, relation edges, character offsets per
//! token) lives in one binary block per document, stored in a bytes field
//! and read back without copying at query time.
//!
//! # Binary Format (v1)
//!
//! All multi-byte values are little-endian.
//!
//! ```text
//! HEADER (28 bytes):
//!   magic: u32 = 0x584E4143 ("CANX")
//!   version: u16 = 1
//!   name_count: u16
//!   token_count: u32
//!   elem_count: u32
//!   attr_count: u32
//!   rel_count: u32
//!   name_data_len: u32
//!
//! NAME_OFFSETS: (name_count + 1) × u32
//! NAME_DATA: concatenated UTF-8 strings
//! ELEMENTS: elem_count × PackedElement (20 bytes each)
//! ATTRIBUTES: attr_count × PackedAttribute (8 bytes each)
//! RELATIONS: rel_count × PackedRelation (20 bytes each)
//! REL_BY_TARGET: rel_count × u32 (relation indices ordered by target)
//! TOKEN_OFFSETS: token_count × PackedTokenSpan (8 bytes each)
//! ```
//!
//! Elements are sorted by (start, end, depth descending), which is exactly
//! the order element cursors emit them in. Attributes are sorted by anchor,
//! relations by their source span; `REL_BY_TARGET` is a permutation of the
//! relation array giving target-span order.

use crate::error::{Error, Result};
use std::collections::HashMap;
use zerocopy::{FromBytes, Immutable, KnownLayout, little_endian as le};

/// Magic number identifying the annotation block format: "CANX" in ASCII
pub const MAGIC: u32 = 0x584E4143;

/// Current format version
pub const VERSION: u16 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 28;

const ELEMENT_SIZE: usize = std::mem::size_of::<PackedElement>();
const ATTRIBUTE_SIZE: usize = std::mem::size_of::<PackedAttribute>();
const RELATION_SIZE: usize = std::mem::size_of::<PackedRelation>();
const TOKEN_SPAN_SIZE: usize = std::mem::size_of::<PackedTokenSpan>();

/// Annotation block header
#[derive(FromBytes, Immutable, KnownLayout, Clone, Copy, Debug)]
#[repr(C)]
pub struct Header {
    pub magic: le::U32,
    pub version: le::U16,
    pub name_count: le::U16,
    pub token_count: le::U32,
    pub elem_count: le::U32,
    pub attr_count: le::U32,
    pub rel_count: le::U32,
    pub name_data_len: le::U32,
}

impl Header {
    fn validate(&self) -> Result<()> {
        if self.magic.get() != MAGIC {
            return Err(Error::corpus_data("Bad annotation block magic".to_string()));
        }
        if self.version.get() != VERSION {
            return Err(Error::corpus_data(format!(
                "Unsupported annotation block version: {}",
                self.version.get()
            )));
        }
        Ok(())
    }
}

/// One element occurrence (20 bytes, zerocopy-safe).
#[derive(FromBytes, Immutable, KnownLayout, Clone, Copy, Debug)]
#[repr(C)]
pub struct PackedElement {
    pub start: le::U32,
    pub end: le::U32,
    pub char_start: le::U32,
    pub char_end: le::U32,
    pub name_id: le::U16,
    pub depth: u8,
    pub flags: u8,
}

/// One attribute anchor (8 bytes, zerocopy-safe).
#[derive(FromBytes, Immutable, KnownLayout, Clone, Copy, Debug)]
#[repr(C)]
pub struct PackedAttribute {
    pub anchor: le::U32,
    pub name_id: le::U16,
    pub depth: u8,
    pub flags: u8,
}

/// One relation edge (20 bytes, zerocopy-safe).
#[derive(FromBytes, Immutable, KnownLayout, Clone, Copy, Debug)]
#[repr(C)]
pub struct PackedRelation {
    pub source_start: le::U32,
    pub source_end: le::U32,
    pub target_start: le::U32,
    pub target_end: le::U32,
    pub name_id: le::U16,
    pub flags: u8,
    pub reserved: u8,
}

/// Character offsets of one token (8 bytes, zerocopy-safe).
#[derive(FromBytes, Immutable, KnownLayout, Clone, Copy, Debug)]
#[repr(C)]
pub struct PackedTokenSpan {
    pub char_start: le::U32,
    pub char_end: le::U32,
}

/// Decoded element occurrence, as handed to span cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementOcc {
    pub start: u32,
    pub end: u32,
    pub char_start: u32,
    pub char_end: u32,
    pub depth: u8,
}

/// Decoded attribute anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeOcc {
    pub anchor: u32,
    pub depth: u8,
}

/// Decoded relation edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationOcc {
    pub source_start: u32,
    pub source_end: u32,
    pub target_start: u32,
    pub target_end: u32,
}

impl PackedElement {
    #[inline]
    fn decode(&self) -> ElementOcc {
        ElementOcc {
            start: self.start.get(),
            end: self.end.get(),
            char_start: self.char_start.get(),
            char_end: self.char_end.get(),
            depth: self.depth,
        }
    }
}

impl PackedRelation {
    #[inline]
    fn decode(&self) -> RelationOcc {
        RelationOcc {
            source_start: self.source_start.get(),
            source_end: self.source_end.get(),
            target_start: self.target_start.get(),
            target_end: self.target_end.get(),
        }
    }
}

/// Read-only view over one document's annotation block.
///
/// Parsing is O(1): only the header is validated and slice boundaries are
/// computed. Section data stays in the original buffer.
#[derive(Debug)]
pub struct SidecarView<'a> {
    token_count: u32,
    name_count: usize,
    name_offsets: &'a [le::U32],
    name_data: &'a [u8],
    elements: &'a [PackedElement],
    attributes: &'a [PackedAttribute],
    relations: &'a [PackedRelation],
    rel_by_target: &'a [le::U32],
    token_offsets: &'a [PackedTokenSpan],
}

impl<'a> SidecarView<'a> {
    /// Quick check whether the buffer starts with the block magic.
    #[inline]
    pub fn is_valid_format(data: &[u8]) -> bool {
        data.len() >= 4 && u32::from_le_bytes([data[0], data[1], data[2], data[3]]) == MAGIC
    }

    /// Parse a buffer into a zero-copy view.
    ///
    /// # Errors
    /// Returns `Error::CorpusData` if the magic or version does not match,
    /// the buffer is too small for the declared sizes, or the name table is
    /// inconsistent.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::corpus_data(format!(
                "Annotation block too small: need {HEADER_SIZE} bytes, have {}",
                data.len()
            )));
        }
        let (header, _) = Header::ref_from_prefix(data)
            .map_err(|_| Error::corpus_data("Annotation block header cast failed".to_string()))?;
        header.validate()?;

        let name_count = header.name_count.get() as usize;
        let token_count = header.token_count.get();
        let elem_count = header.elem_count.get() as usize;
        let attr_count = header.attr_count.get() as usize;
        let rel_count = header.rel_count.get() as usize;
        let name_data_len = header.name_data_len.get() as usize;

        let name_offsets_start = HEADER_SIZE;
        let name_data_start = name_offsets_start + (name_count + 1) * 4;
        let elements_start = name_data_start + name_data_len;
        let attributes_start = elements_start + elem_count * ELEMENT_SIZE;
        let relations_start = attributes_start + attr_count * ATTRIBUTE_SIZE;
        let rel_by_target_start = relations_start + rel_count * RELATION_SIZE;
        let token_offsets_start = rel_by_target_start + rel_count * 4;
        let total_size = token_offsets_start + token_count as usize * TOKEN_SPAN_SIZE;

        if total_size > data.len() {
            return Err(Error::corpus_data(format!(
                "Annotation block too small: need {total_size} bytes, have {}",
                data.len()
            )));
        }

        let cast_err =
            || Error::corpus_data("Annotation block section cast failed".to_string());

        let (name_offsets, _) = <[le::U32]>::ref_from_prefix_with_elems(
            &data[name_offsets_start..name_data_start],
            name_count + 1,
        )
        .map_err(|_| cast_err())?;
        let name_data = &data[name_data_start..elements_start];

        if name_offsets[name_count].get() as usize != name_data_len {
            return Err(Error::corpus_data(
                "Annotation block name table is inconsistent".to_string(),
            ));
        }

        let (elements, _) = <[PackedElement]>::ref_from_prefix_with_elems(
            &data[elements_start..attributes_start],
            elem_count,
        )
        .map_err(|_| cast_err())?;
        let (attributes, _) = <[PackedAttribute]>::ref_from_prefix_with_elems(
            &data[attributes_start..relations_start],
            attr_count,
        )
        .map_err(|_| cast_err())?;
        let (relations, _) = <[PackedRelation]>::ref_from_prefix_with_elems(
            &data[relations_start..rel_by_target_start],
            rel_count,
        )
        .map_err(|_| cast_err())?;
        let (rel_by_target, _) = <[le::U32]>::ref_from_prefix_with_elems(
            &data[rel_by_target_start..token_offsets_start],
            rel_count,
        )
        .map_err(|_| cast_err())?;
        let (token_offsets, _) = <[PackedTokenSpan]>::ref_from_prefix_with_elems(
            &data[token_offsets_start..total_size],
            token_count as usize,
        )
        .map_err(|_| cast_err())?;

        Ok(Self {
            token_count,
            name_count,
            name_offsets,
            name_data,
            elements,
            attributes,
            relations,
            rel_by_target,
            token_offsets,
        })
    }

    /// Number of token positions in the document.
    #[inline]
    pub fn token_count(&self) -> u32 {
        self.token_count
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Look up a name by vocabulary id.
    pub fn name(&self, id: u16) -> Option<&'a str> {
        if id as usize >= self.name_count {
            return None;
        }
        let start = self.name_offsets[id as usize].get() as usize;
        let end = self.name_offsets[id as usize + 1].get() as usize;
        if start > end || end > self.name_data.len() {
            return None;
        }
        std::str::from_utf8(&self.name_data[start..end]).ok()
    }

    /// Look up the vocabulary id of a name. Linear scan; vocabularies are
    /// per document and small.
    pub fn name_id(&self, name: &str) -> Option<u16> {
        (0..self.name_count as u16).find(|&id| self.name(id) == Some(name))
    }

    /// Raw element section, in (start, end, depth descending) order.
    #[inline]
    pub fn elements_raw(&self) -> &'a [PackedElement] {
        self.elements
    }

    /// All occurrences of the named element, in emission order.
    pub fn elements_named(&self, name: &str) -> Vec<ElementOcc> {
        let Some(id) = self.name_id(name) else {
            return Vec::new();
        };
        self.elements
            .iter()
            .filter(|e| e.name_id.get() == id)
            .map(PackedElement::decode)
            .collect()
    }

    /// Element occurrences of any name starting at `start` with the given
    /// depth. Used to resolve attribute anchors back to their elements.
    pub fn elements_anchored(&self, start: u32, depth: u8) -> Vec<ElementOcc> {
        let from = self.elements.partition_point(|e| e.start.get() < start);
        self.elements[from..]
            .iter()
            .take_while(|e| e.start.get() == start)
            .filter(|e| e.depth == depth)
            .map(PackedElement::decode)
            .collect()
    }

    /// All anchors of the named attribute, in anchor order.
    pub fn attributes_named(&self, name: &str) -> Vec<AttributeOcc> {
        let Some(id) = self.name_id(name) else {
            return Vec::new();
        };
        self.attributes
            .iter()
            .filter(|a| a.name_id.get() == id)
            .map(|a| AttributeOcc {
                anchor: a.anchor.get(),
                depth: a.depth,
            })
            .collect()
    }

    /// Whether the attribute is present at exactly (anchor, depth).
    pub fn has_attribute(&self, name_id: u16, anchor: u32, depth: u8) -> bool {
        self.attribute_range(anchor)
            .any(|a| a.name_id.get() == name_id && a.depth == depth)
    }

    /// Whether the attribute is present at the anchor, at any depth.
    pub fn has_attribute_at(&self, name_id: u16, anchor: u32) -> bool {
        self.attribute_range(anchor)
            .any(|a| a.name_id.get() == name_id)
    }

    fn attribute_range(&self, anchor: u32) -> impl Iterator<Item = &'a PackedAttribute> {
        let attributes = self.attributes;
        let from = attributes.partition_point(|a| a.anchor.get() < anchor);
        attributes[from..]
            .iter()
            .take_while(move |a| a.anchor.get() == anchor)
    }

    /// Edges with the given label, ordered by source span.
    pub fn relations_by_source(&self, label: &str) -> Vec<RelationOcc> {
        let Some(id) = self.name_id(label) else {
            return Vec::new();
        };
        self.relations
            .iter()
            .filter(|r| r.name_id.get() == id)
            .map(PackedRelation::decode)
            .collect()
    }

    /// Edges with the given label, ordered by target span.
    pub fn relations_by_target(&self, label: &str) -> Vec<RelationOcc> {
        let Some(id) = self.name_id(label) else {
            return Vec::new();
        };
        self.rel_by_target
            .iter()
            .filter_map(|ix| self.relations.get(ix.get() as usize))
            .filter(|r| r.name_id.get() == id)
            .map(PackedRelation::decode)
            .collect()
    }

    /// Character offsets of one token position.
    pub fn token_offsets(&self, token: u32) -> Option<(u32, u32)> {
        self.token_offsets
            .get(token as usize)
            .map(|t| (t.char_start.get(), t.char_end.get()))
    }
}

/// Builder that assembles one document's annotation block.
///
/// # Limits
/// - Maximum 65,535 distinct names per document
/// - Maximum 4 GiB of name data
///
/// Exceeding a limit fails with `Error::CorpusData`.
pub struct SidecarBuilder {
    token_count: u32,
    names: Vec<String>,
    name_ids: HashMap<String, u16>,
    elements: Vec<(u32, u32, u32, u32, u16, u8)>,
    attributes: Vec<(u32, u16, u8)>,
    relations: Vec<(u32, u32, u32, u32, u16)>,
    token_offsets: Vec<(u32, u32)>,
}

impl SidecarBuilder {
    /// Create a builder for a document with `token_count` positions.
    pub fn new(token_count: u32) -> Self {
        Self {
            token_count,
            names: Vec::new(),
            name_ids: HashMap::new(),
            elements: Vec::new(),
            attributes: Vec::new(),
            relations: Vec::new(),
            token_offsets: vec![(0, 0); token_count as usize],
        }
    }

    fn intern(&mut self, name: &str) -> Result<u16> {
        if let Some(&id) = self.name_ids.get(name) {
            return Ok(id);
        }
        if self.names.len() >= u16::MAX as usize {
            return Err(Error::corpus_data(format!(
                "Too many annotation names: {} (max 65535)",
                self.names.len() + 1
            )));
        }
        let id = self.names.len() as u16;
        self.names.push(name.to_string());
        self.name_ids.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn add_element(
        &mut self,
        name: &str,
        start: u32,
        end: u32,
        char_start: u32,
        char_end: u32,
        depth: u8,
    ) -> Result<()> {
        if end <= start {
            return Err(Error::corpus_data(format!(
                "Zero-width element span '{name}' at token {start}"
            )));
        }
        if start >= self.token_count {
            log::warn!(
                "Dropping element '{}' starting at token {} beyond document length {}",
                name,
                start,
                self.token_count
            );
            return Ok(());
        }
        let end = end.min(self.token_count);
        let id = self.intern(name)?;
        self.elements
            .push((start, end, char_start, char_end, id, depth));
        Ok(())
    }

    pub fn add_attribute(&mut self, name: &str, anchor: u32, depth: u8) -> Result<()> {
        let id = self.intern(name)?;
        self.attributes.push((anchor, id, depth));
        Ok(())
    }

    pub fn add_relation(
        &mut self,
        label: &str,
        source_start: u32,
        source_end: u32,
        target_start: u32,
        target_end: u32,
    ) -> Result<()> {
        let id = self.intern(label)?;
        self.relations
            .push((source_start, source_end, target_start, target_end, id));
        Ok(())
    }

    pub fn set_token_offsets(&mut self, token: u32, char_start: u32, char_end: u32) -> Result<()> {
        let slot = self.token_offsets.get_mut(token as usize).ok_or_else(|| {
            Error::corpus_data(format!(
                "Token offset index {token} out of range (document has {} tokens)",
                self.token_count
            ))
        })?;
        *slot = (char_start, char_end);
        Ok(())
    }

    /// Serialize to the binary block format.
    pub fn serialize(mut self) -> Result<Vec<u8>> {
        let name_data_len: usize = self.names.iter().map(|n| n.len()).sum();
        if name_data_len > u32::MAX as usize {
            return Err(Error::corpus_data(format!(
                "Name data too large: {name_data_len} bytes"
            )));
        }

        // Element order here defines element cursor emission order.
        self.elements
            .sort_by_key(|&(start, end, _, _, id, depth)| (start, end, std::cmp::Reverse(depth), id));
        self.attributes.sort_by_key(|&(anchor, id, depth)| (anchor, id, depth));
        self.relations.sort_by_key(|&(ss, se, ts, te, id)| (ss, se, ts, te, id));

        let mut rel_by_target: Vec<u32> = (0..self.relations.len() as u32).collect();
        rel_by_target.sort_by_key(|&ix| {
            let (ss, se, ts, te, id) = self.relations[ix as usize];
            (ts, te, ss, se, id)
        });

        let total_size = HEADER_SIZE
            + (self.names.len() + 1) * 4
            + name_data_len
            + self.elements.len() * ELEMENT_SIZE
            + self.attributes.len() * ATTRIBUTE_SIZE
            + self.relations.len() * RELATION_SIZE
            + self.relations.len() * 4
            + self.token_offsets.len() * TOKEN_SPAN_SIZE;

        let mut buf = Vec::with_capacity(total_size);

        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.names.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.token_count.to_le_bytes());
        buf.extend_from_slice(&(self.elements.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.attributes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.relations.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(name_data_len as u32).to_le_bytes());

        let mut offset = 0u32;
        for name in &self.names {
            buf.extend_from_slice(&offset.to_le_bytes());
            offset += name.len() as u32;
        }
        buf.extend_from_slice(&offset.to_le_bytes()); // Sentinel

        for name in &self.names {
            buf.extend_from_slice(name.as_bytes());
        }

        for &(start, end, char_start, char_end, id, depth) in &self.elements {
            buf.extend_from_slice(&start.to_le_bytes());
            buf.extend_from_slice(&end.to_le_bytes());
            buf.extend_from_slice(&char_start.to_le_bytes());
            buf.extend_from_slice(&char_end.to_le_bytes());
            buf.extend_from_slice(&id.to_le_bytes());
            buf.push(depth);
            buf.push(0); // flags
        }

        for &(anchor, id, depth) in &self.attributes {
            buf.extend_from_slice(&anchor.to_le_bytes());
            buf.extend_from_slice(&id.to_le_bytes());
            buf.push(depth);
            buf.push(0); // flags
        }

        for &(ss, se, ts, te, id) in &self.relations {
            buf.extend_from_slice(&ss.to_le_bytes());
            buf.extend_from_slice(&se.to_le_bytes());
            buf.extend_from_slice(&ts.to_le_bytes());
            buf.extend_from_slice(&te.to_le_bytes());
            buf.extend_from_slice(&id.to_le_bytes());
            buf.push(0); // flags
            buf.push(0); // reserved
        }

        for &ix in &rel_by_target {
            buf.extend_from_slice(&ix.to_le_bytes());
        }

        for &(char_start, char_end) in &self.token_offsets {
            buf.extend_from_slice(&char_start.to_le_bytes());
            buf.extend_from_slice(&char_end.to_le_bytes());
        }

        debug_assert_eq!(buf.len(), total_size, "Buffer size mismatch");
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Vec<u8> {
        let mut b = SidecarBuilder::new(6);
        b.add_element("s", 0, 6, 0, 30, 0).unwrap();
        b.add_element("np", 0, 2, 0, 9, 0).unwrap();
        b.add_element("np", 3, 6, 14, 30, 0).unwrap();
        b.add_element("np", 4, 6, 18, 30, 1).unwrap();
        b.add_attribute("class=header", 0, 0).unwrap();
        b.add_attribute("checked", 3, 1).unwrap();
        b.add_relation("d:nsubj", 1, 2, 0, 1).unwrap();
        b.add_relation("d:nsubj", 4, 5, 3, 4).unwrap();
        b.add_relation("d:obj", 1, 2, 5, 6).unwrap();
        for t in 0..6u32 {
            b.set_token_offsets(t, t * 5, t * 5 + 4).unwrap();
        }
        b.serialize().unwrap()
    }

    #[test]
    fn test_empty_block_roundtrip() {
        let bytes = SidecarBuilder::new(0).serialize().unwrap();
        assert!(SidecarView::is_valid_format(&bytes));
        let view = SidecarView::from_bytes(&bytes).unwrap();
        assert_eq!(view.token_count(), 0);
        assert_eq!(view.element_count(), 0);
        assert_eq!(view.relation_count(), 0);
    }

    #[test]
    fn test_block_roundtrip() {
        let bytes = sample_block();
        let view = SidecarView::from_bytes(&bytes).unwrap();

        assert_eq!(view.token_count(), 6);
        assert_eq!(view.element_count(), 4);
        assert_eq!(view.attribute_count(), 2);
        assert_eq!(view.relation_count(), 3);

        assert_eq!(view.name_id("np"), view.name_id("np"));
        assert!(view.name_id("missing").is_none());
        let np = view.elements_named("np");
        assert_eq!(np.len(), 3);
        // Emission order: starts ascending, nested after its parent start.
        assert_eq!(np[0].start, 0);
        assert_eq!(np[1], ElementOcc { start: 3, end: 6, char_start: 14, char_end: 30, depth: 0 });
        assert_eq!(np[2].depth, 1);

        assert_eq!(view.token_offsets(2), Some((10, 14)));
        assert!(view.token_offsets(6).is_none());
    }

    #[test]
    fn test_attribute_lookup() {
        let bytes = sample_block();
        let view = SidecarView::from_bytes(&bytes).unwrap();

        let id = view.name_id("class=header").unwrap();
        assert!(view.has_attribute(id, 0, 0));
        assert!(!view.has_attribute(id, 0, 1));
        assert!(view.has_attribute_at(id, 0));
        assert!(!view.has_attribute_at(id, 2));

        let occ = view.attributes_named("checked");
        assert_eq!(occ, vec![AttributeOcc { anchor: 3, depth: 1 }]);
    }

    #[test]
    fn test_relation_orders() {
        let bytes = sample_block();
        let view = SidecarView::from_bytes(&bytes).unwrap();

        let by_source = view.relations_by_source("d:nsubj");
        assert_eq!(by_source.len(), 2);
        assert_eq!(by_source[0].source_start, 1);
        assert_eq!(by_source[1].source_start, 4);

        let by_target = view.relations_by_target("d:nsubj");
        assert_eq!(by_target[0].target_start, 0);
        assert_eq!(by_target[1].target_start, 3);

        assert_eq!(view.relations_by_source("d:missing"), vec![]);
    }

    #[test]
    fn test_elements_anchored() {
        let bytes = sample_block();
        let view = SidecarView::from_bytes(&bytes).unwrap();

        let at0 = view.elements_anchored(0, 0);
        assert_eq!(at0.len(), 2); // "s" and the first "np"
        assert!(view.elements_anchored(0, 3).is_empty());
        assert_eq!(view.elements_anchored(4, 1).len(), 1);
    }

    #[test]
    fn test_truncated_block_is_error() {
        let bytes = sample_block();
        let err = SidecarView::from_bytes(&bytes[..bytes.len() - 4]).unwrap_err();
        assert!(err.to_string().contains("too small"));
        assert!(SidecarView::from_bytes(&bytes[..10]).is_err());
    }

    #[test]
    fn test_bad_magic_is_error() {
        let mut bytes = sample_block();
        bytes[0] ^= 0xFF;
        assert!(!SidecarView::is_valid_format(&bytes));
        let err = SidecarView::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_name_limit() {
        let mut b = SidecarBuilder::new(1);
        for i in 0..u16::MAX as u32 {
            b.add_attribute(&format!("a{i}"), 0, 0).unwrap();
        }
        let err = b.add_attribute("one-too-many", 0, 0).unwrap_err();
        assert!(err.to_string().contains("Too many annotation names"));
    }
}
