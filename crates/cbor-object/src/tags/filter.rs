//! Type filters: the shape a tag's payload must have.
//!
//! The binary reader consults a tag's filter while reading the payload, so
//! a malformed payload is rejected before it is fully materialized.

use std::borrow::Cow;

// Major types 0..=6 use bits 0..=6.
const SIMPLE_BIT: u16 = 1 << 7;
const FLOAT_BIT: u16 = 1 << 8;
const ALL_TYPES: u16 = 0x1ff;

/// Which tag numbers may appear on the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedTags {
    Any,
    /// An empty list allows no tags.
    Only(Vec<u64>),
}

/// Length constraint for arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayRule {
    AnyLength,
    Exact(u64),
    AtLeast(u64),
}

/// Constraint on the major type, tags and array shape of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFilter {
    types: u16,
    tags: AllowedTags,
    array: ArrayRule,
    elements: Vec<TypeFilter>,
    description: Option<Cow<'static, str>>,
}

/// Filter that accepts every item.
pub static ANY_FILTER: TypeFilter = TypeFilter::ANY;

impl TypeFilter {
    pub const ANY: TypeFilter = TypeFilter {
        types: ALL_TYPES,
        tags: AllowedTags::Any,
        array: ArrayRule::AnyLength,
        elements: Vec::new(),
        description: None,
    };

    /// Accepts nothing; extend it with the `with_*` builders.
    pub fn none() -> Self {
        TypeFilter {
            types: 0,
            tags: AllowedTags::Only(Vec::new()),
            array: ArrayRule::AnyLength,
            elements: Vec::new(),
            description: None,
        }
    }

    fn with_major(mut self, major: u8) -> Self {
        self.types |= 1 << major;
        self
    }

    pub fn with_unsigned(self) -> Self {
        self.with_major(0)
    }

    pub fn with_negative(self) -> Self {
        self.with_major(1)
    }

    /// Unsigned and negative integers.
    pub fn with_integers(self) -> Self {
        self.with_major(0).with_major(1)
    }

    pub fn with_byte_string(self) -> Self {
        self.with_major(2)
    }

    pub fn with_text_string(self) -> Self {
        self.with_major(3)
    }

    pub fn with_array_any_length(mut self) -> Self {
        self.array = ArrayRule::AnyLength;
        self.elements.clear();
        self.with_major(4)
    }

    /// Arrays of exactly `len` items; `elements[i]` constrains item `i`.
    pub fn with_array_exact_length(mut self, len: u64, elements: Vec<TypeFilter>) -> Self {
        self.array = ArrayRule::Exact(len);
        self.elements = elements;
        self.with_major(4)
    }

    /// Arrays of at least `len` items; `elements[i]` constrains item `i`.
    pub fn with_array_min_length(mut self, len: u64, elements: Vec<TypeFilter>) -> Self {
        self.array = ArrayRule::AtLeast(len);
        self.elements = elements;
        self.with_major(4)
    }

    pub fn with_map(self) -> Self {
        self.with_major(5)
    }

    /// Adds `tags` to the allowed set.
    pub fn with_tags(mut self, tags: &[u64]) -> Self {
        if let AllowedTags::Only(allowed) = &mut self.tags {
            allowed.extend_from_slice(tags);
        }
        self
    }

    pub fn with_any_tag(mut self) -> Self {
        self.tags = AllowedTags::Any;
        self
    }

    /// Major type 7 except floating point.
    pub fn with_simple_values(mut self) -> Self {
        self.types |= SIMPLE_BIT;
        self
    }

    pub fn with_floating_point(mut self) -> Self {
        self.types |= FLOAT_BIT;
        self
    }

    /// Message reported when an item violates the filter.
    pub fn described(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Message for a violation of this filter.
    pub(crate) fn violation(&self) -> Cow<'static, str> {
        self.description
            .clone()
            .unwrap_or(Cow::Borrowed("payload has an unexpected type"))
    }

    pub fn is_any(&self) -> bool {
        self.types == ALL_TYPES
            && self.tags == AllowedTags::Any
            && self.array == ArrayRule::AnyLength
            && self.elements.iter().all(TypeFilter::is_any)
    }

    /// For major type 7 this accepts either simple values or floating point.
    pub fn major_type_matches(&self, major: u8) -> bool {
        match major {
            0..=6 => self.types & (1 << major) != 0,
            7 => self.types & (SIMPLE_BIT | FLOAT_BIT) != 0,
            _ => false,
        }
    }

    pub fn non_fp_simple_value_allowed(&self) -> bool {
        self.types & SIMPLE_BIT != 0
    }

    pub fn floating_point_allowed(&self) -> bool {
        self.types & FLOAT_BIT != 0
    }

    pub fn tag_allowed(&self, tag: u64) -> bool {
        match &self.tags {
            AllowedTags::Any => true,
            AllowedTags::Only(allowed) => allowed.contains(&tag),
        }
    }

    pub fn array_length_matches(&self, len: u64) -> bool {
        if !self.major_type_matches(4) {
            return false;
        }
        match self.array {
            ArrayRule::AnyLength => true,
            ArrayRule::Exact(n) => len == n,
            ArrayRule::AtLeast(n) => len >= n,
        }
    }

    /// Whether an array may have an item at `index`. Used to reject
    /// indefinite-length arrays as soon as they grow too long.
    pub fn array_index_allowed(&self, index: u64) -> bool {
        if !self.major_type_matches(4) {
            return false;
        }
        match self.array {
            ArrayRule::Exact(n) => index < n,
            ArrayRule::AnyLength | ArrayRule::AtLeast(_) => true,
        }
    }

    /// Filter for the array item at `index`.
    pub fn get_sub_filter(&self, index: u64) -> &TypeFilter {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.elements.get(i))
            .unwrap_or(&ANY_FILTER)
    }
}

impl Default for TypeFilter {
    fn default() -> Self {
        TypeFilter::ANY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_and_any() {
        let none = TypeFilter::none();
        assert!((0..=7).all(|m| !none.major_type_matches(m)));
        assert!(!none.tag_allowed(0));
        assert!(TypeFilter::ANY.is_any());
        assert!(!none.is_any());
        assert!(TypeFilter::ANY.get_sub_filter(3).is_any());
    }

    #[test]
    fn test_major_type_seven_slots() {
        let floats = TypeFilter::none().with_floating_point();
        assert!(floats.major_type_matches(7));
        assert!(floats.floating_point_allowed());
        assert!(!floats.non_fp_simple_value_allowed());
        let simple = TypeFilter::none().with_simple_values();
        assert!(simple.non_fp_simple_value_allowed());
        assert!(!simple.floating_point_allowed());
    }

    #[test]
    fn test_array_rules() {
        let integer = TypeFilter::none().with_integers().described("not an integer");
        let pair = TypeFilter::none()
            .with_array_exact_length(2, vec![integer.clone(), integer.clone()])
            .described("needs 2 items");
        assert!(pair.array_length_matches(2));
        assert!(!pair.array_length_matches(3));
        assert!(pair.array_index_allowed(1));
        assert!(!pair.array_index_allowed(2));
        assert_eq!(pair.get_sub_filter(0), &integer);
        assert!(pair.get_sub_filter(5).is_any());
        assert_eq!(pair.violation(), "needs 2 items");

        let many = TypeFilter::none().with_array_min_length(1, Vec::new());
        assert!(!many.array_length_matches(0));
        assert!(many.array_length_matches(10));
        assert!(many.array_index_allowed(100));

        assert!(!TypeFilter::none().with_map().array_length_matches(0));
    }

    #[test]
    fn test_tags() {
        let filter = TypeFilter::none().with_byte_string().with_tags(&[2, 3]);
        assert!(filter.tag_allowed(2));
        assert!(!filter.tag_allowed(4));
        assert!(filter.clone().with_any_tag().tag_allowed(4));
    }
}
