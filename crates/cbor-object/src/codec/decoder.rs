//! Binary decoding of CBOR items into [`Value`]s.
//!
//! The decoder reads one top-level item per call. Tag payloads are read
//! under the filter of the tag's handler so that malformed payloads fail
//! before they are fully materialized, then passed to the handler's
//! validator.

use std::io::Read;

use log::{debug, trace};
use num_bigint::BigInt;
use rustc_hash::FxHashSet;

use crate::codec::header::{
    fixed_value, BREAK, EXPECTED_LENGTH, INDEFINITE, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP,
    MAJOR_NEGATIVE, MAJOR_SIMPLE, MAJOR_TAG, MAJOR_TEXT, MAJOR_UNSIGNED,
};
use crate::codec::primitives::{ByteSource, Reader, StreamReader};
use crate::codec::refs::{SharedRefs, StringRefs};
use crate::error::DecodeError;
use crate::limits::{
    MAX_NESTING_DEPTH, MAX_PREALLOCATED_ITEMS, STACK_RED_ZONE, STACK_SEGMENT_SIZE,
};
use crate::model::{Array, Map, SimpleValue, Value};
use crate::tags::{
    default_registry, TagRegistry, TypeFilter, TAG_SHAREABLE, TAG_SHARED_REF, TAG_STRING_REF,
    TAG_STRING_REF_NAMESPACE,
};

/// Options for binary decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum nesting of arrays, maps and tags.
    pub max_depth: usize,
    /// Accept maps that repeat a key. The last value wins.
    pub allow_duplicate_keys: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
            allow_duplicate_keys: false,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn allow_duplicate_keys(mut self) -> Self {
        self.allow_duplicate_keys = true;
        self
    }
}

/// The filter in force for an item, with the tag that imposed it.
#[derive(Clone, Copy)]
struct Filtered<'f> {
    tag: u64,
    filter: &'f TypeFilter,
}

impl<'f> Filtered<'f> {
    fn of(tag: u64, filter: &'f TypeFilter) -> Option<Self> {
        (!filter.is_any()).then_some(Filtered { tag, filter })
    }

    fn item(self, index: u64) -> Option<Filtered<'f>> {
        let filter: &'f TypeFilter = self.filter;
        Filtered::of(self.tag, filter.get_sub_filter(index))
    }

    fn violation(self) -> DecodeError {
        DecodeError::TagFilter {
            tag: self.tag,
            message: self.filter.violation(),
        }
    }

    fn check(self, allowed: bool) -> Result<(), DecodeError> {
        if allowed { Ok(()) } else { Err(self.violation()) }
    }
}

/// Per-item state passed down the recursion.
#[derive(Clone, Copy, Default)]
struct ItemContext<'f> {
    filter: Option<Filtered<'f>>,
    /// Sharedref slot to fill as soon as the item's container exists.
    share_slot: Option<usize>,
}

impl<'f> ItemContext<'f> {
    fn filtered(filter: Option<Filtered<'f>>) -> Self {
        Self {
            filter,
            share_slot: None,
        }
    }
}

/// Indefinite-length string decoding state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    ExpectHeader,
    AccumulateChunk { len: u64 },
    ExpectBreakOrNext,
}

/// Streaming CBOR decoder over a [`ByteSource`].
#[derive(Debug)]
pub struct Decoder<'r, S> {
    source: S,
    registry: &'r TagRegistry,
    options: DecodeOptions,
    shared: SharedRefs,
    strings: StringRefs,
    /// Identities of shareable containers whose items are still being read.
    open: FxHashSet<usize>,
    /// Sharedrefs resolved to an open container so far.
    back_refs: usize,
    depth: usize,
}

impl<S: ByteSource> Decoder<'static, S> {
    /// Creates a decoder using the default tag registry and options.
    pub fn new(source: S) -> Self {
        Decoder::with_registry(source, default_registry(), DecodeOptions::default())
    }
}

impl<'r, S: ByteSource> Decoder<'r, S> {
    pub fn with_registry(source: S, registry: &'r TagRegistry, options: DecodeOptions) -> Self {
        Self {
            source,
            registry,
            options,
            shared: SharedRefs::default(),
            strings: StringRefs::default(),
            open: FxHashSet::default(),
            back_refs: 0,
            depth: 0,
        }
    }

    /// Reads the next top-level item. Reference tables do not carry over
    /// between items.
    pub fn read(&mut self) -> Result<Value, DecodeError> {
        self.shared.clear();
        self.strings.clear();
        self.open.clear();
        self.back_refs = 0;
        self.depth = 0;
        if self.source.peek_byte()?.is_none() {
            return Err(DecodeError::Empty);
        }
        self.read_item(ItemContext::default())
    }

    /// True when the source has no more bytes.
    pub fn is_at_end(&mut self) -> Result<bool, DecodeError> {
        Ok(self.source.peek_byte()?.is_none())
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.source.position()
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn enter(&mut self) -> Result<(), DecodeError> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            debug!(
                "decode aborted at offset {}: nesting exceeds {}",
                self.source.position(),
                self.options.max_depth
            );
            return Err(DecodeError::NestingTooDeep {
                max: self.options.max_depth,
            });
        }
        Ok(())
    }

    fn read_argument(&mut self, initial: u8) -> Result<u64, DecodeError> {
        match initial & 0x1f {
            info @ 0..=23 => Ok(u64::from(info)),
            24 => Ok(u64::from(self.source.read_byte("argument")?)),
            25 => Ok(u64::from(u16::from_be_bytes(self.source.read_array("argument")?))),
            26 => Ok(u64::from(u32::from_be_bytes(self.source.read_array("argument")?))),
            27 => Ok(u64::from_be_bytes(self.source.read_array("argument")?)),
            _ => Err(DecodeError::InvalidHeader { byte: initial }),
        }
    }

    fn read_item(&mut self, ctx: ItemContext<'_>) -> Result<Value, DecodeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || self.read_item_inner(ctx))
    }

    fn read_item_inner(&mut self, ctx: ItemContext<'_>) -> Result<Value, DecodeError> {
        let initial = self.source.read_byte("initial byte")?;
        if EXPECTED_LENGTH[initial as usize] < 0 {
            return Err(if initial == BREAK {
                DecodeError::UnexpectedBreak
            } else {
                DecodeError::InvalidHeader { byte: initial }
            });
        }
        let major = initial >> 5;
        let info = initial & 0x1f;

        if let Some(filtered) = ctx.filter {
            match major {
                MAJOR_TAG => {}
                MAJOR_SIMPLE if (25..=27).contains(&info) => {
                    filtered.check(filtered.filter.floating_point_allowed())?
                }
                MAJOR_SIMPLE => filtered.check(filtered.filter.non_fp_simple_value_allowed())?,
                _ => filtered.check(filtered.filter.major_type_matches(major))?,
            }
        }

        if let Some(value) = fixed_value(initial) {
            return Ok(value);
        }

        match major {
            MAJOR_UNSIGNED => Ok(Value::from(self.read_argument(initial)?)),
            MAJOR_NEGATIVE => {
                let n = self.read_argument(initial)?;
                Ok(match i64::try_from(n) {
                    Ok(n) => Value::Integer(-1 - n),
                    Err(_) => Value::from(-1 - BigInt::from(n)),
                })
            }
            MAJOR_BYTES | MAJOR_TEXT => self.read_string(initial),
            MAJOR_ARRAY => self.read_array(initial, ctx),
            MAJOR_MAP => self.read_map(initial, ctx),
            MAJOR_TAG => {
                let tag = self.read_argument(initial)?;
                if let Some(filtered) = ctx.filter {
                    filtered.check(filtered.filter.tag_allowed(tag))?;
                }
                self.enter()?;
                let value = self.read_tagged(tag, ctx)?;
                self.depth -= 1;
                Ok(value)
            }
            _ => self.read_simple(initial),
        }
    }

    fn read_string(&mut self, initial: u8) -> Result<Value, DecodeError> {
        let major = initial >> 5;
        let context = if major == MAJOR_TEXT { "text string" } else { "byte string" };
        let mut bytes = Vec::new();

        if initial & 0x1f == INDEFINITE {
            self.read_chunks(major, context, &mut bytes)?;
            return finish_string(major, bytes, context);
        }

        let len = self.read_argument(initial)?;
        self.source.read_into(len, &mut bytes, context)?;
        let value = finish_string(major, bytes, context)?;
        self.strings.record(&value, len as usize);
        Ok(value)
    }

    fn read_chunks(
        &mut self,
        major: u8,
        context: &'static str,
        out: &mut Vec<u8>,
    ) -> Result<(), DecodeError> {
        let mut state = ChunkState::ExpectHeader;
        loop {
            state = match state {
                ChunkState::ExpectHeader => {
                    let header = self.source.read_byte(context)?;
                    if header == BREAK {
                        return Ok(());
                    }
                    if header >> 5 != major || EXPECTED_LENGTH[header as usize] < 0 {
                        return Err(DecodeError::InvalidChunk { context });
                    }
                    if header & 0x1f == INDEFINITE {
                        return Err(DecodeError::InvalidChunk { context });
                    }
                    ChunkState::AccumulateChunk {
                        len: self.read_argument(header)?,
                    }
                }
                ChunkState::AccumulateChunk { len } => {
                    let start = out.len();
                    self.source.read_into(len, out, context)?;
                    if major == MAJOR_TEXT && std::str::from_utf8(&out[start..]).is_err() {
                        return Err(DecodeError::InvalidUtf8 { context });
                    }
                    ChunkState::ExpectBreakOrNext
                }
                ChunkState::ExpectBreakOrNext => match self.source.peek_byte()? {
                    Some(BREAK) => {
                        self.source.read_byte(context)?;
                        return Ok(());
                    }
                    Some(_) => ChunkState::ExpectHeader,
                    None => return Err(DecodeError::UnexpectedEof { context }),
                },
            };
        }
    }

    /// Consumes a break code if it is next.
    fn at_break(&mut self, context: &'static str) -> Result<bool, DecodeError> {
        match self.source.peek_byte()? {
            Some(BREAK) => {
                self.source.read_byte(context)?;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(DecodeError::UnexpectedEof { context }),
        }
    }

    fn read_array(&mut self, initial: u8, ctx: ItemContext<'_>) -> Result<Value, DecodeError> {
        let indefinite = initial & 0x1f == INDEFINITE;
        let declared = if indefinite {
            None
        } else {
            let len = self.read_argument(initial)?;
            if let Some(filtered) = ctx.filter {
                filtered.check(filtered.filter.array_length_matches(len))?;
            }
            Some(len)
        };

        let capacity = declared.map_or(0, |len| (len as usize).min(MAX_PREALLOCATED_ITEMS));
        let array = Array::with_capacity(capacity);
        if let Some(slot) = ctx.share_slot {
            self.shared.fill(slot, Value::Array(array.clone()));
            self.open.insert(array.identity());
        }

        self.enter()?;
        let mut index = 0u64;
        loop {
            match declared {
                Some(len) if index >= len => break,
                Some(_) => {}
                None => {
                    if self.at_break("array")? {
                        if let Some(filtered) = ctx.filter {
                            filtered.check(filtered.filter.array_length_matches(index))?;
                        }
                        break;
                    }
                    if let Some(filtered) = ctx.filter {
                        filtered.check(filtered.filter.array_index_allowed(index))?;
                    }
                }
            }
            let filter = ctx.filter.and_then(|filtered| filtered.item(index));
            let item = self.read_item(ItemContext::filtered(filter))?;
            array.borrow_mut().push(item);
            index += 1;
        }
        self.depth -= 1;
        self.open.remove(&array.identity());
        Ok(Value::Array(array))
    }

    fn read_map(&mut self, initial: u8, ctx: ItemContext<'_>) -> Result<Value, DecodeError> {
        let declared = if initial & 0x1f == INDEFINITE {
            None
        } else {
            Some(self.read_argument(initial)?)
        };

        let capacity = declared.map_or(0, |len| (len as usize).min(MAX_PREALLOCATED_ITEMS));
        let map = Map::with_capacity(capacity);
        if let Some(slot) = ctx.share_slot {
            self.shared.fill(slot, Value::Map(map.clone()));
            self.open.insert(map.identity());
        }

        self.enter()?;
        let mut count = 0u64;
        loop {
            match declared {
                Some(len) if count >= len => break,
                Some(_) => {}
                None if self.at_break("map")? => break,
                None => {}
            }
            let position = self.source.position();
            let back_refs = self.back_refs;
            let key = self.read_item(ItemContext::default())?;
            // Such a key would be part of its own cycle and could never be hashed.
            if self.back_refs != back_refs {
                debug!("decode aborted at offset {}: cyclic map key", position);
                return Err(DecodeError::CyclicKey { position });
            }
            let value = self.read_item(ItemContext::default())?;
            if !self.options.allow_duplicate_keys && map.contains_key(&key) {
                return Err(DecodeError::DuplicateKey { position });
            }
            map.insert(key, value);
            count += 1;
        }
        self.depth -= 1;
        self.open.remove(&map.identity());
        Ok(Value::Map(map))
    }

    fn read_tagged(&mut self, tag: u64, ctx: ItemContext<'_>) -> Result<Value, DecodeError> {
        match tag {
            TAG_SHARED_REF => {
                let index = self.read_index(tag)?;
                let value = self.shared.get(index)?;
                let identity = match value.untagged() {
                    Value::Array(array) => Some(array.identity()),
                    Value::Map(map) => Some(map.identity()),
                    _ => None,
                };
                if identity.is_some_and(|id| self.open.contains(&id)) {
                    self.back_refs += 1;
                }
                Ok(value)
            }
            TAG_STRING_REF => {
                let index = self.read_index(tag)?;
                self.strings.get(index)
            }
            TAG_STRING_REF_NAMESPACE => {
                trace!("entering stringref namespace");
                self.strings.push_namespace();
                let result = self.read_item(ctx);
                self.strings.pop_namespace();
                result
            }
            TAG_SHAREABLE => {
                let slot = self.shared.reserve();
                let value = self.read_item(ItemContext {
                    filter: ctx.filter,
                    share_slot: Some(slot),
                })?;
                if !self.shared.is_filled(slot) {
                    self.shared.fill(slot, value.clone());
                }
                Ok(value)
            }
            _ => match self.registry.find(tag) {
                Some(handler) => {
                    let filter = Filtered::of(tag, handler.filter());
                    let payload = self.read_item(ItemContext::filtered(filter))?;
                    trace!("validating tag {}", tag);
                    handler.validate(tag, payload)
                }
                None => {
                    let payload = self.read_item(ItemContext::filtered(ctx.filter))?;
                    Ok(Value::tagged(tag, payload))
                }
            },
        }
    }

    /// Reads the unsigned index payload of tags 25 and 29.
    fn read_index(&mut self, tag: u64) -> Result<u64, DecodeError> {
        let initial = self.source.read_byte("reference index")?;
        if initial >> 5 != MAJOR_UNSIGNED || initial & 0x1f > 27 {
            return Err(DecodeError::TagFilter {
                tag,
                message: "Not a 64-bit unsigned integer".into(),
            });
        }
        self.read_argument(initial)
    }

    fn read_simple(&mut self, initial: u8) -> Result<Value, DecodeError> {
        match initial & 0x1f {
            24 => {
                let code = self.source.read_byte("simple value")?;
                SimpleValue::new(code)
                    .ok()
                    .filter(|_| code >= 32)
                    .map(Value::Simple)
                    .ok_or(DecodeError::InvalidSimpleValue { value: code })
            }
            25 => {
                let bits = half::f16::from_be_bytes(self.source.read_array("half float")?);
                Ok(Value::Single(bits.to_f32()))
            }
            26 => Ok(Value::Single(f32::from_be_bytes(
                self.source.read_array("single float")?,
            ))),
            27 => Ok(Value::Double(f64::from_be_bytes(
                self.source.read_array("double float")?,
            ))),
            _ => Err(DecodeError::InvalidHeader { byte: initial }),
        }
    }
}

fn finish_string(major: u8, bytes: Vec<u8>, context: &'static str) -> Result<Value, DecodeError> {
    if major == MAJOR_TEXT {
        String::from_utf8(bytes)
            .map(Value::TextString)
            .map_err(|_| DecodeError::InvalidUtf8 { context })
    } else {
        Ok(Value::ByteString(bytes))
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Decodes exactly one item from `data` with the default registry.
pub fn decode_from_bytes(data: &[u8]) -> Result<Value, DecodeError> {
    decode_from_bytes_with(data, default_registry(), DecodeOptions::default())
}

/// Decodes exactly one item from `data`.
///
/// Fails when `data` is empty, when it holds more than one item, or when a
/// fixed-size first item disagrees with the buffer length.
pub fn decode_from_bytes_with(
    data: &[u8],
    registry: &TagRegistry,
    options: DecodeOptions,
) -> Result<Value, DecodeError> {
    let first = *data.first().ok_or(DecodeError::Empty)?;
    let expected = EXPECTED_LENGTH[first as usize];
    if expected > 0 && expected as usize != data.len() {
        return Err(DecodeError::LengthMismatch {
            expected: expected as usize,
            actual: data.len(),
        });
    }

    let mut decoder = Decoder::with_registry(Reader::new(data), registry, options);
    let value = decoder.read()?;
    let position = decoder.position();
    if position < data.len() {
        return Err(DecodeError::TrailingBytes {
            position,
            remaining: data.len() - position,
        });
    }
    Ok(value)
}

/// Reads one item from a stream with the default registry, leaving any
/// following bytes unread.
pub fn read_value(reader: impl Read) -> Result<Value, DecodeError> {
    read_value_with(reader, default_registry(), DecodeOptions::default())
}

pub fn read_value_with(
    reader: impl Read,
    registry: &TagRegistry,
    options: DecodeOptions,
) -> Result<Value, DecodeError> {
    Decoder::with_registry(StreamReader::new(reader), registry, options).read()
}
