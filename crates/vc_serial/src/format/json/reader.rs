use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::str::FromStr;
use std::io;

use super::token::{
    EXTERNAL_GUID_REF, EXTERNAL_INDEX_REF, INTERNAL_REF, LEGACY_STRING_REF, Token, Tokenizer,
    classify_literal, unquote,
};
use super::{ID, PRIMITIVE_CONTENT, PRIMITIVE_LENGTH, REGULAR_CONTENT, REGULAR_LENGTH, STRING_REF, TYPE};
use crate::context::DeserializationContext;
use crate::error::SerialResult;
use crate::format::primitive_array::float_from_text;
use crate::format::reader::{skip_structure, skip_until_end};
use crate::format::writer::push_frame;
use crate::format::{DataReader, Entry, EntryType, NodeHeader, NodeInfo, NodeStack, PrimitiveArray};
use crate::hash::HashMap;
use crate::info::{PrimitiveKind, TypeInfo};
use crate::reflect::{Decimal, Guid};

/// What a peeked entry carries besides its type and name.
#[derive(Debug, Clone)]
enum Payload {
    None,
    /// Unquoted text, with any reference prefix already stripped.
    Literal(String),
    /// A quoted string.
    Text(String),
    Node { id: i32, ty: Option<TypeRef> },
    /// Declared length of an array or a primitive array.
    Length(i64),
}

/// The `$type` member of a node.
#[derive(Debug, Clone)]
enum TypeRef {
    /// `"id|name"`, the first time a type appears.
    Declared(i32, String),
    /// A bare id naming an earlier declaration.
    Id(i32),
}

#[derive(Debug, Clone)]
struct Peeked {
    entry: Entry,
    payload: Payload,
}

/// Reads the JSON-like text form.
///
/// Tokenizes lazily with unbounded lookahead, so a node header is
/// recognized before anything of it is handed to the caller.
pub struct JsonDataReader<'a> {
    tokens: Tokenizer<'a>,
    context: &'a mut DeserializationContext,
    nodes: NodeStack,
    types: HashMap<i32, (Option<&'static TypeInfo>, String)>,
    peeked: Option<Peeked>,
}

impl<'a> JsonDataReader<'a> {
    pub fn new(text: impl Into<Cow<'a, str>>, context: &'a mut DeserializationContext) -> Self {
        let nodes = NodeStack::new(context.config().max_depth);
        Self {
            tokens: Tokenizer::new(text),
            context,
            nodes,
            types: HashMap::default(),
            peeked: None,
        }
    }

    /// Reads everything `source` has left, then decodes from memory.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the structure around
    /// it usually survives.
    pub fn from_reader(
        mut source: impl io::Read,
        context: &'a mut DeserializationContext,
    ) -> io::Result<Self> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let text = match String::from_utf8(data) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        };
        Ok(Self::new(text, context))
    }

    fn skip_commas(&mut self) {
        while self.tokens.peek(0) == Some(&Token::Comma) {
            self.tokens.next();
        }
    }

    /// Consumes `"key":` if it is next.
    fn take_key(&mut self) -> Option<String> {
        match self.tokens.peek_pair() {
            (Some(Token::String(_)), Some(Token::Colon)) => {}
            _ => return None,
        }
        let key = match self.tokens.next() {
            Some(Token::String(key)) => key,
            _ => return None,
        };
        self.tokens.next();
        Some(key)
    }

    /// Consumes `"key":` only if the key is `expected`.
    fn take_sentinel(&mut self, expected: &str) -> bool {
        self.skip_commas();
        match self.tokens.peek_pair() {
            (Some(Token::String(key)), Some(Token::Colon)) if key == expected => {
                self.tokens.next();
                self.tokens.next();
                true
            }
            _ => false,
        }
    }

    fn take_integer_literal(&mut self) -> Option<i64> {
        match self.tokens.peek(0) {
            Some(Token::Literal(text)) => {
                let value = text.parse().ok()?;
                self.tokens.next();
                Some(value)
            }
            _ => None,
        }
    }

    /// Reports malformed text and gives up on the rest of it.
    fn corrupt(&mut self, what: &str) -> SerialResult<Peeked> {
        self.tokens.finish();
        self.context
            .debug()
            .log_error(format_args!("malformed text stream: {what}"))?;
        Ok(Peeked {
            entry: Entry::unnamed(EntryType::Invalid),
            payload: Payload::None,
        })
    }

    /// Skips a bracketed group whose opening token was already consumed.
    fn skip_group(&mut self) {
        let mut depth = 1usize;
        while depth > 0 {
            match self.tokens.next() {
                Some(Token::BeginObject | Token::BeginArray) => depth += 1,
                Some(Token::EndObject | Token::EndArray) => depth -= 1,
                Some(_) => {}
                None => return,
            }
        }
    }

    fn read_array_header(&mut self, content: &str, kind: EntryType) -> SerialResult<Peeked> {
        let Some(len) = self.take_integer_literal() else {
            return self.corrupt("array length is not an integer");
        };
        if !self.take_sentinel(content) || self.tokens.next() != Some(Token::BeginArray) {
            return self.corrupt("array length without content");
        }
        Ok(Peeked {
            entry: Entry::unnamed(kind),
            payload: Payload::Length(len),
        })
    }

    fn read_node_header(&mut self, name: Option<String>) -> SerialResult<Peeked> {
        if self.take_sentinel(STRING_REF) {
            let key = match self.tokens.next() {
                Some(Token::String(key)) => key,
                _ => return self.corrupt("external string reference without a key"),
            };
            if self.tokens.next() != Some(Token::EndObject) {
                return self.corrupt("unterminated external string reference");
            }
            return Ok(Peeked {
                entry: Entry::named(EntryType::ExternalReferenceByString, name),
                payload: Payload::Text(key),
            });
        }

        let mut id = -1;
        if self.take_sentinel(ID) {
            match self.take_integer_literal().and_then(|v| i32::try_from(v).ok()) {
                Some(value) => id = value,
                None => return self.corrupt("node id is not an integer"),
            }
        }
        let mut ty = None;
        if self.take_sentinel(TYPE) {
            ty = match self.tokens.next() {
                Some(Token::String(text)) => {
                    let parsed = text
                        .split_once('|')
                        .and_then(|(id, name)| Some(TypeRef::Declared(id.parse().ok()?, String::from(name))));
                    match parsed {
                        Some(declared) => Some(declared),
                        None => return self.corrupt("type entry is not `id|name`"),
                    }
                }
                Some(Token::Literal(text)) => match text.parse() {
                    Ok(type_id) => Some(TypeRef::Id(type_id)),
                    Err(_) => return self.corrupt("type id is not an integer"),
                },
                _ => return self.corrupt("type entry has no value"),
            };
        }
        Ok(Peeked {
            entry: Entry::named(EntryType::StartOfNode, name),
            payload: Payload::Node { id, ty },
        })
    }

    fn read_next(&mut self) -> SerialResult<Peeked> {
        self.skip_commas();
        let in_node = self.nodes.current().is_some_and(|node| !node.is_array);

        let end = match self.tokens.peek(0) {
            None => Some(EntryType::EndOfStream),
            Some(Token::EndObject) => Some(EntryType::EndOfNode),
            Some(Token::EndArray) => Some(EntryType::EndOfArray),
            _ => None,
        };
        if let Some(kind) = end {
            self.tokens.next();
            return Ok(Peeked {
                entry: Entry::unnamed(kind),
                payload: Payload::None,
            });
        }

        let name = if in_node { self.take_key() } else { None };
        match name.as_deref() {
            Some(REGULAR_LENGTH) => return self.read_array_header(REGULAR_CONTENT, EntryType::StartOfArray),
            Some(PRIMITIVE_LENGTH) => {
                return self.read_array_header(PRIMITIVE_CONTENT, EntryType::PrimitiveArray);
            }
            _ => {}
        }

        let Some(token) = self.tokens.next() else {
            return self.corrupt("a key without a value");
        };
        let (kind, payload) = match token {
            Token::BeginObject => return self.read_node_header(name),
            Token::BeginArray => {
                self.skip_group();
                self.context
                    .debug()
                    .log_error("a bare array is not a valid entry")?;
                (EntryType::Invalid, Payload::None)
            }
            Token::String(text) => (EntryType::String, Payload::Text(text)),
            Token::Literal(text) => {
                let kind = classify_literal(&text);
                let literal = match kind {
                    EntryType::Null => Payload::None,
                    EntryType::InternalReference => Payload::Literal(String::from(&text[INTERNAL_REF.len()..])),
                    EntryType::ExternalReferenceByIndex => {
                        Payload::Literal(String::from(&text[EXTERNAL_INDEX_REF.len()..]))
                    }
                    EntryType::ExternalReferenceByGuid => {
                        Payload::Literal(String::from(&text[EXTERNAL_GUID_REF.len()..]))
                    }
                    EntryType::ExternalReferenceByString => {
                        match unquote(&text[LEGACY_STRING_REF.len()..]) {
                            Some(key) => Payload::Text(key),
                            None => return self.corrupt("legacy string reference without a quoted key"),
                        }
                    }
                    _ => Payload::Literal(text),
                };
                (kind, literal)
            }
            Token::EndObject | Token::EndArray => {
                return self.corrupt("a key without a value");
            }
            Token::Colon | Token::Comma => return self.corrupt("stray separator"),
            Token::Invalid(what) => return self.corrupt(&what),
        };
        Ok(Peeked {
            entry: Entry::named(kind, name),
            payload,
        })
    }

    /// Takes the peeked entry's payload if its type is one of `kinds`;
    /// otherwise reports and skips it.
    fn take_payload(&mut self, kinds: &[EntryType], expected: &str) -> SerialResult<Option<Payload>> {
        let entry = self.peek_entry()?;
        if !kinds.contains(&entry.kind) {
            self.skip_unexpected(expected, &entry)?;
            return Ok(None);
        }
        Ok(self.peeked.take().map(|peeked| peeked.payload))
    }

    fn take_literal(&mut self, kinds: &[EntryType], expected: &str) -> SerialResult<Option<String>> {
        Ok(match self.take_payload(kinds, expected)? {
            Some(Payload::Literal(text) | Payload::Text(text)) => Some(text),
            _ => None,
        })
    }

    fn parse<T: FromStr>(&mut self, text: &str, expected: &str) -> SerialResult<Option<T>> {
        match text.parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                self.context
                    .debug()
                    .log_error(format_args!("`{text}` is not {expected}"))?;
                Ok(None)
            }
        }
    }

    fn bind_type(&mut self, ty: Option<TypeRef>) -> SerialResult<(Option<&'static TypeInfo>, Option<String>)> {
        match ty {
            None => Ok((None, None)),
            Some(TypeRef::Declared(id, name)) => {
                let info = self.context.bind_to_type(&name);
                self.types.insert(id, (info, name.clone()));
                Ok((info, Some(name)))
            }
            Some(TypeRef::Id(id)) => match self.types.get(&id) {
                Some((info, name)) => Ok((*info, Some(name.clone()))),
                None => {
                    self.context
                        .debug()
                        .log_error(format_args!("type id {id} was never declared"))?;
                    Ok((None, Some(alloc::format!("#{id}"))))
                }
            },
        }
    }
}

impl DataReader for JsonDataReader<'_> {
    #[inline]
    fn context(&self) -> &DeserializationContext {
        self.context
    }

    #[inline]
    fn context_mut(&mut self) -> &mut DeserializationContext {
        self.context
    }

    #[inline]
    fn nodes(&self) -> &NodeStack {
        &self.nodes
    }

    fn peek_entry(&mut self) -> SerialResult<Entry> {
        if let Some(peeked) = &self.peeked {
            return Ok(peeked.entry.clone());
        }
        let peeked = self.read_next()?;
        let entry = peeked.entry.clone();
        self.peeked = Some(peeked);
        Ok(entry)
    }

    fn enter_node(&mut self) -> SerialResult<Option<NodeHeader>> {
        let entry = self.peek_entry()?;
        if entry.kind != EntryType::StartOfNode {
            return Ok(None);
        }
        let Some(Peeked {
            payload: Payload::Node { id, ty },
            ..
        }) = self.peeked.take()
        else {
            return Ok(None);
        };
        let (ty, type_name) = self.bind_type(ty)?;
        push_frame(
            &mut self.nodes,
            NodeInfo::node(entry.name.as_deref(), id, ty),
            self.context.debug(),
        )?;
        Ok(Some(NodeHeader { id, ty, type_name }))
    }

    fn exit_node(&mut self) -> SerialResult<()> {
        if skip_until_end(self, EntryType::EndOfNode)? {
            self.peeked = None;
        }
        self.nodes.pop();
        Ok(())
    }

    fn enter_array(&mut self) -> SerialResult<Option<i64>> {
        if self.peek_entry()?.kind != EntryType::StartOfArray {
            return Ok(None);
        }
        let Some(Peeked {
            payload: Payload::Length(len),
            ..
        }) = self.peeked.take()
        else {
            return Ok(None);
        };
        push_frame(&mut self.nodes, NodeInfo::array(), self.context.debug())?;
        if len < 0 {
            self.context
                .debug()
                .log_error(format_args!("negative array length {len}"))?;
            return Ok(Some(0));
        }
        Ok(Some(len))
    }

    fn exit_array(&mut self) -> SerialResult<()> {
        if skip_until_end(self, EntryType::EndOfArray)? {
            self.peeked = None;
        }
        self.nodes.pop();
        Ok(())
    }

    fn read_primitive_array(&mut self, kind: PrimitiveKind) -> SerialResult<Option<PrimitiveArray>> {
        let Some(Payload::Length(count)) = self.take_payload(&[EntryType::PrimitiveArray], "a primitive array")?
        else {
            return Ok(None);
        };
        let mut items = Vec::new();
        loop {
            self.skip_commas();
            match self.tokens.next() {
                Some(Token::EndArray) => break,
                Some(Token::Literal(text) | Token::String(text)) => items.push(text),
                _ => {
                    self.corrupt("unterminated primitive array")?;
                    return Ok(None);
                }
            }
        }
        if usize::try_from(count).ok() != Some(items.len()) {
            self.context.debug().log_warning(format_args!(
                "primitive array declares {count} elements but holds {}",
                items.len()
            ))?;
        }
        let array = PrimitiveArray::from_text(kind, items.iter().map(String::as_str));
        if array.is_none() {
            self.context
                .debug()
                .log_error(format_args!("primitive array elements are not all {kind}"))?;
        }
        Ok(array)
    }

    fn skip_entry(&mut self) -> SerialResult<()> {
        let entry = self.peek_entry()?;
        if entry.kind.is_end_marker() || skip_structure(self, entry.kind)? {
            return Ok(());
        }
        self.peeked = None;
        if entry.kind == EntryType::PrimitiveArray {
            self.skip_group();
        }
        Ok(())
    }

    fn prepare_new_session(&mut self) {
        self.nodes.set_max_depth(self.context.config().max_depth);
        self.nodes.clear();
        self.types.clear();
        self.peeked = None;
    }

    fn read_internal_reference(&mut self) -> SerialResult<Option<i32>> {
        match self.take_literal(&[EntryType::InternalReference], "an internal reference")? {
            Some(text) => self.parse(&text, "a reference id"),
            None => Ok(None),
        }
    }

    fn read_external_reference_index(&mut self) -> SerialResult<Option<i32>> {
        match self.take_literal(&[EntryType::ExternalReferenceByIndex], "an external index reference")? {
            Some(text) => self.parse(&text, "a reference index"),
            None => Ok(None),
        }
    }

    fn read_external_reference_guid(&mut self) -> SerialResult<Option<Guid>> {
        match self.take_literal(&[EntryType::ExternalReferenceByGuid], "an external guid reference")? {
            Some(text) => self.parse(&text, "a guid"),
            None => Ok(None),
        }
    }

    fn read_external_reference_string(&mut self) -> SerialResult<Option<String>> {
        self.take_literal(&[EntryType::ExternalReferenceByString], "an external string reference")
    }

    fn read_null(&mut self) -> SerialResult<bool> {
        if self.peek_entry()?.kind != EntryType::Null {
            return Ok(false);
        }
        self.peeked = None;
        Ok(true)
    }

    fn read_bool(&mut self) -> SerialResult<Option<bool>> {
        match self.take_literal(&[EntryType::Boolean], "a boolean")? {
            Some(text) => self.parse(&text, "a boolean"),
            None => Ok(None),
        }
    }

    fn read_integer(&mut self) -> SerialResult<Option<i128>> {
        match self.take_literal(&[EntryType::Integer], "an integer")? {
            Some(text) => self.parse(&text, "an integer"),
            None => Ok(None),
        }
    }

    fn read_float(&mut self) -> SerialResult<Option<f64>> {
        let kinds = [EntryType::FloatingPoint, EntryType::Integer];
        let Some(text) = self.take_literal(&kinds, "a floating point number")? else {
            return Ok(None);
        };
        match float_from_text(&text) {
            Some(value) => Ok(Some(value)),
            None => {
                self.context
                    .debug()
                    .log_error(format_args!("`{text}` is not a floating point number"))?;
                Ok(None)
            }
        }
    }

    fn read_decimal(&mut self) -> SerialResult<Option<Decimal>> {
        let kinds = [EntryType::FloatingPoint, EntryType::Integer];
        let Some(text) = self.take_literal(&kinds, "a decimal")? else {
            return Ok(None);
        };
        if let Ok(value) = text.parse::<Decimal>() {
            return Ok(Some(value));
        }
        // Exponent spellings go through a float.
        match float_from_text(&text).and_then(Decimal::from_f64) {
            Some(value) => Ok(Some(value)),
            None => {
                self.context
                    .debug()
                    .log_warning(format_args!("`{text}` cannot be stored as a decimal"))?;
                Ok(None)
            }
        }
    }

    fn read_char(&mut self) -> SerialResult<Option<char>> {
        let Some(text) = self.take_literal(&[EntryType::String], "a char")? else {
            return Ok(None);
        };
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Some(c)),
            _ => {
                self.context
                    .debug()
                    .log_warning(format_args!("string {text:?} is not a single char"))?;
                Ok(None)
            }
        }
    }

    fn read_string(&mut self) -> SerialResult<Option<String>> {
        self.take_literal(&[EntryType::String], "a string")
    }

    fn read_guid(&mut self) -> SerialResult<Option<Guid>> {
        match self.take_literal(&[EntryType::Guid], "a guid")? {
            Some(text) => self.parse(&text, "a guid"),
            None => Ok(None),
        }
    }
}
