//! mashpack decoder: incremental, limit-checked reconstruction of values.
//!
//! Two input modes share one code path:
//!
//!   feed mode   : the caller pushes chunks with `feed`; running dry mid-value
//!                 returns `InsufficientData` and rewinds, so the same call can
//!                 be retried after feeding more.
//!   source mode : the decoder pulls from a `Read`; running dry means the
//!                 source hit EOF, which is terminal for that value.
//!
//! Every top-level operation (`unpack`, `skip_value`, `read_*_header`) either
//! commits the cursor into the checkpoint on success or rewinds to the
//! checkpoint on failure, leaving the decoder reusable.
//!
//! Declared lengths are checked against the configured limits the moment the
//! header is read.  Storage for collections is reserved no faster than the
//! bytes already buffered, so a hostile count cannot force a large
//! allocation up front.

use std::fmt;
use std::io::{self, Read};

use tracing::{debug, trace};

use crate::buffer::Buffer;
use crate::config::DecoderConfig;
use crate::constants::EXT_CODE_MAX;
use crate::errors::{Error, Result};
use crate::header::{be_len, read_scalar, Header, Lead, Scalar, LEAD_TABLE};
use crate::value::{Ext, Value};

/// Post-processes every decoded array.
pub type ListHook = Box<dyn Fn(Vec<Value>) -> Result<Value> + Send + Sync>;
/// Collects the pairs of every decoded map in place of `Value::Map`.
pub type PairHook = Box<dyn Fn(Vec<(Value, Value)>) -> Result<Value> + Send + Sync>;
/// Transforms every decoded map after its pairs are collected.
pub type ObjectHook = Box<dyn Fn(Value) -> Result<Value> + Send + Sync>;
/// Builds a value from an extension's code and payload.
pub type ExtHook = Box<dyn Fn(u8, Vec<u8>) -> Result<Value> + Send + Sync>;

#[derive(Default)]
struct Hooks {
    list: Option<ListHook>,
    pair: Option<PairHook>,
    object: Option<ObjectHook>,
    ext: Option<ExtHook>,
}

/// Streaming decoder.  `R` is the byte source in source mode; feed-mode
/// decoders use `io::Empty`.
pub struct Decoder<R = io::Empty> {
    config: DecoderConfig,
    buf: Buffer,
    source: Option<R>,
    hooks: Hooks,
    /// Element type and remaining count of a typed array whose header was
    /// consumed by `read_array_header`.
    typed_run: Option<(Scalar, usize)>,
}

impl Decoder<io::Empty> {
    /// Feed-mode decoder with default settings.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self::build(config, None)
    }
}

impl Default for Decoder<io::Empty> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Decoder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("config", &self.config)
            .field("buf", &self.buf)
            .field("source", &self.source.is_some())
            .field("typed_run", &self.typed_run)
            .finish()
    }
}

impl<R: Read> Decoder<R> {
    /// Source-mode decoder with default settings.
    pub fn from_reader(reader: R) -> Self {
        Self::from_reader_with_config(reader, DecoderConfig::default())
    }

    pub fn from_reader_with_config(reader: R, config: DecoderConfig) -> Self {
        Self::build(config, Some(reader))
    }

    fn build(config: DecoderConfig, source: Option<R>) -> Self {
        Self {
            buf: Buffer::new(config.max_buffer_size),
            config,
            source,
            hooks: Hooks::default(),
            typed_run: None,
        }
    }

    // ── Hooks ────────────────────────────────────────────────

    pub fn with_list_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.hooks.list = Some(Box::new(hook));
        self
    }

    pub fn with_pair_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<(Value, Value)>) -> Result<Value> + Send + Sync + 'static,
    {
        self.hooks.pair = Some(Box::new(hook));
        self
    }

    pub fn with_object_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.hooks.object = Some(Box::new(hook));
        self
    }

    pub fn with_ext_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(u8, Vec<u8>) -> Result<Value> + Send + Sync + 'static,
    {
        self.hooks.ext = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    // ── Public operations ────────────────────────────────────

    /// Append input.  On a source-backed decoder, fed bytes are read before
    /// anything further is pulled from the source.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend(bytes)
    }

    /// Decode the next complete value.
    pub fn unpack(&mut self) -> Result<Value> {
        self.attempt(|d| {
            if let Some(elem) = d.next_typed_element() {
                let bytes = d.take(elem.width())?;
                let value = read_scalar(elem, bytes);
                d.consume_typed_element();
                return Ok(value);
            }
            d.read_value(0)
        })
    }

    /// Consume the next value without building it.  Text is not UTF-8
    /// checked and no hooks run.
    pub fn skip_value(&mut self) -> Result<()> {
        self.attempt(|d| {
            if let Some(elem) = d.next_typed_element() {
                d.skip_bytes(elem.width())?;
                d.consume_typed_element();
                return Ok(());
            }
            d.skip_nested(0)
        })
    }

    /// Consume an array header and return its declared element count.
    /// The elements follow as individual `unpack`/`skip_value` calls.
    pub fn read_array_header(&mut self) -> Result<usize> {
        self.attempt(|d| {
            d.refuse_inside_typed_run()?;
            match d.read_header()? {
                Header::Array(n) => Ok(n),
                Header::TypedArray { len, elem } => {
                    d.typed_run = (len > 0).then_some((elem, len));
                    Ok(len)
                }
                other => Err(Error::format(format!("expected array, found {}", other.kind()))),
            }
        })
    }

    /// Consume a map header and return its declared pair count.  The pairs
    /// follow as alternating key and value reads.
    pub fn read_map_header(&mut self) -> Result<usize> {
        self.attempt(|d| {
            d.refuse_inside_typed_run()?;
            match d.read_header()? {
                Header::Map(n) => Ok(n),
                other => Err(Error::format(format!("expected map, found {}", other.kind()))),
            }
        })
    }

    /// Stream offset just past the last consumed value or header.
    pub fn tell(&self) -> u64 {
        self.buf.consumed_offset()
    }

    /// Buffered bytes not yet consumed.
    pub fn remaining(&self) -> &[u8] {
        self.buf.unread()
    }

    // ── Commit / rewind ──────────────────────────────────────

    fn attempt<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = op(self);
        match &result {
            Ok(_) => self.buf.commit(),
            Err(e) => {
                self.buf.rewind();
                if !e.is_insufficient_data() {
                    debug!(error = %e, offset = self.tell(), "decode failed, rewound to checkpoint");
                }
            }
        }
        result
    }

    fn next_typed_element(&self) -> Option<Scalar> {
        self.typed_run.map(|(elem, _)| elem)
    }

    fn consume_typed_element(&mut self) {
        self.typed_run = match self.typed_run {
            Some((elem, left)) if left > 1 => Some((elem, left - 1)),
            _ => None,
        };
    }

    fn refuse_inside_typed_run(&self) -> Result<()> {
        match self.typed_run {
            Some((_, left)) => Err(Error::format(format!(
                "{} typed array elements still pending",
                left
            ))),
            None => Ok(()),
        }
    }

    // ── Input ────────────────────────────────────────────────

    /// Make at least `n` unread bytes available, pulling from the source if
    /// there is one.
    fn reserve(&mut self, n: usize) -> Result<()> {
        while self.buf.available() < n {
            let Some(source) = self.source.as_mut() else {
                return Err(Error::InsufficientData);
            };

            let missing = n - self.buf.available();
            self.buf.compact();
            let want = missing
                .max(self.config.read_chunk_size)
                .min(self.buf.headroom());
            if want < missing {
                return Err(Error::limit(format!(
                    "need {} more bytes but max_buffer_size is {}",
                    missing,
                    self.buf.max_size()
                )));
            }

            let slot = self.buf.fill_slot(want);
            let got = match source.read(slot) {
                Ok(got) => got,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    self.buf.commit_fill(want, 0);
                    continue;
                }
                Err(e) => {
                    self.buf.commit_fill(want, 0);
                    return Err(e.into());
                }
            };
            self.buf.commit_fill(want, got);
            debug!(requested = want, got, "pulled from source");
            if got == 0 {
                return Err(Error::InsufficientData);
            }
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        self.reserve(n)?;
        self.buf.take(n).ok_or(Error::InsufficientData)
    }

    /// Like `take`, for a declared payload length.  A payload that can never
    /// fit in the buffer fails immediately instead of waiting for input.
    fn take_payload(&mut self, n: usize) -> Result<&[u8]> {
        self.check_fits(n)?;
        self.take(n)
    }

    fn skip_bytes(&mut self, n: usize) -> Result<()> {
        self.check_fits(n)?;
        self.reserve(n)?;
        if self.buf.advance(n) {
            Ok(())
        } else {
            Err(Error::InsufficientData)
        }
    }

    fn check_fits(&self, n: usize) -> Result<()> {
        if n > self.buf.max_size() {
            return Err(Error::limit(format!(
                "payload of {} bytes exceeds max_buffer_size {}",
                n,
                self.buf.max_size()
            )));
        }
        Ok(())
    }

    // ── Headers ──────────────────────────────────────────────

    fn read_header(&mut self) -> Result<Header> {
        let lead_byte = self.take(1)?[0];
        let lead = LEAD_TABLE[lead_byte as usize];
        trace!(lead_byte, ?lead, "dispatch");

        let header = match lead {
            Lead::FixMap(n) => Header::Map(n as usize),
            Lead::FixStr(n) => Header::Str(n as usize),
            Lead::FixArray(n) => Header::Array(n as usize),
            Lead::PosFixInt(v) => Header::Int(v as i128),
            Lead::NegFixInt(v) => Header::Int(v as i128),
            Lead::Nil => Header::Nil,
            Lead::False => Header::Bool(false),
            Lead::True => Header::Bool(true),
            Lead::Scalar(s) => Header::Scalar(s),
            Lead::Map(w) => Header::Map(be_len(self.take(w.bytes())?)),
            Lead::Str(w) => Header::Str(be_len(self.take(w.bytes())?)),
            Lead::Array(w) => Header::Array(be_len(self.take(w.bytes())?)),
            Lead::Bin(w) => Header::Bin(be_len(self.take(w.bytes())?)),
            Lead::TypedArray(w) => {
                let field = self.take(lead.follow_len())?;
                let (len, tag) = (be_len(&field[..w.bytes()]), field[w.bytes()]);
                let elem = Scalar::from_tag(tag).ok_or_else(|| {
                    Error::format(format!("0x{:02x} is not a fixed-width element type", tag))
                })?;
                Header::TypedArray { len, elem }
            }
            Lead::Ext(w) => {
                let field = self.take(lead.follow_len())?;
                let (len, code) = (be_len(&field[..w.bytes()]), field[w.bytes()]);
                if code > EXT_CODE_MAX {
                    return Err(Error::format(format!("ext type code {} above 127", code)));
                }
                Header::Ext { len, code }
            }
            Lead::Reserved => {
                return Err(Error::format(format!("reserved lead byte 0x{:02x}", lead_byte)));
            }
        };

        self.check_limits(&header)?;
        Ok(header)
    }

    fn check_limits(&self, header: &Header) -> Result<()> {
        let limits = &self.config.limits;
        let (len, max, name) = match *header {
            Header::Str(n) => (n, limits.max_str_len, "max_str_len"),
            Header::Bin(n) => (n, limits.max_bin_len, "max_bin_len"),
            Header::Array(n) | Header::TypedArray { len: n, .. } => {
                (n, limits.max_array_len, "max_array_len")
            }
            Header::Map(n) => (n, limits.max_map_len, "max_map_len"),
            Header::Ext { len, .. } => (len, limits.max_ext_len, "max_ext_len"),
            _ => return Ok(()),
        };
        if len > max {
            return Err(Error::limit(format!("{} exceeds {}={}", len, name, max)));
        }
        Ok(())
    }

    fn enter(&self, depth: usize) -> Result<()> {
        if depth >= self.config.max_depth {
            return Err(Error::limit(format!(
                "nesting deeper than max_depth={}",
                self.config.max_depth
            )));
        }
        Ok(())
    }

    /// Initial capacity for `n` elements: never more than could possibly be
    /// backed by bytes already buffered.
    fn capacity_for(&self, n: usize) -> usize {
        n.min(self.buf.available())
    }

    // ── Values ───────────────────────────────────────────────

    fn read_value(&mut self, depth: usize) -> Result<Value> {
        match self.read_header()? {
            Header::Nil => Ok(Value::Nil),
            Header::Bool(b) => Ok(Value::Bool(b)),
            Header::Int(i) => Ok(Value::Int(i)),
            Header::Scalar(s) => Ok(read_scalar(s, self.take(s.width())?)),
            Header::Str(n) => {
                let raw = self.take_payload(n)?;
                let text = std::str::from_utf8(raw)
                    .map_err(|e| Error::format(format!("invalid UTF-8 in text: {}", e)))?;
                Ok(Value::Text(text.to_owned()))
            }
            Header::Bin(n) => Ok(Value::Bytes(self.take_payload(n)?.to_vec())),
            Header::Ext { len, code } => {
                let data = self.take_payload(len)?.to_vec();
                match &self.hooks.ext {
                    Some(hook) => hook(code, data),
                    None => Ok(Value::Ext(Ext::new(code, data)?)),
                }
            }
            Header::Array(n) => {
                self.enter(depth)?;
                let mut items = Vec::with_capacity(self.capacity_for(n));
                for _ in 0..n {
                    items.push(self.read_value(depth + 1)?);
                }
                self.finish_list(items)
            }
            Header::TypedArray { len, elem } => {
                self.enter(depth)?;
                let total = typed_payload_len(len, elem)?;
                let payload = self.take_payload(total)?;
                let items = payload
                    .chunks_exact(elem.width())
                    .map(|chunk| read_scalar(elem, chunk))
                    .collect();
                self.finish_list(items)
            }
            Header::Map(n) => {
                self.enter(depth)?;
                let mut pairs = Vec::with_capacity(self.capacity_for(n));
                for _ in 0..n {
                    let key = self.read_value(depth + 1)?;
                    let value = self.read_value(depth + 1)?;
                    pairs.push((key, value));
                }
                self.finish_map(pairs)
            }
        }
    }

    fn finish_list(&self, items: Vec<Value>) -> Result<Value> {
        match &self.hooks.list {
            Some(hook) => hook(items),
            None => Ok(Value::Array(items)),
        }
    }

    fn finish_map(&self, pairs: Vec<(Value, Value)>) -> Result<Value> {
        let map = match &self.hooks.pair {
            Some(hook) => hook(pairs)?,
            None => Value::Map(pairs),
        };
        match &self.hooks.object {
            Some(hook) => hook(map),
            None => Ok(map),
        }
    }

    fn skip_nested(&mut self, depth: usize) -> Result<()> {
        match self.read_header()? {
            Header::Str(n) | Header::Bin(n) | Header::Ext { len: n, .. } => self.skip_bytes(n),
            Header::Scalar(s) => self.skip_bytes(s.width()),
            Header::TypedArray { len, elem } => {
                self.enter(depth)?;
                self.skip_bytes(typed_payload_len(len, elem)?)
            }
            Header::Array(n) => {
                self.enter(depth)?;
                for _ in 0..n {
                    self.skip_nested(depth + 1)?;
                }
                Ok(())
            }
            Header::Map(n) => {
                self.enter(depth)?;
                for _ in 0..n {
                    self.skip_nested(depth + 1)?;
                    self.skip_nested(depth + 1)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<Value>;

    /// Yields values until input runs out at a value boundary.  A feed-mode
    /// decoder can be iterated again after more input is fed.
    fn next(&mut self) -> Option<Self::Item> {
        match self.unpack() {
            Ok(value) => Some(Ok(value)),
            Err(Error::InsufficientData) if self.source.is_none() || self.buf.pending() == 0 => None,
            Err(e) => Some(Err(e)),
        }
    }
}

fn typed_payload_len(len: usize, elem: Scalar) -> Result<usize> {
    len.checked_mul(elem.width())
        .ok_or_else(|| Error::limit(format!("typed array of {} elements is too large", len)))
}
