// Inline numpy array payloads in joblib model files
use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

const WRAPPER_CLASS: &[u8] = b"NumpyArrayWrapper";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct ScanError {
    pub offset: usize,
    pub message: String,
}

/// Remove the raw array buffers `joblib.dump` writes between pickle opcodes.
///
/// joblib pickles a `NumpyArrayWrapper` (shape, dtype, order) for every array and
/// then writes the array's bytes straight into the file after the wrapper's BUILD.
/// Numeric arrays are preceded by an alignment padding block when the wrapper
/// records `numpy_array_alignment_bytes`. Object arrays are written as a complete
/// nested pickle instead. Cutting those spans leaves an ordinary pickle stream
/// with the wrappers still in place. Streams without wrappers come back borrowed.
pub fn strip_inline_arrays(bytes: &[u8]) -> Result<Cow<'_, [u8]>, ScanError> {
    if !bytes.windows(WRAPPER_CLASS.len()).any(|w| w == WRAPPER_CLASS) {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut scanner = Scanner::new(bytes, 0);
    scanner.run()?;
    if scanner.cuts.is_empty() {
        return Ok(Cow::Borrowed(bytes));
    }

    tracing::debug!("Cut {} inline array payloads from joblib stream", scanner.cuts.len());
    let mut stream = Vec::with_capacity(bytes.len());
    let mut start = 0;
    for cut in &scanner.cuts {
        stream.extend_from_slice(&bytes[start..cut.start]);
        start = cut.end;
    }
    stream.extend_from_slice(&bytes[start..]);
    Ok(Cow::Owned(stream))
}

// Just enough of the object graph to read a wrapper's state
#[derive(Debug, Clone)]
enum Val {
    None,
    Bool,
    Int(i64),
    BigInt,
    Float,
    Str(Rc<str>),
    Bytes,
    Tuple(Rc<Vec<Val>>),
    List(Rc<Vec<Val>>),
    Dict(Rc<Vec<(Val, Val)>>),
    Set,
    Global(Rc<str>, Rc<str>),
    Object { class: Rc<Val>, args: Rc<Vec<Val>> },
}

impl Val {
    fn text(bytes: &[u8]) -> Val {
        Val::Str(Rc::from(String::from_utf8_lossy(bytes).as_ref()))
    }

    fn global(module: &[u8], name: &[u8]) -> Val {
        let module = String::from_utf8_lossy(module);
        let name = String::from_utf8_lossy(name);
        Val::Global(Rc::from(module.as_ref()), Rc::from(name.as_ref()))
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(&**s),
            _ => None,
        }
    }

    fn object(class: Val, args: Val) -> Val {
        let args = match args {
            Val::Tuple(items) => items,
            other => Rc::new(vec![other]),
        };
        // copyreg._reconstructor(cls, base, state) is how protocols 0 and 1 build instances
        let reconstructed = match (&class, args.first()) {
            (Val::Global(module, name), Some(cls @ Val::Global(..)))
                if matches!(&**module, "copyreg" | "copy_reg") && &**name == "_reconstructor" =>
            {
                Some(cls.clone())
            }
            _ => None,
        };
        Val::Object {
            class: Rc::new(reconstructed.unwrap_or(class)),
            args,
        }
    }

    fn is_array_wrapper(&self) -> bool {
        match self {
            Val::Object { class, .. } => matches!(
                &**class,
                Val::Global(module, name)
                    if module.ends_with("numpy_pickle") && &**name == "NumpyArrayWrapper"
            ),
            _ => false,
        }
    }

    fn get(&self, key: &str) -> Option<&Val> {
        match self {
            Val::Dict(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

fn int_from_text(line: &[u8]) -> Val {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map_or(Val::BigInt, Val::Int)
}

fn int_from_le(bytes: &[u8]) -> Val {
    if bytes.len() > 8 {
        return Val::BigInt;
    }
    let negative = bytes.last().is_some_and(|b| b & 0x80 != 0);
    let mut buf = if negative { [0xff; 8] } else { [0; 8] };
    buf[..bytes.len()].copy_from_slice(bytes);
    Val::Int(i64::from_le_bytes(buf))
}

/// Itemsize from a numpy dtype descriptor such as `f8`, `i4` or `U20`.
fn itemsize(descr: &str) -> Option<usize> {
    descr
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .ok()
}

struct Scanner<'a> {
    data: &'a [u8],
    pos: usize,
    op_at: usize,
    stack: Vec<Val>,
    marks: Vec<usize>,
    memo: HashMap<u32, Val>,
    cuts: Vec<Range<usize>>,
}

impl<'a> Scanner<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos,
            op_at: pos,
            stack: Vec::new(),
            marks: Vec::new(),
            memo: HashMap::new(),
            cuts: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ScanError {
        ScanError {
            offset: self.op_at,
            message: message.into(),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ScanError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.error("unexpected end of stream"))?;
        let data = self.data;
        let slice = &data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ScanError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn byte(&mut self) -> Result<u8, ScanError> {
        Ok(self.array::<1>()?[0])
    }

    fn len_u32(&mut self) -> Result<usize, ScanError> {
        Ok(u32::from_le_bytes(self.array()?) as usize)
    }

    fn len_u64(&mut self) -> Result<usize, ScanError> {
        usize::try_from(u64::from_le_bytes(self.array()?))
            .map_err(|_| self.error("length does not fit in memory"))
    }

    fn line(&mut self) -> Result<&'a [u8], ScanError> {
        let data = self.data;
        let rest = &data[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| self.error("unterminated line argument"))?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    fn memo_key(&self, line: &[u8]) -> Result<u32, ScanError> {
        std::str::from_utf8(line)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| self.error("invalid memo key"))
    }

    fn push(&mut self, value: Val) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<Val, ScanError> {
        self.stack.pop().ok_or_else(|| self.error("stack underflow"))
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Val>, ScanError> {
        if self.stack.len() < n {
            return Err(self.error("stack underflow"));
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn pop_mark(&mut self) -> Result<Vec<Val>, ScanError> {
        let mark = self.marks.pop().ok_or_else(|| self.error("mark not found"))?;
        if mark > self.stack.len() {
            return Err(self.error("stack underflow"));
        }
        Ok(self.stack.split_off(mark))
    }

    fn top(&mut self) -> Result<&mut Val, ScanError> {
        let offset = self.op_at;
        self.stack.last_mut().ok_or_else(|| ScanError {
            offset,
            message: "stack underflow".to_string(),
        })
    }

    fn memo_put(&mut self, key: u32) -> Result<(), ScanError> {
        let value = self.top()?.clone();
        self.memo.insert(key, value);
        Ok(())
    }

    fn memo_get(&mut self, key: u32) -> Result<(), ScanError> {
        let value = self
            .memo
            .get(&key)
            .cloned()
            .ok_or_else(|| self.error(format!("memo key {} not found", key)))?;
        self.push(value);
        Ok(())
    }

    fn extend_list(&mut self, items: Vec<Val>) -> Result<(), ScanError> {
        if let Val::List(list) = self.top()? {
            Rc::make_mut(list).extend(items);
        }
        Ok(())
    }

    fn extend_dict(&mut self, items: Vec<Val>) -> Result<(), ScanError> {
        if items.len() % 2 != 0 {
            return Err(self.error("odd number of items for dict"));
        }
        let mut items = items.into_iter();
        let mut pairs = Vec::new();
        while let (Some(k), Some(v)) = (items.next(), items.next()) {
            pairs.push((k, v));
        }
        if let Val::Dict(dict) = self.top()? {
            Rc::make_mut(dict).extend(pairs);
        }
        Ok(())
    }

    /// Walk opcodes up to and including STOP.
    fn run(&mut self) -> Result<(), ScanError> {
        loop {
            self.op_at = self.pos;
            match self.byte()? {
                b'.' => return Ok(()),
                b'(' => self.marks.push(self.stack.len()),
                b'0' => {
                    self.pop()?;
                }
                b'1' => {
                    self.pop_mark()?;
                }
                b'2' => {
                    let value = self.top()?.clone();
                    self.push(value);
                }
                0x80 => {
                    self.byte()?;
                }
                0x95 => {
                    self.take(8)?;
                }

                b'N' => self.push(Val::None),
                0x88 | 0x89 => self.push(Val::Bool),
                b'I' => {
                    let line = self.line()?;
                    let value = match line {
                        b"01" | b"00" => Val::Bool,
                        _ => int_from_text(line),
                    };
                    self.push(value);
                }
                b'L' => {
                    let line = self.line()?;
                    self.push(int_from_text(line.strip_suffix(b"L").unwrap_or(line)));
                }
                b'J' => {
                    let value = i32::from_le_bytes(self.array()?);
                    self.push(Val::Int(value.into()));
                }
                b'K' => {
                    let value = self.byte()?;
                    self.push(Val::Int(value.into()));
                }
                b'M' => {
                    let value = u16::from_le_bytes(self.array()?);
                    self.push(Val::Int(value.into()));
                }
                0x8a => {
                    let n = self.byte()? as usize;
                    let bytes = self.take(n)?;
                    self.push(int_from_le(bytes));
                }
                0x8b => {
                    let n = self.len_u32()?;
                    let bytes = self.take(n)?;
                    self.push(int_from_le(bytes));
                }
                b'F' => {
                    self.line()?;
                    self.push(Val::Float);
                }
                b'G' => {
                    self.take(8)?;
                    self.push(Val::Float);
                }

                b'S' => {
                    let line = self.line()?;
                    let unquoted = line
                        .get(1..line.len().saturating_sub(1))
                        .unwrap_or_default();
                    self.push(Val::text(unquoted));
                }
                b'V' => {
                    let line = self.line()?;
                    self.push(Val::text(line));
                }
                b'U' | 0x8c => {
                    let n = self.byte()? as usize;
                    let bytes = self.take(n)?;
                    self.push(Val::text(bytes));
                }
                b'T' | b'X' => {
                    let n = self.len_u32()?;
                    let bytes = self.take(n)?;
                    self.push(Val::text(bytes));
                }
                0x8d => {
                    let n = self.len_u64()?;
                    let bytes = self.take(n)?;
                    self.push(Val::text(bytes));
                }
                b'C' => {
                    let n = self.byte()? as usize;
                    self.take(n)?;
                    self.push(Val::Bytes);
                }
                b'B' => {
                    let n = self.len_u32()?;
                    self.take(n)?;
                    self.push(Val::Bytes);
                }
                0x8e | 0x96 => {
                    let n = self.len_u64()?;
                    self.take(n)?;
                    self.push(Val::Bytes);
                }

                b')' => self.push(Val::Tuple(Rc::default())),
                b't' => {
                    let items = self.pop_mark()?;
                    self.push(Val::Tuple(Rc::new(items)));
                }
                op @ 0x85..=0x87 => {
                    let items = self.pop_n(usize::from(op - 0x84))?;
                    self.push(Val::Tuple(Rc::new(items)));
                }
                b']' => self.push(Val::List(Rc::default())),
                b'l' => {
                    let items = self.pop_mark()?;
                    self.push(Val::List(Rc::new(items)));
                }
                b'a' => {
                    let item = self.pop()?;
                    self.extend_list(vec![item])?;
                }
                b'e' => {
                    let items = self.pop_mark()?;
                    self.extend_list(items)?;
                }
                b'}' => self.push(Val::Dict(Rc::default())),
                b'd' => {
                    let items = self.pop_mark()?;
                    self.push(Val::Dict(Rc::default()));
                    self.extend_dict(items)?;
                }
                b's' => {
                    let pair = self.pop_n(2)?;
                    self.extend_dict(pair)?;
                }
                b'u' => {
                    let items = self.pop_mark()?;
                    self.extend_dict(items)?;
                }
                0x8f => self.push(Val::Set),
                0x90 => {
                    self.pop_mark()?;
                    self.top()?;
                }
                0x91 => {
                    self.pop_mark()?;
                    self.push(Val::Set);
                }

                b'c' => {
                    let module = self.line()?;
                    let name = self.line()?;
                    self.push(Val::global(module, name));
                }
                0x93 => {
                    let name = self.pop()?;
                    let module = self.pop()?;
                    match (module.as_str(), name.as_str()) {
                        (Some(module), Some(name)) => {
                            let global = Val::Global(Rc::from(module), Rc::from(name));
                            self.push(global);
                        }
                        _ => return Err(self.error("STACK_GLOBAL requires str arguments")),
                    }
                }
                b'R' | 0x81 => {
                    let args = self.pop()?;
                    let class = self.pop()?;
                    self.push(Val::object(class, args));
                }
                0x92 => {
                    self.pop()?;
                    let args = self.pop()?;
                    let class = self.pop()?;
                    self.push(Val::object(class, args));
                }
                b'o' => {
                    let mut items = self.pop_mark()?.into_iter();
                    let class = items.next().ok_or_else(|| self.error("OBJ without a class"))?;
                    let args = Val::Tuple(Rc::new(items.collect()));
                    self.push(Val::object(class, args));
                }
                b'i' => {
                    let module = self.line()?;
                    let name = self.line()?;
                    let args = Val::Tuple(Rc::new(self.pop_mark()?));
                    self.push(Val::object(Val::global(module, name), args));
                }
                b'b' => self.build()?,
                0x98 => {
                    self.top()?;
                }

                b'p' => {
                    let line = self.line()?;
                    let key = self.memo_key(line)?;
                    self.memo_put(key)?;
                }
                b'q' => {
                    let key = self.byte()?.into();
                    self.memo_put(key)?;
                }
                b'r' => {
                    let key = u32::from_le_bytes(self.array()?);
                    self.memo_put(key)?;
                }
                0x94 => {
                    let key = u32::try_from(self.memo.len())
                        .map_err(|_| self.error("memo overflow"))?;
                    self.memo_put(key)?;
                }
                b'g' => {
                    let line = self.line()?;
                    let key = self.memo_key(line)?;
                    self.memo_get(key)?;
                }
                b'h' => {
                    let key = self.byte()?.into();
                    self.memo_get(key)?;
                }
                b'j' => {
                    let key = u32::from_le_bytes(self.array()?);
                    self.memo_get(key)?;
                }

                op => return Err(self.error(format!("unsupported opcode {:#04x}", op))),
            }
        }
    }

    fn build(&mut self) -> Result<(), ScanError> {
        let state = self.pop()?;
        if self.top()?.is_array_wrapper() {
            self.skip_array_payload(&state)?;
        }
        Ok(())
    }

    fn skip_array_payload(&mut self, state: &Val) -> Result<(), ScanError> {
        let descr = match state.get("dtype") {
            Some(Val::Object { args, .. }) => args.first().and_then(Val::as_str),
            _ => None,
        }
        .ok_or_else(|| self.error("array wrapper without a dtype"))?;

        let start = self.pos;
        if descr.starts_with('O') {
            let mut nested = Scanner::new(self.data, self.pos);
            nested.run()?;
            self.pos = nested.pos;
        } else {
            if let Some(Val::Int(_)) = state.get("numpy_array_alignment_bytes") {
                let padding = self.byte()? as usize;
                self.take(padding)?;
            }
            let len = self.payload_len(state, descr)?;
            self.take(len)?;
        }

        self.cuts.push(start..self.pos);
        Ok(())
    }

    fn payload_len(&self, state: &Val, descr: &str) -> Result<usize, ScanError> {
        let itemsize =
            itemsize(descr).ok_or_else(|| self.error(format!("unknown dtype '{}'", descr)))?;
        let Some(Val::Tuple(shape)) = state.get("shape") else {
            return Err(self.error("array wrapper without a shape"));
        };

        shape
            .iter()
            .try_fold(itemsize, |len, dim| match dim {
                Val::Int(d) => usize::try_from(*d).ok().and_then(|d| len.checked_mul(d)),
                _ => None,
            })
            .ok_or_else(|| self.error("invalid array shape"))
    }
}
