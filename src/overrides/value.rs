//! Type inference for `KEY:VALUE` override values.
//!
//! Values are read as Python literals, the notation training configs are
//! usually written in on the command line, and converted to JSON.

use serde_json::{Map, Number, Value};

const MAX_DEPTH: usize = 64;

/// Infer a JSON value from the text after the first `:`.
///
/// | Input | Result |
/// |---|---|
/// | `42`, `-3`, `0x10`, `1_000` | integer |
/// | `0.5`, `1e-4` | float |
/// | `True`, `False` | boolean |
/// | `None` | null |
/// | `"text"`, `'text'` | string without quotes |
/// | `[1, 'a']`, `(512, 512)`, `512, 512` | array |
/// | `{'rank': 16}`, `{"a": 1}` | object (keys rendered as JSON would) |
/// | anything else | the raw text as a string |
///
/// Lower-case `true`/`false`/`null`, `inf` and `nan` stay strings, as do
/// sets and malformed literals. Inference never fails.
pub fn parse_override_value(raw: &str) -> Value {
    let text = raw.trim();
    match LiteralParser::new(text).parse() {
        Some(value) => value,
        None => {
            if text.starts_with(['[', '{', '(']) {
                tracing::debug!(value = text, "not a literal, keeping as string");
            }
            Value::String(text.to_string())
        }
    }
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    /// Whole input as one literal. A bare comma-separated sequence is a tuple.
    fn parse(mut self) -> Option<Value> {
        let first = self.value()?;
        self.skip_ws();
        if self.at_end() {
            return Some(first);
        }
        if !self.eat(',') {
            return None;
        }
        let mut items = vec![first];
        loop {
            self.skip_ws();
            if self.at_end() {
                break;
            }
            items.push(self.value()?);
            self.skip_ws();
            if self.at_end() {
                break;
            }
            if !self.eat(',') {
                return None;
            }
        }
        Some(Value::Array(items))
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            '[' | '(' | '{' => {
                if self.depth == MAX_DEPTH {
                    return None;
                }
                self.depth += 1;
                let value = match self.peek()? {
                    '[' => self.list(),
                    '(' => self.tuple(),
                    _ => self.dict(),
                };
                self.depth -= 1;
                value
            }
            '\'' | '"' => self.strings(),
            '-' | '+' => self.signed_number(),
            c if c.is_ascii_digit() => self.number(false),
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number(false),
            c if c.is_alphabetic() || c == '_' => self.name(),
            _ => None,
        }
    }

    fn list(&mut self) -> Option<Value> {
        self.expect('[')?;
        Some(Value::Array(self.items(']')?))
    }

    /// `()` is empty, `(x)` is just `x`, `(x,)` and `(x, y)` are tuples.
    fn tuple(&mut self) -> Option<Value> {
        self.expect('(')?;
        self.skip_ws();
        if self.eat(')') {
            return Some(Value::Array(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if self.eat(')') {
            return Some(first);
        }
        self.expect(',')?;
        let mut items = vec![first];
        items.extend(self.items(')')?);
        Some(Value::Array(items))
    }

    /// Comma-separated values up to `close`, trailing comma allowed.
    fn items(&mut self, close: char) -> Option<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Some(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(close) {
                return Some(items);
            }
            self.expect(',')?;
        }
    }

    fn dict(&mut self) -> Option<Value> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            let key = object_key(self.value()?)?;
            self.skip_ws();
            // `{1, 2}` is a set, which has no JSON form.
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            self.expect(',')?;
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Option<Value> {
        let mut text = self.string()?;
        loop {
            let save = self.pos;
            self.skip_ws();
            if matches!(self.peek(), Some('\'' | '"')) {
                text.push_str(&self.string()?);
            } else {
                self.pos = save;
                return Some(Value::String(text));
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.next()?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }
        let mut text = String::new();
        loop {
            let c = self.next()?;
            if c == quote {
                if !triple {
                    return Some(text);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Some(text);
                }
                text.push(c);
            } else if c == '\\' {
                self.escape(&mut text)?;
            } else if c == '\n' && !triple {
                return None;
            } else {
                text.push(c);
            }
        }
    }

    fn escape(&mut self, text: &mut String) -> Option<()> {
        let c = self.next()?;
        match c {
            '\n' => {}
            '\\' | '\'' | '"' => text.push(c),
            'n' => text.push('\n'),
            't' => text.push('\t'),
            'r' => text.push('\r'),
            '0' => text.push('\0'),
            'x' => text.push(self.hex_char(2)?),
            'u' => text.push(self.hex_char(4)?),
            'U' => text.push(self.hex_char(8)?),
            // Unknown escapes keep their backslash.
            other => {
                text.push('\\');
                text.push(other);
            }
        }
        Some(())
    }

    fn hex_char(&mut self, len: usize) -> Option<char> {
        let digits: String = self.chars.get(self.pos..self.pos + len)?.iter().collect();
        self.pos += len;
        char::from_u32(u32::from_str_radix(&digits, 16).ok()?)
    }

    fn signed_number(&mut self) -> Option<Value> {
        let negative = self.next()? == '-';
        self.skip_ws();
        match self.peek()? {
            c if c.is_ascii_digit() || c == '.' => self.number(negative),
            _ => None,
        }
    }

    fn number(&mut self, negative: bool) -> Option<Value> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '+' | '-')
                && matches!(self.chars.get(self.pos - 1), Some('e' | 'E'))
                && !self.token_is_radix(start);
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let token: String = self.chars[start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();
        number_value(&token, negative)
    }

    fn token_is_radix(&self, start: usize) -> bool {
        self.chars[start] == '0'
            && matches!(
                self.chars.get(start + 1),
                Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')
            )
    }

    fn name(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        match name.as_str() {
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            "None" => Some(Value::Null),
            _ => None,
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Option<()> {
        self.eat(expected).then_some(())
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

fn number_value(token: &str, negative: bool) -> Option<Value> {
    let lower = token.to_ascii_lowercase();
    let radix = match lower.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let magnitude = i64::from_str_radix(&lower[2..], radix).ok()?;
        return Some(Value::Number(signed(magnitude, negative).into()));
    }

    if lower.contains(['.', 'e']) {
        if !lower.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            return None;
        }
        let magnitude = lower.parse::<f64>().ok()?;
        let value = if negative { -magnitude } else { magnitude };
        return Number::from_f64(value).map(Value::Number);
    }

    // Python rejects leading zeros such as `007`.
    if lower.len() > 1 && lower.starts_with('0') && lower.chars().any(|c| c != '0') {
        return None;
    }
    if let Ok(magnitude) = lower.parse::<i64>() {
        return Some(Value::Number(signed(magnitude, negative).into()));
    }
    match lower.parse::<u64>() {
        Ok(big) if !negative => Some(Value::Number(big.into())),
        _ => None,
    }
}

fn signed(magnitude: i64, negative: bool) -> i64 {
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Keys are written the way a JSON encoder renders non-string keys.
fn object_key(key: Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
