//! `.properties` resource parsing.
//!
//! Supports `#` and `!` comments, `key = value`, `key: value` and `key value`
//! pairs, backslash line continuations, and the `\n`, `\t`, `\r`, `\\` and
//! `\uXXXX` escapes, including UTF-16 surrogate pairs. Any other escaped
//! character stands for itself.

use std::collections::BTreeMap;
use std::str::Chars;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct PropertiesError {
  pub line: usize,
  pub message: String,
}

/// Parse `.properties` text into a sorted key/value map. Later keys win.
pub fn parse(text: &str) -> Result<BTreeMap<String, String>, PropertiesError> {
  let mut entries = BTreeMap::new();
  let mut lines = text.lines().enumerate();

  while let Some((index, raw)) = lines.next() {
    let line_no = index + 1;
    let mut logical = raw.trim_start().to_string();
    if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
      continue;
    }

    while ends_with_continuation(&logical) {
      logical.pop();
      match lines.next() {
        Some((_, next)) => logical.push_str(next.trim_start()),
        None => break,
      }
    }

    let (key, value) = split_pair(&logical);
    let key = unescape(key.trim_end(), line_no)?;
    if key.is_empty() {
      return Err(PropertiesError {
        line: line_no,
        message: "missing key".to_string(),
      });
    }
    let value = unescape(value.trim(), line_no)?;
    entries.insert(key, value);
  }

  Ok(entries)
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
  line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split at the first unescaped `=`, `:` or whitespace. Whitespace may be
/// followed by one `=` or `:`. A line without a separator is a bare key.
fn split_pair(line: &str) -> (&str, &str) {
  let mut escaped = false;
  for (i, c) in line.char_indices() {
    match c {
      '\\' if !escaped => escaped = true,
      '=' | ':' if !escaped => return (&line[..i], &line[i + 1..]),
      c if c.is_whitespace() && !escaped => {
        let rest = line[i..].trim_start();
        return (&line[..i], rest.strip_prefix(['=', ':']).unwrap_or(rest));
      }
      _ => escaped = false,
    }
  }
  (line, "")
}

fn read_hex4(chars: &mut Chars<'_>, line: usize) -> Result<u32, PropertiesError> {
  let hex: String = chars.by_ref().take(4).collect();
  u32::from_str_radix(&hex, 16)
    .ok()
    .filter(|_| hex.len() == 4)
    .ok_or_else(|| PropertiesError {
      line,
      message: format!("invalid unicode escape '\\u{hex}'"),
    })
}

/// Decode the code unit after `\u`, consuming a trailing low surrogate escape.
fn decode_unicode(chars: &mut Chars<'_>, line: usize) -> Result<char, PropertiesError> {
  let unit = read_hex4(chars, line)?;
  let code = if (0xD800..0xDC00).contains(&unit) {
    let mut ahead = chars.clone();
    let low = match (ahead.next(), ahead.next()) {
      (Some('\\'), Some('u')) => read_hex4(&mut ahead, line)?,
      _ => 0,
    };
    if !(0xDC00..0xE000).contains(&low) {
      return Err(PropertiesError {
        line,
        message: format!("unpaired surrogate '\\u{unit:04X}'"),
      });
    }
    *chars = ahead;
    0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
  } else {
    unit
  };
  char::from_u32(code).ok_or_else(|| PropertiesError {
    line,
    message: format!("invalid unicode escape '\\u{unit:04X}'"),
  })
}

fn unescape(raw: &str, line: usize) -> Result<String, PropertiesError> {
  let mut out = String::with_capacity(raw.len());
  let mut chars = raw.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('n') => out.push('\n'),
      Some('t') => out.push('\t'),
      Some('r') => out.push('\r'),
      Some('u') => out.push(decode_unicode(&mut chars, line)?),
      Some(other) => out.push(other),
      None => {}
    }
  }
  Ok(out)
}
