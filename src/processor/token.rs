//! Token and literal rules shared by every stage of the compiler.
//!
//! Nothing in here touches the `Context`: these are pure predicates and
//! formatters for the output language.
//
//  Identifier rules (informal):
//
//      token       ::= non-empty, no ' ', no '-', first char not a digit
//      identifier  ::= token ∩ [A-Za-z_][A-Za-z0-9_]* ∖ reserved words
//
//  `token` decides whether a bare comparison operand names a variable;
//  `identifier` decides whether a name may be emitted as-is or has to go
//  through a bracketed table index.

use serde_json::Value;

/// Two-character prefix the compiler keeps for its own names.
pub const RESERVED_PREFIX: &str = "__";

/// Lua keywords plus the handler parameter names every event function
/// binds; a variable named like one of these is stored in the table.
const RESERVED_WORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if",
    "in", "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
    "event", "import",
];

pub fn is_token(s: &str) -> bool {
    match s.chars().next() {
        None => false,
        Some(first) => !first.is_ascii_digit() && !s.contains(' ') && !s.contains('-'),
    }
}

pub fn is_identifier(s: &str) -> bool {
    is_token(s)
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_WORDS.contains(&s)
}

pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\x0c' => out.push_str("\\f"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

pub fn quote(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

/// Doubles the reserved prefix so user names never meet compiler names.
pub fn escape_reserved(name: &str) -> String {
    if name.starts_with(RESERVED_PREFIX) {
        format!("{RESERVED_PREFIX}{name}")
    } else {
        name.to_string()
    }
}

/// Inline `--[[(...)]]` annotation; the text must not close the comment early.
pub fn annotation(text: &str) -> String {
    format!("--[[({})]]", text.replace("]]", "] ]").replace('\n', " "))
}

/// `obj.key` when `key` is a plain identifier, `obj["key"]` otherwise.
pub fn field(obj: &str, key: &str) -> String {
    if is_identifier(key) {
        format!("{obj}.{key}")
    } else {
        format!("{obj}[{}]", quote(key))
    }
}

/// Renders a JSON value verbatim as a Lua constructor.
pub fn lua_value(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(lua_value).collect();
            format!("{{{}}}", items.join(", "))
        }
        Value::Object(map) => {
            let fields: Vec<String> = map
                .iter()
                .map(|(k, v)| {
                    if is_identifier(k) {
                        format!("{k} = {}", lua_value(v))
                    } else {
                        format!("[{}] = {}", quote(k), lua_value(v))
                    }
                })
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}
