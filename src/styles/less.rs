//! Lowering of the LESS subset the builtin compiler understands.
//!
//! Top-level variables (`@name: value;`) are collected and substituted into
//! every `@name` and `@{name}` reference, `~"..."` escapes are unquoted and
//! `//` comments are dropped. Nested rules are left in place; the CSS printer
//! flattens them. Any other LESS construct (mixins, guards, `:extend`, colour
//! functions) is an error that names `lessc` as the way out.

use regex::Regex;
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::OnceLock;
use thiserror::Error;

/// LESS functions that have no CSS counterpart.
const LESS_FUNCTIONS: &[&str] = &[
    "darken",
    "desaturate",
    "e",
    "escape",
    "fade",
    "fadein",
    "fadeout",
    "greyscale",
    "lighten",
    "luma",
    "mix",
    "percentage",
    "shade",
    "spin",
    "tint",
    "unit",
];

/// Errors from lowering LESS to CSS
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LessError {
    #[error("undefined variable @{0}")]
    UndefinedVariable(String),
    #[error("variable @{0} refers to itself")]
    RecursiveVariable(String),
    #[error("{0} is not supported by the builtin compiler (use compiler = \"lessc\")")]
    Unsupported(String),
    #[error("unterminated {0}")]
    Unterminated(&'static str),
}

fn mixin_definition_regex() -> &'static Regex {
    static MIXIN: OnceLock<Regex> = OnceLock::new();
    MIXIN.get_or_init(|| {
        Regex::new(r"^([.#][\w-]+)\s*\(").expect("mixin pattern is a valid regex")
    })
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// At-rules whose name may be followed by `:` (`@page :first`).
fn is_css_at_rule(name: &str) -> bool {
    name.starts_with('-')
        || matches!(
            name,
            "charset"
                | "container"
                | "counter-style"
                | "document"
                | "font-face"
                | "font-feature-values"
                | "font-palette-values"
                | "import"
                | "keyframes"
                | "layer"
                | "media"
                | "namespace"
                | "page"
                | "property"
                | "scope"
                | "starting-style"
                | "supports"
                | "viewport"
        )
}

/// Lower LESS source text to CSS.
pub fn lower(source: &str) -> Result<String, LessError> {
    let scanned = Scanner::new(source, false).run()?;
    let mut resolver = Resolver {
        variables: scanned.variables.into_iter().collect::<HashMap<_, _>>(),
        stack: Vec::new(),
    };
    resolver.join(scanned.pieces)
}

#[derive(Debug)]
enum Piece {
    Text(String),
    Var(String),
}

struct Scanned {
    pieces: Vec<Piece>,
    /// Declarations in source order; later ones win.
    variables: Vec<(String, String)>,
}

struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
    pieces: Vec<Piece>,
    text: String,
    /// Non-comment text since the last `{`, `}` or `;`
    statement: String,
    depth: usize,
    parens: usize,
    /// Scanning a variable value: every `@name` is a reference.
    value_mode: bool,
    variables: Vec<(String, String)>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str, value_mode: bool) -> Self {
        Self {
            chars: source.chars().peekable(),
            pieces: Vec::new(),
            text: String::with_capacity(source.len()),
            statement: String::new(),
            depth: 0,
            parens: 0,
            value_mode,
            variables: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Scanned, LessError> {
        while let Some(c) = self.chars.next() {
            match c {
                '"' | '\'' => {
                    let quoted = self.string(c)?;
                    self.emit(&quoted);
                }
                '/' if self.chars.peek() == Some(&'*') => {
                    let comment = self.block_comment()?;
                    self.text.push_str(&comment);
                }
                '/' if self.chars.peek() == Some(&'/') => self.line_comment(),
                '~' if matches!(self.chars.peek(), Some('"' | '\'')) => {
                    let quote = self.chars.next().unwrap_or('"');
                    let quoted = self.string(quote)?;
                    self.emit(&quoted[1..quoted.len() - 1]);
                }
                '@' => self.at_sign()?,
                '&' if self.chars.peek().is_some_and(|c| is_word(*c)) => {
                    return Err(LessError::Unsupported("`&` suffix selectors".to_string()));
                }
                '(' => {
                    self.parens += 1;
                    self.emit_char(c);
                }
                ')' => {
                    self.parens = self.parens.saturating_sub(1);
                    self.emit_char(c);
                }
                '{' if self.parens == 0 => self.open_block()?,
                '}' if self.parens == 0 => self.close_block()?,
                ';' if self.parens == 0 => self.end_statement()?,
                c if is_word(c) => self.word(c)?,
                c => self.emit_char(c),
            }
        }
        self.flush();
        Ok(Scanned { pieces: self.pieces, variables: self.variables })
    }

    fn emit(&mut self, s: &str) {
        self.text.push_str(s);
        self.statement.push_str(s);
    }

    fn emit_char(&mut self, c: char) {
        self.text.push(c);
        self.statement.push(c);
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.pieces.push(Piece::Text(std::mem::take(&mut self.text)));
        }
    }

    fn reference(&mut self, name: String) {
        self.flush();
        self.pieces.push(Piece::Var(name));
        self.statement.push('@');
    }

    /// A quoted string including both quotes; `quote` is already consumed.
    fn string(&mut self, quote: char) -> Result<String, LessError> {
        let mut out = String::from(quote);
        while let Some(c) = self.chars.next() {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = self.chars.next() {
                    out.push(escaped);
                }
            } else if c == quote {
                return Ok(out);
            }
        }
        Err(LessError::Unterminated("string"))
    }

    fn block_comment(&mut self) -> Result<String, LessError> {
        self.chars.next();
        let mut out = String::from("/*");
        let mut star = false;
        for c in self.chars.by_ref() {
            out.push(c);
            if star && c == '/' {
                return Ok(out);
            }
            star = c == '*';
        }
        Err(LessError::Unterminated("comment"))
    }

    /// Skip to the end of the line, leaving the newline.
    fn line_comment(&mut self) {
        while self.chars.next_if(|c| *c != '\n').is_some() {}
    }

    fn take_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.chars.next_if(|c| is_word(*c)) {
            word.push(c);
        }
        word
    }

    /// Consume optional whitespace and `:` if both are next.
    fn take_colon(&mut self) -> bool {
        let mut look = self.chars.clone();
        while look.next_if(|c| c.is_whitespace()).is_some() {}
        if look.next_if_eq(&':').is_some() {
            self.chars = look;
            true
        } else {
            false
        }
    }

    fn at_sign(&mut self) -> Result<(), LessError> {
        match self.chars.peek() {
            Some('@') => {
                return Err(LessError::Unsupported("variable variables (@@name)".to_string()));
            }
            Some('{') => {
                self.chars.next();
                let name = self.take_word();
                if self.chars.next_if_eq(&'}').is_none() {
                    return Err(LessError::Unterminated("interpolation"));
                }
                self.reference(name);
                return Ok(());
            }
            _ => {}
        }

        let name = self.take_word();
        if name.is_empty() {
            self.emit_char('@');
        } else if self.value_mode || !self.statement.trim().is_empty() {
            self.reference(name);
        } else if !is_css_at_rule(&name) && self.take_colon() {
            self.declaration(name)?;
        } else if name == "plugin" {
            return Err(LessError::Unsupported("@plugin".to_string()));
        } else {
            self.emit_char('@');
            self.emit(&name);
        }
        Ok(())
    }

    /// The value of `@name:` up to its `;`. Only top-level declarations are
    /// lowered.
    fn declaration(&mut self, name: String) -> Result<(), LessError> {
        if self.depth > 0 {
            return Err(LessError::Unsupported(format!(
                "variable @{} declared inside a block",
                name
            )));
        }
        let mut value = String::new();
        let mut parens = 0usize;
        while let Some(c) = self.chars.next() {
            match c {
                '"' | '\'' => value.push_str(&self.string(c)?),
                '/' if self.chars.peek() == Some(&'*') => {
                    self.block_comment()?;
                }
                '(' => {
                    parens += 1;
                    value.push(c);
                }
                ')' => {
                    parens = parens.saturating_sub(1);
                    value.push(c);
                }
                '{' => {
                    return Err(LessError::Unsupported(format!("detached ruleset @{}", name)));
                }
                ';' if parens == 0 => break,
                c => value.push(c),
            }
        }
        self.variables.push((name, value.trim().to_string()));
        Ok(())
    }

    fn word(&mut self, first: char) -> Result<(), LessError> {
        let mut word = String::from(first);
        word.push_str(&self.take_word());

        if self.chars.peek() == Some(&'(') {
            let lower = word.to_ascii_lowercase();
            if lower == "url" {
                self.emit(&word);
                return self.raw_url();
            }
            if lower == "extend" && self.statement.ends_with(':') {
                return Err(LessError::Unsupported(":extend".to_string()));
            }
            let selector_name = self.statement.ends_with(['.', '#']);
            if !selector_name && LESS_FUNCTIONS.contains(&lower.as_str()) {
                return Err(LessError::Unsupported(format!("{}()", word)));
            }
        }
        self.emit(&word);
        Ok(())
    }

    /// `url(...)` verbatim, so `//` inside it is not a comment.
    fn raw_url(&mut self) -> Result<(), LessError> {
        let mut raw = String::new();
        let mut closed = false;
        for c in self.chars.by_ref() {
            raw.push(c);
            if c == ')' {
                closed = true;
                break;
            }
        }
        if !closed {
            return Err(LessError::Unterminated("url("));
        }
        self.emit(&raw);
        Ok(())
    }

    fn open_block(&mut self) -> Result<(), LessError> {
        if !self.value_mode {
            let prelude = self.statement.trim();
            if let Some(caps) = mixin_definition_regex().captures(prelude) {
                return Err(LessError::Unsupported(format!("mixin definition {}", &caps[1])));
            }
            if prelude.contains(" when ") {
                return Err(LessError::Unsupported(format!("guard on {}", prelude)));
            }
        }
        self.depth += 1;
        self.text.push('{');
        self.statement.clear();
        Ok(())
    }

    fn close_block(&mut self) -> Result<(), LessError> {
        self.check_mixin_call()?;
        self.depth = self.depth.saturating_sub(1);
        self.text.push('}');
        self.statement.clear();
        Ok(())
    }

    fn end_statement(&mut self) -> Result<(), LessError> {
        self.check_mixin_call()?;
        self.text.push(';');
        self.statement.clear();
        Ok(())
    }

    /// `.name;` or `#ns > .name();` where a declaration belongs.
    fn check_mixin_call(&self) -> Result<(), LessError> {
        let statement = self.statement.trim();
        if !self.value_mode && statement.starts_with(['.', '#']) {
            return Err(LessError::Unsupported(format!("mixin call {}", statement)));
        }
        Ok(())
    }
}

struct Resolver {
    variables: HashMap<String, String>,
    stack: Vec<String>,
}

impl Resolver {
    fn join(&mut self, pieces: Vec<Piece>) -> Result<String, LessError> {
        let mut out = String::new();
        for piece in pieces {
            match piece {
                Piece::Text(text) => out.push_str(&text),
                Piece::Var(name) => out.push_str(&self.value(&name)?),
            }
        }
        Ok(out)
    }

    fn value(&mut self, name: &str) -> Result<String, LessError> {
        if self.stack.iter().any(|seen| seen == name) {
            return Err(LessError::RecursiveVariable(name.to_string()));
        }
        let raw = self
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| LessError::UndefinedVariable(name.to_string()))?;

        self.stack.push(name.to_string());
        let scanned = Scanner::new(&raw, true).run()?;
        let value = self.join(scanned.pieces);
        self.stack.pop();
        value
    }
}
