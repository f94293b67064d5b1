//! Syntax highlighting for fenced code blocks.
//!
//! A deliberately small lexer: it recognises comments, strings, numbers,
//! keywords and literals for a handful of languages and wraps them in
//! highlight.js-compatible spans, so any hljs theme styles the output:
//!
//! ```html
//! <pre><code class="hljs language-rust"><span class="hljs-keyword">fn</span> main() {}</code></pre>
//! ```
//!
//! Unknown languages still get the `hljs` wrapper with escaped, unannotated
//! text. [`detect_language`] scores unlabelled blocks against the keyword
//! tables and picks a language only on a clear signal.

use maud::{Markup, PreEscaped, html};

struct Language {
    name: &'static str,
    aliases: &'static [&'static str],
    keywords: &'static [&'static str],
    literals: &'static [&'static str],
    line_comment: Option<&'static str>,
    block_comment: Option<(&'static str, &'static str)>,
    quotes: &'static [char],
    /// Substrings that strongly suggest this language during detection.
    markers: &'static [&'static str],
}

const JS_KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "default",
    "delete", "do", "else", "export", "extends", "finally", "for", "from", "function", "if",
    "import", "in", "instanceof", "let", "new", "of", "return", "static", "switch", "this",
    "throw", "try", "typeof", "var", "void", "while", "yield",
];

const TS_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "break", "case", "catch", "class", "const", "continue",
    "declare", "default", "else", "enum", "export", "extends", "finally", "for", "from",
    "function", "if", "implements", "import", "in", "interface", "keyof", "let", "namespace",
    "new", "of", "private", "protected", "public", "readonly", "return", "static", "switch",
    "this", "throw", "try", "type", "typeof", "var", "while",
];

const JS_LITERALS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity"];

const LANGUAGES: &[Language] = &[
    Language {
        name: "rust",
        aliases: &["rs"],
        keywords: &[
            "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
            "extern", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
            "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
            "type", "unsafe", "use", "where", "while",
        ],
        literals: &["true", "false", "None", "Some", "Ok", "Err"],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        quotes: &['"'],
        markers: &["fn ", "let mut ", "impl ", "::", "pub fn", "&mut ", "#[derive"],
    },
    Language {
        name: "typescript",
        aliases: &["ts", "tsx"],
        keywords: TS_KEYWORDS,
        literals: JS_LITERALS,
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        quotes: &['"', '\'', '`'],
        markers: &["interface ", ": string", ": number", ": boolean", "type ", " as "],
    },
    Language {
        name: "javascript",
        aliases: &["js", "jsx", "mjs", "cjs"],
        keywords: JS_KEYWORDS,
        literals: JS_LITERALS,
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        quotes: &['"', '\'', '`'],
        markers: &["=>", "const ", "console.", "function ", "require(", "===", "document."],
    },
    Language {
        name: "python",
        aliases: &["py"],
        keywords: &[
            "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
            "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in",
            "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
            "with", "yield",
        ],
        literals: &["True", "False", "None"],
        line_comment: Some("#"),
        block_comment: None,
        quotes: &['"', '\''],
        markers: &["def ", "elif ", "self.", "__init__", "import ", "print("],
    },
    Language {
        name: "bash",
        aliases: &["sh", "shell", "zsh", "console"],
        keywords: &[
            "if", "then", "else", "elif", "fi", "for", "while", "in", "do", "done", "case",
            "esac", "function", "return", "export", "local", "echo", "cd", "sudo",
        ],
        literals: &["true", "false"],
        line_comment: Some("#"),
        block_comment: None,
        quotes: &['"', '\''],
        markers: &["#!/bin/", "$ ", "npm ", "cargo ", "echo ", " | ", "&& "],
    },
    Language {
        name: "json",
        aliases: &["jsonc"],
        keywords: &[],
        literals: &["true", "false", "null"],
        line_comment: None,
        block_comment: None,
        quotes: &['"'],
        markers: &["\": "],
    },
];

fn find_language(name: &str) -> Option<&'static Language> {
    let name = name.trim().to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|l| l.name == name || l.aliases.contains(&name.as_str()))
}

/// Canonical name for a language tag, if it is one we can highlight.
pub fn canonical_name(name: &str) -> Option<&'static str> {
    find_language(name).map(|l| l.name)
}

/// Guess the language of an unlabelled code block.
pub fn detect_language(code: &str) -> Option<&'static str> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return None;
    }
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return Some("json");
    }

    let words: Vec<&str> = trimmed
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .collect();

    LANGUAGES
        .iter()
        .filter(|l| l.name != "json")
        .map(|l| {
            let markers = l.markers.iter().filter(|m| trimmed.contains(*m)).count() * 3;
            let keywords = words.iter().filter(|w| l.keywords.contains(w)).count();
            (markers + keywords, l.name)
        })
        .filter(|(score, _)| *score >= 4)
        // Ties go to the earlier table entry.
        .fold(None, |best: Option<(usize, &'static str)>, candidate| match best {
            Some(b) if b.0 >= candidate.0 => Some(b),
            _ => Some(candidate),
        })
        .map(|(_, name)| name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Plain,
    Comment,
    String,
    Number,
    Keyword,
    Literal,
}

impl Kind {
    fn class(self) -> Option<&'static str> {
        match self {
            Kind::Plain => None,
            Kind::Comment => Some("hljs-comment"),
            Kind::String => Some("hljs-string"),
            Kind::Number => Some("hljs-number"),
            Kind::Keyword => Some("hljs-keyword"),
            Kind::Literal => Some("hljs-literal"),
        }
    }
}

fn tokenize<'a>(code: &'a str, lang: &Language) -> Vec<(Kind, &'a str)> {
    let mut spans: Vec<(Kind, usize, usize)> = Vec::new();
    let mut push = |kind: Kind, start: usize, end: usize| {
        if start >= end {
            return;
        }
        // Merge adjacent plain text so the output stays compact.
        if kind == Kind::Plain
            && let Some((Kind::Plain, _, prev_end)) = spans.last_mut()
            && *prev_end == start
        {
            *prev_end = end;
            return;
        }
        spans.push((kind, start, end));
    };

    let mut i = 0;
    while i < code.len() {
        let rest = &code[i..];
        let Some(c) = rest.chars().next() else { break };

        if let Some(marker) = lang.line_comment
            && rest.starts_with(marker)
        {
            let end = rest.find('\n').map_or(code.len(), |n| i + n);
            push(Kind::Comment, i, end);
            i = end;
        } else if let Some((open, close)) = lang.block_comment
            && rest.starts_with(open)
        {
            let end = rest[open.len()..]
                .find(close)
                .map_or(code.len(), |n| i + open.len() + n + close.len());
            push(Kind::Comment, i, end);
            i = end;
        } else if lang.quotes.contains(&c) {
            let end = string_end(code, i, c);
            push(Kind::String, i, end);
            i = end;
        } else if c.is_ascii_digit() {
            let end = i + rest
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '_'))
                .unwrap_or(rest.len());
            push(Kind::Number, i, end);
            i = end;
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let len = rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
                .unwrap_or(rest.len());
            let word = &rest[..len];
            let kind = if lang.keywords.contains(&word) {
                Kind::Keyword
            } else if lang.literals.contains(&word) {
                Kind::Literal
            } else {
                Kind::Plain
            };
            push(kind, i, i + len);
            i += len;
        } else {
            push(Kind::Plain, i, i + c.len_utf8());
            i += c.len_utf8();
        }
    }

    spans
        .into_iter()
        .map(|(kind, start, end)| (kind, &code[start..end]))
        .collect()
}

/// End offset (exclusive) of a string literal opened by `quote` at `start`.
fn string_end(code: &str, start: usize, quote: char) -> usize {
    let mut escaped = false;
    for (offset, ch) in code[start + quote.len_utf8()..].char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return start + quote.len_utf8() + offset + ch.len_utf8();
        } else if ch == '\n' && quote != '`' {
            return start + quote.len_utf8() + offset;
        }
    }
    code.len()
}

/// Render `code` as a highlighted `<pre><code>` block.
///
/// `language` is the (canonical or alias) language tag, if any. With
/// `annotate` off, the block is wrapped but not tokenised.
pub fn render_block(code: &str, language: Option<&str>, annotate: bool) -> Markup {
    let lang = language.and_then(find_language);
    let class = match (lang, language) {
        (Some(l), _) => format!("hljs language-{}", l.name),
        (None, Some(tag)) if !tag.is_empty() => format!("hljs language-{tag}"),
        _ => "hljs".to_string(),
    };

    let tokens = match lang {
        Some(l) if annotate => tokenize(code, l),
        _ => vec![(Kind::Plain, code)],
    };

    html! {
        pre {
            code class=(class) {
                @for (kind, text) in &tokens {
                    @if let Some(cls) = kind.class() {
                        span class=(cls) { (text) }
                    } @else {
                        (text)
                    }
                }
            }
        }
    }
}

/// Escaped HTML for a block, as a string.
pub fn render_block_html(code: &str, language: Option<&str>, annotate: bool) -> String {
    let PreEscaped(html) = render_block(code, language, annotate);
    html
}
