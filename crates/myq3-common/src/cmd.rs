// cmd.rs — command line tokenization
//
// Reliable server commands arrive as plain text ("cs 3 \"...\"", "bcs1 ...",
// "disconnect reason"). They are split into argv tokens here before the
// client inspects them or hands them to the presentation module.

use crate::q_shared::{BIG_INFO_STRING, MAX_STRING_TOKENS};

/// A tokenized command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdArgs {
    argv: Vec<String>,
    cmd: String,
}

impl CmdArgs {
    /// Parse the given string into command line tokens.
    ///
    /// Whitespace separates tokens, double quotes group them, and `//` or
    /// `/* */` start comments. Newlines are ordinary whitespace.
    pub fn tokenize(text: &str) -> Self {
        let mut text = text;
        if text.len() >= BIG_INFO_STRING {
            let mut end = BIG_INFO_STRING - 1;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text = &text[..end];
        }

        let mut args = CmdArgs {
            argv: Vec::new(),
            cmd: text.to_string(),
        };

        let bytes = text.as_bytes();
        let mut pos = 0;

        loop {
            if args.argv.len() == MAX_STRING_TOKENS {
                return args; // this is usually something malicious
            }

            // Skip whitespace and comments
            loop {
                while pos < bytes.len() && bytes[pos] <= b' ' {
                    pos += 1;
                }
                if pos >= bytes.len() {
                    return args;
                }
                if bytes[pos] == b'/' && bytes.get(pos + 1) == Some(&b'/') {
                    return args; // rest of the line is a comment
                }
                if bytes[pos] == b'/' && bytes.get(pos + 1) == Some(&b'*') {
                    pos += 2;
                    while pos < bytes.len()
                        && !(bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b'/'))
                    {
                        pos += 1;
                    }
                    if pos >= bytes.len() {
                        return args;
                    }
                    pos += 2;
                    continue;
                }
                break;
            }

            // Handle quoted strings
            if bytes[pos] == b'"' {
                pos += 1;
                let start = pos;
                while pos < bytes.len() && bytes[pos] != b'"' {
                    pos += 1;
                }
                args.argv.push(String::from_utf8_lossy(&bytes[start..pos]).into_owned());
                if pos >= bytes.len() {
                    return args;
                }
                pos += 1; // skip closing quote
                continue;
            }

            // Regular token, stops at whitespace, a quote or a comment
            let start = pos;
            while pos < bytes.len() && bytes[pos] > b' ' {
                if bytes[pos] == b'"' {
                    break;
                }
                if bytes[pos] == b'/'
                    && matches!(bytes.get(pos + 1), Some(&b'/') | Some(&b'*'))
                {
                    break;
                }
                pos += 1;
            }
            args.argv.push(String::from_utf8_lossy(&bytes[start..pos]).into_owned());
        }
    }

    /// Get the number of arguments.
    pub fn argc(&self) -> usize {
        self.argv.len()
    }

    /// Get argument by index. Returns empty string if out of range.
    pub fn argv(&self, arg: usize) -> &str {
        self.argv.get(arg).map_or("", |s| s.as_str())
    }

    /// All arguments after the first, joined by single spaces.
    pub fn args(&self) -> String {
        self.args_from(1)
    }

    /// Arguments from `arg` onward, joined by single spaces.
    pub fn args_from(&self, arg: usize) -> String {
        if arg >= self.argv.len() {
            return String::new();
        }
        self.argv[arg..].join(" ")
    }

    /// The text this command was tokenized from.
    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

// ============================================================
// Tests
// ============================================================
