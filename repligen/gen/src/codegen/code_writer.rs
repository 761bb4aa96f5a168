//! Indentation-tracking text builder for C++ and schema output.
//!
//! Generated C++ uses Allman braces and tabs like the engine sources it sits
//! next to; schema files use two spaces. Both are written through
//! [`CodeWriter`], which owns its buffer so emission can never fail.
//!
//! ```
//! use repligen_gen::codegen::CodeWriter;
//!
//! let mut w = CodeWriter::cpp();
//! w.block("void Tick()", |w| {
//!     w.line("Count++;");
//! });
//!
//! assert_eq!(w.finish(), "void Tick()\n{\n\tCount++;\n}\n");
//! ```

use std::cell::Cell;
use std::rc::Rc;

/// A string builder that indents every line it writes.
pub struct CodeWriter {
    out: String,
    indent_level: Rc<Cell<usize>>,
    indent_string: &'static str,
}

impl CodeWriter {
    /// Creates a writer with the given indent unit.
    pub fn new(indent_string: &'static str) -> Self {
        Self {
            out: String::new(),
            indent_level: Rc::new(Cell::new(0)),
            indent_string,
        }
    }

    /// Creates a writer for C++ code (tab indentation).
    pub fn cpp() -> Self {
        Self::new("\t")
    }

    /// Creates a writer for schema files (two-space indentation).
    pub fn proto() -> Self {
        Self::new("  ")
    }

    /// Writes one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent_level.get() {
                self.out.push_str(self.indent_string);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    /// Writes an empty line.
    pub fn blank_line(&mut self) {
        self.out.push('\n');
    }

    /// Writes every line of a pre-rendered fragment at the current indentation.
    ///
    /// Blank lines inside the fragment are dropped so nested fragments stay
    /// compact.
    pub fn fragment(&mut self, text: &str) {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.line(line);
        }
    }

    /// Increases indentation while the returned guard is alive.
    pub fn indent(&mut self) -> IndentGuard {
        self.indent_level.set(self.indent_level.get() + 1);
        IndentGuard {
            indent_level: Rc::clone(&self.indent_level),
        }
    }

    /// Writes `header`, then the body between braces on their own lines.
    pub fn block<F>(&mut self, header: &str, body: F)
    where
        F: FnOnce(&mut Self),
    {
        self.block_with_tail(header, "}", body);
    }

    /// Like [`block`](Self::block) but closes with `tail` (e.g. `};`).
    pub fn block_with_tail<F>(&mut self, header: &str, tail: &str, body: F)
    where
        F: FnOnce(&mut Self),
    {
        if !header.is_empty() {
            self.line(header);
        }
        self.line("{");
        {
            let _indent = self.indent();
            body(self);
        }
        self.line(tail);
    }

    /// Writes a schema-style block: `header {` ... `}`.
    pub fn braced<F>(&mut self, header: &str, body: F)
    where
        F: FnOnce(&mut Self),
    {
        self.line(format!("{header} {{"));
        {
            let _indent = self.indent();
            body(self);
        }
        self.line("}");
    }

    /// Returns the current indentation level.
    pub fn indent_level(&self) -> usize {
        self.indent_level.get()
    }

    /// Consumes the writer and returns the text.
    pub fn finish(self) -> String {
        self.out
    }
}

/// Restores the previous indentation level on drop.
pub struct IndentGuard {
    indent_level: Rc<Cell<usize>>,
}

impl Drop for IndentGuard {
    fn drop(&mut self) {
        let current = self.indent_level.get();
        self.indent_level.set(current.saturating_sub(1));
    }
}

/// Writes a formatted line to a [`CodeWriter`].
#[macro_export]
macro_rules! cw_line {
    ($writer:expr, $($arg:tt)*) => {
        $writer.line(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks_indent_with_tabs() {
        let mut w = CodeWriter::cpp();
        w.block_with_tail("class FFoo", "};", |w| {
            w.line("public:");
            w.block("void Bar()", |w| w.line("return;"));
        });

        assert_eq!(
            w.finish(),
            "class FFoo\n{\n\tpublic:\n\tvoid Bar()\n\t{\n\t\treturn;\n\t}\n};\n"
        );
    }

    #[test]
    fn fragment_is_reindented_and_compacted() {
        let mut w = CodeWriter::cpp();
        {
            let _indent = w.indent();
            w.fragment("if (X)\n{\n\n\tY();\n}\n");
        }

        assert_eq!(w.finish(), "\tif (X)\n\t{\n\t\tY();\n\t}\n");
    }

    #[test]
    fn braced_uses_schema_style() {
        let mut w = CodeWriter::proto();
        w.braced("message DoorState", |w| w.line("optional bool b_open = 1;"));

        assert_eq!(w.finish(), "message DoorState {\n  optional bool b_open = 1;\n}\n");
    }

    #[test]
    fn empty_line_has_no_trailing_indent() {
        let mut w = CodeWriter::cpp();
        let _indent = w.indent();
        w.line("");
        w.blank_line();

        assert_eq!(w.indent_level(), 1);
        assert_eq!(w.finish(), "\n\n");
    }

    #[test]
    fn cw_line_formats() {
        let mut w = CodeWriter::proto();
        let name = "door";
        cw_line!(w, "{}states = {};", name, 1);

        assert_eq!(w.finish(), "doorstates = 1;\n");
    }
}
