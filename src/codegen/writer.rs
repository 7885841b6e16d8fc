//! Line-oriented source writer

/// Accumulates indented lines of generated source
#[derive(Debug, Clone)]
pub struct CodeWriter {
    unit: String,
    level: usize,
    lines: Vec<String>,
}

impl CodeWriter {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            level: 0,
            lines: Vec::new(),
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", self.unit.repeat(self.level), text.as_ref()));
    }

    /// Empty line; never indented
    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Join lines with a trailing newline
    pub fn build(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation() {
        let mut out = CodeWriter::new("  ");
        out.line("class A:");
        out.indent();
        out.line("pass");
        out.dedent();
        out.dedent();
        out.blank();
        out.line("x = 1");
        assert_eq!(out.build(), "class A:\n  pass\n\nx = 1\n");
    }
}
