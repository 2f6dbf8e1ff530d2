//! Blocks of awk statements and the programs built from them.

use itertools::Itertools;

use crate::Snippets;

/// How blocks are indented and separated when rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub indent: usize,
    pub newline: &'static str,
}

impl Layout {
    /// Everything on one line.
    pub fn compact() -> Self {
        Self {
            indent: 0,
            newline: "",
        }
    }

    /// One statement per line, nested blocks indented by `indent` spaces.
    pub fn pretty(indent: usize) -> Self {
        Self {
            indent,
            newline: "\n",
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::compact()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    /// A single statement. A terminating `;` is added when rendered.
    Line(String),
    /// A nested block in braces.
    Block(Block),
    /// A header such as `if(cond)` followed by a braced block.
    Head(String, Block),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    items: Vec<Item>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: impl Into<Item>) {
        self.items.push(item.into())
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.items.push(Item::Line(line.into()))
    }

    pub fn head(&mut self, header: impl Into<String>, block: Block) {
        self.items.push(Item::Head(header.into(), block))
    }

    pub fn extend(&mut self, other: Block) {
        self.items.extend(other.items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn render(&self, layout: &Layout) -> String {
        self.render_at(layout, 0)
    }

    /// Render the block within braces.
    pub fn render_braced(&self, layout: &Layout) -> String {
        render_braced_at(self, layout, 0)
    }

    fn render_at(&self, layout: &Layout, level: usize) -> String {
        self.items
            .iter()
            .filter_map(|item| item.render_at(layout, level))
            .join(layout.newline)
    }
}

fn render_braced_at(block: &Block, layout: &Layout, level: usize) -> String {
    let indent = " ".repeat(layout.indent * level);
    let newline = layout.newline;
    let inner = block.render_at(layout, level + 1);
    if inner.is_empty() {
        format!("{indent}{{{newline}{indent}}}")
    } else {
        format!("{indent}{{{newline}{inner}{newline}{indent}}}")
    }
}

impl Item {
    fn render_at(&self, layout: &Layout, level: usize) -> Option<String> {
        let indent = " ".repeat(layout.indent * level);
        match self {
            Item::Line(line) if line.is_empty() => None,
            Item::Line(line) if line.ends_with(';') => Some(format!("{indent}{line}")),
            Item::Line(line) => Some(format!("{indent}{line};")),
            Item::Block(block) => Some(render_braced_at(block, layout, level)),
            Item::Head(header, block) => Some(format!(
                "{indent}{header}{}{}",
                layout.newline,
                render_braced_at(block, layout, level)
            )),
        }
    }
}

impl From<String> for Item {
    fn from(line: String) -> Self {
        Item::Line(line)
    }
}

impl From<&str> for Item {
    fn from(line: &str) -> Self {
        Item::Line(line.to_owned())
    }
}

impl From<Block> for Item {
    fn from(block: Block) -> Self {
        Item::Block(block)
    }
}

impl<T: Into<Item>> FromIterator<T> for Block {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A complete awk program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub snippets: Snippets,
    pub begin: Block,
    pub main: Block,
    pub end: Block,
}

impl Program {
    /// Render the program: the snippets it requires, then the `BEGIN`, main
    /// and `END` blocks. Empty `BEGIN` and `END` blocks are omitted.
    pub fn render(&self, layout: &Layout) -> String {
        let mut program = String::new();
        for snippet in self.snippets.iter() {
            program.push_str(snippet.source());
            program.push('\n');
        }
        if !self.begin.is_empty() {
            program.push_str("BEGIN");
            program.push_str(&self.begin.render_braced(layout));
            program.push_str(layout.newline);
        }
        program.push_str(&self.main.render_braced(layout));
        program.push_str(layout.newline);
        if !self.end.is_empty() {
            program.push_str("END");
            program.push_str(&self.end.render_braced(layout));
            program.push_str(layout.newline);
        }
        program
    }

    /// A shell command running the compact program over tab separated
    /// input.
    pub fn command_line(&self, awk: &str, args: &str) -> String {
        let program = self.render(&Layout::compact()).replace('\'', "'\\''");
        format!("LC_ALL=C {awk} {args} -F $'\\t' '{program}'")
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(&Layout::compact()))
    }
}
