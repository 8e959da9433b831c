use std::fmt::Display;

const INDENT: &str = "  ";
const BULLET: &str = "•";

/// Prints nested bullet point lists, one item per line.
pub struct BulletPointPrinter<W: LineWriter + Clone> {
    writer: W,
    item_prefix: String,
}

impl<W: LineWriter + Clone> BulletPointPrinter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            item_prefix: format!("{BULLET} "),
        }
    }

    /// Unindented line without a bullet, e.g. the title of the list
    pub fn print_heading(&self, heading: impl Display) {
        self.writer.write_line(&heading.to_string());
    }

    pub fn print_item(&self, item: impl Display) {
        self.writer.write_line(&format!("{}{item}", self.item_prefix));
    }

    /// Printer for the sub items of the item printed last
    pub fn indent(&self) -> Self {
        Self {
            writer: self.writer.clone(),
            item_prefix: format!("{INDENT}{}", self.item_prefix),
        }
    }
}

impl BulletPointPrinter<StdoutLineWriter> {
    pub fn new_stdout() -> Self {
        Self::new(StdoutLineWriter)
    }
}

/// Destination of printed lines
pub trait LineWriter {
    fn write_line(&self, line: &str);
}

#[derive(Clone, Copy)]
pub struct StdoutLineWriter;

impl LineWriter for StdoutLineWriter {
    fn write_line(&self, line: &str) {
        println!("{line}");
    }
}

#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct RecordingLineWriter {
    lines: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
}

#[cfg(test)]
impl RecordingLineWriter {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

#[cfg(test)]
impl LineWriter for RecordingLineWriter {
    fn write_line(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}
