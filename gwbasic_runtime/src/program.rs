//! Tokenized program storage.
//!
//! Lines are numbered `1..=65534` and held in execution order; `0` means "no
//! current line" and `0xFFFF` is reserved as the interpreter's termination
//! sentinel. The interpreter loop consumes programs only through the
//! [`ProgramStore`] trait, so hosts can substitute their own storage.
//!
//! # Image format
//!
//! `save`/`load` exchange a small binary image:
//!
//! ```text
//! +------------------+
//! | Magic (4 bytes)  |  "GWBP"
//! +------------------+
//! | Body             |  bincode: version + (line, tokens) pairs
//! +------------------+
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BasicError, BasicResult};

/// Magic bytes identifying a program image file.
pub const MAGIC: &[u8; 4] = b"GWBP";

/// Current image format version.
pub const VERSION: u16 = 1;

/// Largest valid program line number.
pub const MAX_LINE: u16 = 65534;

/// Contract the interpreter loop consumes. Line 0 is "none".
pub trait ProgramStore {
    /// Lowest line number, 0 when the program is empty.
    fn first_line(&self) -> u16;

    fn has_line(&self, number: u16) -> bool;

    /// Token bytes of a line.
    fn line_tokens(&self, number: u16) -> Option<&[u8]>;

    /// Next line in ascending order after `number`, 0 when none.
    fn next_line(&self, number: u16) -> u16;

    fn set_current_line(&mut self, number: u16);

    fn current_line(&self) -> u16;
}

#[derive(Debug, Serialize, Deserialize)]
struct ProgramImage {
    version: u16,
    lines: Vec<(u16, Vec<u8>)>,
}

/// Ordered line-number → token-stream map.
#[derive(Debug, Default, Clone)]
pub struct Program {
    lines: BTreeMap<u16, Vec<u8>>,
    current: u16,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a line.
    pub fn insert_line(&mut self, number: u16, tokens: Vec<u8>) -> BasicResult<()> {
        if number == 0 || number > MAX_LINE {
            return Err(BasicError::IllegalFunctionCall);
        }
        self.lines.insert(number, tokens);
        Ok(())
    }

    pub fn remove_line(&mut self, number: u16) -> bool {
        self.lines.remove(&number).is_some()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.current = 0;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines in ascending order, for LIST.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &[u8])> {
        self.lines.iter().map(|(&n, t)| (n, t.as_slice()))
    }

    /// Write the program image to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> BasicResult<()> {
        let image = ProgramImage {
            version: VERSION,
            lines: self.lines.iter().map(|(&n, t)| (n, t.clone())).collect(),
        };
        let body = bincode::serialize(&image)
            .map_err(|e| BasicError::internal(format!("serialize program: {}", e)))?;
        let mut file = File::create(path)
            .map_err(|e| BasicError::internal(format!("create program file: {}", e)))?;
        file.write_all(MAGIC)
            .and_then(|_| file.write_all(&body))
            .map_err(|e| BasicError::internal(format!("write program file: {}", e)))
    }

    /// Load a program image from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> BasicResult<Program> {
        let mut file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BasicError::FileNotFound,
            _ => BasicError::internal(format!("open program file: {}", e)),
        })?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| BasicError::internal(format!("read program file: {}", e)))?;
        if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
            return Err(BasicError::internal("not a program image".to_string()));
        }
        let image: ProgramImage = bincode::deserialize(&data[MAGIC.len()..])
            .map_err(|e| BasicError::internal(format!("decode program image: {}", e)))?;
        if image.version != VERSION {
            return Err(BasicError::internal(format!(
                "unsupported program image version {}",
                image.version
            )));
        }
        let mut program = Program::new();
        for (number, tokens) in image.lines {
            program.insert_line(number, tokens)?;
        }
        Ok(program)
    }
}

impl ProgramStore for Program {
    fn first_line(&self) -> u16 {
        self.lines.keys().next().copied().unwrap_or(0)
    }

    fn has_line(&self, number: u16) -> bool {
        self.lines.contains_key(&number)
    }

    fn line_tokens(&self, number: u16) -> Option<&[u8]> {
        self.lines.get(&number).map(|t| t.as_slice())
    }

    fn next_line(&self, number: u16) -> u16 {
        self.lines
            .range(number.saturating_add(1)..)
            .next()
            .map(|(&n, _)| n)
            .unwrap_or(0)
    }

    fn set_current_line(&mut self, number: u16) {
        self.current = number;
    }

    fn current_line(&self) -> u16 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_kept_in_order() {
        let mut program = Program::new();
        program.insert_line(30, vec![3, 0]).unwrap();
        program.insert_line(10, vec![1, 0]).unwrap();
        program.insert_line(20, vec![2, 0]).unwrap();
        assert_eq!(program.first_line(), 10);
        assert_eq!(program.next_line(10), 20);
        assert_eq!(program.next_line(20), 30);
        assert_eq!(program.next_line(30), 0);
    }

    #[test]
    fn test_insert_replaces_line() {
        let mut program = Program::new();
        program.insert_line(10, vec![1, 0]).unwrap();
        program.insert_line(10, vec![9, 0]).unwrap();
        assert_eq!(program.line_tokens(10), Some(&[9u8, 0][..]));
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn test_line_number_bounds() {
        let mut program = Program::new();
        assert!(program.insert_line(0, vec![0]).is_err());
        assert!(program.insert_line(65535, vec![0]).is_err());
        assert!(program.insert_line(65534, vec![0]).is_ok());
    }

    #[test]
    fn test_remove_line() {
        let mut program = Program::new();
        program.insert_line(10, vec![0]).unwrap();
        assert!(program.remove_line(10));
        assert!(!program.remove_line(10));
        assert_eq!(program.first_line(), 0);
    }

    #[test]
    fn test_load_missing_file_is_file_not_found() {
        let err = Program::load("/nonexistent/path/prog.gwbp").unwrap_err();
        assert_eq!(err, BasicError::FileNotFound);
    }
}
