use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::error::RelayError;

pub const DELIMITER: char = ',';

/// Split one line on the delimiter. No trimming and no quote handling:
/// values keep their whitespace, and a delimiter inside quoted text
/// still splits. That is the format we ingest, not an oversight.
pub fn split_line(line: &str) -> Vec<String> {
    line.split(DELIMITER).map(str::to_string).collect()
}

/// Ordered field names from the first line of a stream. Names are used
/// positionally; uniqueness is not enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    names: Vec<String>,
}

impl Header {
    pub fn parse(line: &str) -> Self {
        Header {
            names: split_line(line),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One line's raw values, in line order.
pub type Row = Vec<String>;

/// Line-oriented view over an input stream: one header line, then one
/// row per remaining line, read lazily.
pub struct CsvStream<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> CsvStream<R> {
    pub fn new(reader: R) -> Self {
        CsvStream {
            lines: reader.lines(),
        }
    }

    /// Read the header from the first line. Fails with `EmptyStream` if
    /// the input ends before a first line is available.
    pub async fn read_header(&mut self) -> Result<Header, RelayError> {
        match self.lines.next_line().await? {
            Some(line) => Ok(Header::parse(&line)),
            None => Err(RelayError::EmptyStream),
        }
    }

    /// Next data row, or `None` at end of input. Line terminators (`\n`
    /// or `\r\n`) are stripped; a blank line yields a row holding one
    /// empty value, and a trailing terminator on the last line does not
    /// yield an extra row.
    ///
    /// Invalid UTF-8 surfaces as a read error and fails the stream.
    pub async fn next_row(&mut self) -> Result<Option<Row>, RelayError> {
        Ok(self.lines.next_line().await?.map(|line| split_line(&line)))
    }
}
