use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::Result;

/// Unified input reader that handles both file and pipe input with buffered reading
///
/// Bytes inspected with [`peek`](InputReader::peek) are replayed by the
/// next read, so format detection works on pipes too.
pub struct InputReader {
    reader: Box<dyn Read>,
    peeked: Vec<u8>,
}

impl InputReader {
    /// Create a new InputReader from a path
    /// Use "-" for stdin pipe input
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let reader: Box<dyn Read> = if input_path.as_ref().to_string_lossy() == "-" {
            Box::new(io::stdin().lock())
        } else {
            let file = File::open(input_path)?;
            Box::new(BufReader::new(file))
        };

        Ok(Self {
            reader,
            peeked: Vec::new(),
        })
    }

    #[cfg(test)]
    pub fn from_reader(reader: impl Read + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            peeked: Vec::new(),
        }
    }

    /// Returns up to `len` bytes from the start of the input without
    /// consuming them. Fewer bytes are returned at end of input.
    pub fn peek(&mut self, len: usize) -> Result<&[u8]> {
        while self.peeked.len() < len {
            let mut buffer = vec![0u8; len - self.peeked.len()];
            let bytes_read = self.reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            self.peeked.extend_from_slice(&buffer[..bytes_read]);
        }

        Ok(&self.peeked[..self.peeked.len().min(len)])
    }

    /// Read a chunk of data into the provided buffer
    /// Returns the number of bytes read, 0 indicates EOF
    pub fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize> {
        if !self.peeked.is_empty() {
            let len = self.peeked.len().min(buffer.len());
            buffer[..len].copy_from_slice(&self.peeked[..len]);
            self.peeked.drain(..len);
            return Ok(len);
        }

        let bytes_read = self.reader.read(buffer)?;
        Ok(bytes_read)
    }

    /// Process data in chunks using a callback function
    /// The callback receives each chunk and should return Ok(true) to continue or Ok(false) to stop
    pub fn process_chunks<F>(&mut self, chunk_size: usize, mut callback: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<bool>,
    {
        let mut buffer = vec![0u8; chunk_size];

        loop {
            let bytes_read = self.read_chunk(&mut buffer)?;
            if bytes_read == 0 {
                break; // EOF
            }

            if !callback(&buffer[..bytes_read])? {
                break; // Callback requested stop
            }
        }

        Ok(())
    }
}

#[test]
fn peeked_bytes_are_replayed() -> Result<()> {
    let data = (0u8..=255).collect::<Vec<_>>();
    let mut reader = InputReader::from_reader(io::Cursor::new(data.clone()));

    assert_eq!(reader.peek(4)?, &[0, 1, 2, 3]);
    assert_eq!(reader.peek(2)?, &[0, 1]);

    let mut collected = Vec::new();
    reader.process_chunks(100, |chunk| {
        collected.extend_from_slice(chunk);
        Ok(true)
    })?;
    assert_eq!(collected, data);

    let mut short = InputReader::from_reader(io::Cursor::new(vec![7u8; 3]));
    assert_eq!(short.peek(10)?.len(), 3);
    Ok(())
}
