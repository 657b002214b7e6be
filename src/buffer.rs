use crate::error::{ServerError, ServerResult};
use std::io::{self, Read};

/// Input collected from a connection until it holds a whole request
pub struct Buffer {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl Buffer {
    /// Create a new buffer with the specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Read data from a reader into the buffer
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        // Ensure we have space
        self.ensure_capacity(1024);

        let bytes_read = reader.read(&mut self.data[self.write_pos..])?;
        self.write_pos += bytes_read;

        Ok(bytes_read)
    }

    /// Ensure the buffer has at least the specified additional capacity
    pub fn ensure_capacity(&mut self, additional: usize) {
        if self.remaining_capacity() >= additional {
            return;
        }

        // Move unread data to the front first
        if self.read_pos > 0 {
            self.data.copy_within(self.read_pos..self.write_pos, 0);
            self.write_pos -= self.read_pos;
            self.read_pos = 0;
        }

        if self.remaining_capacity() < additional {
            let new_capacity = (self.data.len() + additional).max(self.data.len() * 2);
            self.data.resize(new_capacity, 0);
        }
    }

    /// Reset the buffer, clearing all data
    pub fn reset(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Get the amount of data available to read
    pub fn available_data(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Get the remaining capacity in the buffer
    pub fn remaining_capacity(&self) -> usize {
        self.data.len() - self.write_pos
    }

    /// Append a slice of data
    pub fn write(&mut self, data: &[u8]) -> usize {
        self.ensure_capacity(data.len());
        self.data[self.write_pos..self.write_pos + data.len()].copy_from_slice(data);
        self.write_pos += data.len();
        data.len()
    }

    /// Get a slice of the unread data
    pub fn slice(&self) -> &[u8] {
        &self.data[self.read_pos..self.write_pos]
    }

    /// Get the total capacity of the buffer
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Drop the first `amount` bytes of unread data
    pub fn consume(&mut self, amount: usize) -> ServerResult<()> {
        let available = self.available_data();
        if amount > available {
            return Err(ServerError::Buffer(format!(
                "cannot consume {} bytes, only {} available",
                amount, available
            )));
        }

        self.read_pos += amount;

        // If we've read everything, reset positions
        if self.read_pos == self.write_pos {
            self.reset();
        }

        Ok(())
    }
}
