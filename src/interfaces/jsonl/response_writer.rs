use super::command::Response;
use crate::error::InputError;
use std::io::Write;

/// Writes one JSON object per line for each response.
pub struct ResponseWriter<W: Write> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_response(&mut self, response: &Response) -> Result<(), InputError> {
        serde_json::to_writer(&mut self.writer, response).map_err(std::io::Error::from)?;
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), InputError> {
        self.writer.flush()?;
        Ok(())
    }
}
