pub mod command;
pub mod command_reader;
pub mod response_writer;

pub use command::{Command, Response};
pub use command_reader::CommandReader;
pub use response_writer::ResponseWriter;
