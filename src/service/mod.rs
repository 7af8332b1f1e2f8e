pub mod log_stream;
pub mod mapper;
pub mod stream_writer;

#[cfg(test)]
pub(crate) mod testing;
