pub mod buffer_sizer;
pub mod ring_buffer;
