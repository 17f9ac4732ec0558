pub mod metadata;
pub mod pcm_writer;
