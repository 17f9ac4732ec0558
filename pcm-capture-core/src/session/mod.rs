pub mod deferred_stop;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_support;
