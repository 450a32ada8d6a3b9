pub mod orchestrator;
pub mod poller;
pub mod reporter;
pub mod transfer;
pub mod upload_task;

#[cfg(test)]
pub(crate) mod test_support;
