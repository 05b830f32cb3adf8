use crate::context::{FailurePolicy, ProcessContext};
use crate::process::ProcessRef;

/// creates the worker process the manager registers for a new id
pub trait ProcessFactory: Send + Sync {
    fn create(&self, context: &ProcessContext, policy: FailurePolicy) -> ProcessRef;
}

impl<F> ProcessFactory for F
where
    F: Fn(&ProcessContext, FailurePolicy) -> ProcessRef + Send + Sync,
{
    fn create(&self, context: &ProcessContext, policy: FailurePolicy) -> ProcessRef {
        self(context, policy)
    }
}
