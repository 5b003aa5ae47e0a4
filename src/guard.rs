use crate::BlockStreamError;

/// An operation on a suspendable block stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Write,
    Flush,
    Shutdown,
}

/// Tracks which operation, if any, is outstanding on a suspendable block
/// stream, i.e. which operation last returned [`Poll::Pending`].
///
/// Polling the outstanding operation again continues it. Polling any other
/// operation fails with [`BlockStreamError::OperationInProgress`] without
/// touching the stream. The guard is released as soon as the outstanding
/// operation returns [`Poll::Ready`], whether it succeeded or not.
///
/// [`Poll::Pending`]: std::task::Poll::Pending
/// [`Poll::Ready`]: std::task::Poll::Ready
#[derive(Debug, Default)]
pub(crate) struct OperationGuard {
    outstanding: Option<Operation>,
}

impl OperationGuard {
    pub(crate) fn begin(&self, operation: Operation) -> std::io::Result<()> {
        match self.outstanding {
            Some(outstanding) if outstanding != operation => {
                tracing::debug!(
                    ?outstanding,
                    ?operation,
                    "rejected block stream operation while another is outstanding"
                );
                Err(BlockStreamError::OperationInProgress.into())
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn track<T>(
        &mut self,
        operation: Operation,
        poll: std::task::Poll<std::io::Result<T>>,
    ) -> std::task::Poll<std::io::Result<T>> {
        self.outstanding = if poll.is_pending() {
            Some(operation)
        } else {
            None
        };

        poll
    }
}

#[cfg(test)]
mod tests {
    use std::task::Poll;

    use super::{Operation, OperationGuard};
    use crate::BlockStreamError;

    #[test]
    fn test_guard_rejects_other_operations_while_pending() {
        let mut guard = OperationGuard::default();

        guard.begin(Operation::Write).unwrap();
        let poll: Poll<std::io::Result<usize>> = guard.track(Operation::Write, Poll::Pending);
        assert!(poll.is_pending());

        let error = guard.begin(Operation::Shutdown).unwrap_err();
        assert_eq!(
            BlockStreamError::from_io(&error),
            Some(BlockStreamError::OperationInProgress)
        );

        // The outstanding operation can still be continued
        guard.begin(Operation::Write).unwrap();
        let _ = guard.track(Operation::Write, Poll::Ready(Ok(3)));

        guard.begin(Operation::Flush).unwrap();
    }

    #[test]
    fn test_guard_released_on_failure() {
        let mut guard = OperationGuard::default();

        let _ = guard.track::<()>(Operation::Flush, Poll::Pending);
        let _ = guard.track::<()>(
            Operation::Flush,
            Poll::Ready(Err(std::io::Error::other("sink failed"))),
        );

        guard.begin(Operation::Write).unwrap();
    }
}
