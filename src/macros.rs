#![cfg_attr(
    not(any(feature = "tokio", feature = "futures")),
    expect(unused_macros)
)]

/// Unwrap a [`BlockOutcome`](crate::BlockOutcome) value, returning the value
/// from the [`Complete`](crate::BlockOutcome::Complete) variant, or
/// propagating the [`HasMore`](crate::BlockOutcome::HasMore) variant to the
/// caller (wrapped with `Ok(_)`).
macro_rules! complete_ok {
    ($e:expr) => {
        match $e {
            crate::BlockOutcome::HasMore { remaining_bytes } => {
                return ::std::result::Result::Ok(crate::BlockOutcome::HasMore { remaining_bytes })
            }
            crate::BlockOutcome::Complete(value) => value,
        }
    };
}

/// Unwrap a [`Poll`](std::task::Poll) value, returning the value from
/// the [`Ready`](std::task::Poll::Ready) variant, or propagating the
/// [`Pending`](std::task::Poll::Pending) variant to the caller.
macro_rules! ready {
    ($e:expr) => {
        match $e {
            std::task::Poll::Pending => {
                return std::task::Poll::Pending;
            }
            std::task::Poll::Ready(value) => value,
        }
    };
}
