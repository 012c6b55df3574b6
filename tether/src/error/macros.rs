/// Escalates a broken invariant.
///
/// Formats its arguments like [`format!`] and hands the message to
/// [`escalate`](crate::error::escalate) as a
/// [`FatalError::Invariant`](crate::error::FatalError::Invariant).
///
/// # Examples
///
/// ```ignore
/// if self.counts.borrow().contains_key(&key) {
///     fatal!("wait source {key:#x} is already registered");
/// }
/// ```
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::error::escalate($crate::error::FatalError::Invariant(::std::format!($($arg)+)))
    };
}

pub(crate) use fatal;
