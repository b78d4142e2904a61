/// Errors which can come out of a [crate::Pyramid].
///
/// There is only one recoverable failure: the system allocator refusing to give us another page.  Everything else
/// (double frees, foreign pointers) is excluded by the `unsafe` contracts on deallocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PyramidError {
    #[error("Out of memory: unable to allocate a page of {slots} slots ({bytes} bytes)")]
    OutOfMemory { slots: usize, bytes: usize },
}

pub type Result<T, E = PyramidError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = PyramidError::OutOfMemory {
            slots: 256,
            bytes: 4096,
        };
        assert_eq!(
            err.to_string(),
            "Out of memory: unable to allocate a page of 256 slots (4096 bytes)"
        );
    }
}
