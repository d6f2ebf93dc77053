//! Symbolic names for the POSIX errno values most likely to show up in a
//! tracepoint payload. Not exhaustive — an unrecognized code still renders
//! as a plain number (see [`crate::options::ConvertOptions::ErrnoUnknownAsString`]).

/// Returns the symbolic name for a well-known Linux errno value.
pub fn name(code: i64) -> Option<&'static str> {
    let name = match code {
        1 => "EPERM",
        2 => "ENOENT",
        3 => "ESRCH",
        4 => "EINTR",
        5 => "EIO",
        6 => "ENXIO",
        7 => "E2BIG",
        9 => "EBADF",
        11 => "EAGAIN",
        12 => "ENOMEM",
        13 => "EACCES",
        14 => "EFAULT",
        16 => "EBUSY",
        17 => "EEXIST",
        19 => "ENODEV",
        20 => "ENOTDIR",
        21 => "EISDIR",
        22 => "EINVAL",
        23 => "ENFILE",
        24 => "EMFILE",
        28 => "ENOSPC",
        32 => "EPIPE",
        36 => "ENAMETOOLONG",
        38 => "ENOSYS",
        61 => "ENODATA",
        62 => "ETIME",
        104 => "ECONNRESET",
        110 => "ETIMEDOUT",
        111 => "ECONNREFUSED",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_codes() {
        assert_eq!(name(2), Some("ENOENT"));
        assert_eq!(name(9999), None);
    }
}
