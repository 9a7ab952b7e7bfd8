// ── Central error type ────────────────────────────────────────────────────────
//
// All fallible construction steps return `error::Result<T>`.  Nothing here
// crosses the public boundary: construction-fatal failures surface to the
// embedding owner as `SurfaceEvent::Error`, degraded failures as a documented
// sentinel plus a log line.

/// Every internal error the crate can produce.
#[derive(Debug)]
pub(crate) enum InlayError {
    /// A Win32 API call returned a failure code.
    Win32 {
        /// The name of the failing function, for log output.
        function: &'static str,
        /// The raw Win32 error code (`GetLastError()` value) or HRESULT.
        code: u32,
    },
}

impl std::fmt::Display for InlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Win32 { function, code } => {
                write!(f, "{function} failed (error {code:#010x})")
            }
        }
    }
}

impl std::error::Error for InlayError {}

// Convert a windows-crate error (HRESULT) directly into an InlayError so that
// `?` can be used on `windows::core::Result<T>` throughout the platform module.
impl From<windows::core::Error> for InlayError {
    fn from(e: windows::core::Error) -> Self {
        // HRESULT.0 is i32; reinterpret bits as u32 for display purposes.
        // Win32 errors appear as 0x8007xxxx HRESULTs.
        Self::Win32 {
            function: "windows",
            code: e.code().0 as u32,
        }
    }
}

/// Convenience alias used throughout the crate.
pub(crate) type Result<T> = std::result::Result<T, InlayError>;
