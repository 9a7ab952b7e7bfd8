// ── Platform abstraction layer ────────────────────────────────────────────────
//
// Each platform provides one concrete `EmbeddedSurface` implementation behind
// the factory in `crate::surface`.  No `unsafe` lives outside this module; all
// FFI is confined to the platform sub-modules and never leaks outward.
//
// Only Win32 is implemented.  Other platforms are additional sub-modules with
// their own concrete implementation, selected at build time — only one
// platform is ever active in a given build.

#[cfg(windows)]
pub(crate) mod win32;
