// ── Unique window-class names ─────────────────────────────────────────────────
//
// Every surface registers its own window class, so the class name must be
// unique within the process.  A GUID from the OS is unique by construction;
// rendered in canonical hyphenated form it is also a valid class name.

use windows::core::GUID;

/// Produce a process-unique window-class name from an OS-generated GUID.
///
/// Returns an empty string if the OS cannot produce a GUID. Callers proceed
/// anyway: registering a class under an empty or colliding name risks
/// clashing with another instance, which is an accepted, logged risk rather
/// than a fatal error.
pub(crate) fn unique_class_name() -> String {
    match GUID::new() {
        Ok(guid) => format!(
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            guid.data1,
            guid.data2,
            guid.data3,
            guid.data4[0],
            guid.data4[1],
            guid.data4[2],
            guid.data4[3],
            guid.data4[4],
            guid.data4[5],
            guid.data4[6],
            guid.data4[7],
        ),
        Err(e) => {
            log::error!("failed to create a GUID for the window class name: {e}");
            String::new()
        }
    }
}
