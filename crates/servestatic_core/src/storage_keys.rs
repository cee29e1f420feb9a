pub const STATIC_PREFIX: &str = "static";

/// Maps an archive entry name to its key in the destination bucket.
///
/// The first path segment names the unit that produced the archive and is
/// replaced by [`STATIC_PREFIX`]. Entries with nothing after that segment have
/// no destination.
pub fn destination_object_key(entry_name: &str) -> Option<String> {
    let (_unit, rest) = entry_name.split_once('/')?;
    if rest.is_empty() {
        return None;
    }
    Some(format!("{STATIC_PREFIX}/{rest}"))
}
