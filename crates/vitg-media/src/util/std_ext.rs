pub(crate) mod prelude {
    pub(crate) use super::human_size;
}

/// Formats the byte count with binary units, e.g. `683.59 KiB`
pub(crate) fn human_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
