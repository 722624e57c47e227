pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
