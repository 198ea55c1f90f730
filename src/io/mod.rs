mod cursor;
mod inflate;

pub use cursor::{read_f32_le, read_i32_le, read_u24_le, read_u32_le, ByteCursor};
pub use inflate::inflate_raw;
