//! Human-readable size formatting

use std::fmt;

/// Byte count rendered with binary units, truncated to one decimal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

impl ByteSize {
    pub fn to_human_readable(&self) -> String {
        let mut scale = 1u64;
        let mut unit = 0;
        while unit + 1 < UNITS.len() && self.0 / scale >= 1024 {
            scale *= 1024;
            unit += 1;
        }

        let whole = self.0 / scale;
        let tenths = (self.0 % scale) * 10 / scale;
        match tenths {
            0 => format!("{}{}", whole, UNITS[unit]),
            t => format!("{}.{}{}", whole, t, UNITS[unit]),
        }
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_human_readable())
    }
}
