use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;

/// Known log layouts, oldest first. A log never carries a version tag; the
/// header line itself is the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    V1,
    V2,
    V3,
    V4,
}

struct Layout {
    version: SchemaVersion,
    columns: &'static [&'static str],
}

const LAYOUTS: &[Layout] = &[
    Layout {
        version: SchemaVersion::V1,
        columns: &["datetime", "code", "price", "stock"],
    },
    Layout {
        version: SchemaVersion::V2,
        columns: &["datetime", "code", "price", "stock", "category"],
    },
    Layout {
        version: SchemaVersion::V3,
        columns: &["datetime", "code", "price", "stock", "category", "supplier"],
    },
    Layout {
        version: SchemaVersion::V4,
        columns: &[
            "datetime",
            "code",
            "price",
            "stock",
            "category",
            "supplier",
            "is_discounted",
        ],
    },
];

impl SchemaVersion {
    pub const ALL: [Self; 4] = [Self::V1, Self::V2, Self::V3, Self::V4];

    /// The layout new appends are written with.
    pub const CURRENT: Self = Self::V4;

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
            Self::V4 => "v4",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        LAYOUTS
            .iter()
            .find(|layout| layout.version == self)
            .map(|layout| layout.columns)
            .unwrap_or(&[])
    }

    /// Identifies which known layout a header line belongs to, if any.
    pub fn identify(header: &str) -> Option<Self> {
        let header = header.trim_end_matches(['\r', '\n']);
        LAYOUTS
            .iter()
            .find(|layout| layout.columns.join(",") == header)
            .map(|layout| layout.version)
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered column tuple the store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogSchema {
    version: SchemaVersion,
}

impl Default for LogSchema {
    fn default() -> Self {
        Self::current()
    }
}

impl LogSchema {
    pub const fn current() -> Self {
        Self {
            version: SchemaVersion::CURRENT,
        }
    }

    pub const fn pinned(version: SchemaVersion) -> Self {
        Self { version }
    }

    pub const fn version(self) -> SchemaVersion {
        self.version
    }

    pub fn columns(self) -> &'static [&'static str] {
        self.version.columns()
    }

    pub fn header_line(self) -> String {
        self.columns().join(",")
    }
}

/// Outcome of comparing an on-disk log header against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HeaderCheck {
    /// No log file exists yet.
    Missing,
    /// Header matches verbatim; rows can be appended.
    Compatible,
    /// Header differs, or could not be read at all.
    Incompatible {
        found: Option<String>,
        identified: Option<SchemaVersion>,
    },
}

impl HeaderCheck {
    pub const fn requires_archive(&self) -> bool {
        matches!(self, Self::Incompatible { .. })
    }
}

/// Reads only the first line of `path` and compares it with `schema`.
///
/// An empty file, or a first line that is not valid UTF-8, counts as incompatible.
pub fn inspect_header(path: &Path, schema: LogSchema) -> std::io::Result<HeaderCheck> {
    if !path.is_file() {
        return Ok(HeaderCheck::Missing);
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut first_line = String::new();
    let found = match reader.read_line(&mut first_line) {
        Ok(0) => None,
        Ok(_) => Some(first_line.trim_end_matches(['\r', '\n']).to_owned()),
        Err(error) if error.kind() == std::io::ErrorKind::InvalidData => None,
        Err(error) => return Err(error),
    };

    match found {
        Some(header) if header == schema.header_line() => Ok(HeaderCheck::Compatible),
        Some(header) => Ok(HeaderCheck::Incompatible {
            identified: SchemaVersion::identify(&header),
            found: Some(header),
        }),
        None => Ok(HeaderCheck::Incompatible {
            found: None,
            identified: None,
        }),
    }
}
