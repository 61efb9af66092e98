use serde::Serialize;

/// A count of things, displayed with the correctly pluralized noun, e.g. `1 repository`.
pub enum Counted<'a> {
    Regular {
        singular: &'a str,
        count: usize,
    },
    Explicit {
        singular: &'a str,
        count: usize,
        plural: &'a str,
    },
}

impl<'a> Counted<'a> {
    /// Create a new `Counted` value with the given count, singular, and plural values.
    pub fn new(count: usize, singular: &'a str, plural: &'a str) -> Self {
        Counted::Explicit {
            singular,
            plural,
            count,
        }
    }

    /// Create a new `Counted` value with the given count and singular form, which is pluralized by
    /// adding an `s`.
    pub fn regular(count: usize, singular: &'a str) -> Self {
        Counted::Regular { singular, count }
    }
}

impl<'a> std::fmt::Display for Counted<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Counted::Explicit {
                singular,
                plural,
                count,
            } => {
                if count == 1 {
                    write!(f, "1 {singular}")
                } else {
                    write!(f, "{count} {plural}")
                }
            }

            Counted::Regular { singular, count } => {
                if count == 1 {
                    write!(f, "1 {singular}")
                } else {
                    write!(f, "{count} {singular}s")
                }
            }
        }
    }
}

/// Write items as pretty-printed JSON array.
pub fn write_json<W: std::io::Write, T: Serialize>(writer: W, items: &[T]) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, items)?;
    Ok(())
}

/// Write items as JSON Lines, one object per line.
pub fn write_jsonl<W: std::io::Write, T: Serialize>(mut writer: W, items: &[T]) -> anyhow::Result<()> {
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writeln!(&mut writer)?;
    }
    Ok(())
}

/// The immediate subdirectories of `dir`, sorted by path.
pub fn sorted_subdirectories(dir: &std::path::Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
