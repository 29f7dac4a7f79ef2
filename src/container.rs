//! Text framing of a disguised file: two header lines, a `DATA:` sentinel and
//! the payload.

pub const NAME_FIELD: &str = "ORIGINAL_NAME:";
pub const TYPE_FIELD: &str = "FILE_TYPE:";
pub const DATA_SENTINEL: &str = "DATA:";

/// Name used when the header carries no `ORIGINAL_NAME:` line.
pub const DEFAULT_NAME: &str = "decrypted_file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub original_name: String,
    pub type_tag: String,
    pub payload: String,
    /// False when no `DATA:` line was found and the whole input became the
    /// payload.
    pub has_sentinel: bool,
}

impl Container {
    pub fn new(original_name: &str, type_tag: &str, payload: &str) -> Self {
        Self {
            original_name: original_name.to_string(),
            type_tag: type_tag.to_string(),
            payload: payload.to_string(),
            has_sentinel: true,
        }
    }

    /// Never fails. Without a sentinel the boundary stays at line 0, so the
    /// header lines end up inside the payload and surface later as a base64
    /// error.
    pub fn parse(raw: &str) -> Self {
        let lines: Vec<&str> = raw.split('\n').collect();
        let mut original_name = DEFAULT_NAME.to_string();
        let mut type_tag = String::new();
        let mut data_start = None;

        for (i, line) in lines.iter().enumerate() {
            // Every occurrence of the field name is dropped, not just the prefix.
            if line.starts_with(NAME_FIELD) {
                original_name = line.replace(NAME_FIELD, "").trim().to_string();
            } else if line.starts_with(TYPE_FIELD) {
                type_tag = line.replace(TYPE_FIELD, "").trim().to_string();
            } else if line.trim() == DATA_SENTINEL {
                data_start = Some(i + 1);
                break;
            }
        }

        Self {
            original_name,
            type_tag,
            payload: lines[data_start.unwrap_or(0)..].join("\n"),
            has_sentinel: data_start.is_some(),
        }
    }

    pub fn frame(&self) -> String {
        format!(
            "{NAME_FIELD}{}\n{TYPE_FIELD}{}\n{DATA_SENTINEL}\n{}",
            self.original_name, self.type_tag, self.payload
        )
    }
}
