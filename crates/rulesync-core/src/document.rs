// # Config Document
//
// The YAML config file doubles as the state file: `domain_row_ids` is
// rewritten after every successful add pass.
//
// ## Round-Trip
//
// The original text is kept next to the parsed `SyncConfig`. Saving an
// unchanged document writes the original bytes back. Replacing the row ids
// rewrites only the lines that hold the `domain_row_ids` value, so comments,
// quoting and key order elsewhere survive.
//
// ## Writes
//
// Plain overwrite of the file. No backup, no temp-file rename.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::{ROW_IDS_KEY, SyncConfig};
use crate::rule::RowId;
use crate::{Error, Result};

/// Loaded config file, parsed and verbatim
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: PathBuf,
    text: String,
    config: SyncConfig,
    tracks_row_ids: bool,
}

impl ConfigDocument {
    /// Read and parse the config file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let text = fs::read_to_string(&path).await.map_err(|e| {
            Error::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(path, text)
    }

    /// Parse config text that belongs to `path`
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let text = text.into();

        let config: SyncConfig = serde_yaml_ng::from_str(&text).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let tracks_row_ids = has_top_level_key(&text, ROW_IDS_KEY)?;

        Ok(Self {
            path,
            text,
            config,
            tracks_row_ids,
        })
    }

    /// Parsed configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Consume the document, keeping only the parsed configuration
    pub fn into_config(self) -> SyncConfig {
        self.config
    }

    /// File the document was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the file has a `domain_row_ids` key
    ///
    /// A file without the key opts out of tracking; the ids are never written.
    pub fn tracks_row_ids(&self) -> bool {
        self.tracks_row_ids
    }

    /// Tracked ids, empty when absent or null
    pub fn row_ids(&self) -> Vec<RowId> {
        self.config.row_ids()
    }

    /// Replace the `domain_row_ids` value in memory
    ///
    /// Returns `Ok(false)` and leaves the document untouched when the key is
    /// absent.
    pub fn replace_row_ids(&mut self, ids: &[RowId]) -> Result<bool> {
        if !self.tracks_row_ids {
            return Ok(false);
        }

        let span = locate_row_ids(&self.text).ok_or_else(|| {
            Error::state_store(format!(
                "{} is present in {} but not as a plain top-level key; refusing to rewrite it",
                ROW_IDS_KEY,
                self.path.display()
            ))
        })?;

        let mut text = String::with_capacity(self.text.len());
        text.push_str(&self.text[..span.start]);
        text.push_str(&span.render(ids));
        text.push_str(&self.text[span.end..]);

        // Never write a file we could not load again
        let reparsed: SyncConfig = serde_yaml_ng::from_str(&text).map_err(|e| {
            Error::state_store(format!("Rewritten config no longer parses: {}", e))
        })?;
        if reparsed.row_ids() != ids {
            return Err(Error::state_store(
                "Rewritten config does not round-trip the new row ids",
            ));
        }

        self.text = text;
        self.config = reparsed;
        Ok(true)
    }

    /// Write the document back to its file
    pub async fn save(&self) -> Result<()> {
        fs::write(&self.path, self.text.as_bytes())
            .await
            .map_err(|e| {
                Error::state_store(format!(
                    "Failed to write config file {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        tracing::trace!("Config written to file: {}", self.path.display());
        Ok(())
    }

    /// Reload `path`, replace the row ids if tracked, and save
    ///
    /// Returns whether the file was written.
    pub async fn set_row_ids<P: AsRef<Path>>(path: P, ids: &[RowId]) -> Result<bool> {
        let mut doc = Self::load(path).await?;
        if !doc.replace_row_ids(ids)? {
            return Ok(false);
        }
        doc.save().await?;
        Ok(true)
    }
}

fn has_top_level_key(text: &str, key: &str) -> Result<bool> {
    let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(text)
        .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
    Ok(value.get(key).is_some())
}

/// Byte range of the `domain_row_ids` entry plus what is needed to re-render it
#[derive(Debug, PartialEq, Eq)]
struct RowIdsSpan {
    /// Start of the key line
    start: usize,
    /// End of the last line belonging to the value, newline included
    end: usize,
    /// Key text up to and including the colon
    key: String,
    /// `"  - "`-style prefix when the value is a block sequence with items
    item_prefix: Option<String>,
    /// Inline comment to keep, with the whitespace before its `#`
    comment: Option<String>,
    /// Line terminator used by the file
    newline: &'static str,
    /// Whether the span ends with a line terminator
    terminated: bool,
}

impl RowIdsSpan {
    fn render(&self, ids: &[RowId]) -> String {
        let mut out = String::new();
        let comment = self.comment.as_deref().unwrap_or_default();

        match &self.item_prefix {
            Some(prefix) if !ids.is_empty() => {
                out.push_str(&self.key);
                out.push_str(comment);
                for id in ids {
                    out.push_str(self.newline);
                    out.push_str(prefix);
                    out.push_str(&render_row_id(id));
                }
            }
            _ => {
                let items: Vec<String> = ids.iter().map(render_row_id).collect();
                out.push_str(&format!("{} [{}]{}", self.key, items.join(", "), comment));
            }
        }

        if self.terminated {
            out.push_str(self.newline);
        }
        out
    }
}

fn render_row_id(id: &RowId) -> String {
    match id {
        RowId::Number(n) => n.to_string(),
        // A JSON string literal is a valid YAML double-quoted scalar
        RowId::Text(s) => serde_json::Value::String(s.clone()).to_string(),
    }
}

/// Find the top-level `domain_row_ids` entry and the lines its value spans
fn locate_row_ids(text: &str) -> Option<RowIdsSpan> {
    let mut offset = 0;
    let mut lines = text.split_inclusive('\n');

    while let Some(line) = lines.next() {
        let line_start = offset;
        offset += line.len();

        let content = line.trim_end_matches(['\n', '\r']);
        let Some(rest) = strip_key(content, ROW_IDS_KEY) else {
            continue;
        };

        let key = content[..content.len() - rest.len()].to_string();
        let newline = if line.ends_with("\r\n") { "\r\n" } else { "\n" };
        let inline = rest.trim();

        // Continuation lines: indented lines and `- item` lines. Blank lines
        // in between are swallowed only if more value lines follow them.
        let mut end = offset;
        let mut last_line = rest;
        let mut item_prefix = None;
        let mut scan = offset;
        for next in lines.by_ref() {
            let next_content = next.trim_end_matches(['\n', '\r']);
            scan += next.len();

            if next_content.trim().is_empty() {
                continue;
            }
            if !is_continuation(next_content) {
                break;
            }

            let trimmed = next_content.trim_start();
            if item_prefix.is_none() && (trimmed.starts_with("- ") || trimmed == "-") {
                let indent = &next_content[..next_content.len() - trimmed.len()];
                item_prefix = Some(format!("{}- ", indent));
            }
            end = scan;
            last_line = next_content;
        }

        let block = inline.is_empty() || inline.starts_with('#');
        let comment = if block {
            comment_with_gap(rest)
        } else {
            // Flow values may wrap; the comment sits on the last line
            comment_with_gap(last_line)
        };

        let terminated = text[..end].ends_with('\n');

        return Some(RowIdsSpan {
            start: line_start,
            end,
            key,
            item_prefix: if block { item_prefix } else { None },
            comment,
            newline,
            terminated,
        });
    }

    None
}

/// If `line` is `key:` at column zero (optionally quoted), return what follows the colon
fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let candidates = [
        key.to_string(),
        format!("\"{}\"", key),
        format!("'{}'", key),
    ];

    for candidate in &candidates {
        if let Some(after) = line.strip_prefix(candidate.as_str()) {
            let after = after.trim_start_matches([' ', '\t']);
            if let Some(rest) = after.strip_prefix(':')
                && (rest.is_empty() || rest.starts_with([' ', '\t']))
            {
                return Some(rest);
            }
        }
    }
    None
}

fn is_continuation(line: &str) -> bool {
    if line.starts_with("---") || line.starts_with("...") {
        return false;
    }
    line.starts_with([' ', '\t']) || line.starts_with('-')
}

/// Inline comment of `s` together with the whitespace separating it from the value
fn comment_with_gap(s: &str) -> Option<String> {
    let comment = find_comment(s)?;
    // `comment` is a trimmed suffix of `s`
    let before = &s[..s.trim_end().len() - comment.len()];
    let gap = &before[before.trim_end_matches([' ', '\t']).len()..];
    if gap.is_empty() {
        Some(format!(" {}", comment))
    } else {
        Some(format!("{}{}", gap, comment))
    }
}

/// Position of a `#` comment outside quotes, preceded by whitespace or at the start
fn find_comment(s: &str) -> Option<&str> {
    let mut in_single = false;
    let mut in_double = false;
    let mut prev: Option<char> = None;

    for (idx, c) in s.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single && prev != Some('\\') => in_double = !in_double,
            '#' if !in_single && !in_double && prev.is_none_or(char::is_whitespace) => {
                return Some(s[idx..].trim_end());
            }
            _ => {}
        }
        prev = Some(c);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &str = "# router management\n\
server_address: 'http://192.168.9.1'   # LAN address\n\
username: \"admin\"\n\
password: secret\n\
domain_list_url: https://example.com/list.txt\n\
domain_interface: wan2\n\
domain_src_addr: \"\"\n\
domain_comment: gfw\n";

    fn doc(row_ids: &str, trailer: &str) -> ConfigDocument {
        let text = format!("{}{}{}", HEADER, row_ids, trailer);
        ConfigDocument::parse("config.yml", text).unwrap()
    }

    fn ids(values: &[i64]) -> Vec<RowId> {
        values.iter().copied().map(RowId::Number).collect()
    }

    #[test]
    fn test_flow_sequence_is_rewritten_in_place() {
        let mut d = doc("domain_row_ids: [1, 2] # managed\n", "# trailing comment\n");
        assert!(d.tracks_row_ids());
        assert_eq!(d.row_ids(), ids(&[1, 2]));

        assert!(d.replace_row_ids(&ids(&[31, 32])).unwrap());
        assert_eq!(
            d.text(),
            format!("{}domain_row_ids: [31, 32] # managed\n# trailing comment\n", HEADER)
        );
        assert_eq!(d.row_ids(), ids(&[31, 32]));
    }

    #[test]
    fn test_block_sequence_keeps_its_style() {
        let mut d = doc("domain_row_ids:\n  - 1\n  - 2\n\n", "extra: true\n");

        assert!(d.replace_row_ids(&ids(&[5, 6, 7])).unwrap());
        assert_eq!(
            d.text(),
            format!("{}domain_row_ids:\n  - 5\n  - 6\n  - 7\n\nextra: true\n", HEADER)
        );
    }

    #[test]
    fn test_block_sequence_at_column_zero() {
        let mut d = doc("domain_row_ids:\n- 1\n- 2\n", "");

        assert!(d.replace_row_ids(&ids(&[9])).unwrap());
        assert_eq!(d.text(), format!("{}domain_row_ids:\n- 9\n", HEADER));
    }

    #[test]
    fn test_empty_list_renders_flow() {
        let mut d = doc("domain_row_ids:\n  - 1\n", "");

        assert!(d.replace_row_ids(&[]).unwrap());
        assert_eq!(d.text(), format!("{}domain_row_ids: []\n", HEADER));
        assert!(d.row_ids().is_empty());
    }

    #[test]
    fn test_null_value_is_tracked() {
        let mut d = doc("domain_row_ids:\n", "");
        assert!(d.tracks_row_ids());
        assert!(d.row_ids().is_empty());

        assert!(d.replace_row_ids(&ids(&[4])).unwrap());
        assert_eq!(d.text(), format!("{}domain_row_ids: [4]\n", HEADER));
    }

    #[test]
    fn test_text_ids_are_quoted() {
        let mut d = doc("domain_row_ids: []\n", "");
        let new_ids = vec![RowId::from("12"), RowId::from("a,b")];

        assert!(d.replace_row_ids(&new_ids).unwrap());
        assert_eq!(d.row_ids(), new_ids);
        assert!(d.text().ends_with("domain_row_ids: [\"12\", \"a,b\"]\n"));
    }

    #[test]
    fn test_missing_key_is_not_tracked() {
        let mut d = doc("", "");
        assert!(!d.tracks_row_ids());
        let before = d.text().to_string();

        assert!(!d.replace_row_ids(&ids(&[1])).unwrap());
        assert_eq!(d.text(), before);
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let text = HEADER.replace('\n', "\r\n") + "domain_row_ids: [1]";
        let mut d = ConfigDocument::parse("config.yml", text).unwrap();

        assert!(d.replace_row_ids(&ids(&[2, 3])).unwrap());
        assert!(d.text().ends_with("\r\ndomain_row_ids: [2, 3]"));
    }

    #[test]
    fn test_nested_key_with_same_name_is_ignored() {
        let text = format!(
            "{}nested:\n  domain_row_ids: [8]\ndomain_row_ids: [1]\n",
            HEADER
        );
        let mut d = ConfigDocument::parse("config.yml", text).unwrap();

        assert!(d.replace_row_ids(&ids(&[2])).unwrap());
        assert!(d.text().contains("  domain_row_ids: [8]\n"));
        assert!(d.text().ends_with("domain_row_ids: [2]\n"));
    }

    #[test]
    fn test_comment_spacing_is_preserved() {
        let mut d = doc("domain_row_ids: [1, 2]   # managed\n", "");
        assert!(d.replace_row_ids(&ids(&[100, 101])).unwrap());
        assert!(d.text().ends_with("domain_row_ids: [100, 101]   # managed\n"));

        let mut d = doc("domain_row_ids:    # managed\n  - 1\n", "");
        assert!(d.replace_row_ids(&ids(&[7, 8])).unwrap());
        assert!(d.text().ends_with("domain_row_ids:    # managed\n  - 7\n  - 8\n"));
    }

    #[test]
    fn test_comment_with_gap() {
        assert_eq!(comment_with_gap(" [1]  # note "), Some("  # note".to_string()));
        assert_eq!(comment_with_gap(" [1]"), None);
    }

    #[test]
    fn test_find_comment_skips_quoted_hash() {
        assert_eq!(find_comment(" [1] # note"), Some("# note"));
        assert_eq!(find_comment(" \"a#b\""), None);
        assert_eq!(find_comment(" 'x # y' #z"), Some("#z"));
        assert_eq!(find_comment("a#b"), None);
    }

    #[tokio::test]
    async fn test_load_save_round_trip_is_byte_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let text = format!("{}domain_row_ids: [1, 2]  # ids\n", HEADER);
        fs::write(&path, &text).await.unwrap();

        let d = ConfigDocument::load(&path).await.unwrap();
        d.save().await.unwrap();

        assert_eq!(fs::read_to_string(&path).await.unwrap(), text);
    }

    #[tokio::test]
    async fn test_set_row_ids_reloads_and_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, format!("{}domain_row_ids: [1]\n", HEADER))
            .await
            .unwrap();

        assert!(ConfigDocument::set_row_ids(&path, &ids(&[7, 8])).await.unwrap());

        let d = ConfigDocument::load(&path).await.unwrap();
        assert_eq!(d.row_ids(), ids(&[7, 8]));
        assert!(d.text().starts_with(HEADER));
    }

    #[tokio::test]
    async fn test_set_row_ids_without_key_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, HEADER).await.unwrap();

        assert!(!ConfigDocument::set_row_ids(&path, &ids(&[7])).await.unwrap());
        assert_eq!(fs::read_to_string(&path).await.unwrap(), HEADER);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let err = ConfigDocument::load(dir.path().join("nope.yml"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
