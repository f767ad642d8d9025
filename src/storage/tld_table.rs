use crate::ConfigError;
use std::path::Path;

/// Loads the TLD reference table
///
/// A missing or unreadable table is a configuration error; the crawl must
/// not start without it.
pub fn load_tld_table(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::TldTable {
        path: path.display().to_string(),
        source,
    })?;

    Ok(parse_tld_table(&content))
}

/// Parses TLD entries separated by newlines or commas
///
/// Entries are lowercased and stripped of leading dots; `#` starts a comment.
/// Duplicates are dropped, first occurrence wins.
pub fn parse_tld_table(content: &str) -> Vec<String> {
    let mut tlds: Vec<String> = Vec::new();

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("");
        for entry in line.split(',') {
            let tld = entry.trim().trim_start_matches('.').to_lowercase();
            if tld.is_empty() || tlds.contains(&tld) {
                continue;
            }
            tlds.push(tld);
        }
    }

    tlds
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_lines_and_commas() {
        let tlds = parse_tld_table("com\nnet,org\n.JP\n");
        assert_eq!(tlds, vec!["com", "net", "org", "jp"]);
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let tlds = parse_tld_table("# reference table\n\ncom # generic\n,,\n");
        assert_eq!(tlds, vec!["com"]);
    }

    #[test]
    fn test_parse_dedups() {
        let tlds = parse_tld_table("com\nCOM\n.com");
        assert_eq!(tlds, vec!["com"]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"com\njp\n").unwrap();
        file.flush().unwrap();

        let tlds = load_tld_table(file.path()).unwrap();
        assert_eq!(tlds, vec!["com", "jp"]);
    }

    #[test]
    fn test_missing_table_is_config_error() {
        let result = load_tld_table(Path::new("/nonexistent/tlds.txt"));
        assert!(matches!(result.unwrap_err(), ConfigError::TldTable { .. }));
    }
}
