use std::path::Path;

/// Split newline-delimited wordlist text into path fragments.
/// Blank lines and `#` comments are skipped, surrounding whitespace trimmed.
pub fn parse_wordlist(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn load_wordlist(path: &Path) -> anyhow::Result<Vec<String>> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read wordlist {}: {}", path.display(), e))?;
    Ok(parse_wordlist(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wordlist() {
        let words = parse_wordlist("admin\n\n  api/v1/users \r\n# comment\n/health\n");
        assert_eq!(words, vec!["admin", "api/v1/users", "/health"]);
    }

    #[test]
    fn test_load_wordlist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "a\nb\n").unwrap();
        assert_eq!(load_wordlist(&path).unwrap(), vec!["a", "b"]);
        assert!(load_wordlist(&dir.path().join("missing.txt")).is_err());
    }
}
